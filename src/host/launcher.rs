use std::process::ExitStatus;
use std::time::Duration;

use dah::{DahError, Result};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};
use url::Url;

/// A hosted application process started by the host
#[derive(Debug)]
pub struct ApplicationProcess {
    child: Child,
    program: String,
}

/// Arguments appended to the application command line
pub fn launch_args(host_url: &Url, application_url: &Url) -> Vec<String> {
    vec![
        "--hostURL".to_string(),
        host_url.to_string(),
        "--applicationURL".to_string(),
        application_url.to_string(),
    ]
}

impl ApplicationProcess {
    /// Start `command` (program followed by its own arguments) with the
    /// hosting URLs appended.
    pub fn spawn(command: &[String], host_url: &Url, application_url: &Url) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| DahError::config("no application command configured"))?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .args(launch_args(host_url, application_url))
            .kill_on_drop(true);
        debug!(
            "Running: {} {} --hostURL {} --applicationURL {}",
            program,
            args.join(" "),
            host_url,
            application_url
        );

        let child = cmd
            .spawn()
            .map_err(|e| DahError::internal(format!("Failed to spawn {}: {}", program, e)))?;
        info!("Launched hosted application {} (pid {:?})", program, child.id());

        Ok(Self {
            child,
            program: program.clone(),
        })
    }

    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Wait for the process to exit on its own; `None` on timeout
    pub async fn wait_timeout(&mut self, timeout: Duration) -> Result<Option<ExitStatus>> {
        match tokio::time::timeout(timeout, self.child.wait()).await {
            Ok(status) => {
                let status = status?;
                debug!("{} exited with {}", self.program, status);
                Ok(Some(status))
            }
            Err(_) => Ok(None),
        }
    }

    /// Force-terminate the process and reap it
    pub async fn kill(&mut self) -> Result<()> {
        warn!("Force-terminating hosted application {}", self.program);
        self.child.kill().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls() -> (Url, Url) {
        (
            Url::parse("http://127.0.0.1:8080/Host").unwrap(),
            Url::parse("http://127.0.0.1:8081/Application").unwrap(),
        )
    }

    #[test]
    fn test_launch_args() {
        let (host, app) = urls();
        assert_eq!(
            launch_args(&host, &app),
            vec![
                "--hostURL",
                "http://127.0.0.1:8080/Host",
                "--applicationURL",
                "http://127.0.0.1:8081/Application",
            ]
        );
    }

    #[test]
    fn test_empty_command_rejected() {
        let (host, app) = urls();
        let err = ApplicationProcess::spawn(&[], &host, &app).unwrap_err();
        assert!(matches!(err, DahError::Config(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_wait_then_kill() {
        let (host, app) = urls();
        // sh ignores the trailing arguments as positional parameters
        let command = vec!["sh".to_string(), "-c".to_string(), "sleep 30".to_string(), "sh".to_string()];
        let mut process = ApplicationProcess::spawn(&command, &host, &app).unwrap();
        assert!(process.id().is_some());

        let status = process.wait_timeout(Duration::from_millis(50)).await.unwrap();
        assert!(status.is_none());

        process.kill().await.unwrap();
        let status = process.wait_timeout(Duration::from_secs(1)).await.unwrap();
        assert!(status.is_some());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_exits_on_its_own() {
        let (host, app) = urls();
        let command = vec!["sh".to_string(), "-c".to_string(), "exit 0".to_string(), "sh".to_string()];
        let mut process = ApplicationProcess::spawn(&command, &host, &app).unwrap();
        let status = process.wait_timeout(Duration::from_secs(5)).await.unwrap();
        assert!(status.unwrap().success());
    }
}
