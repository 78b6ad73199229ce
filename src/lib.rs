pub mod application;
pub mod config;
pub mod events;
pub mod exchange;
pub mod host;
pub mod state;
pub mod storage;
pub mod uid;

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{self, prelude::*, EnvFilter};

use crate::application::{AcceptAll, HostedApplication};
use crate::config::{Config, LoggingConfig};
use crate::host::Host;
use crate::storage::create_storage_backend;

pub use dah::State;

/// Install the global tracing subscriber described by `config`.
///
/// `RUST_LOG` overrides the configured level.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .with_context(|| format!("invalid log level '{}'", config.level))?,
    };

    if config.log_to_file {
        let path = Path::new(&config.log_file_path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("cannot create log directory {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("cannot open log file {}", path.display()))?;

        let file_appender = tracing_subscriber::fmt::layer()
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .with_writer(Arc::new(file));
        let stdout_appender = tracing_subscriber::fmt::layer()
            .with_file(true)
            .with_line_number(true);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_appender)
            .with(stdout_appender)
            .try_init()
            .context("Failed to initialize logging")?;
    } else {
        let stdout_appender = tracing_subscriber::fmt::layer()
            .with_file(true)
            .with_line_number(true);

        tracing_subscriber::registry()
            .with(filter)
            .with(stdout_appender)
            .try_init()
            .context("Failed to initialize logging")?;
    }
    Ok(())
}

/// Run a host until ctrl-c, then take the application through its exit sequence
pub async fn run_host(config: Config, launch: bool) -> anyhow::Result<()> {
    let host_config = config.host.context("configuration has no [host] section")?;
    let storage = create_storage_backend(&config.storage)
        .map_err(|e| anyhow::anyhow!("storage backend: {}", e))?;

    info!("🔧 Starting host");
    let host = Host::start(host_config, storage).await?;

    if launch {
        let pid = host.launch_application().await?;
        info!("🚀 Hosted application launched (pid {:?})", pid);
    }

    signal::ctrl_c().await?;
    info!("Shutdown requested");

    match host.exit_application().await {
        Ok(outcome) => info!("Application exit: {:?}", outcome),
        Err(e) => warn!("Application exit sequence failed: {}", e),
    }
    host.shutdown().await;
    Ok(())
}

/// Run the stock hosted application until the host asks it to exit
pub async fn run_application(config: Config) -> anyhow::Result<()> {
    let app_config = config
        .application
        .context("configuration has no [application] section")?;

    info!("🔧 Starting hosted application");
    let application = HostedApplication::start_with_logic(app_config, Arc::new(AcceptAll)).await?;
    let mut state = application.watch_state();

    application
        .announce_ready()
        .await
        .context("host did not accept the ready handshake")?;

    tokio::select! {
        changed = state.wait_for(|s| *s == State::Exit) => {
            changed.context("application state channel closed")?;
            info!("Host ended the session");
        }
        _ = signal::ctrl_c() => {
            info!("Shutdown requested");
            if let Err(e) = application.report_state(State::Exit).await {
                warn!("Failed to report EXIT to host: {}", e);
            }
        }
    }

    application.shutdown().await;
    Ok(())
}
