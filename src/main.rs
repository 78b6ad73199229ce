use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use apphost::config::{ApplicationConfig, Config, HostConfig};
use clap::{Parser, Subcommand};
use url::Url;

/// DICOM Application Hosting host and hosted application
#[derive(Parser, Debug)]
#[command(name = "apphost", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a host
    Host {
        /// Path to the configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Launch the configured hosted application
        #[arg(long)]
        launch: bool,
    },
    /// Run the stock hosted application
    App {
        /// Service URL of the host
        #[arg(long = "hostURL")]
        host_url: Option<Url>,

        /// Service URL this application listens on
        #[arg(long = "applicationURL")]
        application_url: Option<Url>,

        /// Path to the configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn load(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    match path {
        // Validated after command-line overrides are applied.
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading configuration from {}", path.display()))?;
            Ok(Config::parse(&text)?)
        }
        None => Ok(Config::default()),
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Host { config, launch } => {
            let mut config = load(config.as_ref())?;
            config.host.get_or_insert_with(HostConfig::default);
            config.validate()?;
            apphost::init_logging(&config.logging)?;
            apphost::run_host(config, launch).await
        }
        Command::App {
            host_url,
            application_url,
            config,
        } => {
            let mut config = load(config.as_ref())?;
            let app = config
                .application
                .get_or_insert_with(ApplicationConfig::default);
            if let Some(url) = host_url {
                app.host_url = url.to_string();
            }
            if let Some(url) = application_url {
                app.url = url.to_string();
            }
            config.validate()?;
            apphost::init_logging(&config.logging)?;
            apphost::run_application(config).await
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("apphost: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
