mod tests;
mod logging_config;
pub mod config;

pub use config::{ApplicationConfig, Config, ConfigError, HostConfig, ScreenConfig};
pub use logging_config::LoggingConfig;
