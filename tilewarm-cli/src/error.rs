//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::path::PathBuf;
use std::process;

use tilewarm::config::{ConfigError, ConfigFileError};
use tilewarm::http::TransportError;
use tilewarm::region::RegionError;
use tilewarm::warmer::WarmError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(std::io::Error),
    /// Explicit --config path does not exist
    ConfigNotFound(PathBuf),
    /// Config file could not be read or holds an invalid value
    ConfigFile(ConfigFileError),
    /// Invalid command-line option or combination
    Config(ConfigError),
    /// Region could not be loaded
    Region(RegionError),
    /// HTTP client could not be built
    Client(TransportError),
    /// Async runtime could not be started
    Runtime(std::io::Error),
    /// The run was aborted
    Warm(WarmError),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        // Print additional help for specific errors
        match self {
            CliError::Config(ConfigError::RegionSource) => {
                eprintln!();
                eprintln!("Examples:");
                eprintln!("  tilewarm 'https://tiles.example.com/{{z}}/{{x}}/{{y}}.png' -p 41.38,2.17 -b 10km");
                eprintln!("  tilewarm 'https://tiles.example.com/{{z}}/{{x}}/{{y}}.png' -g region.geojson");
            }
            CliError::Config(ConfigError::InvalidTemplate { .. }) => {
                eprintln!();
                eprintln!("The URL template must contain {{x}}, {{y}} and {{z}}, for example:");
                eprintln!("  https://tiles.example.com/{{z}}/{{x}}/{{y}}.png");
            }
            CliError::ConfigFile(_) => {
                eprintln!();
                eprintln!("Check the file or point --config at another one.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(e) => write!(f, "Failed to initialize logging: {}", e),
            CliError::ConfigNotFound(path) => {
                write!(f, "Config file not found: {}", path.display())
            }
            CliError::ConfigFile(e) => write!(f, "{}", e),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::Region(e) => write!(f, "Failed to load region: {}", e),
            CliError::Client(e) => write!(f, "{}", e),
            CliError::Runtime(e) => write!(f, "Failed to start async runtime: {}", e),
            CliError::Warm(e) => write!(f, "Warming aborted: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::LoggingInit(e) | CliError::Runtime(e) => Some(e),
            CliError::ConfigFile(e) => Some(e),
            CliError::Config(e) => Some(e),
            CliError::Region(e) => Some(e),
            CliError::Client(e) => Some(e),
            CliError::Warm(e) => Some(e),
            CliError::ConfigNotFound(_) => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::ConfigFile(e)
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e)
    }
}

impl From<RegionError> for CliError {
    fn from(e: RegionError) -> Self {
        CliError::Region(e)
    }
}

impl From<TransportError> for CliError {
    fn from(e: TransportError) -> Self {
        CliError::Client(e)
    }
}

impl From<WarmError> for CliError {
    fn from(e: WarmError) -> Self {
        CliError::Warm(e)
    }
}
