use std::path::PathBuf;

/// Why a configuration document could not be turned into a runnable fleet.
///
/// Every variant is fatal: no server is probed until the whole document
/// loads and validates.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Validation(String),
}
