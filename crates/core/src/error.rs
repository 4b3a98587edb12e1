//! Error types shared by the frameflight crates.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for configuration and process-level failures.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file could not be parsed.
    #[error("Failed to parse config '{}': {source}", .path.display())]
    ConfigParse {
        /// Path of the offending file, or `<inline>` for string input.
        path: PathBuf,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// Configuration values are out of range or inconsistent.
    #[error("Config error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using the core Error type.
pub type Result<T> = std::result::Result<T, Error>;
