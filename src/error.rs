//! Error types for the fort-serve library.

use thiserror::Error;

/// Errors that can occur while serving assets or running the offline cache.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The listening socket could not be bound.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        /// Address the server tried to listen on.
        addr: String,
        /// Underlying socket error.
        #[source]
        source: std::io::Error,
    },

    /// HTTP request error while talking to the network.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Configuration file could not be parsed.
    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// Cache snapshot could not be encoded or decoded.
    #[error("Cache snapshot error: {0}")]
    Snapshot(String),

    /// A URL could not be built from the configured origin.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A control message was not valid JSON or had an unknown type.
    #[error("Invalid control message: {0}")]
    Message(#[from] serde_json::Error),
}

/// A specialized `Result` type for fort-serve operations.
pub type Result<T> = std::result::Result<T, Error>;
