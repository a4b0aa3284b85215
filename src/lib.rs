//! fort-serve - static asset delivery with an offline cache companion.
//!
//! The [`AssetServer`] maps request paths to files under a content root.
//! The [`offline`] module holds the cache worker that pages install to keep
//! working when the server is unreachable.
//!
//! # Example
//!
//! ```no_run
//! use fort_serve::{AssetServer, ServerConfig};
//!
//! # async fn example() -> fort_serve::Result<()> {
//! let server = AssetServer::new(ServerConfig::new().with_root("public"));
//! server.run(fort_serve::shutdown_signal()).await?;
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod config;
pub mod content_type;
pub mod error;
pub mod fs;
pub mod net;
pub mod offline;
pub mod resolve;
pub mod server;
pub mod signal;

// Re-export main types for convenience
pub use config::{AppConfig, OfflineConfig, ServerConfig};
pub use content_type::{ContentTypes, DEFAULT_CONTENT_TYPE};
pub use error::{Error, Result};
pub use fs::{FileSystem, TokioFileSystem};
pub use offline::{ControlMessage, OfflineWorker};
pub use server::{AssetResponse, AssetServer, ServeOutcome};
pub use signal::shutdown_signal;
