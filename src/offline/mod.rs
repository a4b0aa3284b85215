//! Offline cache worker and the pieces around it.
//!
//! The worker keeps one cache store per version tag in a [`CacheStorage`],
//! warms it at install time, drops older stores on activation, and answers
//! GET requests stale-while-revalidate. [`proxy`] exposes it over HTTP and
//! [`script`] renders the equivalent browser worker.

pub mod network;
pub mod proxy;
pub mod script;
mod snapshot;
pub mod store;
pub mod worker;

pub use network::{Destination, FetchRequest, FetchResponse, HttpNetwork, Network};
pub use script::worker_script;
pub use store::{CacheStorage, CacheStore, CachedEntry, RequestKey};
pub use worker::{
    ControlMessage, InstallReport, OfflineWorker, ResponseSource, WorkerResponse, WorkerState,
};
