//! Local HTTP proxy that answers page requests through the offline worker.

use std::future::{Future, IntoFuture};
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use bytes::Bytes;
use serde::Serialize;
use tokio::net::TcpListener;

use super::network::{Destination, FetchRequest, HttpNetwork, Network};
use super::store::CacheStorage;
use super::worker::{ControlMessage, OfflineWorker, WorkerResponse};
use crate::config::OfflineConfig;
use crate::error::{Error, Result};

/// Path accepting control messages.
pub const MESSAGE_PATH: &str = "/__worker/message";

/// Header naming where a relayed response came from.
pub const CACHE_SOURCE_HEADER: &str = "x-cache-source";

/// Body sent when the network failed and nothing could stand in.
pub const BAD_GATEWAY_BODY: &str = "502 - Bad Gateway";

const HOP_BY_HOP: &[&str] = &[
    "connection",
    "content-length",
    "host",
    "keep-alive",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| h.eq_ignore_ascii_case(name))
}

#[derive(Serialize)]
struct MessageResponse {
    ok: bool,
}

/// Builds the proxy router. Request bodies above the configured limit get
/// 413.
pub fn router(worker: Arc<OfflineWorker>) -> Router {
    let body_limit = worker.config().max_body_bytes;
    Router::new()
        .route(MESSAGE_PATH, post(post_message))
        .fallback(intercept)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(worker)
}

async fn post_message(State(worker): State<Arc<OfflineWorker>>, body: Bytes) -> Response {
    match ControlMessage::parse(&body) {
        Ok(message) => {
            log::info!("Control message: {message:?}");
            worker.handle_message(message).await;
            axum::Json(MessageResponse { ok: true }).into_response()
        }
        Err(e) => (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    }
}

/// Treats a request as a navigation when the browser says so, or when it
/// accepts HTML.
fn destination(headers: &HeaderMap) -> Destination {
    let fetch_dest = headers.get("sec-fetch-dest").and_then(|v| v.to_str().ok());
    let accepts_html = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("text/html"));

    if fetch_dest == Some("document") || accepts_html {
        Destination::Document
    } else {
        Destination::Other
    }
}

fn forwarded_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .filter(|(name, _)| !is_hop_by_hop(name.as_str()))
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}

async fn intercept(
    State(worker): State<Arc<OfflineWorker>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let target = uri.path_and_query().map_or("/", |pq| pq.as_str());

    let url = match worker.url_for(target) {
        Ok(url) if url.origin() == worker.origin().origin() => url,
        Ok(url) => {
            log::warn!("Refusing to proxy off-origin target {url}");
            return (StatusCode::BAD_REQUEST, "off-origin request").into_response();
        }
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    let fetch = FetchRequest {
        method,
        url,
        destination: destination(&headers),
        headers: forwarded_headers(&headers),
        body,
    };

    match worker.fetch(fetch).await {
        Ok(response) => relay(response),
        Err(e) => {
            log::warn!("502: {target} ({e})");
            (StatusCode::BAD_GATEWAY, BAD_GATEWAY_BODY).into_response()
        }
    }
}

fn relay(worker_response: WorkerResponse) -> Response {
    let WorkerResponse { source, response } = worker_response;
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::BAD_GATEWAY);

    let mut builder = Response::builder().status(status);
    for (name, value) in &response.headers {
        if !is_hop_by_hop(name) {
            builder = builder.header(name, value);
        }
    }

    builder
        .header(CACHE_SOURCE_HEADER, source.as_str())
        .body(Body::from(response.body))
        .unwrap_or_else(|e| {
            log::error!("Failed to relay {source} response: {e}");
            (StatusCode::BAD_GATEWAY, BAD_GATEWAY_BODY).into_response()
        })
}

/// Serves the proxy on a bound listener until `shutdown` resolves, then
/// waits for background refreshes and saves the cache snapshot.
///
/// # Errors
///
/// Returns an error if accepting connections fails or the snapshot cannot
/// be written.
pub async fn serve<S>(worker: Arc<OfflineWorker>, listener: TcpListener, shutdown: S) -> Result<()>
where
    S: Future<Output = ()> + Send,
{
    let app = router(Arc::clone(&worker));
    tokio::select! {
        result = axum::serve(listener, app).into_future() => result?,
        () = shutdown => log::info!("Offline proxy stopped"),
    }

    worker.retire().await;
    worker.settle().await;
    let snapshot = worker.config().snapshot_path();
    worker.storage().save(&snapshot).await?;
    log::info!("Saved offline cache to {}", snapshot.display());
    Ok(())
}

/// Loads the snapshot, binds, installs the worker, then serves.
///
/// The worker activates at the end of install when it skips waiting;
/// otherwise the proxy passes requests through until a `SKIP_WAITING`
/// message arrives.
///
/// # Errors
///
/// Returns an error if the snapshot is corrupt, the origin is not a URL, or
/// the proxy port cannot be bound.
pub async fn run<S>(config: OfflineConfig, shutdown: S) -> Result<()>
where
    S: Future<Output = ()> + Send,
{
    let storage = Arc::new(CacheStorage::load_or_default(&config.snapshot_path()).await?);
    let network: Arc<dyn Network> = Arc::new(HttpNetwork::new());
    let addr = config.bind_addr();
    let worker = Arc::new(OfflineWorker::new(config, storage, network)?);

    let bound = TcpListener::bind(addr.as_str()).await;
    let listener = bound.map_err(|source| Error::Bind { addr, source })?;
    let local = listener.local_addr()?;

    let report = worker.install().await;
    if !report.is_complete() {
        log::warn!("{} files could not be cached", report.failed.len());
    }

    log::info!("Offline proxy for {} on http://{local}", worker.origin());
    serve(worker, listener, shutdown).await
}
