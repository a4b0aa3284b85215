//! Static asset server.
//!
//! Every request runs the same short pipeline: decode the target, resolve it
//! under the content root, check existence, read the file, respond. The
//! server holds no mutable state, so requests on different connections never
//! coordinate.

use std::any::Any;
use std::future::{Future, IntoFuture};
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;

use crate::config::ServerConfig;
use crate::content_type::ContentTypes;
use crate::error::{Error, Result};
use crate::fs::{FileSystem, TokioFileSystem};
use crate::net;
use crate::resolve::{request_path, resolve};

/// Body sent for missing files.
pub const NOT_FOUND_BODY: &str = "<h1>404 - Not Found</h1>";

/// Body sent when a file exists but cannot be read.
pub const SERVER_ERROR_BODY: &str = "500 - Server Error";

/// How a single request was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeOutcome {
    /// File found and read.
    Ok,
    /// No file at the resolved path, or the path left the content root.
    NotFound,
    /// File exists but reading it failed.
    ReadFailure,
}

impl ServeOutcome {
    /// Label used in request logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::NotFound => "404",
            Self::ReadFailure => "500",
        }
    }

    /// HTTP status for this outcome.
    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::Ok => StatusCode::OK,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::ReadFailure => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Response produced by the asset pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetResponse {
    /// Request outcome.
    pub outcome: ServeOutcome,
    /// Content type of the served file. Only set for [`ServeOutcome::Ok`].
    pub content_type: Option<String>,
    /// Response body.
    pub body: Bytes,
}

impl AssetResponse {
    fn ok(content_type: &str, body: Vec<u8>) -> Self {
        Self {
            outcome: ServeOutcome::Ok,
            content_type: Some(content_type.to_string()),
            body: Bytes::from(body),
        }
    }

    fn not_found() -> Self {
        Self {
            outcome: ServeOutcome::NotFound,
            content_type: None,
            body: Bytes::from_static(NOT_FOUND_BODY.as_bytes()),
        }
    }

    fn read_failure() -> Self {
        Self {
            outcome: ServeOutcome::ReadFailure,
            content_type: None,
            body: Bytes::from_static(SERVER_ERROR_BODY.as_bytes()),
        }
    }
}

impl IntoResponse for AssetResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.outcome.status();
        let headers = response.headers_mut();

        match self.outcome {
            ServeOutcome::Ok => {
                if let Some(value) = self
                    .content_type
                    .as_deref()
                    .and_then(|ct| HeaderValue::from_str(ct).ok())
                {
                    headers.insert(header::CONTENT_TYPE, value);
                }
                headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
                headers.insert(
                    header::ACCESS_CONTROL_ALLOW_ORIGIN,
                    HeaderValue::from_static("*"),
                );
            }
            ServeOutcome::NotFound => {
                headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html"));
            }
            ServeOutcome::ReadFailure => {}
        }

        response
    }
}

/// Serves files from a content root.
pub struct AssetServer<F: FileSystem = TokioFileSystem> {
    config: ServerConfig,
    types: ContentTypes,
    fs: F,
}

impl AssetServer<TokioFileSystem> {
    /// Creates a server backed by the real file system.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        Self::with_fs(config, TokioFileSystem)
    }
}

impl<F: FileSystem + 'static> AssetServer<F> {
    /// Creates a server with a custom file system implementation.
    #[must_use]
    pub fn with_fs(config: ServerConfig, fs: F) -> Self {
        let types = ContentTypes::new().with_extra(&config.content_types);
        Self { config, types, fs }
    }

    /// Returns the server configuration.
    #[must_use]
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the content type table in use.
    #[must_use]
    pub const fn content_types(&self) -> &ContentTypes {
        &self.types
    }

    /// Answers a request target such as `/style.css?v=2`.
    pub async fn respond(&self, target: &str) -> AssetResponse {
        let path = request_path(target);

        let Some(full_path) = resolve(&self.config.root, &path, &self.config.default_document)
        else {
            log::warn!("Rejected path outside content root: {path}");
            return AssetResponse::not_found();
        };

        if !self.fs.exists(&full_path).await {
            log::info!("404: {}", full_path.display());
            return AssetResponse::not_found();
        }

        match self.fs.read(&full_path).await {
            Ok(data) => {
                log::info!("OK: {}", full_path.display());
                AssetResponse::ok(self.types.lookup(&full_path), data)
            }
            Err(e) => {
                log::error!("500: {} ({e})", full_path.display());
                AssetResponse::read_failure()
            }
        }
    }

    /// Builds the axum router. Every method and path goes through [`Self::respond`].
    pub fn router(self: Arc<Self>) -> Router {
        Router::new()
            .fallback(serve_asset::<F>)
            .with_state(self)
            .layer(CatchPanicLayer::custom(panic_response))
    }

    /// Binds the configured address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Bind`] if the address is unavailable.
    pub async fn bind(&self) -> Result<TcpListener> {
        let addr = self.config.bind_addr();
        let bound = TcpListener::bind(addr.as_str()).await;
        bound.map_err(|source| Error::Bind { addr, source })
    }

    /// Serves on an already bound listener until `shutdown` resolves.
    ///
    /// Shutdown does not wait for in-flight requests.
    ///
    /// # Errors
    ///
    /// Returns an error if accepting connections fails.
    pub async fn serve<S>(self: Arc<Self>, listener: TcpListener, shutdown: S) -> Result<()>
    where
        S: Future<Output = ()> + Send,
    {
        let app = self.router();
        tokio::select! {
            result = axum::serve(listener, app).into_future() => result?,
            () = shutdown => log::info!("Server stopped"),
        }
        Ok(())
    }

    /// Binds, prints the reachable URLs, and serves until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Bind`] if the port is unavailable, or an I/O error
    /// from the listener.
    pub async fn run<S>(self, shutdown: S) -> Result<()>
    where
        S: Future<Output = ()> + Send,
    {
        let listener = self.bind().await?;
        let port = listener.local_addr()?.port();

        log::info!("Serving {} on port {port}", self.config.root.display());
        for line in banner(port, &net::lan_host()) {
            println!("{line}");
        }
        println!("Press Ctrl+C to stop");

        Arc::new(self).serve(listener, shutdown).await
    }
}

/// The reachable URLs, printed on stdout regardless of the log filter.
fn banner(port: u16, lan_host: &str) -> [String; 2] {
    [
        format!("Local:   http://localhost:{port}"),
        format!("Network: http://{lan_host}:{port}"),
    ]
}

async fn serve_asset<F: FileSystem + 'static>(
    State(server): State<Arc<AssetServer<F>>>,
    uri: Uri,
) -> AssetResponse {
    let target = uri.path_and_query().map_or("/", |pq| pq.as_str());
    server.respond(target).await
}

fn panic_response(_err: Box<dyn Any + Send + 'static>) -> Response {
    log::error!("500: request handler panicked");
    AssetResponse::read_failure().into_response()
}
