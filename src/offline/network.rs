//! Network seam for the offline worker.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Method, Url};

use crate::error::Result;

/// What kind of resource the page asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Destination {
    /// A full document navigation.
    Document,
    /// Any subresource (style, script, image, fetch).
    #[default]
    Other,
}

/// An outgoing request seen by the worker.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute request URL.
    pub url: Url,
    /// Resource kind, used for the offline fallback.
    pub destination: Destination,
    /// Headers forwarded to the network.
    pub headers: Vec<(String, String)>,
    /// Request body, empty for GET.
    pub body: Bytes,
}

impl FetchRequest {
    /// Creates a subresource GET request.
    #[must_use]
    pub const fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            destination: Destination::Other,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// Creates a document navigation GET request.
    #[must_use]
    pub fn navigate(url: Url) -> Self {
        let mut request = Self::get(url);
        request.destination = Destination::Document;
        request
    }

    /// Sets the method.
    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Returns true for GET requests to http(s) URLs, the only ones the worker caches.
    #[must_use]
    pub fn is_cacheable(&self) -> bool {
        self.method == Method::GET && matches!(self.url.scheme(), "http" | "https")
    }
}

/// A response as the worker sees it, fully buffered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers in arrival order.
    pub headers: Vec<(String, String)>,
    /// Response body.
    pub body: Bytes,
}

impl FetchResponse {
    /// Creates a response with no headers.
    #[must_use]
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Returns the first header value with the given name, case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Something that can carry a request to the origin.
#[async_trait]
pub trait Network: Send + Sync {
    /// Performs the request. Transport failures are errors; any HTTP status is a response.
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse>;
}

/// [`Network`] backed by a `reqwest` client.
#[derive(Debug, Clone, Default)]
pub struct HttpNetwork {
    client: reqwest::Client,
}

impl HttpNetwork {
    /// Creates a network with a default client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a network over an existing client.
    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await?;

        Ok(FetchResponse {
            status,
            headers,
            body,
        })
    }
}
