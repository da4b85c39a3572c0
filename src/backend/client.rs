//! hyper-based backend client.

use std::time::Duration;

use axum::body::Body;
use axum::http::header::{self, HeaderMap, HeaderName};
use axum::http::{Request, Response, Uri};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::backend::{Backend, BackendError};
use crate::config::BackendConfig;
use crate::resilience::timeouts::with_deadline;

/// Headers that describe a single connection and must not be forwarded.
static HOP_BY_HOP: [HeaderName; 7] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP.iter() {
        headers.remove(name);
    }
    headers.remove("keep-alive");
}

/// Forwards requests to the configured geocoding engine over HTTP/1.1.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client<HttpConnector, Body>,
    base: Uri,
    timeout: Duration,
    max_response_bytes: usize,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let base: Uri = config
            .url
            .parse()
            .map_err(|e| BackendError::InvalidRequest(format!("backend url: {e}")))?;
        if base.authority().is_none() {
            return Err(BackendError::InvalidRequest(format!(
                "backend url {} has no host",
                config.url
            )));
        }

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_millis(config.timeout_ms)));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self {
            client,
            base,
            timeout: Duration::from_millis(config.timeout_ms),
            max_response_bytes: config.max_response_bytes,
        })
    }

    /// Map an inbound URI onto the backend, keeping path and query verbatim.
    pub fn target_uri(&self, original: &Uri) -> Result<Uri, BackendError> {
        let base_path = self.base.path().trim_end_matches('/');
        let path_and_query = original
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");

        let mut builder = Uri::builder()
            .scheme(self.base.scheme_str().unwrap_or("http"))
            .path_and_query(format!("{base_path}{path_and_query}"));
        if let Some(authority) = self.base.authority() {
            builder = builder.authority(authority.as_str());
        }
        builder
            .build()
            .map_err(|e| BackendError::InvalidRequest(e.to_string()))
    }

    async fn exchange(&self, request: Request<Body>) -> Result<Response<Body>, BackendError> {
        let (mut parts, body) = request.into_parts();
        parts.uri = self.target_uri(&parts.uri)?;
        strip_hop_by_hop(&mut parts.headers);
        // The client derives Host from the rewritten URI.
        parts.headers.remove(header::HOST);

        let response = self
            .client
            .request(Request::from_parts(parts, body))
            .await
            .map_err(|e| {
                if e.is_connect() {
                    BackendError::Connect(e.to_string())
                } else {
                    BackendError::Malformed(e.to_string())
                }
            })?;

        let (mut parts, body) = response.into_parts();
        let body = self.buffer(body).await?;
        strip_hop_by_hop(&mut parts.headers);

        Ok(Response::from_parts(parts, body))
    }

    /// Read the whole response body so the deadline covers it too.
    async fn buffer(&self, body: Incoming) -> Result<Body, BackendError> {
        let bytes = axum::body::to_bytes(Body::new(body), self.max_response_bytes)
            .await
            .map_err(|e| BackendError::Malformed(e.to_string()))?;
        Ok(Body::from(bytes))
    }
}

impl Backend for HttpBackend {
    async fn forward(&self, request: Request<Body>) -> Result<Response<Body>, BackendError> {
        with_deadline(self.timeout, self.exchange(request)).await
    }
}
