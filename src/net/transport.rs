//! HTTP transport seam for the login exchanges.
//!
//! DESIGN
//! ======
//! The credential client only needs "POST this JSON, give me status + body",
//! so the hop sits behind a small async trait. Production uses `reqwest`;
//! tests script responses. A request that never produced an HTTP status is
//! reported as [`TransportError::Unreachable`], which callers treat like the
//! browser's status `0`.

use std::time::Duration;

use crate::config::HttpTimeouts;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No complete response was received (DNS, refused connection, timeout,
    /// TLS, or a body cut off mid-read).
    #[error("server unreachable: {0}")]
    Unreachable(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    ClientBuild(String),
}

/// Outgoing JSON POST.
#[derive(Clone, Debug, PartialEq)]
pub struct HttpRequest {
    pub url: String,
    /// Full `Authorization` header value, if any.
    pub authorization: Option<String>,
    pub body: serde_json::Value,
}

/// Status and raw body of a completed exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Provider-neutral async POST. Enables mocking in tests.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` and return whatever status the server answered with.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Unreachable`] when no response arrived.
    async fn post_json(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

// =============================================================================
// REQWEST
// =============================================================================

pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    /// # Errors
    ///
    /// Returns [`TransportError::ClientBuild`] if the TLS backend fails to
    /// initialize.
    pub fn new(timeouts: HttpTimeouts) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| TransportError::ClientBuild(e.to_string()))?;
        Ok(Self { http })
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn post_json(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        tracing::debug!(url = %request.url, "POST");
        let mut builder = self.http.post(&request.url).json(&request.body);
        if let Some(authorization) = &request.authorization {
            builder = builder.header(reqwest::header::AUTHORIZATION, authorization);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::Unreachable(e.to_string()))?;

        let status = response.status().as_u16();
        // A body cut off mid-read is a transport failure, not a rejection.
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Unreachable(e.to_string()))?;
        Ok(HttpResponse { status, body })
    }
}
