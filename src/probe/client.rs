//! HTTP transport for endpoint probes

use std::fmt;
use std::time::Duration;

/// Status and raw body of a completed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

#[cfg(test)]
impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Connection-level failure (DNS, refused, timeout, TLS)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError(pub String);

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Network error: {}", self.0)
    }
}

impl std::error::Error for TransportError {}

/// Minimal GET capability the probes need
pub trait HttpClient {
    /// Issue a GET, attaching `Authorization: Bearer {token}` when given
    fn get(&self, url: &str, bearer: Option<&str>) -> Result<HttpResponse, TransportError>;
}

/// Production client backed by `reqwest::blocking`
pub struct BlockingHttpClient {
    client: reqwest::blocking::Client,
}

impl BlockingHttpClient {
    /// Every request is bounded by `timeout`
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError(format!("Failed to create HTTP client: {}", e)))?;

        tracing::debug!("Initialized HTTP client (timeout: {:?})", timeout);
        Ok(Self { client })
    }
}

impl HttpClient for BlockingHttpClient {
    fn get(&self, url: &str, bearer: Option<&str>) -> Result<HttpResponse, TransportError> {
        let mut req = self.client.get(url);
        if let Some(token) = bearer {
            req = req.header("Authorization", format!("Bearer {}", token));
        }

        let response = req.send().map_err(|e| TransportError(e.to_string()))?;
        let status = response.status().as_u16();
        // A body that fails mid-read still carries a usable status
        let body = response.text().unwrap_or_default();

        tracing::debug!(url, status, "GET");
        Ok(HttpResponse { status, body })
    }
}
