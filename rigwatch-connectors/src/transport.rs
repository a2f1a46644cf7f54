//! HTTP transport port.
//!
//! The rig client only needs "GET this URL with these headers and give me
//! the status and body back". Keeping that behind a trait lets tests
//! script responses without a network.

use async_trait::async_trait;
use reqwest::Client;

use crate::error::RigApiError;

/// Raw HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code
    pub status: u16,
    /// Response body
    pub body: String,
}

impl HttpResponse {
    /// True for 2xx responses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Port for performing HTTP GET requests.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send a GET request.
    ///
    /// Returns `Err` only for transport-level failures; any status code,
    /// including errors, is returned as a response.
    async fn get(&self, url: &str, headers: &[(&'static str, String)])
        -> Result<HttpResponse, RigApiError>;
}

/// reqwest-backed transport.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport with a fresh connection pool.
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(
        &self,
        url: &str,
        headers: &[(&'static str, String)],
    ) -> Result<HttpResponse, RigApiError> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(*name, value);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                RigApiError::Timeout
            } else {
                RigApiError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| RigApiError::Network(format!("Failed to read body: {}", e)))?;

        Ok(HttpResponse { status, body })
    }
}
