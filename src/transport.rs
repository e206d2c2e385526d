//! REST transport to Sidetree nodes.
//!
//! The [`Transport`] trait is the seam between request construction and the
//! network. [`HttpTransport`] sends requests with `reqwest`; tests supply their
//! own implementations.

use async_trait::async_trait;
use reqwest::{Client, Method};
use tracing::debug;
use url::Url;

use crate::config::ClientConfig;
use crate::error::Result;
use crate::types::Operation;

/// A request ready to be sent to a Sidetree REST endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// HTTP method
    pub method: Method,
    /// Fully resolved URL
    pub url: Url,
    /// Operation body for POST requests
    pub body: Option<Operation>,
}

/// Status and body of a REST response
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    /// Returns true for 2xx statuses
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends requests to a Sidetree REST endpoint
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends a request and returns the response, whatever its status
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

/// Transport over HTTP(S) using `reqwest`
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Creates a transport with default settings
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Creates a transport honouring the configured request timeout
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self { client })
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        debug!(method = %request.method, url = %request.url, "sending request");

        let mut builder = self.client.request(request.method.clone(), request.url.clone());
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        debug!(status, "received response");
        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_statuses() {
        let response = |status| HttpResponse {
            status,
            body: String::new(),
        };
        assert!(response(200).is_success());
        assert!(response(204).is_success());
        assert!(!response(302).is_success());
        assert!(!response(404).is_success());
        assert!(!response(500).is_success());
    }

    #[tokio::test]
    async fn test_connection_refused_is_request_error() {
        let transport = HttpTransport::new();
        let request = HttpRequest {
            method: Method::GET,
            url: Url::parse("http://127.0.0.1:1/document/did:sidetree:abc").unwrap(),
            body: None,
        };
        assert!(matches!(
            transport.send(&request).await,
            Err(crate::error::ClientError::RequestError(_))
        ));
    }
}
