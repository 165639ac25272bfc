//! Template service HTTP client.
//!
//! Blocking reqwest client (no Tokio runtime required). Two calls: schema
//! discovery (JSON in, JSON out) and document generation (JSON in, opaque
//! bytes out).

use std::time::Duration;

use docforge_protocol::{DiscoveryRequest, DiscoveryResult, GenerateRequest};

/// Template service API client (blocking).
#[derive(Clone)]
pub struct ServiceClient {
    http: reqwest::blocking::Client,
    base_url: String,
}

/// Error type for service operations.
#[derive(Debug)]
pub enum ServiceError {
    /// Network error
    Network(String),
    /// HTTP error with status code
    Http(u16, String),
    /// JSON parsing error
    Parse(String),
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::Network(msg) => write!(f, "Network error: {}", msg),
            ServiceError::Http(code, msg) => write!(f, "HTTP {}: {}", code, msg),
            ServiceError::Parse(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for ServiceError {}

impl ServiceClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::blocking::Client::builder()
            .user_agent(format!("dforge/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Run schema discovery over the given documents.
    pub fn discover(&self, request: &DiscoveryRequest) -> Result<DiscoveryResult, ServiceError> {
        let url = format!("{}/discover-schema", self.base_url);
        let resp = self.post_json(&url, request)?;
        resp.json::<DiscoveryResult>()
            .map_err(|e| ServiceError::Parse(e.to_string()))
    }

    /// Generate the final document. The response body is the regenerated
    /// document as opaque bytes.
    pub fn generate(&self, request: &GenerateRequest) -> Result<Vec<u8>, ServiceError> {
        let url = format!("{}/generate-document", self.base_url);
        let resp = self.post_json(&url, request)?;
        resp.bytes()
            .map(|b| b.to_vec())
            .map_err(|e| ServiceError::Network(e.to_string()))
    }

    fn post_json<T: serde::Serialize>(
        &self,
        url: &str,
        body: &T,
    ) -> Result<reqwest::blocking::Response, ServiceError> {
        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            // The service wraps error messages as {"detail": "..."}.
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v["detail"].as_str().map(String::from))
                .unwrap_or(body);
            return Err(ServiceError::Http(status.as_u16(), message));
        }
        Ok(resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = ServiceClient::new("http://localhost:8000/");
        assert_eq!(client.base_url, "http://localhost:8000");
    }

    #[test]
    fn test_network_error_against_unroutable_host() {
        // Nothing listens here; the call must surface a network error, not panic.
        let client = ServiceClient::new("http://127.0.0.1:1");
        let result = client.discover(&DiscoveryRequest::default());
        assert!(matches!(result, Err(ServiceError::Network(_))));
    }
}
