//! HTTP transport types and the `Transport` seam.
//!
//! # Design
//! Requests and responses are plain owned data. The core builds an
//! `HttpRequest` and parses an `HttpResponse` without touching the network;
//! a `Transport` implementation performs the actual GET in between. Every
//! Pinboard v1 call is a GET carrying all arguments in the query string, so
//! the request type has no method or body.
//!
//! The request URL embeds the auth token. `Debug` and `redacted_url` mask it
//! so requests can be logged safely.

use std::fmt;
use std::time::Duration;

use crate::error::TransportError;

/// Query parameter carrying the credential.
pub(crate) const AUTH_TOKEN_PARAM: &str = "auth_token";

/// An HTTP GET request described as plain data.
#[derive(Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    /// The request URL with the `auth_token` value replaced by `***`.
    pub fn redacted_url(&self) -> String {
        let Ok(mut parsed) = url::Url::parse(&self.url) else {
            return "<unparseable url>".to_string();
        };
        let pairs: Vec<(String, String)> = parsed
            .query_pairs()
            .map(|(k, v)| {
                let v = if k == AUTH_TOKEN_PARAM {
                    "***".to_string()
                } else {
                    v.into_owned()
                };
                (k.into_owned(), v)
            })
            .collect();
        parsed.query_pairs_mut().clear().extend_pairs(pairs);
        parsed.to_string()
    }
}

impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRequest")
            .field("url", &self.redacted_url())
            .field("headers", &self.headers)
            .finish()
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Executes an `HttpRequest` and hands back whatever the server answered.
///
/// Implementations must return non-2xx responses as `Ok` data; only failures
/// that prevent a response from being received are `Err`.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Blocking transport backed by `ureq`.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqTransport").finish_non_exhaustive()
    }
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::with_timeout(None)
    }

    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self.agent.get(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let mut response = builder.call().map_err(TransportError::new)?;

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
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(TransportError::new)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_masks_token() {
        let req = HttpRequest {
            url: "https://api.pinboard.in/v1/posts/update?format=json&auth_token=user%3ASECRET"
                .to_string(),
            headers: Vec::new(),
        };
        let shown = format!("{req:?}");
        assert!(!shown.contains("SECRET"), "{shown}");
        assert!(shown.contains("auth_token=***") || shown.contains("auth_token=%2A%2A%2A"));
        assert!(shown.contains("format=json"));
    }

    #[test]
    fn redacted_url_keeps_other_params() {
        let req = HttpRequest {
            url: "https://api.pinboard.in/v1/posts/get?url=http%3A%2F%2Fa.b&auth_token=x".to_string(),
            headers: Vec::new(),
        };
        let redacted = req.redacted_url();
        assert!(redacted.starts_with("https://api.pinboard.in/v1/posts/get?"));
        assert!(redacted.contains("url=http%3A%2F%2Fa.b"));
        assert!(!redacted.contains("auth_token=x"));
    }

    #[test]
    fn success_range() {
        let mut resp = HttpResponse {
            status: 200,
            headers: Vec::new(),
            body: String::new(),
        };
        assert!(resp.is_success());
        resp.status = 204;
        assert!(resp.is_success());
        resp.status = 302;
        assert!(!resp.is_success());
    }
}
