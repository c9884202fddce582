//! HTTP transport
//!
//! The fetch engine only needs a blocking GET that exposes the status, the
//! body and the `Link` header. [`Transport`] is that seam; [`HttpTransport`]
//! implements it over `reqwest`'s blocking client.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::LINK;
use tracing::debug;

use crate::error::Result;

/// Default request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default user agent
pub const DEFAULT_USER_AGENT: &str = concat!("openregister/", env!("CARGO_PKG_VERSION"));

/// A response as seen by the fetch engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: String,
    /// Raw `Link` header, if present
    pub link: Option<String>,
}

impl HttpResponse {
    /// A 200 response with no `Link` header
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            link: None,
        }
    }

    /// A 404 response
    pub fn not_found() -> Self {
        Self {
            status: 404,
            body: String::new(),
            link: None,
        }
    }

    /// Attach a `Link` header
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }
}

/// Blocking GET
pub trait Transport: Send + Sync {
    /// Issue one GET request. Non-success statuses are returned, not raised.
    fn get(&self, url: &str) -> Result<HttpResponse>;
}

/// `reqwest`-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport with the given timeout and user agent
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> Result<HttpResponse> {
        debug!(url, "GET");
        let response = self.client.get(url).send()?;
        let status = response.status().as_u16();
        let link = response
            .headers()
            .get(LINK)
            .and_then(|value| value.to_str().ok())
            .map(String::from);
        let body = response.text()?;
        debug!(url, status, bytes = body.len(), "response");
        Ok(HttpResponse { status, body, link })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_helpers() {
        let ok = HttpResponse::ok("a\tb").with_link("<?page-index=2>; rel=\"next\"");
        assert!(ok.is_success());
        assert!(!ok.is_not_found());
        assert!(ok.link.is_some());

        let missing = HttpResponse::not_found();
        assert!(!missing.is_success());
        assert!(missing.is_not_found());
    }
}
