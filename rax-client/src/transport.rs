//! The HTTP transport seam.
//!
//! Clients never talk to `reqwest` directly; they hand a [`RestRequest`] to
//! an [`HttpTransport`] and get a fully read [`RestResponse`] back. The
//! fuzzing harness can plug in its own transport (one that sanitizes or
//! records traffic) without touching the clients.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use http::{HeaderMap, Method, StatusCode};
use serde_json::Value;
use url::Url;

use crate::error::ClientError;

/// A boxed, `Send` future, as returned by object-safe async traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A single outgoing request.
#[derive(Debug, Clone)]
pub struct RestRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute request URL.
    pub url: Url,
    /// Request headers.
    pub headers: HeaderMap,
    /// Serialized body, if any.
    pub body: Option<String>,
    /// Human-readable identifier used in errors and spans, e.g.
    /// `"GET /v1/accounts/{ran}/methods"`.
    pub context: &'static str,
}

impl RestRequest {
    /// A request without headers or body.
    #[must_use]
    pub fn new(method: Method, url: Url, context: &'static str) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            context,
        }
    }

    /// Replaces the request headers.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// A fully read response.
#[derive(Debug, Clone)]
pub struct RestResponse {
    /// Response status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Raw response body.
    pub body: String,
}

impl RestResponse {
    /// Raw body text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.body
    }

    /// Parses the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::JsonDeserialization`] if the body is not JSON.
    pub fn json(&self, context: &'static str) -> Result<Value, ClientError> {
        serde_json::from_str(&self.body)
            .map_err(|source| ClientError::JsonDeserialization { context, source })
    }

    /// Passes 2xx responses through and turns every other status into
    /// [`ClientError::HttpStatus`].
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::HttpStatus`] for non-2xx statuses.
    pub fn error_for_status(self, context: &'static str) -> Result<Self, ClientError> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(ClientError::HttpStatus {
                context,
                status: self.status,
                body: self.body,
            })
        }
    }
}

/// Sends requests on behalf of the clients.
pub trait HttpTransport: Send + Sync {
    /// Sends one request and reads the whole response.
    ///
    /// Non-2xx statuses are returned as responses, not errors.
    fn send(&self, request: RestRequest) -> BoxFuture<'_, Result<RestResponse, ClientError>>;
}

/// [`HttpTransport`] over a shared `reqwest` client.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    timeout: Option<Duration>,
}

impl ReqwestTransport {
    /// A transport with a fresh client and no timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses an existing `reqwest` client.
    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Sets a timeout for all future requests.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns the configured timeout, if any.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl HttpTransport for ReqwestTransport {
    fn send(&self, request: RestRequest) -> BoxFuture<'_, Result<RestResponse, ClientError>> {
        Box::pin(async move {
            let RestRequest {
                method,
                url,
                headers,
                body,
                context,
            } = request;
            let mut req = self.client.request(method, url).headers(headers);
            if let Some(body) = body {
                req = req.body(body);
            }
            if let Some(timeout) = self.timeout {
                req = req.timeout(timeout);
            }
            let response = req
                .send()
                .await
                .map_err(|source| ClientError::Http { context, source })?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response
                .text()
                .await
                .map_err(|source| ClientError::ResponseBodyRead { context, source })?;
            Ok(RestResponse {
                status,
                headers,
                body,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_reqwest_transport_sends_headers_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/echo"))
            .and(header("x-auth-token", "t-1"))
            .and(body_string("{\"a\":1}"))
            .respond_with(ResponseTemplate::new(201).set_body_string("{\"ok\":true}"))
            .expect(1)
            .mount(&server)
            .await;

        let mut headers = HeaderMap::new();
        headers.insert("x-auth-token", "t-1".parse().unwrap());
        let url = Url::parse(&format!("{}/echo", server.uri())).unwrap();
        let request = RestRequest::new(Method::POST, url, "POST /echo")
            .with_headers(headers)
            .with_body("{\"a\":1}");

        let response = ReqwestTransport::new()
            .with_timeout(Duration::from_secs(5))
            .send(request)
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::CREATED);
        assert_eq!(response.json("POST /echo").unwrap()["ok"], Value::Bool(true));
    }

    #[tokio::test]
    async fn test_non_success_status_is_returned_then_mapped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("gone"))
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        let response = ReqwestTransport::new()
            .send(RestRequest::new(Method::GET, url, "GET /"))
            .await
            .unwrap();
        assert_eq!(response.text(), "gone");

        let err = response.error_for_status("GET /").unwrap_err();
        assert!(matches!(
            err,
            ClientError::HttpStatus { status, ref body, .. }
                if status == StatusCode::NOT_FOUND && body == "gone"
        ));
    }

    #[test]
    fn test_json_error_carries_context() {
        let response = RestResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: "<xml/>".into(),
        };
        assert!(matches!(
            response.json("GET /x"),
            Err(ClientError::JsonDeserialization { context: "GET /x", .. })
        ));
    }
}
