//! Generic REST resource client shared by the billing and payment clients.
//!
//! Every operation is one HTTP call: resolve the endpoint against the API
//! base URL, attach `accept`, `content-type` and `x-auth-token` headers,
//! send through the [`HttpTransport`], then map the body through the model
//! layer. Non-2xx statuses become [`ClientError::HttpStatus`].

use std::fmt::Display;
use std::sync::Arc;

use http::header::{ACCEPT, CONTENT_TYPE, HeaderName, HeaderValue};
use http::{HeaderMap, Method};
use rax_models::{Format, Listable, Listing, Model, envelope};
use serde_json::Value;
use url::Url;

#[cfg(feature = "telemetry")]
use tracing::Span;

use crate::config::DEFAULT_USER_SECTION;
use crate::error::ClientError;
use crate::identity::TokenSource;
use crate::transport::{HttpTransport, RestRequest, RestResponse};

/// Header carrying the identity token.
pub const AUTH_TOKEN_HEADER: HeaderName = HeaderName::from_static("x-auth-token");

/// Low-level client for one REST API.
#[derive(Clone)]
pub struct ResourceClient {
    base_url: Url,
    transport: Arc<dyn HttpTransport>,
    tokens: Arc<dyn TokenSource>,
    user_section: String,
}

impl std::fmt::Debug for ResourceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceClient")
            .field("base_url", &self.base_url.as_str())
            .field("user_section", &self.user_section)
            .finish_non_exhaustive()
    }
}

impl ResourceClient {
    /// Creates a client for the API rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::UrlParse`] if `base_url` is not a valid URL.
    pub fn try_new(
        base_url: &str,
        transport: Arc<dyn HttpTransport>,
        tokens: Arc<dyn TokenSource>,
    ) -> Result<Self, ClientError> {
        // Normalize: strip trailing slashes and add a single trailing slash
        let mut normalized = base_url.trim_end_matches('/').to_owned();
        normalized.push('/');
        let base_url = Url::parse(&normalized).map_err(|source| ClientError::UrlParse {
            context: "Failed to parse API base url",
            source,
        })?;
        Ok(Self {
            base_url,
            transport,
            tokens,
            user_section: DEFAULT_USER_SECTION.to_owned(),
        })
    }

    /// Authenticates as a different user section.
    #[must_use]
    pub fn with_user_section(mut self, section: impl Into<String>) -> Self {
        self.user_section = section.into();
        self
    }

    /// Returns the API base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns the user section tokens are requested for.
    #[must_use]
    pub fn user_section(&self) -> &str {
        &self.user_section
    }

    /// Resolves an absolute resource path against the base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::UrlParse`] if the joined URL is invalid.
    pub fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|source| ClientError::UrlParse {
                context: "Failed to construct resource URL",
                source,
            })
    }

    /// Builds request headers: `accept` and `content-type` when given, and
    /// always the token of the configured user section.
    ///
    /// # Errors
    ///
    /// Returns any error from the token source, or
    /// [`ClientError::InvalidHeader`] if the token is not a valid header.
    pub async fn headers(
        &self,
        accept: Option<Format>,
        content_type: Option<Format>,
    ) -> Result<HeaderMap, ClientError> {
        let mut headers = HeaderMap::new();
        if let Some(format) = accept {
            headers.insert(ACCEPT, HeaderValue::from_static(format.media_type()));
        }
        if let Some(format) = content_type {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(format.media_type()));
        }
        let token = self.tokens.token(&self.user_section).await?;
        let token = HeaderValue::from_str(&token).map_err(|source| ClientError::InvalidHeader {
            context: "x-auth-token",
            source,
        })?;
        headers.insert(AUTH_TOKEN_HEADER, token);
        Ok(headers)
    }

    async fn call(
        &self,
        method: Method,
        path: &str,
        context: &'static str,
        headers: HeaderMap,
        body: Option<String>,
    ) -> Result<RestResponse, ClientError> {
        let mut request =
            RestRequest::new(method, self.endpoint(path)?, context).with_headers(headers);
        if let Some(body) = body {
            request = request.with_body(body);
        }
        let result = match self.transport.send(request).await {
            Ok(response) => response.error_for_status(context),
            Err(err) => Err(err),
        };
        record_result_on_span(&result);
        result
    }

    /// `GET`s a listing and keys its entries by id.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::HttpStatus`] for non-2xx statuses and
    /// [`ClientError::Model`] if the body is not a well-formed listing.
    pub async fn list<T: Listable>(
        &self,
        path: &str,
        context: &'static str,
        response: Format,
    ) -> Result<Listing<T>, ClientError> {
        let headers = self.headers(Some(response), None).await?;
        let reply = self.call(Method::GET, path, context, headers, None).await?;
        Ok(Listing::decode(reply.text(), response)?)
    }

    /// `GET`s a single resource.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::HttpStatus`] for non-2xx statuses and
    /// [`ClientError::Model`] if the body does not map onto `T`.
    pub async fn get<T: Model>(
        &self,
        path: &str,
        context: &'static str,
        response: Format,
    ) -> Result<T, ClientError> {
        let headers = self.headers(Some(response), None).await?;
        let reply = self.call(Method::GET, path, context, headers, None).await?;
        Ok(T::decode(reply.text(), response)?)
    }

    /// `POST`s pre-encoded body text and returns the parsed response body in
    /// its dictionary form.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::HttpStatus`] for non-2xx statuses and
    /// [`ClientError::Model`] if the response is malformed.
    pub async fn post(
        &self,
        path: &str,
        context: &'static str,
        body: String,
        request: Format,
        response: Format,
    ) -> Result<Value, ClientError> {
        let headers = self.headers(Some(response), Some(request)).await?;
        let reply = self
            .call(Method::POST, path, context, headers, Some(body))
            .await?;
        Ok(envelope::parse_body(reply.text(), response)?)
    }

    /// `POST`s a model's envelope and maps the response back onto the same
    /// model type.
    ///
    /// # Errors
    ///
    /// See [`ResourceClient::post`].
    pub async fn create<T: Model>(
        &self,
        path: &str,
        context: &'static str,
        model: &T,
        request: Format,
        response: Format,
    ) -> Result<T, ClientError> {
        let body = model.encode(request)?;
        let reply = self.post(path, context, body, request, response).await?;
        Ok(T::from_body(&reply)?)
    }

    /// `DELETE`s a resource; any 2xx status is success.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::HttpStatus`] for non-2xx statuses.
    pub async fn delete(&self, path: &str, context: &'static str) -> Result<(), ClientError> {
        let headers = self.headers(None, None).await?;
        self.call(Method::DELETE, path, context, headers, None)
            .await
            .map(drop)
    }
}

/// The first entry of a listing, cloned, with its id.
///
/// # Errors
///
/// Returns [`ClientError::EmptyListing`] if the listing has no entries.
pub fn first_entry<T: Listable + Clone>(listing: &Listing<T>) -> Result<(String, T), ClientError> {
    listing
        .first()
        .map(|(id, item)| (id.to_owned(), item.clone()))
        .ok_or(ClientError::EmptyListing(T::ITEM))
}

/// Records the outcome of a request on a tracing span, including status and errors.
#[cfg(feature = "telemetry")]
fn record_result_on_span<R, E: Display>(result: &Result<R, E>) {
    let span = Span::current();
    match result {
        Ok(_) => {
            span.record("otel.status_code", "OK");
        }
        Err(err) => {
            span.record("otel.status_code", "ERROR");
            span.record("error.message", tracing::field::display(err));
            tracing::event!(tracing::Level::ERROR, error = %err, "Request to API failed");
        }
    }
}

/// Records the outcome of a request on a tracing span, including status and errors.
/// Noop if telemetry feature is off.
#[cfg(not(feature = "telemetry"))]
fn record_result_on_span<R, E: Display>(_result: &Result<R, E>) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::StaticToken;
    use crate::transport::ReqwestTransport;
    use rax_models::{PaymentMethod, Refund};
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> ResourceClient {
        ResourceClient::try_new(
            &server.uri(),
            Arc::new(ReqwestTransport::new()),
            Arc::new(StaticToken::new("tok")),
        )
        .unwrap()
    }

    #[test]
    fn test_endpoint_replaces_base_path() {
        let client = ResourceClient::try_new(
            "https://api.example.com/some/prefix//",
            Arc::new(ReqwestTransport::new()),
            Arc::new(StaticToken::new("tok")),
        )
        .unwrap();
        assert_eq!(client.base_url().as_str(), "https://api.example.com/some/prefix/");
        assert_eq!(
            client.endpoint("/v1/accounts/7/methods").unwrap().as_str(),
            "https://api.example.com/v1/accounts/7/methods"
        );
    }

    #[test]
    fn test_bad_base_url() {
        let err = ResourceClient::try_new(
            "not a url",
            Arc::new(ReqwestTransport::new()),
            Arc::new(StaticToken::new("tok")),
        )
        .unwrap_err();
        assert!(matches!(err, ClientError::UrlParse { .. }));
    }

    #[tokio::test]
    async fn test_list_sends_accept_and_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/accounts/7/methods"))
            .and(header("accept", "application/json"))
            .and(header("x-auth-token", "tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "methods": {"method": [{"id": "urn:uuid:1", "paymentCard": {}}]}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let listing: Listing<PaymentMethod> = client(&server)
            .list("/v1/accounts/7/methods", "GET methods", Format::Json)
            .await
            .unwrap();
        assert_eq!(listing.ids().collect::<Vec<_>>(), vec!["1"]);
    }

    #[tokio::test]
    async fn test_list_without_container_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"oops": {}})))
            .mount(&server)
            .await;

        let err = client(&server)
            .list::<Refund>("/v1/accounts/7/refunds", "GET refunds", Format::Json)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Model(_)));
    }

    #[tokio::test]
    async fn test_create_posts_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/accounts/7/refunds"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({"papi:refund": {"refundAmount": "5"}})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "papi:refund": {"id": "urn:uuid:r-1", "refundAmount": "5", "status": "NEW"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let refund = Refund {
            refund_amount: Some("5".parse().unwrap()),
            ..Refund::default()
        };
        let created = client(&server)
            .create(
                "/v1/accounts/7/refunds",
                "POST refunds",
                &refund,
                Format::Json,
                Format::Json,
            )
            .await
            .unwrap();
        assert_eq!(created.refund_id.as_deref(), Some("r-1"));
        assert_eq!(created.status.as_deref(), Some("NEW"));
    }

    #[tokio::test]
    async fn test_xml_round_trip_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("content-type", "application/xml"))
            .and(header("accept", "application/xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<ns2:refund xmlns:ns2="http://docs.rackspace.com/papi/v1"><ns2:id>r-2</ns2:id></ns2:refund>"#,
            ))
            .mount(&server)
            .await;

        let created = client(&server)
            .create(
                "/v1/accounts/7/refunds",
                "POST refunds",
                &Refund::default(),
                Format::Xml,
                Format::Xml,
            )
            .await
            .unwrap();
        assert_eq!(created.refund_id.as_deref(), Some("r-2"));
    }

    #[tokio::test]
    async fn test_delete_accepts_any_success() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/v1/accounts/7/methods/m-1"))
            .and(header("x-auth-token", "tok"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .delete("/v1/accounts/7/methods/m-1", "DELETE method")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_error_status_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let err = client(&server)
            .get::<Refund>("/v1/refunds/1", "GET refund", Format::Json)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::HttpStatus { context: "GET refund", ref body, .. } if body == "maintenance"
        ));
    }

    #[test]
    fn test_first_entry() {
        let listing: Listing<Refund> =
            Listing::from_body(&json!({"refunds": {"refund": [{"id": "a"}, {"id": "b"}]}}))
                .unwrap();
        assert_eq!(first_entry(&listing).unwrap().0, "a");

        let empty: Listing<Refund> = Listing::default();
        assert!(matches!(
            first_entry(&empty),
            Err(ClientError::EmptyListing("refund"))
        ));
    }
}
