//! Identity service client: API-key authentication and per-section token
//! memoization.

use std::sync::Arc;

use http::header::{ACCEPT, CONTENT_TYPE, HeaderValue};
use http::{HeaderMap, Method};
use serde_json::{Value, json};
use url::Url;

#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::cache::TokenCache;
use crate::config::ExtensionConfig;
use crate::error::ClientError;
use crate::transport::{BoxFuture, HttpTransport, RestRequest};

const AUTH_CONTEXT: &str = "POST /v2.0/tokens";

/// Yields an identity token for a user section.
pub trait TokenSource: Send + Sync {
    /// Returns a token for `section`.
    fn token<'a>(&'a self, section: &'a str) -> BoxFuture<'a, Result<String, ClientError>>;
}

/// A [`TokenSource`] returning one pre-issued token for every section.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    /// Wraps a pre-issued token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("StaticToken").finish_non_exhaustive()
    }
}

impl TokenSource for StaticToken {
    fn token<'a>(&'a self, _section: &'a str) -> BoxFuture<'a, Result<String, ClientError>> {
        Box::pin(async move { Ok(self.0.clone()) })
    }
}

/// Normalizes an identity endpoint to its v2.0 tokens URL.
///
/// ```
/// use rax_client::identity::tokens_url;
///
/// assert_eq!(tokens_url("https://id.example/v2.0/"), "https://id.example/v2.0/tokens");
/// assert_eq!(tokens_url("https://id.example/v2.0"), "https://id.example/v2.0/tokens");
/// assert_eq!(tokens_url("https://id.example/v2.0/tokens"), "https://id.example/v2.0/tokens");
/// assert_eq!(tokens_url("https://id.example"), "https://id.example/v2.0/tokens");
/// ```
#[must_use]
pub fn tokens_url(endpoint: &str) -> String {
    if endpoint.ends_with("/v2.0/") {
        format!("{endpoint}tokens")
    } else if endpoint.ends_with("/v2.0") {
        format!("{endpoint}/tokens")
    } else if endpoint.ends_with("/v2.0/tokens") {
        endpoint.to_owned()
    } else {
        format!("{endpoint}/v2.0/tokens")
    }
}

/// Client for the identity service's API-key token endpoint.
pub struct IdentityClient {
    config: Arc<ExtensionConfig>,
    transport: Arc<dyn HttpTransport>,
    tokens: TokenCache,
}

impl std::fmt::Debug for IdentityClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityClient")
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}

impl IdentityClient {
    /// Creates a client reading credentials from `config`.
    #[must_use]
    pub fn new(config: Arc<ExtensionConfig>, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            config,
            transport,
            tokens: TokenCache::default(),
        }
    }

    /// The token cache backing [`IdentityClient::get_token`].
    #[must_use]
    pub const fn tokens(&self) -> &TokenCache {
        &self.tokens
    }

    /// Authenticates with an API key and returns the `access` object.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Auth`] if the response is empty or carries no
    /// `access` object, or any transport / status error.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "rax.identity.authenticate", skip(self, api_key), err)
    )]
    pub async fn authenticate(
        &self,
        endpoint: &str,
        username: &str,
        api_key: &str,
    ) -> Result<Value, ClientError> {
        let url = Url::parse(&tokens_url(endpoint)).map_err(|source| ClientError::UrlParse {
            context: "Failed to construct identity tokens URL",
            source,
        })?;
        let body = json!({
            "auth": {
                "RAX-KSKEY:apiKeyCredentials": {
                    "username": username,
                    "apiKey": api_key,
                }
            }
        });

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let request = RestRequest::new(Method::POST, url, AUTH_CONTEXT)
            .with_headers(headers)
            .with_body(body.to_string());

        let response = self
            .transport
            .send(request)
            .await?
            .error_for_status(AUTH_CONTEXT)?;
        if response.text().trim().is_empty() {
            return Err(ClientError::Auth("empty response from identity service".into()));
        }
        let mut body = response.json(AUTH_CONTEXT)?;
        if body.is_null() || body.as_object().is_some_and(serde_json::Map::is_empty) {
            return Err(ClientError::Auth("empty response from identity service".into()));
        }
        match body.get_mut("access").map(Value::take) {
            Some(access) if !is_blank(&access) => Ok(access),
            _ => Err(ClientError::Auth("no `access` object in identity response".into())),
        }
    }

    /// Authenticates with the credentials of a user section.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] if the section cannot be resolved,
    /// otherwise see [`IdentityClient::authenticate`].
    pub async fn authenticate_section(&self, section: &str) -> Result<Value, ClientError> {
        let credentials = self.config.credentials(section)?;
        self.authenticate(
            &credentials.endpoint,
            &credentials.username,
            &credentials.api_key,
        )
        .await
    }

    /// Returns the token id for a user section, authenticating at most once
    /// per section until [`IdentityClient::invalidate`] is called.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Auth`] if `access.token.id` is missing, or any
    /// error from [`IdentityClient::authenticate_section`].
    pub async fn get_token(&self, section: &str) -> Result<String, ClientError> {
        if let Some(token) = self.tokens.get(section).await {
            return Ok(token);
        }

        let access = self.authenticate_section(section).await?;
        let token = access
            .pointer("/token/id")
            .and_then(Value::as_str)
            .ok_or_else(|| ClientError::Auth("no `access.token.id` in identity response".into()))?
            .to_owned();
        self.tokens.insert(section, token.clone()).await;
        Ok(token)
    }

    /// Forgets the token of a user section.
    pub async fn invalidate(&self, section: &str) {
        self.tokens.invalidate(section).await;
    }
}

impl TokenSource for IdentityClient {
    fn token<'a>(&'a self, section: &'a str) -> BoxFuture<'a, Result<String, ClientError>> {
        Box::pin(self.get_token(section))
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::String(s) => s.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ReqwestTransport;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> IdentityClient {
        let toml = format!(
            "[user]\nendpoint = \"{}/v2.0\"\nusername = \"fuzzer\"\napi_key = \"k-1\"\n\n\
             [users.admin]\nusername = \"admin\"\n",
            server.uri()
        );
        let config = ExtensionConfig::from_toml(&toml).unwrap();
        IdentityClient::new(Arc::new(config), Arc::new(ReqwestTransport::new()))
    }

    fn access(token: &str) -> Value {
        json!({"access": {"token": {"id": token, "expires": "2030-01-01T00:00:00Z"}}})
    }

    #[test]
    fn test_tokens_url_normalization() {
        assert_eq!(tokens_url("http://h/v2.0/"), "http://h/v2.0/tokens");
        assert_eq!(tokens_url("http://h/v2.0"), "http://h/v2.0/tokens");
        assert_eq!(tokens_url("http://h/v2.0/tokens"), "http://h/v2.0/tokens");
        assert_eq!(tokens_url("http://h/identity"), "http://h/identity/v2.0/tokens");
    }

    #[tokio::test]
    async fn test_authenticate_posts_api_key_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2.0/tokens"))
            .and(body_json(json!({
                "auth": {"RAX-KSKEY:apiKeyCredentials": {"username": "u", "apiKey": "k"}}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(access("t-1")))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let access = client.authenticate(&server.uri(), "u", "k").await.unwrap();
        assert_eq!(access["token"]["id"], json!("t-1"));
    }

    #[tokio::test]
    async fn test_get_token_is_memoized_per_section() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2.0/tokens"))
            .respond_with(ResponseTemplate::new(200).set_body_json(access("t-1")))
            .expect(3)
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert_eq!(client.get_token("user").await.unwrap(), "t-1");
        assert_eq!(client.get_token("user").await.unwrap(), "t-1");
        assert_eq!(client.token("admin").await.unwrap(), "t-1");

        client.invalidate("user").await;
        assert_eq!(client.get_token("user").await.unwrap(), "t-1");
    }

    #[tokio::test]
    async fn test_missing_access_is_an_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": {}})))
            .mount(&server)
            .await;

        let err = client_for(&server).get_token("user").await.unwrap_err();
        assert!(matches!(err, ClientError::Auth(_)));
    }

    #[tokio::test]
    async fn test_empty_body_is_an_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let err = client_for(&server).get_token("user").await.unwrap_err();
        assert!(matches!(err, ClientError::Auth(_)));
    }

    #[tokio::test]
    async fn test_rejected_credentials_surface_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .mount(&server)
            .await;

        let err = client_for(&server).get_token("user").await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::HttpStatus { status, .. } if status == http::StatusCode::UNAUTHORIZED
        ));
        assert!(client_for(&server).tokens().get("user").await.is_none());
    }

    #[tokio::test]
    async fn test_unknown_section_is_a_config_error() {
        let server = MockServer::start().await;
        let err = client_for(&server).get_token("ghost").await.unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[tokio::test]
    async fn test_static_token() {
        let source = StaticToken::new("pre-issued");
        assert_eq!(source.token("any").await.unwrap(), "pre-issued");
        assert!(!format!("{source:?}").contains("pre-issued"));
    }
}
