//! Error types for the REST plumbing.

use http::StatusCode;
use rax_models::ModelError;

use crate::config::ConfigError;

/// Errors that can occur while talking to the billing, payment or identity
/// APIs.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// URL parse error.
    #[error("URL parse error: {context}: {source}")]
    UrlParse {
        /// Human-readable context.
        context: &'static str,
        /// The underlying parse error.
        #[source]
        source: url::ParseError,
    },
    /// A header value could not be built.
    #[error("invalid header value: {context}: {source}")]
    InvalidHeader {
        /// Human-readable context.
        context: &'static str,
        /// The underlying header error.
        #[source]
        source: http::header::InvalidHeaderValue,
    },
    /// HTTP transport error.
    #[error("HTTP error: {context}: {source}")]
    Http {
        /// Human-readable context.
        context: &'static str,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// Unexpected HTTP status code.
    #[error("Unexpected HTTP status {status}: {context}: {body}")]
    HttpStatus {
        /// Human-readable context.
        context: &'static str,
        /// The HTTP status code.
        status: StatusCode,
        /// The response body.
        body: String,
    },
    /// Failed to read response body.
    #[error("Failed to read response body as text: {context}: {source}")]
    ResponseBodyRead {
        /// Human-readable context.
        context: &'static str,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// The response body was not valid JSON.
    #[error("Failed to deserialize JSON: {context}: {source}")]
    JsonDeserialization {
        /// Human-readable context.
        context: &'static str,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// The identity service did not issue a usable token.
    #[error("authentication failed: {0}")]
    Auth(String),
    /// Configuration could not be loaded or lacks a required value.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A body could not be mapped to or from a model.
    #[error("model error: {0}")]
    Model(#[from] ModelError),
    /// A listing had no entries where one was required.
    #[error("no `{0}` entries listed")]
    EmptyListing(&'static str),
}
