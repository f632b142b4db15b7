//! REST plumbing shared by the Rackspace billing and payment extension
//! clients.
//!
//! # Modules
//!
//! - [`config`]: TOML configuration with `$VAR` expansion
//! - [`transport`]: the [`HttpTransport`] seam and its `reqwest` implementation
//! - [`identity`]: API-key authentication and the [`TokenSource`] seam
//! - [`cache`]: listing caches, registries and the token cache
//! - [`resource`]: the generic list / get / create / delete client
//!
//! # Feature Flags
//!
//! - `telemetry`: `tracing` spans and error events on every request

pub mod cache;
pub mod config;
pub mod error;
pub mod identity;
pub mod resource;
pub mod transport;

pub use cache::{CallSignature, ListingCache, Registry, SessionCache, TokenCache};
pub use config::{ConfigError, Credentials, ExtensionConfig};
pub use error::ClientError;
pub use identity::{IdentityClient, StaticToken, TokenSource};
pub use resource::{ResourceClient, first_entry};
pub use transport::{BoxFuture, HttpTransport, ReqwestTransport, RestRequest, RestResponse};

pub use rax_models as models;
