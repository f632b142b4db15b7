//! Client for the Rackspace billing system's payment extension.
//!
//! The billing system speaks JSON only. Every listing is memoized in a
//! [`SessionCache`](rax_client::SessionCache) shared by the client, and the
//! `get_one_*` helpers pick the first entry of the matching listing so a
//! caller can obtain a live identifier without knowing the account contents.
//!
//! ```no_run
//! # async fn demo() -> Result<(), rax_client::ClientError> {
//! use std::sync::Arc;
//!
//! use rax_billing::BillingClient;
//! use rax_client::{ExtensionConfig, IdentityClient, ReqwestTransport};
//!
//! let config = Arc::new(ExtensionConfig::load()?);
//! let transport = Arc::new(ReqwestTransport::new());
//! let identity = Arc::new(IdentityClient::new(Arc::clone(&config), transport.clone()));
//! let billing = BillingClient::from_config(&config, transport, identity)?;
//!
//! let method_id = billing.get_one_method_id().await?;
//! println!("first method: {method_id}");
//! # Ok(())
//! # }
//! ```
//!
//! # Feature Flags
//!
//! - `telemetry`: a `tracing` span per operation

pub mod client;

pub use client::BillingClient;
