//! Client for the Rackspace payment system's extension API.
//!
//! Unlike the billing system, the payment system accepts JSON and XML
//! bodies and serves any account the caller's token may reach, so every
//! [`PaymentClient`] operation takes [`CallOptions`] naming the account and
//! the request and response formats.
//!
//! ```no_run
//! # async fn demo(client: rax_payment::PaymentClient) -> Result<(), rax_client::ClientError> {
//! use rax_models::{MethodInstrument, PaymentCardMethod};
//! use rax_payment::CallOptions;
//!
//! let card = MethodInstrument::from(PaymentCardMethod {
//!     card_number: Some("4111111111111111".into()),
//!     expiration_date: Some("12/30".into()),
//!     ..PaymentCardMethod::default()
//! });
//! let method = client.create_payment_method(&card, CallOptions::xml()).await?;
//! client
//!     .delete_payment_method(method.method_id.as_deref().unwrap_or_default(), CallOptions::new())
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Feature Flags
//!
//! - `telemetry`: a `tracing` span per operation

pub mod client;
pub mod options;

pub use client::PaymentClient;
pub use options::CallOptions;
