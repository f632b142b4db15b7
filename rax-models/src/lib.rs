//! Wire models for the Rackspace billing and payment APIs.
//!
//! Every resource implements [`Model`], which maps it to a JSON-shaped
//! dictionary; JSON and XML are both derived from that one mapping. XML is
//! read namespace-agnostically, identifiers lose their `urn:uuid:` wrapper on
//! input, and null, `[]` and `{}` values are pruned on output.
//!
//! # Modules
//!
//! - [`method`]: payment methods and their four instrument variants
//! - [`validation`]: method validations and method associations
//! - [`payment`]: payments, voids and refunds
//! - [`listing`]: keyed listings decoded from `{plural: {singular: [...]}}`
//! - [`envelope`], [`xml`], [`naming`]: the codec building blocks
//!
//! # Example
//!
//! ```
//! use rax_models::{MethodKind, Model, PaymentMethod};
//!
//! let method = PaymentMethod::from_json(
//!     r#"{"method": {"id": "urn:uuid:abc-123", "paymentCard": {"cardNumber": "4111"}}}"#,
//! )
//! .unwrap();
//! assert_eq!(method.method_id.as_deref(), Some("abc-123"));
//! assert_eq!(method.kind(), MethodKind::PaymentCard);
//! ```

pub mod envelope;
pub mod error;
pub mod fields;
pub mod listing;
pub mod method;
pub mod model;
pub mod naming;
pub mod payment;
pub mod validation;
pub mod xml;

pub use error::ModelError;
pub use fields::Amount;
pub use listing::Listing;
pub use method::{
    AchMethod, MethodInstrument, MethodKind, PaymentCardMethod, PaymentMethod, SepaMethod,
    UkDebitMethod,
};
pub use model::{Format, Listable, Model, PAYMENT_API_XMLNS, UnknownFormat, prune_empty};
pub use naming::{strip_namespace, strip_urn_namespace};
pub use payment::{Payment, Refund, Void};
pub use validation::{MethodAssociation, MethodValidation, ValidationRequest};
pub use xml::XmlElement;
