//! Payment methods and their four instrument variants.
//!
//! A payment method's instrument is chosen by which discriminant key the
//! body carries: `paymentCard`, `electronicCheck`, `ukDirectDebit` or
//! `sepa`. Exactly one must be present.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_with::skip_serializing_none;

use crate::error::ModelError;
use crate::model::{Listable, Model, dict_eq, from_dict_serde, pruned_dict, serde_model};

/// Discriminant of a payment-method instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodKind {
    /// Credit or debit card (`paymentCard`).
    PaymentCard,
    /// ACH electronic check (`electronicCheck`).
    ElectronicCheck,
    /// UK direct debit (`ukDirectDebit`).
    UkDirectDebit,
    /// SEPA direct debit (`sepa`).
    Sepa,
}

impl MethodKind {
    /// Every kind, in discriminant lookup order.
    pub const ALL: [Self; 4] = [
        Self::PaymentCard,
        Self::ElectronicCheck,
        Self::UkDirectDebit,
        Self::Sepa,
    ];

    /// Every discriminant key, in lookup order.
    pub const KEYS: &'static [&'static str] =
        &["paymentCard", "electronicCheck", "ukDirectDebit", "sepa"];

    /// Wire key of this kind.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::PaymentCard => "paymentCard",
            Self::ElectronicCheck => "electronicCheck",
            Self::UkDirectDebit => "ukDirectDebit",
            Self::Sepa => "sepa",
        }
    }

    /// Looks a kind up by wire key.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.key() == key)
    }

    /// Finds the single discriminant present in `data`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnrecognizedVariant`] if none is present and
    /// [`ModelError::AmbiguousVariant`] if more than one is.
    pub fn detect(data: &Map<String, Value>) -> Result<Self, ModelError> {
        let present: Vec<Self> = Self::ALL
            .into_iter()
            .filter(|kind| data.contains_key(kind.key()))
            .collect();
        match present.as_slice() {
            [kind] => Ok(*kind),
            [] => Err(ModelError::UnrecognizedVariant {
                expected: Self::KEYS,
            }),
            many => Err(ModelError::AmbiguousVariant {
                found: many.iter().map(|kind| kind.key()).collect(),
            }),
        }
    }
}

/// Card instrument fields.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCardMethod {
    /// Card security code.
    pub card_verification_number: Option<String>,
    /// Expiration date as sent by the API.
    pub expiration_date: Option<String>,
    /// Name on the card.
    pub card_holder_name: Option<String>,
    /// Card brand, e.g. `VISA`.
    pub card_type: Option<String>,
    /// Card number.
    pub card_number: Option<String>,
}

/// ACH electronic-check instrument fields.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchMethod {
    /// Bank account number.
    pub account_number: Option<String>,
    /// Account type, e.g. `CHECKING`.
    pub account_type: Option<String>,
    /// ACH payment type.
    pub ach_payment_type: Option<String>,
    /// Bank routing number.
    pub routing_number: Option<String>,
    /// Account holder.
    pub account_holder_name: Option<String>,
}

/// UK direct-debit instrument fields.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UkDebitMethod {
    /// Bank sort code.
    pub bank_sort_code: Option<String>,
    /// Bank account number.
    pub bank_number: Option<String>,
    /// Account holder.
    pub account_holder_name: Option<String>,
}

/// SEPA instrument fields.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SepaMethod {
    /// Bank identifier code.
    pub bic: Option<String>,
    /// International bank account number.
    pub iban: Option<String>,
    /// Account holder.
    pub account_holder_name: Option<String>,
}

serde_model!(PaymentCardMethod => "papi:method");
serde_model!(AchMethod => "papi:method");
serde_model!(UkDebitMethod => "papi:method");
serde_model!(SepaMethod => "papi:method");

/// The instrument carried by a payment method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodInstrument {
    /// `paymentCard`
    PaymentCard(PaymentCardMethod),
    /// `electronicCheck`
    ElectronicCheck(AchMethod),
    /// `ukDirectDebit`
    UkDirectDebit(UkDebitMethod),
    /// `sepa`
    Sepa(SepaMethod),
}

impl MethodInstrument {
    /// Discriminant of this instrument.
    #[must_use]
    pub const fn kind(&self) -> MethodKind {
        match self {
            Self::PaymentCard(_) => MethodKind::PaymentCard,
            Self::ElectronicCheck(_) => MethodKind::ElectronicCheck,
            Self::UkDirectDebit(_) => MethodKind::UkDirectDebit,
            Self::Sepa(_) => MethodKind::Sepa,
        }
    }

    /// An instrument of `kind` with every field absent.
    #[must_use]
    pub fn empty(kind: MethodKind) -> Self {
        match kind {
            MethodKind::PaymentCard => Self::PaymentCard(PaymentCardMethod::default()),
            MethodKind::ElectronicCheck => Self::ElectronicCheck(AchMethod::default()),
            MethodKind::UkDirectDebit => Self::UkDirectDebit(UkDebitMethod::default()),
            MethodKind::Sepa => Self::Sepa(SepaMethod::default()),
        }
    }

    /// Instrument fields as a pruned dictionary, without the discriminant.
    #[must_use]
    pub fn to_dict(&self) -> Map<String, Value> {
        match self {
            Self::PaymentCard(m) => m.to_dict(),
            Self::ElectronicCheck(m) => m.to_dict(),
            Self::UkDirectDebit(m) => m.to_dict(),
            Self::Sepa(m) => m.to_dict(),
        }
    }

    /// Builds an instrument of `kind` from its field body; `null` yields an
    /// empty instrument.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] if the body is not an object or a field has
    /// the wrong shape.
    pub fn from_value(kind: MethodKind, body: &Value) -> Result<Self, ModelError> {
        Ok(match kind {
            MethodKind::PaymentCard => Self::PaymentCard(PaymentCardMethod::from_value(body)?),
            MethodKind::ElectronicCheck => Self::ElectronicCheck(AchMethod::from_value(body)?),
            MethodKind::UkDirectDebit => Self::UkDirectDebit(UkDebitMethod::from_value(body)?),
            MethodKind::Sepa => Self::Sepa(SepaMethod::from_value(body)?),
        })
    }

    /// The `{"papi:method": {...}}` request envelope for this instrument.
    #[must_use]
    pub fn to_envelope(&self) -> Value {
        match self {
            Self::PaymentCard(m) => m.to_envelope(),
            Self::ElectronicCheck(m) => m.to_envelope(),
            Self::UkDirectDebit(m) => m.to_envelope(),
            Self::Sepa(m) => m.to_envelope(),
        }
    }

    /// Serializes the instrument's request envelope in `format`.
    ///
    /// # Errors
    ///
    /// See [`Model::encode`].
    pub fn encode(&self, format: crate::Format) -> Result<String, ModelError> {
        match self {
            Self::PaymentCard(m) => m.encode(format),
            Self::ElectronicCheck(m) => m.encode(format),
            Self::UkDirectDebit(m) => m.encode(format),
            Self::Sepa(m) => m.encode(format),
        }
    }
}

impl From<PaymentCardMethod> for MethodInstrument {
    fn from(method: PaymentCardMethod) -> Self {
        Self::PaymentCard(method)
    }
}

impl From<AchMethod> for MethodInstrument {
    fn from(method: AchMethod) -> Self {
        Self::ElectronicCheck(method)
    }
}

impl From<UkDebitMethod> for MethodInstrument {
    fn from(method: UkDebitMethod) -> Self {
        Self::UkDirectDebit(method)
    }
}

impl From<SepaMethod> for MethodInstrument {
    fn from(method: SepaMethod) -> Self {
        Self::Sepa(method)
    }
}

/// Fields of a payment method other than its instrument.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MethodFields {
    #[serde(default, deserialize_with = "crate::fields::urn_id")]
    id: Option<String>,
    creation_date: Option<String>,
    ran: Option<String>,
    status: Option<String>,
    #[serde(default, deserialize_with = "crate::fields::lenient_bool")]
    is_default: Option<bool>,
    modified_date: Option<String>,
    address_verification_information: Option<Map<String, Value>>,
    #[serde(default, deserialize_with = "crate::fields::lenient_bool")]
    level3_eligible: Option<bool>,
}

/// A stored payment method.
///
/// Equality compares the pruned dictionary form, so an empty address map
/// equals an absent one.
#[derive(Debug, Clone)]
pub struct PaymentMethod {
    /// Method identifier, `urn:uuid:` prefix removed.
    pub method_id: Option<String>,
    /// Creation timestamp as sent by the API.
    pub creation_date: Option<String>,
    /// Owning account number.
    pub ran: Option<String>,
    /// Method status.
    pub status: Option<String>,
    /// Whether this is the account's default method.
    pub is_default: Option<bool>,
    /// Last modification timestamp as sent by the API.
    pub modified_date: Option<String>,
    /// Billing address used for address verification.
    pub address_verification_information: Option<Map<String, Value>>,
    /// Whether the method is eligible for level-3 card data.
    pub level3_eligible: Option<bool>,
    /// The concrete instrument.
    pub instrument: MethodInstrument,
}

impl PaymentMethod {
    /// A method carrying only `instrument`.
    #[must_use]
    pub fn new(instrument: impl Into<MethodInstrument>) -> Self {
        Self {
            method_id: None,
            creation_date: None,
            ran: None,
            status: None,
            is_default: None,
            modified_date: None,
            address_verification_information: None,
            level3_eligible: None,
            instrument: instrument.into(),
        }
    }

    /// Discriminant of the instrument.
    #[must_use]
    pub const fn kind(&self) -> MethodKind {
        self.instrument.kind()
    }

    fn fields(&self) -> MethodFields {
        MethodFields {
            id: self.method_id.clone(),
            creation_date: self.creation_date.clone(),
            ran: self.ran.clone(),
            status: self.status.clone(),
            is_default: self.is_default,
            modified_date: self.modified_date.clone(),
            address_verification_information: self.address_verification_information.clone(),
            level3_eligible: self.level3_eligible,
        }
    }
}

impl Model for PaymentMethod {
    const ROOT: &'static str = "method";

    fn to_dict(&self) -> Map<String, Value> {
        let mut dict = pruned_dict(&self.fields());
        // The discriminant is kept even when the instrument body is empty.
        dict.insert(
            self.kind().key().to_owned(),
            Value::Object(self.instrument.to_dict()),
        );
        dict
    }

    fn from_dict(data: &Map<String, Value>) -> Result<Self, ModelError> {
        let kind = MethodKind::detect(data)?;
        let instrument = MethodInstrument::from_value(kind, &data[kind.key()])?;
        Self::with_fields(data, instrument)
    }
}

dict_eq!(PaymentMethod);

impl PaymentMethod {
    /// Builds a method from a create response.
    ///
    /// Create responses may carry the instrument fields inline, without a
    /// discriminant key; those are read as an instrument of `requested`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::AmbiguousVariant`] if several discriminants are
    /// present, or any field mapping error.
    pub fn from_created(
        data: &Map<String, Value>,
        requested: MethodKind,
    ) -> Result<Self, ModelError> {
        match MethodKind::detect(data) {
            Ok(_) => Self::from_dict(data),
            Err(ModelError::UnrecognizedVariant { .. }) => {
                let instrument =
                    MethodInstrument::from_value(requested, &Value::Object(data.clone()))?;
                Self::with_fields(data, instrument)
            }
            Err(err) => Err(err),
        }
    }

    /// Builds a method from a parsed create response body, with or without
    /// its envelope.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnexpectedShape`] if the body is not an object,
    /// otherwise see [`PaymentMethod::from_created`].
    pub fn from_created_body(body: &Value, requested: MethodKind) -> Result<Self, ModelError> {
        match crate::envelope::unwrap_or_bare(body, Self::ROOT) {
            Value::Object(data) => Self::from_created(data, requested),
            other => Err(ModelError::shape(Self::ROOT, "object", other)),
        }
    }

    fn with_fields(
        data: &Map<String, Value>,
        instrument: MethodInstrument,
    ) -> Result<Self, ModelError> {
        let fields: MethodFields = from_dict_serde(data)?;
        Ok(Self {
            method_id: fields.id,
            creation_date: fields.creation_date,
            ran: fields.ran,
            status: fields.status,
            is_default: fields.is_default,
            modified_date: fields.modified_date,
            address_verification_information: fields.address_verification_information,
            level3_eligible: fields.level3_eligible,
            instrument,
        })
    }
}

impl Listable for PaymentMethod {
    const COLLECTION: &'static str = "methods";
    const ITEM: &'static str = "method";

    fn key(&self) -> Option<&str> {
        self.method_id.as_deref()
    }
}
