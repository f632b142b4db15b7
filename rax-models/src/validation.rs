//! Method validations and method associations.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_with::skip_serializing_none;

use crate::error::ModelError;
use crate::method::PaymentMethod;
use crate::model::{Model, dict_eq, from_dict_serde, pruned_dict, serde_model};

/// Line of business used when a validation request names none.
pub const DEFAULT_LINE_OF_BUSINESS: &str = "US_CLOUD";

/// Contract entity used when a validation request names none.
pub const DEFAULT_CONTRACT_ENTITY: &str = "CONTRACT_US";

/// Currency used when a validation request names none.
pub const DEFAULT_CURRENCY_CODE: &str = "USD";

/// Billing address attached to a validated method that has none.
#[must_use]
pub fn default_address_verification() -> Map<String, Value> {
    [
        ("country", "US"),
        ("state", "TX"),
        ("city", "San Antonio"),
        ("addressLine1", "1 Fanatical Pl"),
        ("addressLine2", ""),
        ("postalCode", "78218"),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_owned(), Value::String(value.to_owned())))
    .collect()
}

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidationFields {
    #[serde(default, deserialize_with = "crate::fields::urn_id")]
    id: Option<String>,
    validation_results: Option<Value>,
    gateway_message: Option<Value>,
    approval_status: Option<String>,
    line_of_business: Option<String>,
    contract_entity: Option<String>,
    currency_code: Option<String>,
}

/// The outcome of checking a payment method against a line of business,
/// contract entity and currency.
#[derive(Debug, Clone, Default)]
pub struct MethodValidation {
    /// Validation identifier, `urn:uuid:` prefix removed.
    pub method_validation_id: Option<String>,
    /// Free-form gateway validation results.
    pub validation_results: Option<Value>,
    /// Gateway message, text or structured.
    pub gateway_message: Option<Value>,
    /// Approval status, e.g. `APPROVED`.
    pub approval_status: Option<String>,
    /// Line of business the method was validated for.
    pub line_of_business: Option<String>,
    /// Contracting entity.
    pub contract_entity: Option<String>,
    /// ISO currency code.
    pub currency_code: Option<String>,
    /// The validated method.
    pub method: Option<PaymentMethod>,
}

/// Parameters of a method validation request.
///
/// Unset fields fall back to the defaults above; an unset method is filled
/// in by the caller, usually with the first listed method.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationRequest {
    /// Line of business, default [`DEFAULT_LINE_OF_BUSINESS`].
    pub line_of_business: Option<String>,
    /// Contract entity, default [`DEFAULT_CONTRACT_ENTITY`].
    pub contract_entity: Option<String>,
    /// Currency, default [`DEFAULT_CURRENCY_CODE`].
    pub currency_code: Option<String>,
    /// Address attached to a method that has none, default
    /// [`default_address_verification`].
    pub address_verification_information: Option<Map<String, Value>>,
    /// Method to validate.
    pub method: Option<PaymentMethod>,
}

impl ValidationRequest {
    /// A request using every default.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the line of business.
    #[must_use]
    pub fn with_line_of_business(mut self, value: impl Into<String>) -> Self {
        self.line_of_business = Some(value.into());
        self
    }

    /// Sets the contract entity.
    #[must_use]
    pub fn with_contract_entity(mut self, value: impl Into<String>) -> Self {
        self.contract_entity = Some(value.into());
        self
    }

    /// Sets the currency code.
    #[must_use]
    pub fn with_currency_code(mut self, value: impl Into<String>) -> Self {
        self.currency_code = Some(value.into());
        self
    }

    /// Sets the fallback billing address.
    #[must_use]
    pub fn with_address(mut self, address: Map<String, Value>) -> Self {
        self.address_verification_information = Some(address);
        self
    }

    /// Sets the method to validate.
    #[must_use]
    pub fn with_method(mut self, method: PaymentMethod) -> Self {
        self.method = Some(method);
        self
    }

    /// Builds the validation body, validating `fallback` when no method was
    /// set.
    ///
    /// The method keeps its own address verification information when it
    /// has any; otherwise the request's address, or the default one, is
    /// attached.
    #[must_use]
    pub fn build(self, fallback: PaymentMethod) -> MethodValidation {
        let mut method = self.method.unwrap_or(fallback);
        if method
            .address_verification_information
            .as_ref()
            .is_none_or(Map::is_empty)
        {
            method.address_verification_information = Some(
                self.address_verification_information
                    .unwrap_or_else(default_address_verification),
            );
        }
        MethodValidation {
            line_of_business: Some(
                self.line_of_business
                    .unwrap_or_else(|| DEFAULT_LINE_OF_BUSINESS.to_owned()),
            ),
            contract_entity: Some(
                self.contract_entity
                    .unwrap_or_else(|| DEFAULT_CONTRACT_ENTITY.to_owned()),
            ),
            currency_code: Some(
                self.currency_code
                    .unwrap_or_else(|| DEFAULT_CURRENCY_CODE.to_owned()),
            ),
            method: Some(method),
            ..MethodValidation::default()
        }
    }
}

impl MethodValidation {
    fn fields(&self) -> ValidationFields {
        ValidationFields {
            id: self.method_validation_id.clone(),
            validation_results: self.validation_results.clone(),
            gateway_message: self.gateway_message.clone(),
            approval_status: self.approval_status.clone(),
            line_of_business: self.line_of_business.clone(),
            contract_entity: self.contract_entity.clone(),
            currency_code: self.currency_code.clone(),
        }
    }
}

impl Model for MethodValidation {
    const ROOT: &'static str = "papi:methodValidation";

    fn to_dict(&self) -> Map<String, Value> {
        let mut dict = pruned_dict(&self.fields());
        if let Some(method) = &self.method {
            dict.insert("method".to_owned(), Value::Object(method.to_dict()));
        }
        dict
    }

    fn from_dict(data: &Map<String, Value>) -> Result<Self, ModelError> {
        let fields: ValidationFields = from_dict_serde(data)?;
        // Some responses nest the method under its own envelope.
        let method = match data.get("method") {
            None | Some(Value::Null) => None,
            Some(body) => Some(PaymentMethod::from_body(body)?),
        };
        Ok(Self {
            method_validation_id: fields.id,
            validation_results: fields.validation_results,
            gateway_message: fields.gateway_message,
            approval_status: fields.approval_status,
            line_of_business: fields.line_of_business,
            contract_entity: fields.contract_entity,
            currency_code: fields.currency_code,
            method,
        })
    }
}

dict_eq!(MethodValidation);

/// Links a method validation to the method and account it covers.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodAssociation {
    /// Validation identifier.
    #[serde(default, deserialize_with = "crate::fields::urn_id")]
    pub method_validation_id: Option<String>,
    /// Method identifier.
    #[serde(default, deserialize_with = "crate::fields::urn_id")]
    pub method_id: Option<String>,
    /// Account number.
    pub ran: Option<String>,
}

serde_model!(MethodAssociation => "methodAssociation");
