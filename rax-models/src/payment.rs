//! Payments and the two ways of reversing them: voids before settlement and
//! refunds after.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_with::skip_serializing_none;

use crate::fields::Amount;
use crate::model::{Listable, dict_eq, serde_model};

/// A payment taken against a stored method.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    /// Payment identifier.
    #[serde(rename = "id", default, deserialize_with = "crate::fields::urn_id")]
    pub payment_id: Option<String>,
    /// Level-3 card order data, passed through as sent.
    pub level_three_order_information: Option<Value>,
    /// Billing address checked by the gateway.
    #[serde(alias = "addressVerification")]
    pub address_verification_information: Option<Map<String, Value>>,
    /// Submission timestamp as sent by the API.
    pub submission_date: Option<String>,
    /// Submission identifier.
    #[serde(default, deserialize_with = "crate::fields::urn_id")]
    pub submission_id: Option<String>,
    /// Amount charged.
    pub amount: Option<Amount>,
    /// Free-text comments.
    pub comments: Option<String>,
    /// Method the payment was taken from.
    #[serde(default, deserialize_with = "crate::fields::urn_id")]
    pub method_id: Option<String>,
    /// Payment status.
    pub status: Option<String>,
    /// Gateway message, text or structured.
    pub gateway_message: Option<Value>,
    /// Gateway-side reference for the transaction.
    pub gateway_transaction_reference: Option<String>,
}

serde_model!(Payment => "papi:payment");

impl Listable for Payment {
    const COLLECTION: &'static str = "payments";
    const ITEM: &'static str = "payment";

    fn key(&self) -> Option<&str> {
        self.payment_id.as_deref()
    }
}

/// Reversal of a payment before settlement.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Void {
    /// Void identifier.
    #[serde(rename = "id", default, deserialize_with = "crate::fields::urn_id")]
    pub void_id: Option<String>,
    /// Amount voided.
    pub void_amount: Option<Amount>,
    /// Free-text comments.
    pub comments: Option<String>,
    /// Submission identifier.
    #[serde(default, deserialize_with = "crate::fields::urn_id")]
    pub submission_id: Option<String>,
    /// Gateway-side reference for the transaction.
    pub gateway_transaction_reference: Option<String>,
    /// Gateway message, text or structured.
    pub gateway_message: Option<Value>,
    /// Void status.
    pub status: Option<String>,
    /// Submission timestamp as sent by the API.
    pub submission_date: Option<String>,
}

serde_model!(Void => "papi:void");

impl Listable for Void {
    const COLLECTION: &'static str = "voids";
    const ITEM: &'static str = "void";

    fn key(&self) -> Option<&str> {
        self.void_id.as_deref()
    }
}

/// Reversal of a payment after settlement.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Refund {
    /// Refund identifier.
    #[serde(rename = "id", default, deserialize_with = "crate::fields::urn_id")]
    pub refund_id: Option<String>,
    /// Amount refunded.
    pub refund_amount: Option<Amount>,
    /// Free-text comments.
    pub comments: Option<String>,
    /// Submission identifier.
    #[serde(default, deserialize_with = "crate::fields::urn_id")]
    pub submission_id: Option<String>,
    /// Refund status.
    pub status: Option<String>,
    /// Submission timestamp as sent by the API.
    pub submission_date: Option<String>,
    /// Gateway-side reference for the transaction.
    pub gateway_transaction_reference: Option<String>,
    /// Gateway message, text or structured.
    pub gateway_message: Option<Value>,
    /// Method the refund is credited to.
    #[serde(default, deserialize_with = "crate::fields::urn_id")]
    pub method_id: Option<String>,
}

serde_model!(Refund => "papi:refund");

dict_eq!(Payment, Void, Refund);

impl Listable for Refund {
    const COLLECTION: &'static str = "refunds";
    const ITEM: &'static str = "refund";

    fn key(&self) -> Option<&str> {
        self.refund_id.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Format, Model};
    use serde_json::json;

    #[test]
    fn test_payment_from_envelope() {
        let body = json!({
            "papi:payment": {
                "id": "urn:uuid:p-1",
                "amount": 25.5,
                "methodId": "urn:uuid:m-1",
                "addressVerification": {"postalCode": "78218"},
                "levelThreeOrderInformation": {"lineItems": []},
                "status": "SETTLED"
            }
        });
        let payment = Payment::from_body(&body).unwrap();
        assert_eq!(payment.payment_id.as_deref(), Some("p-1"));
        assert_eq!(payment.method_id.as_deref(), Some("m-1"));
        assert_eq!(payment.amount, Some("25.5".parse().unwrap()));
        assert_eq!(
            payment.address_verification_information.unwrap()["postalCode"],
            json!("78218")
        );
    }

    #[test]
    fn test_payment_to_dict_prunes_and_stringifies_amount() {
        let payment = Payment {
            amount: Some("10.00".parse().unwrap()),
            comments: Some(String::new()),
            level_three_order_information: Some(json!({})),
            address_verification_information: Some(Map::new()),
            ..Payment::default()
        };
        let dict = payment.to_dict();
        assert_eq!(dict["amount"], json!("10.00"));
        assert_eq!(dict["comments"], json!(""));
        assert!(!dict.contains_key("levelThreeOrderInformation"));
        assert!(!dict.contains_key("addressVerificationInformation"));
        assert!(!dict.contains_key("id"));
    }

    #[test]
    fn test_payment_round_trip_with_empty_fields() {
        let payment = Payment {
            payment_id: Some("p-2".into()),
            level_three_order_information: Some(json!({})),
            address_verification_information: Some(Map::new()),
            gateway_message: Some(Value::Null),
            comments: Some(String::new()),
            ..Payment::default()
        };
        let parsed = Payment::from_dict(&payment.to_dict()).unwrap();
        assert!(parsed.level_three_order_information.is_none());
        assert!(parsed.address_verification_information.is_none());
        assert_eq!(parsed, payment);

        let text = payment.encode(Format::Json).unwrap();
        assert_eq!(Payment::decode(&text, Format::Json).unwrap(), payment);
    }

    #[test]
    fn test_void_xml_round_trip() {
        let void = Void {
            void_id: Some("v-1".into()),
            void_amount: Some("3.10".parse().unwrap()),
            comments: Some("duplicate charge".into()),
            status: Some("PENDING".into()),
            ..Void::default()
        };
        let xml = void.encode(Format::Xml).unwrap();
        assert!(xml.starts_with("<void xmlns="));
        assert_eq!(Void::decode(&xml, Format::Xml).unwrap(), void);
    }

    #[test]
    fn test_void_from_namespaced_xml() {
        let xml = r#"<ns2:void xmlns:ns2="http://docs.rackspace.com/papi/v1">
            <ns2:id>urn:uuid:v-7</ns2:id>
            <ns2:voidAmount>1.00</ns2:voidAmount>
            <ns2:submissionId>urn:uuid:s-2</ns2:submissionId>
        </ns2:void>"#;
        let void = Void::from_xml(xml).unwrap();
        assert_eq!(void.void_id.as_deref(), Some("v-7"));
        assert_eq!(void.submission_id.as_deref(), Some("s-2"));
        assert_eq!(void.void_amount.unwrap().to_string(), "1.00");
    }

    #[test]
    fn test_refund_json_round_trip() {
        let refund = Refund {
            refund_id: Some("r-1".into()),
            refund_amount: Some("7".parse().unwrap()),
            method_id: Some("m-1".into()),
            gateway_message: Some(json!({"code": "00"})),
            ..Refund::default()
        };
        let text = refund.to_json().unwrap();
        assert!(text.starts_with("{\"papi:refund\":"));
        assert_eq!(Refund::from_json(&text).unwrap(), refund);
    }

    #[test]
    fn test_bad_amount_is_rejected() {
        let body = json!({"refundAmount": "lots"});
        assert!(Refund::from_body(&body).is_err());
    }
}
