//! Field-level wire types and lenient deserializers.
//!
//! XML bodies arrive as text only, so fields that JSON carries as numbers or
//! booleans must also accept their string forms.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::naming::strip_urn_namespace;

/// A decimal money amount.
///
/// Accepts a JSON string or number on input and always serializes as a
/// string, so no precision is lost in transit.
///
/// ```json
/// "125.50"
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Amount(Decimal);

impl Amount {
    /// Wraps a decimal value.
    #[must_use]
    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Returns the inner decimal value.
    #[must_use]
    pub const fn inner(&self) -> Decimal {
        self.0
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl FromStr for Amount {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Decimal::from_str(s)
            .or_else(|_| Decimal::from_scientific(s))
            .map(Self)
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = match Value::deserialize(deserializer)? {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            other => {
                return Err(de::Error::custom(format!(
                    "amount must be a string or number, found {other}"
                )));
            }
        };
        text.parse()
            .map_err(|_| de::Error::custom(format!("invalid amount `{text}`")))
    }
}

/// Deserializes an optional identifier, removing any `urn:uuid:` wrapper.
///
/// Numeric identifiers are kept in their decimal string form.
pub(crate) fn urn_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(strip_urn_namespace(&s).to_owned())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(de::Error::custom(format!(
            "identifier must be a string, found {other}"
        ))),
    }
}

/// Deserializes an optional boolean from a JSON boolean or its text form.
pub(crate) fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(b)),
        Some(Value::String(s)) if s.eq_ignore_ascii_case("true") => Ok(Some(true)),
        Some(Value::String(s)) if s.eq_ignore_ascii_case("false") => Ok(Some(false)),
        Some(other) => Err(de::Error::custom(format!(
            "expected a boolean, found {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "urn_id")]
        id: Option<String>,
        #[serde(default, deserialize_with = "lenient_bool")]
        flag: Option<bool>,
        amount: Option<Amount>,
    }

    #[test]
    fn test_amount_serializes_as_string() {
        let amount: Amount = "125.50".parse().unwrap();
        assert_eq!(serde_json::to_string(&amount).unwrap(), "\"125.50\"");
    }

    #[test]
    fn test_amount_accepts_number_and_string() {
        let from_number: Amount = serde_json::from_str("10.5").unwrap();
        let from_string: Amount = serde_json::from_str("\"10.5\"").unwrap();
        assert_eq!(from_number, from_string);
    }

    #[test]
    fn test_amount_rejects_garbage() {
        assert!(serde_json::from_str::<Amount>("\"ten\"").is_err());
        assert!(serde_json::from_str::<Amount>("true").is_err());
    }

    #[test]
    fn test_urn_id_is_stripped() {
        let probe: Probe = serde_json::from_str(r#"{"id": "urn:uuid:abc-123"}"#).unwrap();
        assert_eq!(probe.id.as_deref(), Some("abc-123"));
    }

    #[test]
    fn test_numeric_id_is_kept_as_text() {
        let probe: Probe = serde_json::from_str(r#"{"id": 42}"#).unwrap();
        assert_eq!(probe.id.as_deref(), Some("42"));
    }

    #[test]
    fn test_lenient_bool_accepts_text() {
        let probe: Probe = serde_json::from_str(r#"{"flag": "TRUE"}"#).unwrap();
        assert_eq!(probe.flag, Some(true));
        let probe: Probe = serde_json::from_str(r#"{"flag": false}"#).unwrap();
        assert_eq!(probe.flag, Some(false));
        assert!(serde_json::from_str::<Probe>(r#"{"flag": "yes"}"#).is_err());
    }

    #[test]
    fn test_absent_fields_are_none() {
        let probe: Probe = serde_json::from_str("{}").unwrap();
        assert!(probe.id.is_none());
        assert!(probe.flag.is_none());
        assert!(probe.amount.is_none());
    }
}
