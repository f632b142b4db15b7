//! The [`Model`] trait shared by every resource type, plus wire formats and
//! empty-value pruning.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::envelope;
use crate::error::ModelError;
use crate::naming::strip_namespace;
use crate::xml::XmlElement;

/// Default `xmlns` written on the root of serialized XML documents.
pub const PAYMENT_API_XMLNS: &str = "http://docs.rackspace.com/papi/v1";

/// Body format of a request or response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// `application/json`
    #[default]
    Json,
    /// `application/xml`
    Xml,
}

impl Format {
    /// Media type used in `accept` / `content-type` headers.
    #[must_use]
    pub const fn media_type(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Xml => "application/xml",
        }
    }

    /// Short lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Xml => "xml",
        }
    }
}

impl Display for Format {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" | "application/json" => Ok(Self::Json),
            "xml" | "application/xml" => Ok(Self::Xml),
            _ => Err(UnknownFormat(s.to_owned())),
        }
    }
}

/// A format name that is neither JSON nor XML.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown format `{0}`, expected `json` or `xml`")]
pub struct UnknownFormat(pub String);

/// Whether a value is pruned from serialized output: null, `[]` or `{}`.
#[must_use]
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) | Value::String(_) => false,
    }
}

/// Drops every entry whose value is null, `[]` or `{}`.
///
/// This is a value-equality rule applied to the top level of `map`; nested
/// structures are left as they are.
#[must_use]
pub fn prune_empty(map: Map<String, Value>) -> Map<String, Value> {
    map.into_iter().filter(|(_, value)| !is_empty_value(value)).collect()
}

/// Serializes a field struct into a pruned dictionary.
pub(crate) fn pruned_dict<T: Serialize>(value: &T) -> Map<String, Value> {
    let map = serde_json::to_value(value)
        .ok()
        .and_then(|value| match value {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .expect("model field structs serialize to JSON objects");
    prune_empty(map)
}

/// Deserializes a field struct from a dictionary.
pub(crate) fn from_dict_serde<T: DeserializeOwned>(
    data: &Map<String, Value>,
) -> Result<T, ModelError> {
    Ok(serde_json::from_value(Value::Object(data.clone()))?)
}

/// Implements [`Model`] for a serde field struct rooted at `$root`.
macro_rules! serde_model {
    ($ty:ty => $root:literal) => {
        impl $crate::model::Model for $ty {
            const ROOT: &'static str = $root;

            fn to_dict(&self) -> ::serde_json::Map<String, ::serde_json::Value> {
                $crate::model::pruned_dict(self)
            }

            fn from_dict(
                data: &::serde_json::Map<String, ::serde_json::Value>,
            ) -> Result<Self, $crate::error::ModelError> {
                $crate::model::from_dict_serde(data)
            }
        }
    };
}

pub(crate) use serde_model;

/// Implements `PartialEq` as equality of [`Model::to_dict`] output.
///
/// Fields holding an empty value are pruned on the way out, so `Some({})`,
/// `Some(null)` and `None` compare equal and `from_dict(to_dict(x)) == x`
/// holds for every field combination.
macro_rules! dict_eq {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl PartialEq for $ty {
                fn eq(&self, other: &Self) -> bool {
                    $crate::model::Model::to_dict(self) == $crate::model::Model::to_dict(other)
                }
            }
        )+
    };
}

pub(crate) use dict_eq;

/// A resource type that converts to and from dictionaries, JSON and XML.
///
/// Implementors provide the dictionary mapping; every other form is derived
/// from it, so JSON and XML share one field mapping.
pub trait Model: Sized {
    /// Envelope key and XML root element name.
    const ROOT: &'static str;

    /// `xmlns` written on the XML root.
    const XMLNS: &'static str = PAYMENT_API_XMLNS;

    /// Converts to a dictionary with empty values pruned.
    fn to_dict(&self) -> Map<String, Value>;

    /// Builds the model from a dictionary.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] if a field has the wrong shape or a required
    /// discriminant is missing.
    fn from_dict(data: &Map<String, Value>) -> Result<Self, ModelError>;

    /// Builds the model from any dictionary-shaped value; `null` counts as
    /// an empty dictionary.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnexpectedShape`] for non-object values, or any
    /// error from [`Model::from_dict`].
    fn from_value(value: &Value) -> Result<Self, ModelError> {
        match value {
            Value::Object(map) => Self::from_dict(map),
            Value::Null => Self::from_dict(&Map::new()),
            other => Err(ModelError::shape(Self::ROOT, "object", other)),
        }
    }

    /// Wraps the dictionary under [`Model::ROOT`].
    fn to_envelope(&self) -> Value {
        envelope::wrap(Self::ROOT, self.to_dict())
    }

    /// Builds the model from a body that is either its envelope or the bare
    /// dictionary.
    ///
    /// # Errors
    ///
    /// See [`Model::from_value`].
    fn from_body(body: &Value) -> Result<Self, ModelError> {
        Self::from_value(envelope::unwrap_or_bare(body, Self::ROOT))
    }

    /// Serializes the envelope as JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Json`] if serialization fails.
    fn to_json(&self) -> Result<String, ModelError> {
        Ok(serde_json::to_string(&self.to_envelope())?)
    }

    /// Parses JSON text holding the envelope or the bare dictionary.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] on malformed JSON or field mapping failure.
    fn from_json(text: &str) -> Result<Self, ModelError> {
        let body: Value = serde_json::from_str(text)?;
        Self::from_body(&body)
    }

    /// Converts to an XML element named after the local part of
    /// [`Model::ROOT`].
    fn to_xml_element(&self) -> XmlElement {
        XmlElement::from_value(strip_namespace(Self::ROOT), &Value::Object(self.to_dict()))
    }

    /// Builds the model from an already-parsed element.
    ///
    /// # Errors
    ///
    /// See [`Model::from_value`].
    fn from_xml_element(element: &XmlElement) -> Result<Self, ModelError> {
        Self::from_value(&element.to_value())
    }

    /// Serializes as an XML document whose root carries [`Model::XMLNS`].
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::XmlWrite`] if writing fails.
    fn to_xml(&self) -> Result<String, ModelError> {
        self.to_xml_element()
            .with_attribute("xmlns", Self::XMLNS)
            .to_xml_string()
    }

    /// Parses an XML document, ignoring every namespace prefix.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] on malformed XML or field mapping failure.
    fn from_xml(text: &str) -> Result<Self, ModelError> {
        Self::from_xml_element(&XmlElement::parse(text)?)
    }

    /// Serializes in the given format.
    ///
    /// # Errors
    ///
    /// See [`Model::to_json`] and [`Model::to_xml`].
    fn encode(&self, format: Format) -> Result<String, ModelError> {
        match format {
            Format::Json => self.to_json(),
            Format::Xml => self.to_xml(),
        }
    }

    /// Parses text in the given format.
    ///
    /// # Errors
    ///
    /// See [`Model::from_json`] and [`Model::from_xml`].
    fn decode(text: &str, format: Format) -> Result<Self, ModelError> {
        match format {
            Format::Json => Self::from_json(text),
            Format::Xml => Self::from_xml(text),
        }
    }
}

/// A [`Model`] that the APIs return in `{plural: {singular: [...]}}`
/// listings.
pub trait Listable: Model {
    /// Plural container key, e.g. `methods`.
    const COLLECTION: &'static str;

    /// Singular entry key, e.g. `method`.
    const ITEM: &'static str;

    /// Identifier the entry is keyed by in a listing.
    fn key(&self) -> Option<&str>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prune_empty_drops_only_empty_values() {
        let map = json!({
            "null": null,
            "list": [],
            "dict": {},
            "blank": "",
            "zero": 0,
            "no": false,
            "nested": {"inner": null},
        });
        let Value::Object(map) = map else { unreachable!() };
        let pruned = prune_empty(map);
        let mut keys: Vec<_> = pruned.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["blank", "nested", "no", "zero"]);
    }

    #[test]
    fn test_format_parse_and_media_type() {
        assert_eq!("JSON".parse::<Format>().unwrap(), Format::Json);
        assert_eq!("application/xml".parse::<Format>().unwrap(), Format::Xml);
        assert!("yaml".parse::<Format>().is_err());
        assert_eq!(Format::Xml.media_type(), "application/xml");
        assert_eq!(Format::default().to_string(), "json");
    }

    #[test]
    fn test_format_deserializes_lowercase() {
        let format: Format = serde_json::from_str("\"xml\"").unwrap();
        assert_eq!(format, Format::Xml);
    }
}
