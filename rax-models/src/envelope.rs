//! Envelope handling for request and response bodies.
//!
//! Single resources travel wrapped under a root key
//! (`{"papi:payment": {...}}`); listings use a plural container around a
//! singular array (`{"payments": {"payment": [...]}}`). Keys are matched by
//! local name so `papi:payment`, `ns2:payment` and `payment` are the same
//! envelope.

use serde_json::{Map, Value};

use crate::error::ModelError;
use crate::model::Format;
use crate::naming::same_local_name;
use crate::xml::XmlElement;

/// Wraps a body under `root`.
#[must_use]
pub fn wrap(root: &str, body: Map<String, Value>) -> Value {
    wrap_value(root, Value::Object(body))
}

/// Parses body text into its dictionary form.
///
/// XML documents become `{root: content}` so they can be unwrapped exactly
/// like their JSON counterparts.
///
/// # Errors
///
/// Returns [`ModelError::Json`] or [`ModelError::XmlParse`] on malformed
/// text.
pub fn parse_body(text: &str, format: Format) -> Result<Value, ModelError> {
    match format {
        Format::Json => Ok(serde_json::from_str(text)?),
        Format::Xml => {
            let root = XmlElement::parse(text)?;
            Ok(wrap_value(&root.name, root.to_value()))
        }
    }
}

fn wrap_value(root: &str, body: Value) -> Value {
    let mut envelope = Map::new();
    envelope.insert(root.to_owned(), body);
    Value::Object(envelope)
}

/// Looks up `name` in `map`, exactly first and then by local name.
#[must_use]
pub fn find_key<'a>(map: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    map.get(name).or_else(|| {
        map.iter()
            .find(|(key, _)| same_local_name(key, name))
            .map(|(_, value)| value)
    })
}

/// Returns the body wrapped under `root`.
///
/// # Errors
///
/// Returns [`ModelError::MissingKey`] if `body` is not an object carrying
/// `root`.
pub fn unwrap<'a>(body: &'a Value, root: &str) -> Result<&'a Value, ModelError> {
    body.as_object()
        .and_then(|map| find_key(map, root))
        .ok_or_else(|| ModelError::MissingKey(root.to_owned()))
}

/// Returns the body wrapped under `root` when `body` is exactly that
/// envelope, otherwise `body` itself.
#[must_use]
pub fn unwrap_or_bare<'a>(body: &'a Value, root: &str) -> &'a Value {
    match body.as_object() {
        Some(map) if map.len() == 1 => find_key(map, root).unwrap_or(body),
        _ => body,
    }
}

/// Extracts the entries of a `{plural: {singular: [...]}}` listing.
///
/// A singular key holding one object (as XML-derived bodies do for a single
/// entry) yields that one entry. A container without the singular key, or
/// an empty container, yields no entries.
///
/// # Errors
///
/// Returns [`ModelError::MissingKey`] if the plural container is absent and
/// [`ModelError::UnexpectedShape`] if either level has the wrong shape.
pub fn list_entries<'a>(
    body: &'a Value,
    plural: &str,
    singular: &str,
) -> Result<Vec<&'a Value>, ModelError> {
    let map = body
        .as_object()
        .ok_or_else(|| ModelError::shape("response body", "object", body))?;
    let container = find_key(map, plural).ok_or_else(|| ModelError::MissingKey(plural.to_owned()))?;

    let entries = match container {
        Value::Null => return Ok(Vec::new()),
        Value::Array(items) => return Ok(items.iter().collect()),
        Value::Object(inner) => find_key(inner, singular),
        other => return Err(ModelError::shape(plural, "object", other)),
    };

    match entries {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items.iter().collect()),
        Some(entry @ Value::Object(_)) => Ok(vec![entry]),
        Some(other) => Err(ModelError::shape(singular, "array", other)),
    }
}
