//! Namespace-agnostic XML element tree.
//!
//! Documents are parsed with `roxmltree` into an [`XmlElement`] tree whose
//! element and attribute names have every namespace prefix removed, then
//! mapped onto the same JSON-shaped dictionaries the JSON path uses:
//!
//! - repeated child names become arrays
//! - attributes become `@name` keys
//! - text next to children or attributes becomes `#text`
//! - text-only elements become strings, empty elements become `null`
//!
//! Writing goes the other way through `quick-xml`.

use std::fmt::Display;

use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use serde_json::{Map, Value};

use crate::error::ModelError;
use crate::naming::strip_namespace;

/// Key prefix marking an attribute in the dictionary form.
pub const ATTRIBUTE_PREFIX: char = '@';

/// Key holding mixed text content in the dictionary form.
pub const TEXT_KEY: &str = "#text";

/// A single XML element with namespace-free names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    /// Local element name.
    pub name: String,
    /// Attributes in document order, local names only.
    pub attributes: Vec<(String, String)>,
    /// Text content, if any.
    pub text: Option<String>,
    /// Child elements in document order.
    pub children: Vec<Self>,
}

impl XmlElement {
    /// Creates an empty element.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Adds an attribute.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Parses a document and returns its root element.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::XmlParse`] if the document is not well-formed.
    pub fn parse(document: &str) -> Result<Self, ModelError> {
        let document = roxmltree::Document::parse(document)?;
        Ok(Self::from_node(document.root_element()))
    }

    fn from_node(node: roxmltree::Node<'_, '_>) -> Self {
        let attributes = node
            .attributes()
            .map(|attr| (strip_namespace(attr.name()).to_owned(), attr.value().to_owned()))
            .collect();

        let mut children = Vec::new();
        let mut text = String::new();
        for child in node.children() {
            if child.is_element() {
                children.push(Self::from_node(child));
            } else if let Some(t) = child.text().filter(|_| child.is_text()) {
                text.push_str(t);
            }
        }

        // Whitespace between child elements is layout, not content.
        let text = if text.trim().is_empty() {
            None
        } else if children.is_empty() {
            Some(text)
        } else {
            Some(text.trim().to_owned())
        };

        Self {
            name: strip_namespace(node.tag_name().name()).to_owned(),
            attributes,
            text,
            children,
        }
    }

    /// Returns the first child with the given local name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Self> {
        let name = strip_namespace(name);
        self.children.iter().find(|child| child.name == name)
    }

    /// Returns all children with the given local name.
    pub fn find_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Self> + 'a {
        let name = strip_namespace(name);
        self.children.iter().filter(move |child| child.name == name)
    }

    /// Converts the element's content to its dictionary form.
    ///
    /// The element's own name is not part of the result.
    #[must_use]
    pub fn to_value(&self) -> Value {
        if self.children.is_empty() && self.attributes.is_empty() {
            return self.text.clone().map_or(Value::Null, Value::String);
        }

        let mut map = Map::new();
        for (name, value) in &self.attributes {
            map.insert(format!("{ATTRIBUTE_PREFIX}{name}"), Value::String(value.clone()));
        }
        if let Some(text) = &self.text {
            map.insert(TEXT_KEY.to_owned(), Value::String(text.clone()));
        }
        for child in &self.children {
            let value = child.to_value();
            // A child's own value is never an array, so an array here means
            // the name has already repeated.
            match map.get_mut(&child.name) {
                Some(Value::Array(items)) => items.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
                None => {
                    map.insert(child.name.clone(), value);
                }
            }
        }
        Value::Object(map)
    }

    /// Builds an element named `name` from a dictionary-form value.
    ///
    /// Array members become repeated children; booleans are written in
    /// lowercase.
    #[must_use]
    pub fn from_value(name: &str, value: &Value) -> Self {
        let mut element = Self::new(strip_namespace(name));
        match value {
            Value::Null => {}
            Value::Bool(b) => element.text = Some(b.to_string()),
            Value::Number(n) => element.text = Some(n.to_string()),
            Value::String(s) => element.text = Some(s.clone()),
            Value::Array(items) => {
                element.children = items.iter().map(|item| Self::from_value(name, item)).collect();
            }
            Value::Object(map) => {
                for (key, child) in map {
                    if key == TEXT_KEY {
                        element.text = scalar_text(child);
                    } else if let Some(attr) = key.strip_prefix(ATTRIBUTE_PREFIX) {
                        if let Some(text) = scalar_text(child) {
                            element.attributes.push((attr.to_owned(), text));
                        }
                    } else if let Value::Array(items) = child {
                        element
                            .children
                            .extend(items.iter().map(|item| Self::from_value(key, item)));
                    } else {
                        element.children.push(Self::from_value(key, child));
                    }
                }
            }
        }
        element
    }

    /// Writes the element and its subtree as an XML string.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::XmlWrite`] if the writer fails.
    pub fn to_xml_string(&self) -> Result<String, ModelError> {
        let mut writer = Writer::new(Vec::new());
        self.write_into(&mut writer)?;
        String::from_utf8(writer.into_inner()).map_err(write_error)
    }

    fn write_into(&self, writer: &mut Writer<Vec<u8>>) -> Result<(), ModelError> {
        let mut start = BytesStart::new(self.name.as_str());
        for (name, value) in &self.attributes {
            start.push_attribute((name.as_str(), value.as_str()));
        }

        if self.text.is_none() && self.children.is_empty() {
            return writer.write_event(Event::Empty(start)).map_err(write_error);
        }

        writer.write_event(Event::Start(start)).map_err(write_error)?;
        if let Some(text) = &self.text {
            writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(write_error)?;
        }
        for child in &self.children {
            child.write_into(writer)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new(self.name.as_str())))
            .map_err(write_error)
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn write_error(err: impl Display) -> ModelError {
    ModelError::XmlWrite(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NAMESPACED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ns1:methods xmlns:ns1="http://docs.rackspace.com/papi" xmlns:ns2="urn:rax:method">
    <ns2:method ns2:kind="card">
        <ns2:id>urn:uuid:abc-123</ns2:id>
        <ns2:paymentCard>
            <ns2:cardNumber>4111</ns2:cardNumber>
        </ns2:paymentCard>
    </ns2:method>
    <ns2:method>
        <ns2:id>2</ns2:id>
        <ns2:sepa/>
    </ns2:method>
</ns1:methods>"#;

    #[test]
    fn test_parse_strips_namespaces() {
        let root = XmlElement::parse(NAMESPACED).unwrap();
        assert_eq!(root.name, "methods");
        let first = root.find("method").unwrap();
        assert_eq!(first.attributes, vec![("kind".to_owned(), "card".to_owned())]);
        assert_eq!(first.find("ns2:id").unwrap().text.as_deref(), Some("urn:uuid:abc-123"));
        assert_eq!(root.find_all("method").count(), 2);
    }

    #[test]
    fn test_to_value_groups_repeated_children() {
        let root = XmlElement::parse(NAMESPACED).unwrap();
        let value = root.to_value();
        let methods = value["method"].as_array().unwrap();
        assert_eq!(methods.len(), 2);
        assert_eq!(methods[0]["@kind"], json!("card"));
        assert_eq!(methods[0]["paymentCard"]["cardNumber"], json!("4111"));
        assert_eq!(methods[1]["sepa"], Value::Null);
    }

    #[test]
    fn test_leaf_text_is_preserved() {
        let root = XmlElement::parse("<a><b> padded </b></a>").unwrap();
        assert_eq!(root.find("b").unwrap().text.as_deref(), Some(" padded "));
    }

    #[test]
    fn test_parse_rejects_malformed_document() {
        assert!(matches!(
            XmlElement::parse("<a><b></a>"),
            Err(ModelError::XmlParse(_))
        ));
    }

    #[test]
    fn test_from_value_writes_expected_document() {
        let value = json!({
            "@currency": "USD",
            "amount": "10.00",
            "isDefault": true,
            "lines": [{"sku": "a"}, {"sku": "b"}],
        });
        let xml = XmlElement::from_value("papi:payment", &value)
            .to_xml_string()
            .unwrap();
        assert_eq!(
            xml,
            "<payment currency=\"USD\"><amount>10.00</amount><isDefault>true</isDefault>\
             <lines><sku>a</sku></lines><lines><sku>b</sku></lines></payment>"
        );
    }

    #[test]
    fn test_text_is_escaped_on_write() {
        let xml = XmlElement::from_value("note", &json!("a < b & c"))
            .to_xml_string()
            .unwrap();
        assert_eq!(xml, "<note>a &lt; b &amp; c</note>");
    }

    #[test]
    fn test_write_then_parse_is_stable() {
        let value = json!({"id": "1", "paymentCard": {"cardNumber": "4111", "cardType": "VISA"}});
        let xml = XmlElement::from_value("method", &value).to_xml_string().unwrap();
        let parsed = XmlElement::parse(&xml).unwrap();
        assert_eq!(parsed.to_value(), value);
    }
}
