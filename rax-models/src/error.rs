//! Error types for model (de)serialization.

/// Errors raised while converting models to or from their wire forms.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The XML document could not be parsed.
    #[error("XML parse error: {0}")]
    XmlParse(#[from] roxmltree::Error),

    /// The XML document could not be written.
    #[error("XML write error: {0}")]
    XmlWrite(String),

    /// None of the payment-method discriminant keys was present.
    #[error("unrecognized payment method: expected one of {expected:?}")]
    UnrecognizedVariant {
        /// The discriminant keys that were looked for.
        expected: &'static [&'static str],
    },

    /// More than one payment-method discriminant key was present.
    #[error("ambiguous payment method: found {found:?}")]
    AmbiguousVariant {
        /// The discriminant keys that were found.
        found: Vec<&'static str>,
    },

    /// The body did not carry the expected envelope or container key.
    #[error("missing `{0}` key in body")]
    MissingKey(String),

    /// A value had a different JSON shape than required.
    #[error("unexpected value for `{context}`: expected {expected}, found {found}")]
    UnexpectedShape {
        /// Where the value was found.
        context: String,
        /// The expected JSON shape.
        expected: &'static str,
        /// The JSON shape that was found.
        found: &'static str,
    },

    /// A listed entry carried no identifier to key it by.
    #[error("`{0}` entry has no identifier")]
    MissingIdentifier(&'static str),
}

impl ModelError {
    pub(crate) fn shape(
        context: impl Into<String>,
        expected: &'static str,
        found: &serde_json::Value,
    ) -> Self {
        Self::UnexpectedShape {
            context: context.into(),
            expected,
            found: kind_of(found),
        }
    }
}

const fn kind_of(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
