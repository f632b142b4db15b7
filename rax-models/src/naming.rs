//! Namespace and URN prefix handling for tags, keys and identifiers.
//!
//! The billing and payment APIs qualify XML tags and some JSON keys with
//! namespace prefixes (`papi:payment`, `ns2:payment`,
//! `{http://...}payment`), and wrap some identifiers in a `urn:uuid:`
//! prefix. Everything in this crate matches on the local part only.

/// Prefix carried by URN-wrapped identifiers.
pub const URN_UUID_PREFIX: &str = "urn:uuid:";

/// Returns the local part of a possibly namespace-qualified tag.
///
/// Handles Clark notation (`{ns}tag`) and colon-separated prefixes of any
/// depth (`ns:tag`, `urn:uuid:ns:tag`).
///
/// ```rust
/// use rax_models::naming::strip_namespace;
///
/// assert_eq!(strip_namespace("{http://example.com/v1}method"), "method");
/// assert_eq!(strip_namespace("urn:uuid:ns:method"), "method");
/// assert_eq!(strip_namespace("method"), "method");
/// ```
#[must_use]
pub fn strip_namespace(tag: &str) -> &str {
    let tag = tag
        .strip_prefix('{')
        .and_then(|rest| rest.split_once('}'))
        .map_or(tag, |(_, local)| local);
    tag.rsplit_once(':').map_or(tag, |(_, local)| local)
}

/// Removes the `urn:uuid:` wrapper from an identifier, if present.
///
/// ```rust
/// use rax_models::naming::strip_urn_namespace;
///
/// assert_eq!(strip_urn_namespace("urn:uuid:abc-123"), "abc-123");
/// assert_eq!(strip_urn_namespace("abc-123"), "abc-123");
/// ```
#[must_use]
pub fn strip_urn_namespace(id: &str) -> &str {
    id.strip_prefix(URN_UUID_PREFIX).unwrap_or(id)
}

/// Whether two possibly-qualified names share the same local part.
#[must_use]
pub fn same_local_name(a: &str, b: &str) -> bool {
    strip_namespace(a) == strip_namespace(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_namespace_clark_notation() {
        assert_eq!(strip_namespace("{http://docs.rackspace.com/v1}tag"), "tag");
    }

    #[test]
    fn test_strip_namespace_urn_prefix() {
        assert_eq!(strip_namespace("urn:uuid:ns:tag"), "tag");
    }

    #[test]
    fn test_strip_namespace_single_prefix() {
        assert_eq!(strip_namespace("papi:methodValidation"), "methodValidation");
        assert_eq!(strip_namespace("ns2:payment"), "payment");
    }

    #[test]
    fn test_strip_namespace_clark_with_colons_in_uri() {
        assert_eq!(strip_namespace("{urn:rax:billing}void"), "void");
    }

    #[test]
    fn test_strip_namespace_unqualified_unchanged() {
        assert_eq!(strip_namespace("refund"), "refund");
        assert_eq!(strip_namespace(""), "");
    }

    #[test]
    fn test_strip_urn_namespace() {
        assert_eq!(strip_urn_namespace("urn:uuid:abc-123"), "abc-123");
        assert_eq!(strip_urn_namespace("abc-123"), "abc-123");
        assert_eq!(strip_urn_namespace("urn:isbn:1"), "urn:isbn:1");
    }

    #[test]
    fn test_same_local_name() {
        assert!(same_local_name("papi:payment", "ns2:payment"));
        assert!(same_local_name("method", "{x}method"));
        assert!(!same_local_name("papi:method", "papi:methodValidation"));
    }
}
