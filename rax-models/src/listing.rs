//! Keyed listings of [`Listable`] resources.

use serde_json::Value;

use crate::envelope;
use crate::error::ModelError;
use crate::model::{Format, Listable};

/// Entries of a listing response, in response order, keyed by identifier.
///
/// A later entry with an identifier already seen replaces the earlier one
/// in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing<T> {
    entries: Vec<(String, T)>,
}

impl<T> Default for Listing<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T: Listable> Listing<T> {
    /// Builds a listing from a parsed `{plural: {singular: [...]}}` body.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::MissingKey`] if the plural container is absent,
    /// [`ModelError::MissingIdentifier`] if an entry has no id, or any error
    /// from mapping an entry.
    pub fn from_body(body: &Value) -> Result<Self, ModelError> {
        let mut listing = Self::default();
        for entry in envelope::list_entries(body, T::COLLECTION, T::ITEM)? {
            let item = T::from_value(entry)?;
            let key = item
                .key()
                .ok_or(ModelError::MissingIdentifier(T::ITEM))?
                .to_owned();
            listing.insert(key, item);
        }
        Ok(listing)
    }

    /// Parses listing text in `format`.
    ///
    /// # Errors
    ///
    /// See [`Listing::from_body`]; malformed text is a JSON or XML error.
    pub fn decode(text: &str, format: Format) -> Result<Self, ModelError> {
        let body = envelope::parse_body(text, format)?;
        Self::from_body(&body)
    }
}

impl<T> Listing<T> {
    fn insert(&mut self, key: String, item: T) {
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some(slot) => slot.1 = item,
            None => self.entries.push((key, item)),
        }
    }

    /// Looks an entry up by identifier.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&T> {
        self.entries
            .iter()
            .find(|(key, _)| key == id)
            .map(|(_, item)| item)
    }

    /// The first entry and its identifier.
    #[must_use]
    pub fn first(&self) -> Option<(&str, &T)> {
        self.entries.first().map(|(key, item)| (key.as_str(), item))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the listing has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Identifiers in listing order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    /// `(id, entry)` pairs in listing order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(key, item)| (key.as_str(), item))
    }
}

impl<T> IntoIterator for Listing<T> {
    type Item = (String, T);
    type IntoIter = std::vec::IntoIter<(String, T)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
