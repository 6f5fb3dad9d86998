use std::collections::HashMap;

use bytes::Bytes;

use crate::error::TypeError;
use crate::value::Value;

/// Named values accumulated during a parse.
///
/// One store lives for the lifetime of a parser and is lent to every
/// nested scope (`tap`, `loop`, `find` callbacks), so a value set inside a
/// nested scope is visible to the enclosing one. [`clear`](Self::clear) is
/// the `flush` operation: it drops every entry and never touches the byte
/// cursor.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Vars {
    store: HashMap<String, Value>,
}

impl Vars {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a value by name.
    ///
    /// # Errors
    ///
    /// Returns [`TypeError::UnknownVariable`] if `name` is unset.
    pub fn get(&self, name: &str) -> Result<&Value, TypeError> {
        self.store.get(name).ok_or_else(|| TypeError::UnknownVariable {
            name: name.to_string(),
        })
    }

    /// Look up a numeric value.
    ///
    /// # Errors
    ///
    /// - [`TypeError::UnknownVariable`] if `name` is unset.
    /// - [`TypeError::NotANumber`] if the value is a byte slice.
    pub fn get_number(&self, name: &str) -> Result<f64, TypeError> {
        self.get(name)?
            .as_number()
            .ok_or_else(|| TypeError::NotANumber {
                name: name.to_string(),
            })
    }

    /// Look up a byte-slice value. Returns `Ok(None)` if the value is a
    /// number.
    ///
    /// # Errors
    ///
    /// Returns [`TypeError::UnknownVariable`] if `name` is unset.
    pub fn get_bytes(&self, name: &str) -> Result<Option<&Bytes>, TypeError> {
        Ok(self.get(name)?.as_bytes())
    }

    /// Set `name`, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.store.insert(name.into(), value.into());
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.store.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.store.remove(name)
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.store = HashMap::new();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Iterate entries in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.store.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Entries sorted by name, for stable output.
    #[must_use]
    pub fn sorted(&self) -> Vec<(&str, &Value)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }
}
