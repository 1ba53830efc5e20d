//! URL-encoded form bodies.
//!
//! A posted body is decoded into a [`FieldMap`]: an insertion-ordered mapping from field name
//! to exactly one raw string value. Blank values are dropped while decoding, so a form control
//! that was left empty behaves exactly like one the browser did not send.

use crate::{IntakeError, IntakeResult};
use std::collections::HashMap;

/// Ordered `field name -> raw value` mapping.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldMap {
    entries: Vec<(String, String)>,
    /// Position of each name in `entries`.
    index: HashMap<String, usize>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode an `application/x-www-form-urlencoded` body.
    ///
    /// # Errors
    ///
    /// - [`IntakeError::FormDecode`] if the body cannot be decoded.
    /// - [`IntakeError::MultipleValues`] if a field carries more than one non-blank value.
    pub fn parse(body: &str) -> IntakeResult<Self> {
        let pairs: Vec<(String, String)> =
            serde_urlencoded::from_str(body).map_err(IntakeError::FormDecode)?;

        let mut map = Self::new();
        // non-blank occurrences, parallel to `entries`
        let mut counts: Vec<usize> = Vec::new();

        for (name, value) in pairs {
            if value.is_empty() {
                continue;
            }
            match map.index.get(&name) {
                Some(&position) => counts[position] += 1,
                None => {
                    map.push(name, value);
                    counts.push(1);
                }
            }
        }

        if let Some(position) = counts.iter().position(|&count| count != 1) {
            return Err(IntakeError::MultipleValues {
                field: map.entries[position].0.clone(),
                count: counts[position],
            });
        }

        Ok(map)
    }

    /// Decode a raw request body, requiring UTF-8.
    pub fn parse_bytes(body: &[u8]) -> IntakeResult<Self> {
        let text = std::str::from_utf8(body).map_err(IntakeError::BodyEncoding)?;
        Self::parse(text)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.index
            .get(name)
            .map(|&position| self.entries[position].1.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Set `name` to `value`, replacing an existing value in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.index.get(&name) {
            Some(&position) => self.entries[position].1 = value,
            None => self.push(name, value),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let position = self.index.remove(name)?;
        let (_, value) = self.entries.remove(position);
        for slot in self.index.values_mut() {
            if *slot > position {
                *slot -= 1;
            }
        }
        Some(value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    fn push(&mut self, name: String, value: String) {
        self.index.insert(name.clone(), self.entries.len());
        self.entries.push((name, value));
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (name, value) in iter {
            map.insert(name, value);
        }
        map
    }
}
