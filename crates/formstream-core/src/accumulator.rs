//! Form value accumulation under a value-count limit.

use std::collections::HashMap;

use crate::error::UploadError;

/// Replace the literal text `undefined` (any ASCII case) with the empty
/// string. Clients that stringify absent values send it verbatim.
#[must_use]
pub fn normalize_undefined(value: String) -> String {
    if value.eq_ignore_ascii_case("undefined") {
        String::new()
    } else {
        value
    }
}

/// Collects form values in first-insertion order.
///
/// Field names are matched ASCII case-insensitively; the spelling of the first
/// occurrence is the one reported.
#[derive(Debug)]
pub struct FieldAccumulator {
    entries: Vec<(String, Vec<String>)>,
    index: HashMap<String, usize>,
    value_count: usize,
    limit: usize,
}

impl FieldAccumulator {
    /// Create an accumulator that accepts at most `limit` values.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            value_count: 0,
            limit,
        }
    }

    /// Append a value for `name`.
    ///
    /// The append that would push the count past the limit fails with
    /// [`UploadError::ValueCountLimitExceeded`] and is not recorded.
    pub fn append(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), UploadError> {
        if self.value_count >= self.limit {
            return Err(UploadError::ValueCountLimitExceeded { limit: self.limit });
        }

        let name = name.into();
        let key = name.to_ascii_lowercase();
        let slot = match self.index.get(&key) {
            Some(&slot) => slot,
            None => {
                self.entries.push((name, Vec::new()));
                self.index.insert(key, self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        self.entries[slot].1.push(value.into());
        self.value_count += 1;
        Ok(())
    }

    /// Total number of values appended.
    #[must_use]
    pub fn value_count(&self) -> usize {
        self.value_count
    }

    /// Number of distinct field names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing was appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of everything accumulated so far.
    #[must_use]
    pub fn results(&self) -> FormFields {
        FormFields {
            entries: self.entries.clone(),
        }
    }

    /// Consume the accumulator, returning its contents without copying.
    #[must_use]
    pub fn into_results(self) -> FormFields {
        FormFields {
            entries: self.entries,
        }
    }
}

/// Immutable field name → ordered values mapping handed to model binding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields {
    entries: Vec<(String, Vec<String>)>,
}

impl FormFields {
    /// All values for `name` (case-insensitive), in arrival order.
    #[must_use]
    pub fn get_all(&self, name: &str) -> &[String] {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map_or(&[], |(_, v)| v.as_slice())
    }

    /// First value for `name` (case-insensitive).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).first().map(String::as_str)
    }

    /// Returns true if `name` was submitted at least once.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        !self.get_all(name).is_empty()
    }

    /// Iterate `(name, values)` in first-insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Number of distinct field names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
