//! Label-keyed containers.

use crate::util::{DetOutError, DetOutResult};
use std::collections::BTreeMap;

/// Label used for location predictions shared across all classes.
pub const SHARED_LOCATION_LABEL: i32 = -1;

/// Map from an integer class (or attribute category) label to `T`.
///
/// Iteration is in ascending label order. Lookups through [`LabelIndexed::get`]
/// fail with [`DetOutError::InconsistentLabel`] instead of returning `None`,
/// since a missing label means the two sides of the pipeline were built from
/// different label spaces.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelIndexed<T> {
    entries: BTreeMap<i32, T>,
}

impl<T> Default for LabelIndexed<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<T> LabelIndexed<T> {
    /// Empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `value` for `label`, returning the previous value if any.
    pub fn insert(&mut self, label: i32, value: T) -> Option<T> {
        self.entries.insert(label, value)
    }

    /// Returns the entry for `label`, or an `InconsistentLabel` error naming
    /// `context`.
    pub fn get(&self, label: i32, context: &'static str) -> DetOutResult<&T> {
        self.entries
            .get(&label)
            .ok_or(DetOutError::InconsistentLabel { label, context })
    }

    /// True when `label` has an entry.
    pub fn contains(&self, label: i32) -> bool {
        self.entries.contains_key(&label)
    }

    /// Mutable entry for `label`, inserted with `T::default()` when absent.
    pub fn entry_or_default(&mut self, label: i32) -> &mut T
    where
        T: Default,
    {
        self.entries.entry(label).or_default()
    }

    /// Number of labels.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no label has an entry.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Labels in ascending order.
    pub fn labels(&self) -> impl Iterator<Item = i32> + '_ {
        self.entries.keys().copied()
    }

    /// Iterates `(label, value)` pairs in ascending label order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, &T)> + '_ {
        self.entries.iter().map(|(label, value)| (*label, value))
    }
}

impl<T> FromIterator<(i32, T)> for LabelIndexed<T> {
    fn from_iter<I: IntoIterator<Item = (i32, T)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<T> IntoIterator for LabelIndexed<T> {
    type Item = (i32, T);
    type IntoIter = std::collections::btree_map::IntoIter<i32, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
