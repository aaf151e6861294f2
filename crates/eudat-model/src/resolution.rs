//! Field-to-column resolution state.

use serde::{Deserialize, Serialize};

use crate::schema::FieldKey;

/// Physical column(s) a field resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnRef {
    Single(String),
    /// Several source columns, e.g. the address components of a place.
    Multiple(Vec<String>),
}

impl ColumnRef {
    pub fn single(name: impl Into<String>) -> Self {
        Self::Single(name.into())
    }

    pub fn columns(&self) -> Vec<&str> {
        match self {
            Self::Single(name) => vec![name.as_str()],
            Self::Multiple(names) => names.iter().map(String::as_str).collect(),
        }
    }

    pub fn as_single(&self) -> Option<&str> {
        match self {
            Self::Single(name) => Some(name),
            Self::Multiple(_) => None,
        }
    }

    pub fn contains(&self, column: &str) -> bool {
        match self {
            Self::Single(name) => name == column,
            Self::Multiple(names) => names.iter().any(|n| n == column),
        }
    }
}

/// Ordered mapping from field keys to resolved columns.
///
/// An entry whose value is `None` marks a field that was kept without a
/// source column and will be created empty. Fields absent from the map were
/// dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionMap {
    entries: Vec<(FieldKey, Option<ColumnRef>)>,
}

impl ResolutionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the entry for `key`, keeping its original position when it
    /// already exists.
    pub fn set(&mut self, key: FieldKey, value: Option<ColumnRef>) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Option<ColumnRef>> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    /// Resolved column for `key`, if the entry exists and is not empty.
    pub fn get(&self, key: &str) -> Option<&ColumnRef> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.as_ref())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldKey, Option<&ColumnRef>)> {
        self.entries.iter().map(|(k, v)| (k, v.as_ref()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &FieldKey> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fields whose resolution includes `column`.
    pub fn fields_using(&self, column: &str) -> Vec<&FieldKey> {
        self.entries
            .iter()
            .filter(|(_, v)| v.as_ref().is_some_and(|c| c.contains(column)))
            .map(|(k, _)| k)
            .collect()
    }

    /// Applies `overrides` on top of this map; overriding entries win.
    pub fn merge(&mut self, overrides: &ResolutionMap) {
        for (key, value) in &overrides.entries {
            self.set(key.clone(), value.clone());
        }
    }
}

impl FromIterator<(FieldKey, Option<ColumnRef>)> for ResolutionMap {
    fn from_iter<T: IntoIterator<Item = (FieldKey, Option<ColumnRef>)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.set(key, value);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(value: &str) -> FieldKey {
        FieldKey::new(value).unwrap()
    }

    #[test]
    fn set_keeps_first_position() {
        let mut map = ResolutionMap::new();
        map.set(key("a"), Some(ColumnRef::single("x")));
        map.set(key("b"), None);
        map.set(key("a"), Some(ColumnRef::single("y")));

        let keys: Vec<&str> = map.keys().map(FieldKey::as_str).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(map.get("a"), Some(&ColumnRef::single("y")));
        assert_eq!(map.get("b"), None);
        assert!(map.contains_key("b"));
    }

    #[test]
    fn merge_prefers_overrides() {
        let mut base: ResolutionMap = [
            (key("lat"), Some(ColumnRef::single("y"))),
            (key("lon"), Some(ColumnRef::single("x"))),
        ]
        .into_iter()
        .collect();
        let overrides: ResolutionMap = [(key("lat"), Some(ColumnRef::single("coord")))]
            .into_iter()
            .collect();
        base.merge(&overrides);

        assert_eq!(base.get("lat").and_then(ColumnRef::as_single), Some("coord"));
        assert_eq!(base.fields_using("x").len(), 1);
    }
}
