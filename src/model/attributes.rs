//! Container-level attributes (name/value metadata) of an image file

use std::collections::BTreeMap;
use std::fmt;

/// Ordered set of named string attributes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeSet {
    values: BTreeMap<String, String>,
}

impl AttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an attribute, replacing any previous value
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates attributes in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AttributeSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = AttributeSet::new();
        for (name, value) in iter {
            set.insert(name, value);
        }
        set
    }
}

impl fmt::Display for AttributeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in self.iter() {
            writeln!(f, "  {}: {}", name, value)?;
        }
        Ok(())
    }
}
