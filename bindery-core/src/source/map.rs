//! In-memory property source

use super::PropertySource;
use crate::origin::{Origin, OriginLookup};
use indexmap::IndexMap;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    origin: Option<Origin>,
}

/// A property source backed by an insertion-ordered map, optionally tracking
/// an origin per key
#[derive(Debug, Clone)]
pub struct MapPropertySource {
    name: String,
    properties: IndexMap<String, Entry>,
}

impl MapPropertySource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: IndexMap::new(),
        }
    }

    /// Build a source from key/value pairs; later duplicates replace earlier ones
    pub fn from_pairs<K, V>(name: impl Into<String>, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut source = Self::new(name);
        for (key, value) in pairs {
            source.insert(key, value, None);
        }
        source
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value, None);
        self
    }

    pub fn with_origin_tracked_property(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
        origin: Origin,
    ) -> Self {
        self.insert(key, value, Some(origin));
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>, origin: Option<Origin>) {
        self.properties.insert(
            key.into(),
            Entry {
                value: value.into(),
                origin,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

impl OriginLookup for MapPropertySource {
    fn origin(&self, key: &str) -> Option<Origin> {
        let entry = self.properties.get(key)?;
        Some(entry.origin.clone().unwrap_or_else(|| Origin::PropertySource {
            source: self.name.clone(),
            property: key.to_string(),
            origin: None,
        }))
    }
}

impl PropertySource for MapPropertySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn property_names(&self) -> Vec<&str> {
        self.properties.keys().map(String::as_str).collect()
    }

    fn get_property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(|e| e.value.as_str())
    }
}
