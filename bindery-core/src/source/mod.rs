//! Property sources and their origin-tracked configuration properties
//!
//! A [`PropertySource`] is a named set of raw `key -> value` pairs produced by
//! some loader. The binder never reads raw sources directly; each one is
//! adapted into a [`ConfigurationPropertySource`] that indexes its keys by
//! canonical [`ConfigurationPropertyName`], and the adapted sources are held in
//! priority order by [`ConfigurationPropertySources`].

mod environment;
mod map;
mod mapper;
mod sources;

pub use environment::{SystemEnvironmentPropertySource, SYSTEM_ENVIRONMENT};
pub use map::MapPropertySource;
pub use mapper::{
    environment_variable_name, DefaultPropertyMapper, PropertyMapper, SystemEnvironmentPropertyMapper,
};
pub use sources::{ConfigurationPropertySource, ConfigurationPropertySources};

use crate::name::ConfigurationPropertyName;
use crate::origin::{Origin, OriginLookup};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// A named, read-only collection of raw string properties
pub trait PropertySource: OriginLookup + fmt::Debug + Send + Sync {
    /// The name used in diagnostics, e.g. `systemEnvironment`
    fn name(&self) -> &str;

    /// All raw keys, in the source's own stable order
    fn property_names(&self) -> Vec<&str>;

    fn get_property(&self, key: &str) -> Option<&str>;

    fn contains_property(&self, key: &str) -> bool {
        self.get_property(key).is_some()
    }

    /// How raw keys of this source map onto property names
    fn property_mapper(&self) -> Arc<dyn PropertyMapper> {
        Arc::new(DefaultPropertyMapper)
    }
}

/// A single property value with its canonical name and origin
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigurationProperty {
    name: ConfigurationPropertyName,
    value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    origin: Option<Origin>,
    source: String,
    #[serde(skip)]
    matched: ConfigurationPropertyName,
}

impl ConfigurationProperty {
    pub fn new(
        name: ConfigurationPropertyName,
        value: impl Into<String>,
        origin: Option<Origin>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            matched: name.clone(),
            name,
            value: value.into(),
            origin,
            source: source.into(),
        }
    }

    pub(crate) fn with_matched_name(mut self, matched: ConfigurationPropertyName) -> Self {
        self.matched = matched;
        self
    }

    /// The name the property was requested under
    pub fn name(&self) -> &ConfigurationPropertyName {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn origin(&self) -> Option<&Origin> {
        self.origin.as_ref()
    }

    /// Name of the property source that supplied the value
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The name the source itself holds the value under; differs from
    /// [`name`](Self::name) when a relaxed alias matched.
    pub fn matched_name(&self) -> &ConfigurationPropertyName {
        &self.matched
    }
}

impl fmt::Display for ConfigurationProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[name={}, value={}", self.name, self.value)?;
        if let Some(origin) = &self.origin {
            write!(f, ", origin={origin}")?;
        }
        write!(f, "]")
    }
}
