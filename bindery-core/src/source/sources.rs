//! Canonical-name views over raw property sources

use super::mapper::PropertyMapper;
use super::{ConfigurationProperty, PropertySource};
use crate::error::Result;
use crate::name::ConfigurationPropertyName;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// A [`PropertySource`] indexed by canonical property name
#[derive(Debug)]
pub struct ConfigurationPropertySource {
    source: Arc<dyn PropertySource>,
    mapper: Arc<dyn PropertyMapper>,
    names: Vec<ConfigurationPropertyName>,
    keys: HashMap<ConfigurationPropertyName, String>,
}

impl ConfigurationPropertySource {
    /// Adapt a raw source, mapping every key up front.
    ///
    /// Fails with [`MalformedKey`](crate::BindError::MalformedKey) if the
    /// source's mapper rejects a key.
    pub fn adapt(source: Arc<dyn PropertySource>) -> Result<Self> {
        let mapper = source.property_mapper();
        let mut names = Vec::new();
        let mut keys = HashMap::new();
        for key in source.property_names() {
            match mapper.map_key(key)? {
                Some(name) => {
                    if keys.contains_key(&name) {
                        trace!(source = source.name(), key, "Ignoring duplicate spelling of {}", name);
                        continue;
                    }
                    names.push(name.clone());
                    keys.insert(name, key.to_string());
                }
                None => trace!(source = source.name(), key, "Skipping key that is not a property name"),
            }
        }
        debug!(source = source.name(), properties = names.len(), "Adapted property source");
        Ok(Self {
            source,
            mapper,
            names,
            keys,
        })
    }

    pub fn name(&self) -> &str {
        self.source.name()
    }

    pub fn underlying(&self) -> &Arc<dyn PropertySource> {
        &self.source
    }

    /// Every property name held by the source, in source order
    pub fn names(&self) -> &[ConfigurationPropertyName] {
        &self.names
    }

    pub fn get(&self, name: &ConfigurationPropertyName) -> Option<ConfigurationProperty> {
        if let Some(property) = self.lookup(name, name) {
            return Some(property);
        }
        self.mapper
            .alternatives(name)
            .iter()
            .find_map(|candidate| self.lookup(name, candidate))
    }

    fn lookup(
        &self,
        name: &ConfigurationPropertyName,
        candidate: &ConfigurationPropertyName,
    ) -> Option<ConfigurationProperty> {
        let key = self.keys.get(candidate)?;
        let value = self.source.get_property(key)?;
        let origin = self.source.origin(key);
        Some(
            ConfigurationProperty::new(name.clone(), value, origin, self.source.name())
                .with_matched_name(candidate.clone()),
        )
    }

    pub fn contains(&self, name: &ConfigurationPropertyName) -> bool {
        self.get(name).is_some()
    }

    pub fn contains_descendant_of(&self, name: &ConfigurationPropertyName) -> bool {
        if name.is_empty() {
            return !self.names.is_empty();
        }
        self.descendants_of(name).next().is_some()
    }

    /// Every name below `name` in source order, rewritten to start with
    /// `name` itself. An environment variable such as `APP_DATA_SOURCE_URL`
    /// is reported as `app.data-source.url` when asked for `app.data-source`.
    pub fn descendants_of<'a>(
        &'a self,
        name: &'a ConfigurationPropertyName,
    ) -> impl Iterator<Item = ConfigurationPropertyName> + 'a {
        self.names.iter().filter_map(move |candidate| {
            self.mapper
                .ancestor_length(name, candidate)
                .map(|size| candidate.replace_prefix(size, name))
        })
    }
}

/// Property sources in priority order: earlier sources win
#[derive(Debug, Clone, Default)]
pub struct ConfigurationPropertySources {
    sources: Arc<Vec<ConfigurationPropertySource>>,
}

impl ConfigurationPropertySources {
    pub fn new<I>(sources: I) -> Result<Self>
    where
        I: IntoIterator<Item = Arc<dyn PropertySource>>,
    {
        let sources = sources
            .into_iter()
            .map(ConfigurationPropertySource::adapt)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            sources: Arc::new(sources),
        })
    }

    pub fn from_source(source: impl PropertySource + 'static) -> Result<Self> {
        Self::new([Arc::new(source) as Arc<dyn PropertySource>])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigurationPropertySource> {
        self.sources.iter()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// The property from the highest-priority source that defines `name`
    pub fn find(&self, name: &ConfigurationPropertyName) -> Option<ConfigurationProperty> {
        self.sources.iter().find_map(|source| source.get(name))
    }

    /// One property per source that defines `name`, in priority order
    pub fn find_all(&self, name: &ConfigurationPropertyName) -> Vec<ConfigurationProperty> {
        self.sources.iter().filter_map(|source| source.get(name)).collect()
    }

    pub fn contains_descendant_of(&self, name: &ConfigurationPropertyName) -> bool {
        self.sources
            .iter()
            .any(|source| source.contains_descendant_of(name))
    }
}
