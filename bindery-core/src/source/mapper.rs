//! Mapping between raw source keys and configuration property names

use crate::error::Result;
use crate::name::{ConfigurationPropertyName, Form};
use std::fmt;

/// Maps the raw keys of a property source onto property names
pub trait PropertyMapper: fmt::Debug + Send + Sync {
    /// Map a raw key. `Ok(None)` means the key is not a property name and is
    /// skipped; an error means the key is malformed.
    fn map_key(&self, key: &str) -> Result<Option<ConfigurationPropertyName>>;

    /// Additional names a lookup of `name` should try, in order
    fn alternatives(&self, _name: &ConfigurationPropertyName) -> Vec<ConfigurationPropertyName> {
        Vec::new()
    }

    /// If `candidate` is a descendant of `name`, the number of leading
    /// elements of `candidate` that spell `name`
    fn ancestor_length(&self, name: &ConfigurationPropertyName, candidate: &ConfigurationPropertyName) -> Option<usize> {
        name.is_ancestor_of(candidate).then(|| name.len())
    }
}

/// Keys written in dotted form (`server.port`, `list[0].name`, `camelCase`)
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPropertyMapper;

impl PropertyMapper for DefaultPropertyMapper {
    fn map_key(&self, key: &str) -> Result<Option<ConfigurationPropertyName>> {
        ConfigurationPropertyName::parse(key).map(Some)
    }
}

/// Keys written as environment variables (`SERVER_PORT`, `MY_LIST_0_NAME`)
///
/// Underscores separate elements and purely numeric segments become indices.
/// A dashed name such as `server.connection-timeout` is matched both by
/// `SERVER_CONNECTIONTIMEOUT` and by the underscore form
/// `SERVER_CONNECTION_TIMEOUT`.
#[derive(Debug, Clone, Default)]
pub struct SystemEnvironmentPropertyMapper {
    prefix: Option<String>,
}

impl SystemEnvironmentPropertyMapper {
    pub fn new(prefix: Option<String>) -> Self {
        Self {
            prefix: prefix.map(|p| p.trim_end_matches('_').to_ascii_uppercase()),
        }
    }

    fn strip_prefix<'a>(&self, key: &'a str) -> Option<&'a str> {
        match &self.prefix {
            None => Some(key),
            Some(prefix) => {
                let upper = key.to_ascii_uppercase();
                if upper.len() > prefix.len() + 1
                    && upper.starts_with(prefix.as_str())
                    && upper.as_bytes()[prefix.len()] == b'_'
                {
                    Some(&key[prefix.len() + 1..])
                } else {
                    None
                }
            }
        }
    }
}

impl PropertyMapper for SystemEnvironmentPropertyMapper {
    fn map_key(&self, key: &str) -> Result<Option<ConfigurationPropertyName>> {
        let Some(key) = self.strip_prefix(key) else {
            return Ok(None);
        };
        let mut dotted = String::with_capacity(key.len() + 4);
        for segment in key.split('_') {
            if segment.is_empty() || !segment.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Ok(None);
            }
            if segment.chars().all(|c| c.is_ascii_digit()) {
                dotted.push('[');
                dotted.push_str(segment);
                dotted.push(']');
            } else {
                if !dotted.is_empty() {
                    dotted.push('.');
                }
                dotted.push_str(&segment.to_ascii_lowercase());
            }
        }
        if dotted.starts_with('[') {
            return Ok(None);
        }
        ConfigurationPropertyName::parse(&dotted).map(Some)
    }

    fn alternatives(&self, name: &ConfigurationPropertyName) -> Vec<ConfigurationPropertyName> {
        // Bracketed keys that are not plain indices cannot be expressed as
        // environment variables.
        let expressible = (0..name.len()).all(|i| {
            !name.is_indexed(i) || name.index_at(i).is_some()
        });
        if !expressible {
            return Vec::new();
        }
        name.split_dashes().into_iter().collect()
    }

    fn ancestor_length(&self, name: &ConfigurationPropertyName, candidate: &ConfigurationPropertyName) -> Option<usize> {
        if name.is_ancestor_of(candidate) {
            return Some(name.len());
        }
        let split = name.split_dashes()?;
        split.is_ancestor_of(candidate).then(|| split.len())
    }
}

/// Render `name` as the environment variable that would hold it
pub fn environment_variable_name(name: &ConfigurationPropertyName) -> String {
    name.elements(Form::Uniform)
        .map(str::to_ascii_uppercase)
        .collect::<Vec<_>>()
        .join("_")
}
