//! Operating system environment as a property source

use super::mapper::{PropertyMapper, SystemEnvironmentPropertyMapper};
use super::PropertySource;
use crate::origin::{Origin, OriginLookup};
use indexmap::IndexMap;
use std::sync::Arc;

/// Name given to the environment source by default
pub const SYSTEM_ENVIRONMENT: &str = "systemEnvironment";

/// Environment variables, mapped with [`SystemEnvironmentPropertyMapper`]
#[derive(Debug, Clone)]
pub struct SystemEnvironmentPropertySource {
    name: String,
    prefix: Option<String>,
    variables: IndexMap<String, String>,
}

impl SystemEnvironmentPropertySource {
    /// Snapshot the current process environment. Variables are sorted by name
    /// so iteration order does not depend on the platform.
    pub fn from_env() -> Self {
        let mut variables: Vec<(String, String)> = std::env::vars().collect();
        variables.sort();
        Self::from_vars(variables)
    }

    pub fn from_vars<K, V>(variables: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            name: SYSTEM_ENVIRONMENT.to_string(),
            prefix: None,
            variables: variables
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Only consider variables starting with `PREFIX_`
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.prefix = (!prefix.is_empty()).then_some(prefix);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }
}

impl OriginLookup for SystemEnvironmentPropertySource {
    fn origin(&self, key: &str) -> Option<Origin> {
        self.variables
            .contains_key(key)
            .then(|| Origin::environment_variable(key))
    }
}

impl PropertySource for SystemEnvironmentPropertySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn property_names(&self) -> Vec<&str> {
        self.variables.keys().map(String::as_str).collect()
    }

    fn get_property(&self, key: &str) -> Option<&str> {
        self.variables.get(key).map(String::as_str)
    }

    fn property_mapper(&self) -> Arc<dyn PropertyMapper> {
        Arc::new(SystemEnvironmentPropertyMapper::new(self.prefix.clone()))
    }
}
