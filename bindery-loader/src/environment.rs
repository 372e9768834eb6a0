//! Assembly of the prioritized source list an application binds from

use crate::command_line::CommandLinePropertySource;
use crate::error::{LoadError, LoadResult};
use crate::properties::load_properties;
use crate::yaml::load_yaml;
use bindery_core::{
    Binder, ConfigurationPropertySources, MapPropertySource, PropertySource,
    SystemEnvironmentPropertySource,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace};

const DEFAULT_NAME: &str = "application";
const DEFAULT_LOCATIONS: [&str; 2] = ["./config", "."];
const EXTENSIONS: [&str; 3] = ["properties", "yaml", "yml"];

/// Builds the property sources for an application, highest priority first:
///
/// 1. command line arguments
/// 2. environment variables
/// 3. explicitly named files, the last one given winning
/// 4. `<name>.properties`, `<name>.yaml` and `<name>.yml` found in the search
///    locations, `./config` before `.`
#[derive(Debug, Clone)]
pub struct EnvironmentLoader {
    env_prefix: Option<String>,
    include_env: bool,
    locations: Vec<PathBuf>,
    names: Vec<String>,
    files: Vec<PathBuf>,
    args: Vec<String>,
}

impl Default for EnvironmentLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvironmentLoader {
    pub fn new() -> Self {
        Self {
            env_prefix: None,
            include_env: true,
            locations: DEFAULT_LOCATIONS.iter().map(PathBuf::from).collect(),
            names: vec![DEFAULT_NAME.to_string()],
            files: Vec::new(),
            args: Vec::new(),
        }
    }

    /// Only read environment variables starting with `PREFIX_`
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    pub fn without_env(mut self) -> Self {
        self.include_env = false;
        self
    }

    /// Replace the directories searched for configuration files
    pub fn with_locations<I, P>(mut self, locations: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.locations = locations.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the base file names looked up in each location
    pub fn with_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Add a file that must exist
    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.files.push(file.into());
        self
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Load every source, highest priority first
    pub fn load_sources(&self) -> LoadResult<Vec<Arc<dyn PropertySource>>> {
        let mut sources: Vec<Arc<dyn PropertySource>> = Vec::new();
        if !self.args.is_empty() {
            sources.push(Arc::new(CommandLinePropertySource::parse(&self.args)?));
        }
        if self.include_env {
            let mut environment = SystemEnvironmentPropertySource::from_env();
            if let Some(prefix) = &self.env_prefix {
                environment = environment.with_prefix(prefix.clone());
            }
            sources.push(Arc::new(environment));
        }
        for file in self.files.iter().rev() {
            sources.push(Arc::new(load_file(file)?));
        }
        for location in &self.locations {
            for name in &self.names {
                for extension in EXTENSIONS {
                    let candidate = location.join(format!("{name}.{extension}"));
                    if candidate.is_file() {
                        sources.push(Arc::new(load_file(&candidate)?));
                    } else {
                        trace!(path = %candidate.display(), "No configuration file");
                    }
                }
            }
        }
        debug!(
            sources = ?sources.iter().map(|s| s.name().to_string()).collect::<Vec<_>>(),
            "Loaded property sources"
        );
        Ok(sources)
    }

    /// Load and adapt every source
    pub fn load(&self) -> LoadResult<ConfigurationPropertySources> {
        Ok(ConfigurationPropertySources::new(self.load_sources()?)?)
    }

    /// Load every source and build a binder over them
    pub fn binder(&self) -> LoadResult<Binder> {
        Ok(Binder::new(self.load()?))
    }
}

/// Load a single `.properties`, `.yaml` or `.yml` file
pub fn load_file(path: &Path) -> LoadResult<MapPropertySource> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let yaml = match extension.as_deref() {
        Some("properties") => false,
        Some("yaml" | "yml") => true,
        _ => return Err(LoadError::UnsupportedFormat(path.to_path_buf())),
    };
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let resource = format!("file [{}]", path.display());
    debug!(path = %path.display(), "Loading configuration file");
    if !yaml {
        return load_properties(&resource, &content);
    }
    load_yaml(&resource, &content).map_err(|error| match error {
        LoadError::Yaml { source, .. } => LoadError::Yaml {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })
}
