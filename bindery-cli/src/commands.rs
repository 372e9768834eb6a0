//! Command implementations. Output goes to the supplied writer so commands
//! can be run against a buffer; each returns whether it succeeded.

use crate::cli::{Cli, TargetType};
use anyhow::{Context, Result};
use bindery_core::{Binder, ConfigurationPropertyName, ConfigurationPropertySources};
use bindery_diagnostics::{
    build_message, default_analyzers, BindFailureAnalyzer, FailureAnalyzer, LoggingFailureAnalysisReporter,
};
use bindery_loader::{EnvironmentLoader, LoadError};
use colored::Colorize;
use std::collections::HashSet;
use std::io::Write;
use tracing::debug;

/// Build the source loader described by the global flags and trailing arguments
pub fn loader(cli: &Cli, args: &[String]) -> EnvironmentLoader {
    let mut loader = EnvironmentLoader::new().with_args(args.iter().cloned());
    if !cli.locations.is_empty() {
        loader = loader.with_locations(cli.locations.iter().cloned());
    }
    if let Some(name) = &cli.name {
        loader = loader.with_names([name.clone()]);
    }
    if cli.no_env {
        loader = loader.without_env();
    } else if let Some(prefix) = &cli.env_prefix {
        loader = loader.with_env_prefix(prefix.clone());
    }
    for file in &cli.files {
        loader = loader.with_file(file.clone());
    }
    loader
}

/// Load the sources. A source whose keys cannot be bound is reported as a
/// startup failure and yields `None`.
pub fn load(loader: &EnvironmentLoader) -> Result<Option<ConfigurationPropertySources>> {
    match loader.load() {
        Ok(sources) => Ok(Some(sources)),
        Err(LoadError::Bind(error)) => match BindFailureAnalyzer.analyze(&error) {
            Some(analysis) => {
                LoggingFailureAnalysisReporter.report(&analysis);
                Ok(None)
            }
            None => Err(anyhow::Error::new(error).context("Failed to load configuration sources")),
        },
        Err(error) => Err(anyhow::Error::new(error).context("Failed to load configuration sources")),
    }
}

pub fn get(
    sources: ConfigurationPropertySources,
    name: &str,
    target: TargetType,
    json: bool,
    out: &mut dyn Write,
) -> Result<bool> {
    let binder = Binder::new(sources);
    let result = binder
        .bind(name, &target.bindable())
        .with_context(|| format!("Failed to bind '{name}'"))?;
    match result.into_option() {
        Some(value) if json => writeln!(out, "{}", serde_json::to_string_pretty(&value.to_json())?)?,
        Some(value) => writeln!(out, "{value}")?,
        None => {
            debug!(name, "Property is not bound");
            writeln!(out, "{}", format!("'{name}' is not set").yellow())?;
            return Ok(false);
        }
    }
    Ok(true)
}

pub fn list(sources: &ConfigurationPropertySources, prefix: Option<&str>, out: &mut dyn Write) -> Result<bool> {
    let prefix = prefix
        .map(ConfigurationPropertyName::parse)
        .transpose()
        .context("Invalid property name prefix")?
        .unwrap_or_else(ConfigurationPropertyName::empty);
    let mut seen = HashSet::new();
    for source in sources.iter() {
        let mut header = false;
        for name in source.names() {
            if !(prefix.is_empty() || prefix == *name || prefix.is_ancestor_of(name)) {
                continue;
            }
            let Some(property) = source.get(name) else {
                continue;
            };
            if !header {
                writeln!(out, "{}", source.name().bold())?;
                header = true;
            }
            let origin = property
                .origin()
                .map(|origin| format!("  ({origin})").dimmed().to_string())
                .unwrap_or_default();
            let line = format!("  {name} = {}", property.value());
            if seen.insert(name.clone()) {
                writeln!(out, "{line}{origin}")?;
            } else {
                writeln!(out, "{} {}{origin}", line.strikethrough(), "shadowed".yellow())?;
            }
        }
    }
    Ok(true)
}

pub fn explain(
    sources: ConfigurationPropertySources,
    name: &str,
    target: TargetType,
    out: &mut dyn Write,
) -> Result<bool> {
    let binder = Binder::new(sources.clone());
    match binder.bind(name, &target.bindable()) {
        Ok(result) => {
            match result.get() {
                Some(value) => writeln!(out, "{} = {}", name.bold(), value.to_string().green())?,
                None => writeln!(out, "{} is not set", name.bold())?,
            }
            let parsed = ConfigurationPropertyName::parse(name)?;
            for (index, property) in sources.find_all(&parsed).iter().enumerate() {
                let marker = if index == 0 { "used" } else { "shadowed" };
                let origin = property.origin().map(ToString::to_string).unwrap_or_default();
                writeln!(
                    out,
                    "  [{marker}] {} = '{}' {}",
                    property.source(),
                    property.value(),
                    origin.dimmed()
                )?;
            }
            Ok(true)
        }
        Err(error) => {
            let Some(analysis) = default_analyzers(sources).analyze(&error) else {
                return Err(anyhow::Error::new(error).context(format!("Failed to bind '{name}'")));
            };
            write!(out, "{}", build_message(&analysis).red())?;
            Ok(false)
        }
    }
}

pub fn sources(sources: &ConfigurationPropertySources, out: &mut dyn Write) -> Result<bool> {
    for (index, source) in sources.iter().enumerate() {
        writeln!(
            out,
            "{:>3}. {} ({} properties)",
            index + 1,
            source.name().bold(),
            source.names().len()
        )?;
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindery_core::{MapPropertySource, PropertySource};
    use std::sync::Arc;

    fn sources() -> ConfigurationPropertySources {
        colored::control::set_override(false);
        let high: Arc<dyn PropertySource> = Arc::new(
            MapPropertySource::new("high")
                .with_property("server.port", "9000")
                .with_property("server.timeout", "later"),
        );
        let low: Arc<dyn PropertySource> = Arc::new(
            MapPropertySource::new("low")
                .with_property("server.port", "8080")
                .with_property("app.name", "demo"),
        );
        ConfigurationPropertySources::new([high, low]).unwrap()
    }

    fn output(run: impl FnOnce(&mut Vec<u8>) -> Result<bool>) -> (bool, String) {
        let mut buffer = Vec::new();
        let ok = run(&mut buffer).unwrap();
        (ok, String::from_utf8(buffer).unwrap())
    }

    #[test]
    fn test_get() {
        let (ok, text) = output(|out| get(sources(), "server.port", TargetType::Uint, false, out));
        assert!(ok);
        assert_eq!(text, "9000\n");

        let (ok, text) = output(|out| get(sources(), "server.missing", TargetType::String, false, out));
        assert!(!ok);
        assert!(text.contains("not set"));
    }

    #[test]
    fn test_get_json() {
        let (_, text) = output(|out| get(sources(), "server", TargetType::Map, true, out));
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["port"], "9000");
    }

    #[test]
    fn test_list_marks_shadowed() {
        let (_, text) = output(|out| list(&sources(), Some("server"), out));
        assert!(text.contains("high\n  server.port = 9000"));
        assert!(text.contains("low\n  server.port = 8080 shadowed"));
        assert!(!text.contains("app.name"));
    }

    #[test]
    fn test_explain_success() {
        let (ok, text) = output(|out| explain(sources(), "server.port", TargetType::Uint, out));
        assert!(ok);
        assert!(text.starts_with("server.port = 9000\n"));
        assert!(text.contains("[used] high = '9000'"));
        assert!(text.contains("[shadowed] low = '8080'"));
    }

    #[test]
    fn test_explain_failure() {
        let (ok, text) = output(|out| explain(sources(), "server.timeout", TargetType::Duration, out));
        assert!(!ok);
        assert!(text.contains("APPLICATION FAILED TO START"));
        assert!(text.contains("Invalid value 'later' for configuration property 'server.timeout'"));
    }

    #[test]
    fn test_sources() {
        let (_, text) = output(|out| sources_command(out));
        assert_eq!(text, "  1. high (2 properties)\n  2. low (2 properties)\n");
    }

    #[test]
    fn test_load_reports_malformed_key() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("application.properties"), "app[x=1\n").unwrap();
        let loader = EnvironmentLoader::new().with_locations([dir.path()]).without_env();
        assert!(load(&loader).unwrap().is_none());

        std::fs::write(dir.path().join("application.properties"), "app.x=1\n").unwrap();
        assert_eq!(load(&loader).unwrap().unwrap().len(), 1);
    }

    fn sources_command(out: &mut Vec<u8>) -> Result<bool> {
        super::sources(&sources(), out)
    }
}
