//! `${...}` placeholder resolution in property values

use crate::error::{BindError, BindingFailureKind, Result};
use crate::name::ConfigurationPropertyName;
use crate::source::ConfigurationPropertySources;

const PREFIX: &str = "${";
const SUFFIX: u8 = b'}';
const SEPARATOR: char = ':';

/// Resolves placeholders in raw values before conversion
pub trait PlaceholdersResolver: Send + Sync {
    fn resolve_placeholders(&self, value: &str) -> Result<String>;
}

/// Resolves `${name}` and `${name:default}` against property sources.
///
/// Placeholders nest, resolved values are themselves resolved, and a
/// placeholder with no value and no default is left as written.
#[derive(Debug, Clone)]
pub struct SourcesPlaceholdersResolver {
    sources: ConfigurationPropertySources,
}

impl SourcesPlaceholdersResolver {
    pub fn new(sources: ConfigurationPropertySources) -> Self {
        Self { sources }
    }

    fn parse(&self, value: &str, visiting: &mut Vec<String>) -> Result<String> {
        let mut out = String::with_capacity(value.len());
        let mut rest = value;
        while let Some(start) = rest.find(PREFIX) {
            out.push_str(&rest[..start]);
            let after = &rest[start + PREFIX.len()..];
            let Some(end) = placeholder_end(after) else {
                out.push_str(&rest[start..]);
                return Ok(out);
            };
            let placeholder = &after[..end];
            let resolved = self.parse(placeholder, visiting)?;
            let (key, default) = match resolved.split_once(SEPARATOR) {
                Some((key, default)) => (key.trim(), Some(default)),
                None => (resolved.trim(), None),
            };
            match self.lookup(key) {
                Some(raw) => {
                    if visiting.iter().any(|k| k == key) {
                        let name = ConfigurationPropertyName::parse(key).unwrap_or_default();
                        return Err(BindError::binding(
                            &name,
                            BindingFailureKind::CircularPlaceholder(key.to_string()),
                        ));
                    }
                    visiting.push(key.to_string());
                    let value = self.parse(&raw, visiting);
                    visiting.pop();
                    out.push_str(&value?);
                }
                None => match default {
                    Some(default) => out.push_str(default),
                    None => {
                        out.push_str(PREFIX);
                        out.push_str(placeholder);
                        out.push(char::from(SUFFIX));
                    }
                },
            }
            rest = &after[end + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }

    fn lookup(&self, key: &str) -> Option<String> {
        let name = ConfigurationPropertyName::parse(key).ok()?;
        if name.is_empty() {
            return None;
        }
        self.sources.find(&name).map(|p| p.value().to_string())
    }
}

impl PlaceholdersResolver for SourcesPlaceholdersResolver {
    fn resolve_placeholders(&self, value: &str) -> Result<String> {
        if !value.contains(PREFIX) {
            return Ok(value.to_string());
        }
        self.parse(value, &mut Vec::new())
    }
}

/// Byte offset of the `}` closing a placeholder whose `${` was just consumed
fn placeholder_end(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i..].starts_with(PREFIX.as_bytes()) {
            depth += 1;
            i += PREFIX.len();
            continue;
        }
        if bytes[i] == SUFFIX {
            if depth == 0 {
                return Some(i);
            }
            depth -= 1;
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MapPropertySource;

    fn resolver(pairs: &[(&str, &str)]) -> SourcesPlaceholdersResolver {
        SourcesPlaceholdersResolver::new(
            ConfigurationPropertySources::from_source(MapPropertySource::from_pairs(
                "test",
                pairs.iter().copied(),
            ))
            .unwrap(),
        )
    }

    #[test]
    fn test_simple_and_relaxed_lookup() {
        let resolver = resolver(&[("app.host", "example.org"), ("app.connectionTimeout", "5s")]);
        assert_eq!(
            resolver.resolve_placeholders("http://${app.host}/x").unwrap(),
            "http://example.org/x"
        );
        assert_eq!(resolver.resolve_placeholders("${app.connection-timeout}").unwrap(), "5s");
    }

    #[test]
    fn test_defaults_and_nesting() {
        let resolver = resolver(&[("app.env", "prod"), ("db.prod.url", "postgres://prod")]);
        assert_eq!(resolver.resolve_placeholders("${missing:fallback}").unwrap(), "fallback");
        assert_eq!(resolver.resolve_placeholders("${missing:}").unwrap(), "");
        assert_eq!(resolver.resolve_placeholders("${db.${app.env}.url}").unwrap(), "postgres://prod");
    }

    #[test]
    fn test_unresolvable_left_as_is() {
        let resolver = resolver(&[]);
        assert_eq!(resolver.resolve_placeholders("a ${missing} b").unwrap(), "a ${missing} b");
        assert_eq!(resolver.resolve_placeholders("unclosed ${x").unwrap(), "unclosed ${x");
    }

    #[test]
    fn test_recursive_values() {
        let resolver = resolver(&[("a", "${b}-a"), ("b", "b")]);
        assert_eq!(resolver.resolve_placeholders("${a}").unwrap(), "b-a");
    }

    #[test]
    fn test_circular_reference() {
        let resolver = resolver(&[("a", "${b}"), ("b", "${a}")]);
        let error = resolver.resolve_placeholders("${a}").unwrap_err();
        assert!(matches!(
            error,
            BindError::BindingFailure {
                kind: BindingFailureKind::CircularPlaceholder(_),
                ..
            }
        ));
    }
}
