//! YAML files flattened into dotted property keys
//!
//! Nested mappings become `parent.child`, sequences become `list[0]`, and
//! null or empty values become empty strings. A file may hold several
//! documents; keys in later documents replace earlier ones.
//!
//! Values come from `serde_yaml`. Their positions come from a second pass
//! over `yaml-rust2` parser events, which carry line/column marks.

use crate::error::{LoadError, LoadResult};
use bindery_core::{Location, MapPropertySource, Origin};
use serde::Deserialize;
use serde_yaml::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, trace};
use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser};
use yaml_rust2::scanner::Marker;

/// Parse `content` into a source named `resource`
pub fn load_yaml(resource: &str, content: &str) -> LoadResult<MapPropertySource> {
    let mut source = MapPropertySource::new(resource);
    let locations = locate_keys(content);
    for (index, document) in serde_yaml::Deserializer::from_str(content).enumerate() {
        let value = Value::deserialize(document).map_err(|source| LoadError::Yaml {
            path: PathBuf::from(resource),
            source,
        })?;
        match value {
            Value::Mapping(_) => {
                let mut flat = Vec::new();
                flatten(String::new(), &value, &mut flat);
                trace!(resource, document = index, properties = flat.len(), "Flattened YAML document");
                let positions = locations.get(index);
                for (key, value) in flat {
                    let location = positions.and_then(|positions| positions.get(&key)).copied();
                    source.insert(key, value, Some(Origin::text_resource(resource, location)));
                }
            }
            Value::Null => {}
            other => {
                debug!(resource, document = index, kind = ?other, "Ignoring YAML document that is not a mapping");
            }
        }
    }
    Ok(source)
}

fn child_key(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else if key.starts_with('[') {
        format!("{path}{key}")
    } else {
        format!("{path}.{key}")
    }
}

fn flatten(path: String, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Mapping(mapping) if !mapping.is_empty() => {
            for (key, child) in mapping {
                flatten(child_key(&path, &scalar_text(key)), child, out);
            }
        }
        Value::Sequence(items) if !items.is_empty() => {
            for (index, child) in items.iter().enumerate() {
                flatten(format!("{path}[{index}]"), child, out);
            }
        }
        Value::Tagged(tagged) => flatten(path, &tagged.value, out),
        Value::Mapping(_) | Value::Sequence(_) => {
            if !path.is_empty() {
                out.push((path, String::new()));
            }
        }
        scalar => {
            if !path.is_empty() {
                out.push((path, scalar_text(scalar)));
            }
        }
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Tagged(tagged) => scalar_text(&tagged.value),
        other => serde_yaml::to_string(other)
            .map(|text| text.trim_end().to_string())
            .unwrap_or_default(),
    }
}

/// Position of every flattened key, one map per document. A file that fails
/// to parse yields whatever was located before the error.
fn locate_keys(content: &str) -> Vec<HashMap<String, Location>> {
    let mut locator = KeyLocator::default();
    if let Err(error) = Parser::new_from_str(content).load(&mut locator, true) {
        trace!(%error, "Stopped locating YAML keys");
    }
    if !locator.current.is_empty() {
        locator.documents.push(locator.current);
    }
    locator.documents
}

enum Frame {
    Mapping { path: String, key: Option<String> },
    Sequence { path: String, index: usize },
}

#[derive(Default)]
struct KeyLocator {
    documents: Vec<HashMap<String, Location>>,
    current: HashMap<String, Location>,
    stack: Vec<Frame>,
}

impl KeyLocator {
    /// The path of the node starting now, advancing the enclosing container
    fn next_path(&mut self) -> String {
        match self.stack.last_mut() {
            None => String::new(),
            Some(Frame::Mapping { path, key }) => child_key(path, &key.take().unwrap_or_default()),
            Some(Frame::Sequence { path, index }) => {
                let child = format!("{path}[{index}]");
                *index += 1;
                child
            }
        }
    }

    fn expects_key(&self) -> bool {
        matches!(self.stack.last(), Some(Frame::Mapping { key: None, .. }))
    }

    fn record(&mut self, path: String, mark: Marker) {
        if !path.is_empty() {
            let location = Location::new(mark.line().saturating_sub(1), mark.col());
            self.current.entry(path).or_insert(location);
        }
    }
}

impl MarkedEventReceiver for KeyLocator {
    fn on_event(&mut self, event: Event, mark: Marker) {
        match event {
            Event::Scalar(value, ..) if self.expects_key() => {
                if let Some(Frame::Mapping { key, .. }) = self.stack.last_mut() {
                    *key = Some(value);
                }
            }
            Event::Scalar(..) | Event::Alias(..) => {
                let path = self.next_path();
                self.record(path, mark);
            }
            Event::MappingStart(..) => {
                let path = self.next_path();
                self.record(path.clone(), mark);
                self.stack.push(Frame::Mapping { path, key: None });
            }
            Event::SequenceStart(..) => {
                let path = self.next_path();
                self.record(path.clone(), mark);
                self.stack.push(Frame::Sequence { path, index: 0 });
            }
            Event::MappingEnd | Event::SequenceEnd => {
                self.stack.pop();
            }
            Event::DocumentEnd => {
                self.stack.clear();
                self.documents.push(std::mem::take(&mut self.current));
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindery_core::{OriginLookup, PropertySource};

    #[test]
    fn test_nested_mappings_and_sequences() {
        let source = load_yaml(
            "application.yaml",
            r#"
server:
  port: 8080
  ssl:
    enabled: true
app:
  hosts:
    - a.example.org
    - b.example.org
  endpoints:
    - name: primary
      weight: 0.5
  empty-list: []
  nothing:
"#,
        )
        .unwrap();
        assert_eq!(source.get_property("server.port"), Some("8080"));
        assert_eq!(source.get_property("server.ssl.enabled"), Some("true"));
        assert_eq!(source.get_property("app.hosts[1]"), Some("b.example.org"));
        assert_eq!(source.get_property("app.endpoints[0].name"), Some("primary"));
        assert_eq!(source.get_property("app.endpoints[0].weight"), Some("0.5"));
        assert_eq!(source.get_property("app.empty-list"), Some(""));
        assert_eq!(source.get_property("app.nothing"), Some(""));
        assert_eq!(
            source.origin("server.port"),
            Some(Origin::text_resource("application.yaml", Some(Location::new(2, 8))))
        );
        assert_eq!(
            source.origin("app.hosts[1]").unwrap().to_string(),
            "application.yaml - 9:7"
        );
        assert_eq!(
            source.origin("app.endpoints[0].weight").unwrap().to_string(),
            "application.yaml - 12:15"
        );
    }

    #[test]
    fn test_bracketed_keys_and_documents() {
        let source = load_yaml(
            "application.yml",
            "map:\n  \"[a.b]\": 1\nname: first\n---\nname: second\n",
        )
        .unwrap();
        assert_eq!(source.get_property("map[a.b]"), Some("1"));
        assert_eq!(source.get_property("name"), Some("second"));
        assert_eq!(
            source.origin("map[a.b]"),
            Some(Origin::text_resource("application.yml", Some(Location::new(1, 11))))
        );
        assert_eq!(
            source.origin("name"),
            Some(Origin::text_resource("application.yml", Some(Location::new(4, 6))))
        );
    }

    #[test]
    fn test_invalid_yaml() {
        let error = load_yaml("broken.yaml", "server: [unclosed\n").unwrap_err();
        assert!(matches!(error, LoadError::Yaml { .. }));
    }
}
