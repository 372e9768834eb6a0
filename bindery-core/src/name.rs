//! Canonical configuration property names
//!
//! A [`ConfigurationPropertyName`] is a sequence of elements. Named elements
//! compare on their *uniform* form (lowercase, alphanumeric characters only), so
//! `server.connection-timeout`, `server.connectionTimeout` and
//! `server.connection_timeout` are the same name. Indexed elements (`[0]`,
//! `[some.key]`) compare on their exact content; numeric indices compare on
//! their value.

use crate::error::{BindError, Result};
use serde::{Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// The textual form of a single element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Form {
    /// Exactly as written in the source key
    Original,
    /// Lowercase kebab form used for display
    Canonical,
    /// Lowercase alphanumeric form used for comparison
    Uniform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ElementKind {
    Named,
    Indexed,
    NumericIndex(usize),
}

#[derive(Debug, Clone)]
struct Element {
    original: String,
    canonical: String,
    uniform: String,
    kind: ElementKind,
}

impl Element {
    fn named(original: &str) -> Option<Self> {
        if let Some(index) = numeric_index(original) {
            return Some(Self::numeric(original, index));
        }
        let uniform = uniform(original);
        if uniform.is_empty() {
            return None;
        }
        Some(Self {
            original: original.to_string(),
            canonical: kebab(original),
            uniform,
            kind: ElementKind::Named,
        })
    }

    fn indexed(content: &str) -> Self {
        if let Some(index) = numeric_index(content) {
            return Self::numeric(content, index);
        }
        Self {
            original: content.to_string(),
            canonical: content.to_string(),
            uniform: content.to_string(),
            kind: ElementKind::Indexed,
        }
    }

    fn numeric(original: &str, index: usize) -> Self {
        Self {
            original: original.to_string(),
            canonical: original.to_string(),
            uniform: index.to_string(),
            kind: ElementKind::NumericIndex(index),
        }
    }

    fn is_indexed(&self) -> bool {
        !matches!(self.kind, ElementKind::Named)
    }

    fn form(&self, form: Form) -> &str {
        match form {
            Form::Original => &self.original,
            Form::Canonical => &self.canonical,
            Form::Uniform => &self.uniform,
        }
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.is_indexed() == other.is_indexed() && self.uniform == other.uniform
    }
}

impl Eq for Element {}

impl Hash for Element {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.is_indexed().hash(state);
        self.uniform.hash(state);
    }
}

fn numeric_index(value: &str) -> Option<usize> {
    if value.is_empty() || !value.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

fn uniform(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Lowercase kebab form: `connectionTimeout` and `connection_timeout` both
/// become `connection-timeout`.
pub(crate) fn kebab(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 4);
    let mut previous: Option<char> = None;
    for ch in value.chars() {
        if ch == '_' {
            out.push('-');
        } else if ch.is_uppercase() {
            if previous.is_some_and(|p| p.is_lowercase() || p.is_ascii_digit()) {
                out.push('-');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
        previous = Some(ch);
    }
    out
}

/// A canonicalized, comparable configuration property name
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ConfigurationPropertyName {
    elements: Vec<Element>,
}

impl ConfigurationPropertyName {
    /// The empty (root) name
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a key written in any supported convention.
    ///
    /// Fails with [`BindError::MalformedKey`] for unbalanced brackets, empty
    /// elements, or stray separators.
    pub fn parse(key: &str) -> Result<Self> {
        let malformed = |reason: &str| BindError::MalformedKey {
            key: key.to_string(),
            reason: reason.to_string(),
        };
        let mut elements = Vec::new();
        let mut current = String::new();
        let mut after_bracket = false;
        let mut chars = key.chars().peekable();

        while let Some(ch) = chars.next() {
            match ch {
                '.' => {
                    if !current.is_empty() {
                        let element =
                            Element::named(&current).ok_or_else(|| malformed("element has no alphanumeric characters"))?;
                        elements.push(element);
                        current.clear();
                    } else if !after_bracket {
                        return Err(malformed("empty element"));
                    }
                    if chars.peek().is_none() {
                        return Err(malformed("trailing '.'"));
                    }
                    after_bracket = false;
                }
                '[' => {
                    if !current.is_empty() {
                        let element =
                            Element::named(&current).ok_or_else(|| malformed("element has no alphanumeric characters"))?;
                        elements.push(element);
                        current.clear();
                    }
                    let mut content = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        match c {
                            ']' => {
                                closed = true;
                                break;
                            }
                            '[' => return Err(malformed("nested '['")),
                            c => content.push(c),
                        }
                    }
                    if !closed {
                        return Err(malformed("unclosed '['"));
                    }
                    if content.is_empty() {
                        return Err(malformed("empty index"));
                    }
                    elements.push(Element::indexed(&content));
                    match chars.peek() {
                        None | Some('.') | Some('[') => {}
                        Some(_) => return Err(malformed("expected '.' or '[' after ']'")),
                    }
                    after_bracket = true;
                }
                ']' => return Err(malformed("unexpected ']'")),
                c => {
                    current.push(c);
                    after_bracket = false;
                }
            }
        }

        if !current.is_empty() {
            let element = Element::named(&current).ok_or_else(|| malformed("element has no alphanumeric characters"))?;
            elements.push(element);
        }
        Ok(Self { elements })
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Append one or more elements parsed from `suffix`
    pub fn append(&self, suffix: &str) -> Result<Self> {
        let suffix = Self::parse(suffix)?;
        let mut elements = self.elements.clone();
        elements.extend(suffix.elements);
        Ok(Self { elements })
    }

    /// Append a numeric index element
    pub fn append_index(&self, index: usize) -> Self {
        let mut elements = self.elements.clone();
        elements.push(Element::numeric(&index.to_string(), index));
        Self { elements }
    }

    /// Append a bracketed element holding `key` verbatim
    pub fn append_key(&self, key: &str) -> Self {
        let mut elements = self.elements.clone();
        elements.push(Element::indexed(key));
        Self { elements }
    }

    /// Keep only the first `size` elements
    pub fn chop(&self, size: usize) -> Self {
        Self {
            elements: self.elements.iter().take(size).cloned().collect(),
        }
    }

    /// Swap the first `size` elements for `prefix`
    pub fn replace_prefix(&self, size: usize, prefix: &Self) -> Self {
        let mut elements = prefix.elements.clone();
        elements.extend(self.elements.iter().skip(size).cloned());
        Self { elements }
    }

    pub fn parent(&self) -> Self {
        self.chop(self.len().saturating_sub(1))
    }

    /// True if `other` is a direct child of this name
    pub fn is_parent_of(&self, other: &Self) -> bool {
        other.len() == self.len() + 1 && self.is_prefix_of(other)
    }

    /// True if `other` is a (strict) descendant of this name
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        other.len() > self.len() && self.is_prefix_of(other)
    }

    fn is_prefix_of(&self, other: &Self) -> bool {
        self.elements
            .iter()
            .zip(other.elements.iter())
            .all(|(a, b)| a == b)
    }

    pub fn element(&self, index: usize, form: Form) -> Option<&str> {
        self.elements.get(index).map(|e| e.form(form))
    }

    pub fn last_element(&self, form: Form) -> Option<&str> {
        self.elements.last().map(|e| e.form(form))
    }

    pub fn is_indexed(&self, index: usize) -> bool {
        self.elements.get(index).is_some_and(Element::is_indexed)
    }

    /// The numeric index held by the element at `index`, if it is one
    pub fn index_at(&self, index: usize) -> Option<usize> {
        match self.elements.get(index)?.kind {
            ElementKind::NumericIndex(value) => Some(value),
            _ => None,
        }
    }

    pub fn elements(&self, form: Form) -> impl Iterator<Item = &str> + '_ {
        self.elements.iter().map(move |e| e.form(form))
    }

    /// The same name with every dashed element split into separate elements.
    /// `server.connection-timeout` becomes `server.connection.timeout`.
    pub(crate) fn split_dashes(&self) -> Option<Self> {
        if !self
            .elements
            .iter()
            .any(|e| !e.is_indexed() && e.canonical.contains('-'))
        {
            return None;
        }
        let mut elements = Vec::with_capacity(self.elements.len() + 2);
        for element in &self.elements {
            if element.is_indexed() || !element.canonical.contains('-') {
                elements.push(element.clone());
                continue;
            }
            elements.extend(element.canonical.split('-').filter_map(Element::named));
        }
        Some(Self { elements })
    }
}

impl fmt::Display for ConfigurationPropertyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, element) in self.elements.iter().enumerate() {
            if element.is_indexed() {
                write!(f, "[{}]", element.canonical)?;
            } else if i == 0 {
                f.write_str(&element.canonical)?;
            } else {
                write!(f, ".{}", element.canonical)?;
            }
        }
        Ok(())
    }
}

impl FromStr for ConfigurationPropertyName {
    type Err = BindError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for ConfigurationPropertyName {
    type Error = BindError;

    fn try_from(value: &str) -> Result<Self> {
        Self::parse(value)
    }
}

impl Serialize for ConfigurationPropertyName {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn name(key: &str) -> ConfigurationPropertyName {
        ConfigurationPropertyName::parse(key).unwrap()
    }

    #[test]
    fn test_relaxed_spellings_are_equal() {
        let expected = name("server.connection-timeout");
        assert_eq!(name("server.connectionTimeout"), expected);
        assert_eq!(name("server.connection_timeout"), expected);
        assert_eq!(name("Server.Connection-Timeout"), expected);
        assert_eq!(name("server.connectionTimeout").to_string(), "server.connection-timeout");
    }

    #[test]
    fn test_indexed_elements() {
        let parsed = name("list[0].name");
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed.index_at(1), Some(0));
        assert_eq!(parsed.to_string(), "list[0].name");
        assert_eq!(name("list.0.name"), parsed);
        assert_eq!(name("my.map[Key.With.Dots]").element(2, Form::Original), Some("Key.With.Dots"));
    }

    #[test]
    fn test_indexed_keys_are_case_sensitive() {
        assert_ne!(name("map[Foo]"), name("map[foo]"));
        assert_ne!(name("map[foo]"), name("map.foo"));
    }

    #[test]
    fn test_malformed_keys() {
        for key in ["list[0", "list]0", "a..b", ".a", "a.", "a[]", "a[0]b", "a[[0]]", "a.-.b"] {
            let error = ConfigurationPropertyName::parse(key).unwrap_err();
            assert!(matches!(error, BindError::MalformedKey { .. }), "{key} should be malformed");
        }
    }

    #[test]
    fn test_ancestry() {
        let root = name("server");
        assert!(root.is_ancestor_of(&name("server.ssl.enabled")));
        assert!(root.is_parent_of(&name("server.port")));
        assert!(!root.is_parent_of(&name("server.ssl.enabled")));
        assert!(!root.is_ancestor_of(&root));
        assert!(ConfigurationPropertyName::empty().is_ancestor_of(&root));
        assert_eq!(name("a.b[2]").parent(), name("a.b"));
    }

    #[test]
    fn test_split_dashes() {
        assert_eq!(
            name("server.connection-timeout").split_dashes(),
            Some(name("server.connection.timeout"))
        );
        assert_eq!(name("server.port").split_dashes(), None);
    }

    proptest! {
        #[test]
        fn canonicalization_is_idempotent(key in "[a-zA-Z][a-zA-Z0-9_-]{0,8}(\\.[a-zA-Z][a-zA-Z0-9_-]{0,8}){0,3}(\\[[0-9]{1,2}\\])?") {
            let once = name(&key);
            let canonical = once.to_string();
            let twice = name(&canonical);
            prop_assert_eq!(&twice, &once);
            prop_assert_eq!(twice.to_string(), canonical);
        }
    }
}
