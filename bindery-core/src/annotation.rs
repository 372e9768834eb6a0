//! Annotations that adjust how a single target is bound

use crate::data_size::DataUnit;
use crate::duration::DurationUnit;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Annotation {
    /// Values used for an unbound value-object parameter. An empty list on an
    /// object parameter means "create an empty instance".
    DefaultValue(Vec<String>),
    /// Bind a parameter or property under this name instead of its own
    Name(String),
    /// Unit for bare-number durations
    DurationUnit(DurationUnit),
    /// Unit for bare-number data sizes
    DataSizeUnit(DataUnit),
    /// Separator used when a collection is given as a single value
    Delimiter(String),
}

/// An ordered set of [`Annotation`]s
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Annotations(Vec<Annotation>);

impl Annotations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, annotation: Annotation) -> Self {
        self.insert(annotation);
        self
    }

    pub fn insert(&mut self, annotation: Annotation) {
        if !self.0.contains(&annotation) {
            self.0.push(annotation);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn default_value(&self) -> Option<&[String]> {
        self.0.iter().find_map(|a| match a {
            Annotation::DefaultValue(values) => Some(values.as_slice()),
            _ => None,
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.0.iter().find_map(|a| match a {
            Annotation::Name(name) => Some(name.as_str()),
            _ => None,
        })
    }

    pub fn duration_unit(&self) -> Option<DurationUnit> {
        self.0.iter().find_map(|a| match a {
            Annotation::DurationUnit(unit) => Some(*unit),
            _ => None,
        })
    }

    pub fn data_size_unit(&self) -> Option<DataUnit> {
        self.0.iter().find_map(|a| match a {
            Annotation::DataSizeUnit(unit) => Some(*unit),
            _ => None,
        })
    }

    pub fn delimiter(&self) -> Option<&str> {
        self.0.iter().find_map(|a| match a {
            Annotation::Delimiter(delimiter) => Some(delimiter.as_str()),
            _ => None,
        })
    }
}

impl FromIterator<Annotation> for Annotations {
    fn from_iter<I: IntoIterator<Item = Annotation>>(iter: I) -> Self {
        let mut annotations = Self::new();
        for annotation in iter {
            annotations.insert(annotation);
        }
        annotations
    }
}

impl From<Vec<Annotation>> for Annotations {
    fn from(value: Vec<Annotation>) -> Self {
        value.into_iter().collect()
    }
}

impl<const N: usize> From<[Annotation; N]> for Annotations {
    fn from(value: [Annotation; N]) -> Self {
        value.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_and_dedup() {
        let annotations = Annotations::from([
            Annotation::Name("timeout".into()),
            Annotation::DurationUnit(DurationUnit::Seconds),
            Annotation::Name("timeout".into()),
        ]);
        assert_eq!(annotations.len(), 2);
        assert_eq!(annotations.name(), Some("timeout"));
        assert_eq!(annotations.duration_unit(), Some(DurationUnit::Seconds));
        assert_eq!(annotations.delimiter(), None);
        assert!(annotations.default_value().is_none());
    }
}
