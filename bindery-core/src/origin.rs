//! Provenance of configuration values

use serde::Serialize;
use std::fmt;

/// Where a configuration value came from.
///
/// Origins are plain comparable values so they can be used as set keys when
/// deduplicating the sources that define the same property.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Origin {
    /// A text resource such as a `.properties` or YAML file
    TextResource {
        resource: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        location: Option<Location>,
    },

    /// An operating system environment variable
    EnvironmentVariable { name: String },

    /// A `--key=value` command line argument
    CommandLineArgument { argument: String, index: usize },

    /// A property looked up from a named property source, optionally wrapping
    /// the more precise origin the source reported
    PropertySource {
        source: String,
        property: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        origin: Option<Box<Origin>>,
    },

    /// Free-form description
    Named(String),
}

impl Origin {
    pub fn text_resource(resource: impl Into<String>, location: Option<Location>) -> Self {
        Origin::TextResource {
            resource: resource.into(),
            location,
        }
    }

    pub fn environment_variable(name: impl Into<String>) -> Self {
        Origin::EnvironmentVariable { name: name.into() }
    }

    pub fn command_line_argument(argument: impl Into<String>, index: usize) -> Self {
        Origin::CommandLineArgument {
            argument: argument.into(),
            index,
        }
    }

    pub fn named(description: impl Into<String>) -> Self {
        Origin::Named(description.into())
    }

    /// Unwrap property-source wrappers down to the most precise origin.
    pub fn root(&self) -> &Origin {
        match self {
            Origin::PropertySource {
                origin: Some(inner),
                ..
            } => inner.root(),
            other => other,
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::TextResource {
                resource,
                location: Some(location),
            } => write!(f, "{resource} - {location}"),
            Origin::TextResource {
                resource,
                location: None,
            } => write!(f, "{resource}"),
            Origin::EnvironmentVariable { name } => {
                write!(f, "System Environment Property \"{name}\"")
            }
            Origin::CommandLineArgument { argument, index } => {
                write!(f, "\"{argument}\" from command line argument {index}")
            }
            Origin::PropertySource {
                origin: Some(inner),
                ..
            } => write!(f, "{inner}"),
            Origin::PropertySource {
                source, property, ..
            } => write!(f, "\"{property}\" from property source \"{source}\""),
            Origin::Named(description) => write!(f, "{description}"),
        }
    }
}

/// A zero-based line/column position inside a text resource. Displayed one-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Location {
    line: usize,
    column: usize,
}

impl Location {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn column(&self) -> usize {
        self.column
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}

/// Capability of looking up the origin of a raw property key
pub trait OriginLookup {
    fn origin(&self, key: &str) -> Option<Origin>;
}
