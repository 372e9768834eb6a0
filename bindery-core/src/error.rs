//! Binding error types

use crate::name::ConfigurationPropertyName;
use crate::origin::Origin;
use crate::source::ConfigurationProperty;
use std::fmt;
use thiserror::Error;

/// Binding result type
pub type Result<T, E = BindError> = std::result::Result<T, E>;

/// Binding errors
///
/// A key that is absent from every source is not an error: binding reports it
/// as an unbound [`BindResult`](crate::BindResult).
#[derive(Error, Debug)]
pub enum BindError {
    /// A raw value could not be coerced to the target scalar type
    #[error("Failed to convert '{value}' to {target}{}: {reason}", fmt_origin(.origin))]
    ConversionFailure {
        value: String,
        target: String,
        origin: Option<Origin>,
        reason: String,
    },

    /// A property value is invalid, either because it could not be converted
    /// or because it failed validation
    #[error(transparent)]
    InvalidConfigurationPropertyValue(Box<InvalidConfigurationPropertyValue>),

    /// A structural problem with the target or the bind request
    #[error("Failed to bind properties under '{name}': {kind}")]
    BindingFailure {
        name: ConfigurationPropertyName,
        kind: BindingFailureKind,
    },

    /// An existing value is not an instance of the target type
    #[error("Type mismatch: expected an instance of {expected} but got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// A key could not be tokenized into name elements
    #[error("Malformed configuration property name '{key}': {reason}")]
    MalformedKey { key: String, reason: String },

    /// Properties under the bound name were never used
    #[error("The elements [{}] were left unbound", fmt_names(.properties))]
    UnboundProperties {
        name: ConfigurationPropertyName,
        properties: Vec<ConfigurationProperty>,
    },

    /// The bound value could not be turned into the requested Rust type
    #[error("Failed to deserialize '{name}' into {target}: {message}")]
    Deserialize {
        name: ConfigurationPropertyName,
        target: String,
        message: String,
    },
}

impl BindError {
    pub(crate) fn binding(name: &ConfigurationPropertyName, kind: BindingFailureKind) -> Self {
        BindError::BindingFailure {
            name: name.clone(),
            kind,
        }
    }

    /// The invalid-value details, if this is an invalid property value failure
    pub fn as_invalid_value(&self) -> Option<&InvalidConfigurationPropertyValue> {
        match self {
            BindError::InvalidConfigurationPropertyValue(invalid) => Some(invalid),
            _ => None,
        }
    }

    /// The origin attached to the failure, if any
    pub fn origin(&self) -> Option<&Origin> {
        match self {
            BindError::ConversionFailure { origin, .. } => origin.as_ref(),
            BindError::InvalidConfigurationPropertyValue(invalid) => invalid.origin(),
            _ => None,
        }
    }
}

impl From<InvalidConfigurationPropertyValue> for BindError {
    fn from(value: InvalidConfigurationPropertyValue) -> Self {
        BindError::InvalidConfigurationPropertyValue(Box::new(value))
    }
}

/// Structural binding failure kinds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingFailureKind {
    /// The target type reaches itself; carries the type path of the cycle
    CyclicType(Vec<String>),
    /// More than one constructor qualifies for value-object binding
    AmbiguousConstructors(String),
    /// Value-object binding was requested but the type has no usable constructor
    NoBindConstructor(String),
    /// An existing value was combined with value-object binding
    ExistingValueWithValueObject,
    /// An unbound target could not be created
    CannotCreate(String),
    /// Map keys must be non-float scalars
    UnsupportedMapKey(String),
    /// A `${...}` placeholder refers back to itself
    CircularPlaceholder(String),
}

impl fmt::Display for BindingFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingFailureKind::CyclicType(path) => {
                write!(f, "cyclic type ({})", path.join(" -> "))
            }
            BindingFailureKind::AmbiguousConstructors(ty) => {
                write!(f, "{ty} has more than one constructor suitable for value object binding")
            }
            BindingFailureKind::NoBindConstructor(ty) => {
                write!(f, "{ty} has no constructor suitable for value object binding")
            }
            BindingFailureKind::ExistingValueWithValueObject => {
                f.write_str("an existing value cannot be provided when binding as a value object")
            }
            BindingFailureKind::CannotCreate(ty) => write!(f, "unable to create instance of {ty}"),
            BindingFailureKind::UnsupportedMapKey(ty) => write!(f, "{ty} cannot be used as a map key"),
            BindingFailureKind::CircularPlaceholder(key) => {
                write!(f, "circular placeholder reference '{key}'")
            }
        }
    }
}

/// A property value that is invalid, with enough context for diagnostics
#[derive(Error, Debug)]
#[error("Property {name} with value '{value}' is invalid: {}", .reason.as_deref().unwrap_or("no reason provided"))]
pub struct InvalidConfigurationPropertyValue {
    name: ConfigurationPropertyName,
    value: String,
    reason: Option<String>,
    origin: Option<Origin>,
    #[source]
    cause: Option<Box<BindError>>,
}

impl InvalidConfigurationPropertyValue {
    pub fn new(
        name: ConfigurationPropertyName,
        value: impl Into<String>,
        reason: Option<String>,
    ) -> Self {
        Self {
            name,
            value: value.into(),
            reason,
            origin: None,
            cause: None,
        }
    }

    /// Build from the property that reached binding, keeping its origin
    pub fn for_property(property: &ConfigurationProperty, reason: Option<String>) -> Self {
        Self::new(property.name().clone(), property.value(), reason)
            .with_origin(property.origin().cloned())
    }

    pub fn with_origin(mut self, origin: Option<Origin>) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_cause(mut self, cause: BindError) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn name(&self) -> &ConfigurationPropertyName {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn origin(&self) -> Option<&Origin> {
        self.origin.as_ref()
    }

    pub fn cause(&self) -> Option<&BindError> {
        self.cause.as_deref()
    }
}

fn fmt_origin(origin: &Option<Origin>) -> String {
    origin
        .as_ref()
        .map(|o| format!(" (from {o})"))
        .unwrap_or_default()
}

fn fmt_names(properties: &[ConfigurationProperty]) -> String {
    properties
        .iter()
        .map(|p| p.name().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
