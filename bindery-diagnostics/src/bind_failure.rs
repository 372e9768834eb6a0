//! Analysis of conversion, structural and unbound-property failures

use crate::analysis::{FailureAnalysis, FailureAnalyzer};
use bindery_core::{BindError, BindingFailureKind};
use std::fmt::Write;

const UPDATE_CONFIGURATION: &str = "Update your application's configuration";

/// Explains failures that are not tied to a single invalid property value
#[derive(Debug, Clone, Copy, Default)]
pub struct BindFailureAnalyzer;

impl BindFailureAnalyzer {
    fn action(kind: &BindingFailureKind) -> String {
        match kind {
            BindingFailureKind::CyclicType(_) => {
                "Break the cycle in the target type, for example by binding the recursive member separately"
                    .to_string()
            }
            BindingFailureKind::AmbiguousConstructors(_) => {
                "Mark the constructor that should be used for binding".to_string()
            }
            BindingFailureKind::NoBindConstructor(_) | BindingFailureKind::ExistingValueWithValueObject => {
                "Bind the target as a Java-bean style object or give it a constructor with parameters"
                    .to_string()
            }
            _ => UPDATE_CONFIGURATION.to_string(),
        }
    }
}

impl FailureAnalyzer for BindFailureAnalyzer {
    fn analyze(&self, error: &BindError) -> Option<FailureAnalysis> {
        let (description, action) = match error {
            BindError::ConversionFailure {
                value,
                target,
                origin,
                reason,
            } => {
                let mut description = format!("Failed to convert to {target}:\n\n    Value: \"{value}\"\n");
                if let Some(origin) = origin {
                    let _ = writeln!(description, "    Origin: {origin}");
                }
                let _ = write!(description, "    Reason: {reason}");
                (description, UPDATE_CONFIGURATION.to_string())
            }
            BindError::BindingFailure { name, kind } => (
                format!("Failed to bind properties under '{name}':\n\n    Reason: {kind}"),
                Self::action(kind),
            ),
            BindError::TypeMismatch { expected, actual } => (
                format!(
                    "Failed to bind to {expected}:\n\n    Reason: the existing value is {actual}, not {expected}"
                ),
                "Supply an existing value of the target type".to_string(),
            ),
            BindError::MalformedKey { key, reason } => (
                format!("Configuration property name '{key}' is not valid:\n\n    Reason: {reason}"),
                "Modify the property name so that it uses lower-case letters, digits, '-' and '.' separated elements"
                    .to_string(),
            ),
            BindError::Deserialize {
                name,
                target,
                message,
            } => (
                format!("Failed to bind properties under '{name}' to {target}:\n\n    Reason: {message}"),
                UPDATE_CONFIGURATION.to_string(),
            ),
            _ => return None,
        };
        Some(FailureAnalysis::new(description, action))
    }
}

/// Lists properties that were present under the bound name but never used
#[derive(Debug, Clone, Copy, Default)]
pub struct UnboundConfigurationPropertiesFailureAnalyzer;

impl FailureAnalyzer for UnboundConfigurationPropertiesFailureAnalyzer {
    fn analyze(&self, error: &BindError) -> Option<FailureAnalysis> {
        let BindError::UnboundProperties { name, properties } = error else {
            return None;
        };
        let mut description = format!("Binding to target '{name}' failed:\n");
        for property in properties {
            let _ = write!(
                description,
                "\n    Property: {}\n    Value: \"{}\"",
                property.name(),
                property.value()
            );
            if let Some(origin) = property.origin() {
                let _ = write!(description, "\n    Origin: {origin}");
            }
        }
        let _ = write!(description, "\n    Reason: {error}");
        Some(FailureAnalysis::new(description, UPDATE_CONFIGURATION))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindery_core::{ConfigurationProperty, ConfigurationPropertyName, Origin};

    fn name(key: &str) -> ConfigurationPropertyName {
        ConfigurationPropertyName::parse(key).unwrap()
    }

    #[test]
    fn test_conversion_failure() {
        let error = BindError::ConversionFailure {
            value: "abc".into(),
            target: "u16".into(),
            origin: Some(Origin::environment_variable("SERVER_PORT")),
            reason: "invalid digit found in string".into(),
        };
        let analysis = BindFailureAnalyzer.analyze(&error).unwrap();
        assert_eq!(
            analysis.description(),
            "Failed to convert to u16:\n\n    Value: \"abc\"\n    Origin: System Environment Property \
             \"SERVER_PORT\"\n    Reason: invalid digit found in string"
        );
        assert_eq!(analysis.action(), UPDATE_CONFIGURATION);
    }

    #[test]
    fn test_cyclic_type() {
        let error = BindError::BindingFailure {
            name: name("app.node"),
            kind: BindingFailureKind::CyclicType(vec!["Node".into(), "Node".into()]),
        };
        let analysis = BindFailureAnalyzer.analyze(&error).unwrap();
        assert_eq!(
            analysis.description(),
            "Failed to bind properties under 'app.node':\n\n    Reason: cyclic type (Node -> Node)"
        );
        assert!(analysis.action().starts_with("Break the cycle"));
    }

    #[test]
    fn test_unbound_properties() {
        let property = ConfigurationProperty::new(
            name("app.pool.typo"),
            "3",
            Some(Origin::named("test")),
            "map",
        );
        let error = BindError::UnboundProperties {
            name: name("app.pool"),
            properties: vec![property],
        };
        assert!(BindFailureAnalyzer.analyze(&error).is_none());
        let analysis = UnboundConfigurationPropertiesFailureAnalyzer.analyze(&error).unwrap();
        assert_eq!(
            analysis.description(),
            "Binding to target 'app.pool' failed:\n\n    Property: app.pool.typo\n    Value: \"3\"\n    \
             Origin: test\n    Reason: The elements [app.pool.typo] were left unbound"
        );
    }
}
