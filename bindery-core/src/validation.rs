//! Bind-then-validate for targets that derive [`validator::Validate`]

use crate::bind::{BindResult, Binder};
use crate::error::{InvalidConfigurationPropertyValue, Result};
use crate::name::{kebab, ConfigurationPropertyName};
use crate::types::Describe;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

impl Binder {
    /// Bind `T` under `name` and validate it.
    ///
    /// The first violation (by property name) is reported as an
    /// [`InvalidConfigurationPropertyValue`] named `name.field-name`, carrying
    /// the value and origin of the property that produced the field.
    pub fn bind_validated<T>(&self, name: &str) -> Result<BindResult<T>>
    where
        T: Describe + DeserializeOwned + Validate,
    {
        let root = ConfigurationPropertyName::parse(name)?;
        let result = self.bind_as::<T>(name)?;
        if let Some(Err(errors)) = result.get().map(Validate::validate) {
            debug!(name = %root, "Bound value failed validation");
            return Err(self.first_violation(&root, &errors).into());
        }
        Ok(result)
    }

    fn first_violation(&self, root: &ConfigurationPropertyName, errors: &ValidationErrors) -> InvalidConfigurationPropertyValue {
        let mut violations = Vec::new();
        collect(root, errors, &mut violations);
        violations.sort_by_key(|(name, _)| name.to_string());

        let Some((name, error)) = violations.into_iter().next() else {
            return InvalidConfigurationPropertyValue::new(root.clone(), "", Some(errors.to_string()));
        };
        let reason = error
            .message
            .as_ref()
            .map(|message| message.to_string())
            .unwrap_or_else(|| format!("failed '{}' validation", error.code));
        match self.sources().find(&name) {
            Some(property) => InvalidConfigurationPropertyValue::for_property(&property, Some(reason)),
            None => {
                let value = error.params.get("value").map(display_json).unwrap_or_default();
                InvalidConfigurationPropertyValue::new(name, value, Some(reason))
            }
        }
    }
}

fn collect<'e>(
    prefix: &ConfigurationPropertyName,
    errors: &'e ValidationErrors,
    out: &mut Vec<(ConfigurationPropertyName, &'e ValidationError)>,
) {
    for (field, kind) in errors.errors() {
        let field: &str = field;
        let Ok(path) = prefix.append(&kebab(field)) else {
            continue;
        };
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                out.extend(field_errors.iter().map(|error| (path.clone(), error)));
            }
            ValidationErrorsKind::Struct(nested) => collect(&path, nested, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect(&path.append_index(*index), nested, out);
                }
            }
        }
    }
}

fn display_json(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{ConfigurationPropertySources, MapPropertySource};
    use crate::types::{ObjectType, TypeDescriptor};
    use crate::value::{BoundValue, ObjectValue};
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct Server {
        #[validate(range(min = 1024, message = "must be an unprivileged port"))]
        port: u32,
        #[validate(length(min = 1))]
        host_name: String,
    }

    impl Describe for Server {
        fn describe() -> TypeDescriptor {
            ObjectType::new("Server")
                .property::<u32>("port")
                .property::<String>("host_name")
                .default_instance_with(|| {
                    Ok(BoundValue::Object(
                        ObjectValue::new("Server")
                            .with("port", BoundValue::UInt(8080))
                            .with("host_name", BoundValue::String("localhost".into())),
                    ))
                })
                .into()
        }
    }

    fn binder(pairs: &[(&str, &str)]) -> Binder {
        Binder::new(
            ConfigurationPropertySources::from_source(
                MapPropertySource::from_pairs("application.properties", pairs.iter().copied()),
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_valid_target() {
        let binder = binder(&[("server.port", "9000")]);
        let server = binder.bind_validated::<Server>("server").unwrap().into_option().unwrap();
        assert_eq!(server.port, 9000);
        assert_eq!(server.host_name, "localhost");
    }

    #[test]
    fn test_violation_carries_property() {
        let binder = binder(&[("server.port", "80")]);
        let error = binder.bind_validated::<Server>("server").unwrap_err();
        let invalid = error.as_invalid_value().unwrap();
        assert_eq!(invalid.name().to_string(), "server.port");
        assert_eq!(invalid.value(), "80");
        assert_eq!(invalid.reason(), Some("must be an unprivileged port"));
    }

    #[test]
    fn test_violation_without_message_uses_code() {
        let binder = binder(&[("server.host-name", "")]);
        let error = binder.bind_validated::<Server>("server").unwrap_err();
        let invalid = error.as_invalid_value().unwrap();
        assert_eq!(invalid.name().to_string(), "server.host-name");
        assert_eq!(invalid.reason(), Some("failed 'length' validation"));
    }
}
