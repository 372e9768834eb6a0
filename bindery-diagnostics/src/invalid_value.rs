//! Analysis of invalid configuration property values

use crate::analysis::{FailureAnalysis, FailureAnalyzer};
use bindery_core::{
    BindError, ConfigurationPropertySources, InvalidConfigurationPropertyValue, Origin,
};
use std::collections::HashSet;
use std::fmt::Write;
use tracing::trace;

/// Explains an [`InvalidConfigurationPropertyValue`]: the value that reached
/// binding, why it was rejected, and every other source that sets the same
/// property to something else.
#[derive(Debug, Clone)]
pub struct InvalidConfigurationPropertyValueFailureAnalyzer {
    sources: ConfigurationPropertySources,
}

#[derive(Debug)]
struct Descriptor {
    source: Option<String>,
    value: String,
    origin: Option<Origin>,
}

impl Descriptor {
    fn append_origin(&self, message: &mut String) {
        if let Some(origin) = &self.origin {
            let _ = write!(message, " (originating from '{origin}')");
        }
    }
}

impl InvalidConfigurationPropertyValueFailureAnalyzer {
    pub fn new(sources: ConfigurationPropertySources) -> Self {
        Self { sources }
    }

    fn descriptors(&self, invalid: &InvalidConfigurationPropertyValue) -> Vec<Descriptor> {
        let mut seen = HashSet::new();
        let mut descriptors = Vec::new();
        for property in self.sources.find_all(invalid.name()) {
            let origin = property.origin().map(|origin| origin.root().clone());
            if !seen.insert(origin.clone()) {
                trace!(source = property.source(), "Skipping duplicate origin");
                continue;
            }
            descriptors.push(Descriptor {
                source: Some(property.source().to_string()),
                value: property.value().to_string(),
                origin,
            });
        }
        descriptors
    }

    fn build_description(
        invalid: &InvalidConfigurationPropertyValue,
        main: &Descriptor,
        others: &[Descriptor],
    ) -> String {
        let mut description = format!(
            "Invalid value '{}' for configuration property '{}'",
            main.value,
            invalid.name()
        );
        main.append_origin(&mut description);
        description.push('.');
        match invalid.reason().filter(|reason| !reason.trim().is_empty()) {
            Some(reason) => {
                let _ = write!(
                    description,
                    " Validation failed for the following reason:\n\n{reason}"
                );
            }
            None => description.push_str(" No reason was provided."),
        }
        if !others.is_empty() {
            let _ = write!(
                description,
                "\n\nAdditionally, this property is also set in the following property {}:\n\n",
                if others.len() > 1 { "sources" } else { "source" }
            );
            for other in others {
                let _ = write!(
                    description,
                    "\t- In '{}' with the value '{}'",
                    other.source.as_deref().unwrap_or("unknown"),
                    other.value
                );
                other.append_origin(&mut description);
                description.push_str(".\n");
            }
        }
        description
    }

    fn build_action(invalid: &InvalidConfigurationPropertyValue) -> String {
        let mut action = String::from("Review the value of the property");
        if invalid.reason().is_some() {
            action.push_str(" with the provided reason");
        }
        action.push('.');
        action
    }
}

impl FailureAnalyzer for InvalidConfigurationPropertyValueFailureAnalyzer {
    fn analyze(&self, error: &BindError) -> Option<FailureAnalysis> {
        let invalid = error.as_invalid_value()?;
        let mut descriptors = self.descriptors(invalid).into_iter();
        let main = descriptors.next().unwrap_or_else(|| Descriptor {
            source: None,
            value: invalid.value().to_string(),
            origin: invalid.origin().cloned(),
        });
        let others: Vec<_> = descriptors.filter(|other| other.value != main.value).collect();
        Some(FailureAnalysis::new(
            Self::build_description(invalid, &main, &others),
            Self::build_action(invalid),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindery_core::{
        ConfigurationPropertyName, Location, MapPropertySource, OriginLookup, PropertySource,
        SystemEnvironmentPropertySource,
    };
    use std::sync::Arc;

    /// A single property whose origin is unknown
    #[derive(Debug)]
    struct Untracked {
        name: &'static str,
        key: &'static str,
        value: &'static str,
    }

    impl OriginLookup for Untracked {
        fn origin(&self, _key: &str) -> Option<Origin> {
            None
        }
    }

    impl PropertySource for Untracked {
        fn name(&self) -> &str {
            self.name
        }

        fn property_names(&self) -> Vec<&str> {
            vec![self.key]
        }

        fn get_property(&self, key: &str) -> Option<&str> {
            (key == self.key).then_some(self.value)
        }
    }

    fn name(key: &str) -> ConfigurationPropertyName {
        ConfigurationPropertyName::parse(key).unwrap()
    }

    fn file_source(resource: &str, key: &str, value: &str, line: usize) -> MapPropertySource {
        MapPropertySource::new(resource).with_origin_tracked_property(
            key,
            value,
            Origin::text_resource(resource, Some(Location::new(line, 5))),
        )
    }

    fn analyzer(sources: Vec<Arc<dyn PropertySource>>) -> InvalidConfigurationPropertyValueFailureAnalyzer {
        InvalidConfigurationPropertyValueFailureAnalyzer::new(ConfigurationPropertySources::new(sources).unwrap())
    }

    fn error(key: &str, value: &str, reason: Option<&str>) -> BindError {
        InvalidConfigurationPropertyValue::new(name(key), value, reason.map(String::from)).into()
    }

    #[test]
    fn test_value_with_reason_and_origin() {
        let primary: Arc<dyn PropertySource> = Arc::new(file_source("app.properties", "test.property", "invalid", 2));
        let analysis = analyzer(vec![primary])
            .analyze(&error("test.property", "invalid", Some("This is not valid.")))
            .unwrap();
        assert_eq!(
            analysis.description(),
            "Invalid value 'invalid' for configuration property 'test.property' \
             (originating from 'app.properties - 3:6'). Validation failed for the \
             following reason:\n\nThis is not valid."
        );
        assert_eq!(analysis.action(), "Review the value of the property with the provided reason.");
    }

    #[test]
    fn test_no_reason_and_no_source() {
        let analysis = analyzer(Vec::new())
            .analyze(&error("test.property", "invalid", None))
            .unwrap();
        assert_eq!(
            analysis.description(),
            "Invalid value 'invalid' for configuration property 'test.property'. No reason was provided."
        );
        assert_eq!(analysis.action(), "Review the value of the property.");
    }

    #[test]
    fn test_lists_conflicting_sources() {
        let primary: Arc<dyn PropertySource> = Arc::new(file_source("first.properties", "app.threshold", "-1", 0));
        let environment: Arc<dyn PropertySource> =
            Arc::new(SystemEnvironmentPropertySource::from_vars([("APP_THRESHOLD", "20")]));
        let same: Arc<dyn PropertySource> = Arc::new(file_source("third.properties", "app.threshold", "-1", 4));
        let analysis = analyzer(vec![primary, environment, same])
            .analyze(&error("app.threshold", "-1", Some("must be positive")))
            .unwrap();
        let description = analysis.description();
        assert!(description.contains(
            "\n\nAdditionally, this property is also set in the following property source:\n\n"
        ));
        assert!(description.ends_with(
            "\t- In 'systemEnvironment' with the value '20' (originating from \
             'System Environment Property \"APP_THRESHOLD\"').\n"
        ));
        assert!(!description.contains("third.properties"));
    }

    #[test]
    fn test_duplicate_origins_are_listed_once() {
        let origin = Origin::text_resource("shared.properties", Some(Location::new(0, 2)));
        let first: Arc<dyn PropertySource> =
            Arc::new(MapPropertySource::new("a").with_origin_tracked_property("x", "1", origin.clone()));
        let copy: Arc<dyn PropertySource> =
            Arc::new(MapPropertySource::new("b").with_origin_tracked_property("x", "2", origin));
        let analysis = analyzer(vec![first, copy]).analyze(&error("x", "1", None)).unwrap();
        assert!(!analysis.description().contains("Additionally"));
    }

    #[test]
    fn test_unknown_origins_are_listed_once() {
        let untracked = |name: &'static str, value: &'static str| -> Arc<dyn PropertySource> {
            Arc::new(Untracked {
                name,
                key: "app.mode",
                value,
            })
        };
        let analysis = analyzer(vec![untracked("first", "fast"), untracked("second", "slow"), untracked("third", "safe")])
            .analyze(&error("app.mode", "fast", None))
            .unwrap();
        assert_eq!(
            analysis.description(),
            "Invalid value 'fast' for configuration property 'app.mode'. No reason was provided."
        );
    }

    #[test]
    fn test_ignores_other_failures() {
        let analysis = analyzer(Vec::new()).analyze(&BindError::MalformedKey {
            key: "a..b".into(),
            reason: "empty element".into(),
        });
        assert!(analysis.is_none());
    }
}
