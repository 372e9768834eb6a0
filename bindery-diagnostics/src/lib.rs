//! Failure analysis for bindery
//!
//! Turns a [`BindError`](bindery_core::BindError) into a description of what
//! went wrong and an action the user can take. Invalid property values are
//! explained together with every other source that sets the same property.

pub mod analysis;
pub mod bind_failure;
pub mod invalid_value;
pub mod reporter;

pub use analysis::{FailureAnalysis, FailureAnalyzer, FailureAnalyzers};
pub use bind_failure::{BindFailureAnalyzer, UnboundConfigurationPropertiesFailureAnalyzer};
pub use invalid_value::InvalidConfigurationPropertyValueFailureAnalyzer;
pub use reporter::{build_message, LoggingFailureAnalysisReporter};

use bindery_core::ConfigurationPropertySources;

/// The standard analyzer chain for binding failures over `sources`
pub fn default_analyzers(sources: ConfigurationPropertySources) -> FailureAnalyzers {
    FailureAnalyzers::new()
        .with(InvalidConfigurationPropertyValueFailureAnalyzer::new(sources))
        .with(UnboundConfigurationPropertiesFailureAnalyzer)
        .with(BindFailureAnalyzer)
}
