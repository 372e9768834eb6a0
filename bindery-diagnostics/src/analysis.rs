//! Failure analyses and the analyzer chain

use bindery_core::BindError;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A human-readable explanation of a failure and what to do about it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureAnalysis {
    description: String,
    action: String,
}

impl FailureAnalysis {
    pub fn new(description: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            action: action.into(),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn action(&self) -> &str {
        &self.action
    }
}

impl fmt::Display for FailureAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n\n{}", self.description, self.action)
    }
}

/// Turns a binding failure into a [`FailureAnalysis`]. Returns `None` for
/// failures the analyzer does not recognise.
pub trait FailureAnalyzer: Send + Sync {
    fn analyze(&self, error: &BindError) -> Option<FailureAnalysis>;
}

/// Analyzers tried in order; the first one to produce an analysis wins
#[derive(Clone, Default)]
pub struct FailureAnalyzers {
    analyzers: Vec<Arc<dyn FailureAnalyzer>>,
}

impl FailureAnalyzers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, analyzer: impl FailureAnalyzer + 'static) -> Self {
        self.analyzers.push(Arc::new(analyzer));
        self
    }

    pub fn len(&self) -> usize {
        self.analyzers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.analyzers.is_empty()
    }
}

impl FailureAnalyzer for FailureAnalyzers {
    fn analyze(&self, error: &BindError) -> Option<FailureAnalysis> {
        let analysis = self.analyzers.iter().find_map(|analyzer| analyzer.analyze(error));
        if analysis.is_none() {
            debug!(error = %error, "No failure analyzer recognised the error");
        }
        analysis
    }
}

impl fmt::Debug for FailureAnalyzers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailureAnalyzers")
            .field("analyzers", &self.analyzers.len())
            .finish()
    }
}
