//! Startup failure reports

use crate::analysis::FailureAnalysis;
use tracing::error;

/// Formats a [`FailureAnalysis`] as the "APPLICATION FAILED TO START" report
/// and logs it at error level
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingFailureAnalysisReporter;

impl LoggingFailureAnalysisReporter {
    pub fn report(&self, analysis: &FailureAnalysis) {
        if tracing::enabled!(tracing::Level::ERROR) {
            error!("{}", build_message(analysis));
        }
    }
}

/// The full report text, starting with a newline so it stands apart from the
/// log line prefix
pub fn build_message(analysis: &FailureAnalysis) -> String {
    format!(
        "\n\n***************************\nAPPLICATION FAILED TO START\n***************************\n\n\
         Description:\n\n{}\n\nAction:\n\n{}\n",
        analysis.description(),
        analysis.action()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_layout() {
        let message = build_message(&FailureAnalysis::new("Something broke.", "Fix it."));
        assert_eq!(
            message,
            "\n\n***************************\nAPPLICATION FAILED TO START\n***************************\n\n\
             Description:\n\nSomething broke.\n\nAction:\n\nFix it.\n"
        );
    }

    #[test]
    fn test_report_without_subscriber() {
        LoggingFailureAnalysisReporter.report(&FailureAnalysis::new("d", "a"));
    }
}
