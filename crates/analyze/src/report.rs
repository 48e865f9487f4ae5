//! AnalysisReport -- merged output of one analyzer run.
//!
//! The report carries the diagnostics of every pass that ran, already
//! sorted by position, plus per-severity counts for summary display.

use isl_core::{Diagnostic, Severity};
use serde::Serialize;

/// Per-severity diagnostic counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub errors: usize,
    pub warnings: usize,
    pub hints: usize,
}

impl Summary {
    pub fn of(diagnostics: &[Diagnostic]) -> Self {
        let mut summary = Summary::default();
        for d in diagnostics {
            match d.severity {
                Severity::Error => summary.errors += 1,
                Severity::Warning => summary.warnings += 1,
                Severity::Hint => summary.hints += 1,
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.errors + self.warnings + self.hints
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub file: String,
    pub domain: String,
    pub passes_run: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
    pub summary: Summary,
}

impl AnalysisReport {
    /// Create an empty report.
    pub fn new() -> Self {
        AnalysisReport {
            file: String::new(),
            domain: String::new(),
            passes_run: Vec::new(),
            diagnostics: Vec::new(),
            summary: Summary::default(),
        }
    }

    /// Build a report from the output of a pass run. `diagnostics` must
    /// already be sorted.
    pub fn from_run(
        file: impl Into<String>,
        domain: impl Into<String>,
        passes_run: Vec<String>,
        diagnostics: Vec<Diagnostic>,
    ) -> Self {
        let summary = Summary::of(&diagnostics);
        AnalysisReport {
            file: file.into(),
            domain: domain.into(),
            passes_run,
            diagnostics,
            summary,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.summary.errors > 0
    }

    pub fn has_warnings(&self) -> bool {
        self.summary.warnings > 0
    }

    /// Diagnostics at or above `min`.
    pub fn at_least(&self, min: Severity) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.severity >= min)
    }
}

impl Default for AnalysisReport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isl_core::{DiagnosticCode, Span};

    fn diag(code: DiagnosticCode) -> Diagnostic {
        Diagnostic::new(code, "x", Span::fallback("f.isl"))
    }

    #[test]
    fn test_new_report_is_empty() {
        let report = AnalysisReport::new();
        assert!(report.passes_run.is_empty());
        assert!(report.diagnostics.is_empty());
        assert_eq!(report.summary.total(), 0);
        assert!(!report.has_errors());
    }

    #[test]
    fn test_summary_counts_by_severity() {
        let report = AnalysisReport::from_run(
            "f.isl",
            "D",
            vec!["consistency-checker".to_string()],
            vec![
                diag(DiagnosticCode::AlwaysFalse),
                diag(DiagnosticCode::UnusedInput),
                diag(DiagnosticCode::UnusedOutput),
                diag(DiagnosticCode::DeepNesting),
            ],
        );
        assert_eq!(
            report.summary,
            Summary {
                errors: 1,
                warnings: 2,
                hints: 1
            }
        );
        assert!(report.has_errors());
        assert!(report.has_warnings());
        assert_eq!(report.at_least(Severity::Warning).count(), 3);
    }

    #[test]
    fn test_report_serializes_codes_as_strings() {
        let report = AnalysisReport::from_run("f.isl", "D", vec![], vec![diag(DiagnosticCode::Tautology)]);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["diagnostics"][0]["code"], "E0350");
        assert_eq!(json["summary"]["warnings"], 1);
    }

    #[test]
    fn test_default_trait() {
        let report = AnalysisReport::default();
        assert!(report.file.is_empty());
    }
}
