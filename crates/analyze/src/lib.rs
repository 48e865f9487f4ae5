//! ISL semantic analyzer -- contract defect detection over a parsed domain.
//!
//! Four passes run over an immutable [`Domain`]:
//!
//! - `redundant-conditions`: tautologies, duplicates, subsumed bounds and
//!   redundant boolean comparisons
//! - `consistency-checker`: contradictory or always-false preconditions and
//!   malformed security/temporal requirements
//! - `unused-symbols`: inputs and struct outputs no clause references
//! - `cyclic-dependencies`: entity, behavior and type cycles plus deep
//!   entity nesting
//!
//! Reasoning is purely syntactic and bounded: no solver, no evaluation.
//! Passes never fail on partial input; unresolvable shapes simply yield no
//! diagnostic. [`analyze()`] runs the default set and returns an
//! [`AnalysisReport`] whose diagnostics are sorted by position.

pub mod constraint;
pub mod consistency;
pub mod dependency;
pub mod error;
pub mod pass;
pub mod redundancy;
pub mod report;

use isl_core::Domain;

pub use consistency::{referenced_paths, ConsistencyPass, UnusedSymbolsPass, CONTEXT_INPUTS};
pub use constraint::{
    are_disjoint, extract_constraint, extract_constraints, implies, normalize_expression,
    Constraint, ConstraintOp, ConstraintValue,
};
pub use dependency::CyclicDependencyPass;
pub use error::AnalyzeError;
pub use pass::{
    AnalysisPass, AnalyzerOptions, PassContext, PassInfo, PassRegistry, DEFAULT_MAX_NESTING_DEPTH,
};
pub use redundancy::RedundantConditionsPass;
pub use report::{AnalysisReport, Summary};

/// Run every default pass on `domain`.
///
/// `file_path` names the source in diagnostic locations and is substituted
/// wherever a node has no span.
pub fn analyze(domain: &Domain, file_path: &str) -> AnalysisReport {
    // Default options name no passes, so selection cannot fail.
    analyze_with(domain, file_path, &AnalyzerOptions::default())
        .unwrap_or_else(|_| AnalysisReport::from_run(file_path, &domain.name, Vec::new(), Vec::new()))
}

/// Run the passes selected by `options`.
pub fn analyze_with(
    domain: &Domain,
    file_path: &str,
    options: &AnalyzerOptions,
) -> Result<AnalysisReport, AnalyzeError> {
    let registry = PassRegistry::with_defaults(options);
    let ctx = PassContext::new(domain, file_path);

    let _span = tracing::info_span!("analyze", file = file_path, domain = %domain.name).entered();
    let (passes_run, diagnostics) = registry.run(&ctx, options)?;
    let report = AnalysisReport::from_run(file_path, &domain.name, passes_run, diagnostics);
    tracing::info!(
        errors = report.summary.errors,
        warnings = report.summary.warnings,
        hints = report.summary.hints,
        "analysis complete"
    );
    Ok(report)
}

/// Run exactly the named passes.
///
/// Valid pass ids: "redundant-conditions", "consistency-checker",
/// "unused-symbols", "cyclic-dependencies".
pub fn analyze_selected(
    domain: &Domain,
    file_path: &str,
    passes: &[&str],
) -> Result<AnalysisReport, AnalyzeError> {
    let options = AnalyzerOptions {
        only: Some(passes.iter().map(|p| p.to_string()).collect()),
        ..Default::default()
    };
    analyze_with(domain, file_path, &options)
}
