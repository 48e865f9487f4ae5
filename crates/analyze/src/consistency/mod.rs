//! Contract consistency checks (E0340-E0346).
//!
//! Two passes share this module: `consistency-checker` looks for
//! unsatisfiable preconditions and malformed security/temporal metadata,
//! `unused-symbols` reports declared inputs and outputs that no clause
//! references.

mod contradiction;
mod metadata;
mod usage;

use isl_core::Diagnostic;

use crate::pass::{AnalysisPass, PassContext};

pub use usage::{referenced_paths, CONTEXT_INPUTS};

pub struct ConsistencyPass;

impl AnalysisPass for ConsistencyPass {
    fn id(&self) -> &'static str {
        "consistency-checker"
    }

    fn name(&self) -> &'static str {
        "Consistency Checker"
    }

    fn description(&self) -> &'static str {
        "Detects contradictory and always-false preconditions and invalid security/temporal requirements"
    }

    fn priority(&self) -> i32 {
        20
    }

    fn run(&self, ctx: &PassContext<'_>) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        for behavior in &ctx.ast.behaviors {
            contradiction::check_preconditions(ctx, behavior, &mut diagnostics);
            metadata::check_security(ctx, behavior, &mut diagnostics);
            metadata::check_temporal(ctx, behavior, &mut diagnostics);
        }
        diagnostics
    }
}

pub struct UnusedSymbolsPass;

impl AnalysisPass for UnusedSymbolsPass {
    fn id(&self) -> &'static str {
        "unused-symbols"
    }

    fn name(&self) -> &'static str {
        "Unused Symbols"
    }

    fn description(&self) -> &'static str {
        "Detects input fields and struct output fields that no contract clause references"
    }

    fn dependencies(&self) -> &'static [&'static str] {
        &["consistency-checker"]
    }

    fn priority(&self) -> i32 {
        30
    }

    fn run(&self, ctx: &PassContext<'_>) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        for behavior in &ctx.ast.behaviors {
            usage::check_unused(ctx, behavior, &mut diagnostics);
        }
        diagnostics
    }
}
