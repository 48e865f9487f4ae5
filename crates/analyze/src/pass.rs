//! Pass registration and execution.
//!
//! Every analyzer implements [`AnalysisPass`]. Passes are independent: each
//! one reads the domain, allocates its own working state and returns a fresh
//! diagnostic list. `dependencies` is informational; no pass consumes
//! another pass's output.

use isl_core::{sort_diagnostics, Diagnostic, Domain, Span};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::consistency::{ConsistencyPass, UnusedSymbolsPass};
use crate::dependency::CyclicDependencyPass;
use crate::error::AnalyzeError;
use crate::redundancy::RedundantConditionsPass;

/// Default threshold for DEEP_NESTING.
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 5;

/// Input handed to every pass.
#[derive(Debug, Clone, Copy)]
pub struct PassContext<'a> {
    pub ast: &'a Domain,
    pub file_path: &'a str,
}

impl<'a> PassContext<'a> {
    pub fn new(ast: &'a Domain, file_path: &'a str) -> Self {
        PassContext { ast, file_path }
    }

    /// Resolve a node span, substituting the file-level fallback when absent.
    pub fn location_of(&self, span: Option<&Span>) -> Span {
        match span {
            Some(span) if span.file.is_empty() => Span {
                file: self.file_path.to_string(),
                ..span.clone()
            },
            Some(span) => span.clone(),
            None => Span::fallback(self.file_path),
        }
    }
}

pub trait AnalysisPass: Send + Sync {
    fn id(&self) -> &'static str;
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn dependencies(&self) -> &'static [&'static str] {
        &[]
    }
    /// Lower runs first.
    fn priority(&self) -> i32;
    fn enabled_by_default(&self) -> bool {
        true
    }
    fn run(&self, ctx: &PassContext<'_>) -> Vec<Diagnostic>;
}

/// Serializable description of a registered pass.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub dependencies: Vec<String>,
    pub priority: i32,
    pub enabled_by_default: bool,
}

impl PassInfo {
    fn of(pass: &dyn AnalysisPass) -> Self {
        PassInfo {
            id: pass.id().to_string(),
            name: pass.name().to_string(),
            description: pass.description().to_string(),
            dependencies: pass.dependencies().iter().map(|d| d.to_string()).collect(),
            priority: pass.priority(),
            enabled_by_default: pass.enabled_by_default(),
        }
    }
}

/// Pass selection and tuning.
///
/// `only`, when set, selects exactly those passes. Otherwise the default set
/// is adjusted by `enable` and `disable`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerOptions {
    pub only: Option<Vec<String>>,
    pub enable: Vec<String>,
    pub disable: Vec<String>,
    pub max_nesting_depth: usize,
    pub parallel: bool,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        AnalyzerOptions {
            only: None,
            enable: Vec::new(),
            disable: Vec::new(),
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            parallel: false,
        }
    }
}

#[derive(Default)]
pub struct PassRegistry {
    passes: Vec<Box<dyn AnalysisPass>>,
}

impl PassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The four built-in passes, tuned by `options`.
    pub fn with_defaults(options: &AnalyzerOptions) -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(RedundantConditionsPass));
        registry.register(Box::new(ConsistencyPass));
        registry.register(Box::new(UnusedSymbolsPass));
        registry.register(Box::new(CyclicDependencyPass::new(options.max_nesting_depth)));
        registry
    }

    /// Register a pass. A pass with an already registered id replaces it.
    pub fn register(&mut self, pass: Box<dyn AnalysisPass>) {
        self.passes.retain(|p| p.id() != pass.id());
        self.passes.push(pass);
    }

    pub fn get(&self, id: &str) -> Option<&dyn AnalysisPass> {
        self.passes.iter().find(|p| p.id() == id).map(|p| p.as_ref())
    }

    /// All registered passes in execution order.
    pub fn infos(&self) -> Vec<PassInfo> {
        self.ordered().into_iter().map(PassInfo::of).collect()
    }

    fn ordered(&self) -> Vec<&dyn AnalysisPass> {
        let mut passes: Vec<&dyn AnalysisPass> = self.passes.iter().map(|p| p.as_ref()).collect();
        passes.sort_by(|a, b| a.priority().cmp(&b.priority()).then_with(|| a.id().cmp(b.id())));
        passes
    }

    fn check_known(&self, ids: &[String]) -> Result<(), AnalyzeError> {
        for id in ids {
            if self.get(id).is_none() {
                let known: Vec<&str> = self.ordered().iter().map(|p| p.id()).collect();
                return Err(AnalyzeError::UnknownPass {
                    id: id.clone(),
                    known: known.join(", "),
                });
            }
        }
        Ok(())
    }

    /// Enabled passes in execution order.
    pub fn select(&self, options: &AnalyzerOptions) -> Result<Vec<&dyn AnalysisPass>, AnalyzeError> {
        self.check_known(&options.enable)?;
        self.check_known(&options.disable)?;
        if let Some(only) = &options.only {
            self.check_known(only)?;
        }

        let selected = self
            .ordered()
            .into_iter()
            .filter(|p| {
                let id = p.id().to_string();
                match &options.only {
                    Some(only) => only.contains(&id),
                    None => {
                        (p.enabled_by_default() || options.enable.contains(&id))
                            && !options.disable.contains(&id)
                    }
                }
            })
            .collect();
        Ok(selected)
    }

    /// Run the selected passes and merge their output.
    ///
    /// Returns the ids that ran and the merged, position-sorted diagnostics.
    /// Parallel and sequential execution yield identical output.
    pub fn run(
        &self,
        ctx: &PassContext<'_>,
        options: &AnalyzerOptions,
    ) -> Result<(Vec<String>, Vec<Diagnostic>), AnalyzeError> {
        let selected = self.select(options)?;
        let ids: Vec<String> = selected.iter().map(|p| p.id().to_string()).collect();

        let per_pass: Vec<Vec<Diagnostic>> = if options.parallel {
            selected.par_iter().map(|p| run_pass(*p, ctx)).collect()
        } else {
            selected.iter().map(|p| run_pass(*p, ctx)).collect()
        };

        let mut diagnostics: Vec<Diagnostic> = per_pass.into_iter().flatten().collect();
        sort_diagnostics(&mut diagnostics);
        Ok((ids, diagnostics))
    }
}

fn run_pass(pass: &dyn AnalysisPass, ctx: &PassContext<'_>) -> Vec<Diagnostic> {
    let _span = tracing::debug_span!("pass", id = pass.id()).entered();
    let diagnostics = pass.run(ctx);
    tracing::debug!(
        domain = %ctx.ast.name,
        diagnostics = diagnostics.len(),
        "pass finished"
    );
    diagnostics
}
