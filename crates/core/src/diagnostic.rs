//! Structured findings produced by the semantic analysis passes.
//!
//! Codes are stable: E0340-E0346 consistency, E0350-E0353 redundancy,
//! E0360-E0363 cycles and nesting. Never renumber them.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::ast::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Hint,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Hint => "hint",
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

/// Every kind of finding the analyzer can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    ContradictoryPrecondition,
    InlineContradiction,
    AlwaysFalse,
    UnusedInput,
    UnusedOutput,
    SecurityMissingInputRef,
    TemporalMissingDuration,
    TemporalConstantCondition,
    Tautology,
    Duplicate,
    Subsumed,
    RedundantBooleanComparison,
    EntityCycle,
    BehaviorCycle,
    TypeCycle,
    DeepNesting,
}

impl DiagnosticCode {
    pub const ALL: [DiagnosticCode; 16] = [
        DiagnosticCode::ContradictoryPrecondition,
        DiagnosticCode::InlineContradiction,
        DiagnosticCode::AlwaysFalse,
        DiagnosticCode::UnusedInput,
        DiagnosticCode::UnusedOutput,
        DiagnosticCode::SecurityMissingInputRef,
        DiagnosticCode::TemporalMissingDuration,
        DiagnosticCode::TemporalConstantCondition,
        DiagnosticCode::Tautology,
        DiagnosticCode::Duplicate,
        DiagnosticCode::Subsumed,
        DiagnosticCode::RedundantBooleanComparison,
        DiagnosticCode::EntityCycle,
        DiagnosticCode::BehaviorCycle,
        DiagnosticCode::TypeCycle,
        DiagnosticCode::DeepNesting,
    ];

    /// The stable error code, e.g. `E0350`.
    pub fn code(self) -> &'static str {
        match self {
            DiagnosticCode::ContradictoryPrecondition => "E0340",
            DiagnosticCode::InlineContradiction => "E0341",
            DiagnosticCode::AlwaysFalse => "E0342",
            DiagnosticCode::UnusedInput => "E0343",
            DiagnosticCode::UnusedOutput => "E0344",
            DiagnosticCode::SecurityMissingInputRef => "E0345",
            // Both temporal-block findings share one code.
            DiagnosticCode::TemporalMissingDuration => "E0346",
            DiagnosticCode::TemporalConstantCondition => "E0346",
            DiagnosticCode::Tautology => "E0350",
            DiagnosticCode::Duplicate => "E0351",
            DiagnosticCode::Subsumed => "E0352",
            DiagnosticCode::RedundantBooleanComparison => "E0353",
            DiagnosticCode::EntityCycle => "E0360",
            DiagnosticCode::BehaviorCycle => "E0361",
            DiagnosticCode::TypeCycle => "E0362",
            DiagnosticCode::DeepNesting => "E0363",
        }
    }

    /// Symbolic name, e.g. `TAUTOLOGY`.
    pub fn name(self) -> &'static str {
        match self {
            DiagnosticCode::ContradictoryPrecondition => "CONTRADICTORY_PRECONDITION",
            DiagnosticCode::InlineContradiction => "INLINE_CONTRADICTION",
            DiagnosticCode::AlwaysFalse => "ALWAYS_FALSE",
            DiagnosticCode::UnusedInput => "UNUSED_INPUT",
            DiagnosticCode::UnusedOutput => "UNUSED_OUTPUT",
            DiagnosticCode::SecurityMissingInputRef => "SECURITY_MISSING_INPUT_REF",
            DiagnosticCode::TemporalMissingDuration => "TEMPORAL_MISSING_DURATION",
            DiagnosticCode::TemporalConstantCondition => "TEMPORAL_CONSTANT_CONDITION",
            DiagnosticCode::Tautology => "TAUTOLOGY",
            DiagnosticCode::Duplicate => "DUPLICATE",
            DiagnosticCode::Subsumed => "SUBSUMED",
            DiagnosticCode::RedundantBooleanComparison => "REDUNDANT_BOOLEAN_COMPARISON",
            DiagnosticCode::EntityCycle => "ENTITY_CYCLE",
            DiagnosticCode::BehaviorCycle => "BEHAVIOR_CYCLE",
            DiagnosticCode::TypeCycle => "TYPE_CYCLE",
            DiagnosticCode::DeepNesting => "DEEP_NESTING",
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            DiagnosticCode::ContradictoryPrecondition
            | DiagnosticCode::InlineContradiction
            | DiagnosticCode::AlwaysFalse
            | DiagnosticCode::TemporalMissingDuration => Severity::Error,
            DiagnosticCode::UnusedInput
            | DiagnosticCode::UnusedOutput
            | DiagnosticCode::SecurityMissingInputRef
            | DiagnosticCode::Tautology
            | DiagnosticCode::Duplicate
            | DiagnosticCode::Subsumed
            | DiagnosticCode::BehaviorCycle
            | DiagnosticCode::TypeCycle => Severity::Warning,
            DiagnosticCode::TemporalConstantCondition
            | DiagnosticCode::RedundantBooleanComparison
            | DiagnosticCode::EntityCycle
            | DiagnosticCode::DeepNesting => Severity::Hint,
        }
    }

    /// Long-form description shown by `isl explain`.
    pub fn explanation(self) -> &'static str {
        match self {
            DiagnosticCode::ContradictoryPrecondition => {
                "Two preconditions of the same behavior constrain one variable to disjoint \
                 ranges or values. No input can satisfy both, so the behavior can never run."
            }
            DiagnosticCode::InlineContradiction => {
                "A single precondition joins constraints on one variable with `and` whose \
                 ranges do not overlap, e.g. `x >= 8 and x < 8`."
            }
            DiagnosticCode::AlwaysFalse => {
                "A precondition is false by its shape alone: the literal `false`, `x != x`, \
                 or a comparison of two different boolean literals."
            }
            DiagnosticCode::UnusedInput => {
                "An input field is never referenced by any precondition, postcondition, \
                 invariant, temporal or security clause."
            }
            DiagnosticCode::UnusedOutput => {
                "A field of a struct-typed success output is never referenced as `name` or \
                 `result.name` in the behavior's contract."
            }
            DiagnosticCode::SecurityMissingInputRef => {
                "A rate_limit requirement keys on a name that is neither a declared input nor \
                 a builtin request attribute such as `ip` or `user_id`."
            }
            DiagnosticCode::TemporalMissingDuration => {
                "A `within` temporal requirement has no duration bound."
            }
            DiagnosticCode::TemporalConstantCondition => {
                "A temporal requirement's condition references no variables, so its truth \
                 value cannot change over time."
            }
            DiagnosticCode::Tautology => {
                "A condition is always true by its shape alone: `true`, `x == x`, `x >= x`, \
                 `x <= x`, `x or true`, or `!false`. It constrains nothing."
            }
            DiagnosticCode::Duplicate => {
                "A condition is structurally identical to an earlier condition in the same \
                 block. Operand order matters: `a == b` and `b == a` are not duplicates."
            }
            DiagnosticCode::Subsumed => {
                "An earlier condition on the same variable already implies this one, e.g. \
                 `x > 10` followed by `x > 5`."
            }
            DiagnosticCode::RedundantBooleanComparison => {
                "Comparing a boolean with a boolean literal is redundant: write `X` instead of \
                 `X == true` and `!X` instead of `X == false`."
            }
            DiagnosticCode::EntityCycle => {
                "Entities reference each other through their fields in a cycle. This is often \
                 legitimate but complicates serialization and eager loading."
            }
            DiagnosticCode::BehaviorCycle => {
                "Behaviors trigger, emit, dispatch or execute each other in a cycle, which \
                 risks infinite dispatch at runtime."
            }
            DiagnosticCode::TypeCycle => {
                "Type declarations reference each other in a cycle, which risks infinite type \
                 resolution in generated code."
            }
            DiagnosticCode::DeepNesting => {
                "An entity reaches a long chain of nested entity references. Deep object \
                 graphs are hard to load, validate and serialize."
            }
        }
    }

    /// Codes matching an error code (`E0346`) or symbolic name (`TAUTOLOGY`).
    pub fn lookup(query: &str) -> Vec<DiagnosticCode> {
        let query = query.trim();
        DiagnosticCode::ALL
            .iter()
            .copied()
            .filter(|c| c.code().eq_ignore_ascii_case(query) || c.name().eq_ignore_ascii_case(query))
            .collect()
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl Serialize for DiagnosticCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelatedInformation {
    pub message: String,
    pub location: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FixOperation {
    Add,
    Replace,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Patch {
    pub position: Position,
    pub text: String,
}

/// An advisory text patch. Never applied by the analyzer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Fix {
    pub description: String,
    pub operation: FixOperation,
    pub target_kind: String,
    pub location: Span,
    pub patch: Patch,
}

impl Fix {
    /// Replace the expression at `location` with `text`.
    pub fn replace_expression(description: impl Into<String>, location: Span, text: impl Into<String>) -> Self {
        Fix {
            description: description.into(),
            operation: FixOperation::Replace,
            target_kind: "expression".to_string(),
            patch: Patch {
                position: Position {
                    line: location.line,
                    column: location.column,
                },
                text: text.into(),
            },
            location,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub category: &'static str,
    pub severity: Severity,
    pub message: String,
    pub location: Span,
    pub notes: Vec<String>,
    pub help: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub related_information: Vec<RelatedInformation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix: Option<Fix>,
}

impl Diagnostic {
    /// A diagnostic with the code's default severity.
    pub fn new(code: DiagnosticCode, message: impl Into<String>, location: Span) -> Self {
        Diagnostic {
            code,
            category: "semantic",
            severity: code.severity(),
            message: message.into(),
            location,
            notes: Vec::new(),
            help: Vec::new(),
            tags: Vec::new(),
            related_information: Vec::new(),
            fix: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help.push(help.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_related(mut self, message: impl Into<String>, location: Span) -> Self {
        self.related_information.push(RelatedInformation {
            message: message.into(),
            location,
        });
        self
    }

    pub fn with_fix(mut self, fix: Fix) -> Self {
        self.fix = Some(fix);
        self
    }

    /// Render in a compiler-like layout for terminals.
    pub fn render_text(&self) -> String {
        let mut out = format!(
            "{}[{}]: {}\n  --> {}:{}:{}",
            self.severity,
            self.code.code(),
            self.message,
            self.location.file,
            self.location.line,
            self.location.column
        );
        for related in &self.related_information {
            out.push_str(&format!(
                "\n  = related: {} ({}:{}:{})",
                related.message, related.location.file, related.location.line, related.location.column
            ));
        }
        for note in &self.notes {
            out.push_str(&format!("\n  = note: {}", note));
        }
        for help in &self.help {
            out.push_str(&format!("\n  = help: {}", help));
        }
        out
    }
}

/// Stable sort by (file, line, column).
///
/// Diagnostics from concurrently executed passes must go through this before
/// they are presented; ties keep their per-pass order.
pub fn sort_diagnostics(diagnostics: &mut [Diagnostic]) {
    diagnostics.sort_by(|a, b| {
        a.location
            .file
            .cmp(&b.location.file)
            .then(a.location.line.cmp(&b.location.line))
            .then(a.location.column.cmp(&b.location.column))
    });
}
