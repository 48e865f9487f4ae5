//! isl-core: shared model for the ISL semantic analyzer.
//!
//! # Public API
//!
//! - AST types: [`Domain`], [`Entity`], [`Behavior`], [`TypeExpr`], [`Expr`]
//!   and the contract blocks hanging off a behavior
//! - [`Diagnostic`] and [`DiagnosticCode`] -- the structured finding record
//! - [`load_domain()`] / [`parse_domain()`] -- read a serialized domain AST
//!
//! Parsing `.isl` source is not part of this crate; the parser's output is
//! consumed as JSON.

pub mod ast;
pub mod diagnostic;
pub mod error;
pub mod expr;
pub mod source;

// ── Convenience re-exports ───────────────────────────────────────────

pub use ast::{
    Behavior, Condition, ConditionBlock, Domain, Entity, ErrorSpec, Field, InputSpec,
    OutputSpec, PostconditionBlock, SecurityBlock, SecurityKind, SecurityRequirement, Span,
    Statement, TemporalBlock, TemporalKind, TemporalRequirement, TypeDeclaration, TypeExpr,
    UnionVariant,
};
pub use diagnostic::{
    sort_diagnostics, Diagnostic, DiagnosticCode, Fix, FixOperation, Patch, Position,
    RelatedInformation, Severity,
};
pub use error::LoadError;
pub use expr::{
    BinaryExpr, BinaryOp, CallExpr, ConditionalExpr, DurationLiteral, Expr, Identifier,
    ListExpr, Literal, LiteralValue, LogicalExpr, LogicalOp, MemberExpr, OldExpr, Quantifier,
    QuantifierExpr, UnaryExpr, UnaryOp,
};
pub use source::{load_domain, parse_domain, FileSystemProvider, InMemoryProvider, SourceProvider};
