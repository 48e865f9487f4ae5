//! Shared AST types for ISL domains.
//!
//! These types are produced by the parser and consumed by every analysis
//! pass. They round-trip through JSON so that a domain parsed elsewhere can
//! be analyzed without linking the parser.

use serde::{Deserialize, Serialize};

use crate::expr::{DurationLiteral, Expr};

// ──────────────────────────────────────────────
// Spans
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    #[serde(default)]
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl Span {
    pub fn new(file: impl Into<String>, line: u32, column: u32, end_line: u32, end_column: u32) -> Self {
        Span {
            file: file.into(),
            line,
            column,
            end_line,
            end_column,
        }
    }

    /// Location used for nodes the parser left without a span.
    pub fn fallback(file: &str) -> Self {
        Span::new(file, 1, 1, 1, 1)
    }

    /// Single-line span, mostly useful when building ASTs by hand.
    pub fn line(file: impl Into<String>, line: u32) -> Self {
        Span::new(file, line, 1, line, 1)
    }
}

// ──────────────────────────────────────────────
// Types
// ──────────────────────────────────────────────

/// A type expression as written in a field, type declaration or behavior output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum TypeExpr {
    Primitive {
        name: String,
    },
    /// Named type reference -- a declared type, an entity, or an unknown name
    Reference {
        name: String,
    },
    List {
        element: Box<TypeExpr>,
    },
    Map {
        key: Box<TypeExpr>,
        value: Box<TypeExpr>,
    },
    Optional {
        inner: Box<TypeExpr>,
    },
    Struct {
        fields: Vec<Field>,
    },
    Union {
        variants: Vec<UnionVariant>,
    },
    Enum {
        variants: Vec<String>,
    },
    /// Generic instantiation such as `Page<User>`
    Generic {
        name: String,
        #[serde(default)]
        arguments: Vec<TypeExpr>,
    },
}

impl TypeExpr {
    pub fn reference(name: impl Into<String>) -> Self {
        TypeExpr::Reference { name: name.into() }
    }

    pub fn primitive(name: impl Into<String>) -> Self {
        TypeExpr::Primitive { name: name.into() }
    }

    pub fn list(element: TypeExpr) -> Self {
        TypeExpr::List {
            element: Box::new(element),
        }
    }

    pub fn optional(inner: TypeExpr) -> Self {
        TypeExpr::Optional {
            inner: Box::new(inner),
        }
    }

    /// Strip list and optional wrappers: `List<Optional<User>>` -> `User`.
    pub fn unwrap_containers(&self) -> &TypeExpr {
        match self {
            TypeExpr::List { element } => element.unwrap_containers(),
            TypeExpr::Optional { inner } => inner.unwrap_containers(),
            other => other,
        }
    }

    /// The referenced name after unwrapping list/optional, if any.
    pub fn referenced_name(&self) -> Option<&str> {
        match self.unwrap_containers() {
            TypeExpr::Reference { name } => Some(name),
            _ => None,
        }
    }

    /// Every named reference reachable in this type, in source order.
    ///
    /// Walks generic arguments, container wrappers, map keys and values,
    /// union members and struct fields. The name of a generic itself is not
    /// a reference; only its arguments are.
    pub fn collect_references<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            TypeExpr::Primitive { .. } | TypeExpr::Enum { .. } => {}
            TypeExpr::Reference { name } => out.push(name),
            TypeExpr::List { element } => element.collect_references(out),
            TypeExpr::Map { key, value } => {
                key.collect_references(out);
                value.collect_references(out);
            }
            TypeExpr::Optional { inner } => inner.collect_references(out),
            TypeExpr::Struct { fields } => {
                for field in fields {
                    field.type_expr.collect_references(out);
                }
            }
            TypeExpr::Union { variants } => {
                for variant in variants {
                    for field in &variant.fields {
                        field.type_expr.collect_references(out);
                    }
                }
            }
            TypeExpr::Generic { arguments, .. } => {
                for arg in arguments {
                    arg.collect_references(out);
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnionVariant {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub type_expr: TypeExpr,
    #[serde(default)]
    pub annotations: Vec<String>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub span: Option<Span>,
}

impl Field {
    pub fn new(name: impl Into<String>, type_expr: TypeExpr) -> Self {
        Field {
            name: name.into(),
            type_expr,
            annotations: Vec::new(),
            optional: false,
            span: None,
        }
    }
}

// ──────────────────────────────────────────────
// Declarations
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Domain {
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub types: Vec<TypeDeclaration>,
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub behaviors: Vec<Behavior>,
    #[serde(default)]
    pub span: Option<Span>,
}

impl Domain {
    pub fn new(name: impl Into<String>) -> Self {
        Domain {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name == name)
    }

    pub fn behavior(&self, name: &str) -> Option<&Behavior> {
        self.behaviors.iter().find(|b| b.name == name)
    }

    pub fn type_declaration(&self, name: &str) -> Option<&TypeDeclaration> {
        self.types.iter().find(|t| t.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDeclaration {
    pub name: String,
    pub definition: TypeExpr,
    #[serde(default)]
    pub span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub span: Option<Span>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Behavior {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub input: InputSpec,
    #[serde(default)]
    pub output: OutputSpec,
    #[serde(default)]
    pub preconditions: ConditionBlock,
    #[serde(default)]
    pub postconditions: Vec<PostconditionBlock>,
    #[serde(default)]
    pub invariants: ConditionBlock,
    #[serde(default)]
    pub temporal: TemporalBlock,
    #[serde(default)]
    pub security: SecurityBlock,
    #[serde(default)]
    pub span: Option<Span>,
}

impl Behavior {
    pub fn new(name: impl Into<String>) -> Self {
        Behavior {
            name: name.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputSpec {
    #[serde(default)]
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputSpec {
    #[serde(default)]
    pub success: Option<TypeExpr>,
    #[serde(default)]
    pub errors: Vec<ErrorSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorSpec {
    pub name: String,
    #[serde(default)]
    pub when: Option<String>,
    #[serde(default)]
    pub retriable: bool,
    #[serde(default)]
    pub span: Option<Span>,
}

// ──────────────────────────────────────────────
// Contract blocks
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConditionBlock {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub span: Option<Span>,
}

impl ConditionBlock {
    /// Statements across all conditions, in declaration order.
    pub fn statements(&self) -> impl Iterator<Item = &Statement> {
        self.conditions.iter().flat_map(|c| c.statements.iter())
    }

    /// One condition per expression; the usual shape for hand-built blocks.
    pub fn from_exprs(exprs: impl IntoIterator<Item = Expr>) -> Self {
        ConditionBlock {
            conditions: exprs
                .into_iter()
                .map(|expression| Condition {
                    statements: vec![Statement {
                        expression,
                        span: None,
                    }],
                    span: None,
                })
                .collect(),
            span: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.statements().next().is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Condition {
    #[serde(default)]
    pub statements: Vec<Statement>,
    #[serde(default)]
    pub span: Option<Span>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statement {
    pub expression: Expr,
    #[serde(default)]
    pub span: Option<Span>,
}

impl Statement {
    /// The statement span, falling back to the span of its expression.
    pub fn span(&self) -> Option<&Span> {
        self.span.as_ref().or_else(|| self.expression.span())
    }
}

/// Postconditions guarded by an outcome: `success`, `failure`, or an error name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostconditionBlock {
    #[serde(default = "default_guard")]
    pub guard: String,
    #[serde(default)]
    pub predicates: ConditionBlock,
    #[serde(default)]
    pub span: Option<Span>,
}

fn default_guard() -> String {
    "success".to_string()
}

impl PostconditionBlock {
    pub fn success(predicates: ConditionBlock) -> Self {
        PostconditionBlock {
            guard: default_guard(),
            predicates,
            span: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemporalBlock {
    #[serde(default)]
    pub requirements: Vec<TemporalRequirement>,
    #[serde(default)]
    pub span: Option<Span>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemporalKind {
    Eventually,
    Within,
    Immediately,
    Always,
    Never,
    Response,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemporalRequirement {
    pub kind: TemporalKind,
    #[serde(default)]
    pub duration: Option<DurationLiteral>,
    /// Latency percentile qualifier such as `p99`
    #[serde(default)]
    pub percentile: Option<String>,
    pub condition: Expr,
    #[serde(default)]
    pub span: Option<Span>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecurityBlock {
    #[serde(default)]
    pub requirements: Vec<SecurityRequirement>,
    #[serde(default)]
    pub span: Option<Span>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityKind {
    Requires,
    RateLimit,
    FraudCheck,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityRequirement {
    pub kind: SecurityKind,
    pub expression: Expr,
    #[serde(default)]
    pub span: Option<Span>,
}
