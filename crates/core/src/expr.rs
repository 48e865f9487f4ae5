//! Contract expressions.
//!
//! `Expr` is a closed sum type: every visitor matches it exhaustively, and
//! [`Expr::children`] is the single place that knows which slots hold
//! sub-expressions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ast::Span;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Expr {
    Identifier(Identifier),
    Member(MemberExpr),
    Literal(Literal),
    Binary(BinaryExpr),
    Logical(LogicalExpr),
    Unary(UnaryExpr),
    Call(CallExpr),
    Quantifier(QuantifierExpr),
    Conditional(ConditionalExpr),
    List(ListExpr),
    Old(OldExpr),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identifier {
    pub name: String,
    #[serde(default)]
    pub span: Option<Span>,
}

/// `object.property`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberExpr {
    pub object: Box<Expr>,
    pub property: String,
    #[serde(default)]
    pub span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Literal {
    pub value: LiteralValue,
    #[serde(default)]
    pub span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum LiteralValue {
    Boolean(bool),
    Number(f64),
    String(String),
    Null,
    Duration(DurationLiteral),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationLiteral {
    pub value: f64,
    pub unit: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    #[serde(rename = "==", alias = "===")]
    Eq,
    #[serde(rename = "!=", alias = "!==")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
    #[serde(rename = "%")]
    Rem,
    #[serde(rename = "in")]
    In,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::In => "in",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryExpr {
    pub operator: BinaryOp,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
    #[serde(default)]
    pub span: Option<Span>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalOp {
    #[serde(rename = "and", alias = "&&")]
    And,
    #[serde(rename = "or", alias = "||")]
    Or,
    #[serde(rename = "implies", alias = "=>")]
    Implies,
}

impl LogicalOp {
    pub fn symbol(self) -> &'static str {
        match self {
            LogicalOp::And => "and",
            LogicalOp::Or => "or",
            LogicalOp::Implies => "implies",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalExpr {
    pub operator: LogicalOp,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
    #[serde(default)]
    pub span: Option<Span>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    #[serde(rename = "not", alias = "!")]
    Not,
    #[serde(rename = "-")]
    Neg,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnaryExpr {
    pub operator: UnaryOp,
    pub operand: Box<Expr>,
    #[serde(default)]
    pub span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallExpr {
    pub callee: Box<Expr>,
    #[serde(default)]
    pub arguments: Vec<Expr>,
    #[serde(default)]
    pub span: Option<Span>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quantifier {
    All,
    Any,
    None,
    Count,
    Sum,
    Filter,
}

impl Quantifier {
    pub fn keyword(self) -> &'static str {
        match self {
            Quantifier::All => "all",
            Quantifier::Any => "any",
            Quantifier::None => "none",
            Quantifier::Count => "count",
            Quantifier::Sum => "sum",
            Quantifier::Filter => "filter",
        }
    }
}

/// `all(items, item => item.price > 0)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantifierExpr {
    pub quantifier: Quantifier,
    pub variable: String,
    pub collection: Box<Expr>,
    pub predicate: Box<Expr>,
    #[serde(default)]
    pub span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalExpr {
    pub condition: Box<Expr>,
    #[serde(rename = "then")]
    pub then_branch: Box<Expr>,
    #[serde(rename = "else")]
    pub else_branch: Box<Expr>,
    #[serde(default)]
    pub span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListExpr {
    #[serde(default)]
    pub elements: Vec<Expr>,
    #[serde(default)]
    pub span: Option<Span>,
}

/// `old(expr)` -- the pre-state value inside a postcondition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OldExpr {
    pub expression: Box<Expr>,
    #[serde(default)]
    pub span: Option<Span>,
}

// ──────────────────────────────────────────────
// Traversal
// ──────────────────────────────────────────────

impl Expr {
    pub fn span(&self) -> Option<&Span> {
        match self {
            Expr::Identifier(e) => e.span.as_ref(),
            Expr::Member(e) => e.span.as_ref(),
            Expr::Literal(e) => e.span.as_ref(),
            Expr::Binary(e) => e.span.as_ref(),
            Expr::Logical(e) => e.span.as_ref(),
            Expr::Unary(e) => e.span.as_ref(),
            Expr::Call(e) => e.span.as_ref(),
            Expr::Quantifier(e) => e.span.as_ref(),
            Expr::Conditional(e) => e.span.as_ref(),
            Expr::List(e) => e.span.as_ref(),
            Expr::Old(e) => e.span.as_ref(),
        }
    }

    /// Every direct sub-expression, left to right.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Identifier(_) | Expr::Literal(_) => Vec::new(),
            Expr::Member(e) => vec![&*e.object],
            Expr::Binary(e) => vec![&*e.left, &*e.right],
            Expr::Logical(e) => vec![&*e.left, &*e.right],
            Expr::Unary(e) => vec![&*e.operand],
            Expr::Call(e) => {
                let mut out = vec![&*e.callee];
                out.extend(e.arguments.iter());
                out
            }
            Expr::Quantifier(e) => vec![&*e.collection, &*e.predicate],
            Expr::Conditional(e) => vec![&*e.condition, &*e.then_branch, &*e.else_branch],
            Expr::List(e) => e.elements.iter().collect(),
            Expr::Old(e) => vec![&*e.expression],
        }
    }

    /// Pre-order walk over this expression and all of its descendants.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Expr)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    /// Dotted path for identifiers and member chains: `input.user.email`.
    pub fn path(&self) -> Option<String> {
        match self {
            Expr::Identifier(id) => Some(id.name.clone()),
            Expr::Member(m) => m.object.path().map(|base| format!("{}.{}", base, m.property)),
            _ => None,
        }
    }

    pub fn literal(&self) -> Option<&LiteralValue> {
        match self {
            Expr::Literal(lit) => Some(&lit.value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.literal() {
            Some(LiteralValue::Boolean(b)) => Some(*b),
            _ => None,
        }
    }

    // ── Constructors ───────────────────────────

    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Identifier(Identifier {
            name: name.into(),
            span: None,
        })
    }

    /// Builds a member chain from a dotted path: `"input.email"`.
    pub fn path_expr(path: &str) -> Self {
        let mut parts = path.split('.');
        let mut expr = Expr::ident(parts.next().unwrap_or_default());
        for part in parts {
            expr = Expr::member(expr, part);
        }
        expr
    }

    pub fn member(object: Expr, property: impl Into<String>) -> Self {
        Expr::Member(MemberExpr {
            object: Box::new(object),
            property: property.into(),
            span: None,
        })
    }

    pub fn boolean(value: bool) -> Self {
        Expr::lit(LiteralValue::Boolean(value))
    }

    pub fn number(value: f64) -> Self {
        Expr::lit(LiteralValue::Number(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Expr::lit(LiteralValue::String(value.into()))
    }

    pub fn lit(value: LiteralValue) -> Self {
        Expr::Literal(Literal { value, span: None })
    }

    pub fn binary(operator: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary(BinaryExpr {
            operator,
            left: Box::new(left),
            right: Box::new(right),
            span: None,
        })
    }

    pub fn logical(operator: LogicalOp, left: Expr, right: Expr) -> Self {
        Expr::Logical(LogicalExpr {
            operator,
            left: Box::new(left),
            right: Box::new(right),
            span: None,
        })
    }

    pub fn and(left: Expr, right: Expr) -> Self {
        Expr::logical(LogicalOp::And, left, right)
    }

    pub fn or(left: Expr, right: Expr) -> Self {
        Expr::logical(LogicalOp::Or, left, right)
    }

    pub fn not(operand: Expr) -> Self {
        Expr::Unary(UnaryExpr {
            operator: UnaryOp::Not,
            operand: Box::new(operand),
            span: None,
        })
    }

    pub fn call(callee: Expr, arguments: Vec<Expr>) -> Self {
        Expr::Call(CallExpr {
            callee: Box::new(callee),
            arguments,
            span: None,
        })
    }

    /// Replace the span on the outermost node.
    pub fn with_span(mut self, span: Span) -> Self {
        let slot = match &mut self {
            Expr::Identifier(e) => &mut e.span,
            Expr::Member(e) => &mut e.span,
            Expr::Literal(e) => &mut e.span,
            Expr::Binary(e) => &mut e.span,
            Expr::Logical(e) => &mut e.span,
            Expr::Unary(e) => &mut e.span,
            Expr::Call(e) => &mut e.span,
            Expr::Quantifier(e) => &mut e.span,
            Expr::Conditional(e) => &mut e.span,
            Expr::List(e) => &mut e.span,
            Expr::Old(e) => &mut e.span,
        };
        *slot = Some(span);
        self
    }

    fn is_compound(&self) -> bool {
        matches!(
            self,
            Expr::Binary(_) | Expr::Logical(_) | Expr::Conditional(_)
        )
    }
}

// ──────────────────────────────────────────────
// Rendering
// ──────────────────────────────────────────────

struct Operand<'a>(&'a Expr);

impl fmt::Display for Operand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_compound() {
            write!(f, "({})", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::Boolean(b) => write!(f, "{}", b),
            LiteralValue::Number(n) => write!(f, "{}", n),
            LiteralValue::String(s) => write!(f, "\"{}\"", s.replace('"', "\\\"")),
            LiteralValue::Null => f.write_str("null"),
            LiteralValue::Duration(d) => write!(f, "{}{}", d.value, d.unit),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Identifier(id) => f.write_str(&id.name),
            Expr::Member(m) => write!(f, "{}.{}", Operand(&m.object), m.property),
            Expr::Literal(lit) => write!(f, "{}", lit.value),
            Expr::Binary(b) => write!(
                f,
                "{} {} {}",
                Operand(&b.left),
                b.operator.symbol(),
                Operand(&b.right)
            ),
            Expr::Logical(l) => write!(
                f,
                "{} {} {}",
                Operand(&l.left),
                l.operator.symbol(),
                Operand(&l.right)
            ),
            Expr::Unary(u) => match u.operator {
                UnaryOp::Not => write!(f, "!{}", Operand(&u.operand)),
                UnaryOp::Neg => write!(f, "-{}", Operand(&u.operand)),
            },
            Expr::Call(c) => {
                write!(f, "{}(", c.callee)?;
                for (i, arg) in c.arguments.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
            Expr::Quantifier(q) => write!(
                f,
                "{}({}, {} => {})",
                q.quantifier.keyword(),
                q.collection,
                q.variable,
                q.predicate
            ),
            Expr::Conditional(c) => write!(
                f,
                "if {} then {} else {}",
                c.condition, c.then_branch, c.else_branch
            ),
            Expr::List(l) => {
                f.write_str("[")?;
                for (i, el) in l.elements.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", el)?;
                }
                f.write_str("]")
            }
            Expr::Old(o) => write!(f, "old({})", o.expression),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_resolves_member_chains() {
        let e = Expr::path_expr("input.user.email");
        assert_eq!(e.path().as_deref(), Some("input.user.email"));
        let call = Expr::call(Expr::ident("len"), vec![Expr::ident("x")]);
        assert_eq!(call.path(), None);
    }

    #[test]
    fn children_cover_every_slot() {
        let e = Expr::call(
            Expr::path_expr("User.lookup"),
            vec![Expr::ident("a"), Expr::number(1.0)],
        );
        assert_eq!(e.children().len(), 3);

        let mut names = Vec::new();
        e.walk(&mut |node| {
            if let Expr::Identifier(id) = node {
                names.push(id.name.as_str());
            }
        });
        assert_eq!(names, vec!["User", "a"]);
    }

    #[test]
    fn display_parenthesizes_compound_operands() {
        let e = Expr::not(Expr::binary(
            BinaryOp::Gt,
            Expr::ident("x"),
            Expr::number(5.0),
        ));
        assert_eq!(e.to_string(), "!(x > 5)");

        let e = Expr::and(
            Expr::binary(BinaryOp::Eq, Expr::path_expr("a.b"), Expr::string("on")),
            Expr::boolean(true),
        );
        assert_eq!(e.to_string(), "(a.b == \"on\") and true");
    }

    #[test]
    fn deserializes_tagged_json() {
        let json = r#"{
            "kind": "Binary",
            "operator": "===",
            "left": { "kind": "Identifier", "name": "x" },
            "right": { "kind": "Literal", "value": { "type": "number", "value": 3 } }
        }"#;
        let e: Expr = serde_json::from_str(json).unwrap();
        match e {
            Expr::Binary(b) => {
                assert_eq!(b.operator, BinaryOp::Eq);
                assert_eq!(b.right.literal(), Some(&LiteralValue::Number(3.0)));
            }
            other => panic!("expected binary, got {:?}", other),
        }
    }

    #[test]
    fn logical_aliases_deserialize() {
        let json = r#"{
            "kind": "Logical",
            "operator": "&&",
            "left": { "kind": "Literal", "value": { "type": "boolean", "value": true } },
            "right": { "kind": "Identifier", "name": "ok" }
        }"#;
        let e: Expr = serde_json::from_str(json).unwrap();
        assert!(matches!(e, Expr::Logical(LogicalExpr { operator: LogicalOp::And, .. })));
    }
}
