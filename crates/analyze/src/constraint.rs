//! Constraint extraction and shape classification.
//!
//! Everything here is syntactic: comparisons of a variable path against a
//! literal become [`Constraint`] triples, and a handful of fixed shapes are
//! recognized as always true or always false. Cost is linear in expression
//! size. Equivalences that need reasoning (`a == b` vs `b == a`, arithmetic)
//! are deliberately missed.

use std::fmt;

use isl_core::{BinaryOp, Expr, LiteralValue, LogicalOp, Span, UnaryOp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl ConstraintOp {
    fn from_binary(op: BinaryOp) -> Option<Self> {
        match op {
            BinaryOp::Eq => Some(ConstraintOp::Eq),
            BinaryOp::Ne => Some(ConstraintOp::Ne),
            BinaryOp::Lt => Some(ConstraintOp::Lt),
            BinaryOp::Le => Some(ConstraintOp::Le),
            BinaryOp::Gt => Some(ConstraintOp::Gt),
            BinaryOp::Ge => Some(ConstraintOp::Ge),
            BinaryOp::Add
            | BinaryOp::Sub
            | BinaryOp::Mul
            | BinaryOp::Div
            | BinaryOp::Rem
            | BinaryOp::In => None,
        }
    }

    /// The operator seen from the other side: `5 < x` is `x > 5`.
    pub fn flipped(self) -> Self {
        match self {
            ConstraintOp::Lt => ConstraintOp::Gt,
            ConstraintOp::Gt => ConstraintOp::Lt,
            ConstraintOp::Le => ConstraintOp::Ge,
            ConstraintOp::Ge => ConstraintOp::Le,
            other => other,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            ConstraintOp::Eq => "==",
            ConstraintOp::Ne => "!=",
            ConstraintOp::Lt => "<",
            ConstraintOp::Le => "<=",
            ConstraintOp::Gt => ">",
            ConstraintOp::Ge => ">=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintValue {
    Number(f64),
    Bool(bool),
    Str(String),
}

impl fmt::Display for ConstraintValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintValue::Number(n) => write!(f, "{}", n),
            ConstraintValue::Bool(b) => write!(f, "{}", b),
            ConstraintValue::Str(s) => write!(f, "\"{}\"", s),
        }
    }
}

/// `variable op value`, e.g. `input.amount > 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub variable: String,
    pub op: ConstraintOp,
    pub value: ConstraintValue,
    pub span: Option<Span>,
}

impl Constraint {
    pub fn number(&self) -> Option<f64> {
        match self.value {
            ConstraintValue::Number(n) => Some(n),
            _ => None,
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.variable, self.op.symbol(), self.value)
    }
}

fn constraint_value(expr: &Expr) -> Option<ConstraintValue> {
    match expr {
        Expr::Literal(lit) => match &lit.value {
            LiteralValue::Number(n) => Some(ConstraintValue::Number(*n)),
            LiteralValue::Boolean(b) => Some(ConstraintValue::Bool(*b)),
            LiteralValue::String(s) => Some(ConstraintValue::Str(s.clone())),
            LiteralValue::Null | LiteralValue::Duration(_) => None,
        },
        Expr::Unary(u) if u.operator == UnaryOp::Neg => match u.operand.literal() {
            Some(LiteralValue::Number(n)) => Some(ConstraintValue::Number(-n)),
            _ => None,
        },
        _ => None,
    }
}

/// Match `variable OP literal` or `literal OP variable`.
///
/// Returns `None` unless one side resolves to an identifier or member path;
/// an unrecognized shape is never turned into a constraint.
pub fn extract_constraint(expr: &Expr) -> Option<Constraint> {
    let Expr::Binary(bin) = expr else {
        return None;
    };
    let op = ConstraintOp::from_binary(bin.operator)?;

    if let (Some(variable), Some(value)) = (bin.left.path(), constraint_value(&bin.right)) {
        return Some(Constraint {
            variable,
            op,
            value,
            span: bin.span.clone(),
        });
    }
    if let (Some(value), Some(variable)) = (constraint_value(&bin.left), bin.right.path()) {
        return Some(Constraint {
            variable,
            op: op.flipped(),
            value,
            span: bin.span.clone(),
        });
    }
    None
}

/// Operands of a (possibly nested) `and` chain, left to right.
pub fn conjuncts(expr: &Expr) -> Vec<&Expr> {
    match expr {
        Expr::Logical(l) if l.operator == LogicalOp::And => {
            let mut out = conjuncts(&l.left);
            out.extend(conjuncts(&l.right));
            out
        }
        other => vec![other],
    }
}

/// Every constraint in an `and` chain. Non-constraint conjuncts are skipped.
pub fn extract_constraints(expr: &Expr) -> Vec<Constraint> {
    conjuncts(expr)
        .into_iter()
        .filter_map(extract_constraint)
        .collect()
}

// ──────────────────────────────────────────────
// Shape classification
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TautologyReason {
    LiteralTrue,
    SelfComparison(BinaryOp),
    OrTrue,
    NotFalse,
}

impl fmt::Display for TautologyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TautologyReason::LiteralTrue => f.write_str("the literal `true`"),
            TautologyReason::SelfComparison(op) => {
                write!(f, "an expression compared with itself using `{}`", op.symbol())
            }
            TautologyReason::OrTrue => f.write_str("a disjunction with `true`"),
            TautologyReason::NotFalse => f.write_str("the negation of `false`"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlwaysFalseReason {
    LiteralFalse,
    SelfInequality,
    BooleanLiteralMismatch,
}

impl fmt::Display for AlwaysFalseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AlwaysFalseReason::LiteralFalse => "the literal `false`",
            AlwaysFalseReason::SelfInequality => "an expression compared unequal to itself",
            AlwaysFalseReason::BooleanLiteralMismatch => "a comparison of different boolean literals",
        })
    }
}

pub fn classify_tautology(expr: &Expr) -> Option<TautologyReason> {
    match expr {
        Expr::Literal(_) if expr.as_bool() == Some(true) => Some(TautologyReason::LiteralTrue),
        Expr::Binary(b)
            if matches!(b.operator, BinaryOp::Eq | BinaryOp::Ge | BinaryOp::Le)
                && normalize_expression(&b.left) == normalize_expression(&b.right) =>
        {
            Some(TautologyReason::SelfComparison(b.operator))
        }
        Expr::Logical(l)
            if l.operator == LogicalOp::Or
                && (l.left.as_bool() == Some(true) || l.right.as_bool() == Some(true)) =>
        {
            Some(TautologyReason::OrTrue)
        }
        Expr::Unary(u) if u.operator == UnaryOp::Not && u.operand.as_bool() == Some(false) => {
            Some(TautologyReason::NotFalse)
        }
        _ => None,
    }
}

pub fn classify_always_false(expr: &Expr) -> Option<AlwaysFalseReason> {
    match expr {
        Expr::Literal(_) if expr.as_bool() == Some(false) => Some(AlwaysFalseReason::LiteralFalse),
        Expr::Binary(b)
            if b.operator == BinaryOp::Ne
                && normalize_expression(&b.left) == normalize_expression(&b.right) =>
        {
            Some(AlwaysFalseReason::SelfInequality)
        }
        Expr::Binary(b) if b.operator == BinaryOp::Eq => match (b.left.as_bool(), b.right.as_bool()) {
            (Some(l), Some(r)) if l != r => Some(AlwaysFalseReason::BooleanLiteralMismatch),
            _ => None,
        },
        _ => None,
    }
}

// ──────────────────────────────────────────────
// Structural keys
// ──────────────────────────────────────────────

fn literal_key(value: &LiteralValue) -> String {
    match value {
        LiteralValue::Boolean(b) => format!("bool:{}", b),
        LiteralValue::Number(n) => format!("num:{}", n),
        LiteralValue::String(s) => format!("str:{:?}", s),
        LiteralValue::Null => "null".to_string(),
        LiteralValue::Duration(d) => format!("dur:{}{}", d.value, d.unit),
    }
}

/// Structural key: node kind, operator and child keys, operand order kept.
///
/// Two expressions with equal keys are textually identical modulo spans.
pub fn normalize_expression(expr: &Expr) -> String {
    match expr {
        Expr::Identifier(id) => format!("id:{}", id.name),
        Expr::Member(m) => format!("member({}.{})", normalize_expression(&m.object), m.property),
        Expr::Literal(lit) => format!("lit:{}", literal_key(&lit.value)),
        Expr::Binary(b) => format!(
            "binary({},{},{})",
            b.operator.symbol(),
            normalize_expression(&b.left),
            normalize_expression(&b.right)
        ),
        Expr::Logical(l) => format!(
            "logical({},{},{})",
            l.operator.symbol(),
            normalize_expression(&l.left),
            normalize_expression(&l.right)
        ),
        Expr::Unary(u) => {
            let op = match u.operator {
                UnaryOp::Not => "not",
                UnaryOp::Neg => "neg",
            };
            format!("unary({},{})", op, normalize_expression(&u.operand))
        }
        Expr::Call(c) => {
            let args: Vec<String> = c.arguments.iter().map(normalize_expression).collect();
            format!("call({};{})", normalize_expression(&c.callee), args.join(","))
        }
        Expr::Quantifier(q) => format!(
            "quantifier({},{},{},{})",
            q.quantifier.keyword(),
            q.variable,
            normalize_expression(&q.collection),
            normalize_expression(&q.predicate)
        ),
        Expr::Conditional(c) => format!(
            "conditional({},{},{})",
            normalize_expression(&c.condition),
            normalize_expression(&c.then_branch),
            normalize_expression(&c.else_branch)
        ),
        Expr::List(l) => {
            let elements: Vec<String> = l.elements.iter().map(normalize_expression).collect();
            format!("list({})", elements.join(","))
        }
        Expr::Old(o) => format!("old({})", normalize_expression(&o.expression)),
    }
}

// ──────────────────────────────────────────────
// Numeric relations
// ──────────────────────────────────────────────

fn numeric_pair<'c>(a: &'c Constraint, b: &'c Constraint) -> Option<(f64, f64)> {
    if a.variable != b.variable {
        return None;
    }
    Some((a.number()?, b.number()?))
}

/// Ordered half of the disjointness table; [`are_disjoint`] tries both orders.
fn disjoint_ordered(a: ConstraintOp, va: f64, b: ConstraintOp, vb: f64) -> bool {
    use ConstraintOp::*;
    match (a, b) {
        (Ge, Lt) | (Gt, Le) | (Gt, Lt) => va >= vb,
        (Ge, Le) => va > vb,
        (Eq, Eq) => va != vb,
        (Eq, Ne) => va == vb,
        (Eq, Gt) => va <= vb,
        (Eq, Lt) => va >= vb,
        _ => false,
    }
}

/// True when two numeric constraints on the same variable cannot both hold.
pub fn are_disjoint(a: &Constraint, b: &Constraint) -> bool {
    match numeric_pair(a, b) {
        Some((va, vb)) => disjoint_ordered(a.op, va, b.op, vb) || disjoint_ordered(b.op, vb, a.op, va),
        None => false,
    }
}

/// True when `stronger` holding guarantees `weaker` holds.
pub fn implies(stronger: &Constraint, weaker: &Constraint) -> bool {
    use ConstraintOp::*;
    let Some((s, w)) = numeric_pair(stronger, weaker) else {
        return false;
    };
    match (stronger.op, weaker.op) {
        (Gt, Gt) => s > w,
        (Ge, Ge) => s >= w,
        (Gt, Ge) => s >= w,
        (Lt, Lt) => s < w,
        (Le, Le) => s <= w,
        (Lt, Le) => s <= w,
        (Eq, Ge) => s >= w,
        (Eq, Le) => s <= w,
        (Eq, Gt) => s > w,
        (Eq, Lt) => s < w,
        _ => false,
    }
}
