//! Unsatisfiable preconditions: inline, always-false and cross-statement.

use isl_core::{Behavior, Diagnostic, DiagnosticCode, Expr, LogicalOp, Span};

use crate::constraint::{
    are_disjoint, classify_always_false, conjuncts, extract_constraints, Constraint, ConstraintOp,
    ConstraintValue,
};
use crate::pass::PassContext;

/// A constraint collected from one precondition statement.
struct Collected {
    constraint: Constraint,
    statement: usize,
    location: Span,
}

pub(super) fn check_preconditions(ctx: &PassContext<'_>, behavior: &Behavior, out: &mut Vec<Diagnostic>) {
    let mut collected: Vec<Collected> = Vec::new();

    for (idx, stmt) in behavior.preconditions.statements().enumerate() {
        let expr = &stmt.expression;
        let location = ctx.location_of(stmt.span());

        if let Some((a, b)) = inline_contradiction(expr) {
            out.push(
                Diagnostic::new(
                    DiagnosticCode::InlineContradiction,
                    format!(
                        "precondition `{}` of behavior '{}' can never be satisfied",
                        expr, behavior.name
                    ),
                    location,
                )
                .with_note(format!("`{}` and `{}` have no value of `{}` in common", a, b, a.variable))
                .with_help("fix the bounds or split the condition with `or`"),
            );
            continue;
        }

        if let Some(reason) = classify_always_false(expr) {
            out.push(
                Diagnostic::new(
                    DiagnosticCode::AlwaysFalse,
                    format!(
                        "precondition `{}` of behavior '{}' is always false",
                        expr, behavior.name
                    ),
                    location,
                )
                .with_note(format!("the condition is {}", reason))
                .with_help("the behavior can never execute; remove or correct this precondition"),
            );
            continue;
        }

        for constraint in extract_constraints(expr) {
            collected.push(Collected {
                constraint,
                statement: idx,
                location: location.clone(),
            });
        }
    }

    check_cross_statement(behavior, &collected, out);
}

/// First pair of disjoint numeric constraints inside a single `and` chain.
fn inline_contradiction(expr: &Expr) -> Option<(Constraint, Constraint)> {
    if !matches!(expr, Expr::Logical(l) if l.operator == LogicalOp::And) {
        return None;
    }
    let numeric: Vec<Constraint> = conjuncts(expr)
        .into_iter()
        .filter_map(crate::constraint::extract_constraint)
        .filter(|c| c.number().is_some())
        .collect();
    for (i, a) in numeric.iter().enumerate() {
        for b in &numeric[i + 1..] {
            if are_disjoint(a, b) {
                return Some((a.clone(), b.clone()));
            }
        }
    }
    None
}

/// Boolean and string-equality conflicts; numeric pairs go through the
/// disjointness table.
fn conflicts(a: &Constraint, b: &Constraint) -> bool {
    use ConstraintOp::{Eq, Ne};
    if a.variable != b.variable {
        return false;
    }
    match (&a.value, &b.value) {
        (ConstraintValue::Number(_), ConstraintValue::Number(_)) => are_disjoint(a, b),
        (ConstraintValue::Bool(va), ConstraintValue::Bool(vb)) => match (a.op, b.op) {
            (Eq, Eq) => va != vb,
            (Eq, Ne) | (Ne, Eq) => va == vb,
            _ => false,
        },
        (ConstraintValue::Str(va), ConstraintValue::Str(vb)) => match (a.op, b.op) {
            (Eq, Eq) => va != vb,
            (Eq, Ne) | (Ne, Eq) => va == vb,
            _ => false,
        },
        _ => false,
    }
}

/// Emits in statement order: each constraint is checked against the earlier
/// constraints on the same variable.
fn check_cross_statement(behavior: &Behavior, collected: &[Collected], out: &mut Vec<Diagnostic>) {
    for (i, later) in collected.iter().enumerate() {
        let same_variable = collected[..i]
            .iter()
            .filter(|earlier| earlier.constraint.variable == later.constraint.variable);
        for earlier in same_variable {
            if later.statement == earlier.statement && is_numeric(&later.constraint) {
                continue;
            }
            if conflicts(&earlier.constraint, &later.constraint) {
                out.push(
                    Diagnostic::new(
                        DiagnosticCode::ContradictoryPrecondition,
                        format!(
                            "precondition `{}` contradicts `{}` in behavior '{}'",
                            later.constraint, earlier.constraint, behavior.name
                        ),
                        later.location.clone(),
                    )
                    .with_related(
                        format!("conflicting precondition `{}`", earlier.constraint),
                        earlier.location.clone(),
                    )
                    .with_note("no input can satisfy both preconditions, so the behavior can never run"),
                );
            }
        }
    }
}

fn is_numeric(c: &Constraint) -> bool {
    c.number().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use isl_core::{BinaryOp, ConditionBlock, Domain};

    fn cmp(op: BinaryOp, var: &str, value: Expr) -> Expr {
        Expr::binary(op, Expr::path_expr(var), value)
    }

    fn run(exprs: Vec<Expr>) -> Vec<Diagnostic> {
        let mut behavior = Behavior::new("Withdraw");
        behavior.preconditions = ConditionBlock::from_exprs(
            exprs
                .into_iter()
                .enumerate()
                .map(|(i, e)| e.with_span(Span::line("w.isl", i as u32 + 1))),
        );
        let domain = Domain::new("Bank");
        let ctx = PassContext::new(&domain, "w.isl");
        let mut out = Vec::new();
        check_preconditions(&ctx, &behavior, &mut out);
        out
    }

    #[test]
    fn single_statement_range_conflict_is_inline() {
        let ds = run(vec![Expr::and(
            cmp(BinaryOp::Ge, "x", Expr::number(8.0)),
            cmp(BinaryOp::Lt, "x", Expr::number(8.0)),
        )]);
        assert_eq!(ds.len(), 1);
        assert_eq!(ds[0].code, DiagnosticCode::InlineContradiction);
    }

    #[test]
    fn nested_and_is_searched() {
        let ds = run(vec![Expr::and(
            cmp(BinaryOp::Gt, "x", Expr::number(10.0)),
            Expr::and(Expr::ident("ready"), cmp(BinaryOp::Lt, "x", Expr::number(3.0))),
        )]);
        assert_eq!(ds.len(), 1);
        assert_eq!(ds[0].code, DiagnosticCode::InlineContradiction);
    }

    #[test]
    fn two_statement_range_conflict_is_cross_statement() {
        let ds = run(vec![
            cmp(BinaryOp::Ge, "x", Expr::number(8.0)),
            cmp(BinaryOp::Lt, "x", Expr::number(8.0)),
        ]);
        assert_eq!(ds.len(), 1);
        assert_eq!(ds[0].code, DiagnosticCode::ContradictoryPrecondition);
        assert_eq!(ds[0].location.line, 2);
        assert_eq!(ds[0].related_information[0].location.line, 1);
    }

    #[test]
    fn overlapping_ranges_are_fine() {
        let ds = run(vec![
            cmp(BinaryOp::Ge, "amount", Expr::number(0.0)),
            cmp(BinaryOp::Le, "amount", Expr::number(100.0)),
            Expr::and(
                cmp(BinaryOp::Gt, "fee", Expr::number(1.0)),
                cmp(BinaryOp::Lt, "fee", Expr::number(5.0)),
            ),
        ]);
        assert!(ds.is_empty(), "{:?}", ds);
    }

    #[test]
    fn always_false_shapes_are_errors() {
        let ds = run(vec![
            Expr::boolean(false),
            Expr::binary(BinaryOp::Ne, Expr::ident("a"), Expr::ident("a")),
            Expr::binary(BinaryOp::Eq, Expr::boolean(false), Expr::boolean(true)),
        ]);
        assert_eq!(ds.len(), 3);
        assert!(ds.iter().all(|d| d.code == DiagnosticCode::AlwaysFalse));
    }

    #[test]
    fn boolean_conflicts_across_statements() {
        let ds = run(vec![
            cmp(BinaryOp::Eq, "user.active", Expr::boolean(true)),
            cmp(BinaryOp::Eq, "user.active", Expr::boolean(false)),
        ]);
        assert_eq!(ds.len(), 1);
        assert_eq!(ds[0].code, DiagnosticCode::ContradictoryPrecondition);

        let ds = run(vec![
            cmp(BinaryOp::Eq, "flag", Expr::boolean(true)),
            cmp(BinaryOp::Ne, "flag", Expr::boolean(true)),
        ]);
        assert_eq!(ds.len(), 1);
    }

    #[test]
    fn string_equality_conflicts() {
        let ds = run(vec![
            cmp(BinaryOp::Eq, "status", Expr::string("open")),
            cmp(BinaryOp::Eq, "status", Expr::string("closed")),
            cmp(BinaryOp::Ne, "status", Expr::string("open")),
        ]);
        // open/closed and open/!open; closed/!open is satisfiable
        assert_eq!(ds.len(), 2);
        assert!(ds.iter().all(|d| d.code == DiagnosticCode::ContradictoryPrecondition));

        let ds = run(vec![
            cmp(BinaryOp::Ne, "status", Expr::string("open")),
            cmp(BinaryOp::Ne, "status", Expr::string("closed")),
        ]);
        assert!(ds.is_empty());
    }

    #[test]
    fn inline_statement_is_not_accumulated() {
        let ds = run(vec![
            Expr::and(
                cmp(BinaryOp::Ge, "x", Expr::number(8.0)),
                cmp(BinaryOp::Lt, "x", Expr::number(8.0)),
            ),
            cmp(BinaryOp::Gt, "x", Expr::number(100.0)),
        ]);
        assert_eq!(ds.len(), 1);
        assert_eq!(ds[0].code, DiagnosticCode::InlineContradiction);
    }

    #[test]
    fn unresolvable_comparisons_are_ignored() {
        let ds = run(vec![
            Expr::binary(
                BinaryOp::Gt,
                Expr::call(Expr::ident("len"), vec![Expr::ident("name")]),
                Expr::number(3.0),
            ),
            Expr::binary(
                BinaryOp::Lt,
                Expr::call(Expr::ident("len"), vec![Expr::ident("name")]),
                Expr::number(1.0),
            ),
        ]);
        assert!(ds.is_empty());
    }

    #[test]
    fn conflicts_follow_statement_order() {
        let ds = run(vec![
            cmp(BinaryOp::Gt, "zeta", Expr::number(10.0)),
            cmp(BinaryOp::Gt, "alpha", Expr::number(10.0)),
            cmp(BinaryOp::Lt, "zeta", Expr::number(5.0)),
            cmp(BinaryOp::Lt, "alpha", Expr::number(5.0)),
        ]);
        let lines: Vec<u32> = ds.iter().map(|d| d.location.line).collect();
        assert_eq!(lines, vec![3, 4]);
        assert!(ds[0].message.contains("zeta"));
    }
}
