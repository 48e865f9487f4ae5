//! Redundant condition detection (E0350-E0353).
//!
//! Each condition list of a behavior -- preconditions, every postcondition
//! block, invariants -- is scanned once, in order. A condition can be
//! reported under more than one category.

use std::collections::HashMap;

use isl_core::{BinaryOp, Behavior, ConditionBlock, Diagnostic, DiagnosticCode, Expr, Fix, Span, Statement};

use crate::constraint::{classify_tautology, extract_constraint, implies, normalize_expression, Constraint};
use crate::pass::{AnalysisPass, PassContext};

pub struct RedundantConditionsPass;

impl AnalysisPass for RedundantConditionsPass {
    fn id(&self) -> &'static str {
        "redundant-conditions"
    }

    fn name(&self) -> &'static str {
        "Redundant Conditions"
    }

    fn description(&self) -> &'static str {
        "Detects tautological, duplicated and subsumed conditions and redundant boolean comparisons"
    }

    fn priority(&self) -> i32 {
        10
    }

    fn run(&self, ctx: &PassContext<'_>) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        for behavior in &ctx.ast.behaviors {
            analyze_behavior(ctx, behavior, &mut diagnostics);
        }
        diagnostics
    }
}

fn analyze_behavior(ctx: &PassContext<'_>, behavior: &Behavior, out: &mut Vec<Diagnostic>) {
    analyze_block(ctx, behavior, "precondition", &behavior.preconditions, out);
    for post in &behavior.postconditions {
        let label = format!("postcondition ({})", post.guard);
        analyze_block(ctx, behavior, &label, &post.predicates, out);
    }
    analyze_block(ctx, behavior, "invariant", &behavior.invariants, out);
}

fn analyze_block(
    ctx: &PassContext<'_>,
    behavior: &Behavior,
    label: &str,
    block: &ConditionBlock,
    out: &mut Vec<Diagnostic>,
) {
    let statements: Vec<&Statement> = block.statements().collect();
    let constraints: Vec<Option<Constraint>> = statements
        .iter()
        .map(|s| extract_constraint(&s.expression).filter(|c| c.number().is_some()))
        .collect();
    // normalized key -> location of first occurrence
    let mut seen: HashMap<String, Span> = HashMap::new();

    for (i, stmt) in statements.iter().enumerate() {
        let expr = &stmt.expression;
        let location = ctx.location_of(stmt.span());

        if let Some(reason) = classify_tautology(expr) {
            out.push(
                Diagnostic::new(
                    DiagnosticCode::Tautology,
                    format!(
                        "{} `{}` in behavior '{}' is always true",
                        label, expr, behavior.name
                    ),
                    location.clone(),
                )
                .with_note(format!("the condition is {}", reason))
                .with_help("remove the condition or replace it with the constraint you intended")
                .with_tag("unnecessary"),
            );
        }

        let key = normalize_expression(expr);
        match seen.get(&key) {
            Some(first) => out.push(
                Diagnostic::new(
                    DiagnosticCode::Duplicate,
                    format!(
                        "duplicate {} `{}` in behavior '{}'",
                        label, expr, behavior.name
                    ),
                    location.clone(),
                )
                .with_related("first occurrence", first.clone())
                .with_help("remove the repeated condition")
                .with_tag("unnecessary"),
            ),
            None => {
                seen.insert(key, location.clone());
            }
        }

        if let Some(current) = &constraints[i] {
            for (j, earlier) in constraints[..i].iter().enumerate() {
                let Some(earlier) = earlier.as_ref().filter(|c| implies(c, current)) else {
                    continue;
                };
                let earlier_location = ctx.location_of(statements[j].span());
                out.push(
                    Diagnostic::new(
                        DiagnosticCode::Subsumed,
                        format!(
                            "{} `{}` in behavior '{}' is implied by `{}`",
                            label, current, behavior.name, earlier
                        ),
                        location.clone(),
                    )
                    .with_related(format!("`{}` already guarantees this", earlier), earlier_location)
                    .with_help("remove the weaker condition")
                    .with_tag("unnecessary"),
                );
            }
        }

        if let Some(replacement) = simplify_boolean_comparison(expr) {
            let text = replacement.to_string();
            let target = ctx.location_of(expr.span().or(stmt.span()));
            out.push(
                Diagnostic::new(
                    DiagnosticCode::RedundantBooleanComparison,
                    format!("redundant comparison with a boolean literal in `{}`", expr),
                    target.clone(),
                )
                .with_help(format!("simplify to `{}`", text))
                .with_tag("unnecessary")
                .with_fix(Fix::replace_expression(
                    format!("Replace with `{}`", text),
                    target,
                    text,
                )),
            );
        }
    }
}

/// `X == true` -> `X`, `X == false` -> `!X`, `X != false` -> `X`,
/// `X != true` -> `!X`, with the literal on either side.
fn simplify_boolean_comparison(expr: &Expr) -> Option<Expr> {
    let Expr::Binary(bin) = expr else {
        return None;
    };
    let (operand, literal) = match (bin.left.as_bool(), bin.right.as_bool()) {
        (None, Some(b)) => (&*bin.left, b),
        (Some(b), None) => (&*bin.right, b),
        _ => return None,
    };
    let keep = match bin.operator {
        BinaryOp::Eq => literal,
        BinaryOp::Ne => !literal,
        _ => return None,
    };
    if keep {
        Some(operand.clone())
    } else {
        Some(Expr::not(operand.clone()))
    }
}
