//! Security and temporal requirement validation.

use std::collections::BTreeSet;

use isl_core::{Behavior, Diagnostic, DiagnosticCode, Expr, SecurityKind, TemporalKind};

use crate::pass::PassContext;

/// Words that read like variables in requirement expressions but are not.
static KEYWORDS: &[&str] = &[
    "per", "and", "or", "not", "true", "false", "null", "input", "result", "old", "now", "this",
];

/// Names a rate limiter can key on without a matching input field.
static RATE_LIMIT_BUILTINS: &[&str] = &[
    "ip",
    "ip_address",
    "user",
    "user_id",
    "session",
    "session_id",
    "api_key",
    "token",
    "client",
    "client_id",
    "hour",
    "minute",
    "second",
];

/// Variable names referenced by an expression.
///
/// Call targets, quantifier-bound names and keywords are skipped;
/// `input.x` contributes `x`, any other member chain its root. With
/// `keyword_paths`, a chain rooted at a keyword such as `result.status`
/// contributes its full path instead of nothing.
fn referenced_variables(
    expr: &Expr,
    keyword_paths: bool,
    bound: &mut Vec<String>,
    out: &mut BTreeSet<String>,
) {
    match expr {
        Expr::Identifier(id) => {
            if !KEYWORDS.contains(&id.name.as_str()) && !bound.contains(&id.name) {
                out.insert(id.name.clone());
            }
        }
        Expr::Member(m) => match &*m.object {
            Expr::Identifier(root) if root.name == "input" => {
                out.insert(m.property.clone());
            }
            object => {
                let keyword_path = expr.path().filter(|path| {
                    keyword_paths
                        && path
                            .split('.')
                            .next()
                            .is_some_and(|root| KEYWORDS.contains(&root))
                });
                match keyword_path {
                    Some(path) => {
                        out.insert(path);
                    }
                    None => referenced_variables(object, keyword_paths, bound, out),
                }
            }
        },
        Expr::Call(call) => {
            if !matches!(&*call.callee, Expr::Identifier(_)) {
                referenced_variables(&call.callee, keyword_paths, bound, out);
            }
            for arg in &call.arguments {
                referenced_variables(arg, keyword_paths, bound, out);
            }
        }
        Expr::Quantifier(q) => {
            referenced_variables(&q.collection, keyword_paths, bound, out);
            bound.push(q.variable.clone());
            referenced_variables(&q.predicate, keyword_paths, bound, out);
            bound.pop();
        }
        other => {
            for child in other.children() {
                referenced_variables(child, keyword_paths, bound, out);
            }
        }
    }
}

/// Names a rate limit can be keyed on.
fn variables_of(expr: &Expr) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    referenced_variables(expr, false, &mut Vec::new(), &mut out);
    out
}

/// State a temporal condition depends on, including `result.*` and `old.*` paths.
fn state_of(expr: &Expr) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    referenced_variables(expr, true, &mut Vec::new(), &mut out);
    out
}

pub(super) fn check_security(ctx: &PassContext<'_>, behavior: &Behavior, out: &mut Vec<Diagnostic>) {
    for req in &behavior.security.requirements {
        if req.kind != SecurityKind::RateLimit {
            continue;
        }
        let location = ctx.location_of(req.span.as_ref().or(req.expression.span()));
        for name in variables_of(&req.expression) {
            if RATE_LIMIT_BUILTINS.contains(&name.as_str())
                || behavior.input.fields.iter().any(|f| f.name == name)
            {
                continue;
            }
            out.push(
                Diagnostic::new(
                    DiagnosticCode::SecurityMissingInputRef,
                    format!(
                        "rate limit in behavior '{}' is keyed on '{}', which is not an input",
                        behavior.name, name
                    ),
                    location.clone(),
                )
                .with_help(format!(
                    "declare '{}' as an input field or key the limit on a built-in such as `ip`",
                    name
                )),
            );
        }
    }
}

pub(super) fn check_temporal(ctx: &PassContext<'_>, behavior: &Behavior, out: &mut Vec<Diagnostic>) {
    for req in &behavior.temporal.requirements {
        let location = ctx.location_of(req.span.as_ref().or(req.condition.span()));

        if req.kind == TemporalKind::Within && req.duration.is_none() {
            out.push(
                Diagnostic::new(
                    DiagnosticCode::TemporalMissingDuration,
                    format!(
                        "`within` requirement in behavior '{}' has no duration",
                        behavior.name
                    ),
                    location.clone(),
                )
                .with_help("give the bound explicitly, e.g. `within 500ms`"),
            );
        }

        let simple = matches!(
            req.condition,
            Expr::Identifier(_) | Expr::Member(_) | Expr::Call(_)
        );
        if !simple && state_of(&req.condition).is_empty() {
            out.push(
                Diagnostic::new(
                    DiagnosticCode::TemporalConstantCondition,
                    format!(
                        "temporal condition `{}` in behavior '{}' does not depend on any variable",
                        req.condition, behavior.name
                    ),
                    location,
                )
                .with_note("its truth value never changes, so the timing bound is meaningless"),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isl_core::{
        BinaryOp, Domain, DurationLiteral, Field, SecurityRequirement, Span, TemporalRequirement,
        TypeExpr,
    };

    fn run(behavior: &Behavior) -> Vec<Diagnostic> {
        let domain = Domain::new("Api");
        let ctx = PassContext::new(&domain, "api.isl");
        let mut out = Vec::new();
        check_security(&ctx, behavior, &mut out);
        check_temporal(&ctx, behavior, &mut out);
        out
    }

    fn rate_limit(expr: Expr) -> SecurityRequirement {
        SecurityRequirement {
            kind: SecurityKind::RateLimit,
            expression: expr,
            span: Some(Span::line("api.isl", 12)),
        }
    }

    fn temporal(kind: TemporalKind, duration: Option<f64>, condition: Expr) -> TemporalRequirement {
        TemporalRequirement {
            kind,
            duration: duration.map(|value| DurationLiteral {
                value,
                unit: "ms".to_string(),
            }),
            percentile: None,
            condition,
            span: None,
        }
    }

    #[test]
    fn rate_limit_on_undeclared_name_is_flagged() {
        let mut behavior = Behavior::new("Login");
        behavior.input.fields = vec![Field::new("email", TypeExpr::primitive("String"))];
        // 10 per email, per tenant
        behavior.security.requirements = vec![rate_limit(Expr::and(
            Expr::binary(BinaryOp::Div, Expr::number(10.0), Expr::path_expr("input.email")),
            Expr::ident("tenant"),
        ))];
        let ds = run(&behavior);
        assert_eq!(ds.len(), 1);
        assert_eq!(ds[0].code, DiagnosticCode::SecurityMissingInputRef);
        assert!(ds[0].message.contains("tenant"));
        assert_eq!(ds[0].location.line, 12);
    }

    #[test]
    fn builtins_keywords_and_call_targets_are_skipped() {
        let mut behavior = Behavior::new("Login");
        behavior.security.requirements = vec![
            rate_limit(Expr::and(Expr::ident("ip"), Expr::ident("per"))),
            rate_limit(Expr::call(Expr::ident("bucket"), vec![Expr::ident("user_id")])),
            SecurityRequirement {
                kind: SecurityKind::Requires,
                expression: Expr::ident("anything"),
                span: None,
            },
        ];
        assert!(run(&behavior).is_empty());
    }

    #[test]
    fn within_without_duration_is_an_error() {
        let mut behavior = Behavior::new("Pay");
        behavior.temporal.requirements = vec![
            temporal(TemporalKind::Within, None, Expr::path_expr("payment.settled")),
            temporal(TemporalKind::Within, Some(200.0), Expr::path_expr("payment.settled")),
            temporal(TemporalKind::Eventually, None, Expr::path_expr("audit.logged")),
        ];
        let ds = run(&behavior);
        assert_eq!(ds.len(), 1);
        assert_eq!(ds[0].code, DiagnosticCode::TemporalMissingDuration);
        assert_eq!(ds[0].location, Span::fallback("api.isl"));
    }

    #[test]
    fn constant_temporal_condition_is_a_hint() {
        let mut behavior = Behavior::new("Pay");
        behavior.temporal.requirements = vec![
            temporal(TemporalKind::Always, None, Expr::boolean(true)),
            temporal(
                TemporalKind::Eventually,
                None,
                Expr::binary(BinaryOp::Gt, Expr::number(2.0), Expr::number(1.0)),
            ),
            temporal(TemporalKind::Eventually, None, Expr::call(Expr::ident("now"), vec![])),
        ];
        let ds = run(&behavior);
        assert_eq!(ds.len(), 2);
        assert!(ds.iter().all(|d| d.code == DiagnosticCode::TemporalConstantCondition));
        assert_eq!(ds[0].severity, isl_core::Severity::Hint);
    }

    #[test]
    fn result_member_counts_as_state() {
        let mut behavior = Behavior::new("Ship");
        behavior.temporal.requirements = vec![temporal(
            TemporalKind::Eventually,
            None,
            Expr::binary(BinaryOp::Eq, Expr::path_expr("result.status"), Expr::string("done")),
        )];
        assert!(run(&behavior).is_empty());
        assert_eq!(
            state_of(&behavior.temporal.requirements[0].condition).into_iter().collect::<Vec<_>>(),
            vec!["result.status"]
        );
    }

    #[test]
    fn rate_limit_ignores_result_paths() {
        let mut behavior = Behavior::new("Ship");
        behavior.security.requirements = vec![rate_limit(Expr::path_expr("result.status"))];
        assert!(run(&behavior).is_empty());
    }

    #[test]
    fn quantifier_variables_are_bound() {
        let expr = Expr::Quantifier(isl_core::QuantifierExpr {
            quantifier: isl_core::Quantifier::All,
            variable: "item".to_string(),
            collection: Box::new(Expr::path_expr("input.items")),
            predicate: Box::new(Expr::path_expr("item.shipped")),
            span: None,
        });
        let vars: Vec<String> = variables_of(&expr).into_iter().collect();
        assert_eq!(vars, vec!["items"]);
    }
}
