//! Reference collection and the unused input/output scan.

use std::collections::BTreeSet;

use isl_core::{Behavior, Diagnostic, DiagnosticCode, Expr, TypeExpr};

use crate::pass::PassContext;

/// Inputs supplied by the runtime rather than the caller; never reported as unused.
pub static CONTEXT_INPUTS: &[&str] = &[
    "context",
    "ctx",
    "request",
    "req",
    "ip",
    "ip_address",
    "user_agent",
    "timestamp",
    "correlation_id",
    "trace_id",
    "session_id",
];

/// Every identifier name and member path referenced by any clause of `behavior`.
///
/// Members whose object is not itself a path (`lookup(id).status`) contribute
/// their bare property name.
pub fn referenced_paths(behavior: &Behavior) -> BTreeSet<String> {
    let mut paths = BTreeSet::new();
    let mut visit = |expr: &Expr| match expr {
        Expr::Identifier(id) => {
            paths.insert(id.name.clone());
        }
        Expr::Member(m) => match expr.path() {
            Some(path) => {
                paths.insert(path);
            }
            None => {
                paths.insert(m.property.clone());
            }
        },
        _ => {}
    };

    for stmt in behavior.preconditions.statements() {
        stmt.expression.walk(&mut visit);
    }
    for post in &behavior.postconditions {
        for stmt in post.predicates.statements() {
            stmt.expression.walk(&mut visit);
        }
    }
    for stmt in behavior.invariants.statements() {
        stmt.expression.walk(&mut visit);
    }
    for req in &behavior.temporal.requirements {
        req.condition.walk(&mut visit);
    }
    for req in &behavior.security.requirements {
        req.expression.walk(&mut visit);
    }
    paths
}

fn is_referenced(paths: &BTreeSet<String>, name: &str, qualifier: &str) -> bool {
    let suffix = format!(".{}", name);
    paths.contains(name)
        || paths.contains(&format!("{}.{}", qualifier, name))
        || paths.iter().any(|p| p.ends_with(&suffix))
}

pub(super) fn check_unused(ctx: &PassContext<'_>, behavior: &Behavior, out: &mut Vec<Diagnostic>) {
    let paths = referenced_paths(behavior);

    for field in &behavior.input.fields {
        if CONTEXT_INPUTS.contains(&field.name.as_str()) || is_referenced(&paths, &field.name, "input") {
            continue;
        }
        let location = ctx.location_of(field.span.as_ref().or(behavior.span.as_ref()));
        out.push(
            Diagnostic::new(
                DiagnosticCode::UnusedInput,
                format!(
                    "input '{}' of behavior '{}' is never referenced",
                    field.name, behavior.name
                ),
                location,
            )
            .with_help(format!(
                "reference `input.{}` in a contract clause or remove the field",
                field.name
            ))
            .with_tag("unnecessary"),
        );
    }

    // Only inline struct outputs have fields to check; named types are shared.
    let Some(TypeExpr::Struct { fields }) = &behavior.output.success else {
        return;
    };
    for field in fields {
        if paths.contains(&field.name) || paths.contains(&format!("result.{}", field.name)) {
            continue;
        }
        let location = ctx.location_of(field.span.as_ref().or(behavior.span.as_ref()));
        out.push(
            Diagnostic::new(
                DiagnosticCode::UnusedOutput,
                format!(
                    "output field '{}' of behavior '{}' is never constrained",
                    field.name, behavior.name
                ),
                location,
            )
            .with_help(format!(
                "add a postcondition on `result.{}` or drop it from the output",
                field.name
            ))
            .with_tag("unnecessary"),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isl_core::{
        BinaryOp, ConditionBlock, Domain, Field, PostconditionBlock, SecurityKind,
        SecurityRequirement, Span,
    };

    fn behavior_with_inputs(names: &[&str]) -> Behavior {
        let mut behavior = Behavior::new("Register");
        behavior.span = Some(Span::line("r.isl", 3));
        behavior.input.fields = names
            .iter()
            .map(|n| Field::new(*n, TypeExpr::primitive("String")))
            .collect();
        behavior
    }

    fn run(behavior: &Behavior) -> Vec<Diagnostic> {
        let domain = Domain::new("Users");
        let ctx = PassContext::new(&domain, "r.isl");
        let mut out = Vec::new();
        check_unused(&ctx, behavior, &mut out);
        out
    }

    #[test]
    fn unreferenced_input_is_reported() {
        let behavior = behavior_with_inputs(&["unused"]);
        let ds = run(&behavior);
        assert_eq!(ds.len(), 1);
        assert_eq!(ds[0].code, DiagnosticCode::UnusedInput);
        assert_eq!(ds[0].location.line, 3);
        assert_eq!(ds[0].tags, vec!["unnecessary"]);
    }

    #[test]
    fn qualified_reference_counts_as_use() {
        let mut behavior = behavior_with_inputs(&["unused"]);
        behavior.preconditions = ConditionBlock::from_exprs(vec![Expr::binary(
            BinaryOp::Ne,
            Expr::path_expr("input.unused"),
            Expr::string(""),
        )]);
        assert!(run(&behavior).is_empty());
    }

    #[test]
    fn bare_and_suffix_references_count() {
        let mut behavior = behavior_with_inputs(&["email", "password"]);
        behavior.postconditions = vec![PostconditionBlock::success(ConditionBlock::from_exprs(vec![
            Expr::ident("email"),
            Expr::path_expr("User.lookup.password"),
        ]))];
        assert!(run(&behavior).is_empty());
    }

    #[test]
    fn security_and_call_arguments_are_scanned() {
        let mut behavior = behavior_with_inputs(&["token", "device"]);
        behavior.security.requirements = vec![SecurityRequirement {
            kind: SecurityKind::Requires,
            expression: Expr::call(Expr::ident("valid"), vec![Expr::path_expr("input.token")]),
            span: None,
        }];
        behavior.invariants = ConditionBlock::from_exprs(vec![Expr::member(
            Expr::call(Expr::ident("lookup"), vec![]),
            "device",
        )]);
        assert!(run(&behavior).is_empty());
    }

    #[test]
    fn context_inputs_are_exempt() {
        let behavior = behavior_with_inputs(&["ip_address", "trace_id", "ctx"]);
        assert!(run(&behavior).is_empty());
    }

    #[test]
    fn struct_output_fields_must_be_referenced() {
        let mut behavior = Behavior::new("Create");
        behavior.output.success = Some(TypeExpr::Struct {
            fields: vec![
                Field::new("id", TypeExpr::primitive("UUID")),
                Field::new("created_at", TypeExpr::primitive("Timestamp")),
            ],
        });
        behavior.postconditions = vec![PostconditionBlock::success(ConditionBlock::from_exprs(vec![
            Expr::binary(BinaryOp::Ne, Expr::path_expr("result.id"), Expr::lit(isl_core::LiteralValue::Null)),
        ]))];
        let ds = run(&behavior);
        assert_eq!(ds.len(), 1);
        assert_eq!(ds[0].code, DiagnosticCode::UnusedOutput);
        assert!(ds[0].message.contains("created_at"));
    }

    #[test]
    fn named_output_types_are_not_checked() {
        let mut behavior = Behavior::new("Get");
        behavior.output.success = Some(TypeExpr::reference("User"));
        assert!(run(&behavior).is_empty());
    }

    #[test]
    fn referenced_paths_cover_every_block() {
        let mut behavior = Behavior::new("B");
        behavior.preconditions = ConditionBlock::from_exprs(vec![Expr::ident("a")]);
        behavior.invariants = ConditionBlock::from_exprs(vec![Expr::path_expr("b.c")]);
        let paths = referenced_paths(&behavior);
        assert!(paths.contains("a"));
        assert!(paths.contains("b.c"));
        assert!(paths.contains("b"));
    }
}
