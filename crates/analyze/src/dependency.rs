//! Dependency graph analysis (E0360-E0363).
//!
//! Builds three directed graphs over a domain:
//!
//! - entities: `A -> B` when a field of `A` has type `B`, `List<B>` or `B?`
//! - behaviors: `A -> B` when a postcondition or temporal clause of `A`
//!   triggers, emits or dispatches `B`, or calls `B.execute(..)`
//! - types: `A -> B` when the definition of `A` mentions `B` anywhere
//!
//! Every cycle is reported once regardless of where the search enters it.
//! Entity chains deeper than the configured threshold are reported as well.

use std::collections::{BTreeSet, HashMap, HashSet};

use isl_core::{Behavior, Diagnostic, DiagnosticCode, Domain, Expr, LiteralValue, Span};

use crate::pass::{AnalysisPass, PassContext, DEFAULT_MAX_NESTING_DEPTH};

const DISPATCH_FUNCTIONS: &[&str] = &["trigger", "emit", "dispatch"];

pub struct CyclicDependencyPass {
    max_nesting_depth: usize,
}

impl CyclicDependencyPass {
    pub fn new(max_nesting_depth: usize) -> Self {
        CyclicDependencyPass { max_nesting_depth }
    }
}

impl Default for CyclicDependencyPass {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_NESTING_DEPTH)
    }
}

impl AnalysisPass for CyclicDependencyPass {
    fn id(&self) -> &'static str {
        "cyclic-dependencies"
    }

    fn name(&self) -> &'static str {
        "Cyclic Dependencies"
    }

    fn description(&self) -> &'static str {
        "Detects cycles between entities, behaviors and types, and deeply nested entity chains"
    }

    fn priority(&self) -> i32 {
        40
    }

    fn run(&self, ctx: &PassContext<'_>) -> Vec<Diagnostic> {
        let domain = ctx.ast;
        let mut diagnostics = Vec::new();

        let entities = entity_graph(domain);
        for cycle in entities.cycles() {
            let span = domain.entity(cycle[0]).and_then(|e| e.span.as_ref());
            diagnostics.push(cycle_diagnostic(ctx, CycleKind::Entity, &cycle, span));
        }
        for (name, depth) in entities.depths() {
            if depth >= self.max_nesting_depth {
                let span = domain.entity(name).and_then(|e| e.span.as_ref());
                diagnostics.push(
                    Diagnostic::new(
                        DiagnosticCode::DeepNesting,
                        format!(
                            "entity '{}' nests {} levels of entity references",
                            name, depth
                        ),
                        ctx.location_of(span),
                    )
                    .with_note(format!("the threshold is {}", self.max_nesting_depth))
                    .with_help("flatten the model or reference nested entities by id"),
                );
            }
        }

        for cycle in behavior_graph(domain).cycles() {
            let span = domain.behavior(cycle[0]).and_then(|b| b.span.as_ref());
            diagnostics.push(cycle_diagnostic(ctx, CycleKind::Behavior, &cycle, span));
        }

        for cycle in type_graph(domain).cycles() {
            let span = domain.type_declaration(cycle[0]).and_then(|t| t.span.as_ref());
            diagnostics.push(cycle_diagnostic(ctx, CycleKind::Type, &cycle, span));
        }

        diagnostics
    }
}

#[derive(Debug, Clone, Copy)]
enum CycleKind {
    Entity,
    Behavior,
    Type,
}

fn cycle_diagnostic(ctx: &PassContext<'_>, kind: CycleKind, cycle: &[&str], span: Option<&Span>) -> Diagnostic {
    let mut path: Vec<&str> = cycle.to_vec();
    path.push(cycle[0]);
    let rendered = path.join(" → ");

    let (code, noun, help) = match kind {
        CycleKind::Entity => (
            DiagnosticCode::EntityCycle,
            "entities",
            "break the cycle with an id reference if the model is serialized",
        ),
        CycleKind::Behavior => (
            DiagnosticCode::BehaviorCycle,
            "behaviors",
            "make sure the dispatch chain has a terminating condition",
        ),
        CycleKind::Type => (
            DiagnosticCode::TypeCycle,
            "types",
            "introduce an optional or list wrapper, or restructure the types",
        ),
    };

    Diagnostic::new(
        code,
        format!("circular dependency between {}: {}", noun, cycle.join(", ")),
        ctx.location_of(span),
    )
    .with_note(format!("cycle: {}", rendered))
    .with_help(help)
}

// ──────────────────────────────────────────────
// Graph
// ──────────────────────────────────────────────

/// A directed graph over declaration names, nodes kept in declaration order.
#[derive(Debug, Default)]
struct DependencyGraph<'a> {
    order: Vec<&'a str>,
    edges: HashMap<&'a str, BTreeSet<&'a str>>,
}

impl<'a> DependencyGraph<'a> {
    fn add_node(&mut self, node: &'a str) {
        if !self.edges.contains_key(node) {
            self.order.push(node);
            self.edges.insert(node, BTreeSet::new());
        }
    }

    fn add_edge(&mut self, from: &'a str, to: &'a str) {
        self.add_node(from);
        self.add_node(to);
        if let Some(targets) = self.edges.get_mut(from) {
            targets.insert(to);
        }
    }

    fn successors(&self, node: &'a str) -> impl Iterator<Item = &'a str> + '_ {
        self.edges.get(node).into_iter().flat_map(|s| s.iter().copied())
    }

    /// Unique cycles, each rotated to start at its smallest node.
    ///
    /// Depth-first search where every node is expanded at most once. When a
    /// successor is already on the current path, the path suffix starting at
    /// that successor is recorded.
    fn cycles(&self) -> Vec<Vec<&'a str>> {
        let mut visited: HashSet<&'a str> = HashSet::new();
        let mut on_stack: HashSet<&'a str> = HashSet::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut cycles = Vec::new();

        for &start in &self.order {
            if visited.contains(start) {
                continue;
            }
            let mut path: Vec<&'a str> = vec![start];
            let mut frames: Vec<Vec<&'a str>> = vec![self.successors(start).collect()];
            visited.insert(start);
            on_stack.insert(start);

            while let Some(frame) = frames.last_mut() {
                let Some(next) = frame.pop() else {
                    frames.pop();
                    if let Some(done) = path.pop() {
                        on_stack.remove(done);
                    }
                    continue;
                };
                if on_stack.contains(next) {
                    if let Some(idx) = path.iter().position(|n| *n == next) {
                        let cycle = canonical_rotation(&path[idx..]);
                        if seen.insert(cycle.join("->")) {
                            cycles.push(cycle);
                        }
                    }
                } else if visited.insert(next) {
                    on_stack.insert(next);
                    path.push(next);
                    frames.push(self.successors(next).collect());
                }
            }
        }
        cycles
    }

    /// Longest outgoing chain length for every node, in declaration order.
    ///
    /// A successor still on the search stack counts as a leaf (depth 0, so
    /// the edge to it adds 1) and cycles do not inflate depth.
    fn depths(&self) -> Vec<(&'a str, usize)> {
        let mut memo: HashMap<&'a str, usize> = HashMap::new();
        for &node in &self.order {
            self.depth_of(node, &mut memo);
        }
        self.order.iter().map(|n| (*n, memo.get(n).copied().unwrap_or(0))).collect()
    }

    fn depth_of(&self, root: &'a str, memo: &mut HashMap<&'a str, usize>) {
        if memo.contains_key(root) {
            return;
        }
        let mut on_stack: HashSet<&'a str> = HashSet::new();
        // (node, pending successors, best depth so far)
        let mut frames: Vec<(&'a str, Vec<&'a str>, usize)> = Vec::new();
        on_stack.insert(root);
        frames.push((root, self.successors(root).collect(), 0));

        loop {
            let Some((_, pending, best)) = frames.last_mut() else {
                break;
            };
            if let Some(next) = pending.pop() {
                if on_stack.contains(next) {
                    *best = (*best).max(1);
                    continue;
                }
                if let Some(&known) = memo.get(next) {
                    *best = (*best).max(known + 1);
                    continue;
                }
                on_stack.insert(next);
                frames.push((next, self.successors(next).collect(), 0));
                continue;
            }
            if let Some((node, _, best)) = frames.pop() {
                on_stack.remove(node);
                memo.insert(node, best);
                if let Some((_, _, parent_best)) = frames.last_mut() {
                    *parent_best = (*parent_best).max(best + 1);
                }
            }
        }
    }
}

fn canonical_rotation<'a>(cycle: &[&'a str]) -> Vec<&'a str> {
    let start = cycle
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.cmp(b.1))
        .map(|(i, _)| i)
        .unwrap_or(0);
    cycle[start..].iter().chain(cycle[..start].iter()).copied().collect()
}

// ──────────────────────────────────────────────
// Graph construction
// ──────────────────────────────────────────────

fn entity_graph(domain: &Domain) -> DependencyGraph<'_> {
    let declared: HashSet<&str> = domain.entities.iter().map(|e| e.name.as_str()).collect();
    let mut graph = DependencyGraph::default();
    for entity in &domain.entities {
        graph.add_node(&entity.name);
        for field in &entity.fields {
            if let Some(target) = field.type_expr.referenced_name() {
                if declared.contains(target) {
                    graph.add_edge(&entity.name, target);
                }
            }
        }
    }
    graph
}

fn type_graph(domain: &Domain) -> DependencyGraph<'_> {
    let declared: HashSet<&str> = domain.types.iter().map(|t| t.name.as_str()).collect();
    let mut graph = DependencyGraph::default();
    for decl in &domain.types {
        graph.add_node(&decl.name);
        let mut refs = Vec::new();
        decl.definition.collect_references(&mut refs);
        for target in refs {
            if declared.contains(target) {
                graph.add_edge(&decl.name, target);
            }
        }
    }
    graph
}

fn behavior_graph(domain: &Domain) -> DependencyGraph<'_> {
    let declared: HashSet<&str> = domain.behaviors.iter().map(|b| b.name.as_str()).collect();
    let mut graph = DependencyGraph::default();
    for behavior in &domain.behaviors {
        graph.add_node(&behavior.name);
        for target in dispatched_behaviors(behavior) {
            // Edges borrow the declared name, not the collected string.
            if let Some(&name) = declared.get(target.as_str()) {
                graph.add_edge(&behavior.name, name);
            }
        }
    }
    graph
}

/// Names of behaviors a behavior's postconditions and temporal clauses invoke.
fn dispatched_behaviors(behavior: &Behavior) -> BTreeSet<String> {
    let mut targets = BTreeSet::new();
    let mut visit = |expr: &Expr| {
        if let Some(target) = dispatch_target(expr) {
            targets.insert(target);
        }
    };
    for post in &behavior.postconditions {
        for stmt in post.predicates.statements() {
            stmt.expression.walk(&mut visit);
        }
    }
    for req in &behavior.temporal.requirements {
        req.condition.walk(&mut visit);
    }
    targets
}

fn dispatch_target(expr: &Expr) -> Option<String> {
    let Expr::Call(call) = expr else {
        return None;
    };
    match &*call.callee {
        Expr::Identifier(id) if DISPATCH_FUNCTIONS.contains(&id.name.as_str()) => {
            match call.arguments.first()? {
                Expr::Identifier(arg) => Some(arg.name.clone()),
                Expr::Literal(lit) => match &lit.value {
                    LiteralValue::String(s) => Some(s.clone()),
                    _ => None,
                },
                _ => None,
            }
        }
        Expr::Member(m) if m.property == "execute" => m.object.path(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isl_core::{ConditionBlock, Entity, Field, PostconditionBlock, TypeDeclaration, TypeExpr};

    fn entity(name: &str, refs: &[&str]) -> Entity {
        Entity {
            name: name.to_string(),
            fields: refs
                .iter()
                .map(|r| Field::new(r.to_lowercase(), TypeExpr::reference(*r)))
                .collect(),
            span: Some(Span::line("m.isl", 1)),
        }
    }

    fn domain_with_entities(entities: Vec<Entity>) -> Domain {
        let mut domain = Domain::new("Model");
        domain.entities = entities;
        domain
    }

    fn run(domain: &Domain) -> Vec<Diagnostic> {
        CyclicDependencyPass::default().run(&PassContext::new(domain, "m.isl"))
    }

    fn of_code(ds: &[Diagnostic], code: DiagnosticCode) -> Vec<&Diagnostic> {
        ds.iter().filter(|d| d.code == code).collect()
    }

    #[test]
    fn three_cycle_is_reported_once_from_any_entry() {
        let orders = [["A", "B", "C"], ["B", "C", "A"], ["C", "A", "B"]];
        for order in orders {
            let next = |n: &str| match n {
                "A" => "B",
                "B" => "C",
                _ => "A",
            };
            let domain = domain_with_entities(order.iter().map(|n| entity(n, &[next(n)])).collect());
            let ds = run(&domain);
            let cycles = of_code(&ds, DiagnosticCode::EntityCycle);
            assert_eq!(cycles.len(), 1, "order {:?}", order);
            assert!(cycles[0].message.ends_with("A, B, C"));
            assert_eq!(cycles[0].notes[0], "cycle: A → B → C → A");
        }
    }

    #[test]
    fn self_reference_is_a_single_node_cycle() {
        let domain = domain_with_entities(vec![entity("Node", &["Node"])]);
        let graph = entity_graph(&domain);
        assert_eq!(graph.cycles(), vec![vec!["Node"]]);
        let ds = run(&domain);
        assert_eq!(of_code(&ds, DiagnosticCode::EntityCycle).len(), 1);
    }

    #[test]
    fn list_and_optional_fields_are_edges() {
        let mut a = entity("Order", &[]);
        a.fields.push(Field::new("lines", TypeExpr::list(TypeExpr::reference("Line"))));
        let mut b = entity("Line", &[]);
        b.fields.push(Field::new("order", TypeExpr::optional(TypeExpr::reference("Order"))));
        let ds = run(&domain_with_entities(vec![a, b]));
        assert_eq!(of_code(&ds, DiagnosticCode::EntityCycle).len(), 1);
    }

    #[test]
    fn chain_of_six_is_deep() {
        let names = ["E1", "E2", "E3", "E4", "E5", "E6"];
        let entities = names
            .iter()
            .enumerate()
            .map(|(i, n)| entity(n, names.get(i + 1).map(|x| vec![*x]).unwrap_or_default().as_slice()))
            .collect();
        let ds = run(&domain_with_entities(entities));
        let deep = of_code(&ds, DiagnosticCode::DeepNesting);
        assert_eq!(deep.len(), 1);
        assert!(deep[0].message.contains("'E1'"));
        assert!(of_code(&ds, DiagnosticCode::EntityCycle).is_empty());
    }

    #[test]
    fn chain_of_four_is_fine() {
        let names = ["E1", "E2", "E3", "E4"];
        let entities = names
            .iter()
            .enumerate()
            .map(|(i, n)| entity(n, names.get(i + 1).map(|x| vec![*x]).unwrap_or_default().as_slice()))
            .collect();
        assert!(run(&domain_with_entities(entities)).is_empty());
    }

    #[test]
    fn cycles_do_not_inflate_depth() {
        let domain = domain_with_entities(vec![entity("A", &["B"]), entity("B", &["A"])]);
        assert_eq!(entity_graph(&domain).depths(), vec![("A", 2), ("B", 1)]);

        let looped = domain_with_entities(vec![entity("A", &["A"])]);
        assert_eq!(entity_graph(&looped).depths(), vec![("A", 1)]);
    }

    #[test]
    fn five_entity_cycle_is_deep() {
        let domain = domain_with_entities(vec![
            entity("E1", &["E2"]),
            entity("E2", &["E3"]),
            entity("E3", &["E4"]),
            entity("E4", &["E5"]),
            entity("E5", &["E1"]),
        ]);
        assert_eq!(
            entity_graph(&domain).depths(),
            vec![("E1", 5), ("E2", 4), ("E3", 3), ("E4", 2), ("E5", 1)]
        );
        let ds = run(&domain);
        let deep = of_code(&ds, DiagnosticCode::DeepNesting);
        assert_eq!(deep.len(), 1);
        assert!(deep[0].message.contains("'E1'"));
        assert_eq!(of_code(&ds, DiagnosticCode::EntityCycle).len(), 1);
    }

    #[test]
    fn configurable_threshold() {
        let domain = domain_with_entities(vec![entity("A", &["B"]), entity("B", &["C"]), entity("C", &[])]);
        let ds = CyclicDependencyPass::new(2).run(&PassContext::new(&domain, "m.isl"));
        assert_eq!(of_code(&ds, DiagnosticCode::DeepNesting).len(), 1);
    }

    fn dispatching(name: &str, call: Expr) -> Behavior {
        let mut behavior = Behavior::new(name);
        behavior.postconditions = vec![PostconditionBlock::success(ConditionBlock::from_exprs(vec![call]))];
        behavior
    }

    #[test]
    fn behavior_dispatch_cycle_is_a_warning() {
        let mut domain = Domain::new("Flow");
        domain.behaviors = vec![
            dispatching("Ship", Expr::call(Expr::ident("trigger"), vec![Expr::ident("Bill")])),
            dispatching("Bill", Expr::call(Expr::path_expr("Ship.execute"), vec![])),
            dispatching("Audit", Expr::call(Expr::ident("emit"), vec![Expr::string("Unknown")])),
        ];
        let ds = run(&domain);
        let cycles = of_code(&ds, DiagnosticCode::BehaviorCycle);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].severity, isl_core::Severity::Warning);
        assert_eq!(cycles[0].notes[0], "cycle: Bill → Ship → Bill");
    }

    #[test]
    fn type_cycle_through_nested_references() {
        let mut domain = Domain::new("Types");
        domain.types = vec![
            TypeDeclaration {
                name: "Tree".to_string(),
                definition: TypeExpr::Struct {
                    fields: vec![Field::new("children", TypeExpr::list(TypeExpr::reference("Forest")))],
                },
                span: Some(Span::line("m.isl", 4)),
            },
            TypeDeclaration {
                name: "Forest".to_string(),
                definition: TypeExpr::Generic {
                    name: "Set".to_string(),
                    arguments: vec![TypeExpr::reference("Tree")],
                },
                span: Some(Span::line("m.isl", 9)),
            },
        ];
        let ds = run(&domain);
        let cycles = of_code(&ds, DiagnosticCode::TypeCycle);
        assert_eq!(cycles.len(), 1);
        // Forest sorts first, so the diagnostic points at its declaration
        assert_eq!(cycles[0].location.line, 9);
    }

    #[test]
    fn canonical_rotation_starts_at_smallest() {
        assert_eq!(canonical_rotation(&["C", "A", "B"]), vec!["A", "B", "C"]);
        assert_eq!(canonical_rotation(&["X"]), vec!["X"]);
    }
}
