//! Slicing: predecessor closure of the targets plus cycle resolution.
//!
//! The closure collects everything the target functions need to compile.
//! Cycles inside the closure are then broken per kind-pair policy:
//!
//! - mutually recursive functions get a forward declaration attached to the
//!   first function of the cycle and lose the dependency edge it replaces;
//! - same-kind struct/macro/typedef cycles just lose an edge (C forward
//!   reference rules cover incomplete types);
//! - a typedef↔struct pair loses the edge out of the typedef, so the struct
//!   is emitted first and the typedef follows;
//! - anything else is a bug in the meta-graph policy and aborts with the
//!   cycle path.

use std::collections::BTreeSet;

use crate::cycle_detector::{find_cycle, CycleDetector};
use crate::debug_log;
use crate::error::{Result, SliceError};
use crate::graph::DepGraph;
use crate::parser::functions;
use crate::types::EntityKind;

/// Extract the slice for the target functions from the full graph.
pub fn slice(graph: &DepGraph, targets: &[String]) -> Result<DepGraph> {
    if targets.is_empty() {
        return Err(SliceError::EmptyTargets);
    }

    // Step 1: resolve target names in the module function index
    let mut roots = Vec::new();
    for name in targets {
        match graph.module_function(name) {
            Some(idx) => roots.push(idx),
            None => {
                return Err(SliceError::UnknownTarget { name: name.clone() });
            }
        }
    }

    // Step 2: predecessor closure — everything the targets transitively need
    let keep = predecessor_closure(graph, &roots);

    // Step 3: induced subgraph, self-loops dropped
    let mut sub = DepGraph::default();
    for &idx in &keep {
        sub.ensure_vertex(graph.entity(idx));
    }
    for &idx in &keep {
        let s = sub.index_of(graph.entity(idx).id)?;
        for &succ in graph.succs_of(idx) {
            if succ != idx && keep.contains(&succ) {
                let t = sub.index_of(graph.entity(succ).id)?;
                sub.add_edge(s, t);
            }
        }
    }

    // Step 4: cycle resolution
    resolve_cycles(&mut sub)?;
    Ok(sub)
}

/// All vertices reachable from the roots by walking dependency edges
/// backwards (including the roots).
pub fn predecessor_closure(graph: &DepGraph, roots: &[usize]) -> BTreeSet<usize> {
    let mut keep: BTreeSet<usize> = BTreeSet::new();
    let mut queue: Vec<usize> = roots.to_vec();
    while let Some(idx) = queue.pop() {
        if !keep.insert(idx) {
            continue;
        }
        for &pred in graph.preds_of(idx) {
            if !keep.contains(&pred) {
                queue.push(pred);
            }
        }
    }
    keep
}

/// Break every cycle in the induced graph per the kind-pair policy.
fn resolve_cycles(graph: &mut DepGraph) -> Result<()> {
    loop {
        let sccs = CycleDetector::new(graph).detect_cycles();
        if sccs.is_empty() {
            return Ok(());
        }
        for scc in &sccs {
            break_one_cycle(graph, scc)?;
        }
    }
}

fn break_one_cycle(graph: &mut DepGraph, scc: &[usize]) -> Result<()> {
    let cycle = find_cycle(graph, scc).ok_or_else(|| {
        SliceError::GraphInvariant("cycle search failed in a strongly connected component".into())
    })?;
    // cycle[0] references cycle[1]: the dependency edge runs cycle[1]→cycle[0]
    let v0 = cycle[0];
    let v1 = cycle[1];
    let kinds: BTreeSet<EntityKind> = cycle.iter().map(|&v| graph.entity(v).kind).collect();

    if kinds.len() == 1 && kinds.contains(&EntityKind::Function) {
        let callee = graph.entity(v1);
        let proto = functions::prototype_of(&callee.code).ok_or_else(|| {
            SliceError::GraphInvariant(format!(
                "cannot derive a forward declaration for function '{}'",
                callee.name
            ))
        })?;
        debug_log!(
            "breaking function cycle: forward-declaring '{}' before '{}'",
            graph.entity(v1).name,
            graph.entity(v0).name
        );
        graph.attach_forward_decl(v0, proto);
        graph.remove_edge(v1, v0);
        return Ok(());
    }

    if kinds.len() == 1
        && (kinds.contains(&EntityKind::Struct)
            || kinds.contains(&EntityKind::Macro)
            || kinds.contains(&EntityKind::Typedef))
    {
        debug_log!(
            "breaking same-kind cycle between '{}' and '{}'",
            graph.entity(v1).name,
            graph.entity(v0).name
        );
        graph.remove_edge(v1, v0);
        return Ok(());
    }

    if cycle.len() == 2
        && kinds.len() == 2
        && kinds.contains(&EntityKind::Typedef)
        && kinds.contains(&EntityKind::Struct)
    {
        let (td, st) = if graph.entity(v0).kind == EntityKind::Typedef {
            (v0, v1)
        } else {
            (v1, v0)
        };
        debug_log!(
            "breaking typedef/struct cycle: struct '{}' first",
            graph.entity(st).name
        );
        graph.remove_edge(td, st);
        return Ok(());
    }

    let mut path: Vec<&str> = cycle.iter().map(|&v| graph.entity(v).name.as_str()).collect();
    path.push(graph.entity(v0).name.as_str());
    Err(SliceError::UnresolvableCycle {
        path: path.join(" -> "),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::escrow;
    use crate::graph::build_graph;
    use crate::parser;
    use crate::types::{Area, EntitySet};

    fn module_graph(src: &str) -> DepGraph {
        let adapted = escrow::adapt_all(src);
        let module = parser::parse_module_area(&adapted.body, &adapted.escrows);
        let kernel = EntitySet::new(Area::Kernel);
        build_graph(&kernel, &module).unwrap()
    }

    #[test]
    fn test_empty_targets_rejected() {
        let graph = module_graph("int f(void) { return 0; }");
        match slice(&graph, &[]) {
            Err(SliceError::EmptyTargets) => {}
            other => panic!("expected EmptyTargets, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_unknown_target_named() {
        let graph = module_graph("int f(void) { return 0; }");
        match slice(&graph, &["missing".to_string()]) {
            Err(SliceError::UnknownTarget { name }) => assert_eq!(name, "missing"),
            other => panic!("expected UnknownTarget, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_closure_pulls_dependencies() {
        let src = "\
#define K 3
struct S { int x; };
int unused(void) { return 9; }
int f(struct S *p) { return p->x + K; }
";
        let graph = module_graph(src);
        let sliced = slice(&graph, &["f".to_string()]).unwrap();
        let names: Vec<&str> = sliced
            .vertices()
            .map(|(_, v)| v.entity.name.as_str())
            .collect();
        assert!(names.contains(&"f"));
        assert!(names.contains(&"S"));
        assert!(names.contains(&"K"));
        assert!(!names.contains(&"unused"));
    }

    #[test]
    fn test_closure_idempotent() {
        let src = "\
int a(void) { return b(); }
int b(void) { return c(); }
int c(void) { return 0; }
";
        let graph = module_graph(src);
        let roots = vec![graph.module_function("a").unwrap()];
        let once = predecessor_closure(&graph, &roots);
        let again = predecessor_closure(&graph, &once.iter().copied().collect::<Vec<_>>());
        assert_eq!(once, again);
    }

    #[test]
    fn test_self_loop_dropped() {
        let graph = module_graph("int fact(int n) { return n ? n * fact(n - 1) : 1; }");
        let sliced = slice(&graph, &["fact".to_string()]).unwrap();
        let idx = sliced.module_function("fact").unwrap();
        assert!(!sliced.has_edge(idx, idx));
    }

    #[test]
    fn test_mutual_recursion_forward_declared() {
        let src = "int a(void) { return b(); }\nint b(void) { return a(); }\n";
        let graph = module_graph(src);
        let sliced = slice(&graph, &["a".to_string()]).unwrap();
        let a = sliced.module_function("a").unwrap();
        let b = sliced.module_function("b").unwrap();
        // b's prototype rides on a; the b→a dependency edge is gone
        assert_eq!(sliced.vertex(a).forward_decls, vec!["int b(void);".to_string()]);
        assert!(!sliced.has_edge(b, a));
        assert!(sliced.has_edge(a, b));
    }

    #[test]
    fn test_typedef_struct_cycle_struct_first() {
        let src = "\
typedef struct N N;
struct N { N *next; };
int use_n(N *n) { return n ? 1 : 0; }
";
        let graph = module_graph(src);
        let sliced = slice(&graph, &["use_n".to_string()]).unwrap();
        let td = sliced
            .vertices()
            .find(|(_, v)| v.entity.kind == EntityKind::Typedef)
            .map(|(i, _)| i)
            .unwrap();
        let st = sliced
            .vertices()
            .find(|(_, v)| v.entity.kind == EntityKind::Struct)
            .map(|(i, _)| i)
            .unwrap();
        assert!(sliced.has_edge(st, td), "struct must precede typedef");
        assert!(!sliced.has_edge(td, st));
    }

    #[test]
    fn test_mixed_cycle_is_fatal() {
        // Hand-built function↔struct cycle (the meta-graph cannot produce
        // one, but a policy hole must abort, not loop)
        use crate::types::{Entity, EntityId};
        let mut graph = DepGraph::default();
        let f = Entity::new(
            EntityId(1 << 31),
            EntityKind::Function,
            Area::Module,
            "f".to_string(),
            "int f(void) { return 0; }".to_string(),
        );
        let s = Entity::new(
            EntityId((1 << 31) + 1),
            EntityKind::Struct,
            Area::Module,
            "S".to_string(),
            "struct S { int x; };".to_string(),
        );
        let fi = graph.ensure_vertex(&f);
        let si = graph.ensure_vertex(&s);
        graph.add_edge(fi, si);
        graph.add_edge(si, fi);
        match slice(&graph, &["f".to_string()]) {
            Err(SliceError::UnresolvableCycle { path }) => {
                assert!(path.contains("f"));
                assert!(path.contains("S"));
            }
            other => panic!("expected UnresolvableCycle, got {:?}", other.map(|_| ())),
        }
    }
}
