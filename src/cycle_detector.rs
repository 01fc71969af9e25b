//! Tarjan SCC decomposition over the dependency graph.
//!
//! The slicer runs this on the induced subgraph after closure; self-loops
//! are already dropped there, so every SCC of size > 1 is a genuine cycle
//! for the kind-pair policy to break.

use std::collections::BTreeSet;

use crate::graph::DepGraph;

pub struct CycleDetector<'a> {
    graph: &'a DepGraph,
    index: Vec<Option<usize>>,
    lowlink: Vec<usize>,
    on_stack: Vec<bool>,
    stack: Vec<usize>,
    sccs: Vec<Vec<usize>>,
    counter: usize,
}

impl<'a> CycleDetector<'a> {
    pub fn new(graph: &'a DepGraph) -> Self {
        let n = graph.len();
        CycleDetector {
            graph,
            index: vec![None; n],
            lowlink: vec![0; n],
            on_stack: vec![false; n],
            stack: Vec::new(),
            sccs: Vec::new(),
            counter: 0,
        }
    }

    /// Run Tarjan's algorithm and return the non-trivial SCCs, each sorted
    /// ascending, in ascending order of their smallest vertex.
    pub fn detect_cycles(mut self) -> Vec<Vec<usize>> {
        for v in 0..self.graph.len() {
            if self.index[v].is_none() {
                self.strongconnect(v);
            }
        }

        let mut cycles: Vec<Vec<usize>> = self
            .sccs
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .map(|mut scc| {
                scc.sort_unstable();
                scc
            })
            .collect();
        cycles.sort_by_key(|scc| scc[0]);
        cycles
    }

    /// Core Tarjan's algorithm, iterative so a deep kernel header chain
    /// cannot blow the call stack.
    fn strongconnect(&mut self, root: usize) {
        // (vertex, iterator position into its successor list)
        let mut frames: Vec<(usize, usize)> = Vec::new();

        self.index[root] = Some(self.counter);
        self.lowlink[root] = self.counter;
        self.counter += 1;
        self.stack.push(root);
        self.on_stack[root] = true;
        frames.push((root, 0));

        while !frames.is_empty() {
            let (v, pos) = {
                let frame = frames.last_mut().unwrap();
                let v = frame.0;
                let pos = frame.1;
                frame.1 += 1;
                (v, pos)
            };
            let succs: Vec<usize> = self.graph.succs_of(v).iter().copied().collect();
            if pos < succs.len() {
                let w = succs[pos];
                if self.index[w].is_none() {
                    self.index[w] = Some(self.counter);
                    self.lowlink[w] = self.counter;
                    self.counter += 1;
                    self.stack.push(w);
                    self.on_stack[w] = true;
                    frames.push((w, 0));
                } else if self.on_stack[w] {
                    self.lowlink[v] = self.lowlink[v].min(self.index[w].unwrap());
                }
            } else {
                frames.pop();
                if let Some(&(parent, _)) = frames.last() {
                    self.lowlink[parent] = self.lowlink[parent].min(self.lowlink[v]);
                }
                if self.lowlink[v] == self.index[v].unwrap() {
                    let mut scc = Vec::new();
                    loop {
                        let w = self.stack.pop().unwrap();
                        self.on_stack[w] = false;
                        scc.push(w);
                        if w == v {
                            break;
                        }
                    }
                    self.sccs.push(scc);
                }
            }
        }
    }
}

/// A concrete cycle through the smallest vertex of an SCC, in reference
/// order: element i's code references element i+1 (wrapping). Walks the
/// predecessor direction, smallest vertex first, so the result is the same
/// run-to-run.
pub fn find_cycle(graph: &DepGraph, scc: &[usize]) -> Option<Vec<usize>> {
    let in_scc: BTreeSet<usize> = scc.iter().copied().collect();
    let start = scc[0];
    let mut path = vec![start];
    let mut visited = BTreeSet::new();
    visited.insert(start);
    if walk(graph, &in_scc, start, start, &mut path, &mut visited) {
        Some(path)
    } else {
        None
    }
}

fn walk(
    graph: &DepGraph,
    in_scc: &BTreeSet<usize>,
    current: usize,
    start: usize,
    path: &mut Vec<usize>,
    visited: &mut BTreeSet<usize>,
) -> bool {
    for &p in graph.preds_of(current) {
        if !in_scc.contains(&p) {
            continue;
        }
        if p == start {
            return true;
        }
        if visited.insert(p) {
            path.push(p);
            if walk(graph, in_scc, p, start, path, visited) {
                return true;
            }
            path.pop();
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Area, Entity, EntityId, EntityKind};

    fn test_graph(n: u32, edges: &[(usize, usize)]) -> DepGraph {
        let mut graph = DepGraph::default();
        for i in 0..n {
            let entity = Entity::new(
                EntityId(i),
                EntityKind::Function,
                Area::Module,
                format!("f{}", i),
                format!("int f{}(void) {{ return 0; }}", i),
            );
            graph.ensure_vertex(&entity);
        }
        for &(s, t) in edges {
            graph.add_edge(s, t);
        }
        graph
    }

    #[test]
    fn test_simple_cycle() {
        let graph = test_graph(3, &[(0, 1), (1, 2), (2, 0)]);
        let cycles = CycleDetector::new(&graph).detect_cycles();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0], vec![0, 1, 2]);
    }

    #[test]
    fn test_no_cycle() {
        let graph = test_graph(4, &[(0, 1), (1, 2), (2, 3)]);
        let cycles = CycleDetector::new(&graph).detect_cycles();
        assert!(cycles.is_empty());
    }

    #[test]
    fn test_self_loop_not_reported() {
        let graph = test_graph(2, &[(0, 0), (0, 1)]);
        let cycles = CycleDetector::new(&graph).detect_cycles();
        assert!(cycles.is_empty());
    }

    #[test]
    fn test_multiple_cycles() {
        // 0 ↔ 1 and 2 → 3 → 4 → 2
        let graph = test_graph(5, &[(0, 1), (1, 0), (2, 3), (3, 4), (4, 2)]);
        let cycles = CycleDetector::new(&graph).detect_cycles();
        assert_eq!(cycles.len(), 2);
        assert_eq!(cycles[0], vec![0, 1]);
        assert_eq!(cycles[1], vec![2, 3, 4]);
    }

    #[test]
    fn test_find_cycle_two_vertices() {
        let graph = test_graph(2, &[(0, 1), (1, 0)]);
        let cycles = CycleDetector::new(&graph).detect_cycles();
        let cycle = find_cycle(&graph, &cycles[0]).unwrap();
        assert_eq!(cycle, vec![0, 1]);
    }

    #[test]
    fn test_find_cycle_reference_order() {
        // Dependency edges 0→1→2→0 mean: 0 references 2, 2 references 1,
        // 1 references 0. Starting at 0 the reference walk is [0, 2, 1].
        let graph = test_graph(3, &[(0, 1), (1, 2), (2, 0)]);
        let cycles = CycleDetector::new(&graph).detect_cycles();
        let cycle = find_cycle(&graph, &cycles[0]).unwrap();
        assert_eq!(cycle, vec![0, 2, 1]);
    }
}
