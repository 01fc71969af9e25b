//! Cross-reference graph construction.
//!
//! Vertices are entities; edge A→B means "B depends on A, so A must appear
//! before B". For every meta-edge, the builder compiles one multi-pattern
//! automaton over the source entities' identifiers and scans each target
//! entity's search text for whole-word occurrences. Over-inclusion is safe
//! (a false edge only drags an extra entity into the slice); missing an
//! edge is not, which is why the scan runs on raw token text instead of a
//! resolved symbol table.

use std::collections::{BTreeMap, BTreeSet};

use aho_corasick::AhoCorasick;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SliceError};
use crate::meta_graph::META_EDGES;
use crate::parser::balance;
use crate::types::{Area, Entity, EntityId, EntitySet};

/// A graph vertex: the entity plus its attached forward declarations
/// (prototypes emitted immediately before the entity's own code).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vertex {
    pub entity: Entity,
    pub forward_decls: Vec<String>,
}

/// Adjacency-list dependency graph with dense vertex indices.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DepGraph {
    vertices: Vec<Vertex>,
    index: BTreeMap<EntityId, usize>,
    succs: Vec<BTreeSet<usize>>,
    preds: Vec<BTreeSet<usize>>,
}

impl DepGraph {
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Add a vertex for the entity unless one exists already (idempotent).
    pub fn ensure_vertex(&mut self, entity: &Entity) -> usize {
        if let Some(&idx) = self.index.get(&entity.id) {
            return idx;
        }
        let idx = self.vertices.len();
        self.vertices.push(Vertex {
            entity: entity.clone(),
            forward_decls: Vec::new(),
        });
        self.succs.push(BTreeSet::new());
        self.preds.push(BTreeSet::new());
        self.index.insert(entity.id, idx);
        idx
    }

    pub fn index_of(&self, id: EntityId) -> Result<usize> {
        self.index.get(&id).copied().ok_or_else(|| {
            SliceError::GraphInvariant(format!("entity id {:?} has no vertex", id))
        })
    }

    pub fn vertex(&self, idx: usize) -> &Vertex {
        &self.vertices[idx]
    }

    pub fn entity(&self, idx: usize) -> &Entity {
        &self.vertices[idx].entity
    }

    pub fn vertices(&self) -> impl Iterator<Item = (usize, &Vertex)> {
        self.vertices.iter().enumerate()
    }

    pub fn add_edge(&mut self, s: usize, t: usize) {
        self.succs[s].insert(t);
        self.preds[t].insert(s);
    }

    pub fn remove_edge(&mut self, s: usize, t: usize) {
        self.succs[s].remove(&t);
        self.preds[t].remove(&s);
    }

    pub fn has_edge(&self, s: usize, t: usize) -> bool {
        self.succs[s].contains(&t)
    }

    pub fn succs_of(&self, idx: usize) -> &BTreeSet<usize> {
        &self.succs[idx]
    }

    pub fn preds_of(&self, idx: usize) -> &BTreeSet<usize> {
        &self.preds[idx]
    }

    pub fn in_degree(&self, idx: usize) -> usize {
        self.preds[idx].len()
    }

    pub fn edge_count(&self) -> usize {
        self.succs.iter().map(|s| s.len()).sum()
    }

    pub fn attach_forward_decl(&mut self, idx: usize, proto: String) {
        self.vertices[idx].forward_decls.push(proto);
    }

    /// Resolve a module function name to its vertex.
    pub fn module_function(&self, name: &str) -> Option<usize> {
        self.vertices.iter().position(|v| {
            v.entity.area == Area::Module
                && v.entity.kind == crate::types::EntityKind::Function
                && v.entity.name == name
        })
    }
}

/// Build the full cross-reference graph from the two parsed areas.
pub fn build_graph(kernel: &EntitySet, module: &EntitySet) -> Result<DepGraph> {
    let mut graph = DepGraph::default();

    for ((src_area, src_kind), (tgt_area, tgt_kind)) in META_EDGES {
        let sources = area_set(kernel, module, *src_area).of_kind(*src_kind);
        let targets = area_set(kernel, module, *tgt_area).of_kind(*tgt_kind);

        for entity in sources {
            graph.ensure_vertex(entity);
        }
        for entity in targets {
            graph.ensure_vertex(entity);
        }
        if sources.is_empty() || targets.is_empty() {
            continue;
        }

        // Several sources can define the same identifier (a typedef and the
        // struct tag it forward-declares), so map name → all defining ids.
        let mut by_name: BTreeMap<&str, Vec<EntityId>> = BTreeMap::new();
        for entity in sources {
            for id in &entity.ids {
                by_name.entry(id.as_str()).or_default().push(entity.id);
            }
        }
        let patterns: Vec<&str> = by_name.keys().copied().collect();
        let ac = AhoCorasick::new(&patterns).map_err(|e| {
            SliceError::GraphInvariant(format!("identifier pattern set rejected: {}", e))
        })?;

        // Pure read over the targets; merged back in target order below.
        let hits: Vec<(EntityId, Vec<EntityId>)> = targets
            .par_iter()
            .map(|target| {
                let bytes = target.tags.as_bytes();
                let mut matched: BTreeSet<usize> = BTreeSet::new();
                for m in ac.find_overlapping_iter(&target.tags) {
                    if is_word_bounded(bytes, m.start(), m.end()) {
                        matched.insert(m.pattern().as_usize());
                    }
                }
                let mut source_ids = Vec::new();
                for pattern in matched {
                    source_ids.extend(by_name[patterns[pattern]].iter().copied());
                }
                source_ids.sort();
                source_ids.dedup();
                (target.id, source_ids)
            })
            .collect();

        for (target_id, source_ids) in hits {
            let t = graph.index_of(target_id)?;
            for source_id in source_ids {
                let s = graph.index_of(source_id)?;
                graph.add_edge(s, t);
            }
        }
    }

    Ok(graph)
}

fn area_set<'a>(kernel: &'a EntitySet, module: &'a EntitySet, area: Area) -> &'a EntitySet {
    match area {
        Area::Kernel => kernel,
        Area::Module => module,
    }
}

/// A match counts only when it is not embedded in a longer identifier.
fn is_word_bounded(bytes: &[u8], start: usize, end: usize) -> bool {
    let before_ok = start == 0 || !balance::is_ident_byte(bytes[start - 1]);
    let after_ok = end >= bytes.len() || !balance::is_ident_byte(bytes[end]);
    before_ok && after_ok
}
