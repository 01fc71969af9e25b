//! Deterministic topological emission into the four output buckets.
//!
//! Repeatedly takes the set of in-degree-zero vertices, orders it by
//! (kind priority, name), appends each vertex's code (attached forward
//! declarations first) to its bucket, and deletes the set from the graph.
//! The slicer guarantees the graph is acyclic, so an empty ready set with
//! vertices remaining is an internal bug.

use std::collections::BTreeSet;

use crate::debug_log;
use crate::error::{Result, SliceError};
use crate::escrow::{self, EscrowTables};
use crate::graph::DepGraph;
use crate::parser::functions;
use crate::types::{Area, EntityKind};

/// Emission knobs, a subset of the pipeline options.
#[derive(Debug, Clone, Default)]
pub struct EmitOptions {
    pub elide_non_target_function_bodies: bool,
    pub remove_unused_enum_fields: bool,
}

/// The six textual accumulators of an emission run, already restored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Emission {
    pub kernel_macros: String,
    pub module_macros: String,
    pub kernel_types: String,
    pub extern_decls: String,
    pub module_header: String,
    pub module_code: String,
}

impl Emission {
    /// Assemble the output files: four conventional files, or one
    /// concatenated `module.c` with banner comments between sections.
    pub fn into_files(self, single_file: bool) -> Vec<(&'static str, String)> {
        if single_file {
            let mut out = String::new();
            let sections: [(&str, &String); 6] = [
                ("kernel macros", &self.kernel_macros),
                ("module macros", &self.module_macros),
                ("kernel types", &self.kernel_types),
                ("kernel externs", &self.extern_decls),
                ("module declarations", &self.module_header),
                ("module code", &self.module_code),
            ];
            for (title, body) in sections {
                if body.is_empty() {
                    continue;
                }
                out.push_str(&format!(
                    "/* ==================== {} ==================== */\n\n",
                    title
                ));
                out.push_str(body);
            }
            vec![("module.c", out)]
        } else {
            let module_c = format!(
                "#include \"kernel.h\"\n#include \"extern.h\"\n#include \"module.h\"\n\n{}",
                self.module_code
            );
            let kernel_h = format!("{}{}", self.kernel_macros, self.kernel_types);
            let module_h = format!("{}{}", self.module_macros, self.module_header);
            vec![
                ("module.c", module_c),
                ("module.h", module_h),
                ("kernel.h", kernel_h),
                ("extern.h", self.extern_decls),
            ]
        }
    }
}

/// Drain the sliced graph into the buckets and restore escrowed text.
pub fn emit(
    graph: &DepGraph,
    escrows: &EscrowTables,
    targets: &BTreeSet<String>,
    opts: &EmitOptions,
) -> Result<Emission> {
    if opts.remove_unused_enum_fields {
        // TODO: drop unused enum constants and renumber the survivors with
        // explicit values preserving the originals. The renumbering rules
        // are not settled yet, so the flag is accepted but has no effect.
        debug_log!("enum constant elision requested; pass not implemented");
    }

    let n = graph.len();
    let mut emission = Emission::default();
    let mut indeg: Vec<usize> = (0..n).map(|i| graph.in_degree(i)).collect();
    let mut alive = vec![true; n];
    let mut remaining = n;

    while remaining > 0 {
        let mut ready: Vec<usize> = (0..n).filter(|&i| alive[i] && indeg[i] == 0).collect();
        if ready.is_empty() {
            let stuck: Vec<&str> = (0..n)
                .filter(|&i| alive[i])
                .map(|i| graph.entity(i).name.as_str())
                .collect();
            return Err(SliceError::EmitCycle(stuck.join(", ")));
        }
        ready.sort_by(|&x, &y| {
            let ex = graph.entity(x);
            let ey = graph.entity(y);
            (ex.kind.emit_priority(), ex.name.as_str(), x)
                .cmp(&(ey.kind.emit_priority(), ey.name.as_str(), y))
        });

        for idx in ready {
            let vertex = graph.vertex(idx);
            let entity = &vertex.entity;
            let bucket = bucket_of(&mut emission, entity.area, entity.kind);

            for decl in &vertex.forward_decls {
                bucket.push_str(decl);
                bucket.push('\n');
            }

            let elide = opts.elide_non_target_function_bodies
                && entity.area == Area::Module
                && entity.kind == EntityKind::Function
                && !targets.contains(&entity.name);
            if elide {
                bucket.push_str(
                    &functions::prototype_of(&entity.code).unwrap_or_else(|| entity.code.clone()),
                );
            } else {
                bucket.push_str(&entity.code);
            }
            bucket.push_str("\n\n");

            alive[idx] = false;
            remaining -= 1;
            for &succ in graph.succs_of(idx) {
                indeg[succ] -= 1;
            }
        }
    }

    // Give the escrowed comments, strings and attributes back
    emission.kernel_macros = escrow::restore(&emission.kernel_macros, escrows);
    emission.module_macros = escrow::restore(&emission.module_macros, escrows);
    emission.kernel_types = escrow::restore(&emission.kernel_types, escrows);
    emission.extern_decls = escrow::restore(&emission.extern_decls, escrows);
    emission.module_header = escrow::restore(&emission.module_header, escrows);
    emission.module_code = escrow::restore(&emission.module_code, escrows);
    Ok(emission)
}

fn bucket_of(emission: &mut Emission, area: Area, kind: EntityKind) -> &mut String {
    match (area, kind) {
        (Area::Kernel, EntityKind::Macro) => &mut emission.kernel_macros,
        (Area::Kernel, EntityKind::Declaration) | (Area::Kernel, EntityKind::Global) => {
            &mut emission.extern_decls
        }
        (Area::Kernel, _) => &mut emission.kernel_types,
        (Area::Module, EntityKind::Macro) => &mut emission.module_macros,
        (Area::Module, EntityKind::Function) => &mut emission.module_code,
        (Area::Module, _) => &mut emission.module_header,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Entity, EntityId};

    fn entity(id: u32, kind: EntityKind, area: Area, name: &str, code: &str) -> Entity {
        Entity::new(EntityId(id), kind, area, name.to_string(), code.to_string())
    }

    fn emit_plain(graph: &DepGraph) -> Emission {
        emit(
            graph,
            &EscrowTables::default(),
            &BTreeSet::new(),
            &EmitOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_bucket_routing() {
        let mut graph = DepGraph::default();
        graph.ensure_vertex(&entity(0, EntityKind::Macro, Area::Kernel, "PAGE", "#define PAGE 4096"));
        graph.ensure_vertex(&entity(1, EntityKind::Struct, Area::Kernel, "list", "struct list { int x; };"));
        graph.ensure_vertex(&entity(2, EntityKind::Declaration, Area::Kernel, "kfree", "extern void kfree(const void *p);"));
        graph.ensure_vertex(&entity(3, EntityKind::Global, Area::Kernel, "jiffies", "extern unsigned long jiffies;"));
        graph.ensure_vertex(&entity(4, EntityKind::Macro, Area::Module, "K", "#define K 3"));
        graph.ensure_vertex(&entity(5, EntityKind::Struct, Area::Module, "S", "struct S { int x; };"));
        graph.ensure_vertex(&entity(6, EntityKind::Function, Area::Module, "f", "int f(void) { return 0; }"));

        let emission = emit_plain(&graph);
        assert!(emission.kernel_macros.contains("PAGE"));
        assert!(emission.kernel_types.contains("struct list"));
        assert!(emission.extern_decls.contains("kfree"));
        assert!(emission.extern_decls.contains("jiffies"));
        assert!(emission.module_macros.contains("#define K 3"));
        assert!(emission.module_header.contains("struct S"));
        assert!(emission.module_code.contains("int f(void)"));
    }

    #[test]
    fn test_kind_priority_then_name_within_round() {
        let mut graph = DepGraph::default();
        graph.ensure_vertex(&entity(0, EntityKind::Function, Area::Module, "zz", "int zz(void) { return 0; }"));
        graph.ensure_vertex(&entity(1, EntityKind::Function, Area::Module, "aa", "int aa(void) { return 0; }"));
        let emission = emit_plain(&graph);
        let aa = emission.module_code.find("int aa").unwrap();
        let zz = emission.module_code.find("int zz").unwrap();
        assert!(aa < zz);
    }

    #[test]
    fn test_dependency_order_beats_name_order() {
        let mut graph = DepGraph::default();
        let a = graph.ensure_vertex(&entity(0, EntityKind::Function, Area::Module, "aa", "int aa(void) { return zz(); }"));
        let z = graph.ensure_vertex(&entity(1, EntityKind::Function, Area::Module, "zz", "int zz(void) { return 0; }"));
        graph.add_edge(z, a); // zz must precede aa
        let emission = emit_plain(&graph);
        let aa = emission.module_code.find("int aa").unwrap();
        let zz = emission.module_code.find("int zz").unwrap();
        assert!(zz < aa);
    }

    #[test]
    fn test_forward_decls_come_first() {
        let mut graph = DepGraph::default();
        let a = graph.ensure_vertex(&entity(0, EntityKind::Function, Area::Module, "a", "int a(void) { return b(); }"));
        graph.ensure_vertex(&entity(1, EntityKind::Function, Area::Module, "b", "int b(void) { return a(); }"));
        graph.attach_forward_decl(a, "int b(void);".to_string());
        let emission = emit_plain(&graph);
        let decl = emission.module_code.find("int b(void);").unwrap();
        let def_a = emission.module_code.find("int a(void)").unwrap();
        assert!(decl < def_a);
    }

    #[test]
    fn test_elide_non_target_bodies() {
        let mut graph = DepGraph::default();
        graph.ensure_vertex(&entity(0, EntityKind::Function, Area::Module, "keep", "int keep(void) { return helper(); }"));
        graph.ensure_vertex(&entity(1, EntityKind::Function, Area::Module, "helper", "int helper(void) { return 42; }"));
        let targets: BTreeSet<String> = ["keep".to_string()].into_iter().collect();
        let opts = EmitOptions {
            elide_non_target_function_bodies: true,
            ..Default::default()
        };
        let emission = emit(&graph, &EscrowTables::default(), &targets, &opts).unwrap();
        assert!(emission.module_code.contains("int keep(void) { return helper(); }"));
        assert!(emission.module_code.contains("int helper(void);"));
        assert!(!emission.module_code.contains("return 42"));
    }

    #[test]
    fn test_leftover_cycle_is_fatal() {
        let mut graph = DepGraph::default();
        let a = graph.ensure_vertex(&entity(0, EntityKind::Struct, Area::Module, "A", "struct A { struct B b; };"));
        let b = graph.ensure_vertex(&entity(1, EntityKind::Struct, Area::Module, "B", "struct B { struct A a; };"));
        graph.add_edge(a, b);
        graph.add_edge(b, a);
        match emit_plain_err(&graph) {
            SliceError::EmitCycle(stuck) => {
                assert!(stuck.contains('A'));
                assert!(stuck.contains('B'));
            }
            other => panic!("expected EmitCycle, got {}", other),
        }
    }

    fn emit_plain_err(graph: &DepGraph) -> SliceError {
        emit(
            graph,
            &EscrowTables::default(),
            &BTreeSet::new(),
            &EmitOptions::default(),
        )
        .unwrap_err()
    }

    #[test]
    fn test_single_file_section_order() {
        let emission = Emission {
            kernel_macros: "#define P 1\n\n".to_string(),
            module_macros: "#define K 3\n\n".to_string(),
            kernel_types: "struct list { int x; };\n\n".to_string(),
            extern_decls: "extern void kfree(const void *p);\n\n".to_string(),
            module_header: "struct S { int x; };\n\n".to_string(),
            module_code: "int f(void) { return 0; }\n\n".to_string(),
        };
        let files = emission.into_files(true);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].0, "module.c");
        let body = &files[0].1;
        let order = [
            body.find("#define P 1").unwrap(),
            body.find("#define K 3").unwrap(),
            body.find("struct list").unwrap(),
            body.find("kfree").unwrap(),
            body.find("struct S").unwrap(),
            body.find("int f(void)").unwrap(),
        ];
        assert!(order.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_multi_file_includes() {
        let emission = Emission {
            module_code: "int f(void) { return 0; }\n\n".to_string(),
            ..Default::default()
        };
        let files = emission.into_files(false);
        assert_eq!(files.len(), 4);
        let module_c = &files.iter().find(|(n, _)| *n == "module.c").unwrap().1;
        assert!(module_c.starts_with(
            "#include \"kernel.h\"\n#include \"extern.h\"\n#include \"module.h\"\n"
        ));
    }
}
