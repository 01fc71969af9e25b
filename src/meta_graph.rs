//! The fixed schema of legal dependency edges.
//!
//! Every entry `((source area, source kind), (target area, target kind))`
//! declares "entities of the source pair may be depended upon by entities of
//! the target pair". Kernel entities may be pulled into the module slice;
//! module entities never pull kernel entities, because the external
//! preprocessor already resolved what the module uses from the kernel.
//! Functions only consume types, so no kind ever depends on a function
//! except another function or a macro user.

use crate::types::{Area, EntityKind};

use Area::{Kernel, Module};
use EntityKind::{Declaration, Enum, Function, Global, Macro, Struct, Typedef};

/// Meta-edges in their fixed enumeration order; the graph builder walks this
/// list as given, which pins the edge-generation order run-to-run.
pub const META_EDGES: &[((Area, EntityKind), (Area, EntityKind))] = &[
    // kernel macro
    ((Kernel, Macro), (Kernel, Macro)),
    ((Kernel, Macro), (Kernel, Struct)),
    ((Kernel, Macro), (Kernel, Typedef)),
    ((Kernel, Macro), (Kernel, Enum)),
    ((Kernel, Macro), (Kernel, Declaration)),
    ((Kernel, Macro), (Kernel, Global)),
    ((Kernel, Macro), (Module, Macro)),
    ((Kernel, Macro), (Module, Struct)),
    ((Kernel, Macro), (Module, Function)),
    ((Kernel, Macro), (Module, Typedef)),
    ((Kernel, Macro), (Module, Enum)),
    // kernel struct
    ((Kernel, Struct), (Kernel, Macro)),
    ((Kernel, Struct), (Kernel, Struct)),
    ((Kernel, Struct), (Kernel, Declaration)),
    ((Kernel, Struct), (Kernel, Typedef)),
    ((Kernel, Struct), (Kernel, Global)),
    ((Kernel, Struct), (Module, Macro)),
    ((Kernel, Struct), (Module, Struct)),
    ((Kernel, Struct), (Module, Function)),
    ((Kernel, Struct), (Module, Typedef)),
    ((Kernel, Struct), (Module, Global)),
    // kernel declaration
    ((Kernel, Declaration), (Kernel, Macro)),
    ((Kernel, Declaration), (Module, Macro)),
    ((Kernel, Declaration), (Module, Function)),
    // kernel typedef
    ((Kernel, Typedef), (Kernel, Macro)),
    ((Kernel, Typedef), (Kernel, Struct)),
    ((Kernel, Typedef), (Kernel, Declaration)),
    ((Kernel, Typedef), (Kernel, Typedef)),
    ((Kernel, Typedef), (Kernel, Enum)),
    ((Kernel, Typedef), (Kernel, Global)),
    ((Kernel, Typedef), (Module, Macro)),
    ((Kernel, Typedef), (Module, Struct)),
    ((Kernel, Typedef), (Module, Function)),
    ((Kernel, Typedef), (Module, Typedef)),
    ((Kernel, Typedef), (Module, Enum)),
    ((Kernel, Typedef), (Module, Global)),
    // kernel enum
    ((Kernel, Enum), (Kernel, Macro)),
    ((Kernel, Enum), (Kernel, Struct)),
    ((Kernel, Enum), (Kernel, Declaration)),
    ((Kernel, Enum), (Kernel, Typedef)),
    ((Kernel, Enum), (Kernel, Enum)),
    ((Kernel, Enum), (Kernel, Global)),
    ((Kernel, Enum), (Module, Macro)),
    ((Kernel, Enum), (Module, Struct)),
    ((Kernel, Enum), (Module, Function)),
    ((Kernel, Enum), (Module, Typedef)),
    ((Kernel, Enum), (Module, Enum)),
    ((Kernel, Enum), (Module, Global)),
    // kernel global
    ((Kernel, Global), (Kernel, Macro)),
    ((Kernel, Global), (Module, Macro)),
    ((Kernel, Global), (Module, Function)),
    // module macro
    ((Module, Macro), (Module, Macro)),
    ((Module, Macro), (Module, Struct)),
    ((Module, Macro), (Module, Function)),
    ((Module, Macro), (Module, Typedef)),
    ((Module, Macro), (Module, Enum)),
    // module struct
    ((Module, Struct), (Module, Macro)),
    ((Module, Struct), (Module, Struct)),
    ((Module, Struct), (Module, Function)),
    ((Module, Struct), (Module, Typedef)),
    ((Module, Struct), (Module, Global)),
    // module function
    ((Module, Function), (Module, Macro)),
    ((Module, Function), (Module, Function)),
    // module typedef
    ((Module, Typedef), (Module, Macro)),
    ((Module, Typedef), (Module, Struct)),
    ((Module, Typedef), (Module, Function)),
    ((Module, Typedef), (Module, Typedef)),
    ((Module, Typedef), (Module, Enum)),
    ((Module, Typedef), (Module, Global)),
    // module enum
    ((Module, Enum), (Module, Macro)),
    ((Module, Enum), (Module, Struct)),
    ((Module, Enum), (Module, Function)),
    ((Module, Enum), (Module, Typedef)),
    ((Module, Enum), (Module, Enum)),
    ((Module, Enum), (Module, Global)),
    // module global
    ((Module, Global), (Module, Macro)),
    ((Module, Global), (Module, Function)),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_count() {
        assert_eq!(META_EDGES.len(), 77);
    }

    #[test]
    fn test_module_never_feeds_kernel() {
        assert!(META_EDGES
            .iter()
            .all(|((sa, _), (ta, _))| !(*sa == Module && *ta == Kernel)));
    }

    #[test]
    fn test_functions_never_feed_types() {
        for ((_, sk), (_, tk)) in META_EDGES {
            if *sk == Function {
                assert!(
                    matches!(*tk, Function | Macro),
                    "function feeds {:?}",
                    tk
                );
            }
        }
    }

    #[test]
    fn test_kernel_declaration_reaches_module_functions() {
        assert!(META_EDGES.contains(&((Kernel, Declaration), (Module, Function))));
    }

    #[test]
    fn test_self_edges_exist_for_recursive_kinds() {
        assert!(META_EDGES.contains(&((Module, Function), (Module, Function))));
        assert!(META_EDGES.contains(&((Module, Macro), (Module, Macro))));
        assert!(META_EDGES.contains(&((Kernel, Struct), (Kernel, Struct))));
    }
}
