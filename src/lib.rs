//! kmod-slicer - Extract the minimum compilable slice of a kernel module.
//!
//! Given the preprocessed C text of an out-of-tree kernel module (kernel
//! headers inlined) and one or more target function names, this crate
//! computes the self-contained slice of code the targets need to compile
//! and emits it in declare-before-use order, either as four conventional
//! files (`module.c`, `module.h`, `kernel.h`, `extern.h`) or as a single
//! concatenated file.
//!
//! The pipeline: escrow comments/strings/attributes/directives, split the
//! blob into kernel and module areas, parse entities per kind, build the
//! cross-reference graph under the fixed meta-graph, slice toward the
//! targets with cycle resolution, then drain the graph topologically into
//! the output buckets.

pub mod cache;
pub mod constants;
pub mod cycle_detector;
pub mod debug_log;
pub mod emit;
pub mod error;
pub mod escrow;
pub mod graph;
pub mod meta_graph;
pub mod parser;
pub mod pipeline;
pub mod slicer;
pub mod types;

// Re-exports for the public API
pub use error::{Result, SliceError};
pub use pipeline::{run, run_to_strings, SliceOptions, SliceRequest};
pub use types::{Area, Entity, EntityId, EntityKind, EntitySet};
