//! Error types for kmod-slicer.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the slicer's error
pub type Result<T> = std::result::Result<T, SliceError>;

/// Slicer error taxonomy.
///
/// Input errors fail fast with exit code 2; everything else is an internal
/// or I/O failure and exits with 1. Parse-level problems are warnings, not
/// errors: the parsers recover locally and never surface here.
#[derive(Error, Debug)]
pub enum SliceError {
    #[error("no target functions given")]
    EmptyTargets,

    #[error("target function '{name}' not found in module")]
    UnknownTarget { name: String },

    #[error("failed to read {}: {source}", .path.display())]
    ReadInput {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("usage error: {0}")]
    Usage(String),

    #[error("failed to write {}: {source}", .path.display())]
    WriteOutput {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("graph invariant violated: {0}")]
    GraphInvariant(String),

    #[error("unresolvable dependency cycle: {path}")]
    UnresolvableCycle { path: String },

    #[error("cycle left in graph at emission: {0}")]
    EmitCycle(String),
}

impl SliceError {
    /// Process exit code for this error: 2 for user/input errors, 1 for
    /// internal and output errors.
    pub fn exit_code(&self) -> i32 {
        match self {
            SliceError::EmptyTargets
            | SliceError::UnknownTarget { .. }
            | SliceError::ReadInput { .. }
            | SliceError::Usage(_) => 2,
            SliceError::WriteOutput { .. }
            | SliceError::GraphInvariant(_)
            | SliceError::UnresolvableCycle { .. }
            | SliceError::EmitCycle(_) => 1,
        }
    }
}
