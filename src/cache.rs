//! Two-level memoisation of pipeline stages.
//!
//! Level 1 caches the kernel area's parsed entity set (kernel headers change
//! rarely between runs); level 2 caches the fully built graph together with
//! the escrow tables, so a re-run over identical inputs skips adaptation,
//! parsing and graph building entirely. Blobs carry a format version and
//! the content hash of their inputs; any mismatch forces a full re-run.
//! Cache failures are never fatal — the pipeline just recomputes.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::escrow::EscrowTables;
use crate::graph::DepGraph;
use crate::types::EntitySet;

/// Cache format version; bump on any layout change.
const CACHE_FORMAT_VERSION: u32 = 1;

const KERNEL_ENTITIES_FILE: &str = "kernel-entities.json";
const GRAPH_FILE: &str = "graph.json";

#[derive(Debug, Serialize, Deserialize)]
struct Blob<T> {
    version: u32,
    content_hash: String,
    payload: T,
}

/// On-disk memoisation directory handle.
#[derive(Debug, Clone)]
pub struct PipelineCache {
    dir: PathBuf,
}

impl PipelineCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        PipelineCache { dir: dir.into() }
    }

    /// Deterministic content hash over the given input parts.
    pub fn content_hash(parts: &[&str]) -> String {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part.as_bytes());
            hasher.update(b"\n");
        }
        let digest = hasher.finalize();
        hex::encode(&digest[..8])
    }

    /// Level 1: the kernel area's parsed entities.
    pub fn load_kernel_entities(&self, hash: &str) -> Option<EntitySet> {
        self.load_blob(KERNEL_ENTITIES_FILE, hash)
    }

    pub fn store_kernel_entities(&self, hash: &str, set: &EntitySet) -> Result<(), String> {
        self.store_blob(KERNEL_ENTITIES_FILE, hash, set)
    }

    /// Level 2: the complete graph plus the escrow tables it was built from.
    pub fn load_graph(&self, hash: &str) -> Option<(DepGraph, EscrowTables)> {
        self.load_blob(GRAPH_FILE, hash)
    }

    pub fn store_graph(
        &self,
        hash: &str,
        graph: &DepGraph,
        escrows: &EscrowTables,
    ) -> Result<(), String> {
        self.store_blob(GRAPH_FILE, hash, &(graph, escrows))
    }

    fn load_blob<T: DeserializeOwned>(&self, file: &str, hash: &str) -> Option<T> {
        let path = self.dir.join(file);
        let content = fs::read_to_string(&path).ok()?;
        match serde_json::from_str::<Blob<T>>(&content) {
            Ok(blob) if blob.version != CACHE_FORMAT_VERSION => {
                eprintln!("Cache version mismatch, ignoring {}", path.display());
                None
            }
            Ok(blob) if blob.content_hash != hash => None,
            Ok(blob) => Some(blob.payload),
            Err(e) => {
                eprintln!("Failed to parse cache {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Serialise and write atomically: sibling temp file, then rename.
    fn store_blob<T: Serialize>(&self, file: &str, hash: &str, payload: T) -> Result<(), String> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| format!("Failed to create cache dir: {}", e))?;

        let blob = Blob {
            version: CACHE_FORMAT_VERSION,
            content_hash: hash.to_string(),
            payload,
        };
        let content = serde_json::to_string(&blob)
            .map_err(|e| format!("Failed to serialize cache: {}", e))?;

        let path = self.dir.join(file);
        let tmp = self.dir.join(format!("{}.tmp", file));
        fs::write(&tmp, content).map_err(|e| format!("Failed to write {}: {}", tmp.display(), e))?;
        fs::rename(&tmp, &path)
            .map_err(|e| format!("Failed to rename cache into place: {}", e))?;
        Ok(())
    }
}

/// Remove the whole cache directory.
pub fn clean_cache(dir: &Path) -> Result<(), String> {
    if dir.exists() {
        fs::remove_dir_all(dir).map_err(|e| format!("Failed to clean cache: {}", e))?;
    }
    Ok(())
}
