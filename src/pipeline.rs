//! Pipeline driver: adapt → split → parse → graph → slice → emit.
//!
//! Owns the two memoisation boundaries (parsed kernel entities, built
//! graph) and converts the stage outputs into the final files. Cache
//! problems degrade to a recompute with a warning; they never fail a run.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::cache::PipelineCache;
use crate::emit::{self, EmitOptions, Emission};
use crate::error::{Result, SliceError};
use crate::escrow;
use crate::graph;
use crate::parser;
use crate::slicer;

/// Behaviour flags of one slicing run.
#[derive(Debug, Clone, Default)]
pub struct SliceOptions {
    pub single_file_output: bool,
    pub elide_non_target_function_bodies: bool,
    pub remove_unused_enum_fields: bool,
    pub verbose: bool,
}

/// Everything the core consumes from its collaborators.
#[derive(Debug, Clone)]
pub struct SliceRequest {
    /// Preprocessed module text with kernel headers inlined.
    pub preprocessed_module_text: String,
    /// Kernel `#define` directives active after preprocessing.
    pub kernel_macro_list: Vec<String>,
    /// Function names to slice toward.
    pub target_functions: Vec<String>,
    pub options: SliceOptions,
    /// Memoisation directory; None disables caching.
    pub cache_dir: Option<PathBuf>,
}

/// Run the pipeline and write the output files into `output_dir`.
pub fn run(request: &SliceRequest, output_dir: &Path) -> Result<()> {
    let emission = run_to_strings(request)?;
    fs::create_dir_all(output_dir).map_err(|e| SliceError::WriteOutput {
        path: output_dir.to_path_buf(),
        source: e,
    })?;
    for (name, content) in emission.into_files(request.options.single_file_output) {
        let path = output_dir.join(name);
        fs::write(&path, content).map_err(|e| SliceError::WriteOutput {
            path: path.clone(),
            source: e,
        })?;
        if request.options.verbose {
            println!("Wrote {}", path.display());
        }
    }
    Ok(())
}

/// Run the pipeline up to the emitted bucket strings (no file I/O).
pub fn run_to_strings(request: &SliceRequest) -> Result<Emission> {
    if request.target_functions.is_empty() {
        return Err(SliceError::EmptyTargets);
    }
    let opts = &request.options;
    let cache = request.cache_dir.as_ref().map(PipelineCache::new);
    let mut timings: Vec<(&str, u128)> = Vec::new();

    let graph_hash = {
        let mut parts: Vec<&str> = vec![&request.preprocessed_module_text];
        parts.extend(request.kernel_macro_list.iter().map(|s| s.as_str()));
        PipelineCache::content_hash(&parts)
    };

    let cached = cache.as_ref().and_then(|c| c.load_graph(&graph_hash));
    let (graph, escrows) = match cached {
        Some(hit) => {
            if opts.verbose {
                println!("Graph cache hit, skipping adapt/parse/build");
            }
            hit
        }
        None => {
            // Step 1: escrow comments, strings, attributes and directives
            let t = Instant::now();
            let adapted = escrow::adapt_all(&request.preprocessed_module_text);
            timings.push(("adapt", t.elapsed().as_millis()));

            // Step 2: split the blob into kernel and module areas
            let t = Instant::now();
            let areas = parser::split_areas(&adapted);
            timings.push(("split", t.elapsed().as_millis()));

            // Step 3: parse both areas; the kernel side sits behind level 1
            let t = Instant::now();
            let kernel_hash = {
                let mut parts: Vec<&str> = vec![&areas.kernel];
                parts.extend(request.kernel_macro_list.iter().map(|s| s.as_str()));
                PipelineCache::content_hash(&parts)
            };
            let kernel_set = match cache
                .as_ref()
                .and_then(|c| c.load_kernel_entities(&kernel_hash))
            {
                Some(set) => {
                    if opts.verbose {
                        println!("Kernel entity cache hit");
                    }
                    set
                }
                None => {
                    let set =
                        parser::parse_kernel_area(&areas.kernel, &request.kernel_macro_list);
                    if let Some(c) = &cache {
                        if let Err(e) = c.store_kernel_entities(&kernel_hash, &set) {
                            eprintln!("Warning: {}", e);
                        }
                    }
                    set
                }
            };
            let module_set = parser::parse_module_area(&areas.module, &adapted.escrows);
            timings.push(("parse", t.elapsed().as_millis()));
            if opts.verbose {
                println!(
                    "Parsed {} kernel and {} module entities",
                    kernel_set.len(),
                    module_set.len()
                );
            }

            // Step 4: build the cross-reference graph
            let t = Instant::now();
            let graph = graph::build_graph(&kernel_set, &module_set)?;
            timings.push(("graph", t.elapsed().as_millis()));
            if let Some(c) = &cache {
                if let Err(e) = c.store_graph(&graph_hash, &graph, &adapted.escrows) {
                    eprintln!("Warning: {}", e);
                }
            }
            (graph, adapted.escrows)
        }
    };

    // Step 5: slice toward the targets
    let t = Instant::now();
    let sliced = slicer::slice(&graph, &request.target_functions)?;
    timings.push(("slice", t.elapsed().as_millis()));

    // Step 6: deterministic topological emission
    let t = Instant::now();
    let target_set: BTreeSet<String> = request.target_functions.iter().cloned().collect();
    let emit_opts = EmitOptions {
        elide_non_target_function_bodies: opts.elide_non_target_function_bodies,
        remove_unused_enum_fields: opts.remove_unused_enum_fields,
    };
    let emission = emit::emit(&sliced, &escrows, &target_set, &emit_opts)?;
    timings.push(("emit", t.elapsed().as_millis()));

    if opts.verbose {
        println!(
            "Slice: {} of {} vertices, {} edges kept",
            sliced.len(),
            graph.len(),
            sliced.edge_count()
        );
        let total: u128 = timings.iter().map(|(_, ms)| ms).sum();
        for (stage, ms) in &timings {
            println!("  {:<6} {:>6}ms", stage, ms);
        }
        println!("  {:<6} {:>6}ms", "total", total);
    }

    Ok(emission)
}
