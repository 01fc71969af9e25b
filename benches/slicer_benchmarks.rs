//! Criterion benchmarks for kmod-slicer
//!
//! Run with: cargo bench
//! View HTML report: target/criterion/report/index.html

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use kmod_slicer::cache::PipelineCache;
use kmod_slicer::pipeline::{run_to_strings, SliceOptions, SliceRequest};
use kmod_slicer::{escrow, graph, parser};

/// Synthetic module source: `n` structs, each with a function using it,
/// chained so function i calls function i-1.
fn synthetic_module(n: usize) -> String {
    let mut src = String::new();
    src.push_str("#define BASE 7\n");
    for i in 0..n {
        src.push_str(&format!("struct rec_{i} {{ int value; }};\n", i = i));
        if i == 0 {
            src.push_str(&format!(
                "int op_{i}(struct rec_{i} *r) {{ return r->value + BASE; }}\n",
                i = i
            ));
        } else {
            src.push_str(&format!(
                "int op_{i}(struct rec_{i} *r) {{ return r->value + op_{p}(0); }}\n",
                i = i,
                p = i - 1
            ));
        }
    }
    src
}

/// Benchmark the escrow adapter on growing inputs
fn bench_adapt(c: &mut Criterion) {
    let mut group = c.benchmark_group("adapt");
    for size in [10, 100, 500] {
        let src = synthetic_module(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &src, |b, src| {
            b.iter(|| escrow::adapt_all(black_box(src)));
        });
    }
    group.finish();
}

/// Benchmark entity parsing of the module area
fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_module_area");
    for size in [10, 100, 500] {
        let adapted = escrow::adapt_all(&synthetic_module(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &adapted, |b, adapted| {
            b.iter(|| parser::parse_module_area(black_box(&adapted.body), &adapted.escrows));
        });
    }
    group.finish();
}

/// Benchmark graph construction from parsed entities
fn bench_build_graph(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_graph");
    for size in [10, 100, 500] {
        let adapted = escrow::adapt_all(&synthetic_module(size));
        let module = parser::parse_module_area(&adapted.body, &adapted.escrows);
        let kernel = kmod_slicer::EntitySet::new(kmod_slicer::Area::Kernel);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| graph::build_graph(black_box(&kernel), black_box(&module)).unwrap());
        });
    }
    group.finish();
}

/// Benchmark the whole pipeline down to the emitted strings
fn bench_end_to_end(c: &mut Criterion) {
    let mut group = c.benchmark_group("end_to_end");
    group.sample_size(20);
    for size in [10, 100] {
        let request = SliceRequest {
            preprocessed_module_text: synthetic_module(size),
            kernel_macro_list: Vec::new(),
            target_functions: vec![format!("op_{}", size - 1)],
            options: SliceOptions::default(),
            cache_dir: None,
        };
        group.bench_with_input(BenchmarkId::from_parameter(size), &request, |b, req| {
            b.iter(|| run_to_strings(black_box(req)).unwrap());
        });
    }
    group.finish();
}

/// Benchmark content hash generation for cache keys
fn bench_content_hash(c: &mut Criterion) {
    let src = synthetic_module(100);
    c.bench_function("content_hash", |b| {
        b.iter(|| PipelineCache::content_hash(black_box(&[src.as_str()])));
    });
}

criterion_group!(
    benches,
    bench_adapt,
    bench_parse,
    bench_build_graph,
    bench_end_to_end,
    bench_content_hash
);
criterion_main!(benches);
