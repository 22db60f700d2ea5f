//! Benchmarks for the hot query paths: member enumeration, namespace
//! resolution, and signature inference over a mid-sized synthetic
//! workspace.

use std::fs;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use garnet::{ApiMap, Scope, Visibility};

fn build_workspace(classes: usize) -> (tempfile::TempDir, ApiMap) {
    let dir = tempfile::tempdir().expect("tempdir");
    for i in 0..classes {
        let superclass = if i > 0 {
            format!(" < C{}", i - 1)
        } else {
            String::new()
        };
        let code = format!(
            "class C{i}{superclass}\n  \
             # @return [String]\n  def name_{i}; end\n  \
             # @return [Integer]\n  def count_{i}; end\n  \
             def initialize\n    @tag_{i} = :t{i}\n  end\nend\n",
        );
        fs::write(dir.path().join(format!("c{}.rb", i)), code).expect("write fixture");
    }
    let map = ApiMap::new(Some(dir.path()));
    (dir, map)
}

fn bench_queries(c: &mut Criterion) {
    let (_dir, mut map) = build_workspace(50);
    let deepest = "C49";

    c.bench_function("get_instance_methods_deep_chain", |b| {
        b.iter(|| {
            let methods = map.get_instance_methods(black_box(deepest), "", &[Visibility::Public]);
            black_box(methods.len())
        })
    });

    c.bench_function("find_fully_qualified_namespace", |b| {
        b.iter(|| black_box(map.find_fully_qualified_namespace(black_box("C25"), "")))
    });

    c.bench_function("infer_signature_type_cached", |b| {
        b.iter(|| {
            black_box(map.infer_signature_type(
                black_box("C49.new.name_49"),
                "",
                Scope::Class,
                None,
            ))
        })
    });

    c.bench_function("search_paths", |b| {
        b.iter(|| black_box(map.search(black_box("name_2")).len()))
    });
}

criterion_group!(benches, bench_queries);
criterion_main!(benches);
