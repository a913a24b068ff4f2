//! Incremental vs. full rebuild over a synthetic element graph.
#[macro_use]
extern crate criterion;

use criterion::Criterion;
use sunscript_engine::model::{ElementKind, ElementRecord, FileRecord};
use sunscript_engine::oracle::DeterministicOracle;
use sunscript_engine::section::TargetLanguage;
use sunscript_engine::{BuildInvocation, EngineConfig};
use tempfile::tempdir;

const FILE_COUNT: usize = 50;
const ELEMENTS_PER_FILE: usize = 8;

fn synthetic_files(dir: &std::path::Path, touch_one: bool) -> Vec<FileRecord> {
    (0..FILE_COUNT)
        .map(|i| {
            let elements: Vec<ElementRecord> = (0..ELEMENTS_PER_FILE)
                .map(|j| {
                    let mut text = format!("function fn_{i}_{j}() {{ return {j}; }}");
                    if touch_one && i == 0 && j == 0 {
                        text.push_str(" // edited");
                    }
                    ElementRecord {
                        name: format!("fn_{i}_{j}"),
                        kind: ElementKind::Function,
                        start_line: (j * 3) as u32,
                        end_line: (j * 3 + 2) as u32,
                        canonical_hash: sunscript_engine::fingerprint::hash(
                            &text,
                            sunscript_engine::CommentStyle::DoubleSlash,
                        ),
                        declared_dependencies: Vec::new(),
                        exported: j == 0,
                    }
                })
                .collect();
            let source_path = dir.join(format!("module_{i}.sun"));
            FileRecord {
                source_path: source_path.clone(),
                file_hash: format!("file-hash-{i}"),
                elements,
                output_paths: vec![source_path.with_extension("js")],
                language: "sunscript".into(),
            }
        })
        .collect()
}

fn bench_rebuild_strategies(c: &mut Criterion) {
    let oracle = DeterministicOracle;
    let mut group = c.benchmark_group("rebuild strategies");
    group.sample_size(10);

    group.bench_function("cold full build", |b| {
        b.iter(|| {
            let dir = tempdir().unwrap();
            let files = synthetic_files(dir.path(), false);
            let mut invocation = BuildInvocation::new(
                dir.path(),
                &oracle,
                TargetLanguage::JavaScript,
                "node18",
                EngineConfig::default(),
            );
            invocation.run(files).unwrap();
        });
    });

    group.bench_function("incremental single-element edit", |b| {
        b.iter_batched(
            || {
                let dir = tempdir().unwrap();
                let mut invocation = BuildInvocation::new(
                    dir.path(),
                    &oracle,
                    TargetLanguage::JavaScript,
                    "node18",
                    EngineConfig::default(),
                );
                invocation.run(synthetic_files(dir.path(), false)).unwrap();
                (dir, invocation)
            },
            |(dir, mut invocation)| {
                invocation.run(synthetic_files(dir.path(), true)).unwrap();
            },
            criterion::BatchSize::LargeInput,
        );
    });
}

criterion_group!(benches, bench_rebuild_strategies);
criterion_main!(benches);
