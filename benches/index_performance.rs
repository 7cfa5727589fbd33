use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::fs;
use std::path::Path;

use repograph::index::db::IndexDatabase;
use repograph::indexer::parser::ParserRegistry;
use repograph::indexer::{Indexer, IndexerOptions};

fn python_module(index: usize) -> String {
    let mut source = String::from("import os\nfrom .base import Base\n\n");
    for i in 0..20 {
        source.push_str(&format!(
            "class Service{index}_{i}(Base):\n    def handle(self, request):\n        return helper_{i}(request)\n\n\
             def helper_{i}(value):\n    return os.path.join(str(value), 'x')\n\n"
        ));
    }
    source
}

fn write_project(root: &Path, files: usize) {
    for i in 0..files {
        fs::write(root.join(format!("module_{i}.py")), python_module(i)).unwrap();
    }
}

fn bench_extract_python(c: &mut Criterion) {
    let registry = ParserRegistry::new();
    let source = python_module(0);

    c.bench_function("extract_python_module", |b| {
        b.iter(|| registry.analyze(black_box("module_0.py"), black_box(&source)));
    });
}

fn bench_index_project(c: &mut Criterion) {
    c.bench_function("index_50_files", |b| {
        b.iter(|| {
            let dir = tempfile::tempdir().unwrap();
            write_project(dir.path(), 50);
            let db = IndexDatabase::new(dir.path().join(".repograph/index.db")).unwrap();
            let indexer = Indexer::new(dir.path(), db, IndexerOptions::default());
            for i in 0..50 {
                assert!(indexer.index_file(&format!("module_{i}.py")).is_success());
            }
        });
    });
}

fn bench_unchanged_reindex(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path(), 50);
    let db = IndexDatabase::new(dir.path().join(".repograph/index.db")).unwrap();
    let indexer = Indexer::new(dir.path(), db, IndexerOptions::default());
    for i in 0..50 {
        indexer.index_file(&format!("module_{i}.py"));
    }

    c.bench_function("reindex_unchanged_50_files", |b| {
        b.iter(|| {
            for i in 0..50 {
                black_box(indexer.index_file(&format!("module_{i}.py")));
            }
        });
    });
}

criterion_group!(benches, bench_extract_python, bench_index_project, bench_unchanged_reindex);
criterion_main!(benches);
