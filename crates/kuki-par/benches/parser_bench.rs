//! Parser benchmarks.
//!
//! Run with: `cargo bench --package kuki-par`

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use kuki_lex::tokenize;
use kuki_par::parse;
use kuki_util::{FileId, Handler};

fn decl_count(source: &str) -> usize {
    let handler = Handler::new();
    let tokens = tokenize(source, FileId::DUMMY, &handler);
    parse(tokens, &handler).decls.len()
}

fn bench_parser(c: &mut Criterion) {
    let mut group = c.benchmark_group("parser");

    let module = "\
petiole bench

type Repo
    Name string
    Stars int

func Classify(cmd string) int
    switch cmd
        when \"quit\", \"exit\"
            return 0
        otherwise
            return 1

func Top(repos list of Repo) list of Repo
    active := repos |> Filter(r => r.Stars > 100)
    return active
";
    group.throughput(Throughput::Bytes(module.len() as u64));

    group.bench_function("expression", |b| {
        b.iter(|| decl_count(black_box("x := a + b * c equals d and e\n")))
    });

    group.bench_function("whole_module", |b| {
        b.iter(|| decl_count(black_box(module)))
    });

    group.finish();
}

criterion_group!(benches, bench_parser);
criterion_main!(benches);
