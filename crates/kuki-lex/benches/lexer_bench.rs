//! Lexer benchmarks.
//!
//! Run with: `cargo bench --package kuki-lex`

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use kuki_lex::tokenize;
use kuki_util::{FileId, Handler};

fn token_count(source: &str) -> usize {
    let handler = Handler::new();
    tokenize(source, FileId::DUMMY, &handler).len()
}

fn bench_lexer_simple(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexer");

    let source = "result := fetch(url)\n    |> parse()\n    onerr return error \"bad\"\n";
    group.throughput(Throughput::Bytes(source.len() as u64));

    group.bench_function("declaration", |b| {
        b.iter(|| token_count(black_box("x := 42\n")))
    });

    group.bench_function("pipe_chain", |b| {
        b.iter(|| token_count(black_box(source)))
    });

    group.finish();
}

fn bench_lexer_function(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexer_function");

    let source = "\
petiole demo

func Fibonacci(n int) int
    if n <= 1
        return n
    return Fibonacci(n - 1) + Fibonacci(n - 2)

func Classify(cmd string) int
    switch cmd
        when \"quit\", \"exit\"
            return 0
        when \"help\"
            return 1
        otherwise
            return 2
";
    group.throughput(Throughput::Bytes(source.len() as u64));
    group.bench_function("whole_module", |b| {
        b.iter(|| token_count(black_box(source)))
    });

    group.finish();
}

criterion_group!(benches, bench_lexer_simple, bench_lexer_function);
criterion_main!(benches);
