use std::fs;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use golfcart::{interpreter, parser};

const WORKLOADS: [(&str, &str); 2] = [
    ("fib", "tests/programs/fib/program.golf"),
    ("containers", "tests/programs/containers/program.golf"),
];

fn bench_interpreter(c: &mut Criterion) {
    for (label, path) in WORKLOADS {
        let source = fs::read_to_string(path).unwrap_or_else(|err| panic!("read {path}: {err}"));

        c.bench_function(&format!("frontend_{label}"), |b| {
            b.iter(|| {
                let program = parser::parse_source(black_box(&source)).expect("parse");
                black_box(program);
            })
        });

        c.bench_function(&format!("run_{label}"), |b| {
            b.iter(|| {
                let mut sink: Vec<u8> = Vec::new();
                let printed =
                    interpreter::run_program(black_box(&source), &mut sink).expect("run");
                black_box((printed, sink));
            })
        });
    }
}

criterion_group!(benches, bench_interpreter);
criterion_main!(benches);
