use criterion::{black_box, criterion_group, criterion_main, Criterion};
use emberc_util::Handler;
use emberc_vm::Vm;

fn compile(source: &str) -> (emberc_byt::ByteCode, emberc_util::StringTable) {
    let mut handler = Handler::quiet();
    let mut ast = emberc_par::parse(emberc_lex::scan(source), &mut handler).expect("parse");
    assert!(emberc_sem::check(&mut ast, &mut handler));
    emberc_gen::emit(&ast).expect("emit")
}

fn bench_execute(c: &mut Criterion) {
    let mut arithmetic = String::new();
    for i in 0..200 {
        arithmetic.push_str(&format!("log({i} * 3 + {i} % 7 - 1);\n"));
    }

    c.bench_function("execute_200_arithmetic_logs", |b| {
        b.iter(|| {
            let (code, strings) = compile(black_box(&arithmetic));
            let mut vm = Vm::with_output(code, strings, Vec::new());
            vm.execute().unwrap();
        })
    });

    let mut concat = String::new();
    for i in 0..100 {
        concat.push_str(&format!("log(\"item ${{{i}}}=\" + {i});\n"));
    }

    c.bench_function("execute_100_string_logs", |b| {
        b.iter(|| {
            let (code, strings) = compile(black_box(&concat));
            let mut vm = Vm::with_output(code, strings, Vec::new());
            vm.execute().unwrap();
        })
    });
}

criterion_group!(benches, bench_execute);
criterion_main!(benches);
