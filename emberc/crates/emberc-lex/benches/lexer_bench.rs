use criterion::{black_box, criterion_group, criterion_main, Criterion};
use emberc_lex::scan;

fn bench_scan(c: &mut Criterion) {
    let mut source = String::new();
    for i in 0..200 {
        source.push_str(&format!(
            "let v{i} = {i} * 3 + 1;\nlog(\"v{i}=${{v{i}}}\");\n"
        ));
    }

    c.bench_function("scan_200_statements", |b| {
        b.iter(|| scan(black_box(&source)))
    });

    c.bench_function("scan_operators", |b| {
        let ops = "1 + 2 * 3 - 4 / 5 % 6 <= 7 >= 8 != 9 == 10 ".repeat(64);
        b.iter(|| scan(black_box(&ops)))
    });
}

criterion_group!(benches, bench_scan);
criterion_main!(benches);
