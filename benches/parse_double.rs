use criterion::{black_box, criterion_group, criterion_main, Criterion};
use geoshape::number::{format_f64, parse_f64};

fn create_data() -> Vec<String> {
    let mut state = 0x2545_f491_4f6c_dd1du64;
    (0..1000)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let value = f64::from_bits(state >> 2);
            format_f64(value)
        })
        .collect()
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let data = create_data();
    let short = ["0.0", "12", "-3.25", "51.5074", "1572.15", "8982000"];

    c.bench_function("parse_f64 shortest round-trip text", |b| {
        b.iter(|| {
            for text in &data {
                let _ = black_box(parse_f64(text));
            }
        })
    });
    c.bench_function("lexical_core::parse shortest round-trip text", |b| {
        b.iter(|| {
            for text in &data {
                let _ = black_box(lexical_core::parse::<f64>(text.as_bytes()));
            }
        })
    });
    c.bench_function("parse_f64 attribute values", |b| {
        b.iter(|| {
            for text in short {
                let _ = black_box(parse_f64(text));
            }
        })
    });
    c.bench_function("format_f64", |b| {
        b.iter(|| {
            for i in 1..1000 {
                let _ = black_box(format_f64(i as f64 / 7.0));
            }
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
