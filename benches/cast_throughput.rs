//! Cast throughput: forwarding bypass vs fast path vs general pipeline
//!
//! Run with: cargo bench

use argcast::config::CastSettings;
use argcast::pipeline::{ArgumentCast, Chain, Filter, PipelineBuilder};
use argcast::types::{Logical, Value, VectorData};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn flag_chain() -> Chain {
    PipelineBuilder::new()
        .as_logical_vector()
        .find_first_or(Value::Logical(Logical::Na))
        .as_boolean()
        .build()
}

fn count_chain() -> Chain {
    PipelineBuilder::new()
        .return_if(Filter::null(), |b| b.map_to(Value::Integer(0)))
        .as_integer_vector()
        .find_first()
        .must_not_be_na()
        .must_be(Filter::ge(Value::Integer(0)))
        .build()
}

fn cast_with(chain: Chain, forwarding: bool, fast_path: bool) -> ArgumentCast {
    let settings = CastSettings {
        forwarding,
        fast_path,
        ..CastSettings::default()
    };
    match ArgumentCast::new("x", chain, settings) {
        Ok(cast) => cast,
        Err(e) => panic!("benchmark pipeline failed to compile: {}", e),
    }
}

fn bench_routes(c: &mut Criterion) {
    let mut group = c.benchmark_group("flag_cast");
    let input = Value::Logical(Logical::True);

    for (label, forwarding, fast_path) in [
        ("forwarded", true, true),
        ("fast_path", false, true),
        ("pipeline", false, false),
    ] {
        let cast = cast_with(flag_chain(), forwarding, fast_path);
        // Warm the lazily computed analysis and descriptor
        let _ = cast.cast(input.clone());
        group.bench_with_input(BenchmarkId::from_parameter(label), &input, |b, input| {
            b.iter(|| cast.cast(black_box(input.clone())))
        });
    }

    group.finish();
}

fn bench_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("count_cast");
    let inputs = [
        ("scalar", Value::Integer(12)),
        ("vector", Value::vector(VectorData::Integer(vec![12]))),
        ("null", Value::Null),
        ("string", Value::string("12")),
    ];
    let cast = cast_with(count_chain(), true, true);

    for (label, input) in inputs.iter() {
        group.bench_with_input(BenchmarkId::new("dispatch", label), input, |b, input| {
            b.iter(|| cast.cast(black_box(input.clone())))
        });
        group.bench_with_input(BenchmarkId::new("general", label), input, |b, input| {
            b.iter(|| cast.cast_general(black_box(input.clone())))
        });
    }

    group.finish();
}

fn bench_analysis(c: &mut Criterion) {
    let mut group = c.benchmark_group("forwarding_analysis");

    for k in [0usize, 2, 4, 8] {
        let mut builder = PipelineBuilder::new();
        for _ in 0..k {
            builder = builder.map_if(Filter::null(), |t| t.map_to(Value::Integer(1)), |f| f);
        }
        let chain = builder.as_integer_vector().find_first().build();
        group.bench_with_input(BenchmarkId::from_parameter(k), &chain, |b, chain| {
            b.iter(|| argcast::pipeline::analyze(black_box(chain), 16))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_routes, bench_count, bench_analysis);
criterion_main!(benches);
