use criterion::BenchmarkId;
use criterion::Criterion;
use criterion::Throughput;
use criterion::{criterion_group, criterion_main};
mod time_common;
use time_common::{additive_fn, integrated_fn, polynomial_fn};

fn bench_additive(c: &mut Criterion) {
    let nparties = 4;
    let min_e = 3;
    let max_e = 6;

    let mut group = c.benchmark_group("additive_time");
    for e in min_e..=max_e {
        let size: usize = 1 << e;
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(size),
            &size,
            additive_fn(nparties),
        );
    }
    group.finish();
}

fn bench_integrated(c: &mut Criterion) {
    let nparties = 4;
    let min_e = 3;
    let max_e = 6;

    let mut group = c.benchmark_group("integrated_time");
    for e in min_e..=max_e {
        let size: usize = 1 << e;
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(size),
            &size,
            integrated_fn(nparties),
        );
    }
    group.finish();
}

fn bench_polynomial(c: &mut Criterion) {
    let nparties = 4;
    let min_e = 3;
    let max_e = 7;

    let mut group = c.benchmark_group("polynomial_time");
    for e in min_e..=max_e {
        let size: usize = 1 << e;
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(size),
            &size,
            polynomial_fn(nparties),
        );
    }
    group.finish();
}

fn bench_num_parties(c: &mut Criterion) {
    let set_size = 16;

    let mut group = c.benchmark_group("num_parties_time");
    for nparties in 3..=7 {
        group.bench_with_input(
            BenchmarkId::new("additive", nparties),
            &set_size,
            additive_fn(nparties),
        );
        group.bench_with_input(
            BenchmarkId::new("integrated", nparties),
            &set_size,
            integrated_fn(nparties),
        );
        group.bench_with_input(
            BenchmarkId::new("polynomial", nparties),
            &set_size,
            polynomial_fn(nparties),
        );
    }
    group.finish();
}

criterion_group!(
    name = time_benches;
    config = Criterion::default().sample_size(10);
    targets = bench_additive, bench_integrated, bench_polynomial, bench_num_parties
);
criterion_main!(time_benches);

// cargo bench additive_time
// cargo bench integrated_time
// cargo bench polynomial_time
// cargo bench num_parties_time
