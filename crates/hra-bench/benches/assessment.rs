//! Criterion benchmarks for whole assessments.

use std::hint::black_box;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use hra_bench::{reference_profile, stress_profile, Profile};
use hra_core::Geoprocessor;
use hra_engine::{Assessment, RunConfig, SchedulePolicy, WorkerConfig};
use hra_geo::GridGeoprocessor;

fn run(profile: &Profile, n_workers: usize, schedule: SchedulePolicy) {
    let config = RunConfig {
        workers: WorkerConfig {
            n_workers: Some(n_workers),
        },
        schedule,
        ..RunConfig::default()
    };
    let geo: Arc<dyn Geoprocessor> = Arc::new(GridGeoprocessor::new());
    let assessment = Assessment::prepare(profile.inputs.clone(), config).unwrap();
    let out = assessment.run(profile.store(), geo).unwrap();
    black_box(&out);
}

fn bench_assessment_10k(c: &mut Criterion) {
    let profile = reference_profile(42);
    c.bench_function("assessment_10k_inline", |b| {
        b.iter(|| run(&profile, 0, SchedulePolicy::FanIn));
    });
    c.bench_function("assessment_10k_4_workers", |b| {
        b.iter(|| run(&profile, 4, SchedulePolicy::FanIn));
    });
    c.bench_function("assessment_10k_4_workers_barriers", |b| {
        b.iter(|| run(&profile, 4, SchedulePolicy::JoinBarriers));
    });
}

fn bench_assessment_100k(c: &mut Criterion) {
    let profile = stress_profile(42);
    let mut group = c.benchmark_group("assessment_100k");
    group.sample_size(10);
    group.bench_function("4_workers", |b| {
        b.iter(|| run(&profile, 4, SchedulePolicy::FanIn));
    });
    group.finish();
}

criterion_group!(benches, bench_assessment_10k, bench_assessment_100k);
criterion_main!(benches);
