//! Criterion benchmarks for the aura accumulator.
//!
//! Benchmarks:
//!   - apply_aura for a single two-ring source
//!   - re-apply of an existing source (retract + project)
//!   - remove_aura with 64 overlapping sources live
//!   - value() lookups across a 64x64 patch
//!
//! Run with: cargo bench --bench aura_bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use lifeon_sim::city::environment::{CityEnvironment, Ring};
use lifeon_sim::core::types::{AuraCategory, Cell, Vec2};

const RINGS: [Ring; 2] = [Ring::new(6, 2), Ring::new(10, 1)];

fn populated(sources: i32) -> CityEnvironment {
    let mut env = CityEnvironment::new();
    for i in 0..sources {
        let center = Vec2::new((i % 8 * 8) as f32, (i / 8 * 8) as f32);
        env.apply_aura(format!("s{}", i), center, i % 2 == 0, AuraCategory::Security, &RINGS);
    }
    env
}

fn bench_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("aura_apply");

    group.bench_function("fresh_source", |b| {
        b.iter(|| {
            let mut env = CityEnvironment::new();
            let center = black_box(Vec2::new(0.0, 0.0));
            env.apply_aura("s", center, false, AuraCategory::Security, &RINGS);
            black_box(env)
        });
    });

    let mut env = populated(64);
    group.bench_function("reapply_existing", |b| {
        b.iter(|| {
            let center = black_box(Vec2::new(16.0, 8.0));
            env.apply_aura("s10", center, false, AuraCategory::Security, &RINGS);
        });
    });

    group.finish();
}

fn bench_remove(c: &mut Criterion) {
    let mut group = c.benchmark_group("aura_remove");

    group.bench_function("remove_with_64_live", |b| {
        b.iter_batched(
            || populated(64),
            |mut env| {
                env.remove_aura(black_box("s27"));
                env
            },
            criterion::BatchSize::LargeInput,
        );
    });

    group.finish();
}

fn bench_lookup(c: &mut Criterion) {
    let env = populated(64);
    c.bench_function("aura_value_64x64", |b| {
        b.iter(|| {
            let mut sum = 0u32;
            for y in 0..64 {
                for x in 0..64 {
                    sum += env.value(Cell::new(x, y), AuraCategory::Security);
                }
            }
            black_box(sum)
        });
    });
}

criterion_group!(benches, bench_apply, bench_remove, bench_lookup);
criterion_main!(benches);
