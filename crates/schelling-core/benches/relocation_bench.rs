use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use schelling_core::{SchellingConfig, Simulation, mean_similarity};
use std::time::Duration;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse::<T>().ok())
        .unwrap_or(default)
}

fn bench_relocation(c: &mut Criterion) {
    let mut group = c.benchmark_group("relocation");
    let samples: usize = env_or("SCHELLING_BENCH_SAMPLES", 20_usize).max(10);
    group.sample_size(samples);
    group.warm_up_time(Duration::from_secs(env_or("SCHELLING_BENCH_WARMUP_SECS", 2)));
    group.measurement_time(Duration::from_secs(env_or("SCHELLING_BENCH_MEASURE_SECS", 8)));
    let passes: u32 = env_or("SCHELLING_BENCH_PASSES", 10_u32).max(1);
    let sides: Vec<u32> = std::env::var("SCHELLING_BENCH_SIDES")
        .ok()
        .map(|s| {
            s.split(',')
                .filter_map(|t| t.trim().parse::<u32>().ok())
                .collect::<Vec<_>>()
        })
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| vec![50_u32, 100, 200]);

    for &side in &sides {
        group.bench_function(format!("passes{passes}_side{side}"), |b| {
            b.iter_batched(
                || {
                    let config = SchellingConfig {
                        width: side,
                        height: side,
                        similarity_threshold: 0.6,
                        n_iterations: passes,
                        rng_seed: Some(0xBEEF_u64),
                        ..SchellingConfig::default()
                    };
                    Simulation::new(config).expect("simulation")
                },
                |mut sim| {
                    for _ in 0..passes {
                        sim.step().expect("pass");
                    }
                    sim
                },
                BatchSize::LargeInput,
            );
        });
    }

    for &side in &sides {
        let sim = Simulation::new(SchellingConfig {
            width: side,
            height: side,
            rng_seed: Some(0xFACE_u64),
            ..SchellingConfig::default()
        })
        .expect("simulation");
        group.bench_function(format!("similarity_side{side}"), |b| {
            b.iter(|| mean_similarity(sim.grid()).expect("similarity"));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_relocation);
criterion_main!(benches);
