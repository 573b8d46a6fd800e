use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nalgebra::SVector;
use rand::rngs::StdRng;
use rand::SeedableRng;

use smc_filters::resampling::{FastMultinomial, Multinomial, Resampler, Stratified, Systematic};

fn make_particles<const N: usize>() -> ([SVector<f64, 4>; N], [f64; N]) {
    let particles: [SVector<f64, 4>; N] =
        std::array::from_fn(|i| SVector::from([i as f64, -(i as f64), 0.0, 1.0]));
    let log_weights: [f64; N] = std::array::from_fn(|i| -((i as f64) * 0.01));
    (particles, log_weights)
}

fn bench_resamplers(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0);

    c.bench_function("multinomial_n1000", |b| {
        let (mut particles, mut weights) = make_particles::<1000>();
        b.iter(|| {
            Multinomial.resample(black_box(&mut particles), black_box(&mut weights), &mut rng);
        })
    });

    c.bench_function("stratified_n1000", |b| {
        let (mut particles, mut weights) = make_particles::<1000>();
        b.iter(|| {
            Stratified.resample(black_box(&mut particles), black_box(&mut weights), &mut rng);
        })
    });

    c.bench_function("systematic_n1000", |b| {
        let (mut particles, mut weights) = make_particles::<1000>();
        b.iter(|| {
            Systematic.resample(black_box(&mut particles), black_box(&mut weights), &mut rng);
        })
    });

    c.bench_function("fast_multinomial_n1000", |b| {
        let (mut particles, mut weights) = make_particles::<1000>();
        b.iter(|| {
            FastMultinomial.resample(black_box(&mut particles), black_box(&mut weights), &mut rng);
        })
    });
}

criterion_group!(benches, bench_resamplers);
criterion_main!(benches);
