use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nalgebra::SVector;
use rand::rngs::StdRng;

use smc_filters::config::FilterConfig;
use smc_filters::dists::Normal;
use smc_filters::filters::BootstrapFilter;
use smc_filters::resampling::Multinomial;
use smc_filters::traits::BootstrapModel;

struct LinearGaussian {
    process_std: f64,
    obs_std: f64,
}

impl BootstrapModel<1, 1> for LinearGaussian {
    fn sample_mu(&self, rng: &mut StdRng) -> SVector<f64, 1> {
        SVector::new(Normal::new(0.0, 1.0).unwrap().sample(rng))
    }
    fn sample_f(&self, xtm1: &SVector<f64, 1>, rng: &mut StdRng) -> SVector<f64, 1> {
        SVector::new(Normal::new(xtm1[0], self.process_std).unwrap().sample(rng))
    }
    fn log_g(&self, yt: &SVector<f64, 1>, xt: &SVector<f64, 1>) -> f64 {
        Normal::new(xt[0], self.obs_std).unwrap().log_density(yt[0])
    }
}

fn bench_bootstrap_filter(c: &mut Criterion) {
    c.bench_function("bootstrap_filter_step_n5000", |b| {
        let model = LinearGaussian {
            process_std: 0.2,
            obs_std: 0.3,
        };
        let config = FilterConfig::new(1, Some(1)).unwrap();
        let mut filter: BootstrapFilter<_, _, 5000, 1, 1> =
            BootstrapFilter::new(model, Multinomial, config);

        b.iter(|| {
            filter.filter::<fn(&SVector<f64, 1>) -> nalgebra::DMatrix<f64>>(
                black_box(&SVector::new(0.5)),
                &[],
            );
        })
    });
}

criterion_group!(benches, bench_bootstrap_filter);
criterion_main!(benches);
