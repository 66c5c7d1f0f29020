use criterion::{criterion_group, criterion_main, Criterion};
use env_logger::{Builder, Env};
use envsearch_entropy::testing::KernelSurrogate;
use envsearch_entropy::{
    AnalyticEntropyEngine, Entropy, EntropyEngine, EntropyMc, MonteCarloEntropyEngine,
    ENVSEARCH_LOG,
};
use ndarray::{array, Array, Array1, Array2, Axis};
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand_xoshiro::Xoshiro256Plus;
use std::sync::Arc;

fn ackley_surrogate(xlimits: &Array2<f64>, nt: usize) -> Arc<KernelSurrogate> {
    let mut rng = Xoshiro256Plus::seed_from_u64(42);
    let unit: Array2<f64> = Array::random_using((nt, xlimits.nrows()), Uniform::new(0., 1.), &mut rng);
    let xt = unit * (&xlimits.column(1) - &xlimits.column(0)) + xlimits.column(0);
    let yt: Array1<f64> = xt.map_axis(Axis(1), |x| argmin_testfunctions::ackley(&x.to_vec()));
    Arc::new(KernelSurrogate::new(&xt, &yt, array![0.5, 0.5], 4., 1e-6).expect("surrogate"))
}

fn criterion_entropy(c: &mut Criterion) {
    let env = Env::new().filter_or(ENVSEARCH_LOG, "error");
    let mut builder = Builder::from_env(env);
    let builder = builder.target(env_logger::Target::Stdout);
    builder.try_init().ok();

    let xlimits = array![[-2., 2.], [-2., 2.]];
    let model = ackley_surrogate(&xlimits, 15);
    let x = array![[0.5, -0.3]];

    let mut group = c.benchmark_group("entropy");
    group.sample_size(10);
    group.bench_function("analytic update", |b| {
        b.iter(|| {
            let mut engine =
                Entropy::new(Entropy::params(&xlimits).n_representer(30).seed(42)).expect("engine");
            engine.update(model.clone()).expect("update");
            std::hint::black_box(engine)
        })
    });

    let mut engine = Entropy::new(Entropy::params(&xlimits).seed(42)).expect("engine");
    engine.update(model.clone()).expect("update");
    group.bench_function("analytic compute", |b| {
        b.iter(|| std::hint::black_box(engine.compute(&x.view(), false).expect("compute")))
    });

    let mut engine = EntropyMc::new(EntropyMc::params(&xlimits).seed(42)).expect("engine");
    engine.update(model).expect("update");
    let f = engine.state().f.clone();
    group.bench_function("mc change pmin", |b| {
        b.iter(|| {
            std::hint::black_box(
                engine
                    .change_pmin_by_innovation(&x.view(), &f.view())
                    .expect("pmin"),
            )
        })
    });
    group.finish();
}

criterion_group!(benches, criterion_entropy);
criterion_main!(benches);
