//! Cost-aware selection loop on a synthetic multi-fidelity objective.
//!
//! The second variable is the fidelity `s` in [0, 1]: evaluations get more
//! accurate and more expensive as `s` grows. Run with
//! `ENVSEARCH_LOG=info cargo run --example fidelity`.
use anyhow::Result;
use env_logger::{Builder, Env};
use envsearch::{CostModel, EnvEntropySearch, ENVSEARCH_LOG};
use envsearch_entropy::testing::KernelSurrogate;
use envsearch_entropy::Entropy;
use log::info;
use ndarray::{array, concatenate, Array, Array1, Array2, ArrayView1, ArrayView2, Axis};
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use ndarray_stats::QuantileExt;
use rand_xoshiro::Xoshiro256Plus;
use std::sync::Arc;

/// Sphere in x shifted by a fidelity dependent bias
fn objective(x: &ArrayView1<f64>) -> f64 {
    let bias = 0.3 * (1. - x[1]);
    argmin_testfunctions::sphere(&[x[0] - 0.2 + bias])
}

struct FidelityCost;

impl CostModel for FidelityCost {
    fn predict(&self, x: &ArrayView2<f64>) -> envsearch::Result<Array1<f64>> {
        Ok(x.column(1).mapv(|s| 1.5 + 20. * s * s))
    }
}

fn main() -> Result<()> {
    let env = Env::new().filter_or(ENVSEARCH_LOG, "info");
    let mut builder = Builder::from_env(env);
    let builder = builder.target(env_logger::Target::Stdout);
    builder.try_init().ok();

    let xlimits = array![[-1., 1.], [0., 1.]];
    let mut rng = Xoshiro256Plus::seed_from_u64(0);
    let mut xt = array![[-0.8, 0.1], [0., 0.1], [0.7, 0.1], [0.5, 1.]];
    let mut yt: Array1<f64> = xt.map_axis(Axis(1), |x| objective(&x));

    let params = Entropy::params(&xlimits).n_representer(20).seed(42);
    let mut acq = EnvEntropySearch::analytic(params, array![false, true])?;
    let cost = Arc::new(FidelityCost);
    let mut spent = 0.;

    for iter in 0..5 {
        let model = KernelSurrogate::new(&xt, &yt, array![0.4, 0.8], 1., 1e-6)?;
        acq.update(Arc::new(model), cost.clone())?;

        let unit: Array2<f64> = Array::random_using((200, 2), Uniform::new(0., 1.), &mut rng);
        let candidates = unit * (&xlimits.column(1) - &xlimits.column(0)) + xlimits.column(0);
        let values = acq.score(&candidates)?;
        let best = values.column(0).argmax()?;
        let x_next = candidates.row(best).to_owned();
        let y_next = objective(&x_next.view());
        spent += cost.predict(&x_next.view().insert_axis(Axis(0)))?[0];
        info!(
            "Iteration {iter}: x = {x_next}, y = {y_next:.4}, acquisition = {:.4}, total cost = {spent:.1}",
            values[[best, 0]]
        );

        xt = concatenate![Axis(0), xt, x_next.insert_axis(Axis(0))];
        yt = concatenate![Axis(0), yt, array![y_next]];
    }
    println!("Evaluated points:\n{xt}\nValues: {yt}");
    Ok(())
}
