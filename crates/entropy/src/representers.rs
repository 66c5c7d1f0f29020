//! Representer points sampling.
//!
//! Representer points discretize the distribution of the minimizer location.
//! They are drawn from a measure favouring promising regions (log expected
//! improvement) with an affine invariant ensemble MCMC sampler
//! (Goodman & Weare stretch move), one walker per representer point.
use crate::errors::{EntropyError, Result};
use crate::incumbent::compute_incumbent;
use crate::parameters::EntropyValidParams;
use crate::surrogates::SurrogateModel;
use crate::utils::log_ei;
use log::debug;
use ndarray::{Array, Array1, Array2, ArrayView1, Axis};
use ndarray_rand::rand::Rng;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand_xoshiro::Xoshiro256Plus;

/// Log-density given to points where the surrogate variance vanishes,
/// keeps `lmb` finite
pub const LOG_DENSITY_FLOOR: f64 = -500.;
/// Stretch move scale parameter
const STRETCH_SCALE: f64 = 2.;

/// Representer points and log-density of the sampling measure at those points
#[derive(Clone, Debug)]
pub struct RepresenterPoints {
    /// Points as a (n_representer, nx) matrix
    pub zb: Array2<f64>,
    /// Log-density of the measure at each point (n_representer,)
    pub lmb: Array1<f64>,
}

/// Ensemble sampler of representer points within a box
#[derive(Clone, Debug)]
pub struct RepresenterSampler {
    xlimits: Array2<f64>,
    n_walkers: usize,
    n_steps: usize,
}

impl RepresenterSampler {
    /// Sampler of `n_walkers` points within `xlimits` (nx, 2)
    pub fn new(xlimits: &Array2<f64>, n_walkers: usize) -> Self {
        RepresenterSampler {
            xlimits: xlimits.to_owned(),
            n_walkers,
            n_steps: crate::parameters::DEFAULT_N_MCMC_STEPS,
        }
    }

    /// Set the number of sweeps over the ensemble
    pub fn n_steps(mut self, n_steps: usize) -> Self {
        self.n_steps = n_steps;
        self
    }

    fn contains(&self, x: &ArrayView1<f64>) -> bool {
        x.iter()
            .zip(self.xlimits.rows())
            .all(|(v, b)| b[0] <= *v && *v <= b[1])
    }

    /// Run the ensemble sampler on the given log-density.
    ///
    /// Walkers start uniformly within the box, proposals outside the box are rejected.
    pub fn sample<F>(&self, log_density: F, rng: &mut Xoshiro256Plus) -> Result<RepresenterPoints>
    where
        F: Fn(&ArrayView1<f64>) -> Result<f64>,
    {
        if self.n_walkers < 2 {
            return Err(EntropyError::InvalidValueError(format!(
                "stretch moves need at least 2 walkers, got {}",
                self.n_walkers
            )));
        }
        let nx = self.xlimits.nrows();
        let lower = self.xlimits.column(0);
        let upper = self.xlimits.column(1);
        let unit: Array2<f64> =
            Array::random_using((self.n_walkers, nx), Uniform::new(0., 1.), rng);
        let mut walkers = unit * (&upper - &lower) + lower;
        let mut logp = Array1::zeros(self.n_walkers);
        for (i, w) in walkers.rows().into_iter().enumerate() {
            logp[i] = log_density(&w)?;
        }

        let mut n_accepted = 0;
        for _ in 0..self.n_steps {
            for k in 0..self.n_walkers {
                let mut j = rng.gen_range(0..self.n_walkers - 1);
                if j >= k {
                    j += 1;
                }
                let u: f64 = rng.gen();
                let z = ((STRETCH_SCALE - 1.) * u + 1.).powi(2) / STRETCH_SCALE;
                let xj = walkers.row(j);
                let proposal = &xj + &((&walkers.row(k) - &xj) * z);
                if !self.contains(&proposal.view()) {
                    continue;
                }
                let lp = log_density(&proposal.view())?;
                let log_accept = (nx as f64 - 1.) * z.ln() + lp - logp[k];
                let r: f64 = rng.gen();
                if r.ln() < log_accept {
                    walkers.row_mut(k).assign(&proposal);
                    logp[k] = lp;
                    n_accepted += 1;
                }
            }
        }
        debug!(
            "Representer sampling acceptance rate {:.3}",
            n_accepted as f64 / (self.n_steps * self.n_walkers).max(1) as f64
        );
        Ok(RepresenterPoints {
            zb: walkers,
            lmb: logp,
        })
    }
}

/// Log expected improvement measure of the surrogate below `fmin`,
/// floored at [`LOG_DENSITY_FLOOR`]
pub fn log_ei_measure(model: &dyn SurrogateModel, x: &ArrayView1<f64>, fmin: f64) -> Result<f64> {
    let pt = x.insert_axis(Axis(0));
    let (mean, var) = model.predict_valvar(&pt)?;
    Ok(log_ei(mean[0], var[0], fmin)
        .map(|v| v.max(LOG_DENSITY_FLOOR))
        .unwrap_or(LOG_DENSITY_FLOOR))
}

/// Sample representer points of the `model` minimizer distribution
/// (unprojected) following `params`
pub(crate) fn sample_representer_points(
    model: &dyn SurrogateModel,
    params: &EntropyValidParams,
    rng: &mut Xoshiro256Plus,
) -> Result<RepresenterPoints> {
    let incumbent = compute_incumbent(model, params.xlimits(), params.incumbent(), rng)?;
    let fmin = incumbent.value;
    RepresenterSampler::new(params.xlimits(), params.n_representer())
        .n_steps(params.n_mcmc_steps())
        .sample(|x| log_ei_measure(model, x, fmin), rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::KernelSurrogate;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use ndarray_rand::rand::SeedableRng;

    #[test]
    fn test_sampler_stays_within_bounds() {
        let xlimits = array![[-1., 1.], [2., 3.]];
        let sampler = RepresenterSampler::new(&xlimits, 20).n_steps(50);
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        // standard gaussian centered in (0, 2.5)
        let res = sampler
            .sample(
                |x| Ok(-0.5 * (x[0] * x[0] + (x[1] - 2.5) * (x[1] - 2.5))),
                &mut rng,
            )
            .expect("sampling");
        assert_eq!(&[20, 2], res.zb.shape());
        assert_eq!(20, res.lmb.len());
        for (row, lmb) in res.zb.rows().into_iter().zip(res.lmb.iter()) {
            assert!((-1. ..=1.).contains(&row[0]));
            assert!((2. ..=3.).contains(&row[1]));
            let expected = -0.5 * (row[0] * row[0] + (row[1] - 2.5) * (row[1] - 2.5));
            assert_abs_diff_eq!(expected, *lmb, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_sampler_is_reproducible() {
        let xlimits = array![[0., 1.]];
        let sampler = RepresenterSampler::new(&xlimits, 5);
        let density = |x: &ArrayView1<f64>| Ok(-x[0]);
        let res1 = sampler
            .sample(density, &mut Xoshiro256Plus::seed_from_u64(1))
            .unwrap();
        let res2 = sampler
            .sample(density, &mut Xoshiro256Plus::seed_from_u64(1))
            .unwrap();
        assert_eq!(res1.zb, res2.zb);
    }

    #[test]
    fn test_sampler_needs_two_walkers() {
        let xlimits = array![[0., 1.]];
        let density = |x: &ArrayView1<f64>| Ok(-x[0]);
        for n in [0, 1] {
            let res = RepresenterSampler::new(&xlimits, n)
                .sample(density, &mut Xoshiro256Plus::seed_from_u64(0));
            assert!(matches!(res, Err(EntropyError::InvalidValueError(_))));
        }
    }

    #[test]
    fn test_log_ei_measure_floor() {
        let xt = array![[0.], [1.]];
        let yt = array![0., 1.];
        let gp = KernelSurrogate::new(&xt, &yt, array![0.5], 1., 0.).unwrap();
        // no uncertainty at training points
        let at_data = log_ei_measure(&gp, &array![1.].view(), 0.).unwrap();
        assert_abs_diff_eq!(LOG_DENSITY_FLOOR, at_data);
        let elsewhere = log_ei_measure(&gp, &array![0.5].view(), 0.).unwrap();
        assert!(elsewhere > LOG_DENSITY_FLOOR);
    }
}
