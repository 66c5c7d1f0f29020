use crate::engine::{EntropyEngine, MonteCarloEntropyEngine};
use crate::errors::{EntropyError, Result};
use crate::innovation::gp_innovation_local;
use crate::parameters::{EntropyParams, EntropyValidParams, DEFAULT_MC_N_REPRESENTER};
use crate::representers::sample_representer_points;
use crate::state::EntropyState;
use crate::surrogates::SurrogateModel;
use crate::utils::{outer, robust_cholesky};
use linfa::ParamGuard;
use linfa_linalg::triangular::*;
use log::{debug, info};
use ndarray::parallel::prelude::*;
use ndarray::{Array, Array1, Array2, ArrayView2, Axis, Zip};
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::StandardNormal;
use ndarray_rand::RandomExt;
use ndarray_stats::QuantileExt;
use rand_xoshiro::Xoshiro256Plus;
use std::sync::Arc;

/// Lower bound of minimizer probabilities estimated by counting
pub const PMIN_FLOOR: f64 = 1e-70;

/// Probability for each row of `f` to hold the minimum, estimated over
/// its columns taken as function samples.
///
/// Columns containing NaN are not counted. Probabilities are floored at [`PMIN_FLOOR`].
pub fn compute_pmin(f: &ArrayView2<f64>) -> Array1<f64> {
    let mut counts = Array1::<f64>::zeros(f.nrows());
    for col in f.columns() {
        if let Ok(i) = col.argmin() {
            counts[i] += 1.;
        }
    }
    let n = f.ncols().max(1) as f64;
    counts.mapv(|c| (c / n).max(PMIN_FLOOR))
}

/// Entropy search engine estimating the minimizer distribution by sampling.
///
/// `n_func_samples` joint posterior samples at representer points give `pmin`
/// by counting minima. An observation at `x` is fantasized by shifting those
/// samples for `n_hals_vals` standard normal outcomes of the observation while
/// shrinking their spread to the updated posterior covariance.
pub struct EntropyMc {
    params: EntropyValidParams,
    model: Option<Arc<dyn SurrogateModel>>,
    rng: Xoshiro256Plus,
    state: EntropyState,
    /// posterior mean at representer points
    mb: Array1<f64>,
    /// posterior covariance at representer points
    vb: Array2<f64>,
    /// lower cholesky factor of `vb`
    cvb: Array2<f64>,
    /// innovation outcomes
    w: Array1<f64>,
}

impl EntropyMc {
    /// Default parameters of the Monte-Carlo engine within `xlimits` (nx, 2)
    pub fn params(xlimits: &Array2<f64>) -> EntropyParams {
        EntropyParams::new(xlimits, DEFAULT_MC_N_REPRESENTER)
    }

    /// Build the engine, no surrogate is attached until [`EntropyEngine::update`]
    pub fn new(params: EntropyParams) -> Result<Self> {
        let params = params.check()?;
        let rng = match params.seed() {
            Some(seed) => Xoshiro256Plus::seed_from_u64(seed),
            None => Xoshiro256Plus::from_entropy(),
        };
        Ok(EntropyMc {
            params,
            model: None,
            rng,
            state: EntropyState::default(),
            mb: Array1::zeros(0),
            vb: Array2::zeros((0, 0)),
            cvb: Array2::zeros((0, 0)),
            w: Array1::zeros(0),
        })
    }

    /// Validated parameters
    pub fn parameters(&self) -> &EntropyValidParams {
        &self.params
    }

    fn model(&self) -> Result<&dyn SurrogateModel> {
        self.model.as_deref().ok_or(EntropyError::NotUpdated)
    }
}

impl EntropyEngine for EntropyMc {
    fn name(&self) -> &'static str {
        "EntropyMc"
    }

    fn xlimits(&self) -> &Array2<f64> {
        self.params.xlimits()
    }

    fn set_model(&mut self, model: Arc<dyn SurrogateModel>) {
        self.model = Some(model);
    }

    fn update_representer_points(&mut self) -> Result<()> {
        let model = self.model.clone().ok_or(EntropyError::NotUpdated)?;
        let points = sample_representer_points(model.as_ref(), &self.params, &mut self.rng)?;
        self.state.zb = points.zb;
        self.state.lmb = points.lmb;
        Ok(())
    }

    fn representer_points(&self) -> &Array2<f64> {
        &self.state.zb
    }

    fn representer_points_mut(&mut self) -> &mut Array2<f64> {
        &mut self.state.zb
    }

    fn refresh(&mut self) -> Result<()> {
        let nb = self.state.n_representer();
        if nb == 0 {
            return Err(EntropyError::NotUpdated);
        }
        let model = self.model.clone().ok_or(EntropyError::NotUpdated)?;
        let zb = self.state.zb.view();
        let (mb, _) = model.predict_valvar(&zb)?;
        let vb = model.predict_covariance(&zb, &zb)?;
        let cvb = robust_cholesky(&vb)?;

        let draws: Array2<f64> = Array::random_using(
            (nb, self.params.n_func_samples()),
            StandardNormal,
            &mut self.rng,
        );
        self.w = Array::random_using(self.params.n_hals_vals(), StandardNormal, &mut self.rng);
        let f = cvb.dot(&draws) + mb.view().insert_axis(Axis(1));

        self.state.pmin = compute_pmin(&f.view());
        self.state.log_p = self.state.pmin.mapv(f64::ln);
        self.state.f = f;
        self.mb = mb;
        self.vb = vb;
        self.cvb = cvb;
        info!(
            "{} belief refreshed over {} representer points (entropy term {:.4})",
            self.name(),
            nb,
            self.state.entropy_term()
        );
        Ok(())
    }
}

impl MonteCarloEntropyEngine for EntropyMc {
    fn state(&self) -> &EntropyState {
        &self.state
    }

    fn change_pmin_by_innovation(
        &self,
        x: &ArrayView2<f64>,
        f: &ArrayView2<f64>,
    ) -> Result<Array1<f64>> {
        let model = self.model()?;
        let nx = self.params.xlimits().nrows();
        if x.ncols() != nx {
            return Err(EntropyError::InvalidDimension {
                expected: nx,
                actual: x.ncols(),
            });
        }
        let nb = self.state.n_representer();
        if f.nrows() != nb || f.ncols() == 0 {
            return Err(EntropyError::InvalidValueError(format!(
                "function samples of shape {:?} given for {} representer points",
                f.shape(),
                nb
            )));
        }

        let lx = gp_innovation_local(model, &self.state.zb, x)?;
        let mut vb_new = &self.vb - &outer(&lx, &lx);
        vb_new.diag_mut().mapv_inplace(|v| v.max(f64::EPSILON));
        vb_new.mapv_inplace(|v| if v.abs() < f64::EPSILON { 0. } else { v });
        let cvb_new = robust_cholesky(&vb_new)?;

        // standardized draws behind the given samples
        let mb = self.mb.view().insert_axis(Axis(1));
        let eps = self.cvb.solve_triangular(&(f - &mb), UPLO::Lower)?;
        let spread = cvb_new.dot(&eps) + mb;

        let ns = f.ncols();
        let mut fantasized = Array2::<f64>::zeros((nb, ns * self.w.len()));
        fantasized
            .axis_chunks_iter_mut(Axis(1), ns)
            .into_par_iter()
            .enumerate()
            .for_each(|(t, mut block)| {
                let wt = self.w[t];
                block.assign(&spread);
                Zip::from(block.rows_mut())
                    .and(&lx)
                    .for_each(|mut row, &l| row += l * wt);
            });
        debug!(
            "pmin fantasized over {} samples at {}",
            fantasized.ncols(),
            x.row(0)
        );
        Ok(compute_pmin(&fantasized.view()))
    }
}
