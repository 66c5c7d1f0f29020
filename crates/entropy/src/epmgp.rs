//! Expectation propagation approximation of the joint minimum distribution
//! of a multivariate gaussian (EPMGP).
//!
//! For `f ~ N(mu, sigma)` over a finite set of D points, computes for each point k
//! an approximation of `log P(f_k = min(f))` together with its derivatives with
//! respect to `mu` and `sigma`. Each probability is the gaussian mass of the
//! polyhedron `{f_k <= f_l, l != k}` approximated with D - 1 truncation factors
//! refined by expectation propagation sweeps.
//!
//! Reference: Cunningham, Hennig, Lacoste-Julien (2011), *Gaussian Probabilities
//! and Expectation Propagation*; Hennig, Schuler (2012), *Entropy Search for
//! Information-Efficient Global Optimization*.
use crate::errors::{EntropyError, Result};
use crate::utils::{log_relative_gauss, log_sum_exp, outer, robust_cholesky, RelativeGauss};
use linfa_linalg::triangular::*;
use log::{debug, trace};
use ndarray::{Array1, Array2, Array3, ArrayView1, ArrayView2, Axis, Zip};
use rayon::prelude::*;
use std::f64::consts::SQRT_2;

/// Log-probability given to a point when its EP approximation breaks down
pub const LOG_P_FAILURE: f64 = -500.;
/// Maximum number of EP sweeps over the truncation factors
const EP_MAX_SWEEPS: usize = 50;
/// EP damping factor (1 means no damping)
const GAMMA: f64 = 1.;

/// Approximate minimizer distribution with derivatives
#[derive(Clone, Debug)]
pub struct JointMin {
    /// `log P(f_k = min(f))`, normalized (D,)
    pub log_p: Array1<f64>,
    /// `d log_p[k] / d mu` as row k (D, D)
    pub dlogp_dmu: Array2<f64>,
    /// `d log_p[k] / d sigma` as matrix k (D, D, D), entries of sigma
    /// taken as independent variables
    pub dlogp_dsigma: Array3<f64>,
    /// `d2 log_p[k] / d mu2` as matrix k (D, D, D)
    pub d2logp_dmu2: Array3<f64>,
}

/// Gaussian message of one truncation factor in natural parameters
#[derive(Clone, Copy, Debug, Default)]
struct Message {
    /// precision
    p: f64,
    /// precision times mean
    mp: f64,
    log_s: f64,
}

/// log Z of one point and its derivatives, unnormalized
struct MinFactor {
    log_z: f64,
    grad: Array1<f64>,
    dsigma: Array2<f64>,
    hess: Array2<f64>,
}

/// Compute the approximate distribution of the minimizer of `f ~ N(mu, sigma)`
/// where `mu` is (D,) and `sigma` (D, D).
///
/// EP sweeps stop when the summed message changes fall below `tolerance`.
/// Points whose approximation fails get a log-probability of [`LOG_P_FAILURE`]
/// before normalization.
pub fn joint_min(mu: &ArrayView1<f64>, sigma: &ArrayView2<f64>, tolerance: f64) -> Result<JointMin> {
    let d = mu.len();
    if sigma.shape() != [d, d] {
        return Err(EntropyError::InvalidValueError(format!(
            "covariance of shape {:?} given for {} means",
            sigma.shape(),
            d
        )));
    }
    let factors = (0..d)
        .into_par_iter()
        .map(|k| min_factor(mu, sigma, k, tolerance))
        .collect::<Result<Vec<_>>>()?;

    let mut log_p = Array1::zeros(d);
    let mut dlogp_dmu = Array2::zeros((d, d));
    let mut dlogp_dsigma = Array3::zeros((d, d, d));
    let mut d2logp_dmu2 = Array3::zeros((d, d, d));
    let mut n_failures = 0;
    for (k, factor) in factors.into_iter().enumerate() {
        match factor {
            Some(f) if f.log_z.is_finite() => {
                log_p[k] = f.log_z;
                dlogp_dmu.row_mut(k).assign(&f.grad);
                dlogp_dsigma.index_axis_mut(Axis(0), k).assign(&f.dsigma);
                d2logp_dmu2.index_axis_mut(Axis(0), k).assign(&f.hess);
            }
            _ => {
                n_failures += 1;
                log_p[k] = LOG_P_FAILURE;
            }
        }
    }
    if n_failures > 0 {
        debug!("EP approximation failed for {n_failures}/{d} points");
    }

    // renormalization smoothing out numerical imbalances, derivatives follow
    let lse = log_sum_exp(&log_p.view());
    let weights = log_p.mapv(|v| (v - lse).exp());
    let mean_grad = weights.dot(&dlogp_dmu);
    let mut mean_dsigma = Array2::<f64>::zeros((d, d));
    let mut mean_second = Array2::<f64>::zeros((d, d));
    for k in 0..d {
        let w = weights[k];
        let g = dlogp_dmu.row(k);
        mean_dsigma.scaled_add(w, &dlogp_dsigma.index_axis(Axis(0), k));
        mean_second.scaled_add(w, &(&d2logp_dmu2.index_axis(Axis(0), k) + &outer(&g, &g)));
    }
    let hess_shift = outer(&mean_grad, &mean_grad) - mean_second;

    log_p.mapv_inplace(|v| v - lse);
    dlogp_dmu
        .rows_mut()
        .into_iter()
        .for_each(|mut row| row -= &mean_grad);
    dlogp_dsigma
        .outer_iter_mut()
        .for_each(|mut s| s -= &mean_dsigma);
    d2logp_dmu2
        .outer_iter_mut()
        .for_each(|mut h| h += &hess_shift);

    Ok(JointMin {
        log_p,
        dlogp_dmu,
        dlogp_dsigma,
        d2logp_dmu2,
    })
}

/// EP approximation of `log P(f_k <= f_l for all l)`.
/// Returns `None` when a truncation factor carries no mass.
fn min_factor(
    mu: &ArrayView1<f64>,
    sigma: &ArrayView2<f64>,
    k: usize,
    tolerance: f64,
) -> Result<Option<MinFactor>> {
    let d = mu.len();
    if d == 1 {
        return Ok(Some(MinFactor {
            log_z: 0.,
            grad: Array1::zeros(1),
            dsigma: Array2::zeros((1, 1)),
            hess: Array2::zeros((1, 1)),
        }));
    }
    let others = |i: usize| if i < k { i } else { i + 1 };

    let mut messages = vec![Message::default(); d - 1];
    let mut m = mu.to_owned();
    let mut v = sigma.to_owned();
    let mut converged = false;
    for sweep in 0..EP_MAX_SWEEPS {
        let mut diff = 0.;
        for (i, msg) in messages.iter_mut().enumerate() {
            match lt_factor(k, others(i), &mut m, &mut v, msg)? {
                Some(step) => diff += step.abs(),
                None => return Ok(None),
            }
        }
        if diff < tolerance {
            trace!("EP for point {k} converged after {} sweeps", sweep + 1);
            converged = true;
            break;
        }
    }
    if !converged {
        trace!("EP for point {k} not converged after {EP_MAX_SWEEPS} sweeps");
    }

    // column i of C is (e_l - e_k) / sqrt(2) with l the i-th other point
    let mut c = Array2::<f64>::zeros((d, d - 1));
    for i in 0..d - 1 {
        c[[others(i), i]] = 1. / SQRT_2;
        c[[k, i]] = -1. / SQRT_2;
    }
    let p = Array1::from_iter(messages.iter().map(|msg| msg.p));
    let mp = Array1::from_iter(messages.iter().map(|msg| msg.mp));
    let r_mat = &c * &p.mapv(f64::sqrt);
    let r = c.dot(&mp);
    let mpm: f64 = messages
        .iter()
        .filter(|msg| msg.mp != 0.)
        .map(|msg| msg.mp * msg.mp / msg.p)
        .sum();
    let log_s: f64 = messages.iter().map(|msg| msg.log_s).sum();

    let sigma_r = sigma.dot(&r_mat);
    let irsr = Array2::eye(d - 1) + r_mat.t().dot(&sigma_r);
    let chol = robust_cholesky(&irsr)?;
    let logdet = 2. * chol.diag().mapv(f64::ln).sum();
    // A = R (I + R^T sigma R)^-1 R^T = Y^T Y
    let y = chol.solve_triangular(&r_mat.t().to_owned(), UPLO::Lower)?;
    let a = y.t().dot(&y);
    let b = mu + &sigma.dot(&r);
    let ab = a.dot(&b);
    let rsr = r.dot(&sigma.dot(&r));

    let log_z = 0.5 * (rsr - b.dot(&ab) - logdet) + mu.dot(&r) + log_s - 0.5 * mpm;
    let grad = &r - &ab;
    let dsigma = 0.5 * (outer(&grad, &grad) - &a);
    Ok(Some(MinFactor {
        log_z,
        grad,
        dsigma,
        hess: -a,
    }))
}

/// One EP update of the message of the truncation factor `f_k <= f_l`,
/// updating the marginal mean `m` and covariance `v` in place.
/// Returns the largest change of the natural parameters, `None` when
/// the factor underflows.
fn lt_factor(
    k: usize,
    l: usize,
    m: &mut Array1<f64>,
    v: &mut Array2<f64>,
    msg: &mut Message,
) -> Result<Option<f64>> {
    let Message { p, mp, .. } = *msg;
    let cvc = (v[[l, l]] - 2. * v[[k, l]] + v[[k, k]]) / 2.;
    let vc = (&v.column(l) - &v.column(k)) / SQRT_2;
    let cm = (m[l] - m[k]) / SQRT_2;
    // cavity
    let cvnic = (cvc / (1. - p * cvc)).max(0.);
    let cmni = cm + cvnic * (p * cm - mp);
    let mut z = cmni / cvnic.sqrt();
    if z.is_nan() {
        z = f64::NEG_INFINITY;
    }

    let (dp, dmp) = match log_relative_gauss(z) {
        RelativeGauss::Underflow => return Ok(None),
        RelativeGauss::Saturated => {
            // remove the message
            *msg = Message::default();
            (-p, -mp)
        }
        RelativeGauss::Regular { ratio, log_cdf } => {
            let alpha = ratio / cvnic.sqrt();
            let beta = alpha * (alpha * cvnic + cmni);
            let r = beta / (1. - beta);
            let p_new = r / cvnic;
            let mp_new = r * (alpha + cmni / cvnic) + alpha;
            // at worst, remove the message
            let dp = (-p + f64::EPSILON).max(GAMMA * (p_new - p));
            let dmp = (-mp + f64::EPSILON).max(GAMMA * (mp_new - mp));
            let p_new = p + dp;
            msg.p = p_new;
            msg.mp = mp + dmp;
            msg.log_s = log_cdf - 0.5 * (beta.ln() - p_new.ln() - cvnic.ln())
                + alpha * alpha / (2. * beta) * cvnic;
            (dp, dmp)
        }
    };

    let scale = 1. + dp * cvc;
    Zip::from(v.rows_mut())
        .and(&vc)
        .for_each(|mut row, &vci| row.scaled_add(-dp / scale * vci, &vc));
    m.scaled_add((dmp - cm * dp) / scale, &vc);
    if v.iter().any(|x| x.is_nan()) {
        return Err(EntropyError::InvalidValueError(
            "expectation propagation produced a covariance containing NaN".to_string(),
        ));
    }
    Ok(Some(dmp.max(dp)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use finitediff::FiniteDiff;
    use ndarray::array;

    fn covariance() -> Array2<f64> {
        array![[1.0, 0.3, 0.1], [0.3, 0.8, 0.2], [0.1, 0.2, 1.2]]
    }

    #[test]
    fn test_joint_min_symmetric() {
        let mu = array![0., 0.];
        let sigma = array![[1., 0.], [0., 1.]];
        let res = joint_min(&mu.view(), &sigma.view(), 1e-6).unwrap();
        let p = res.log_p.mapv(f64::exp);
        assert_abs_diff_eq!(array![0.5, 0.5], p, epsilon = 1e-6);
    }

    #[test]
    fn test_joint_min_favours_lower_mean() {
        let mu = array![-1., 0., 1.];
        let res = joint_min(&mu.view(), &covariance().view(), 1e-6).unwrap();
        let p = res.log_p.mapv(f64::exp);
        assert_abs_diff_eq!(1., p.sum(), epsilon = 1e-12);
        assert!(p[0] > p[1]);
        assert!(p[1] > p[2]);
    }

    #[test]
    fn test_joint_min_single_point() {
        let res = joint_min(&array![3.].view(), &array![[2.]].view(), 1e-3).unwrap();
        assert_abs_diff_eq!(0., res.log_p[0]);
        assert_abs_diff_eq!(0., res.dlogp_dmu[[0, 0]]);
    }

    #[test]
    fn test_joint_min_bad_shape() {
        let res = joint_min(&array![0., 1.].view(), &Array2::eye(3).view(), 1e-3);
        assert!(res.is_err());
    }

    #[test]
    fn test_joint_min_gradient_is_centered() {
        // sum_k p_k d log p_k = d sum_k p_k = 0
        let mu = array![0.2, -0.1, 0.4];
        let res = joint_min(&mu.view(), &covariance().view(), 1e-8).unwrap();
        let p = res.log_p.mapv(f64::exp);
        let centered = p.dot(&res.dlogp_dmu);
        assert_abs_diff_eq!(Array1::<f64>::zeros(3), centered, epsilon = 1e-10);
    }

    #[test]
    fn test_joint_min_mean_gradient() {
        let mu = vec![0.2, -0.1, 0.4];
        let sigma = covariance();
        let res = joint_min(&Array1::from(mu.clone()).view(), &sigma.view(), 1e-10).unwrap();
        for k in 0..3 {
            let f = |x: &Vec<f64>| -> f64 {
                let x = Array1::from(x.clone());
                joint_min(&x.view(), &sigma.view(), 1e-10).unwrap().log_p[k]
            };
            let grad = mu.central_diff(&f);
            assert_abs_diff_eq!(
                Array1::from(grad),
                res.dlogp_dmu.row(k).to_owned(),
                epsilon = 1e-2
            );
        }
    }
}
