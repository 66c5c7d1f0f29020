//! Standard normal helpers shared by the representer measure and the EP approximation.
use crate::errors::{EntropyError, Result};
use libm::{erfc, exp, expm1, log, log1p};
use ndarray::Array1;
use statrs::distribution::{ContinuousCDF, Normal};

const SQRT_2PI: f64 = 2.5066282746310002;
const LOG_2PI: f64 = 1.8378770664093453;
const HALF_LOG_2PI: f64 = 0.9189385332046727;
const HALF_LOG_PI_OVER_2: f64 = 0.2257913526447274;

/// Probability density function of Standard Normal at x
pub fn norm_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / SQRT_2PI
}

/// Cumulative distribution function of Standard Normal at x
pub fn norm_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / std::f64::consts::SQRT_2)
}

/// `n` quantiles of Standard Normal evenly spread on `]0, 1[`,
/// i.e. the inverse cdf at `i / (n + 1)` for `i` in `1..=n`
pub fn normal_quantiles(n: usize) -> Result<Array1<f64>> {
    let normal = Normal::new(0., 1.).map_err(|err| EntropyError::InvalidValueError(err.to_string()))?;
    let step = 1. / (n as f64 + 1.);
    Ok(Array1::from_iter(
        (1..=n).map(|i| normal.inverse_cdf(i as f64 * step)),
    ))
}

/// `exp(u^2) * erfc(u)`, switching to the asymptotic expansion
/// before `exp(u^2)` overflows
fn scaled_erfc(u: f64) -> f64 {
    if u < 25. {
        exp(u * u) * erfc(u)
    } else {
        let t = 1. / (2. * u * u);
        let series = 1. - t + 3. * t * t - 15. * t.powi(3) + 105. * t.powi(4);
        series / (u * std::f64::consts::PI.sqrt())
    }
}

fn log1mexp(x: f64) -> f64 {
    if x > -std::f64::consts::LN_2 {
        log(-expm1(x))
    } else {
        log1p(-exp(x))
    }
}

/// `log(phi(u) + u * Phi(u))`, stable for large negative `u`.
///
/// This is the log of the expected improvement of a unit gaussian
/// whose standardized improvement is `u`.
pub fn log_h(u: f64) -> f64 {
    if u > -1. {
        return log(norm_pdf(u) + u * norm_cdf(u));
    }
    let log_phi = -0.5 * u * u - HALF_LOG_2PI;
    let tail = if u > -1e3 {
        let w = log(scaled_erfc(-u / std::f64::consts::SQRT_2) * u.abs()) + HALF_LOG_PI_OVER_2;
        log1mexp(w)
    } else {
        -2. * log(u.abs())
    };
    log_phi + tail
}

/// Log of the expected improvement below `fmin` of a gaussian prediction
/// `N(mean, var)`. Returns `None` when the variance vanishes.
pub fn log_ei(mean: f64, var: f64, fmin: f64) -> Option<f64> {
    if var < f64::EPSILON {
        None
    } else {
        let sigma = var.sqrt();
        Some(log_h((fmin - mean) / sigma) + sigma.ln())
    }
}

/// Outcome of the log relative gaussian evaluation used by EP updates
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum RelativeGauss {
    /// `z` too negative, the factor carries no mass
    Underflow,
    /// `z` too positive, the factor is saturated at one
    Saturated,
    /// Ratio `phi(z) / Phi(z)` and `log(Phi(z))`
    Regular { ratio: f64, log_cdf: f64 },
}

pub(crate) fn log_relative_gauss(z: f64) -> RelativeGauss {
    if z < -6. {
        RelativeGauss::Underflow
    } else if z > 6. {
        RelativeGauss::Saturated
    } else {
        let log_pdf = -0.5 * (z * z + LOG_2PI);
        let log_cdf = log(0.5 * erfc(-z / std::f64::consts::SQRT_2));
        RelativeGauss::Regular {
            ratio: exp(log_pdf - log_cdf),
            log_cdf,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_log_h() {
        // values from trieste implementation
        let vals = [-2.0, -1.0, 0.0, 1.0, 2.0];
        let expected = [-4.7687836, -2.4851208, -0.9189385, 0.08002624, 0.69738346];
        for (expect, val) in expected.iter().zip(vals) {
            assert_abs_diff_eq!(*expect, log_h(val), epsilon = 1e-6);
        }
    }

    #[test]
    fn test_log_h_far_tail_is_finite() {
        assert!(log_h(-40.).is_finite());
        assert!(log_h(-2000.).is_finite());
        assert!(log_h(-40.) < log_h(-30.));
    }

    #[test]
    fn test_log_ei() {
        assert_eq!(None, log_ei(0., 0., 1.));
        // sigma = 1, u = 0 => log(phi(0))
        assert_abs_diff_eq!(-0.9189385, log_ei(1., 1., 1.).unwrap(), epsilon = 1e-6);
    }

    #[test]
    fn test_normal_quantiles() {
        let q = normal_quantiles(3).unwrap();
        assert_abs_diff_eq!(0., q[1], epsilon = 1e-12);
        assert_abs_diff_eq!(-q[0], q[2], epsilon = 1e-12);
        // Phi^-1(0.25)
        assert_abs_diff_eq!(-0.6744897501960817, q[0], epsilon = 1e-9);
        assert_abs_diff_eq!(0.25, norm_cdf(q[0]), epsilon = 1e-9);
    }

    #[test]
    fn test_log_relative_gauss() {
        assert_eq!(RelativeGauss::Underflow, log_relative_gauss(-7.));
        assert_eq!(RelativeGauss::Saturated, log_relative_gauss(7.));
        match log_relative_gauss(0.) {
            RelativeGauss::Regular { ratio, log_cdf } => {
                assert_abs_diff_eq!(0.5f64.ln(), log_cdf, epsilon = 1e-12);
                assert_abs_diff_eq!(norm_pdf(0.) / 0.5, ratio, epsilon = 1e-12);
            }
            _ => panic!("regular regime expected"),
        }
    }
}
