use ndarray::{Array1, Array2, ArrayBase, Data, Ix1, Zip};

/// Belief over the minimizer location held by an entropy search engine
#[derive(Clone, Debug)]
pub struct EntropyState {
    /// Representer points (n_representer, nx)
    pub zb: Array2<f64>,
    /// Log-density of the representer measure at `zb`
    pub lmb: Array1<f64>,
    /// Probability for each representer point to be the minimizer
    pub pmin: Array1<f64>,
    /// `log(pmin)`
    pub log_p: Array1<f64>,
    /// Function samples at representer points (n_representer, n_func_samples),
    /// empty when the engine does not sample functions
    pub f: Array2<f64>,
}

impl Default for EntropyState {
    fn default() -> Self {
        EntropyState {
            zb: Array2::zeros((0, 0)),
            lmb: Array1::zeros(0),
            pmin: Array1::zeros(0),
            log_p: Array1::zeros(0),
            f: Array2::zeros((0, 0)),
        }
    }
}

impl EntropyState {
    /// Number of representer points
    pub fn n_representer(&self) -> usize {
        self.zb.nrows()
    }

    /// `sum(pmin * (log_p + lmb))` of the current belief
    pub fn entropy_term(&self) -> f64 {
        entropy_term(&self.pmin, &self.log_p, &self.lmb)
    }
}

/// `sum(p * (log_p + lmb))` over representer points
pub fn entropy_term(
    p: &ArrayBase<impl Data<Elem = f64>, Ix1>,
    log_p: &ArrayBase<impl Data<Elem = f64>, Ix1>,
    lmb: &ArrayBase<impl Data<Elem = f64>, Ix1>,
) -> f64 {
    Zip::from(p)
        .and(log_p)
        .and(lmb)
        .fold(0., |acc, &pi, &lpi, &li| acc + pi * (lpi + li))
}
