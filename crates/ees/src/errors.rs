use thiserror::Error;

/// A result type for environment entropy search errors
pub type Result<T> = std::result::Result<T, EesError>;

/// An error for environment entropy search acquisition
#[derive(Error, Debug)]
pub enum EesError {
    /// When configuration is invalid
    #[error("Invalid configuration: {0}")]
    InvalidConfigError(String),
    /// When given points do not match the dimension of the input space
    #[error("Invalid input dimensionality: expected {expected}, got {actual}")]
    InvalidDimension {
        /// Expected number of components
        expected: usize,
        /// Actual number of components
        actual: usize,
    },
    /// When an estimator scoring one point at a time is given several
    #[error("Invalid number of points: expected {expected}, got {actual}")]
    InvalidBatchSize {
        /// Expected number of points
        expected: usize,
        /// Actual number of points
        actual: usize,
    },
    /// When the acquisition is used before any update
    #[error("Acquisition not updated: no surrogate or cost model available")]
    NotUpdated,
    /// When the cost model fails to predict
    #[error("Cost model error: {0}")]
    CostModelError(String),
    /// When the entropy engine fails
    #[error(transparent)]
    EntropyError(#[from] envsearch_entropy::EntropyError),
    /// When input arrays cannot be reshaped
    #[error(transparent)]
    ShapeError(#[from] ndarray::ShapeError),
}
