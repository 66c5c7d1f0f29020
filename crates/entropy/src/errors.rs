use thiserror::Error;

/// A result type for entropy search computations
pub type Result<T> = std::result::Result<T, EntropyError>;

/// An error when using an entropy search engine
#[derive(Error, Debug)]
pub enum EntropyError {
    /// When a parameter value is invalid
    #[error("InvalidValue error: {0}")]
    InvalidValueError(String),
    /// When given points do not match the dimension of the input space
    #[error("Invalid input dimensionality: expected {expected}, got {actual}")]
    InvalidDimension {
        /// Expected number of components
        expected: usize,
        /// Actual number of components
        actual: usize,
    },
    /// When the engine is used before any surrogate model was given
    #[error("Entropy engine not updated: no surrogate model available")]
    NotUpdated,
    /// When the surrogate model fails to predict
    #[error("Surrogate error: {0}")]
    SurrogateError(String),
    /// When linear algebra computation fails
    #[error(transparent)]
    LinalgError(#[from] linfa_linalg::LinalgError),
    /// When a linfa error occurs
    #[error(transparent)]
    LinfaError(#[from] linfa::error::Error),
}
