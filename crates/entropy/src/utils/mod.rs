//! Numerical helpers: standard normal functions and robust linear algebra.
mod linalg;
mod normal;

pub use linalg::*;
pub use normal::*;

pub(crate) use normal::{log_relative_gauss, RelativeGauss};
