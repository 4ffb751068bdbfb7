//! Meta-analysis collaborators
//!
//! The estimator interface the diagnostics re-fit, the result container they
//! read, and a small reference estimator.

pub mod density;
pub mod estimator;
pub mod result;

pub use density::MkdaDensity;
pub use estimator::{Estimator, EstimatorInputs};
pub use result::{MetaResult, ResultTable};
