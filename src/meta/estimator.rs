//! Meta-analysis estimator interface

use super::result::MetaResult;
use crate::dataset::{Coordinate, Dataset};
use crate::error::Result;
use std::fmt;

/// Inputs an estimator actually used after its own filtering
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EstimatorInputs {
    /// Retained study ids, in fitting order
    pub ids: Vec<String>,
    /// Retained coordinates (empty for image-based estimators)
    pub coordinates: Vec<Coordinate>,
}

impl EstimatorInputs {
    /// Coordinates of one retained study
    pub fn coordinates_for<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Coordinate> + 'a {
        self.coordinates.iter().filter(move |c| c.id == id)
    }
}

/// A meta-analysis estimator
///
/// Fitting stores the dataset and the retained inputs on the estimator, and the
/// returned [`MetaResult`] owns a copy of the fitted estimator. Diagnostics
/// never fit the result's estimator in place; they fit independent copies
/// obtained from [`Estimator::box_clone`].
///
/// Pairwise estimators (two-group comparisons) report `None` from
/// [`Estimator::dataset`].
pub trait Estimator: Send + Sync + fmt::Debug {
    /// Short estimator name
    fn name(&self) -> &str;

    /// Fit to a dataset and return the result maps
    fn fit(&mut self, dataset: &Dataset) -> Result<MetaResult>;

    /// The single dataset this estimator was fitted on
    fn dataset(&self) -> Option<&Dataset>;

    /// Retained inputs of the last fit
    fn inputs(&self) -> Option<&EstimatorInputs>;

    /// Independent deep copy
    fn box_clone(&self) -> Box<dyn Estimator>;
}

impl Clone for Box<dyn Estimator> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}
