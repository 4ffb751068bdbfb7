//! Steps shared by the cluster diagnostics

use super::contribution::ContributionTable;
use crate::clusters::{extract_clusters, ClusterExtraction, Tail};
use crate::dataset::Dataset;
use crate::error::{DiagnosticError, Result};
use crate::meta::{Estimator, EstimatorInputs, MetaResult};
use crate::space::Volume;
use std::collections::HashMap;

/// Validated view of a result, ready for per-study work
pub(crate) struct Checked<'a> {
    pub estimator: &'a dyn Estimator,
    pub dataset: &'a Dataset,
    pub inputs: &'a EstimatorInputs,
    pub target: &'a Volume,
}

/// Precondition checks, run before any parallel work
///
/// The estimator must retain the single dataset it was fitted on (pairwise
/// estimators do not) and the target map must exist.
pub(crate) fn check_result<'a>(
    result: &'a MetaResult,
    target_image: &str,
    diagnostic: &str,
) -> Result<Checked<'a>> {
    let estimator = result.estimator();
    let dataset = estimator.dataset().ok_or_else(|| {
        DiagnosticError::Configuration(format!(
            "MetaResult was not generated by an Estimator with a retained dataset. \
             This may be because the Estimator was a pairwise Estimator. \
             The {} method does not currently work with pairwise Estimators.",
            diagnostic
        ))
    })?;
    let inputs = estimator.inputs().ok_or_else(|| {
        DiagnosticError::Configuration(format!(
            "Estimator '{}' has not retained the inputs of its fit",
            estimator.name()
        ))
    })?;
    let target = result.get_map(target_image)?;

    Ok(Checked {
        estimator,
        dataset,
        inputs,
        target,
    })
}

/// Threshold the target map and label its clusters
///
/// The map is treated as two-sided when any voxel is negative.
pub(crate) fn cluster_target(target: &Volume, threshold: f64) -> ClusterExtraction {
    let two_sided = target.has_negative();
    extract_clusters(target, threshold, two_sided)
}

/// Write per-study results into a tail table, in `ids` order
pub(crate) fn tail_table(
    ids: &[String],
    tail: Tail,
    cluster_ids: &[u32],
    mut results: HashMap<String, Vec<f64>>,
) -> Result<ContributionTable> {
    let mut table = ContributionTable::for_tail(ids, tail, cluster_ids);
    for id in ids {
        let values = results.remove(id).ok_or_else(|| {
            DiagnosticError::Processing(format!("No result returned for study '{}'", id))
        })?;
        table.set_row(id, &values)?;
    }
    Ok(table)
}
