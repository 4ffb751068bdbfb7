//! Leave-one-out (jackknife) cluster diagnostic
//!
//! For every retained study the estimator is re-fit without that study. The
//! re-fit's summary statistic is divided by the original one voxel by voxel,
//! turned into a proportional reduction `1 - reduced / original`, and averaged
//! within each cluster of the target map. A study that carries a cluster gets
//! a value near 1 for it; a study that adds nothing gets 0.
//!
//! The map used for the ratio is independent of the map that was thresholded:
//! `est` if the result has one, else `stat`, else `z`.
//!
//! Pairwise estimators are not supported.

use super::common::{check_result, cluster_target, tail_table};
use super::contribution::ContributionTable;
use super::{Diagnostic, DiagnosticOutput};
use crate::clusters::LabelAverager;
use crate::config::DiagnosticConfig;
use crate::dataset::Dataset;
use crate::error::{DiagnosticError, Result};
use crate::meta::{Estimator, MetaResult};
use crate::parallel::map_studies;
use crate::space::Masker;

/// Value maps in order of preference
const VALUE_MAPS: [&str; 3] = ["est", "stat", "z"];

/// Jackknife diagnostic
#[derive(Debug, Clone, Default)]
pub struct Jackknife {
    config: DiagnosticConfig,
}

impl Jackknife {
    /// Jackknife with the given parameters
    pub fn new(config: DiagnosticConfig) -> Self {
        Self { config }
    }
}

impl Diagnostic for Jackknife {
    fn name(&self) -> &'static str {
        "Jackknife"
    }

    fn config(&self) -> &DiagnosticConfig {
        &self.config
    }

    /// Run the jackknife on a result
    ///
    /// # Returns
    ///
    /// Contribution table (one row per retained study and tail, one column per
    /// cluster), the clusters table, and one label map per tail
    ///
    /// # Errors
    ///
    /// - `Configuration` if the estimator kept no dataset (pairwise estimators)
    /// - `MissingMap` if the target map is absent
    /// - Any error from a leave-one-out re-fit
    fn transform(&self, result: &MetaResult) -> Result<DiagnosticOutput> {
        let checked = check_result(result, &self.config.target_image, self.name())?;

        let value_map = VALUE_MAPS
            .iter()
            .copied()
            .find(|m| result.has_map(m))
            .unwrap_or("z");
        let baseline = result.get_map_array(value_map)?;
        let masker = result.masker();

        // Retained ids, not dataset ids: studies the estimator filtered out are never re-fit
        let ids: &[String] = &checked.inputs.ids;

        let extraction = cluster_target(checked.target, self.config.threshold());
        if extraction.table.is_empty() {
            log::warn!("No clusters found");
            return Ok(DiagnosticOutput {
                contribution_table: ContributionTable::empty_for(ids),
                clusters_table: extraction.table,
                label_maps: extraction.label_maps,
            });
        }

        log::debug!(
            "Jackknife on '{}' using '{}' values: {} studies, {} clusters",
            self.config.target_image,
            value_map,
            ids.len(),
            extraction.table.len()
        );

        let mut tables = Vec::with_capacity(extraction.label_maps.len());
        for label_map in extraction.label_maps.iter().filter(|m| !m.is_empty()) {
            let averager = LabelAverager::new(label_map);

            let results = map_studies(ids, self.config.n_cores, |study_id| {
                leave_one_out(
                    study_id,
                    ids,
                    checked.dataset,
                    checked.estimator,
                    value_map,
                    &baseline,
                    masker,
                    &averager,
                )
            })?;

            tables.push(tail_table(
                ids,
                label_map.tail(),
                averager.cluster_ids(),
                results,
            )?);
        }

        Ok(DiagnosticOutput {
            contribution_table: ContributionTable::concat(tables),
            clusters_table: extraction.table,
            label_maps: extraction.label_maps,
        })
    }
}

/// Re-fit without one study and average its proportional reduction per cluster
#[allow(clippy::too_many_arguments)]
fn leave_one_out(
    study_id: &str,
    all_ids: &[String],
    dataset: &Dataset,
    estimator: &dyn Estimator,
    value_map: &str,
    baseline: &[f64],
    masker: &Masker,
    averager: &LabelAverager,
) -> Result<Vec<f64>> {
    // Each task fits its own copy; the result's estimator is never touched
    let mut estimator = estimator.box_clone();

    let others: Vec<&str> = all_ids
        .iter()
        .map(String::as_str)
        .filter(|id| *id != study_id)
        .collect();
    let reduced = dataset.slice(&others[..]);

    let reduced_result = estimator.fit(&reduced).map_err(|e| {
        DiagnosticError::Estimator(format!("Re-fit without study '{}' failed: {}", study_id, e))
    })?;
    let reduced_values = masker.transform(reduced_result.get_map(value_map)?)?;

    let reduction = proportional_reduction(&reduced_values, baseline)?;
    let reduction_img = masker.inverse_transform(&reduction)?;

    log::debug!("Jackknife: finished leave-one-out for study '{}'", study_id);

    averager.transform(&reduction_img)
}

/// Voxelwise `1 - reduced / original`
///
/// Where the original value is zero, or the ratio is not finite, the reduction
/// is 0.
///
/// # Errors
///
/// Returns `DiagnosticError::ShapeMismatch` if the vectors differ in length
///
/// # Example
///
/// ```
/// use meta_diagnostics::diagnostics::jackknife::proportional_reduction;
///
/// let r = proportional_reduction(&[5.0, 10.0, 3.0], &[10.0, 10.0, 0.0])?;
/// assert_eq!(r, vec![0.5, 0.0, 0.0]);
/// # Ok::<(), meta_diagnostics::DiagnosticError>(())
/// ```
pub fn proportional_reduction(reduced: &[f64], original: &[f64]) -> Result<Vec<f64>> {
    if reduced.len() != original.len() {
        return Err(DiagnosticError::ShapeMismatch(format!(
            "Re-fit map has {} values, original has {}",
            reduced.len(),
            original.len()
        )));
    }

    Ok(reduced
        .iter()
        .zip(original)
        .map(|(&r, &o)| {
            let ratio = r / o;
            if o == 0.0 || !ratio.is_finite() {
                0.0
            } else {
                1.0 - ratio
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clusters::Tail;
    use crate::dataset::{Coordinate, Study};
    use crate::meta::{EstimatorInputs, MkdaDensity};
    use crate::space::{Affine, Volume};
    use std::collections::BTreeMap;

    /// Estimator whose `stat` map sums fixed per-study maps
    #[derive(Debug, Clone)]
    struct FixedMaps {
        per_study: BTreeMap<String, Volume>,
        dataset: Option<Dataset>,
        inputs: Option<EstimatorInputs>,
        pairwise: bool,
    }

    impl Estimator for FixedMaps {
        fn name(&self) -> &str {
            "FixedMaps"
        }

        fn fit(&mut self, dataset: &Dataset) -> Result<MetaResult> {
            let masker = dataset.masker().clone();
            let mut stat = Volume::zeros(masker.mask().shape(), *masker.affine());
            for id in dataset.ids() {
                if let Some(vol) = self.per_study.get(&id) {
                    for (dst, src) in stat.data_mut().iter_mut().zip(vol.data()) {
                        *dst += src;
                    }
                }
            }
            if !self.pairwise {
                self.dataset = Some(dataset.clone());
            }
            self.inputs = Some(EstimatorInputs {
                ids: dataset.ids(),
                coordinates: dataset.coordinates.clone(),
            });
            let mut maps = BTreeMap::new();
            maps.insert("stat".to_string(), stat);
            Ok(MetaResult::new(self.box_clone(), masker, maps))
        }

        fn dataset(&self) -> Option<&Dataset> {
            self.dataset.as_ref()
        }

        fn inputs(&self) -> Option<&EstimatorInputs> {
            self.inputs.as_ref()
        }

        fn box_clone(&self) -> Box<dyn Estimator> {
            Box::new(self.clone())
        }
    }

    const SHAPE: [usize; 3] = [6, 4, 4];

    /// Cluster 1 at x=0..=1 (baseline 20), cluster 2 at x=4 (baseline 10)
    fn fixture(pairwise: bool) -> MetaResult {
        let affine = Affine::identity();
        let mut a = Volume::zeros(SHAPE, affine);
        let mut b = Volume::zeros(SHAPE, affine);
        let c = Volume::zeros(SHAPE, affine);
        for x in 0..2 {
            a.set([x, 1, 1], 5.0);
            b.set([x, 1, 1], 15.0);
        }
        b.set([4, 1, 1], 10.0);

        let mut per_study = BTreeMap::new();
        per_study.insert("A".to_string(), a);
        per_study.insert("B".to_string(), b);
        per_study.insert("C".to_string(), c);

        let dataset = Dataset::new(
            vec![Study::new("A"), Study::new("B"), Study::new("C")],
            vec![Coordinate::new("A", 0.0, 1.0, 1.0)],
            Masker::full(SHAPE, affine),
        );
        let mut est = FixedMaps {
            per_study,
            dataset: None,
            inputs: None,
            pairwise,
        };
        let mut result = est.fit(&dataset).unwrap();
        let stat = result.get_map("stat").unwrap().clone();
        result.add_map("z_corr-FWE", stat).unwrap();
        result
    }

    fn jackknife() -> Jackknife {
        Jackknife::new(DiagnosticConfig::for_target("z_corr-FWE"))
    }

    #[test]
    fn test_proportional_reduction_zero_baseline() {
        let r = proportional_reduction(&[1.0, 0.0, f64::NAN], &[0.0, 0.0, 2.0]).unwrap();
        assert_eq!(r, vec![0.0, 0.0, 0.0]);
        assert!(proportional_reduction(&[1.0], &[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_contributions_per_cluster() {
        let out = jackknife().transform(&fixture(false)).unwrap();
        let table = &out.contribution_table;

        assert_eq!(out.clusters_table.len(), 2);
        assert_eq!(table.columns, vec!["PosTail 1", "PosTail 2"]);
        assert_eq!(table.ids(), vec!["A", "B", "C"]);

        // Cluster 1 has baseline 20 (A: 5, B: 15), cluster 2 baseline 10 (B only)
        assert!((table.get("A", "PosTail 1").unwrap() - 0.25).abs() < 1e-12);
        assert!((table.get("B", "PosTail 1").unwrap() - 0.75).abs() < 1e-12);
        assert!((table.get("A", "PosTail 2").unwrap()).abs() < 1e-12);
        assert!((table.get("B", "PosTail 2").unwrap() - 1.0).abs() < 1e-12);

        // C contributes nothing anywhere
        assert_eq!(table.get("C", "PosTail 1"), Some(0.0));
        assert_eq!(table.get("C", "PosTail 2"), Some(0.0));
    }

    #[test]
    fn test_no_clusters_returns_empty_table() {
        let result = fixture(false);
        let config = DiagnosticConfig {
            voxel_thresh: Some(100.0),
            ..DiagnosticConfig::for_target("z_corr-FWE")
        };
        let out = Jackknife::new(config).transform(&result).unwrap();
        assert!(out.contribution_table.is_empty());
        assert_eq!(out.contribution_table.ids(), vec!["A", "B", "C"]);
        assert!(out.clusters_table.is_empty());
    }

    #[test]
    fn test_missing_target_lists_maps() {
        let result = fixture(false);
        let err = Jackknife::default().transform(&result).unwrap_err();
        assert!(matches!(err, DiagnosticError::MissingMap { .. }));
        assert!(err
            .to_string()
            .ends_with("Available maps in result are: 'stat', 'z_corr-FWE'."));
    }

    #[test]
    fn test_pairwise_estimator_rejected() {
        let err = jackknife().transform(&fixture(true)).unwrap_err();
        assert!(matches!(err, DiagnosticError::Configuration(_)));
    }

    #[test]
    fn test_two_sided_target_stacks_tails() {
        let mut result = fixture(false);
        let mut target = result.get_map("stat").unwrap().clone();
        target.set([4, 1, 1], -10.0);
        result.add_map("z_corr-FWE", target).unwrap();

        let out = jackknife().transform(&result).unwrap();
        let table = &out.contribution_table;
        assert_eq!(out.label_maps.len(), 2);
        assert_eq!(table.columns, vec!["PosTail 1", "NegTail 1"]);
        assert_eq!(table.n_rows(), 6);
        // Positive-tail rows leave negative columns empty
        assert_eq!(table.rows[0].values[1], None);
        assert!((table.get("B", "NegTail 1").unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_columns_match_cluster_ids_per_tail() {
        let mut result = fixture(false);
        let mut target = result.get_map("stat").unwrap().clone();
        target.set([4, 3, 3], -7.0);
        result.add_map("z_corr-FWE", target).unwrap();

        let out = jackknife().transform(&result).unwrap();
        for tail in [Tail::Positive, Tail::Negative] {
            let from_clusters: Vec<String> = out
                .clusters_table
                .rows_for(tail)
                .map(|row| tail.column_name(row.cluster_id))
                .collect();
            let from_contributions: Vec<String> = out
                .contribution_table
                .columns
                .iter()
                .filter(|c| c.starts_with(tail.column_prefix()))
                .cloned()
                .collect();
            assert!(!from_clusters.is_empty());
            assert_eq!(from_clusters, from_contributions);
        }
        assert_eq!(
            out.contribution_table.columns,
            vec!["PosTail 1", "PosTail 2", "NegTail 1"]
        );
    }

    #[test]
    fn test_result_estimator_untouched() {
        let studies = vec![Study::new("s1"), Study::new("s2"), Study::new("s3")];
        let coordinates = vec![
            Coordinate::new("s1", 3.0, 3.0, 3.0),
            Coordinate::new("s2", 3.0, 3.0, 3.0),
            Coordinate::new("s3", 3.0, 4.0, 3.0),
        ];
        let dataset = Dataset::new(
            studies,
            coordinates,
            Masker::full([7, 7, 7], Affine::identity()),
        );
        let mut result = MkdaDensity::new(1.0).fit(&dataset).unwrap();
        let stat = result.get_map("stat").unwrap().clone();
        result.add_map("z_corr-FWE", stat).unwrap();

        let out = Jackknife::new(DiagnosticConfig {
            n_cores: 2,
            ..DiagnosticConfig::for_target("z_corr-FWE")
        })
        .transform(&result)
        .unwrap();

        assert_eq!(out.contribution_table.n_rows(), 3);
        assert_eq!(result.estimator().inputs().unwrap().ids.len(), 3);
        assert_eq!(result.estimator().dataset().unwrap().len(), 3);
    }
}
