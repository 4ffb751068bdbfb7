//! Focus-count cluster diagnostic
//!
//! Counts, for every retained study and every cluster of the target map, how
//! many of the study's reported foci land in the cluster or on a voxel sharing
//! a face with it. No re-fitting is done, so this only applies to
//! coordinate-based meta-analyses.

use super::common::{check_result, cluster_target, tail_table};
use super::contribution::ContributionTable;
use super::{Diagnostic, DiagnosticOutput};
use crate::clusters::label::FACE_OFFSETS;
use crate::clusters::LabelMap;
use crate::config::DiagnosticConfig;
use crate::error::{DiagnosticError, Result};
use crate::meta::{EstimatorInputs, MetaResult};
use crate::parallel::map_studies;
use crate::space::{world_to_voxel, Affine};

/// FocusCounter diagnostic
#[derive(Debug, Clone, Default)]
pub struct FocusCounter {
    config: DiagnosticConfig,
}

impl FocusCounter {
    /// FocusCounter with the given parameters
    pub fn new(config: DiagnosticConfig) -> Self {
        Self { config }
    }
}

impl Diagnostic for FocusCounter {
    fn name(&self) -> &'static str {
        "FocusCounter"
    }

    fn config(&self) -> &DiagnosticConfig {
        &self.config
    }

    fn transform(&self, result: &MetaResult) -> Result<DiagnosticOutput> {
        let checked = check_result(result, &self.config.target_image, self.name())?;
        if checked.inputs.coordinates.is_empty() {
            return Err(DiagnosticError::Configuration(
                "FocusCounter only works for coordinate-based meta-analyses, \
                 but the estimator retained no coordinates"
                    .to_string(),
            ));
        }

        let ids: &[String] = &checked.inputs.ids;
        let affine = checked.target.affine();

        let extraction = cluster_target(checked.target, self.config.threshold());
        if extraction.table.is_empty() {
            log::warn!("No clusters found");
            return Ok(DiagnosticOutput {
                contribution_table: ContributionTable::empty_for(ids),
                clusters_table: extraction.table,
                label_maps: extraction.label_maps,
            });
        }

        let mut tables = Vec::with_capacity(extraction.label_maps.len());
        for label_map in extraction.label_maps.iter().filter(|m| !m.is_empty()) {
            let results = map_studies(ids, self.config.n_cores, |study_id| {
                count_foci(study_id, checked.inputs, label_map, affine)
            })?;

            tables.push(tail_table(
                ids,
                label_map.tail(),
                &label_map.cluster_ids(),
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

/// Foci of one study touching each cluster, in cluster id order
fn count_foci(
    study_id: &str,
    inputs: &EstimatorInputs,
    label_map: &LabelMap,
    affine: &Affine,
) -> Result<Vec<f64>> {
    let xyz: Vec<[f64; 3]> = inputs.coordinates_for(study_id).map(|c| c.xyz()).collect();
    let ijk = world_to_voxel(&xyz, affine)?;

    let mut counts = vec![0u32; label_map.n_clusters() as usize];
    let mut touched = Vec::with_capacity(FACE_OFFSETS.len() + 1);
    // Non-finite foci have no voxel and count nowhere
    for focus in ijk.into_iter().flatten() {
        touched.clear();
        touched.push(label_map.label_at(focus));
        for off in FACE_OFFSETS {
            touched.push(label_map.label_at([
                focus[0] + off[0],
                focus[1] + off[1],
                focus[2] + off[2],
            ]));
        }
        touched.sort_unstable();
        touched.dedup();

        // A focus counts once per cluster it touches
        for &label in touched.iter().filter(|&&l| l > 0) {
            counts[label as usize - 1] += 1;
        }
    }

    Ok(counts.into_iter().map(f64::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clusters::Tail;
    use crate::dataset::{Coordinate, Dataset, Study};
    use crate::meta::{Estimator, MkdaDensity};
    use crate::space::{Masker, Volume};

    /// Target with cluster 1 at x=1..=2 (peak 8) and cluster 2 at x=6 (peak 4)
    fn fixture() -> MetaResult {
        let shape = [9, 5, 5];
        let affine = Affine::from_spacing_origin([2.0, 2.0, 2.0], [0.0, 0.0, 0.0]);
        let dataset = Dataset::new(
            vec![
                Study::new("inside"),
                Study::new("adjacent"),
                Study::new("far"),
                Study::new("images-only"),
            ],
            vec![
                // voxel (1,2,2) and (2,2,2), both in cluster 1
                Coordinate::new("inside", 2.0, 4.0, 4.0),
                Coordinate::new("inside", 4.0, 4.0, 4.0),
                // voxel (7,2,2) face-touches cluster 2; (5,2,2) too
                Coordinate::new("adjacent", 14.0, 4.0, 4.0),
                Coordinate::new("adjacent", 10.0, 4.0, 4.0),
                // voxel (4,4,4) touches nothing
                Coordinate::new("far", 8.0, 8.0, 8.0),
            ],
            Masker::full(shape, affine),
        );
        let mut result = MkdaDensity::new(1.0).fit(&dataset).unwrap();

        let mut target = Volume::zeros(shape, affine);
        target.set([1, 2, 2], 8.0);
        target.set([2, 2, 2], 7.0);
        target.set([6, 2, 2], 4.0);
        result.add_map("z_corr-FWE", target).unwrap();
        result
    }

    fn counter() -> FocusCounter {
        FocusCounter::new(DiagnosticConfig::for_target("z_corr-FWE"))
    }

    #[test]
    fn test_counts_inside_and_adjacent() {
        let out = counter().transform(&fixture()).unwrap();
        let table = &out.contribution_table;
        assert_eq!(table.columns, vec!["PosTail 1", "PosTail 2"]);
        // "images-only" has no foci and was not retained by the estimator
        assert_eq!(table.ids(), vec!["inside", "adjacent", "far"]);

        assert_eq!(table.get("inside", "PosTail 1"), Some(2.0));
        assert_eq!(table.get("inside", "PosTail 2"), Some(0.0));
        assert_eq!(table.get("adjacent", "PosTail 1"), Some(0.0));
        assert_eq!(table.get("adjacent", "PosTail 2"), Some(2.0));
        assert_eq!(table.get("far", "PosTail 1"), Some(0.0));
        assert_eq!(table.get("far", "PosTail 2"), Some(0.0));
    }

    #[test]
    fn test_counts_are_non_negative_integers() {
        let out = counter().transform(&fixture()).unwrap();
        for row in &out.contribution_table.rows {
            for v in row.values.iter().flatten() {
                assert!(*v >= 0.0 && v.fract() == 0.0);
            }
        }
    }

    #[test]
    fn test_study_without_foci_counts_zero() {
        let result = fixture();
        let extraction = cluster_target(result.get_map("z_corr-FWE").unwrap(), 0.0);
        let inputs = EstimatorInputs {
            ids: vec!["none".to_string()],
            coordinates: Vec::new(),
        };
        let counts = count_foci(
            "none",
            &inputs,
            &extraction.label_maps[0],
            result.get_map("z_corr-FWE").unwrap().affine(),
        )
        .unwrap();
        assert_eq!(counts, vec![0.0, 0.0]);
    }

    #[test]
    fn test_non_finite_foci_not_counted() {
        // Cluster touching voxel (0,0,0), where a NaN cast would land
        let affine = Affine::identity();
        let mut target = Volume::zeros([4, 4, 4], affine);
        target.set([0, 0, 0], 3.0);
        target.set([1, 0, 0], 3.0);
        let extraction = cluster_target(&target, 0.0);

        let inputs = EstimatorInputs {
            ids: vec!["s1".to_string()],
            coordinates: vec![
                Coordinate::new("s1", f64::NAN, f64::NAN, f64::NAN),
                Coordinate::new("s1", f64::NAN, 0.0, 0.0),
                Coordinate::new("s1", 1.0, 0.0, 0.0),
            ],
        };
        let counts = count_foci("s1", &inputs, &extraction.label_maps[0], &affine).unwrap();
        assert_eq!(counts, vec![1.0]);
    }

    #[test]
    fn test_two_sided_target_stacks_tails() {
        let mut result = fixture();
        let mut target = result.get_map("z_corr-FWE").unwrap().clone();
        target.set([6, 2, 2], -4.0);
        result.add_map("z_corr-FWE", target).unwrap();

        let out = counter().transform(&result).unwrap();
        let table = &out.contribution_table;
        assert_eq!(out.label_maps.len(), 2);
        assert_eq!(table.columns, vec!["PosTail 1", "NegTail 1"]);
        // One row per study and tail
        assert_eq!(table.n_rows(), 6);
        assert_eq!(table.rows[0].values[1], None);
        assert_eq!(table.rows[3].values[0], None);

        assert_eq!(table.get("inside", "PosTail 1"), Some(2.0));
        assert_eq!(table.get("inside", "NegTail 1"), Some(0.0));
        assert_eq!(table.get("adjacent", "NegTail 1"), Some(2.0));
        assert_eq!(table.get("far", "NegTail 1"), Some(0.0));
    }

    #[test]
    fn test_columns_match_cluster_ids_per_tail() {
        let mut result = fixture();
        let mut target = result.get_map("z_corr-FWE").unwrap().clone();
        target.set([4, 0, 0], -2.0);
        result.add_map("z_corr-FWE", target).unwrap();

        let out = counter().transform(&result).unwrap();
        let expected: Vec<String> = [Tail::Positive, Tail::Negative]
            .into_iter()
            .flat_map(|tail| {
                out.clusters_table
                    .rows_for(tail)
                    .map(move |row| tail.column_name(row.cluster_id))
                    .collect::<Vec<_>>()
            })
            .collect();
        assert_eq!(expected, vec!["PosTail 1", "PosTail 2", "NegTail 1"]);
        assert_eq!(out.contribution_table.columns, expected);
    }

    #[test]
    fn test_missing_target() {
        let err = FocusCounter::default().transform(&fixture()).unwrap_err();
        assert!(matches!(err, DiagnosticError::MissingMap { .. }));
    }

    #[test]
    fn test_estimator_clone_keeps_inputs() {
        let result = fixture();
        let copy = result.estimator().box_clone();
        assert_eq!(copy.inputs().unwrap().ids.len(), 3);
    }
}
