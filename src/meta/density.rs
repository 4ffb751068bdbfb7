//! Reference coordinate-based estimator
//!
//! Multilevel kernel density with a binary sphere kernel: every study marks the
//! in-mask voxels within `radius_mm` of any of its foci, and the `stat` map
//! counts how many studies mark each voxel. A study marks a voxel at most once
//! no matter how many of its foci are nearby.
//!
//! No null distribution is estimated; correction is the caller's concern.

use super::estimator::{Estimator, EstimatorInputs};
use super::result::MetaResult;
use crate::dataset::Dataset;
use crate::error::{DiagnosticError, Result};
use crate::space::{world_to_voxel, Masker, Volume};
use std::collections::{BTreeMap, HashSet};

/// Default kernel radius (mm)
pub const DEFAULT_RADIUS_MM: f64 = 10.0;

/// Binary-sphere kernel density estimator
#[derive(Debug, Clone)]
pub struct MkdaDensity {
    /// Sphere radius in mm
    pub radius_mm: f64,
    dataset: Option<Dataset>,
    inputs: Option<EstimatorInputs>,
}

impl MkdaDensity {
    /// Estimator with a given kernel radius
    pub fn new(radius_mm: f64) -> Self {
        Self {
            radius_mm,
            dataset: None,
            inputs: None,
        }
    }
}

impl Default for MkdaDensity {
    fn default() -> Self {
        Self::new(DEFAULT_RADIUS_MM)
    }
}

impl Estimator for MkdaDensity {
    fn name(&self) -> &str {
        "MKDADensity"
    }

    fn fit(&mut self, dataset: &Dataset) -> Result<MetaResult> {
        if self.radius_mm.is_nan() || self.radius_mm <= 0.0 {
            return Err(DiagnosticError::InvalidInput(format!(
                "Kernel radius must be positive, got {}",
                self.radius_mm
            )));
        }

        let masker = dataset.masker();

        // Only studies that report coordinates take part
        let ids: Vec<String> = dataset
            .ids()
            .into_iter()
            .filter(|id| dataset.coordinates_for(id).next().is_some())
            .collect();
        if ids.is_empty() {
            return Err(DiagnosticError::Estimator(
                "No studies with coordinates in dataset".to_string(),
            ));
        }
        let keep: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let coordinates: Vec<_> = dataset
            .coordinates
            .iter()
            .filter(|c| keep.contains(c.id.as_str()))
            .cloned()
            .collect();

        log::debug!(
            "Fitting {} on {} studies, {} foci",
            self.name(),
            ids.len(),
            coordinates.len()
        );

        let mut stat = Volume::zeros(masker.mask().shape(), *masker.affine());
        for id in &ids {
            let covered = self.study_kernel(masker, dataset.coordinates_for(id).map(|c| c.xyz()))?;
            let data = stat.data_mut();
            for flat in covered {
                data[flat] += 1.0;
            }
        }

        let mut maps = BTreeMap::new();
        maps.insert("stat".to_string(), stat);

        self.dataset = Some(dataset.clone());
        self.inputs = Some(EstimatorInputs { ids, coordinates });

        Ok(MetaResult::new(self.box_clone(), masker.clone(), maps))
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

impl MkdaDensity {
    /// Flat positions of in-mask voxels within the kernel of any focus
    fn study_kernel(
        &self,
        masker: &Masker,
        foci: impl Iterator<Item = [f64; 3]>,
    ) -> Result<HashSet<usize>> {
        let affine = masker.affine();
        let foci: Vec<[f64; 3]> = foci.collect();
        let centers = world_to_voxel(&foci, affine)?;
        let mask = masker.mask();
        let sizes = affine.voxel_sizes();
        let reach: Vec<i64> = sizes
            .iter()
            .map(|&s| (self.radius_mm / s.max(f64::EPSILON)).ceil() as i64)
            .collect();
        let r2 = self.radius_mm * self.radius_mm;

        let mut covered = HashSet::new();
        // Foci without a voxel (non-finite) mark nothing
        for (xyz, center) in foci.iter().zip(centers) {
            let Some(center) = center else {
                continue;
            };

            for di in -reach[0]..=reach[0] {
                for dj in -reach[1]..=reach[1] {
                    for dk in -reach[2]..=reach[2] {
                        let ijk = [center[0] + di, center[1] + dj, center[2] + dk];
                        let Some(flat) = mask.flat_index(ijk) else {
                            continue;
                        };
                        if mask.data()[flat] == 0.0 {
                            continue;
                        }
                        let w = affine.apply([ijk[0] as f64, ijk[1] as f64, ijk[2] as f64]);
                        let d2 = (w[0] - xyz[0]).powi(2)
                            + (w[1] - xyz[1]).powi(2)
                            + (w[2] - xyz[2]).powi(2);
                        if d2 <= r2 {
                            covered.insert(flat);
                        }
                    }
                }
            }
        }
        Ok(covered)
    }
}
