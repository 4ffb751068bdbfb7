//! Removal of coordinates outside a brain mask

use crate::dataset::Dataset;
use crate::error::Result;
use crate::space::{world_to_voxel, Masker};
use std::collections::HashSet;

/// Drops coordinate rows whose voxel falls outside a mask
///
/// Studies are never removed, even when all of their coordinates are.
#[derive(Debug, Clone, Default)]
pub struct FocusFilter {
    mask: Option<Masker>,
}

impl FocusFilter {
    /// Filter against `mask`, or against each dataset's own mask when None
    pub fn new(mask: Option<Masker>) -> Self {
        Self { mask }
    }

    /// Mask used for `dataset`: the explicit one, else the dataset's own
    fn masker_for<'a>(&'a self, dataset: &'a Dataset) -> &'a Masker {
        self.mask.as_ref().unwrap_or_else(|| dataset.masker())
    }

    /// For each coordinate row of `dataset`, whether its voxel is in the mask
    ///
    /// Rows with a non-finite coordinate have no voxel and are never in the mask.
    ///
    /// # Errors
    ///
    /// Returns `DiagnosticError::ShapeMismatch` if the mask affine cannot be inverted
    pub fn in_mask_rows(&self, dataset: &Dataset) -> Result<Vec<bool>> {
        let masker = self.masker_for(dataset);
        let in_mask: HashSet<[i64; 3]> = masker.in_mask_ijk().into_iter().collect();

        let xyz: Vec<[f64; 3]> = dataset.coordinates.iter().map(|c| c.xyz()).collect();
        Ok(world_to_voxel(&xyz, masker.affine())?
            .into_iter()
            .map(|v| v.is_some_and(|ijk| in_mask.contains(&ijk)))
            .collect())
    }

    /// Remove out-of-mask coordinates from `dataset`
    ///
    /// # Errors
    ///
    /// Returns `DiagnosticError::ShapeMismatch` if the mask affine cannot be inverted
    pub fn transform(&self, mut dataset: Dataset) -> Result<Dataset> {
        let keep = self.in_mask_rows(&dataset)?;

        let total = keep.len();
        let removed = keep.iter().filter(|&&k| !k).count();
        log::info!(
            "{}/{} coordinates fall outside of the mask. Removing them.",
            removed,
            total
        );

        let mut flags = keep.into_iter();
        dataset.coordinates.retain(|_| flags.next().unwrap_or(false));

        Ok(dataset)
    }
}
