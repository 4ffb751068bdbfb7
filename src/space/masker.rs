//! Brain-mask flattening
//!
//! A [`Masker`] maps a full 3D volume to the vector of its in-mask voxels and
//! back. The length of that vector is fixed by the mask, so
//! [`Masker::inverse_transform`] accepts exactly one shape: a slice with one
//! value per in-mask voxel.

use super::affine::Affine;
use super::volume::Volume;
use crate::error::{DiagnosticError, Result};

/// Flattens volumes to their in-mask voxels
#[derive(Debug, Clone, PartialEq)]
pub struct Masker {
    mask: Volume,
    /// Flat grid positions of in-mask voxels, ascending
    indices: Vec<usize>,
}

impl Masker {
    /// Build a masker from a mask volume (non-zero voxels are in the mask)
    pub fn new(mask: Volume) -> Self {
        let indices = mask
            .data()
            .iter()
            .enumerate()
            .filter(|&(_, &v)| v != 0.0)
            .map(|(i, _)| i)
            .collect();
        Self { mask, indices }
    }

    /// Masker covering every voxel of a grid
    pub fn full(shape: [usize; 3], affine: Affine) -> Self {
        Self::new(Volume::filled(shape, 1.0, affine))
    }

    /// The mask volume
    pub fn mask(&self) -> &Volume {
        &self.mask
    }

    /// Affine of the mask grid
    pub fn affine(&self) -> &Affine {
        self.mask.affine()
    }

    /// Number of in-mask voxels
    pub fn n_voxels(&self) -> usize {
        self.indices.len()
    }

    /// Voxel indices of every in-mask voxel
    pub fn in_mask_ijk(&self) -> Vec<[i64; 3]> {
        self.indices.iter().map(|&i| self.mask.ijk_of(i)).collect()
    }

    /// True if the voxel lies inside the mask
    pub fn contains(&self, ijk: [i64; 3]) -> bool {
        self.mask.get(ijk).is_some_and(|v| v != 0.0)
    }

    /// Extract in-mask values of a volume
    ///
    /// # Errors
    ///
    /// Returns `DiagnosticError::ShapeMismatch` if the volume's grid shape
    /// differs from the mask's
    pub fn transform(&self, volume: &Volume) -> Result<Vec<f64>> {
        if volume.shape() != self.mask.shape() {
            return Err(DiagnosticError::ShapeMismatch(format!(
                "Volume shape {:?} does not match mask shape {:?}",
                volume.shape(),
                self.mask.shape()
            )));
        }
        let data = volume.data();
        Ok(self.indices.iter().map(|&i| data[i]).collect())
    }

    /// Scatter in-mask values back onto the full grid (zeros outside the mask)
    ///
    /// # Errors
    ///
    /// Returns `DiagnosticError::ShapeMismatch` unless `values` has exactly one
    /// entry per in-mask voxel
    pub fn inverse_transform(&self, values: &[f64]) -> Result<Volume> {
        if values.len() != self.indices.len() {
            return Err(DiagnosticError::ShapeMismatch(format!(
                "Expected {} in-mask values, got {}",
                self.indices.len(),
                values.len()
            )));
        }
        let mut out = Volume::zeros(self.mask.shape(), *self.mask.affine());
        let data = out.data_mut();
        for (&idx, &v) in self.indices.iter().zip(values) {
            data[idx] = v;
        }
        Ok(out)
    }
}
