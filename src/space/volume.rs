//! Dense 3D scalar volumes

use super::affine::Affine;
use crate::error::{DiagnosticError, Result};

/// A 3D grid of scalar values with its voxel → world affine
///
/// Data is stored flat with x varying fastest:
/// `data[x + nx * (y + ny * z)]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    shape: [usize; 3],
    data: Vec<f64>,
    affine: Affine,
}

impl Volume {
    /// Create a volume from flat data
    ///
    /// # Errors
    ///
    /// Returns `DiagnosticError::ShapeMismatch` if `data.len()` is not `nx * ny * nz`
    pub fn new(shape: [usize; 3], data: Vec<f64>, affine: Affine) -> Result<Self> {
        let expected = shape[0] * shape[1] * shape[2];
        if data.len() != expected {
            return Err(DiagnosticError::ShapeMismatch(format!(
                "Volume of shape {:?} needs {} values, got {}",
                shape,
                expected,
                data.len()
            )));
        }
        Ok(Self {
            shape,
            data,
            affine,
        })
    }

    /// Zero-filled volume
    pub fn zeros(shape: [usize; 3], affine: Affine) -> Self {
        Self {
            shape,
            data: vec![0.0; shape[0] * shape[1] * shape[2]],
            affine,
        }
    }

    /// Volume with every voxel set to `value`
    pub fn filled(shape: [usize; 3], value: f64, affine: Affine) -> Self {
        Self {
            shape,
            data: vec![value; shape[0] * shape[1] * shape[2]],
            affine,
        }
    }

    /// Grid shape `[nx, ny, nz]`
    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    /// Voxel → world affine
    pub fn affine(&self) -> &Affine {
        &self.affine
    }

    /// Flat values
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Mutable flat values
    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Number of voxels
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if the grid has no voxels
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Flat index of an in-bounds voxel
    pub fn flat_index(&self, ijk: [i64; 3]) -> Option<usize> {
        let [nx, ny, nz] = self.shape;
        if ijk[0] < 0 || ijk[1] < 0 || ijk[2] < 0 {
            return None;
        }
        let (i, j, k) = (ijk[0] as usize, ijk[1] as usize, ijk[2] as usize);
        if i >= nx || j >= ny || k >= nz {
            return None;
        }
        Some(i + nx * (j + ny * k))
    }

    /// Voxel index of a flat position
    pub fn ijk_of(&self, flat: usize) -> [i64; 3] {
        let [nx, ny, _] = self.shape;
        let i = flat % nx;
        let j = (flat / nx) % ny;
        let k = flat / (nx * ny);
        [i as i64, j as i64, k as i64]
    }

    /// Value at a voxel, `None` when out of bounds
    pub fn get(&self, ijk: [i64; 3]) -> Option<f64> {
        self.flat_index(ijk).map(|idx| self.data[idx])
    }

    /// Set the value at a voxel; out-of-bounds writes are ignored
    pub fn set(&mut self, ijk: [i64; 3], value: f64) {
        if let Some(idx) = self.flat_index(ijk) {
            self.data[idx] = value;
        }
    }

    /// True if any voxel holds a negative value (signed, two-sided map)
    pub fn has_negative(&self) -> bool {
        self.data.iter().any(|&v| v < 0.0)
    }

    /// True if `other` lives on the same grid (shape and affine)
    pub fn same_grid(&self, other: &Volume) -> bool {
        self.shape == other.shape && self.affine == other.affine
    }
}
