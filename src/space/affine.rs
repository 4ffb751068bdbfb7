//! Voxel ↔ world coordinate mapping
//!
//! An [`Affine`] maps integer voxel indices `(i, j, k)` to world-space
//! (millimeter) coordinates `(x, y, z)`. The inverse mapping is used to place
//! reported foci onto the grid of a mask or statistical volume.
//!
//! Both sides of a comparison must use the *same* affine; this module cannot
//! detect a mismatch.

use crate::error::{DiagnosticError, Result};
use nalgebra::{Matrix3, Matrix4};
use serde::{Deserialize, Serialize};

const SINGULAR_EPSILON: f64 = 1e-12;

/// 4×4 homogeneous affine transform, row-major
///
/// Only the upper 3×4 block is used; the bottom row is assumed to be `[0, 0, 0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Affine {
    /// Row-major matrix
    pub matrix: [[f64; 4]; 4],
}

impl Affine {
    /// Identity transform (1 mm isotropic voxels, origin at voxel 0)
    pub fn identity() -> Self {
        Self::from_spacing_origin([1.0, 1.0, 1.0], [0.0, 0.0, 0.0])
    }

    /// Axis-aligned affine from voxel spacing and the world position of voxel `(0, 0, 0)`
    ///
    /// # Example
    ///
    /// ```
    /// use meta_diagnostics::space::affine::Affine;
    ///
    /// let affine = Affine::from_spacing_origin([2.0, 2.0, 2.0], [-90.0, -126.0, -72.0]);
    /// assert_eq!(affine.apply([45.0, 63.0, 36.0]), [0.0, 0.0, 0.0]);
    /// ```
    pub fn from_spacing_origin(spacing: [f64; 3], origin: [f64; 3]) -> Self {
        Self {
            matrix: [
                [spacing[0], 0.0, 0.0, origin[0]],
                [0.0, spacing[1], 0.0, origin[1]],
                [0.0, 0.0, spacing[2], origin[2]],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Apply the transform to a point
    pub fn apply(&self, p: [f64; 3]) -> [f64; 3] {
        let m = &self.matrix;
        let mut out = [0.0; 3];
        for (row, o) in out.iter_mut().enumerate() {
            *o = m[row][0] * p[0] + m[row][1] * p[1] + m[row][2] * p[2] + m[row][3];
        }
        out
    }

    fn to_matrix4(&self) -> Matrix4<f64> {
        let m = &self.matrix;
        Matrix4::from_fn(|r, c| m[r][c])
    }

    fn linear(&self) -> Matrix3<f64> {
        let m = &self.matrix;
        Matrix3::from_fn(|r, c| m[r][c])
    }

    /// Determinant of the linear (3×3) part
    pub fn determinant(&self) -> f64 {
        self.linear().determinant()
    }

    /// Edge length of a voxel along each grid axis (mm)
    pub fn voxel_sizes(&self) -> [f64; 3] {
        let linear = self.linear();
        [
            linear.column(0).norm(),
            linear.column(1).norm(),
            linear.column(2).norm(),
        ]
    }

    /// Volume of one voxel in cubic millimeters
    pub fn voxel_volume_mm3(&self) -> f64 {
        self.determinant().abs()
    }

    /// Inverse transform (world → fractional voxel)
    ///
    /// # Errors
    ///
    /// Returns `DiagnosticError::ShapeMismatch` if the linear part is singular
    pub fn inverse(&self) -> Result<Affine> {
        let det = self.determinant();
        let inv = if det.abs() < SINGULAR_EPSILON {
            None
        } else {
            self.to_matrix4().try_inverse()
        };
        let inv = inv.ok_or_else(|| {
            DiagnosticError::ShapeMismatch(format!(
                "Affine is singular (determinant {:.3e})",
                det
            ))
        })?;

        let mut matrix = [[0.0; 4]; 4];
        for (r, row) in matrix.iter_mut().enumerate() {
            for (c, v) in row.iter_mut().enumerate() {
                *v = inv[(r, c)];
            }
        }
        Ok(Affine { matrix })
    }
}

impl Default for Affine {
    fn default() -> Self {
        Self::identity()
    }
}

/// Convert world-space coordinates to integer voxel indices
///
/// Applies the inverse of `affine` and rounds each component to the nearest
/// integer (ties to even). Indices may fall outside any particular grid; bounds
/// are the caller's concern. Points with a non-finite component have no voxel
/// and map to `None`.
///
/// # Errors
///
/// Returns `DiagnosticError::ShapeMismatch` if `affine` is not invertible
///
/// # Example
///
/// ```
/// use meta_diagnostics::space::affine::{world_to_voxel, Affine};
///
/// let affine = Affine::from_spacing_origin([2.0, 2.0, 2.0], [0.0, 0.0, 0.0]);
/// let ijk = world_to_voxel(&[[4.0, 6.2, -2.1], [f64::NAN, 0.0, 0.0]], &affine)?;
/// assert_eq!(ijk, vec![Some([2, 3, -1]), None]);
/// # Ok::<(), meta_diagnostics::DiagnosticError>(())
/// ```
pub fn world_to_voxel(coords: &[[f64; 3]], affine: &Affine) -> Result<Vec<Option<[i64; 3]>>> {
    let inv = affine.inverse()?;
    Ok(coords
        .iter()
        .map(|&xyz| {
            let ijk = inv.apply(xyz);
            if ijk.iter().any(|c| !c.is_finite()) {
                return None;
            }
            Some([
                ijk[0].round_ties_even() as i64,
                ijk[1].round_ties_even() as i64,
                ijk[2].round_ties_even() as i64,
            ])
        })
        .collect())
}

/// Convert voxel indices to world-space coordinates (voxel centers)
pub fn voxel_to_world(ijk: &[[i64; 3]], affine: &Affine) -> Vec<[f64; 3]> {
    ijk.iter()
        .map(|v| affine.apply([v[0] as f64, v[1] as f64, v[2] as f64]))
        .collect()
}
