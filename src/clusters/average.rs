//! Per-cluster averaging of full-grid values

use super::label::LabelMap;
use crate::error::{DiagnosticError, Result};
use crate::space::Volume;

/// Reduces a full-grid volume to one mean value per cluster id
#[derive(Debug, Clone)]
pub struct LabelAverager {
    shape: [usize; 3],
    cluster_ids: Vec<u32>,
    members: Vec<Vec<usize>>,
}

impl LabelAverager {
    /// Precompute cluster membership from a label map
    pub fn new(label_map: &LabelMap) -> Self {
        let cluster_ids = label_map.cluster_ids();
        let mut members = vec![Vec::new(); cluster_ids.len()];
        for (flat, &label) in label_map.labels().iter().enumerate() {
            if label > 0 {
                members[label as usize - 1].push(flat);
            }
        }
        Self {
            shape: label_map.shape(),
            cluster_ids,
            members,
        }
    }

    /// Cluster ids, in output order
    pub fn cluster_ids(&self) -> &[u32] {
        &self.cluster_ids
    }

    /// Mean value inside each cluster
    ///
    /// # Errors
    ///
    /// Returns `DiagnosticError::ShapeMismatch` if the volume is on a different grid
    pub fn transform(&self, volume: &Volume) -> Result<Vec<f64>> {
        if volume.shape() != self.shape {
            return Err(DiagnosticError::ShapeMismatch(format!(
                "Volume shape {:?} does not match label map shape {:?}",
                volume.shape(),
                self.shape
            )));
        }

        let data = volume.data();
        Ok(self
            .members
            .iter()
            .map(|idx| {
                if idx.is_empty() {
                    0.0
                } else {
                    idx.iter().map(|&i| data[i]).sum::<f64>() / idx.len() as f64
                }
            })
            .collect())
    }
}
