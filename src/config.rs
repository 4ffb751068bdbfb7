//! Configuration parameters for diagnostics and the diagnostics workflow

use crate::diagnostics::DiagnosticKind;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default target map: cluster-size FWE-corrected z map from Monte Carlo correction
pub const DEFAULT_TARGET_IMAGE: &str = "z_desc-size_level-cluster_corr-FWE_method-montecarlo";

/// Parameters shared by the Jackknife and FocusCounter diagnostics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticConfig {
    /// Map whose clusters are characterized (default: cluster-size FWE z map)
    pub target_image: String,

    /// Voxel-level threshold applied to the target map (default: None)
    /// None means the map is already thresholded and is treated as 0
    pub voxel_thresh: Option<f64>,

    /// Worker count (default: 1)
    /// Non-positive values use all available cores
    pub n_cores: i32,
}

impl Default for DiagnosticConfig {
    fn default() -> Self {
        Self {
            target_image: DEFAULT_TARGET_IMAGE.to_string(),
            voxel_thresh: None,
            n_cores: 1,
        }
    }
}

impl DiagnosticConfig {
    /// Default parameters with another target map
    pub fn for_target(target_image: impl Into<String>) -> Self {
        Self {
            target_image: target_image.into(),
            ..Self::default()
        }
    }

    /// Effective voxel threshold
    pub fn threshold(&self) -> f64 {
        self.voxel_thresh.unwrap_or(0.0)
    }
}

/// Parameters for running diagnostics over every corrected map of a result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Diagnostics to run on each corrected map (default: Jackknife)
    pub diagnostics: Vec<DiagnosticKind>,

    /// Voxel-level threshold passed to every diagnostic (default: None)
    pub voxel_thresh: Option<f64>,

    /// Worker count passed to every diagnostic (default: 1)
    pub n_cores: i32,

    /// Directory for table output; nothing is written when None
    pub output_dir: Option<PathBuf>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            diagnostics: vec![DiagnosticKind::Jackknife],
            voxel_thresh: None,
            n_cores: 1,
            output_dir: None,
        }
    }
}

impl WorkflowConfig {
    /// Load from a JSON file; absent fields take their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Diagnostic parameters for one target map
    pub fn diagnostic_config(&self, target_image: &str) -> DiagnosticConfig {
        DiagnosticConfig {
            target_image: target_image.to_string(),
            voxel_thresh: self.voxel_thresh,
            n_cores: self.n_cores,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DiagnosticConfig::default();
        assert_eq!(config.target_image, DEFAULT_TARGET_IMAGE);
        assert_eq!(config.threshold(), 0.0);
        assert_eq!(config.n_cores, 1);
    }

    #[test]
    fn test_workflow_config_partial_json() {
        let config: WorkflowConfig =
            serde_json::from_str(r#"{"diagnostics": ["jackknife", "focuscounter"], "n_cores": 0}"#)
                .unwrap();
        assert_eq!(
            config.diagnostics,
            vec![DiagnosticKind::Jackknife, DiagnosticKind::FocusCounter]
        );
        assert_eq!(config.n_cores, 0);
        assert!(config.output_dir.is_none());

        let diag = config.diagnostic_config("z_corr-FDR");
        assert_eq!(diag.target_image, "z_corr-FDR");
        assert_eq!(diag.n_cores, 0);
    }

    #[test]
    fn test_workflow_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workflow.json");
        std::fs::write(&path, r#"{"voxel_thresh": 1.5, "output_dir": "out"}"#).unwrap();
        let config = WorkflowConfig::from_json_file(&path).unwrap();
        assert_eq!(config.voxel_thresh, Some(1.5));
        assert_eq!(config.output_dir, Some(PathBuf::from("out")));
        assert_eq!(config.diagnostics, vec![DiagnosticKind::Jackknife]);
    }
}
