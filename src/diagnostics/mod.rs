//! Meta-analysis diagnostics
//!
//! Attribute each significant cluster of a meta-analytic map back to the
//! studies that produced it:
//! - Jackknife (leave-one-out re-fits, proportional reduction per cluster)
//! - FocusCounter (foci of each study touching each cluster)
//! - FocusFilter (drops coordinates outside the brain mask)

pub mod contribution;
pub mod focus_counter;
pub mod focus_filter;
pub mod jackknife;

mod common;

pub use contribution::{ContributionRow, ContributionTable};
pub use focus_counter::FocusCounter;
pub use focus_filter::FocusFilter;
pub use jackknife::Jackknife;

use crate::clusters::{ClustersTable, LabelMap};
use crate::config::DiagnosticConfig;
use crate::error::{DiagnosticError, Result};
use crate::meta::MetaResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Everything a cluster diagnostic produces for one target map
#[derive(Debug, Clone)]
pub struct DiagnosticOutput {
    /// Study × cluster contributions
    pub contribution_table: ContributionTable,
    /// Cluster summaries
    pub clusters_table: ClustersTable,
    /// Labeled cluster map per tail
    pub label_maps: Vec<LabelMap>,
}

/// A cluster-level diagnostic applied to a fitted (and corrected) result
pub trait Diagnostic: Send + Sync {
    /// Diagnostic name, used in result table keys
    fn name(&self) -> &'static str;

    /// Parameters in use
    fn config(&self) -> &DiagnosticConfig;

    /// Characterize the clusters of the configured target map
    fn transform(&self, result: &MetaResult) -> Result<DiagnosticOutput>;
}

/// Known diagnostic kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticKind {
    /// Leave-one-out re-fitting
    Jackknife,
    /// Focus counting
    FocusCounter,
}

impl DiagnosticKind {
    /// Every known kind
    pub const ALL: [DiagnosticKind; 2] = [DiagnosticKind::Jackknife, DiagnosticKind::FocusCounter];

    /// Construct the diagnostic for this kind
    pub fn build(self, config: DiagnosticConfig) -> Box<dyn Diagnostic> {
        match self {
            DiagnosticKind::Jackknife => Box::new(Jackknife::new(config)),
            DiagnosticKind::FocusCounter => Box::new(FocusCounter::new(config)),
        }
    }

    /// Lowercase option name
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticKind::Jackknife => "jackknife",
            DiagnosticKind::FocusCounter => "focuscounter",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiagnosticKind {
    type Err = DiagnosticError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == wanted)
            .ok_or_else(|| {
                let options: Vec<&str> = Self::ALL.iter().map(|k| k.as_str()).collect();
                DiagnosticError::Configuration(format!(
                    "\"diagnostics\" of kind string must be {} (got \"{}\")",
                    options.join(", "),
                    s
                ))
            })
    }
}
