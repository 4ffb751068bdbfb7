//! # Meta Diagnostics
//!
//! Post-hoc diagnostics for neuroimaging meta-analyses: attribute each
//! significant cluster of a meta-analytic map back to the studies that
//! produced it.
//!
//! ## Features
//!
//! - **Jackknife**: leave-one-out re-fits, proportional reduction of the
//!   statistic averaged per cluster
//! - **FocusCounter**: number of each study's foci inside or touching each cluster
//! - **FocusFilter**: removal of coordinates outside a brain mask
//! - **Workflow**: run diagnostics on every corrected map and save the tables
//!
//! ## Quick Start
//!
//! ```no_run
//! use meta_diagnostics::{Diagnostic, DiagnosticConfig, Jackknife, MetaResult};
//!
//! # fn corrected_result() -> MetaResult { unimplemented!() }
//! let result: MetaResult = corrected_result();
//!
//! let jackknife = Jackknife::new(DiagnosticConfig::for_target("z_corr-FWE"));
//! let output = jackknife.transform(&result)?;
//!
//! println!("{} clusters", output.clusters_table.len());
//! for row in &output.contribution_table.rows {
//!     println!("{}: {:?}", row.id, row.values);
//! }
//! # Ok::<(), meta_diagnostics::DiagnosticError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Dataset → Estimator::fit → MetaResult → (correction) → Diagnostic::transform → tables
//! ```
//!
//! Logging goes through the `log` facade; the crate installs no logger.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clusters;
pub mod config;
pub mod dataset;
pub mod diagnostics;
pub mod error;
pub mod meta;
pub mod parallel;
pub mod space;

// Re-export main types
pub use config::{DiagnosticConfig, WorkflowConfig};
pub use dataset::{Coordinate, Dataset, Study};
pub use diagnostics::{
    ContributionTable, Diagnostic, DiagnosticKind, DiagnosticOutput, FocusCounter, FocusFilter,
    Jackknife,
};
pub use error::{DiagnosticError, Result};
pub use meta::{Estimator, MetaResult, MkdaDensity, ResultTable};

/// True for maps the workflow characterizes: corrected z maps
pub fn is_corrected_z_map(name: &str) -> bool {
    name.starts_with("z_") && name.contains("_corr-")
}

/// Run the configured diagnostics on every corrected z map of a result
///
/// For each map named `z_*_corr-*` and each diagnostic, stores the cluster
/// table as `<map>_clust` and the contribution table as `<map>_<Diagnostic>`
/// in `result.tables`. Maps whose contribution table is empty get neither.
///
/// # Arguments
///
/// * `result` - Fitted and corrected result; receives the tables
/// * `config` - Diagnostics to run and their shared parameters
///
/// # Errors
///
/// Returns the first `DiagnosticError` raised by a diagnostic, or an I/O error
/// while saving tables to `config.output_dir`
///
/// # Example
///
/// ```no_run
/// use meta_diagnostics::{run_diagnostics, MetaResult, WorkflowConfig};
///
/// # fn corrected_result() -> MetaResult { unimplemented!() }
/// let mut result = corrected_result();
/// run_diagnostics(&mut result, &WorkflowConfig::default())?;
/// # Ok::<(), meta_diagnostics::DiagnosticError>(())
/// ```
pub fn run_diagnostics(result: &mut MetaResult, config: &WorkflowConfig) -> Result<()> {
    use std::time::Instant;
    let start_time = Instant::now();

    let targets: Vec<String> = result
        .map_names()
        .into_iter()
        .filter(|name| is_corrected_z_map(name))
        .collect();

    if targets.is_empty() {
        log::warn!(
            "No corrected z maps found in result; available maps are {:?}",
            result.map_names()
        );
    }

    let mut stored = 0usize;
    for target in &targets {
        for kind in &config.diagnostics {
            let diagnostic = kind.build(config.diagnostic_config(target));
            log::info!("Running {} on '{}'", diagnostic.name(), target);

            let output = diagnostic.transform(result)?;

            let clust_key = format!("{}_clust", target);
            let contribution_key = format!("{}_{}", target, diagnostic.name());

            if output.contribution_table.is_empty() {
                log::warn!(
                    "Contribution table is empty; neither {} nor {} will be stored",
                    clust_key,
                    contribution_key
                );
                continue;
            }

            result.add_table(clust_key, ResultTable::Clusters(output.clusters_table));
            result.add_table(
                contribution_key,
                ResultTable::Contribution(output.contribution_table),
            );
            stored += 1;
        }
    }

    if let Some(dir) = &config.output_dir {
        let written = result.save_tables(dir)?;
        log::info!("Wrote {} tables to {}", written.len(), dir.display());
    }

    log::debug!(
        "Diagnostics finished: {} maps, {} table pairs stored in {:.1} ms",
        targets.len(),
        stored,
        start_time.elapsed().as_secs_f32() * 1000.0
    );

    Ok(())
}
