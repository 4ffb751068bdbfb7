//! Per-study worker pool
//!
//! Each diagnostic invocation builds its own rayon pool and runs one task per
//! study. Results are keyed by study id, so callers never depend on completion
//! order. The first failing task aborts the whole call.

use crate::error::{DiagnosticError, Result};
use rayon::prelude::*;
use std::collections::HashMap;

/// Resolve a configured worker count
///
/// Non-positive values mean "all available execution units"; values above
/// that are clamped with a warning.
pub fn resolve_n_cores(n_cores: i32) -> usize {
    let available = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);

    if n_cores <= 0 {
        available
    } else if n_cores as usize > available {
        log::warn!(
            "Desired number of cores ({}) greater than number available ({}). Setting to {}.",
            n_cores,
            available,
            available
        );
        available
    } else {
        n_cores as usize
    }
}

/// Run `task` once per study id on a bounded pool
///
/// # Arguments
///
/// * `ids` - Study ids, in submission order
/// * `n_cores` - Configured worker count (see [`resolve_n_cores`])
/// * `task` - Per-study unit of work
///
/// # Errors
///
/// Returns `DiagnosticError::Processing` if the pool cannot be built, or the
/// first error returned by any task
pub fn map_studies<T, F>(ids: &[String], n_cores: i32, task: F) -> Result<HashMap<String, T>>
where
    T: Send,
    F: Fn(&str) -> Result<T> + Sync + Send,
{
    let n_threads = resolve_n_cores(n_cores);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .build()
        .map_err(|e| DiagnosticError::Processing(format!("Failed to build worker pool: {}", e)))?;

    log::debug!("Dispatching {} study tasks on {} workers", ids.len(), n_threads);

    pool.install(|| {
        ids.par_iter()
            .map(|id| task(id).map(|value| (id.clone(), value)))
            .collect()
    })
}
