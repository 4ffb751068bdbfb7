//! Meta-analysis result container

use super::estimator::Estimator;
use crate::clusters::ClustersTable;
use crate::diagnostics::contribution::ContributionTable;
use crate::error::{DiagnosticError, Result};
use crate::space::{Masker, Volume};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// A table attached to a result
#[derive(Debug, Clone, PartialEq)]
pub enum ResultTable {
    /// Cluster summary
    Clusters(ClustersTable),
    /// Study × cluster contributions
    Contribution(ContributionTable),
}

impl ResultTable {
    /// Write as tab-separated values
    pub fn write_tsv<W: std::io::Write>(&self, writer: W) -> Result<()> {
        match self {
            ResultTable::Clusters(t) => t.write_tsv(writer),
            ResultTable::Contribution(t) => t.write_tsv(writer),
        }
    }
}

/// Output of an estimator fit, plus anything appended later
///
/// Maps are keyed by name (`stat`, `z`, corrected variants such as
/// `z_desc-size_level-cluster_corr-FWE_method-montecarlo`). Diagnostics only
/// read maps; the only mutation after creation is appending maps (by a
/// corrector) and tables (by the workflow).
#[derive(Debug, Clone)]
pub struct MetaResult {
    estimator: Box<dyn Estimator>,
    masker: Masker,
    maps: BTreeMap<String, Volume>,
    /// Named tables appended by diagnostics
    pub tables: BTreeMap<String, ResultTable>,
}

impl MetaResult {
    /// New result owned by a fitted estimator
    pub fn new(
        estimator: Box<dyn Estimator>,
        masker: Masker,
        maps: BTreeMap<String, Volume>,
    ) -> Self {
        Self {
            estimator,
            masker,
            maps,
            tables: BTreeMap::new(),
        }
    }

    /// Estimator that produced this result
    pub fn estimator(&self) -> &dyn Estimator {
        self.estimator.as_ref()
    }

    /// Masker the maps were fitted in
    pub fn masker(&self) -> &Masker {
        &self.masker
    }

    /// Map names in result order
    pub fn map_names(&self) -> Vec<String> {
        self.maps.keys().cloned().collect()
    }

    /// True if a map with this name exists
    pub fn has_map(&self, name: &str) -> bool {
        self.maps.contains_key(name)
    }

    /// Map as a full volume
    ///
    /// # Errors
    ///
    /// `MissingMap` listing every available map name
    pub fn get_map(&self, name: &str) -> Result<&Volume> {
        self.maps.get(name).ok_or_else(|| DiagnosticError::MissingMap {
            requested: name.to_string(),
            available: self.map_names(),
        })
    }

    /// Map as its in-mask value vector
    pub fn get_map_array(&self, name: &str) -> Result<Vec<f64>> {
        self.masker.transform(self.get_map(name)?)
    }

    /// Add (or replace) a map, e.g. a corrected variant
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` if the volume is not on the result's mask grid
    pub fn add_map(&mut self, name: impl Into<String>, volume: Volume) -> Result<()> {
        if !volume.same_grid(self.masker.mask()) {
            return Err(DiagnosticError::ShapeMismatch(format!(
                "Map shape {:?} is not on the result grid {:?}",
                volume.shape(),
                self.masker.mask().shape()
            )));
        }
        self.maps.insert(name.into(), volume);
        Ok(())
    }

    /// Attach a table
    pub fn add_table(&mut self, name: impl Into<String>, table: ResultTable) {
        self.tables.insert(name.into(), table);
    }

    /// Write every table to `<dir>/<name>.tsv`, creating `dir` if needed
    ///
    /// # Returns
    ///
    /// Paths written, in table-name order
    pub fn save_tables(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dir)?;
        let mut written = Vec::with_capacity(self.tables.len());
        for (name, table) in &self.tables {
            let path = dir.join(format!("{}.tsv", name));
            let file = File::create(&path)?;
            table.write_tsv(BufWriter::new(file))?;
            written.push(path);
        }
        log::debug!("Saved {} tables to {}", written.len(), dir.display());
        Ok(written)
    }
}
