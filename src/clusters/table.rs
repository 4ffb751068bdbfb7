//! Cluster summary table

use super::label::Tail;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// One cluster's summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterRow {
    /// Cluster id within its tail (matches the label map value)
    pub cluster_id: u32,
    /// Tail the cluster belongs to
    pub tail: Tail,
    /// Centroid x (world mm)
    pub x: f64,
    /// Centroid y (world mm)
    pub y: f64,
    /// Centroid z (world mm)
    pub z: f64,
    /// Peak statistic (signed; negative for the negative tail)
    pub peak_stat: f64,
    /// Cluster volume in cubic millimeters
    pub size_mm3: f64,
}

/// Summary of every cluster found in a target map
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClustersTable {
    /// Rows: positive tail ids ascending, then negative tail ids ascending
    pub rows: Vec<ClusterRow>,
}

impl ClustersTable {
    /// Number of clusters
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True if no clusters were found
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows of one tail
    pub fn rows_for(&self, tail: Tail) -> impl Iterator<Item = &ClusterRow> {
        self.rows.iter().filter(move |r| r.tail == tail)
    }

    /// Write as tab-separated values
    ///
    /// Columns: `Cluster ID`, `Tail`, `X`, `Y`, `Z`, `Peak Stat`, `Cluster Size (mm3)`
    pub fn write_tsv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(writer);

        wtr.write_record([
            "Cluster ID",
            "Tail",
            "X",
            "Y",
            "Z",
            "Peak Stat",
            "Cluster Size (mm3)",
        ])?;
        for row in &self.rows {
            wtr.write_record([
                row.cluster_id.to_string(),
                row.tail.to_string(),
                format!("{:.2}", row.x),
                format!("{:.2}", row.y),
                format!("{:.2}", row.z),
                format!("{:.6}", row.peak_stat),
                format!("{:.1}", row.size_mm3),
            ])?;
        }
        wtr.flush()?;
        Ok(())
    }
}
