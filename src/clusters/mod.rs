//! Cluster extraction modules
//!
//! Turns a thresholded statistical volume into labeled clusters:
//! - Face-connected labeling per tail
//! - Cluster summary table (centroid, peak, size)
//! - Per-cluster averaging of arbitrary volumes

pub mod average;
pub mod extract;
pub mod label;
pub mod table;

pub use average::LabelAverager;
pub use extract::{extract_clusters, ClusterExtraction};
pub use label::{label_components, LabelMap, Tail};
pub use table::{ClusterRow, ClustersTable};
