//! Cluster extraction: threshold, label, summarize

use super::label::{label_components, LabelMap, Tail};
use super::table::{ClusterRow, ClustersTable};
use crate::space::Volume;

/// Output of [`extract_clusters`]
#[derive(Debug, Clone)]
pub struct ClusterExtraction {
    /// One row per cluster across both tails
    pub table: ClustersTable,
    /// One label map per tail (positive first)
    pub label_maps: Vec<LabelMap>,
}

impl ClusterExtraction {
    /// Label map of one tail, if that tail was labeled
    pub fn label_map(&self, tail: Tail) -> Option<&LabelMap> {
        self.label_maps.iter().find(|m| m.tail() == tail)
    }
}

/// Threshold a statistical volume and summarize its clusters
///
/// # Arguments
///
/// * `volume` - Statistical volume (already corrected or raw)
/// * `threshold` - Voxel-level threshold; voxels must exceed it strictly
/// * `two_sided` - Also label the negative tail
///
/// # Returns
///
/// Summary table and per-tail label maps. Tails without clusters still get an
/// (empty) label map.
pub fn extract_clusters(volume: &Volume, threshold: f64, two_sided: bool) -> ClusterExtraction {
    let tails: &[Tail] = if two_sided {
        &[Tail::Positive, Tail::Negative]
    } else {
        &[Tail::Positive]
    };

    let voxel_volume = volume.affine().voxel_volume_mm3();
    let mut rows = Vec::new();
    let mut label_maps = Vec::with_capacity(tails.len());

    for &tail in tails {
        let label_map = label_components(volume, threshold, tail);

        for cluster_id in label_map.cluster_ids() {
            let members = label_map.flat_indices_of(cluster_id);
            rows.push(summarize(volume, &members, cluster_id, tail, voxel_volume));
        }

        label_maps.push(label_map);
    }

    log::debug!(
        "Extracted {} clusters (two_sided={}, threshold={:.3})",
        rows.len(),
        two_sided,
        threshold
    );

    ClusterExtraction {
        table: ClustersTable { rows },
        label_maps,
    }
}

fn summarize(
    volume: &Volume,
    members: &[usize],
    cluster_id: u32,
    tail: Tail,
    voxel_volume: f64,
) -> ClusterRow {
    let data = volume.data();
    let sign = tail.sign();
    let affine = volume.affine();

    let mut sum = [0.0f64; 3];
    let mut peak = f64::NEG_INFINITY;
    for &flat in members {
        let ijk = volume.ijk_of(flat);
        let xyz = affine.apply([ijk[0] as f64, ijk[1] as f64, ijk[2] as f64]);
        for d in 0..3 {
            sum[d] += xyz[d];
        }
        peak = peak.max(sign * data[flat]);
    }
    let n = members.len().max(1) as f64;

    ClusterRow {
        cluster_id,
        tail,
        x: sum[0] / n,
        y: sum[1] / n,
        z: sum[2] / n,
        peak_stat: sign * peak,
        size_mm3: members.len() as f64 * voxel_volume,
    }
}
