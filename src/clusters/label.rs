//! Connected-component labeling of thresholded volumes
//!
//! Voxels are connected through shared faces (6-neighbourhood). Each tail of a
//! signed map is labeled separately; cluster ids start at 1 per tail and 0 is
//! background.

use crate::space::{Affine, Volume};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Face-adjacent offsets
pub(crate) const FACE_OFFSETS: [[i64; 3]; 6] = [
    [1, 0, 0],
    [-1, 0, 0],
    [0, 1, 0],
    [0, -1, 0],
    [0, 0, 1],
    [0, 0, -1],
];

/// Side of a signed statistical map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tail {
    /// Values above the threshold
    Positive,
    /// Values below the negated threshold
    Negative,
}

impl Tail {
    /// +1.0 for the positive tail, -1.0 for the negative tail
    pub fn sign(self) -> f64 {
        match self {
            Tail::Positive => 1.0,
            Tail::Negative => -1.0,
        }
    }

    /// Column prefix used in contribution tables (`PosTail` / `NegTail`)
    pub fn column_prefix(self) -> &'static str {
        match self {
            Tail::Positive => "PosTail",
            Tail::Negative => "NegTail",
        }
    }

    /// Contribution table column name for a cluster of this tail
    pub fn column_name(self, cluster_id: u32) -> String {
        format!("{} {}", self.column_prefix(), cluster_id)
    }
}

impl fmt::Display for Tail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tail::Positive => write!(f, "positive"),
            Tail::Negative => write!(f, "negative"),
        }
    }
}

/// Labeled cluster map for one tail
///
/// Same grid as the volume it was derived from. Each voxel holds 0 or the id
/// of the cluster it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelMap {
    tail: Tail,
    shape: [usize; 3],
    affine: Affine,
    labels: Vec<u32>,
    n_clusters: u32,
}

impl LabelMap {
    /// Tail this map was labeled from
    pub fn tail(&self) -> Tail {
        self.tail
    }

    /// Grid shape
    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    /// Grid affine
    pub fn affine(&self) -> &Affine {
        &self.affine
    }

    /// Flat label values (x fastest)
    pub fn labels(&self) -> &[u32] {
        &self.labels
    }

    /// Number of clusters
    pub fn n_clusters(&self) -> u32 {
        self.n_clusters
    }

    /// True if no voxel is labeled
    pub fn is_empty(&self) -> bool {
        self.n_clusters == 0
    }

    /// Cluster ids in ascending order (`1..=n`)
    pub fn cluster_ids(&self) -> Vec<u32> {
        (1..=self.n_clusters).collect()
    }

    /// Label at a voxel; 0 for background or out-of-bounds
    pub fn label_at(&self, ijk: [i64; 3]) -> u32 {
        let [nx, ny, nz] = self.shape;
        if ijk.iter().any(|&c| c < 0) {
            return 0;
        }
        let (i, j, k) = (ijk[0] as usize, ijk[1] as usize, ijk[2] as usize);
        if i >= nx || j >= ny || k >= nz {
            return 0;
        }
        self.labels[i + nx * (j + ny * k)]
    }

    /// Flat grid positions belonging to a cluster
    pub fn flat_indices_of(&self, cluster_id: u32) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter(|&(_, &l)| l == cluster_id)
            .map(|(i, _)| i)
            .collect()
    }

    /// Voxel indices belonging to a cluster
    pub fn voxels_of(&self, cluster_id: u32) -> Vec<[i64; 3]> {
        self.flat_indices_of(cluster_id)
            .into_iter()
            .map(|flat| self.ijk_of(flat))
            .collect()
    }

    fn ijk_of(&self, flat: usize) -> [i64; 3] {
        let [nx, ny, _] = self.shape;
        [
            (flat % nx) as i64,
            ((flat / nx) % ny) as i64,
            (flat / (nx * ny)) as i64,
        ]
    }
}

/// Label face-connected clusters of one tail
///
/// A voxel is significant when `tail.sign() * value > threshold`. Cluster ids
/// are assigned in descending order of peak magnitude, ties broken by the
/// position of the first voxel in scan order.
///
/// # Arguments
///
/// * `volume` - Statistical volume
/// * `threshold` - Voxel-level threshold (applied to the tail-signed value)
/// * `tail` - Which side of the map to label
pub fn label_components(volume: &Volume, threshold: f64, tail: Tail) -> LabelMap {
    let shape = volume.shape();
    let data = volume.data();
    let sign = tail.sign();

    let significant: Vec<bool> = data
        .iter()
        .map(|&v| v.is_finite() && sign * v > threshold)
        .collect();

    let mut visited = vec![false; data.len()];
    // (peak, voxels) per component, in scan order
    let mut components: Vec<(f64, Vec<usize>)> = Vec::new();
    let mut queue = VecDeque::new();

    for start in 0..data.len() {
        if !significant[start] || visited[start] {
            continue;
        }

        visited[start] = true;
        queue.push_back(start);
        let mut members = Vec::new();
        let mut peak = f64::NEG_INFINITY;

        while let Some(flat) = queue.pop_front() {
            members.push(flat);
            peak = peak.max(sign * data[flat]);

            let ijk = volume.ijk_of(flat);
            for off in FACE_OFFSETS {
                let n = [ijk[0] + off[0], ijk[1] + off[1], ijk[2] + off[2]];
                if let Some(nflat) = volume.flat_index(n) {
                    if significant[nflat] && !visited[nflat] {
                        visited[nflat] = true;
                        queue.push_back(nflat);
                    }
                }
            }
        }

        components.push((peak, members));
    }

    // Stable sort keeps scan order among equal peaks
    components.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    let mut labels = vec![0u32; data.len()];
    for (rank, (_, members)) in components.iter().enumerate() {
        for &flat in members {
            labels[flat] = rank as u32 + 1;
        }
    }

    log::debug!(
        "Labeled {} {} clusters above threshold {:.3}",
        components.len(),
        tail,
        threshold
    );

    LabelMap {
        tail,
        shape,
        affine: *volume.affine(),
        labels,
        n_clusters: components.len() as u32,
    }
}
