//! Meta-analytic datasets
//!
//! A [`Dataset`] is an ordered collection of studies, the peak coordinates
//! they report (world space, mm) and the brain mask they live in. Slicing a
//! dataset produces a new, fully independent dataset; this is how
//! leave-one-out re-fits are built.

use crate::space::Masker;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// A single experiment / contrast
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Study {
    /// Unique study id
    pub id: String,
    /// Image type → file path
    #[serde(default)]
    pub images: BTreeMap<String, String>,
    /// Free-form metadata
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Study {
    /// Study with no images or metadata
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

/// One reported peak (row of the coordinates table)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Owning study id
    pub id: String,
    /// World x (mm)
    pub x: f64,
    /// World y (mm)
    pub y: f64,
    /// World z (mm)
    pub z: f64,
}

impl Coordinate {
    /// New coordinate row
    pub fn new(id: impl Into<String>, x: f64, y: f64, z: f64) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            z,
        }
    }

    /// `[x, y, z]`
    pub fn xyz(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

/// Ordered collection of studies with their coordinates and mask
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    studies: Vec<Study>,
    /// Coordinates table (`id, x, y, z`)
    pub coordinates: Vec<Coordinate>,
    masker: Masker,
}

impl Dataset {
    /// Build a dataset
    pub fn new(studies: Vec<Study>, coordinates: Vec<Coordinate>, masker: Masker) -> Self {
        Self {
            studies,
            coordinates,
            masker,
        }
    }

    /// Studies in dataset order
    pub fn studies(&self) -> &[Study] {
        &self.studies
    }

    /// Study ids in dataset order
    pub fn ids(&self) -> Vec<String> {
        self.studies.iter().map(|s| s.id.clone()).collect()
    }

    /// Number of studies
    pub fn len(&self) -> usize {
        self.studies.len()
    }

    /// True if there are no studies
    pub fn is_empty(&self) -> bool {
        self.studies.is_empty()
    }

    /// Default mask of the dataset
    pub fn masker(&self) -> &Masker {
        &self.masker
    }

    /// Coordinates reported by one study
    pub fn coordinates_for<'a>(
        &'a self,
        id: &'a str,
    ) -> impl Iterator<Item = &'a Coordinate> + 'a {
        self.coordinates.iter().filter(move |c| c.id == id)
    }

    /// New dataset restricted to `ids`
    ///
    /// Studies keep dataset order; ids not present in the dataset are ignored.
    /// The slice owns copies of everything and shares no state with `self`.
    pub fn slice<S: AsRef<str>>(&self, ids: &[S]) -> Dataset {
        let keep: HashSet<&str> = ids.iter().map(|s| s.as_ref()).collect();

        let studies: Vec<Study> = self
            .studies
            .iter()
            .filter(|s| keep.contains(s.id.as_str()))
            .cloned()
            .collect();

        if studies.len() < keep.len() {
            log::warn!(
                "{} requested ids are not in the dataset and were ignored",
                keep.len() - studies.len()
            );
        }

        let coordinates = self
            .coordinates
            .iter()
            .filter(|c| keep.contains(c.id.as_str()))
            .cloned()
            .collect();

        Dataset {
            studies,
            coordinates,
            masker: self.masker.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::space::Affine;

    fn toy() -> Dataset {
        let studies = vec![Study::new("a"), Study::new("b"), Study::new("c")];
        let coords = vec![
            Coordinate::new("a", 0.0, 0.0, 0.0),
            Coordinate::new("b", 1.0, 1.0, 1.0),
            Coordinate::new("b", 2.0, 2.0, 2.0),
            Coordinate::new("c", 3.0, 3.0, 3.0),
        ];
        Dataset::new(studies, coords, Masker::full([4, 4, 4], Affine::identity()))
    }

    #[test]
    fn test_slice_keeps_exactly_requested_studies() {
        let dset = toy();
        let sliced = dset.slice(&["c", "b"]);
        assert_eq!(sliced.ids(), vec!["b", "c"]);
        assert_eq!(sliced.coordinates.len(), 3);
        assert_eq!(sliced.coordinates_for("b").count(), 2);
        assert_eq!(sliced.coordinates_for("a").count(), 0);
    }

    #[test]
    fn test_slice_is_independent() {
        let dset = toy();
        let mut sliced = dset.slice(&["a", "b"]);
        sliced.coordinates.clear();
        sliced.studies[0].metadata.insert("k".into(), "v".into());
        assert_eq!(dset.coordinates.len(), 4);
        assert!(dset.studies()[0].metadata.is_empty());
    }

    #[test]
    fn test_slice_ignores_unknown_ids() {
        let dset = toy();
        let sliced = dset.slice(&["a", "zzz"]);
        assert_eq!(sliced.ids(), vec!["a"]);
    }
}
