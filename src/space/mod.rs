//! Brain-space primitives
//!
//! - Affine voxel ↔ world mapping
//! - Dense 3D volumes
//! - Mask flattening (volume ↔ in-mask vector)

pub mod affine;
pub mod masker;
pub mod volume;

pub use affine::{voxel_to_world, world_to_voxel, Affine};
pub use masker::Masker;
pub use volume::Volume;
