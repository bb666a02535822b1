//! 2D skeletal rig runtime.
//!
//! A [`Skeleton`] owns an ordered hierarchy of [`Bone`]s, an [`IkManager`] poses it through
//! FABRIK chains, look-at and path constraints, and a [`DeformableMesh`] is skinned to the
//! resulting world transforms. The crate is renderer-agnostic: it produces bone world transforms
//! and deformed vertex positions, packaged as snapshots for renderers and hit-testing.
//!
//! A frame runs as one ordered sequence on a single thread:
//!
//! 1. set bone local poses,
//! 2. [`Skeleton::update_world_transform`],
//! 3. [`IkManager::apply_constraints`],
//! 4. [`DeformableMesh::update_deformation`],
//! 5. [`Skeleton::snapshot`] / [`DeformableMesh::snapshot`] for concurrent readers.

#![forbid(unsafe_code)]

mod error;
mod geometry;
mod math;
mod model;
mod runtime;

pub use error::*;
pub use geometry::{Bounds, polygon_signed_area, triangle_contains};
pub use math::*;
pub use model::*;
pub use runtime::*;
