//! # yass3d Features
//!
//! Per-point feature extraction for semantic labeling of point clouds.
//!
//! A [`FeatureManager`] owns an ordered list of [`FeatureExtractor`]s and
//! concatenates their per-point blocks into one fixed-width feature vector.
//! Geometric extractors share a per-cloud [`CloudContext`] holding the
//! spatial index and cached local geometry.
//!
//! Points whose neighborhood is too small for a plane fit receive
//! [`FALLBACK_VALUE`] in every column that depends on that estimate.

pub mod nearest_neighbor;
pub mod normals;
pub mod context;
pub mod extractor;
pub mod curvature;
pub mod position;
pub mod color;
pub mod difference_of_normals;
pub mod fpfh;
pub mod manager;
pub mod config;

// Re-export commonly used items
pub use nearest_neighbor::*;
pub use normals::*;
pub use context::*;
pub use extractor::*;
pub use curvature::*;
pub use position::*;
pub use color::*;
pub use difference_of_normals::*;
pub use fpfh::*;
pub use manager::*;
pub use config::*;
