//! Core data structures and traits for yass3d
//!
//! This crate provides the fundamental types shared by the feature extraction,
//! learning and I/O crates: labeled points, point clouds, the neighbor search
//! trait and the common error type.

pub mod point;
pub mod point_cloud;
pub mod traits;
pub mod error;

pub use point::*;
pub use point_cloud::*;
pub use traits::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Matrix3, Point3, Vector3};
