//! Point types and related functionality

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// A 3D point with floating point coordinates
pub type Point3f = Point3<f32>;

/// A 3D point with double precision coordinates
pub type Point3d = Point3<f64>;

/// A 3D vector with floating point components
pub type Vector3f = Vector3<f32>;

/// A 3D vector with double precision components
pub type Vector3d = Vector3<f64>;

/// Semantic class id
pub type Label = u32;

/// Default color for points loaded without a color channel
pub const DEFAULT_COLOR: [u8; 3] = [255, 255, 255];

/// A point with color and an optional ground-truth label
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SemanticPoint {
    pub position: Point3f,
    pub color: [u8; 3],
    pub label: Option<Label>,
}

impl SemanticPoint {
    /// Create an unlabeled point
    pub fn new(position: Point3f, color: [u8; 3]) -> Self {
        Self {
            position,
            color,
            label: None,
        }
    }

    /// Create a labeled point
    pub fn labeled(position: Point3f, color: [u8; 3], label: Label) -> Self {
        Self {
            position,
            color,
            label: Some(label),
        }
    }

    /// Position in double precision, as used by the feature extractors
    pub fn position_f64(&self) -> Point3d {
        self.position.cast::<f64>()
    }
}

impl Default for SemanticPoint {
    fn default() -> Self {
        Self {
            position: Point3f::origin(),
            color: DEFAULT_COLOR,
            label: None,
        }
    }
}

impl From<SemanticPoint> for Point3f {
    fn from(point: SemanticPoint) -> Self {
        point.position
    }
}

impl From<Point3f> for SemanticPoint {
    fn from(position: Point3f) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }
}
