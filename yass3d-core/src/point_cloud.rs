//! Point cloud data structures and functionality

use crate::error::{Error, Result};
use crate::point::*;
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// A generic point cloud container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointCloud<T> {
    pub points: Vec<T>,
}

/// A point cloud with color and optional per-point labels
pub type SemanticCloud = PointCloud<SemanticPoint>;

/// Whether the points of a cloud carry ground-truth labels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelPresence {
    /// Every point is labeled
    All,
    /// No point is labeled
    None,
}

impl<T> PointCloud<T> {
    /// Create a new empty point cloud
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Create a new point cloud with specified capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
        }
    }

    /// Create a point cloud from a vector of points
    pub fn from_points(points: Vec<T>) -> Self {
        Self { points }
    }

    /// Get the number of points in the cloud
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the point cloud is empty
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Add a point to the cloud
    pub fn push(&mut self, point: T) {
        self.points.push(point);
    }

    /// Get an iterator over the points
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.points.iter()
    }

    /// Get a mutable iterator over the points
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.points.iter_mut()
    }
}

impl<T> Default for PointCloud<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Index<usize> for PointCloud<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        &self.points[index]
    }
}

impl<T> IndexMut<usize> for PointCloud<T> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.points[index]
    }
}

impl<'a, T> IntoIterator for &'a PointCloud<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

impl<T> FromIterator<T> for PointCloud<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            points: Vec::from_iter(iter),
        }
    }
}

impl PointCloud<SemanticPoint> {
    /// Report whether the cloud is fully labeled or fully unlabeled.
    ///
    /// An empty cloud counts as unlabeled. Mixing labeled and unlabeled
    /// points is rejected with [`Error::MixedLabels`].
    pub fn label_presence(&self) -> Result<LabelPresence> {
        let first = match self.points.first() {
            Some(point) => point.label.is_some(),
            None => return Ok(LabelPresence::None),
        };

        if let Some(point) = self.points.iter().position(|p| p.label.is_some() != first) {
            return Err(Error::MixedLabels { point });
        }

        Ok(if first { LabelPresence::All } else { LabelPresence::None })
    }

    /// Ground-truth labels in point order, or `None` if any point is unlabeled
    pub fn labels(&self) -> Option<Vec<Label>> {
        self.points.iter().map(|p| p.label).collect()
    }

    /// Point positions in double precision
    pub fn positions(&self) -> Vec<Point3d> {
        self.points.iter().map(SemanticPoint::position_f64).collect()
    }

    /// Drop the ground-truth labels, e.g. before running inference on a training cloud
    pub fn without_labels(&self) -> Self {
        self.points
            .iter()
            .map(|p| SemanticPoint::new(p.position, p.color))
            .collect()
    }
}
