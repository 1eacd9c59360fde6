//! Raw 3D position feature

use ndarray::Array2;
use yass3d_core::Result;

use crate::context::CloudContext;
use crate::extractor::FeatureExtractor;

/// Emits `x, y, z` for every point
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionExtractor;

impl PositionExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl FeatureExtractor for PositionExtractor {
    fn name(&self) -> &'static str {
        "position"
    }

    fn dimension(&self) -> usize {
        3
    }

    fn compute(&self, context: &CloudContext<'_>) -> Result<Array2<f64>> {
        let positions = context.positions();
        Ok(Array2::from_shape_fn((positions.len(), 3), |(i, j)| positions[i][j]))
    }
}
