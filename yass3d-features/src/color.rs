//! Normalized (chromaticity) color feature

use ndarray::Array2;
use yass3d_core::Result;

use crate::context::CloudContext;
use crate::extractor::FeatureExtractor;

/// Emits `r, g, b` divided by `r + g + b`.
///
/// Black has no chromaticity and maps to `1/3` per channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizedColorExtractor;

impl NormalizedColorExtractor {
    pub fn new() -> Self {
        Self
    }

    fn normalize(color: [u8; 3]) -> [f64; 3] {
        let sum: f64 = color.iter().map(|&c| c as f64).sum();
        if sum == 0.0 {
            return [1.0 / 3.0; 3];
        }
        [
            color[0] as f64 / sum,
            color[1] as f64 / sum,
            color[2] as f64 / sum,
        ]
    }
}

impl FeatureExtractor for NormalizedColorExtractor {
    fn name(&self) -> &'static str {
        "normalized_color"
    }

    fn dimension(&self) -> usize {
        3
    }

    fn compute(&self, context: &CloudContext<'_>) -> Result<Array2<f64>> {
        let cloud = context.cloud();
        let mut block = Array2::zeros((cloud.len(), 3));
        for (mut row, point) in block.rows_mut().into_iter().zip(cloud.iter()) {
            let normalized = Self::normalize(point.color);
            row[0] = normalized[0];
            row[1] = normalized[1];
            row[2] = normalized[2];
        }
        Ok(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use yass3d_core::{Point3f, PointCloud, SemanticCloud, SemanticPoint};

    #[test]
    fn test_chromaticity_sums_to_one() {
        let cloud: SemanticCloud = PointCloud::from_points(vec![
            SemanticPoint::new(Point3f::origin(), [200, 50, 0]),
            SemanticPoint::new(Point3f::origin(), [0, 0, 0]),
            SemanticPoint::new(Point3f::origin(), [10, 10, 10]),
        ]);
        let context = CloudContext::new(&cloud);
        let block = NormalizedColorExtractor::new().compute(&context).unwrap();

        assert_relative_eq!(block[[0, 0]], 0.8);
        assert_relative_eq!(block[[0, 1]], 0.2);
        assert_relative_eq!(block[[0, 2]], 0.0);
        for row in block.rows() {
            assert_relative_eq!(row.sum(), 1.0, epsilon = 1e-12);
        }
        assert_relative_eq!(block[[1, 0]], 1.0 / 3.0);
        assert_relative_eq!(block[[2, 2]], 1.0 / 3.0);
    }
}
