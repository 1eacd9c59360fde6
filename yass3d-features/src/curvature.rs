//! Eigenvalue-based curvature features at two scales

use ndarray::Array2;
use yass3d_core::Result;

use crate::context::CloudContext;
use crate::extractor::{check_radius_pair, FeatureExtractor, FALLBACK_VALUE};
use crate::normals::LocalGeometry;

/// Surface variation, linearity and planarity of the neighborhood covariance,
/// first at `small_radius` and then at `large_radius`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurvatureExtractor {
    small_radius: f64,
    large_radius: f64,
}

impl CurvatureExtractor {
    pub fn new(small_radius: f64, large_radius: f64) -> Result<Self> {
        check_radius_pair("small_radius", small_radius, "large_radius", large_radius, true)?;
        Ok(Self {
            small_radius,
            large_radius,
        })
    }

    fn descriptors(geometry: Option<&LocalGeometry>) -> [f64; 3] {
        match geometry {
            Some(g) => [g.surface_variation(), g.linearity(), g.planarity()],
            None => [FALLBACK_VALUE; 3],
        }
    }
}

impl FeatureExtractor for CurvatureExtractor {
    fn name(&self) -> &'static str {
        "curvature"
    }

    fn dimension(&self) -> usize {
        6
    }

    fn parameters(&self) -> Vec<(String, f64)> {
        vec![
            ("small_radius".to_string(), self.small_radius),
            ("large_radius".to_string(), self.large_radius),
        ]
    }

    fn compute(&self, context: &CloudContext<'_>) -> Result<Array2<f64>> {
        let small = context.local_geometry(self.small_radius)?;
        let large = context.local_geometry(self.large_radius)?;

        let mut block = Array2::zeros((context.len(), 6));
        for (i, mut row) in block.rows_mut().into_iter().enumerate() {
            let s = Self::descriptors(small[i].as_ref());
            let l = Self::descriptors(large[i].as_ref());
            for (j, value) in s.iter().chain(l.iter()).enumerate() {
                row[j] = *value;
            }
        }
        Ok(block)
    }
}
