//! Difference of Normals (DoN) feature

use ndarray::Array2;
use yass3d_core::Result;

use crate::context::CloudContext;
use crate::extractor::{check_radius_pair, FeatureExtractor, FALLBACK_VALUE};

/// Half the difference between the normal at `small_radius` and the normal
/// at `large_radius`, followed by its magnitude.
///
/// Flat regions give values near zero; edges and small structures give
/// larger magnitudes. Both normals are oriented toward the same viewpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DifferenceOfNormalsExtractor {
    small_radius: f64,
    large_radius: f64,
}

impl DifferenceOfNormalsExtractor {
    pub fn new(small_radius: f64, large_radius: f64) -> Result<Self> {
        check_radius_pair("small_radius", small_radius, "large_radius", large_radius, true)?;
        Ok(Self {
            small_radius,
            large_radius,
        })
    }
}

impl FeatureExtractor for DifferenceOfNormalsExtractor {
    fn name(&self) -> &'static str {
        "difference_of_normals"
    }

    fn dimension(&self) -> usize {
        4
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

        let mut block = Array2::from_elem((context.len(), 4), FALLBACK_VALUE);
        for (i, mut row) in block.rows_mut().into_iter().enumerate() {
            if let (Some(s), Some(l)) = (&small[i], &large[i]) {
                let don = (s.normal - l.normal) * 0.5;
                row[0] = don.x;
                row[1] = don.y;
                row[2] = don.z;
                row[3] = don.norm();
            }
        }
        Ok(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use yass3d_core::{Point3f, PointCloud, SemanticCloud, SemanticPoint};

    fn plane(z: f32) -> SemanticCloud {
        let mut points = Vec::new();
        for i in 0..8 {
            for j in 0..8 {
                points.push(SemanticPoint::from(Point3f::new(i as f32 * 0.05, j as f32 * 0.05, z)));
            }
        }
        PointCloud::from_points(points)
    }

    #[test]
    fn test_flat_plane_has_zero_difference() {
        let cloud = plane(1.0);
        let context = CloudContext::new(&cloud);
        let block = DifferenceOfNormalsExtractor::new(0.1, 0.2)
            .unwrap()
            .compute(&context)
            .unwrap();

        assert_eq!(block.dim(), (64, 4));
        for row in block.rows() {
            assert_relative_eq!(row[3], 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_sparse_cloud_falls_back() {
        let cloud: SemanticCloud = PointCloud::from_points(vec![
            SemanticPoint::from(Point3f::new(0.0, 0.0, 0.0)),
            SemanticPoint::from(Point3f::new(1.0, 0.0, 0.0)),
        ]);
        let context = CloudContext::new(&cloud);
        let block = DifferenceOfNormalsExtractor::new(0.1, 0.2)
            .unwrap()
            .compute(&context)
            .unwrap();

        assert!(block.iter().all(|&v| v == FALLBACK_VALUE));
    }

    #[test]
    fn test_signature_parameters() {
        let don = DifferenceOfNormalsExtractor::new(0.1, 0.2).unwrap();
        let signature = don.signature();
        assert_eq!(signature.name, "difference_of_normals");
        assert_eq!(signature.dimension, 4);
        assert_eq!(signature.parameters[1], ("large_radius".to_string(), 0.2));
    }
}
