//! Fast Point Feature Histograms (FPFH)
//!
//! For every point, the simplified point feature histogram (SPFH) bins the
//! Darboux-frame angles `(alpha, phi, theta)` between the point and each
//! neighbor within `feature_radius`. The FPFH of a point is its own SPFH plus
//! the distance-weighted SPFHs of its neighbors, with each of the three
//! sub-histograms normalized to sum to 100.

use std::f64::consts::PI;

use ndarray::Array2;
use rayon::prelude::*;
use yass3d_core::{Result, Vector3d};

use crate::context::CloudContext;
use crate::extractor::{check_radius_pair, rows_to_block, FeatureExtractor, FALLBACK_VALUE};

/// Bins per angular sub-histogram
pub const FPFH_BINS: usize = 11;

/// Total descriptor width
pub const FPFH_DIMENSION: usize = 3 * FPFH_BINS;

/// Local histogram descriptor over a spherical neighborhood
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FpfhExtractor {
    normal_radius: f64,
    feature_radius: f64,
}

type Histogram = [f64; FPFH_DIMENSION];

impl FpfhExtractor {
    pub fn new(normal_radius: f64, feature_radius: f64) -> Result<Self> {
        check_radius_pair("normal_radius", normal_radius, "feature_radius", feature_radius, false)?;
        Ok(Self {
            normal_radius,
            feature_radius,
        })
    }

    /// Darboux-frame features of a point pair: `(alpha, phi, theta)`.
    ///
    /// Returns `None` for coincident points.
    fn pair_features(
        p1: &Vector3d,
        n1: &Vector3d,
        p2: &Vector3d,
        n2: &Vector3d,
    ) -> Option<(f64, f64, f64)> {
        let mut dp2p1 = p2 - p1;
        let distance = dp2p1.norm();
        if distance == 0.0 {
            return None;
        }

        let angle1 = n1.dot(&dp2p1) / distance;
        let angle2 = n2.dot(&dp2p1) / distance;

        // Use the point whose normal makes the smaller angle with the line as source
        let (source, target, theta) = if angle1.abs().acos() > angle2.abs().acos() {
            dp2p1 = -dp2p1;
            (n2, n1, -angle2)
        } else {
            (n1, n2, angle1)
        };

        let v = dp2p1.cross(source);
        let v_norm = v.norm();
        if v_norm == 0.0 {
            return Some((0.0, 0.0, theta));
        }
        let v = v / v_norm;
        let w = source.cross(&v);

        let phi = v.dot(target);
        let alpha = w.dot(target).atan2(source.dot(target));
        Some((alpha, phi, theta))
    }

    fn bin(value: f64) -> usize {
        let index = (FPFH_BINS as f64 * value).floor();
        (index.max(0.0) as usize).min(FPFH_BINS - 1)
    }

    /// SPFH of point `i`; `None` when the point has no usable normal
    fn spfh(
        &self,
        context: &CloudContext<'_>,
        normals: &[Option<Vector3d>],
        i: usize,
        neighbors: &[(usize, f64)],
    ) -> Option<Histogram> {
        let n1 = normals[i]?;
        let p1 = context.positions()[i].coords;

        let pairs: Vec<(f64, f64, f64)> = neighbors
            .iter()
            .filter(|&&(j, _)| j != i)
            .filter_map(|&(j, _)| {
                let n2 = normals[j]?;
                Self::pair_features(&p1, &n1, &context.positions()[j].coords, &n2)
            })
            .collect();

        let mut histogram = [0.0; FPFH_DIMENSION];
        if pairs.is_empty() {
            return Some(histogram);
        }

        let increment = 100.0 / pairs.len() as f64;
        for (alpha, phi, theta) in pairs {
            histogram[Self::bin((alpha + PI) / (2.0 * PI))] += increment;
            histogram[FPFH_BINS + Self::bin((phi + 1.0) * 0.5)] += increment;
            histogram[2 * FPFH_BINS + Self::bin((theta + 1.0) * 0.5)] += increment;
        }
        Some(histogram)
    }

    fn combine(
        own: &Histogram,
        neighbors: &[(usize, f64)],
        i: usize,
        spfh: &[Option<Histogram>],
    ) -> Vec<f64> {
        let mut weighted = [0.0; FPFH_DIMENSION];
        for &(j, distance) in neighbors {
            if j == i || distance == 0.0 {
                continue;
            }
            if let Some(histogram) = &spfh[j] {
                let weight = 1.0 / (distance * distance);
                for (acc, value) in weighted.iter_mut().zip(histogram.iter()) {
                    *acc += weight * value;
                }
            }
        }

        let mut descriptor = own.to_vec();
        for block in 0..3 {
            let range = block * FPFH_BINS..(block + 1) * FPFH_BINS;
            let sum: f64 = weighted[range.clone()].iter().sum();
            if sum > 0.0 {
                let scale = 100.0 / sum;
                for k in range {
                    descriptor[k] += weighted[k] * scale;
                }
            }
        }
        descriptor
    }
}

impl FeatureExtractor for FpfhExtractor {
    fn name(&self) -> &'static str {
        "fpfh"
    }

    fn dimension(&self) -> usize {
        FPFH_DIMENSION
    }

    fn parameters(&self) -> Vec<(String, f64)> {
        vec![
            ("normal_radius".to_string(), self.normal_radius),
            ("feature_radius".to_string(), self.feature_radius),
        ]
    }

    fn compute(&self, context: &CloudContext<'_>) -> Result<Array2<f64>> {
        let geometry = context.local_geometry(self.normal_radius)?;
        let normals: Vec<Option<Vector3d>> = geometry.iter().map(|g| g.map(|g| g.normal)).collect();

        let neighborhoods: Vec<Vec<(usize, f64)>> = (0..context.len())
            .into_par_iter()
            .map(|i| context.radius_neighbors(i, self.feature_radius))
            .collect();

        let spfh: Vec<Option<Histogram>> = (0..context.len())
            .into_par_iter()
            .map(|i| self.spfh(context, &normals, i, &neighborhoods[i]))
            .collect();

        let rows: Vec<Vec<f64>> = (0..context.len())
            .into_par_iter()
            .map(|i| match &spfh[i] {
                Some(own) => Self::combine(own, &neighborhoods[i], i, &spfh),
                None => vec![FALLBACK_VALUE; FPFH_DIMENSION],
            })
            .collect();

        rows_to_block(rows, FPFH_DIMENSION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use yass3d_core::{Error, Point3f, PointCloud, SemanticCloud, SemanticPoint};

    fn bumpy_grid() -> SemanticCloud {
        let mut points = Vec::new();
        for i in 0..10 {
            for j in 0..10 {
                let x = i as f32 * 0.05;
                let y = j as f32 * 0.05;
                let z = 1.0 + 0.1 * (x * 8.0).sin() * (y * 8.0).cos();
                points.push(SemanticPoint::from(Point3f::new(x, y, z)));
            }
        }
        PointCloud::from_points(points)
    }

    #[test]
    fn test_sub_histograms_sum_to_two_hundred() {
        let cloud = bumpy_grid();
        let context = CloudContext::new(&cloud);
        let block = FpfhExtractor::new(0.1, 0.2).unwrap().compute(&context).unwrap();

        assert_eq!(block.dim(), (100, FPFH_DIMENSION));
        let row = block.row(55);
        for sub in 0..3 {
            let sum: f64 = row.iter().skip(sub * FPFH_BINS).take(FPFH_BINS).sum();
            // Own SPFH (100) plus normalized neighbor contribution (100)
            assert_relative_eq!(sum, 200.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_pair_features_of_parallel_normals() {
        let n = Vector3d::new(0.0, 0.0, 1.0);
        let (alpha, phi, theta) = FpfhExtractor::pair_features(
            &Vector3d::new(0.0, 0.0, 0.0),
            &n,
            &Vector3d::new(1.0, 0.0, 0.0),
            &n,
        )
        .unwrap();

        assert_relative_eq!(theta, 0.0, epsilon = 1e-12);
        assert_relative_eq!(phi, 0.0, epsilon = 1e-12);
        assert_relative_eq!(alpha, 0.0, epsilon = 1e-12);
        assert!(FpfhExtractor::pair_features(&n, &n, &n, &n).is_none());
    }

    #[test]
    fn test_bins_are_clamped() {
        assert_eq!(FpfhExtractor::bin(-0.5), 0);
        assert_eq!(FpfhExtractor::bin(0.0), 0);
        assert_eq!(FpfhExtractor::bin(1.0), FPFH_BINS - 1);
        assert_eq!(FpfhExtractor::bin(0.5), 5);
    }

    #[test]
    fn test_isolated_point_uses_fallback() {
        let mut cloud = bumpy_grid();
        cloud.push(SemanticPoint::from(Point3f::new(50.0, 50.0, 50.0)));
        let context = CloudContext::new(&cloud);
        let block = FpfhExtractor::new(0.1, 0.2).unwrap().compute(&context).unwrap();

        assert!(block.row(100).iter().all(|&v| v == FALLBACK_VALUE));
    }

    #[test]
    fn test_normal_radius_may_not_exceed_feature_radius() {
        assert!(FpfhExtractor::new(0.2, 0.2).is_ok());
        assert!(matches!(FpfhExtractor::new(0.3, 0.2), Err(Error::InvalidHyperparameter(_))));
    }
}
