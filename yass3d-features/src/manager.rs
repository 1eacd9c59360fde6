//! Ordered composition of feature extractors

use std::sync::atomic::{AtomicBool, Ordering};

use ndarray::{s, Array2};
use tracing::debug;
use yass3d_core::{Error, Result, SemanticCloud};

use crate::context::CloudContext;
use crate::extractor::{FeatureExtractor, FeatureSignature};

/// Owns an ordered registration of extractors and concatenates their blocks
/// into one feature vector per point.
///
/// Registration is append-only and happens before first use. The first call
/// to [`FeatureManager::compute_features`] freezes the layout; later
/// registrations fail with [`Error::RegistrationFrozen`].
#[derive(Default)]
pub struct FeatureManager {
    extractors: Vec<Box<dyn FeatureExtractor>>,
    frozen: AtomicBool,
}

impl FeatureManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an extractor; its columns follow those already registered
    pub fn add_feature_extractor(&mut self, extractor: Box<dyn FeatureExtractor>) -> Result<()> {
        if self.is_frozen() {
            return Err(Error::RegistrationFrozen);
        }
        debug!(
            extractor = extractor.name(),
            dimension = extractor.dimension(),
            offset = self.feature_dimension(),
            "registered feature extractor"
        );
        self.extractors.push(extractor);
        Ok(())
    }

    /// Builder-style registration
    pub fn with_extractor(mut self, extractor: Box<dyn FeatureExtractor>) -> Result<Self> {
        self.add_feature_extractor(extractor)?;
        Ok(self)
    }

    /// Total width of the feature vector
    pub fn feature_dimension(&self) -> usize {
        self.extractors.iter().map(|e| e.dimension()).sum()
    }

    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    /// Ordered layout identity, stored with trained models
    pub fn signature(&self) -> FeatureSignature {
        FeatureSignature {
            extractors: self.extractors.iter().map(|e| e.signature()).collect(),
        }
    }

    /// Compute a `(points, feature_dimension)` matrix for `cloud`.
    ///
    /// Extractors run in registration order and their blocks are written
    /// side by side.
    pub fn compute_features(&self, cloud: &SemanticCloud) -> Result<Array2<f64>> {
        if self.extractors.is_empty() {
            return Err(Error::InvalidData("no feature extractors registered".to_string()));
        }
        self.frozen.store(true, Ordering::Release);

        let context = CloudContext::new(cloud);
        let mut features = Array2::zeros((cloud.len(), self.feature_dimension()));
        let mut offset = 0;

        for extractor in &self.extractors {
            let width = extractor.dimension();
            let block = extractor.compute(&context)?;
            if block.nrows() != cloud.len() {
                return Err(Error::dimension_mismatch(
                    format!("rows produced by extractor '{}'", extractor.name()),
                    cloud.len(),
                    block.nrows(),
                ));
            }
            if block.ncols() != width {
                return Err(Error::dimension_mismatch(
                    format!("columns produced by extractor '{}'", extractor.name()),
                    width,
                    block.ncols(),
                ));
            }

            features.slice_mut(s![.., offset..offset + width]).assign(&block);
            offset += width;
        }

        debug!(points = cloud.len(), dimension = offset, "computed feature matrix");
        Ok(features)
    }
}

impl std::fmt::Debug for FeatureManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureManager")
            .field("signature", &self.signature().to_string())
            .field("frozen", &self.is_frozen())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NormalizedColorExtractor, PositionExtractor};
    use yass3d_core::{Point3f, PointCloud, SemanticPoint};

    struct WrongWidth;

    impl FeatureExtractor for WrongWidth {
        fn name(&self) -> &'static str {
            "wrong_width"
        }

        fn dimension(&self) -> usize {
            2
        }

        fn compute(&self, context: &CloudContext<'_>) -> Result<Array2<f64>> {
            Ok(Array2::zeros((context.len(), 5)))
        }
    }

    fn cloud() -> SemanticCloud {
        PointCloud::from_points(vec![
            SemanticPoint::new(Point3f::new(1.0, 2.0, 3.0), [255, 0, 0]),
            SemanticPoint::new(Point3f::new(4.0, 5.0, 6.0), [0, 0, 255]),
        ])
    }

    #[test]
    fn test_concatenation_follows_registration_order() {
        let mut manager = FeatureManager::new();
        manager.add_feature_extractor(Box::new(NormalizedColorExtractor::new())).unwrap();
        manager.add_feature_extractor(Box::new(PositionExtractor::new())).unwrap();
        assert_eq!(manager.feature_dimension(), 6);

        let features = manager.compute_features(&cloud()).unwrap();
        assert_eq!(features.dim(), (2, 6));
        assert_eq!(features.row(0).to_vec(), vec![1.0, 0.0, 0.0, 1.0, 2.0, 3.0]);
        assert_eq!(features.row(1).to_vec(), vec![0.0, 0.0, 1.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_duplicates_are_kept() {
        let manager = FeatureManager::new()
            .with_extractor(Box::new(PositionExtractor::new()))
            .unwrap()
            .with_extractor(Box::new(PositionExtractor::new()))
            .unwrap();

        assert_eq!(manager.len(), 2);
        assert_eq!(manager.feature_dimension(), 6);
    }

    #[test]
    fn test_registration_frozen_after_first_use() {
        let mut manager = FeatureManager::new();
        manager.add_feature_extractor(Box::new(PositionExtractor::new())).unwrap();
        assert!(!manager.is_frozen());

        manager.compute_features(&cloud()).unwrap();
        assert!(manager.is_frozen());
        assert!(matches!(
            manager.add_feature_extractor(Box::new(PositionExtractor::new())),
            Err(Error::RegistrationFrozen)
        ));
        assert_eq!(manager.feature_dimension(), 3);
    }

    #[test]
    fn test_empty_manager_rejected() {
        let manager = FeatureManager::new();
        assert!(matches!(manager.compute_features(&cloud()), Err(Error::InvalidData(_))));
    }

    #[test]
    fn test_misbehaving_extractor_detected() {
        let manager = FeatureManager::new().with_extractor(Box::new(WrongWidth)).unwrap();
        assert!(matches!(
            manager.compute_features(&cloud()),
            Err(Error::DimensionMismatch { expected: 2, found: 5, .. })
        ));
    }

    #[test]
    fn test_empty_cloud_yields_empty_matrix() {
        let manager = FeatureManager::new().with_extractor(Box::new(PositionExtractor::new())).unwrap();
        let features = manager.compute_features(&SemanticCloud::new()).unwrap();
        assert_eq!(features.dim(), (0, 3));
    }
}
