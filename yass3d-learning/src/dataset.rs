//! Assembly of the global training matrix

use std::sync::atomic::{AtomicUsize, Ordering};

use ndarray::{concatenate, Array2, ArrayView2, Axis};
use rayon::prelude::*;
use tracing::{debug, info};
use yass3d_core::{Error, Label, LabelPresence, Result, SemanticCloud};
use yass3d_features::{FeatureManager, FeatureSignature};

/// Stacked features and labels of every training point.
///
/// Row `r` of `features` belongs to `labels[r]`; rows follow cloud order, then
/// point order.
#[derive(Debug, Clone)]
pub struct TrainingSet {
    pub features: Array2<f64>,
    pub labels: Vec<Label>,
    /// Layout of the feature columns
    pub signature: FeatureSignature,
}

impl TrainingSet {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn feature_dimension(&self) -> usize {
        self.features.ncols()
    }
}

/// Compute features for every cloud and stack them with their labels.
///
/// All clouds are checked for labels before any feature is computed.
///
/// # Arguments
/// * `clouds` - Labeled training clouds
/// * `manager` - Feature layout shared with inference
pub fn build_training_set(clouds: &[SemanticCloud], manager: &FeatureManager) -> Result<TrainingSet> {
    if clouds.is_empty() {
        return Err(Error::EmptyDataset("no training clouds".to_string()));
    }

    let mut all_labels = Vec::with_capacity(clouds.iter().map(|c| c.len()).sum());
    for (cloud_index, cloud) in clouds.iter().enumerate() {
        all_labels.extend(cloud_labels(cloud_index, cloud)?);
    }
    if all_labels.is_empty() {
        return Err(Error::EmptyDataset(format!("{} training clouds contain no points", clouds.len())));
    }

    let completed = AtomicUsize::new(0);
    let blocks: Vec<Array2<f64>> = clouds
        .par_iter()
        .enumerate()
        .map(|(cloud_index, cloud)| {
            let features = manager.compute_features(cloud)?;
            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            debug!(cloud = cloud_index, points = cloud.len(), done, total = clouds.len(), "extracted features");
            Ok(features)
        })
        .collect::<Result<_>>()?;

    let views: Vec<ArrayView2<'_, f64>> = blocks.iter().map(|b| b.view()).collect();
    let features = concatenate(Axis(0), &views)
        .map_err(|e| Error::InvalidData(format!("stacking feature blocks: {}", e)))?;

    info!(
        clouds = clouds.len(),
        points = features.nrows(),
        dimension = features.ncols(),
        "assembled training set"
    );

    Ok(TrainingSet {
        features,
        labels: all_labels,
        signature: manager.signature(),
    })
}

fn cloud_labels(cloud_index: usize, cloud: &SemanticCloud) -> Result<Vec<Label>> {
    if cloud.is_empty() {
        return Ok(Vec::new());
    }
    match cloud.label_presence() {
        Ok(LabelPresence::All) => Ok(cloud.iter().filter_map(|p| p.label).collect()),
        Ok(LabelPresence::None) | Err(Error::MixedLabels { .. }) => {
            let point = cloud.iter().position(|p| p.label.is_none()).unwrap_or(0);
            Err(Error::MissingLabel { cloud: cloud_index, point })
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yass3d_core::{Point3f, PointCloud, SemanticPoint};
    use yass3d_features::PositionExtractor;

    fn labeled_cloud(count: usize, label: Label) -> SemanticCloud {
        PointCloud::from_points(
            (0..count)
                .map(|i| SemanticPoint::labeled(Point3f::new(i as f32, label as f32, 0.0), [255, 255, 255], label))
                .collect(),
        )
    }

    fn manager() -> FeatureManager {
        FeatureManager::new().with_extractor(Box::new(PositionExtractor::new())).unwrap()
    }

    #[test]
    fn test_rows_follow_cloud_then_point_order() {
        let clouds = vec![labeled_cloud(3, 0), labeled_cloud(2, 1), labeled_cloud(4, 2)];
        let set = build_training_set(&clouds, &manager()).unwrap();

        assert_eq!(set.len(), 9);
        assert_eq!(set.features.dim(), (9, 3));
        assert_eq!(set.labels, vec![0, 0, 0, 1, 1, 2, 2, 2, 2]);
        assert_eq!(set.features[[3, 0]], 0.0);
        assert_eq!(set.features[[4, 1]], 1.0);
        assert_eq!(set.features[[8, 0]], 3.0);
        assert_eq!(set.signature.dimension(), 3);
    }

    #[test]
    fn test_no_clouds_is_empty_dataset() {
        assert!(matches!(build_training_set(&[], &manager()), Err(Error::EmptyDataset(_))));
    }

    #[test]
    fn test_only_empty_clouds_is_empty_dataset() {
        let clouds = vec![SemanticCloud::new(), SemanticCloud::new()];
        assert!(matches!(build_training_set(&clouds, &manager()), Err(Error::EmptyDataset(_))));
    }

    #[test]
    fn test_unlabeled_cloud_rejected_before_extraction() {
        let mut unlabeled = labeled_cloud(3, 1);
        for point in unlabeled.iter_mut() {
            point.label = None;
        }
        let clouds = vec![labeled_cloud(2, 0), unlabeled];
        let manager = manager();

        assert!(matches!(
            build_training_set(&clouds, &manager),
            Err(Error::MissingLabel { cloud: 1, point: 0 })
        ));
        // Nothing was computed, so registration is still open
        assert!(!manager.is_frozen());
    }

    #[test]
    fn test_partially_labeled_cloud_reports_point() {
        let mut cloud = labeled_cloud(4, 0);
        cloud[2].label = None;
        assert!(matches!(
            build_training_set(&[cloud], &manager()),
            Err(Error::MissingLabel { cloud: 0, point: 2 })
        ));
    }
}
