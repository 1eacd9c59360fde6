//! Inference and semantic recoloring

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;
use yass3d_core::{Error, Label, Result, SemanticCloud};
use yass3d_features::FeatureManager;

use crate::model::LinearModel;

/// Predict the class of one feature vector
pub fn predict(model: &LinearModel, feature_vector: &[f64]) -> Result<Label> {
    model.predict(feature_vector)
}

/// Predict a label for every point of `cloud`.
///
/// The manager's layout must match the one the model was trained with.
pub fn label_cloud(model: &LinearModel, manager: &FeatureManager, cloud: &SemanticCloud) -> Result<Vec<Label>> {
    model.signature.ensure_compatible(&manager.signature())?;
    let features = manager.compute_features(cloud)?;
    let labels = model.predict_rows(features.view())?;
    info!(points = labels.len(), "labeled cloud");
    Ok(labels)
}

/// Mapping from class id to display color
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorScheme {
    colors: BTreeMap<Label, [u8; 3]>,
}

/// Colors handed out by [`ColorScheme::palette`], in class order
const PALETTE: [[u8; 3]; 10] = [
    [230, 25, 75],
    [60, 180, 75],
    [0, 130, 200],
    [255, 225, 25],
    [245, 130, 48],
    [145, 30, 180],
    [70, 240, 240],
    [240, 50, 230],
    [128, 128, 0],
    [0, 0, 128],
];

impl ColorScheme {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scheme built from colors listed in class order
    pub fn from_colors(colors: &[[u8; 3]]) -> Self {
        Self {
            colors: colors.iter().enumerate().map(|(i, &c)| (i as Label, c)).collect(),
        }
    }

    /// Distinct colors for `class_count` classes; cycles past the palette size
    pub fn palette(class_count: usize) -> Self {
        Self {
            colors: (0..class_count)
                .map(|i| (i as Label, PALETTE[i % PALETTE.len()]))
                .collect(),
        }
    }

    pub fn with_color(mut self, label: Label, color: [u8; 3]) -> Self {
        self.colors.insert(label, color);
        self
    }

    pub fn color_of(&self, label: Label) -> Option<[u8; 3]> {
        self.colors.get(&label).copied()
    }

    /// Check that every class in `0..class_count` has a color
    pub fn validate_for(&self, class_count: usize) -> Result<()> {
        match (0..class_count as Label).find(|label| !self.colors.contains_key(label)) {
            Some(label) => Err(Error::UnknownLabel(label)),
            None => Ok(()),
        }
    }
}

/// Overwrite each point's color with the color of its label.
///
/// All labels are checked first; on error the cloud is left untouched.
pub fn recolor(cloud: &mut SemanticCloud, labels: &[Label], scheme: &ColorScheme) -> Result<()> {
    if labels.len() != cloud.len() {
        return Err(Error::dimension_mismatch("labels for recoloring", cloud.len(), labels.len()));
    }

    let colors = labels
        .iter()
        .map(|&label| scheme.color_of(label).ok_or(Error::UnknownLabel(label)))
        .collect::<Result<Vec<_>>>()?;

    for (point, color) in cloud.iter_mut().zip(colors) {
        point.color = color;
    }
    Ok(())
}
