//! Pipeline configuration

use serde::{Deserialize, Serialize};
use yass3d_core::{Error, Result};
use yass3d_features::{build_feature_manager, ExtractorConfig, FeatureManager};

use crate::applicator::ColorScheme;
use crate::hyperparameters::Hyperparameters;

/// Everything one training or labeling run is parameterized by
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Number of semantic classes; labels lie in `0..class_count`
    pub class_count: usize,

    /// Recoloring palette in class order; a generated palette is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colors: Option<Vec<[u8; 3]>>,

    /// Extractors in registration order
    pub extractors: Vec<ExtractorConfig>,

    pub hyperparameters: Hyperparameters,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            class_count: 3,
            colors: None,
            extractors: ExtractorConfig::default_set(),
            hyperparameters: Hyperparameters::uniform(3),
        }
    }
}

impl PipelineConfig {
    /// Reject configurations that would fail later in the pipeline
    pub fn validate(&self) -> Result<()> {
        if self.extractors.is_empty() {
            return Err(Error::InvalidHyperparameter("at least one feature extractor is required".to_string()));
        }
        for extractor in &self.extractors {
            extractor.build()?;
        }
        self.hyperparameters.validate(self.class_count)?;
        self.color_scheme().validate_for(self.class_count)
    }

    /// Fresh manager with the configured extractors registered in order
    pub fn feature_manager(&self) -> Result<FeatureManager> {
        build_feature_manager(&self.extractors)
    }

    pub fn color_scheme(&self) -> ColorScheme {
        match &self.colors {
            Some(colors) => ColorScheme::from_colors(colors),
            None => ColorScheme::palette(self.class_count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_reference_driver() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.class_count, 3);
        assert_eq!(config.hyperparameters.epsilon, 0.01);
        assert_eq!(config.hyperparameters.c, 1.0);
        assert_eq!(config.hyperparameters.loss_sensitivity, 0.1);
        assert_eq!(config.feature_manager().unwrap().feature_dimension(), 49);
    }

    #[test]
    fn test_short_palette_rejected() {
        let config = PipelineConfig {
            colors: Some(vec![[255, 0, 0], [0, 255, 0]]),
            ..PipelineConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::UnknownLabel(2))));
    }

    #[test]
    fn test_class_count_must_match_weights() {
        let config = PipelineConfig {
            class_count: 4,
            ..PipelineConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidHyperparameter(_))));
    }

    #[test]
    fn test_empty_extractor_list_rejected() {
        let config = PipelineConfig {
            extractors: Vec::new(),
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
