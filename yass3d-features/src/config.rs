//! Serializable extractor configuration

use serde::{Deserialize, Serialize};
use yass3d_core::{Error, Result};

use crate::{
    CurvatureExtractor, DifferenceOfNormalsExtractor, ExtractorSignature, FeatureExtractor,
    FeatureManager, FeatureSignature, FpfhExtractor, NormalizedColorExtractor, PositionExtractor,
};

/// One entry of an extractor registration, as written in configuration files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractorConfig {
    Fpfh { normal_radius: f64, feature_radius: f64 },
    Curvature { small_radius: f64, large_radius: f64 },
    Position,
    NormalizedColor,
    DifferenceOfNormals { small_radius: f64, large_radius: f64 },
}

impl ExtractorConfig {
    /// Instantiate the extractor, validating its radii
    pub fn build(&self) -> Result<Box<dyn FeatureExtractor>> {
        Ok(match *self {
            ExtractorConfig::Fpfh { normal_radius, feature_radius } => {
                Box::new(FpfhExtractor::new(normal_radius, feature_radius)?)
            }
            ExtractorConfig::Curvature { small_radius, large_radius } => {
                Box::new(CurvatureExtractor::new(small_radius, large_radius)?)
            }
            ExtractorConfig::Position => Box::new(PositionExtractor::new()),
            ExtractorConfig::NormalizedColor => Box::new(NormalizedColorExtractor::new()),
            ExtractorConfig::DifferenceOfNormals { small_radius, large_radius } => {
                Box::new(DifferenceOfNormalsExtractor::new(small_radius, large_radius)?)
            }
        })
    }

    /// Recover the configuration that produced `signature`
    pub fn from_signature(signature: &ExtractorSignature) -> Result<Self> {
        let param = |key: &str| {
            signature
                .parameters
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| *value)
                .ok_or_else(|| {
                    Error::IncompatibleModel(format!("extractor '{}' lacks parameter '{}'", signature.name, key))
                })
        };

        Ok(match signature.name.as_str() {
            "fpfh" => ExtractorConfig::Fpfh {
                normal_radius: param("normal_radius")?,
                feature_radius: param("feature_radius")?,
            },
            "curvature" => ExtractorConfig::Curvature {
                small_radius: param("small_radius")?,
                large_radius: param("large_radius")?,
            },
            "position" => ExtractorConfig::Position,
            "normalized_color" => ExtractorConfig::NormalizedColor,
            "difference_of_normals" => ExtractorConfig::DifferenceOfNormals {
                small_radius: param("small_radius")?,
                large_radius: param("large_radius")?,
            },
            other => return Err(Error::IncompatibleModel(format!("unknown extractor '{}'", other))),
        })
    }

    /// Extractor set used by the reference training driver
    pub fn default_set() -> Vec<ExtractorConfig> {
        vec![
            ExtractorConfig::Fpfh { normal_radius: 0.1, feature_radius: 0.2 },
            ExtractorConfig::Curvature { small_radius: 0.1, large_radius: 0.3 },
            ExtractorConfig::Position,
            ExtractorConfig::NormalizedColor,
            ExtractorConfig::DifferenceOfNormals { small_radius: 0.1, large_radius: 0.2 },
        ]
    }
}

/// Build a manager registering `configs` in order
pub fn build_feature_manager(configs: &[ExtractorConfig]) -> Result<FeatureManager> {
    let mut manager = FeatureManager::new();
    for config in configs {
        manager.add_feature_extractor(config.build()?)?;
    }
    Ok(manager)
}

/// Configurations reproducing a whole stored layout, in order
pub fn configs_from_signature(signature: &FeatureSignature) -> Result<Vec<ExtractorConfig>> {
    signature.extractors.iter().map(ExtractorConfig::from_signature).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FPFH_DIMENSION;

    #[test]
    fn test_default_set_dimension() {
        let manager = build_feature_manager(&ExtractorConfig::default_set()).unwrap();
        assert_eq!(manager.len(), 5);
        assert_eq!(manager.feature_dimension(), FPFH_DIMENSION + 6 + 3 + 3 + 4);

        let names: Vec<String> = manager.signature().extractors.into_iter().map(|e| e.name).collect();
        assert_eq!(
            names,
            vec!["fpfh", "curvature", "position", "normalized_color", "difference_of_normals"]
        );
    }

    #[test]
    fn test_signature_reproduces_configuration() {
        let configs = ExtractorConfig::default_set();
        let manager = build_feature_manager(&configs).unwrap();
        let recovered = configs_from_signature(&manager.signature()).unwrap();
        assert_eq!(recovered, configs);

        let unknown = ExtractorSignature {
            name: "intensity".to_string(),
            dimension: 1,
            parameters: Vec::new(),
        };
        assert!(matches!(ExtractorConfig::from_signature(&unknown), Err(Error::IncompatibleModel(_))));
    }

    #[test]
    fn test_invalid_radius_rejected() {
        let configs = vec![ExtractorConfig::DifferenceOfNormals { small_radius: 0.2, large_radius: 0.1 }];
        assert!(matches!(
            build_feature_manager(&configs),
            Err(Error::InvalidHyperparameter(_))
        ));
    }
}
