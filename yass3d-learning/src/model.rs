//! Trained multi-class linear model

use ndarray::ArrayView2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use yass3d_core::{Error, Label, Result};
use yass3d_features::FeatureSignature;

use crate::hyperparameters::{Hyperparameters, SolverType};
use crate::solver::ClassHyperplane;

/// Per-class hyperplanes plus everything needed to reproduce or reuse them.
///
/// Immutable once trained. The feature signature ties the model to the exact
/// extractor layout it was trained on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub solver: SolverType,
    pub class_count: usize,
    pub hyperparameters: Hyperparameters,
    pub signature: FeatureSignature,
    /// Ascending by label; classes absent from training have no entry
    pub hyperplanes: Vec<ClassHyperplane>,
}

impl LinearModel {
    pub fn feature_dimension(&self) -> usize {
        self.signature.dimension()
    }

    /// Labels the model can predict
    pub fn labels(&self) -> Vec<Label> {
        self.hyperplanes.iter().map(|h| h.label).collect()
    }

    /// Structural consistency check, used after deserialization
    pub fn validate(&self) -> Result<()> {
        if self.hyperplanes.is_empty() {
            return Err(Error::InvalidData("model has no class hyperplanes".to_string()));
        }
        let dimension = self.feature_dimension();
        let mut previous: Option<Label> = None;
        for plane in &self.hyperplanes {
            if plane.label as usize >= self.class_count {
                return Err(Error::InvalidData(format!(
                    "hyperplane label {} outside 0..{}",
                    plane.label, self.class_count
                )));
            }
            if previous.is_some_and(|p| p >= plane.label) {
                return Err(Error::InvalidData("hyperplanes are not sorted by label".to_string()));
            }
            if plane.weights.len() != dimension {
                return Err(Error::dimension_mismatch(
                    format!("weights of class {}", plane.label),
                    dimension,
                    plane.weights.len(),
                ));
            }
            previous = Some(plane.label);
        }
        Ok(())
    }

    /// `w_k . x + b_k` for every class, ascending by label
    pub fn decision_values(&self, features: &[f64]) -> Result<Vec<(Label, f64)>> {
        if features.len() != self.feature_dimension() {
            return Err(Error::dimension_mismatch(
                "feature vector",
                self.feature_dimension(),
                features.len(),
            ));
        }
        Ok(self
            .hyperplanes
            .iter()
            .map(|h| (h.label, h.decision_value(features)))
            .collect())
    }

    /// Class with the highest decision value; ties go to the lowest label
    pub fn predict(&self, features: &[f64]) -> Result<Label> {
        let mut best: Option<(Label, f64)> = None;
        for (label, value) in self.decision_values(features)? {
            match best {
                Some((_, top)) if value <= top => {}
                _ => best = Some((label, value)),
            }
        }
        best.map(|(label, _)| label)
            .ok_or_else(|| Error::InvalidData("model has no class hyperplanes".to_string()))
    }

    /// Predict every row of a `(points, dimension)` matrix
    pub fn predict_rows(&self, features: ArrayView2<'_, f64>) -> Result<Vec<Label>> {
        if features.ncols() != self.feature_dimension() {
            return Err(Error::dimension_mismatch(
                "feature matrix columns",
                self.feature_dimension(),
                features.ncols(),
            ));
        }
        (0..features.nrows())
            .into_par_iter()
            .map(|i| {
                let row = features.row(i).to_vec();
                self.predict(&row)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use yass3d_features::ExtractorSignature;

    fn model() -> LinearModel {
        LinearModel {
            solver: SolverType::OneVsRestSvc,
            class_count: 3,
            hyperparameters: Hyperparameters::uniform(3),
            signature: FeatureSignature {
                extractors: vec![ExtractorSignature {
                    name: "toy".to_string(),
                    dimension: 2,
                    parameters: vec![("scale".to_string(), 0.1)],
                }],
            },
            hyperplanes: vec![
                ClassHyperplane { label: 0, weights: vec![1.0, 0.0], bias: 0.0 },
                ClassHyperplane { label: 1, weights: vec![0.0, 1.0], bias: 0.0 },
                ClassHyperplane { label: 2, weights: vec![-1.0, -1.0], bias: 0.0 },
            ],
        }
    }

    #[test]
    fn test_argmax_prediction() {
        let model = model();
        assert_eq!(model.predict(&[5.0, 0.0]).unwrap(), 0);
        assert_eq!(model.predict(&[0.0, 5.0]).unwrap(), 1);
        assert_eq!(model.predict(&[-5.0, -5.0]).unwrap(), 2);
    }

    #[test]
    fn test_ties_go_to_lowest_label() {
        let model = model();
        assert_eq!(model.predict(&[1.0, 1.0]).unwrap(), 0);
        assert_eq!(model.predict(&[0.0, 0.0]).unwrap(), 0);
    }

    #[test]
    fn test_wrong_length_rejected() {
        assert!(matches!(
            model().predict(&[1.0, 2.0, 3.0]),
            Err(Error::DimensionMismatch { expected: 2, found: 3, .. })
        ));
    }

    #[test]
    fn test_predict_rows() {
        let features = array![[5.0, 0.0], [0.0, 5.0], [-5.0, -5.0]];
        assert_eq!(model().predict_rows(features.view()).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_validate_catches_corruption() {
        assert!(model().validate().is_ok());

        let mut bad = model();
        bad.hyperplanes[1].weights.push(0.0);
        assert!(matches!(bad.validate(), Err(Error::DimensionMismatch { .. })));

        let mut bad = model();
        bad.hyperplanes.swap(0, 1);
        assert!(bad.validate().is_err());

        let mut bad = model();
        bad.hyperplanes[2].label = 7;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_json_round_trip_is_exact() {
        let mut model = model();
        model.hyperplanes[0].bias = 0.1 + 0.2;
        let json = serde_json::to_string(&model).unwrap();
        let restored: LinearModel = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, model);
    }
}
