//! Solver hyperparameters

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use yass3d_core::{Error, Label, Result};

/// Linear classification scheme used by the solver
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverType {
    /// L1-regularized L2-loss SVC per class against all others, trained by
    /// primal coordinate descent
    #[default]
    L1rL2lossSvc,
    /// Linear-kernel C-SVC per class against all others, solved in the dual
    OneVsRestSvc,
}

/// Cost multiplier applied to one class
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassWeight {
    pub label: Label,
    pub weight: f64,
}

impl ClassWeight {
    pub fn new(label: Label, weight: f64) -> Self {
        Self { label, weight }
    }
}

/// Immutable solver configuration.
///
/// `class_weights` must name every class id in `0..class_count` exactly once.
/// `loss_sensitivity` is the epsilon-insensitive loss width used by
/// regression solvers; it is validated and recorded with the model but has
/// no effect on classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hyperparameters {
    #[serde(default)]
    pub solver: SolverType,
    /// Stopping tolerance
    pub epsilon: f64,
    /// Soft-margin cost
    pub c: f64,
    #[serde(default)]
    pub loss_sensitivity: f64,
    pub class_weights: Vec<ClassWeight>,
}

impl Hyperparameters {
    /// Default settings with weight 1.0 for every class
    pub fn uniform(class_count: usize) -> Self {
        Self {
            solver: SolverType::default(),
            epsilon: 0.01,
            c: 1.0,
            loss_sensitivity: 0.1,
            class_weights: (0..class_count as Label).map(|label| ClassWeight::new(label, 1.0)).collect(),
        }
    }

    /// Weight of `label`, if the mapping names it
    pub fn weight_of(&self, label: Label) -> Option<f64> {
        self.class_weights.iter().find(|w| w.label == label).map(|w| w.weight)
    }

    /// Check every scalar and that the weights cover exactly `0..class_count`
    pub fn validate(&self, class_count: usize) -> Result<()> {
        if class_count == 0 {
            return Err(invalid("class count must be at least 1".to_string()));
        }
        check_positive("epsilon", self.epsilon)?;
        check_positive("C", self.c)?;
        if !self.loss_sensitivity.is_finite() || self.loss_sensitivity < 0.0 {
            return Err(invalid(format!(
                "loss sensitivity must be finite and non-negative, got {}",
                self.loss_sensitivity
            )));
        }

        let mut seen = BTreeSet::new();
        for class_weight in &self.class_weights {
            if class_weight.label as usize >= class_count {
                return Err(invalid(format!(
                    "class weight names label {} outside 0..{}",
                    class_weight.label, class_count
                )));
            }
            if !seen.insert(class_weight.label) {
                return Err(invalid(format!("duplicate class weight for label {}", class_weight.label)));
            }
            check_positive(&format!("weight of class {}", class_weight.label), class_weight.weight)?;
        }

        if seen.len() != class_count {
            let missing: Vec<String> = (0..class_count as Label)
                .filter(|label| !seen.contains(label))
                .map(|label| label.to_string())
                .collect();
            return Err(invalid(format!("missing class weight for label(s) {}", missing.join(", "))));
        }
        Ok(())
    }
}

fn check_positive(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid(format!("{} must be finite and positive, got {}", name, value)));
    }
    Ok(())
}

fn invalid(message: String) -> Error {
    Error::InvalidHyperparameter(message)
}
