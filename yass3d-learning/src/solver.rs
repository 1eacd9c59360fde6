//! Linear solver seam and the linfa-svm backed implementation
//!
//! [`solver_for`] maps a [`SolverType`] to its implementation; the
//! coordinate descent solver lives in [`crate::coordinate_descent`].

use std::sync::atomic::{AtomicBool, Ordering};

use linfa::prelude::*;
use linfa_svm::Svm;
use ndarray::{Array1, Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use yass3d_core::{Error, Label, Result};

use crate::coordinate_descent::CoordinateDescentSolver;
use crate::hyperparameters::{Hyperparameters, SolverType};

/// Everything a solver needs for one training run
pub struct SolverProblem<'a> {
    pub features: ArrayView2<'a, f64>,
    pub labels: &'a [Label],
    pub class_count: usize,
    pub hyperparameters: &'a Hyperparameters,
    /// Checked between per-class sub-problems
    pub cancel: &'a AtomicBool,
}

impl SolverProblem<'_> {
    /// Distinct labels present in the training data, ascending
    pub fn present_classes(&self) -> Vec<Label> {
        let mut classes = self.labels.to_vec();
        classes.sort_unstable();
        classes.dedup();
        classes
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }
}

/// Decision function `w . x + b` of one class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassHyperplane {
    pub label: Label,
    pub weights: Vec<f64>,
    pub bias: f64,
}

impl ClassHyperplane {
    pub fn decision_value(&self, features: &[f64]) -> f64 {
        self.weights.iter().zip(features).map(|(w, x)| w * x).sum::<f64>() + self.bias
    }
}

/// Optimization backend turning a labeled feature matrix into hyperplanes
pub trait LinearSolver: Send + Sync {
    /// Scheme this solver implements
    fn solver_type(&self) -> SolverType;

    /// One hyperplane per class present in `problem.labels`, ascending by label
    fn solve(&self, problem: &SolverProblem<'_>) -> Result<Vec<ClassHyperplane>>;
}

/// Solver implementing `solver_type`
pub fn solver_for(solver_type: SolverType) -> Box<dyn LinearSolver> {
    match solver_type {
        SolverType::L1rL2lossSvc => Box::new(CoordinateDescentSolver::new()),
        SolverType::OneVsRestSvc => Box::new(SvmSolver::new()),
    }
}

/// Constant hyperplane for a training set holding a single class
pub(crate) fn single_class_hyperplane(classes: &[Label], dimension: usize) -> Option<ClassHyperplane> {
    match classes {
        [only] => {
            info!(label = *only, "single class present, model predicts it unconditionally");
            Some(ClassHyperplane {
                label: *only,
                weights: vec![0.0; dimension],
                bias: 1.0,
            })
        }
        _ => None,
    }
}

/// One-vs-rest linear C-SVC solved in the dual by linfa-svm.
///
/// Class `k` is trained as positive with cost `C * weight_k` against all
/// other points with cost `C`. The kernel matrix is dense, so memory grows
/// with the square of the point count; suited to small training sets.
#[derive(Debug, Clone, Copy, Default)]
pub struct SvmSolver;

impl SvmSolver {
    pub fn new() -> Self {
        Self
    }

    /// Recover the primal hyperplane of a linear-kernel binary SVM.
    ///
    /// The dual coefficients may or may not already carry the target sign,
    /// so every sign combination is scored against the model's own
    /// predictions and the best match is kept.
    fn primal_hyperplane(
        records: &Array2<f64>,
        targets: &Array1<bool>,
        alpha: &[f64],
        rho: f64,
        predicted: &Array1<bool>,
    ) -> (Vec<f64>, f64) {
        let alpha = Array1::from_vec(alpha.to_vec());
        let signed = Array1::from_iter(
            alpha.iter().zip(targets.iter()).map(|(&a, &t)| if t { a } else { -a }),
        );

        let raw_weights = records.t().dot(&alpha);
        let signed_weights = records.t().dot(&signed);

        let candidates = [
            (raw_weights.clone(), -rho),
            (raw_weights, rho),
            (signed_weights.clone(), -rho),
            (signed_weights, rho),
        ];

        let mut best = 0;
        let mut best_agreement = 0;
        for (index, (weights, bias)) in candidates.iter().enumerate() {
            let scores = records.dot(weights);
            let agreement = scores
                .iter()
                .zip(predicted.iter())
                .filter(|&(&score, &positive)| (score + bias >= 0.0) == positive)
                .count();
            if index == 0 || agreement > best_agreement {
                best = index;
                best_agreement = agreement;
            }
        }

        let (weights, bias) = &candidates[best];
        (weights.to_vec(), *bias)
    }
}

impl LinearSolver for SvmSolver {
    fn solver_type(&self) -> SolverType {
        SolverType::OneVsRestSvc
    }

    fn solve(&self, problem: &SolverProblem<'_>) -> Result<Vec<ClassHyperplane>> {
        let classes = problem.present_classes();
        let dimension = problem.features.ncols();
        let hp = problem.hyperparameters;

        if let Some(plane) = single_class_hyperplane(&classes, dimension) {
            return Ok(vec![plane]);
        }

        let records = problem.features.to_owned();
        let mut hyperplanes = Vec::with_capacity(classes.len());

        for &label in &classes {
            if problem.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let weight = hp.weight_of(label).ok_or_else(|| {
                Error::InvalidHyperparameter(format!("missing class weight for label {}", label))
            })?;
            let targets: Array1<bool> = problem.labels.iter().map(|&l| l == label).collect();
            let positives = targets.iter().filter(|&&t| t).count();
            debug!(label, positives, negatives = targets.len() - positives, "fitting one-vs-rest classifier");

            let dataset = Dataset::new(records.clone(), targets.clone());
            let svm = Svm::<f64, bool>::params()
                .pos_neg_weights(hp.c * weight, hp.c)
                .eps(hp.epsilon)
                .linear_kernel()
                .fit(&dataset)
                .map_err(|e| Error::Solver(format!("class {}: {}", label, e)))?;

            let predicted: Array1<bool> = svm.predict(&records);
            let (weights, bias) = Self::primal_hyperplane(&records, &targets, &svm.alpha, svm.rho, &predicted);

            hyperplanes.push(ClassHyperplane { label, weights, bias });
        }

        Ok(hyperplanes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_decision_value() {
        let plane = ClassHyperplane {
            label: 0,
            weights: vec![1.0, -2.0],
            bias: 0.5,
        };
        assert_relative_eq!(plane.decision_value(&[3.0, 1.0]), 1.5);
    }

    #[test]
    fn test_solver_for_each_type() {
        for solver_type in [SolverType::L1rL2lossSvc, SolverType::OneVsRestSvc] {
            assert_eq!(solver_for(solver_type).solver_type(), solver_type);
        }
    }

    #[test]
    fn test_primal_hyperplane_prefers_matching_signs() {
        // Two points on the x axis; positive at +1, negative at -1
        let records = array![[1.0, 0.0], [-1.0, 0.0]];
        let targets = array![true, false];
        let predicted = targets.clone();

        // Unsigned dual coefficients: only the signed reconstruction separates
        let (weights, bias) = SvmSolver::primal_hyperplane(&records, &targets, &[0.5, 0.5], 0.0, &predicted);
        assert_relative_eq!(weights[0], 1.0);
        assert_relative_eq!(bias, 0.0);

        // Already-signed coefficients: the raw reconstruction is kept
        let (weights, _) = SvmSolver::primal_hyperplane(&records, &targets, &[0.5, -0.5], 0.0, &predicted);
        assert_relative_eq!(weights[0], 1.0);
    }

    #[test]
    fn test_single_class_predicts_itself() {
        let features = array![[1.0, 2.0], [3.0, 4.0]];
        let labels = [2, 2];
        let hp = Hyperparameters::uniform(3);
        let cancel = AtomicBool::new(false);
        let problem = SolverProblem {
            features: features.view(),
            labels: &labels,
            class_count: 3,
            hyperparameters: &hp,
            cancel: &cancel,
        };

        let planes = SvmSolver::new().solve(&problem).unwrap();
        assert_eq!(planes.len(), 1);
        assert_eq!(planes[0].label, 2);
        assert!(planes[0].decision_value(&[100.0, -100.0]) > 0.0);
    }

    #[test]
    fn test_cancelled_before_first_class() {
        let features = array![[1.0], [-1.0]];
        let labels = [0, 1];
        let hp = Hyperparameters::uniform(2);
        let cancel = AtomicBool::new(true);
        let problem = SolverProblem {
            features: features.view(),
            labels: &labels,
            class_count: 2,
            hyperparameters: &hp,
            cancel: &cancel,
        };

        assert!(matches!(SvmSolver::new().solve(&problem), Err(Error::Cancelled)));
    }

    #[test]
    fn test_separates_two_clusters() {
        let features = array![[2.0, 2.0], [2.5, 2.0], [2.0, 2.5], [-2.0, -2.0], [-2.5, -2.0], [-2.0, -2.5]];
        let labels = [0, 0, 0, 1, 1, 1];
        let hp = Hyperparameters::uniform(2);
        let cancel = AtomicBool::new(false);
        let problem = SolverProblem {
            features: features.view(),
            labels: &labels,
            class_count: 2,
            hyperparameters: &hp,
            cancel: &cancel,
        };

        let planes = SvmSolver::new().solve(&problem).unwrap();
        assert_eq!(planes.len(), 2);
        for (row, &label) in features.rows().into_iter().zip(labels.iter()) {
            let x = row.to_vec();
            let own = planes[label as usize].decision_value(&x);
            let other = planes[1 - label as usize].decision_value(&x);
            assert!(own > other, "point {:?} misclassified", x);
        }
    }
}
