//! L1-regularized L2-loss linear SVC by primal coordinate descent
//!
//! Each one-vs-rest sub-problem minimizes
//!
//! ```text
//! ||w||_1 + sum_i C_i * max(0, 1 - y_i * w . x_i)^2
//! ```
//!
//! one coordinate at a time: a Newton step on the smooth loss, soft
//! thresholded for the L1 term, followed by a backtracking line search.
//! Coordinates resting at zero whose gradient stays well inside the
//! subdifferential are shrunk out of the active set until the outer loop
//! converges on the remaining ones.
//!
//! The bias is learned as the weight of a constant feature and is
//! regularized like every other weight. Memory is linear in the number of
//! training points; one pass costs one sweep over the feature matrix.

use std::sync::atomic::{AtomicBool, Ordering};

use ndarray::{s, Array2, ArrayView2};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::{debug, warn};
use yass3d_core::{Error, Label, Result};

use crate::hyperparameters::SolverType;
use crate::solver::{single_class_hyperplane, ClassHyperplane, LinearSolver, SolverProblem};

const MAX_ITERATIONS: usize = 1000;
const MAX_LINE_SEARCH_STEPS: usize = 20;
/// Armijo sufficient-decrease factor
const SUFFICIENT_DECREASE: f64 = 0.01;
const MIN_CURVATURE: f64 = 1e-12;
const MIN_STEP: f64 = 1e-12;
/// Value of the constant feature carrying the bias
const BIAS_FEATURE: f64 = 1.0;
/// Seed of the per-class coordinate order; fixed so training is reproducible
const SHUFFLE_SEED: u64 = 0x7961_7373_3364;

/// One-vs-rest L1-regularized L2-loss SVC.
///
/// Class `k` is positive with cost `C * weight_k` against all other points
/// with cost `C`. Sub-problems run in parallel; each uses its own seeded
/// coordinate order, so the result does not depend on scheduling.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoordinateDescentSolver;

impl CoordinateDescentSolver {
    pub fn new() -> Self {
        Self
    }
}

impl LinearSolver for CoordinateDescentSolver {
    fn solver_type(&self) -> SolverType {
        SolverType::L1rL2lossSvc
    }

    fn solve(&self, problem: &SolverProblem<'_>) -> Result<Vec<ClassHyperplane>> {
        let classes = problem.present_classes();
        let dimension = problem.features.ncols();
        if let Some(plane) = single_class_hyperplane(&classes, dimension) {
            return Ok(vec![plane]);
        }

        // Feature-major copy with the bias feature as the last row
        let count = problem.features.nrows();
        let mut columns = Array2::from_elem((dimension + 1, count), BIAS_FEATURE);
        columns.slice_mut(s![..dimension, ..]).assign(&problem.features.t());

        let hp = problem.hyperparameters;
        classes
            .par_iter()
            .map(|&label| {
                if problem.is_cancelled() {
                    return Err(Error::Cancelled);
                }
                let weight = hp.weight_of(label).ok_or_else(|| {
                    Error::InvalidHyperparameter(format!("missing class weight for label {}", label))
                })?;

                let positive: Vec<bool> = problem.labels.iter().map(|&l| l == label).collect();
                let positives = positive.iter().filter(|&&p| p).count();
                let tolerance = hp.epsilon * positives.min(count - positives).max(1) as f64 / count as f64;
                debug!(label, positives, negatives = count - positives, "fitting one-vs-rest classifier");

                let fit = BinaryFit {
                    columns: columns.view(),
                    positive: &positive,
                    cost_positive: hp.c * weight,
                    cost_negative: hp.c,
                    tolerance,
                    cancel: problem.cancel,
                };
                let mut coefficients = fit.run(label)?;

                let bias = coefficients[dimension] * BIAS_FEATURE;
                coefficients.truncate(dimension);
                Ok(ClassHyperplane {
                    label,
                    weights: coefficients,
                    bias,
                })
            })
            .collect()
    }
}

/// One binary sub-problem
struct BinaryFit<'a> {
    /// Feature-major matrix, one row per coordinate
    columns: ArrayView2<'a, f64>,
    positive: &'a [bool],
    cost_positive: f64,
    cost_negative: f64,
    /// Stop once the summed violation falls to this fraction of the first pass's
    tolerance: f64,
    cancel: &'a AtomicBool,
}

impl BinaryFit<'_> {
    fn sign(&self, i: usize) -> f64 {
        if self.positive[i] {
            1.0
        } else {
            -1.0
        }
    }

    fn cost(&self, i: usize) -> f64 {
        if self.positive[i] {
            self.cost_positive
        } else {
            self.cost_negative
        }
    }

    /// Margin slack `1 - y_i w . x_i` of every point
    fn slack(&self, w: &[f64]) -> Vec<f64> {
        let mut slack = vec![1.0; self.positive.len()];
        for (column, &wj) in self.columns.outer_iter().zip(w) {
            if wj == 0.0 {
                continue;
            }
            for (i, &x) in column.iter().enumerate() {
                slack[i] -= wj * self.sign(i) * x;
            }
        }
        slack
    }

    fn run(&self, label: Label) -> Result<Vec<f64>> {
        let (size, count) = self.columns.dim();
        let mut w = vec![0.0; size];
        let mut slack = self.slack(&w);
        // Upper bound on the loss curvature along each coordinate
        let curvature: Vec<f64> = self
            .columns
            .outer_iter()
            .map(|column| column.iter().enumerate().map(|(i, &x)| self.cost(i) * x * x).sum::<f64>())
            .collect();

        let mut order: Vec<usize> = (0..size).collect();
        let mut active = size;
        let mut shrink_bound = f64::INFINITY;
        let mut initial_violation = 0.0;
        let mut rng = StdRng::seed_from_u64(SHUFFLE_SEED);

        let mut iteration = 0;
        while iteration < MAX_ITERATIONS {
            if self.cancel.load(Ordering::Relaxed) {
                return Err(Error::Cancelled);
            }

            let mut max_violation = 0.0f64;
            let mut total_violation = 0.0;
            order[..active].shuffle(&mut rng);

            let mut s = 0;
            while s < active {
                let j = order[s];
                let column = self.columns.row(j);

                let mut loss_gradient = 0.0;
                let mut hessian = 0.0;
                for (i, &x) in column.iter().enumerate() {
                    if slack[i] > 0.0 {
                        let value = self.sign(i) * x;
                        let scaled = self.cost(i) * value;
                        loss_gradient -= scaled * slack[i];
                        hessian += scaled * value;
                    }
                }
                loss_gradient *= 2.0;
                let hessian = (2.0 * hessian).max(MIN_CURVATURE);

                // Gradient of the loss plus each one-sided derivative of |w_j|
                let right = loss_gradient + 1.0;
                let left = loss_gradient - 1.0;
                let violation = if w[j] == 0.0 {
                    if right < 0.0 {
                        -right
                    } else if left > 0.0 {
                        left
                    } else if right > shrink_bound / count as f64 && left < -shrink_bound / count as f64 {
                        active -= 1;
                        order.swap(s, active);
                        continue;
                    } else {
                        0.0
                    }
                } else if w[j] > 0.0 {
                    right.abs()
                } else {
                    left.abs()
                };
                max_violation = max_violation.max(violation);
                total_violation += violation;
                s += 1;

                let mut step = if right < hessian * w[j] {
                    -right / hessian
                } else if left > hessian * w[j] {
                    -left / hessian
                } else {
                    -w[j]
                };
                if step.abs() < MIN_STEP {
                    continue;
                }

                let mut delta = (w[j] + step).abs() - w[j].abs() + loss_gradient * step;
                let mut applied = 0.0;
                let mut loss_old = 0.0;
                let mut steps = 0;
                while steps < MAX_LINE_SEARCH_STEPS {
                    let change = applied - step;
                    let mut decrease = (w[j] + step).abs() - w[j].abs() - SUFFICIENT_DECREASE * delta;

                    let estimate = curvature[j] * step * step + loss_gradient * step + decrease;
                    if estimate <= 0.0 {
                        for (i, &x) in column.iter().enumerate() {
                            slack[i] += change * self.sign(i) * x;
                        }
                        break;
                    }

                    let mut loss_new = 0.0;
                    for (i, &x) in column.iter().enumerate() {
                        if x == 0.0 {
                            continue;
                        }
                        if steps == 0 && slack[i] > 0.0 {
                            loss_old += self.cost(i) * slack[i] * slack[i];
                        }
                        let updated = slack[i] + change * self.sign(i) * x;
                        slack[i] = updated;
                        if updated > 0.0 {
                            loss_new += self.cost(i) * updated * updated;
                        }
                    }

                    decrease += loss_new - loss_old;
                    if decrease <= 0.0 {
                        break;
                    }
                    applied = step;
                    step *= 0.5;
                    delta *= 0.5;
                    steps += 1;
                }

                w[j] += step;

                // Incremental slack updates drift when the search gives up
                if steps >= MAX_LINE_SEARCH_STEPS {
                    slack = self.slack(&w);
                }
            }

            if iteration == 0 {
                initial_violation = total_violation;
            }
            iteration += 1;

            if total_violation <= self.tolerance * initial_violation {
                if active == size {
                    break;
                }
                active = size;
                shrink_bound = f64::INFINITY;
                continue;
            }
            shrink_bound = max_violation;
        }

        if iteration >= MAX_ITERATIONS {
            warn!(label, iterations = iteration, "coordinate descent hit the iteration limit");
        }
        debug!(
            label,
            iterations = iteration,
            nonzero = w.iter().filter(|&&v| v != 0.0).count(),
            "coordinate descent finished"
        );
        Ok(w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    use crate::hyperparameters::Hyperparameters;

    fn solve(features: &Array2<f64>, labels: &[Label], hp: &Hyperparameters) -> Result<Vec<ClassHyperplane>> {
        let cancel = AtomicBool::new(false);
        let problem = SolverProblem {
            features: features.view(),
            labels,
            class_count: hp.class_weights.len(),
            hyperparameters: hp,
            cancel: &cancel,
        };
        CoordinateDescentSolver::new().solve(&problem)
    }

    fn argmax(planes: &[ClassHyperplane], x: &[f64]) -> Label {
        let mut best = &planes[0];
        for plane in &planes[1..] {
            if plane.decision_value(x) > best.decision_value(x) {
                best = plane;
            }
        }
        best.label
    }

    #[test]
    fn test_separates_three_clusters() {
        let features = array![
            [5.0, 0.0],
            [5.5, 0.5],
            [4.5, -0.5],
            [0.0, 5.0],
            [0.5, 5.5],
            [-0.5, 4.5],
            [-5.0, -5.0],
            [-5.5, -4.5],
            [-4.5, -5.5]
        ];
        let labels = [0, 0, 0, 1, 1, 1, 2, 2, 2];
        let planes = solve(&features, &labels, &Hyperparameters::uniform(3)).unwrap();

        assert_eq!(planes.iter().map(|p| p.label).collect::<Vec<_>>(), vec![0, 1, 2]);
        for (row, &label) in features.rows().into_iter().zip(labels.iter()) {
            assert_eq!(argmax(&planes, &row.to_vec()), label, "point {:?}", row);
        }
    }

    #[test]
    fn test_irrelevant_feature_gets_zero_weight() {
        // Only the first column separates the classes
        let features = array![[2.0, 0.3], [3.0, -0.2], [2.5, 0.1], [-2.0, 0.2], [-3.0, -0.1], [-2.5, -0.3]];
        let labels = [0, 0, 0, 1, 1, 1];
        let planes = solve(&features, &labels, &Hyperparameters::uniform(2)).unwrap();

        assert!(planes[0].weights[0] > 0.0);
        assert_eq!(planes[0].weights[1], 0.0);
        assert!(planes[1].weights[0] < 0.0);
    }

    #[test]
    fn test_repeated_runs_are_identical() {
        let features = Array2::from_shape_fn((60, 3), |(i, j)| ((i * 7 + j * 13) % 11) as f64 - 5.0);
        let labels: Vec<Label> = (0..60).map(|i| (i % 3) as Label).collect();
        let hp = Hyperparameters::uniform(3);

        assert_eq!(solve(&features, &labels, &hp).unwrap(), solve(&features, &labels, &hp).unwrap());
    }

    #[test]
    fn test_class_weight_moves_boundary() {
        // Overlapping classes on a line; raising class 1's cost pulls the boundary toward class 0
        let features = array![[-2.0], [-1.0], [-0.2], [0.2], [-0.4], [1.0], [2.0], [0.4]];
        let labels = [0, 0, 0, 0, 1, 1, 1, 1];

        let uniform = solve(&features, &labels, &Hyperparameters::uniform(2)).unwrap();
        let mut favored = Hyperparameters::uniform(2);
        favored.class_weights[1].weight = 20.0;
        let weighted = solve(&features, &labels, &favored).unwrap();

        let boundary = |planes: &[ClassHyperplane]| -planes[1].bias / planes[1].weights[0];
        assert!(boundary(&weighted) < boundary(&uniform));
    }

    #[test]
    fn test_cancelled() {
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

        assert!(matches!(CoordinateDescentSolver::new().solve(&problem), Err(Error::Cancelled)));
    }
}
