//! Model trainer wrapping a [`LinearSolver`]

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

use tracing::info;
use yass3d_core::{Error, Result};

use crate::dataset::TrainingSet;
use crate::hyperparameters::Hyperparameters;
use crate::model::LinearModel;
use crate::solver::{solver_for, LinearSolver, SolverProblem};

/// Validates a training run and hands it to the solver.
///
/// Every check happens before the solver is invoked, so a rejected run never
/// starts optimization. The default trainer runs whichever solver the
/// hyperparameters name.
pub struct ModelTrainer {
    /// Fixed solver; `None` selects one per run from the hyperparameters
    solver: Option<Box<dyn LinearSolver>>,
    cancel: Arc<AtomicBool>,
}

impl Default for ModelTrainer {
    fn default() -> Self {
        Self {
            solver: None,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl ModelTrainer {
    /// Trainer bound to `solver`; runs naming another solver type are rejected
    pub fn new(solver: Box<dyn LinearSolver>) -> Self {
        Self {
            solver: Some(solver),
            ..Self::default()
        }
    }

    /// Share an externally owned cancellation flag
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Flag that aborts training with [`Error::Cancelled`] once set
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Train a model on `training_set`.
    ///
    /// # Arguments
    /// * `training_set` - Stacked features, labels and their column layout
    /// * `class_count` - Number of classes; labels must lie in `0..class_count`
    /// * `hyperparameters` - Solver settings, with one weight per class
    pub fn train(
        &self,
        training_set: &TrainingSet,
        class_count: usize,
        hyperparameters: &Hyperparameters,
    ) -> Result<LinearModel> {
        Self::validate(training_set, class_count, hyperparameters)?;

        let selected;
        let solver: &dyn LinearSolver = match &self.solver {
            Some(solver) => solver.as_ref(),
            None => {
                selected = solver_for(hyperparameters.solver);
                selected.as_ref()
            }
        };
        if hyperparameters.solver != solver.solver_type() {
            return Err(Error::InvalidHyperparameter(format!(
                "solver type {:?} is not supported by this trainer",
                hyperparameters.solver
            )));
        }

        info!(
            points = training_set.len(),
            dimension = training_set.feature_dimension(),
            class_count,
            solver = ?hyperparameters.solver,
            c = hyperparameters.c,
            epsilon = hyperparameters.epsilon,
            "training linear model"
        );
        let started = Instant::now();

        let problem = SolverProblem {
            features: training_set.features.view(),
            labels: &training_set.labels,
            class_count,
            hyperparameters,
            cancel: &self.cancel,
        };
        let hyperplanes = solver.solve(&problem)?;

        let model = LinearModel {
            solver: hyperparameters.solver,
            class_count,
            hyperparameters: hyperparameters.clone(),
            signature: training_set.signature.clone(),
            hyperplanes,
        };
        model.validate()?;

        info!(
            classes = model.hyperplanes.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "training finished"
        );
        Ok(model)
    }

    fn validate(training_set: &TrainingSet, class_count: usize, hyperparameters: &Hyperparameters) -> Result<()> {
        hyperparameters.validate(class_count)?;

        if let Some(label) = training_set.labels.iter().find(|&&l| l as usize >= class_count) {
            return Err(Error::InvalidHyperparameter(format!(
                "training label {} is outside 0..{}",
                label, class_count
            )));
        }

        if training_set.features.nrows() != training_set.labels.len() {
            return Err(Error::dimension_mismatch(
                "training rows vs labels",
                training_set.labels.len(),
                training_set.features.nrows(),
            ));
        }
        let expected = training_set.signature.dimension();
        if training_set.features.ncols() != expected {
            return Err(Error::dimension_mismatch(
                "training feature columns",
                expected,
                training_set.features.ncols(),
            ));
        }

        if training_set.is_empty() {
            return Err(Error::EmptyDataset("training set has no rows".to_string()));
        }
        Ok(())
    }
}
