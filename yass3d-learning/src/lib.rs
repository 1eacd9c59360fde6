//! # yass3d Learning
//!
//! Supervised training and inference on top of [`yass3d_features`].
//!
//! - [`build_training_set`] stacks per-cloud features and labels
//! - [`ModelTrainer`] validates a run and delegates to a [`LinearSolver`]
//!   ([`CoordinateDescentSolver`] by default, [`SvmSolver`] on request)
//! - [`LinearModel`] predicts classes and carries its feature signature
//! - [`label_cloud`] and [`recolor`] apply a model to new clouds
//!
//! ## Example
//!
//! ```rust,no_run
//! use yass3d_learning::{build_training_set, label_cloud, ModelTrainer, PipelineConfig};
//! # fn run(clouds: Vec<yass3d_core::SemanticCloud>, query: yass3d_core::SemanticCloud) -> yass3d_core::Result<()> {
//! let config = PipelineConfig::default();
//! let manager = config.feature_manager()?;
//! let set = build_training_set(&clouds, &manager)?;
//! let model = ModelTrainer::default().train(&set, config.class_count, &config.hyperparameters)?;
//! let labels = label_cloud(&model, &manager, &query)?;
//! # Ok(())
//! # }
//! ```

pub mod dataset;
pub mod hyperparameters;
pub mod solver;
pub mod coordinate_descent;
pub mod trainer;
pub mod model;
pub mod applicator;
pub mod config;

pub use dataset::*;
pub use hyperparameters::*;
pub use solver::*;
pub use coordinate_descent::*;
pub use trainer::*;
pub use model::*;
pub use applicator::*;
pub use config::*;
