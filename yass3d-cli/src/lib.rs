//! Training and labeling drivers behind the `yass3d` binary

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use yass3d_core::{Error, Label, SemanticCloud};
use yass3d_features::{build_feature_manager, configs_from_signature, FeatureManager};
use yass3d_io::{load_cloud, load_clouds, load_config, load_model, save_labels, save_model, write_cloud};
use yass3d_learning::{build_training_set, label_cloud, recolor, ColorScheme, LinearModel, ModelTrainer, PipelineConfig};

/// Supervised semantic labeling of point clouds
#[derive(Parser, Debug)]
#[command(name = "yass3d", version, about)]
pub struct Cli {
    /// Log at DEBUG instead of INFO
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Train a model on a directory of labeled PCD files
    Train {
        /// Directory holding the labeled training clouds
        #[arg(value_name = "path_to_training_pointclouds")]
        training_dir: PathBuf,
        /// Output model file
        #[arg(value_name = "modelName")]
        model: PathBuf,
        /// Pipeline configuration (TOML)
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
    /// Label a cloud with a trained model
    Label {
        /// Model file written by `train`
        model: PathBuf,
        /// Cloud to label
        cloud: PathBuf,
        /// Output label file, one label per line
        labels_out: PathBuf,
        /// Also write the cloud recolored by predicted class
        #[arg(long, value_name = "FILE")]
        colored: Option<PathBuf>,
        /// Pipeline configuration (TOML); only its colors are used
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
}

/// Install the global fmt subscriber
pub fn init_logging(verbose: bool) -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(if verbose { Level::DEBUG } else { Level::INFO })
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).context("Failed to set tracing subscriber")
}

fn pipeline_config(path: &Path) -> Result<PipelineConfig> {
    load_config(path).with_context(|| format!("loading configuration {}", path.display()))
}

/// Train on every cloud in `training_dir` and write the model to `model_path`.
///
/// Nothing is written unless training succeeds.
pub fn run_train(training_dir: &Path, model_path: &Path, config: &PipelineConfig) -> Result<LinearModel> {
    config.validate().context("invalid pipeline configuration")?;

    let (names, clouds): (Vec<String>, Vec<SemanticCloud>) = load_clouds(training_dir)
        .with_context(|| format!("reading training directory {}", training_dir.display()))?
        .into_iter()
        .map(|loaded| (loaded.name, loaded.cloud))
        .unzip();
    let manager = config.feature_manager()?;
    info!(extractors = manager.len(), dimension = manager.feature_dimension(), "feature layout ready");

    let training_set = build_training_set(&clouds, &manager).map_err(|e| {
        let context = match &e {
            Error::MissingLabel { cloud, .. } => names
                .get(*cloud)
                .map(|name| format!("training cloud {} is not fully labeled", training_dir.join(name).display())),
            _ => None,
        };
        anyhow::Error::new(e).context(context.unwrap_or_else(|| "assembling training set".to_string()))
    })?;
    drop(clouds);

    let model = ModelTrainer::default()
        .train(&training_set, config.class_count, &config.hyperparameters)
        .context("training model")?;

    save_model(&model, model_path).with_context(|| format!("writing model {}", model_path.display()))?;
    Ok(model)
}

/// Label `cloud_path` with the model at `model_path`.
///
/// The feature layout is rebuilt from the model itself. Recoloring uses the
/// colors of `config` when given and a generated palette otherwise.
pub fn run_label(
    model_path: &Path,
    cloud_path: &Path,
    labels_out: &Path,
    colored_out: Option<&Path>,
    config: Option<&PipelineConfig>,
) -> Result<Vec<Label>> {
    let model = load_model(model_path).with_context(|| format!("loading model {}", model_path.display()))?;
    let manager = manager_for(&model)?;

    let mut cloud = load_cloud(cloud_path)?;
    let labels = label_cloud(&model, &manager, &cloud)?;
    save_labels(&labels, labels_out).with_context(|| format!("writing labels {}", labels_out.display()))?;

    if let Some(colored_out) = colored_out {
        let scheme = config
            .map(PipelineConfig::color_scheme)
            .unwrap_or_else(|| ColorScheme::palette(model.class_count));
        scheme.validate_for(model.class_count)?;
        recolor(&mut cloud, &labels, &scheme)?;
        write_cloud(&cloud, colored_out)
            .with_context(|| format!("writing recolored cloud {}", colored_out.display()))?;
    }

    info!(points = labels.len(), "labeling finished");
    Ok(labels)
}

fn manager_for(model: &LinearModel) -> Result<FeatureManager> {
    let configs = configs_from_signature(&model.signature)?;
    Ok(build_feature_manager(&configs)?)
}

/// Dispatch a parsed command line
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Train {
            training_dir,
            model,
            config,
        } => {
            let config = match config {
                Some(path) => pipeline_config(&path)?,
                None => PipelineConfig::default(),
            };
            run_train(&training_dir, &model, &config)?;
        }
        Command::Label {
            model,
            cloud,
            labels_out,
            colored,
            config,
        } => {
            let config = config.as_deref().map(pipeline_config).transpose()?;
            run_label(&model, &cloud, &labels_out, colored.as_deref(), config.as_ref())?;
        }
    }
    Ok(())
}
