//! TOML pipeline configuration files

use std::path::Path;

use yass3d_core::{Error, Result};
use yass3d_learning::PipelineConfig;

/// Load and validate a pipeline configuration
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<PipelineConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: PipelineConfig = toml::from_str(&content).map_err(|e| Error::Serialization(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

pub fn save_config<P: AsRef<Path>>(config: &PipelineConfig, path: P) -> Result<()> {
    let content = toml::to_string(config).map_err(|e| Error::Serialization(e.to_string()))?;
    std::fs::write(path, content)?;
    Ok(())
}
