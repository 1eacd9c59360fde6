//! Model persistence as JSON

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::info;
use yass3d_core::{Error, Result};
use yass3d_learning::LinearModel;

/// Serialize `model` to `path`, replacing any existing file.
///
/// The JSON is written to a sibling temporary file that is renamed over
/// `path` once complete, so `path` never holds a partial model.
pub fn save_model<P: AsRef<Path>>(model: &LinearModel, path: P) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(model).map_err(|e| Error::Serialization(e.to_string()))?;

    let staging = staging_path(path)?;
    let written = std::fs::write(&staging, json).and_then(|()| std::fs::rename(&staging, path));
    if let Err(e) = written {
        let _ = std::fs::remove_file(&staging);
        return Err(e.into());
    }

    info!(path = %path.display(), classes = model.hyperplanes.len(), "saved model");
    Ok(())
}

fn staging_path(path: &Path) -> Result<PathBuf> {
    let name = path
        .file_name()
        .ok_or_else(|| Error::InvalidData(format!("Model path has no file name: {}", path.display())))?;
    let mut staging = OsString::from(".");
    staging.push(name);
    staging.push(".tmp");
    Ok(path.with_file_name(staging))
}

/// Load and structurally validate a model written by [`save_model`]
pub fn load_model<P: AsRef<Path>>(path: P) -> Result<LinearModel> {
    let content = std::fs::read_to_string(path.as_ref())?;
    let model: LinearModel = serde_json::from_str(&content).map_err(|e| Error::Serialization(e.to_string()))?;
    model.validate()?;
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staging_file_sits_next_to_target() {
        let staging = staging_path(Path::new("/models/run1/model.json")).unwrap();
        assert_eq!(staging, Path::new("/models/run1/.model.json.tmp"));
        assert!(staging_path(Path::new("/")).is_err());
    }
}
