//! I/O for the yass3d pipeline
//!
//! This crate reads and writes labeled point clouds (PCD), label files,
//! trained models (JSON) and pipeline configurations (TOML), and scans
//! training directories.

pub mod pcd;
pub mod directory;
pub mod labels;
pub mod model_io;
pub mod config;

pub use pcd::{PcdDataFormat, PcdReader, PcdWriteOptions, PcdWriter};
pub use directory::{list_files, load_clouds, natural_cmp, NamedCloud};
pub use labels::{read_labels, save_labels};
pub use model_io::{load_model, save_model};
pub use config::{load_config, save_config};

use std::path::Path;

use yass3d_core::{Error, Result, SemanticCloud};

fn extension(path: &Path) -> Option<String> {
    path.extension().and_then(|s| s.to_str()).map(|s| s.to_ascii_lowercase())
}

/// Auto-detect format and read a point cloud
pub fn read_cloud<P: AsRef<Path>>(path: P) -> Result<SemanticCloud> {
    let path = path.as_ref();
    match extension(path).as_deref() {
        Some("pcd") => PcdReader::read_cloud(path),
        _ => Err(Error::UnsupportedFormat(format!(
            "Unsupported point cloud format: {:?}",
            path.extension()
        ))),
    }
}

/// Auto-detect format and write a point cloud (binary PCD)
pub fn write_cloud<P: AsRef<Path>>(cloud: &SemanticCloud, path: P) -> Result<()> {
    let path = path.as_ref();
    match extension(path).as_deref() {
        Some("pcd") => PcdWriter::write_cloud(cloud, path, &PcdWriteOptions::default()),
        _ => Err(Error::UnsupportedFormat(format!(
            "Unsupported point cloud format: {:?}",
            path.extension()
        ))),
    }
}

/// Read a cloud, reporting any failure as [`Error::Load`] for `path`
pub fn load_cloud<P: AsRef<Path>>(path: P) -> Result<SemanticCloud> {
    let path = path.as_ref();
    read_cloud(path).map_err(|e| Error::Load {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}
