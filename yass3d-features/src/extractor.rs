//! The feature extractor capability and its registration signature

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use yass3d_core::{Error, Result};

use crate::context::CloudContext;

/// Value written for points whose local estimate is unavailable.
///
/// Applied identically at training and inference time.
pub const FALLBACK_VALUE: f64 = 0.0;

/// Computes one fixed-width block of features for every point of a cloud.
pub trait FeatureExtractor: Send + Sync {
    /// Stable name used in the model signature
    fn name(&self) -> &'static str;

    /// Width of the per-point sub-vector
    fn dimension(&self) -> usize;

    /// Construction parameters, in a fixed order
    fn parameters(&self) -> Vec<(String, f64)> {
        Vec::new()
    }

    /// Compute a `(points, dimension)` block, row `i` belonging to point `i`
    fn compute(&self, context: &CloudContext<'_>) -> Result<Array2<f64>>;

    fn signature(&self) -> ExtractorSignature {
        ExtractorSignature {
            name: self.name().to_string(),
            dimension: self.dimension(),
            parameters: self.parameters(),
        }
    }
}

/// Identity of one registered extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractorSignature {
    pub name: String,
    pub dimension: usize,
    pub parameters: Vec<(String, f64)>,
}

/// Ordered identity of a whole feature layout
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureSignature {
    pub extractors: Vec<ExtractorSignature>,
}

impl FeatureSignature {
    /// Total feature width
    pub fn dimension(&self) -> usize {
        self.extractors.iter().map(|e| e.dimension).sum()
    }

    /// Column range occupied by each extractor, in registration order
    pub fn column_offsets(&self) -> Vec<(String, std::ops::Range<usize>)> {
        let mut offset = 0;
        self.extractors
            .iter()
            .map(|e| {
                let range = offset..offset + e.dimension;
                offset += e.dimension;
                (e.name.clone(), range)
            })
            .collect()
    }

    /// Fail with [`Error::IncompatibleModel`] unless `other` describes the same layout
    pub fn ensure_compatible(&self, other: &FeatureSignature) -> Result<()> {
        if self == other {
            return Ok(());
        }
        Err(Error::IncompatibleModel(format!(
            "expected [{}], found [{}]",
            self, other
        )))
    }
}

impl std::fmt::Display for ExtractorSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.name, self.dimension)?;
        if !self.parameters.is_empty() {
            let params: Vec<String> = self
                .parameters
                .iter()
                .map(|(key, value)| format!("{}={}", key, value))
                .collect();
            write!(f, "({})", params.join(","))?;
        }
        Ok(())
    }
}

impl std::fmt::Display for FeatureSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.extractors.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", parts.join(", "))
    }
}

/// Validate a neighborhood radius
pub(crate) fn check_radius(name: &str, radius: f64) -> Result<()> {
    if !radius.is_finite() || radius <= 0.0 {
        return Err(Error::InvalidHyperparameter(format!(
            "{} must be a positive finite radius, got {}",
            name, radius
        )));
    }
    Ok(())
}

/// Validate an inner/outer radius pair
pub(crate) fn check_radius_pair(small_name: &str, small: f64, large_name: &str, large: f64, strict: bool) -> Result<()> {
    check_radius(small_name, small)?;
    check_radius(large_name, large)?;
    let ordered = if strict { small < large } else { small <= large };
    if !ordered {
        return Err(Error::InvalidHyperparameter(format!(
            "{} ({}) must be {} {} ({})",
            small_name,
            small,
            if strict { "smaller than" } else { "at most" },
            large_name,
            large
        )));
    }
    Ok(())
}

/// Assemble per-point rows produced in point order into a block
pub(crate) fn rows_to_block(rows: Vec<Vec<f64>>, dimension: usize) -> Result<Array2<f64>> {
    let points = rows.len();
    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((points, dimension), flat)
        .map_err(|e| Error::InvalidData(format!("feature block shape: {}", e)))
}
