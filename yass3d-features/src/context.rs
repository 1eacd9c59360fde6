//! Per-cloud state shared by the extractors of one feature computation

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rayon::prelude::*;
use tracing::debug;
use yass3d_core::{Error, NearestNeighborSearch, Point3d, Result, SemanticCloud};

use crate::nearest_neighbor::RTreeSearch;
use crate::normals::{estimate_local_geometry, LocalGeometry};

/// Local geometry of every point at one radius; `None` marks points whose
/// neighborhood was too small for a plane fit.
pub type GeometryField = Arc<Vec<Option<LocalGeometry>>>;

/// Read-only view of a cloud plus its spatial index.
///
/// Built once per cloud by the feature manager. Local geometry is cached per
/// radius so extractors that share a radius estimate normals only once.
pub struct CloudContext<'a> {
    cloud: &'a SemanticCloud,
    positions: Vec<Point3d>,
    index: RTreeSearch,
    viewpoint: Point3d,
    geometry_cache: Mutex<HashMap<u64, GeometryField>>,
}

impl<'a> CloudContext<'a> {
    pub fn new(cloud: &'a SemanticCloud) -> Self {
        let positions = cloud.positions();
        let index = RTreeSearch::new(&positions);
        Self {
            cloud,
            positions,
            index,
            viewpoint: Point3d::origin(),
            geometry_cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn cloud(&self) -> &SemanticCloud {
        self.cloud
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[Point3d] {
        &self.positions
    }

    /// Viewpoint normals are oriented toward
    pub fn viewpoint(&self) -> &Point3d {
        &self.viewpoint
    }

    /// Indices of all points within `radius` of point `index` (itself included), ascending
    pub fn radius_neighbors(&self, index: usize, radius: f64) -> Vec<(usize, f64)> {
        self.index.find_radius_neighbors(&self.positions[index], radius)
    }

    /// Local geometry of every point at `radius`, computed on first use
    pub fn local_geometry(&self, radius: f64) -> Result<GeometryField> {
        let key = radius.to_bits();
        if let Some(field) = self.lock_cache()?.get(&key) {
            return Ok(Arc::clone(field));
        }

        let field: Vec<Option<LocalGeometry>> = (0..self.len())
            .into_par_iter()
            .map(|i| {
                let neighbors: Vec<usize> =
                    self.radius_neighbors(i, radius).into_iter().map(|(idx, _)| idx).collect();
                match estimate_local_geometry(&self.positions, &neighbors, &self.positions[i], &self.viewpoint) {
                    Ok(geometry) => Ok(Some(geometry)),
                    Err(Error::InsufficientNeighbors { .. }) => Ok(None),
                    Err(e) => Err(e),
                }
            })
            .collect::<Result<_>>()?;

        let missing = field.iter().filter(|g| g.is_none()).count();
        debug!(radius, points = field.len(), missing, "estimated local geometry");

        let field = Arc::new(field);
        let mut cache = self.lock_cache()?;
        Ok(Arc::clone(cache.entry(key).or_insert(field)))
    }

    fn lock_cache(&self) -> Result<std::sync::MutexGuard<'_, HashMap<u64, GeometryField>>> {
        self.geometry_cache
            .lock()
            .map_err(|_| Error::InvalidData("local geometry cache poisoned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yass3d_core::{Point3f, PointCloud, SemanticPoint};

    #[test]
    fn test_geometry_is_cached_per_radius() {
        let cloud: SemanticCloud = PointCloud::from_points(
            (0..9)
                .map(|i| SemanticPoint::from(Point3f::new((i % 3) as f32 * 0.1, (i / 3) as f32 * 0.1, 1.0)))
                .collect(),
        );
        let context = CloudContext::new(&cloud);

        let first = context.local_geometry(0.15).unwrap();
        let second = context.local_geometry(0.15).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let other = context.local_geometry(0.5).unwrap();
        assert!(!Arc::ptr_eq(&first, &other));
        assert!(other.iter().all(|g| g.is_some()));
    }

    #[test]
    fn test_isolated_point_has_no_geometry() {
        let cloud: SemanticCloud = PointCloud::from_points(vec![
            SemanticPoint::from(Point3f::new(0.0, 0.0, 0.0)),
            SemanticPoint::from(Point3f::new(0.01, 0.0, 0.0)),
            SemanticPoint::from(Point3f::new(0.0, 0.01, 0.0)),
            SemanticPoint::from(Point3f::new(5.0, 5.0, 5.0)),
        ]);
        let context = CloudContext::new(&cloud);
        let field = context.local_geometry(0.1).unwrap();

        assert!(field[0].is_some());
        assert!(field[3].is_none());
    }
}
