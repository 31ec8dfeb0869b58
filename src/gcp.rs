use std::path::{Path, PathBuf};

use crate::math::Vec2f;

/// A ground control point: a correspondence between a pixel location in the
/// source raster and a known coordinate in the target CRS.
///
/// `pixel` is (col, row) and can be fractional (subpixel clicks). `geo` is
/// (x, y), i.e. (lon, lat) for geographic CRS.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GroundControlPoint {
    pub pixel: Vec2f,
    pub geo: Vec2f,
}

impl GroundControlPoint {
    pub fn new(pixel: Vec2f, geo: Vec2f) -> GroundControlPoint {
        GroundControlPoint { pixel, geo }
    }
}

/// An owned, immutable copy of the store contents, safe to hand to the
/// estimator while the store keeps accepting new points.
#[derive(Debug, Clone)]
pub struct GcpSnapshot {
    pub raster: Option<PathBuf>,
    pub gcps: Vec<GroundControlPoint>,
}

/// Ordered collection of control points tied to at most one source raster.
///
/// None of the operations here fail: validation (is there an image at all,
/// are pixels within bounds) belongs to the session layer.
#[derive(Debug, Default)]
pub struct GcpStore {
    raster: Option<PathBuf>,
    gcps: Vec<GroundControlPoint>,
}

impl GcpStore {
    pub fn new() -> GcpStore {
        Default::default()
    }

    /// Replaces the active raster reference and drops all collected points.
    /// Points from a previous raster are meaningless for the new one.
    pub fn adopt_raster(&mut self, path: &Path) {
        self.raster = Some(path.to_path_buf());
        self.gcps.clear();
    }

    /// Appends a point and returns the new (1-based) count
    pub fn add(&mut self, pixel: Vec2f, geo: Vec2f) -> usize {
        self.gcps.push(GroundControlPoint::new(pixel, geo));
        self.gcps.len()
    }

    pub fn snapshot(&self) -> GcpSnapshot {
        GcpSnapshot {
            raster: self.raster.clone(),
            gcps: self.gcps.clone(),
        }
    }

    /// Clears the points but keeps the active raster reference
    pub fn reset(&mut self) {
        self.gcps.clear();
    }

    pub fn count(&self) -> usize {
        self.gcps.len()
    }

    pub fn raster(&self) -> Option<&Path> {
        self.raster.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::vec2f;

    #[test]
    fn test_add_returns_count() {
        let mut store = GcpStore::new();
        assert_eq!(store.add(vec2f(0.0, 0.0), vec2f(10.0, 50.0)), 1);
        assert_eq!(store.add(vec2f(5.0, 5.0), vec2f(10.1, 49.9)), 2);
        // Duplicates are allowed
        assert_eq!(store.add(vec2f(5.0, 5.0), vec2f(10.1, 49.9)), 3);
    }

    #[test]
    fn test_adopt_raster_clears_points() {
        let mut store = GcpStore::new();
        store.add(vec2f(0.0, 0.0), vec2f(10.0, 50.0));
        store.adopt_raster(Path::new("a.tif"));
        assert_eq!(store.count(), 0);
        assert_eq!(store.raster(), Some(Path::new("a.tif")));

        store.add(vec2f(1.0, 1.0), vec2f(10.0, 50.0));
        store.adopt_raster(Path::new("b.tif"));
        assert_eq!(store.count(), 0);
        assert_eq!(store.raster(), Some(Path::new("b.tif")));
    }

    #[test]
    fn test_reset_keeps_raster() {
        let mut store = GcpStore::new();
        store.adopt_raster(Path::new("a.tif"));
        store.add(vec2f(0.0, 0.0), vec2f(10.0, 50.0));
        store.reset();
        assert_eq!(store.count(), 0);
        assert_eq!(store.raster(), Some(Path::new("a.tif")));
    }

    #[test]
    fn test_snapshot_does_not_mutate() {
        let mut store = GcpStore::new();
        store.adopt_raster(Path::new("a.tif"));
        store.add(vec2f(0.0, 0.0), vec2f(10.0, 50.0));
        let snap = store.snapshot();
        store.add(vec2f(1.0, 0.0), vec2f(10.1, 50.0));
        assert_eq!(snap.gcps.len(), 1);
        assert_eq!(store.count(), 2);
        assert_eq!(snap.raster.as_deref(), Some(Path::new("a.tif")));
    }

    #[test]
    fn test_add_before_adopt_is_permitted() {
        let mut store = GcpStore::new();
        assert_eq!(store.add(vec2f(0.0, 0.0), vec2f(10.0, 50.0)), 1);
        assert_eq!(store.raster(), None);
    }
}
