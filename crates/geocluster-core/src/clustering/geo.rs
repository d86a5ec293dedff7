//! Great-circle geometry on radian coordinates

use rstar::primitives::GeomWithData;
use rstar::RTree;

use crate::types::EventRecord;

/// Mean Earth radius, kilometres
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// A coordinate pair in radians with its latitude cosine cached
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
    cos_lat: f64,
}

impl GeoPoint {
    pub fn from_radians(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            cos_lat: lat.cos(),
        }
    }

    pub fn from_degrees(lat: f64, lon: f64) -> Self {
        Self::from_radians(lat.to_radians(), lon.to_radians())
    }

    pub fn from_record(record: &EventRecord) -> Self {
        Self::from_degrees(record.latitude, record.longitude)
    }

    /// Position on the unit sphere
    pub fn to_unit_vector(&self) -> [f64; 3] {
        [
            self.cos_lat * self.lon.cos(),
            self.cos_lat * self.lon.sin(),
            self.lat.sin(),
        ]
    }
}

/// Central angle between two points, radians
pub fn haversine(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let half_dlat = (b.lat - a.lat) * 0.5;
    let half_dlon = (b.lon - a.lon) * 0.5;
    let h = half_dlat.sin().powi(2) + a.cos_lat * b.cos_lat * half_dlon.sin().powi(2);
    2.0 * h.sqrt().clamp(0.0, 1.0).asin()
}

/// Straight-line distance through the unit sphere for a central angle
pub fn angle_to_chord(angle: f64) -> f64 {
    if angle >= std::f64::consts::PI {
        2.0
    } else {
        2.0 * (angle * 0.5).sin()
    }
}

type IndexedPoint = GeomWithData<[f64; 3], usize>;

/// R-tree over unit-sphere positions.
///
/// Chord length grows monotonically with central angle, so Euclidean
/// queries in 3-space select the same neighbours as haversine queries.
pub struct SphereIndex<'a> {
    points: &'a [GeoPoint],
    tree: RTree<IndexedPoint>,
}

impl<'a> SphereIndex<'a> {
    pub fn build(points: &'a [GeoPoint]) -> Self {
        let entries: Vec<IndexedPoint> = points
            .iter()
            .enumerate()
            .map(|(i, p)| GeomWithData::new(p.to_unit_vector(), i))
            .collect();
        Self {
            points,
            tree: RTree::bulk_load(entries),
        }
    }

    /// Indices within `radius` radians of point `idx` (itself included), ascending
    pub fn within(&self, idx: usize, radius: f64) -> Vec<usize> {
        let center = &self.points[idx];
        // Widen slightly so rounding in the chord never loses a boundary point
        let chord = angle_to_chord(radius) * (1.0 + 1e-9) + 1e-12;
        let mut found: Vec<usize> = self
            .tree
            .locate_within_distance(center.to_unit_vector(), chord * chord)
            .map(|entry| entry.data)
            .filter(|&j| haversine(center, &self.points[j]) <= radius)
            .collect();
        found.sort_unstable();
        found
    }

    /// Number of points within `radius` radians of point `idx`, itself included
    pub fn count_within(&self, idx: usize, radius: f64) -> usize {
        let center = &self.points[idx];
        let chord = angle_to_chord(radius) * (1.0 + 1e-9) + 1e-12;
        self.tree
            .locate_within_distance(center.to_unit_vector(), chord * chord)
            .filter(|entry| haversine(center, &self.points[entry.data]) <= radius)
            .count()
    }

    /// Distance to the `k`-th nearest point counting the point itself (k = 1 gives 0)
    pub fn kth_neighbor_distance(&self, idx: usize, k: usize) -> Option<f64> {
        let center = &self.points[idx];
        self.tree
            .nearest_neighbor_iter(&center.to_unit_vector())
            .nth(k.checked_sub(1)?)
            .map(|entry| haversine(center, &self.points[entry.data]))
    }
}
