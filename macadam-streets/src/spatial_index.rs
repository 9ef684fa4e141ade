//! Fixed-bucket hash grid over fixed-degree envelopes.
//!
//! The index may over-approximate (extra candidates are filtered by the
//! caller's exact geometry math) but never under-approximates. Only
//! forward (even) baseline edges are inserted; overlay edges are found
//! through the layer's temporary-edge union instead.

use std::collections::HashMap;

use crate::geometry::{FIXED_DEGREES_FACTOR, METERS_PER_DEGREE_LAT};
use crate::{geometry, EdgeId};

/// Grid bucket size in fixed degrees (about 330 m of latitude).
const BIN_SIZE_FIXED: i32 = 30_000;

/// An axis-aligned bounding box in fixed degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedEnvelope {
    pub min_lat: i32,
    pub min_lon: i32,
    pub max_lat: i32,
    pub max_lon: i32,
}

impl FixedEnvelope {
    /// The smallest envelope containing all of `points`.
    pub fn containing(points: impl IntoIterator<Item = (i32, i32)>) -> Self {
        let mut envelope = Self {
            min_lat: i32::MAX,
            min_lon: i32::MAX,
            max_lat: i32::MIN,
            max_lon: i32::MIN,
        };
        for (lat, lon) in points {
            envelope.min_lat = envelope.min_lat.min(lat);
            envelope.max_lat = envelope.max_lat.max(lat);
            envelope.min_lon = envelope.min_lon.min(lon);
            envelope.max_lon = envelope.max_lon.max(lon);
        }
        envelope
    }

    /// An envelope around a point, expanded by `radius_m` meters in every
    /// direction (longitude expansion grows with latitude).
    #[allow(clippy::cast_possible_truncation)]
    pub fn around(fixed_lat: i32, fixed_lon: i32, radius_m: f64) -> Self {
        let lat_radius = (radius_m / METERS_PER_DEGREE_LAT * FIXED_DEGREES_FACTOR).ceil();
        let cos_lat = geometry::latitude_cosine(fixed_lat).max(1e-6);
        let lon_radius = (lat_radius / cos_lat).ceil();
        Self {
            min_lat: fixed_lat.saturating_sub(lat_radius as i32),
            max_lat: fixed_lat.saturating_add(lat_radius as i32),
            min_lon: fixed_lon.saturating_sub(lon_radius as i32),
            max_lon: fixed_lon.saturating_add(lon_radius as i32),
        }
    }

    pub fn intersects(&self, other: &FixedEnvelope) -> bool {
        self.min_lat <= other.max_lat
            && other.min_lat <= self.max_lat
            && self.min_lon <= other.max_lon
            && other.min_lon <= self.max_lon
    }
}

/// Envelope-keyed grid of forward edge ids.
#[derive(Debug, Clone, Default)]
pub struct SpatialIndex {
    bins: HashMap<(i32, i32), Vec<EdgeId>>,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an edge under every grid cell its envelope touches.
    pub fn insert(&mut self, envelope: &FixedEnvelope, edge: EdgeId) {
        debug_assert!(edge & 1 == 0, "only forward edges are indexed");
        for cell in cells(envelope) {
            self.bins.entry(cell).or_default().push(edge);
        }
    }

    /// Every indexed edge whose envelope could intersect `envelope`,
    /// deduplicated and sorted ascending.
    pub fn query(&self, envelope: &FixedEnvelope) -> Vec<EdgeId> {
        let mut result: Vec<EdgeId> = cells(envelope)
            .filter_map(|cell| self.bins.get(&cell))
            .flatten()
            .copied()
            .collect();
        result.sort_unstable();
        result.dedup();
        result
    }
}

fn cells(envelope: &FixedEnvelope) -> impl Iterator<Item = (i32, i32)> + use<> {
    let lat_range = envelope.min_lat.div_euclid(BIN_SIZE_FIXED)
        ..=envelope.max_lat.div_euclid(BIN_SIZE_FIXED);
    let min_lon = envelope.min_lon.div_euclid(BIN_SIZE_FIXED);
    let max_lon = envelope.max_lon.div_euclid(BIN_SIZE_FIXED);
    lat_range.flat_map(move |lat| (min_lon..=max_lon).map(move |lon| (lat, lon)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_returns_inserted_edges() {
        let mut index = SpatialIndex::new();
        let envelope = FixedEnvelope::containing([(0, 0), (50_000, 50_000)]);
        index.insert(&envelope, 4);
        index.insert(&envelope, 2);

        let hits = index.query(&FixedEnvelope::containing([(10_000, 10_000), (20_000, 20_000)]));
        assert_eq!(hits, vec![2, 4]);
    }

    #[test]
    fn test_query_never_misses_intersecting_envelopes() {
        let mut index = SpatialIndex::new();
        // An edge straddling several buckets, including negative cells.
        let envelope = FixedEnvelope::containing([(-45_000, -45_000), (95_000, 15_000)]);
        index.insert(&envelope, 8);

        for (lat, lon) in [(-40_000, -40_000), (0, 0), (90_000, 10_000)] {
            let probe = FixedEnvelope::containing([(lat, lon), (lat + 100, lon + 100)]);
            assert!(index.query(&probe).contains(&8), "missed at ({lat}, {lon})");
        }
    }

    #[test]
    fn test_disjoint_probe_may_be_empty() {
        let mut index = SpatialIndex::new();
        let envelope = FixedEnvelope::containing([(0, 0), (1_000, 1_000)]);
        index.insert(&envelope, 0);

        let probe = FixedEnvelope::containing([(900_000, 900_000), (910_000, 910_000)]);
        assert!(index.query(&probe).is_empty());
    }

    #[test]
    fn test_envelope_around_expands_longitude_with_latitude() {
        let equator = FixedEnvelope::around(0, 0, 300.0);
        let northern = FixedEnvelope::around(600_000_000, 0, 300.0);
        let equator_width = equator.max_lon - equator.min_lon;
        let northern_width = northern.max_lon - northern.min_lon;
        assert!(northern_width > equator_width);
        // cos(60°) = 0.5, so the expansion roughly doubles.
        assert!(f64::from(northern_width) / f64::from(equator_width) < 2.1);
    }

    #[test]
    fn test_envelope_intersections() {
        let a = FixedEnvelope::containing([(0, 0), (10, 10)]);
        let b = FixedEnvelope::containing([(10, 10), (20, 20)]);
        let c = FixedEnvelope::containing([(11, 11), (20, 20)]);
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c));
    }
}
