//! Projection of arbitrary coordinates onto the street graph.
//!
//! A [`Split`] is an ephemeral record describing where a coordinate lands
//! on an edge: the segment, the fraction along it, the projected fixed
//! coordinate, and the distances from both endpoints (which always sum to
//! the edge length exactly).

use crate::geometry::{self, FIXED_DEGREES_FACTOR, METERS_PER_DEGREE_LAT};
use crate::layer::StreetLayer;
use crate::store::EdgeCursor;
use crate::{EdgeFlag, EdgeId, Mode};

/// The projection of a coordinate onto a forward edge.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Split {
    /// The forward (even) edge the point was projected onto.
    pub edge: EdgeId,
    /// Ordinal of the geometry segment containing the projection.
    pub segment: u32,
    /// Fraction along that segment, in `[0, 1]`.
    pub fraction: f64,
    /// Projected coordinate, fixed degrees.
    pub fixed_lat: i32,
    /// Projected coordinate, fixed degrees.
    pub fixed_lon: i32,
    /// Perpendicular distance from the query point to the edge.
    pub distance_to_edge_mm: i32,
    /// Distance from the pair's from-vertex to the projection.
    pub distance0_mm: i32,
    /// Distance from the projection to the pair's to-vertex.
    pub distance1_mm: i32,
}

/// Outcome of the per-edge projection scan.
struct Projection {
    squared_fixed: f64,
    segment: u32,
    fraction: f64,
    fixed_lat: i32,
    fixed_lon: i32,
}

impl Split {
    /// Projects `(lat, lon)` onto the nearest permitted edge within
    /// `radius_m` meters. Candidates flagged LINK, lacking LINKABLE, or
    /// lacking the mode's permission in either direction are skipped.
    ///
    /// Ties on distance go to the lower edge id, so results are
    /// deterministic regardless of spatial index iteration order.
    ///
    /// Returns `None` when no linkable edge lies within the radius.
    pub fn find(layer: &StreetLayer, lat: f64, lon: f64, radius_m: f64, mode: Mode) -> Option<Split> {
        if !lat.is_finite() || !lon.is_finite() {
            return None;
        }
        let target_lat = geometry::degrees_to_fixed(lat);
        let target_lon = geometry::degrees_to_fixed(lon);
        let cos_lat = geometry::latitude_cosine(target_lat);

        let envelope = crate::FixedEnvelope::around(target_lat, target_lon, radius_m);
        let radius_fixed = radius_m / METERS_PER_DEGREE_LAT * FIXED_DEGREES_FACTOR;
        let radius_squared = radius_fixed * radius_fixed;

        let mut best: Option<(Projection, EdgeId)> = None;
        for edge in layer.find_edges_in_envelope(&envelope) {
            let cursor = layer.edge_cursor(edge);
            if cursor.has_flag(EdgeFlag::Link) {
                continue;
            }
            let backward = layer.edge_cursor(edge ^ 1);
            if !is_linkable(&cursor, mode) || !is_linkable(&backward, mode) {
                continue;
            }

            let projection = project(&cursor, target_lat, target_lon, cos_lat);
            let better = match &best {
                Some((current, _)) => projection.squared_fixed < current.squared_fixed,
                None => true,
            };
            if better {
                best = Some((projection, edge));
            }
        }

        let (projection, edge) = best?;
        if projection.squared_fixed > radius_squared {
            return None;
        }
        Some(complete(layer, edge, projection, cos_lat))
    }

    /// Projects `(lat, lon)` onto one specific edge, without the spatial
    /// query or any permission filtering. Used when the caller already
    /// knows the target edge (e.g. park-and-ride lots).
    ///
    /// Returns `None` only for non-finite input.
    pub fn find_on_edge(layer: &StreetLayer, lat: f64, lon: f64, edge: EdgeId) -> Option<Split> {
        if !lat.is_finite() || !lon.is_finite() {
            return None;
        }
        let target_lat = geometry::degrees_to_fixed(lat);
        let target_lon = geometry::degrees_to_fixed(lon);
        let cos_lat = geometry::latitude_cosine(target_lat);

        let forward = edge & !1;
        let cursor = layer.edge_cursor(forward);
        let projection = project(&cursor, target_lat, target_lon, cos_lat);
        Some(complete(layer, forward, projection, cos_lat))
    }
}

fn is_linkable(cursor: &EdgeCursor<'_>, mode: Mode) -> bool {
    cursor.has_flag(EdgeFlag::Linkable) && cursor.allows(mode)
}

/// Scans every segment of the (forward) edge geometry and returns the
/// closest projection. Distances stay squared, in latitude-equivalent
/// fixed units, inside a 64-bit accumulator.
#[allow(clippy::cast_possible_truncation)]
fn project(cursor: &EdgeCursor<'_>, target_lat: i32, target_lon: i32, cos_lat: f64) -> Projection {
    let mut best = Projection {
        squared_fixed: f64::INFINITY,
        segment: 0,
        fraction: 0.0,
        fixed_lat: 0,
        fixed_lon: 0,
    };
    let (px, py) = (f64::from(target_lon), f64::from(target_lat));

    cursor.for_each_segment(|index, lat0, lon0, lat1, lon1| {
        let (x0, y0) = (f64::from(lon0), f64::from(lat0));
        let (x1, y1) = (f64::from(lon1), f64::from(lat1));
        let fraction = geometry::segment_fraction(x0, y0, x1, y1, px, py, cos_lat);
        let proj_x = x0 + fraction * (x1 - x0);
        let proj_y = y0 + fraction * (y1 - y0);
        let squared = geometry::squared_fixed_distance(px, py, proj_x, proj_y, cos_lat);
        if squared < best.squared_fixed {
            best = Projection {
                squared_fixed: squared,
                segment: index as u32,
                fraction,
                fixed_lat: proj_y.round() as i32,
                fixed_lon: proj_x.round() as i32,
            };
        }
    });
    best
}

/// Turns a raw projection into a [`Split`] with millimeter distances from
/// both endpoints. Segment lengths use the planar approximation so they
/// stay consistent with the fraction arithmetic.
#[allow(clippy::cast_possible_truncation)]
fn complete(layer: &StreetLayer, edge: EdgeId, projection: Projection, cos_lat: f64) -> Split {
    let cursor = layer.edge_cursor(edge);
    let length_mm = cursor.length_mm();

    let mut meters_before = 0.0;
    cursor.for_each_segment(|index, lat0, lon0, lat1, lon1| {
        let segment_meters = geometry::planar_segment_meters(lat0, lon0, lat1, lon1, cos_lat);
        if (index as u32) < projection.segment {
            meters_before += segment_meters;
        } else if index as u32 == projection.segment {
            meters_before += projection.fraction * segment_meters;
        }
    });

    let distance0_mm = ((meters_before * 1000.0).round() as i32).clamp(0, length_mm);
    let distance_to_edge_m =
        projection.squared_fixed.sqrt() / FIXED_DEGREES_FACTOR * METERS_PER_DEGREE_LAT;

    Split {
        edge,
        segment: projection.segment,
        fraction: projection.fraction,
        fixed_lat: projection.fixed_lat,
        fixed_lon: projection.fixed_lon,
        distance_to_edge_mm: (distance_to_edge_m * 1000.0).round() as i32,
        distance0_mm,
        distance1_mm: length_mm - distance0_mm,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::test_support::{grid_layer, street_record};
    use crate::StreetLayer;

    /// One east-west edge along the equator, one kilometer long.
    fn single_edge_layer() -> StreetLayer {
        let mut layer = StreetLayer::new();
        let a = layer.add_vertex(0.0, 0.0).unwrap();
        let b = layer.add_vertex(0.0, 0.009).unwrap();
        layer
            .add_street_edge(street_record(a, b, 1_000_000))
            .unwrap();
        layer
    }

    #[test]
    fn test_projection_in_segment_interior() {
        let layer = single_edge_layer();
        let split = Split::find(&layer, 0.0001, 0.0045, 300.0, Mode::Walk).unwrap();

        assert_eq!(split.edge, 0);
        assert_eq!(split.segment, 0);
        assert!((split.fraction - 0.5).abs() < 1e-3);
        assert_eq!(split.distance0_mm + split.distance1_mm, 1_000_000);
        // ~11 m of perpendicular offset.
        assert!((split.distance_to_edge_mm - 11_111).abs() < 200);
    }

    #[test]
    fn test_out_of_radius_returns_none() {
        let layer = single_edge_layer();
        // Half a degree north is tens of kilometers away.
        assert!(Split::find(&layer, 0.5, 0.0045, 300.0, Mode::Walk).is_none());
        assert!(Split::find(&layer, f64::NAN, 0.0, 300.0, Mode::Walk).is_none());
    }

    #[test]
    fn test_unpermitted_mode_is_skipped() {
        let layer = single_edge_layer();
        // The helper grants walk and car but not bike permissions.
        assert!(Split::find(&layer, 0.0001, 0.0045, 300.0, Mode::Bicycle).is_none());
    }

    #[test]
    fn test_endpoint_clamping() {
        let layer = single_edge_layer();
        // A point west of the from-vertex clamps to fraction zero.
        let split = Split::find(&layer, 0.0, -0.0005, 300.0, Mode::Walk).unwrap();
        assert_eq!(split.distance0_mm, 0);
        assert_eq!(split.distance1_mm, 1_000_000);
        assert!(split.fraction.abs() < 1e-12);
    }

    #[test]
    fn test_lower_edge_id_wins_ties() {
        let mut layer = StreetLayer::new();
        let a = layer.add_vertex(0.0, 0.0).unwrap();
        let b = layer.add_vertex(0.0, 0.009).unwrap();
        // Two identical pairs between the same vertices.
        layer.add_street_edge(street_record(a, b, 1_000_000)).unwrap();
        layer.add_street_edge(street_record(a, b, 1_000_000)).unwrap();

        let split = Split::find(&layer, 0.0001, 0.0045, 300.0, Mode::Walk).unwrap();
        assert_eq!(split.edge, 0);
    }

    #[test]
    fn test_find_on_edge_agrees_with_find() {
        let layer = grid_layer(3, 3);
        let (lat, lon) = (0.00031, 0.00094);
        let found = Split::find(&layer, lat, lon, 300.0, Mode::Walk).unwrap();
        let direct = Split::find_on_edge(&layer, lat, lon, found.edge).unwrap();

        assert_eq!(found.distance0_mm, direct.distance0_mm);
        assert_eq!(found.distance1_mm, direct.distance1_mm);
        assert_eq!(found.fixed_lat, direct.fixed_lat);
        assert_eq!(found.fixed_lon, direct.fixed_lon);
        assert_eq!(found.segment, direct.segment);
    }

    #[test]
    fn test_find_on_edge_normalizes_to_forward() {
        let layer = single_edge_layer();
        let via_backward = Split::find_on_edge(&layer, 0.0001, 0.0045, 1).unwrap();
        assert_eq!(via_backward.edge, 0);
    }
}
