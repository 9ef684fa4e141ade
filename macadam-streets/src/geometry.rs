//! # Geometry utilities
//!
//! Coordinates are stored as fixed-point integer degrees with a scale
//! factor of 10⁷. Short-range math (projection, candidate filtering)
//! uses a local equirectangular approximation where one degree of
//! latitude is [`METERS_PER_DEGREE_LAT`] meters and longitude shrinks
//! with the cosine of the latitude; true distances use the haversine
//! formula.

use geo::{Distance, Haversine, Point};

/// Multiply degrees by this factor to obtain fixed-point storage units.
pub const FIXED_DEGREES_FACTOR: f64 = 1e7;

/// Meters per degree of latitude under the local planar approximation.
pub const METERS_PER_DEGREE_LAT: f64 = 111_111.111;

/// Converts floating degrees to fixed-point degrees, rounding to the grid.
#[allow(clippy::cast_possible_truncation)]
pub fn degrees_to_fixed(degrees: f64) -> i32 {
    (degrees * FIXED_DEGREES_FACTOR).round() as i32
}

/// Converts fixed-point degrees back to floating degrees.
pub fn fixed_to_degrees(fixed: i32) -> f64 {
    f64::from(fixed) / FIXED_DEGREES_FACTOR
}

/// Longitude compression factor at the given latitude.
pub fn latitude_cosine(fixed_lat: i32) -> f64 {
    fixed_to_degrees(fixed_lat).to_radians().cos()
}

/// Projects `(px, py)` onto the segment `(x0, y0) → (x1, y1)` and returns
/// the fraction along the segment, clamped to `[0, 1]`.
///
/// All inputs are fixed-degree values with `x` as longitude and `y` as
/// latitude; `cos_lat` corrects for longitude compression so the
/// projection is performed in a locally metric space.
pub fn segment_fraction(
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
    px: f64,
    py: f64,
    cos_lat: f64,
) -> f64 {
    let dx = (x1 - x0) * cos_lat;
    let dy = y1 - y0;
    let length_squared = dx * dx + dy * dy;
    if length_squared == 0.0 {
        return 0.0;
    }
    let t = ((px - x0) * cos_lat * dx + (py - y0) * dy) / length_squared;
    t.clamp(0.0, 1.0)
}

/// Squared distance between two fixed-degree coordinates, in
/// latitude-equivalent fixed units. Kept squared so callers can compare
/// against a squared radius without taking roots; the accumulator is an
/// `f64` because squared radii overflow 32 bits.
pub fn squared_fixed_distance(x0: f64, y0: f64, x1: f64, y1: f64, cos_lat: f64) -> f64 {
    let dx = (x1 - x0) * cos_lat;
    let dy = y1 - y0;
    dx * dx + dy * dy
}

/// Planar length of a segment between fixed-degree endpoints, in meters.
pub fn planar_segment_meters(lat0: i32, lon0: i32, lat1: i32, lon1: i32, cos_lat: f64) -> f64 {
    let dy = (f64::from(lat1) - f64::from(lat0)) / FIXED_DEGREES_FACTOR * METERS_PER_DEGREE_LAT;
    let dx = (f64::from(lon1) - f64::from(lon0)) / FIXED_DEGREES_FACTOR
        * METERS_PER_DEGREE_LAT
        * cos_lat;
    (dx * dx + dy * dy).sqrt()
}

/// Great-circle distance between two floating-degree coordinates, in meters.
pub fn haversine_meters(lat0: f64, lon0: f64, lat1: f64, lon1: f64) -> f64 {
    Haversine.distance(Point::new(lon0, lat0), Point::new(lon1, lat1))
}

/// Compass azimuth (degrees clockwise from north, `0..360`) from one
/// fixed-degree coordinate to another.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn compass_angle_degrees(from_lat: i32, from_lon: i32, to_lat: i32, to_lon: i32) -> u16 {
    let cos_lat = latitude_cosine(from_lat);
    let dx = (f64::from(to_lon) - f64::from(from_lon)) * cos_lat;
    let dy = f64::from(to_lat) - f64::from(from_lat);
    let azimuth = dx.atan2(dy).to_degrees();
    let azimuth = if azimuth < 0.0 { azimuth + 360.0 } else { azimuth };
    (azimuth.round() as u16) % 360
}

/// Packs a compass angle into a signed byte (binary radians: 256 units
/// per full turn).
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
pub fn degrees_to_binary_radians(degrees: u16) -> i8 {
    let degrees = u32::from(degrees % 360);
    (((degrees * 256 + 180) / 360) % 256) as u8 as i8
}

/// Unpacks a signed-byte binary-radian angle back to whole degrees.
#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
pub fn binary_radians_to_degrees(brads: i8) -> u16 {
    ((u32::from(brads as u8) * 360 + 128) / 256) as u16 % 360
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::{prop_assert, proptest};

    proptest! {
        #[test]
        fn fixed_round_trip(degrees in -180.0f64..180.0) {
            let restored = fixed_to_degrees(degrees_to_fixed(degrees));
            prop_assert!((restored - degrees).abs() <= 1e-7);
        }

        #[test]
        fn binary_radians_round_trip(degrees in 0u16..360) {
            let restored = binary_radians_to_degrees(degrees_to_binary_radians(degrees));
            let delta = i32::from(restored) - i32::from(degrees);
            let delta = delta.rem_euclid(360).min((-delta).rem_euclid(360));
            prop_assert!(delta <= 1, "expected {degrees} +/- 1, got {restored}");
        }

        #[test]
        fn planar_overestimates_are_small(
            lat in -60.0f64..60.0, lon in -180.0f64..180.0,
            dlat in -0.01f64..0.01, dlon in -0.01f64..0.01,
        ) {
            // Over short distances the planar approximation should stay
            // within a meter or so of the haversine result.
            let lat_fixed = degrees_to_fixed(lat);
            let lon_fixed = degrees_to_fixed(lon);
            let lat2_fixed = degrees_to_fixed(lat + dlat);
            let lon2_fixed = degrees_to_fixed(lon + dlon);

            let planar = planar_segment_meters(
                lat_fixed, lon_fixed, lat2_fixed, lon2_fixed, latitude_cosine(lat_fixed),
            );
            let true_distance = haversine_meters(lat, lon, lat + dlat, lon + dlon);
            prop_assert!((planar - true_distance).abs() < 2.0);
        }
    }

    #[test]
    fn test_segment_fraction_clamps() {
        // A one-unit segment along the equator.
        assert!((segment_fraction(0.0, 0.0, 10.0, 0.0, 5.0, 3.0, 1.0) - 0.5).abs() < 1e-12);
        assert!(segment_fraction(0.0, 0.0, 10.0, 0.0, -5.0, 0.0, 1.0).abs() < 1e-12);
        assert!((segment_fraction(0.0, 0.0, 10.0, 0.0, 15.0, 0.0, 1.0) - 1.0).abs() < 1e-12);
        // Degenerate segment.
        assert!(segment_fraction(3.0, 3.0, 3.0, 3.0, 9.0, 9.0, 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_compass_angles() {
        assert_eq!(compass_angle_degrees(0, 0, 1000, 0), 0);
        assert_eq!(compass_angle_degrees(0, 0, 0, 1000), 90);
        assert_eq!(compass_angle_degrees(0, 0, -1000, 0), 180);
        assert_eq!(compass_angle_degrees(0, 0, 0, -1000), 270);
        assert_eq!(compass_angle_degrees(0, 0, 1000, 1000), 45);
    }
}
