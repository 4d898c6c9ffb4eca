//! Heading and great-circle helpers

/// Mean Earth radius (metres)
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Normalise a heading into [0, 360)
pub fn normalize_heading(degrees: f64) -> f64 {
    degrees.rem_euclid(360.0)
}

/// Smallest angle between two headings, in [0, 180]
pub fn angle_diff(a: f64, b: f64) -> f64 {
    let diff = (normalize_heading(a) - normalize_heading(b)).abs();
    diff.min(360.0 - diff)
}

/// Whether a heading falls in a sector that may wrap through north.
///
/// With `min > max` the sector is `[min, 360) U [0, max]`.
pub fn in_sector(heading: f64, min: f64, max: f64) -> bool {
    let h = normalize_heading(heading);
    if min <= max {
        h >= min && h <= max
    } else {
        h >= min || h <= max
    }
}

/// Great-circle distance in metres (haversine)
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    EARTH_RADIUS_M * 2.0 * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Arithmetic mean of a set of points. Adequate for the few-kilometre
/// spreads the holding detector looks at.
pub fn centroid(points: impl IntoIterator<Item = (f64, f64)>) -> Option<(f64, f64)> {
    let (mut lat, mut lon, mut n) = (0.0, 0.0, 0usize);
    for (la, lo) in points {
        lat += la;
        lon += lo;
        n += 1;
    }
    (n > 0).then(|| (lat / n as f64, lon / n as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_angle_diff_wraps() {
        assert_eq!(angle_diff(10.0, 200.0), 170.0);
        assert_eq!(angle_diff(350.0, 10.0), 20.0);
        assert_eq!(angle_diff(0.0, 180.0), 180.0);
        assert_eq!(angle_diff(-10.0, 10.0), 20.0);
    }

    #[test]
    fn test_sector_wraps_through_north() {
        assert!(in_sector(0.0, 300.0, 60.0));
        assert!(in_sector(300.0, 300.0, 60.0));
        assert!(in_sector(359.9, 300.0, 60.0));
        assert!(in_sector(60.0, 300.0, 60.0));
        assert!(!in_sector(180.0, 300.0, 60.0));
        assert!(!in_sector(61.0, 300.0, 60.0));
        assert!(in_sector(90.0, 45.0, 135.0));
        assert!(!in_sector(0.0, 45.0, 135.0));
    }

    #[test]
    fn test_haversine_known_distance() {
        // One degree of latitude is ~111.2 km
        let d = haversine_m(32.0, 34.0, 33.0, 34.0);
        assert!((d - 111_195.0).abs() < 100.0);
        assert_eq!(haversine_m(32.0, 34.0, 32.0, 34.0), 0.0);
    }

    #[test]
    fn test_centroid() {
        assert_eq!(centroid(Vec::new()), None);
        let c = centroid(vec![(0.0, 0.0), (2.0, 4.0)]).unwrap();
        assert_eq!(c, (1.0, 2.0));
    }

    proptest! {
        #[test]
        fn prop_angle_diff_symmetric(a in 0.0f64..360.0, b in 0.0f64..360.0) {
            prop_assert_eq!(angle_diff(a, b), angle_diff(b, a));
        }

        #[test]
        fn prop_angle_diff_self_is_zero(a in 0.0f64..360.0) {
            prop_assert_eq!(angle_diff(a, a), 0.0);
        }

        #[test]
        fn prop_angle_diff_bounded(a in 0.0f64..360.0, b in 0.0f64..360.0) {
            let d = angle_diff(a, b);
            prop_assert!(d >= 0.0 && d <= 180.0);
        }
    }
}
