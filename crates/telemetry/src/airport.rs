//! Monitored airport reference

use serde::{Deserialize, Serialize};

/// Kilometres per degree of latitude (approximate)
const KM_PER_DEGREE: f64 = 111.0;

/// Airport the system watches, plus its monitoring radius
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AirportReference {
    pub name: String,
    pub icao: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Radius of the monitored area (kilometres)
    pub monitoring_radius_km: f64,
}

impl Default for AirportReference {
    fn default() -> Self {
        Self {
            name: "Ben Gurion International Airport".to_string(),
            icao: "LLBG".to_string(),
            latitude: 32.011389,
            longitude: 34.886667,
            monitoring_radius_km: 30.0,
        }
    }
}

/// Lat/lon box used to scope upstream queries
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl BoundingBox {
    /// Check whether a point falls inside the box
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        latitude <= self.north
            && latitude >= self.south
            && longitude <= self.east
            && longitude >= self.west
    }
}

impl AirportReference {
    /// Bounding box around the airport covering the monitoring radius
    pub fn bounds(&self) -> BoundingBox {
        let lat_delta = self.monitoring_radius_km / KM_PER_DEGREE;
        let lon_delta = self.monitoring_radius_km
            / (KM_PER_DEGREE * self.latitude.to_radians().cos());

        BoundingBox {
            north: self.latitude + lat_delta,
            south: self.latitude - lat_delta,
            east: self.longitude + lon_delta,
            west: self.longitude - lon_delta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_surround_airport() {
        let airport = AirportReference::default();
        let bounds = airport.bounds();

        assert!(bounds.contains(airport.latitude, airport.longitude));
        assert!((bounds.north - bounds.south - 2.0 * 30.0 / 111.0).abs() < 1e-9);
        // Longitude degrees are shorter away from the equator
        assert!(bounds.east - bounds.west > bounds.north - bounds.south);
    }

    #[test]
    fn test_point_outside_bounds() {
        let bounds = AirportReference::default().bounds();
        assert!(!bounds.contains(33.5, 34.88));
        assert!(!bounds.contains(32.01, 36.0));
    }
}
