// SPDX-License-Identifier: Apache-2.0
// Copyright 2024, 2026 Joe Pearson

use serde::{Deserialize, Serialize};

use super::Rect;

/// Conversion factor between the `Point`'s internal angular unit and degrees:
/// one unit is `360 / 2^32` degrees.
const UNIT_TO_DEG: f64 = 360.0 / 4_294_967_296.0;
const DEG_TO_UNIT: f64 = 4_294_967_296.0 / 360.0;

/// Mean Earth radius in nautical miles, used for great-circle distance.
const EARTH_RADIUS_NM: f64 = 3440.065;

/// A geographic coordinate stored as signed integers in units of `360 /
/// 2^32` degrees, so that two points compare exactly after a
/// round-trip through the archive format.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct Point {
    lat: i32,
    lon: i32,
}

impl Point {
    pub fn new(lat_deg: f64, lon_deg: f64) -> Self {
        Self {
            lat: (lat_deg * DEG_TO_UNIT).round() as i32,
            lon: (lon_deg * DEG_TO_UNIT).round() as i32,
        }
    }

    pub const fn from_units(lat: i32, lon: i32) -> Self {
        Self { lat, lon }
    }

    pub fn lat_units(&self) -> i32 {
        self.lat
    }

    pub fn lon_units(&self) -> i32 {
        self.lon
    }

    pub fn lat_deg(&self) -> f64 {
        self.lat as f64 * UNIT_TO_DEG
    }

    pub fn lon_deg(&self) -> f64 {
        self.lon as f64 * UNIT_TO_DEG
    }

    /// Great-circle distance to `other`, in nautical miles.
    pub fn spheric_distance(&self, other: &Point) -> f64 {
        let lat1 = self.lat_deg().to_radians();
        let lat2 = other.lat_deg().to_radians();
        let dlat = lat2 - lat1;
        let dlon = (other.lon_deg() - self.lon_deg()).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();
        EARTH_RADIUS_NM * c
    }

    /// Planar approximation of distance, valid only for segments shorter
    /// than about 5 nmi.
    pub fn simple_distance(&self, other: &Point) -> f64 {
        let mean_lat = ((self.lat_deg() + other.lat_deg()) / 2.0).to_radians();
        let dlat = (other.lat_deg() - self.lat_deg()) * 60.0;
        let dlon = (other.lon_deg() - self.lon_deg()) * 60.0 * mean_lat.cos();
        (dlat * dlat + dlon * dlon).sqrt()
    }

    /// Initial true bearing, in degrees, from `self` towards `other`.
    pub fn bearing(&self, other: &Point) -> f64 {
        let lat1 = self.lat_deg().to_radians();
        let lat2 = other.lat_deg().to_radians();
        let dlon = (other.lon_deg() - self.lon_deg()).to_radians();

        let y = dlon.sin() * lat2.cos();
        let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
        let deg = y.atan2(x).to_degrees();
        (deg + 360.0) % 360.0
    }

    /// Axis-aligned bounding rectangle of radius `radius_nmi` around this
    /// point.
    pub fn simple_box_nmi(&self, radius_nmi: f64) -> Rect {
        let dlat = radius_nmi / 60.0;
        let lat_rad = self.lat_deg().to_radians();
        let cos_lat = lat_rad.cos().max(0.01);
        let dlon = radius_nmi / 60.0 / cos_lat;

        let sw = Point::new(self.lat_deg() - dlat, self.lon_deg() - dlon);
        let ne = Point::new(self.lat_deg() + dlat, self.lon_deg() + dlon);
        Rect::new(sw, ne)
    }
}

/// Normalises a degree difference to avoid antimeridian discontinuities when
/// comparing longitudes. Kept separate from `Point` since only `Rect`
/// construction needs it.
pub(crate) fn normalize_lon_diff(a: f64, b: f64) -> f64 {
    let mut d = b - a;
    while d > 180.0 {
        d -= 360.0;
    }
    while d < -180.0 {
        d += 360.0;
    }
    d
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_round_trips_through_units() {
        let p = Point::new(53.63, 9.99);
        let q = Point::from_units(p.lat_units(), p.lon_units());
        assert!((p.lat_deg() - q.lat_deg()).abs() < 1e-6);
        assert!((p.lon_deg() - q.lon_deg()).abs() < 1e-6);
    }

    #[test]
    fn spheric_distance_hamburg_luebeck() {
        let eddh = Point::new(53.63, 9.99);
        let edhl = Point::new(53.81, 10.70);
        let d = eddh.spheric_distance(&edhl);
        assert!((30.0..40.0).contains(&d), "distance was {d}");
    }

    #[test]
    fn simple_box_contains_center() {
        let center = Point::new(53.63, 9.99);
        let rect = center.simple_box_nmi(10.0);
        assert!(rect.contains(&center));
    }
}
