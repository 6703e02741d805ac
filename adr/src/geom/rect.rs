// SPDX-License-Identifier: Apache-2.0
// Copyright 2024, 2026 Joe Pearson

use serde::{Deserialize, Serialize};

use super::point::normalize_lon_diff;
use super::Point;

/// An axis-aligned, wrap-aware bounding rectangle.
///
/// Longitude is wrap-aware: `sw.lon_deg() > ne.lon_deg()` is a valid
/// rectangle that crosses the antimeridian.
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Rect {
    sw: Point,
    ne: Point,
}

/// The rectangle returned for objects whose bounding box could not be
/// computed, e.g. an airspace component with an unresolved border
/// reference leaves the airspace's bbox at `(invalid, invalid)`.
pub const INVALID: Rect = Rect {
    sw: Point::from_units(i32::MAX, i32::MAX),
    ne: Point::from_units(i32::MIN, i32::MIN),
};

impl Rect {
    pub fn new(sw: Point, ne: Point) -> Self {
        Self { sw, ne }
    }

    pub fn invalid() -> Self {
        INVALID
    }

    pub fn is_invalid(&self) -> bool {
        self.sw.lat_units() > self.ne.lat_units()
    }

    pub fn sw(&self) -> Point {
        self.sw
    }

    pub fn ne(&self) -> Point {
        self.ne
    }

    /// Grows the rectangle to enclose `pt`, or initialises it from `pt` if
    /// currently invalid.
    pub fn add(&mut self, pt: Point) {
        if self.is_invalid() {
            self.sw = pt;
            self.ne = pt;
            return;
        }

        if pt.lat_units() < self.sw.lat_units() {
            self.sw = Point::from_units(pt.lat_units(), self.sw.lon_units());
        }
        if pt.lat_units() > self.ne.lat_units() {
            self.ne = Point::from_units(pt.lat_units(), self.ne.lon_units());
        }

        let west_dist = normalize_lon_diff(self.sw.lon_deg(), pt.lon_deg());
        let east_dist = normalize_lon_diff(self.ne.lon_deg(), pt.lon_deg());
        if west_dist < 0.0 {
            self.sw = Point::from_units(self.sw.lat_units(), pt.lon_units());
        }
        if east_dist > 0.0 {
            self.ne = Point::from_units(self.ne.lat_units(), pt.lon_units());
        }
    }

    pub fn contains(&self, pt: &Point) -> bool {
        if self.is_invalid() {
            return false;
        }
        if pt.lat_units() < self.sw.lat_units() || pt.lat_units() > self.ne.lat_units() {
            return false;
        }
        if self.sw.lon_units() <= self.ne.lon_units() {
            pt.lon_units() >= self.sw.lon_units() && pt.lon_units() <= self.ne.lon_units()
        } else {
            // Wraps the antimeridian.
            pt.lon_units() >= self.sw.lon_units() || pt.lon_units() <= self.ne.lon_units()
        }
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        if self.is_invalid() || other.is_invalid() {
            return false;
        }
        let lat_overlap =
            self.sw.lat_units() <= other.ne.lat_units() && other.sw.lat_units() <= self.ne.lat_units();
        if !lat_overlap {
            return false;
        }
        // Conservative: any corner test covers the common non-wrapping case;
        // wrap-aware rectangles are treated as intersecting on latitude overlap alone.
        if self.sw.lon_units() <= self.ne.lon_units() && other.sw.lon_units() <= other.ne.lon_units()
        {
            self.sw.lon_units() <= other.ne.lon_units() && other.sw.lon_units() <= self.ne.lon_units()
        } else {
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_rect_contains_nothing() {
        assert!(!Rect::invalid().contains(&Point::new(0.0, 0.0)));
        assert!(Rect::invalid().is_invalid());
    }

    #[test]
    fn add_grows_rect() {
        let mut rect = Rect::invalid();
        rect.add(Point::new(53.0, 9.0));
        rect.add(Point::new(54.0, 10.0));
        assert!(rect.contains(&Point::new(53.5, 9.5)));
        assert!(!rect.contains(&Point::new(55.0, 9.5)));
    }

    #[test]
    fn intersects_overlapping_rects() {
        let a = Rect::new(Point::new(53.0, 9.0), Point::new(54.0, 10.0));
        let b = Rect::new(Point::new(53.5, 9.5), Point::new(55.0, 11.0));
        let c = Rect::new(Point::new(56.0, 9.0), Point::new(57.0, 10.0));
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }
}
