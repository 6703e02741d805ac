// SPDX-License-Identifier: Apache-2.0
// Copyright 2024, 2026 Joe Pearson

use serde::{Deserialize, Serialize};

use crate::id::Uuid;

use super::{Point, Rect};

/// A ring with holes: an exterior ring and zero or more interior (hole)
/// rings, each a list of points.
///
/// A vertex may be a literal coordinate or a back-reference to a named
/// point's coordinate. Back-references are *not* embedded in the vertex
/// record: instead each ring
/// carries its own literal `Point`s plus a side-list of
/// `(vertex_index, uuid)` pairs resolved during `link`, substituted in place
/// once the referenced point has been loaded.
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct PolygonHole {
    exterior: Ring,
    interiors: Vec<Ring>,
}

/// A single ring of a `PolygonHole`: literal vertices plus unresolved
/// point-reference back-fills.
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct Ring {
    vertices: Vec<Point>,
    /// `(vertex_index, uuid)` pairs awaiting substitution during `link`.
    refs: Vec<(usize, Uuid)>,
}

impl Ring {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_point(&mut self, pt: Point) {
        self.vertices.push(pt);
    }

    /// Pushes a placeholder vertex to be filled in from the named point
    /// `uuid` once `link` resolves it.
    pub fn push_ref(&mut self, uuid: Uuid) {
        let index = self.vertices.len();
        self.vertices.push(Point::default());
        self.refs.push((index, uuid));
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    pub fn unresolved(&self) -> &[(usize, Uuid)] {
        &self.refs
    }

    /// Substitutes the resolved coordinate for the back-reference at
    /// `index`, if one is pending there.
    pub fn resolve(&mut self, index: usize, coordinate: Point) {
        if let Some(slot) = self.vertices.get_mut(index) {
            *slot = coordinate;
        }
        self.refs.retain(|&(i, _)| i != index);
    }

    pub fn is_fully_resolved(&self) -> bool {
        self.refs.is_empty()
    }

    /// Closes the ring (first point == last point) and drops consecutive
    /// duplicate vertices.
    pub fn normalize_boostgeom(&mut self, clockwise: bool) {
        self.vertices.dedup();
        if self.vertices.len() > 1 && self.vertices.first() != self.vertices.last() {
            if let Some(&first) = self.vertices.first() {
                self.vertices.push(first);
            }
        }
        if signed_area(&self.vertices) > 0.0 {
            if !clockwise {
                return;
            }
            self.vertices.reverse();
        } else if clockwise {
            return;
        } else {
            self.vertices.reverse();
        }
    }
}

fn signed_area(vertices: &[Point]) -> f64 {
    let mut area = 0.0;
    for w in vertices.windows(2) {
        area += w[0].lon_deg() * w[1].lat_deg() - w[1].lon_deg() * w[0].lat_deg();
    }
    area
}

impl PolygonHole {
    pub fn new(exterior: Ring) -> Self {
        Self {
            exterior,
            interiors: Vec::new(),
        }
    }

    pub fn exterior(&self) -> &Ring {
        &self.exterior
    }

    pub fn exterior_mut(&mut self) -> &mut Ring {
        &mut self.exterior
    }

    pub fn interiors(&self) -> &[Ring] {
        &self.interiors
    }

    pub fn interiors_mut(&mut self) -> &mut [Ring] {
        &mut self.interiors
    }

    pub fn push_interior(&mut self, ring: Ring) {
        self.interiors.push(ring);
    }

    /// Enforces canonical winding: exterior counter-clockwise, interiors
    /// clockwise, and closes every ring.
    pub fn normalize_boostgeom(&mut self) {
        self.exterior.normalize_boostgeom(false);
        for interior in &mut self.interiors {
            interior.normalize_boostgeom(true);
        }
    }

    pub fn envelope(&self) -> Rect {
        let mut rect = Rect::invalid();
        for pt in self.exterior.vertices() {
            rect.add(*pt);
        }
        rect
    }

    pub fn contains(&self, pt: &Point) -> bool {
        if !point_in_ring(&self.exterior.vertices, pt) {
            return false;
        }
        !self
            .interiors
            .iter()
            .any(|hole| point_in_ring(&hole.vertices, pt))
    }
}

/// Even-odd ray-casting point-in-polygon test over a single ring.
fn point_in_ring(vertices: &[Point], pt: &Point) -> bool {
    let mut inside = false;
    let n = vertices.len();
    if n < 3 {
        return false;
    }
    let (x, y) = (pt.lon_deg(), pt.lat_deg());
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = (vertices[i].lon_deg(), vertices[i].lat_deg());
        let (xj, yj) = (vertices[j].lon_deg(), vertices[j].lat_deg());
        if (yi > y) != (yj > y) {
            let x_intersect = xi + (y - yi) / (yj - yi) * (xj - xi);
            if x < x_intersect {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// An ordered sequence of polygons-with-holes, e.g. an airspace component's
/// geometry where disjoint pieces are unioned.
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct MultiPolygonHole {
    polygons: Vec<PolygonHole>,
}

impl MultiPolygonHole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, polygon: PolygonHole) {
        self.polygons.push(polygon);
    }

    pub fn polygons(&self) -> &[PolygonHole] {
        &self.polygons
    }

    pub fn polygons_mut(&mut self) -> &mut [PolygonHole] {
        &mut self.polygons
    }

    pub fn normalize_boostgeom(&mut self) {
        for polygon in &mut self.polygons {
            polygon.normalize_boostgeom();
        }
    }

    pub fn envelope(&self) -> Rect {
        let mut rect = Rect::invalid();
        for polygon in &self.polygons {
            let e = polygon.envelope();
            if !e.is_invalid() {
                rect.add(e.sw());
                rect.add(e.ne());
            }
        }
        rect
    }

    pub fn contains(&self, pt: &Point) -> bool {
        self.polygons.iter().any(|p| p.contains(pt))
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(sw_lat: f64, sw_lon: f64, ne_lat: f64, ne_lon: f64) -> PolygonHole {
        let mut ring = Ring::new();
        ring.push_point(Point::new(sw_lat, sw_lon));
        ring.push_point(Point::new(sw_lat, ne_lon));
        ring.push_point(Point::new(ne_lat, ne_lon));
        ring.push_point(Point::new(ne_lat, sw_lon));
        ring.push_point(Point::new(sw_lat, sw_lon));
        PolygonHole::new(ring)
    }

    #[test]
    fn polygon_contains_interior_point() {
        let poly = square(53.0, 9.0, 54.0, 10.0);
        assert!(poly.contains(&Point::new(53.5, 9.5)));
        assert!(!poly.contains(&Point::new(55.0, 9.5)));
    }

    #[test]
    fn hole_excludes_point() {
        let mut poly = square(53.0, 9.0, 54.0, 10.0);
        poly.push_interior(square(53.4, 9.4, 53.6, 9.6).exterior().clone());
        assert!(!poly.contains(&Point::new(53.5, 9.5)));
        assert!(poly.contains(&Point::new(53.1, 9.1)));
    }

    #[test]
    fn ring_ref_resolves_by_index() {
        let mut ring = Ring::new();
        ring.push_point(Point::new(53.0, 9.0));
        ring.push_ref(Uuid::new_random());
        ring.push_point(Point::new(54.0, 9.0));
        assert!(!ring.is_fully_resolved());
        ring.resolve(1, Point::new(53.5, 9.2));
        assert!(ring.is_fully_resolved());
        assert_eq!(ring.vertices()[1], Point::new(53.5, 9.2));
    }
}
