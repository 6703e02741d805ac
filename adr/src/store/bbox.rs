// SPDX-License-Identifier: Apache-2.0
// Copyright 2024, 2026 Joe Pearson

//! The in-memory bounding-box spatial index over objects with geometry.

use rstar::{RTree, RTreeObject, AABB};

use crate::geom::Rect;
use crate::id::Uuid;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Entry {
    pub uuid: Uuid,
    pub rect: Rect,
}

impl RTreeObject for Entry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        let sw = self.rect.sw();
        let ne = self.rect.ne();
        AABB::from_corners([sw.lon_deg(), sw.lat_deg()], [ne.lon_deg(), ne.lat_deg()])
    }
}

#[derive(Default)]
pub struct BboxIndex {
    tree: RTree<Entry>,
}

impl BboxIndex {
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    pub fn insert(&mut self, uuid: Uuid, rect: Rect) {
        if rect.is_invalid() {
            return;
        }
        self.remove(uuid);
        self.tree.insert(Entry { uuid, rect });
    }

    pub fn remove(&mut self, uuid: Uuid) {
        if let Some(existing) = self.tree.iter().find(|e| e.uuid == uuid).copied() {
            self.tree.remove(&existing);
        }
    }

    pub fn query(&self, rect: Rect) -> Vec<Uuid> {
        if rect.is_invalid() {
            return Vec::new();
        }
        let sw = rect.sw();
        let ne = rect.ne();
        let envelope = AABB::from_corners([sw.lon_deg(), sw.lat_deg()], [ne.lon_deg(), ne.lat_deg()]);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|e| e.uuid)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Point;

    #[test]
    fn query_returns_intersecting_entries_only() {
        let mut index = BboxIndex::new();
        let a = Uuid::new_random();
        let b = Uuid::new_random();
        index.insert(a, Rect::new(Point::new(53.0, 9.0), Point::new(54.0, 10.0)));
        index.insert(b, Rect::new(Point::new(60.0, 9.0), Point::new(61.0, 10.0)));

        let hits = index.query(Rect::new(Point::new(53.2, 9.2), Point::new(53.8, 9.8)));
        assert_eq!(hits, vec![a]);
    }
}
