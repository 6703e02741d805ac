// SPDX-License-Identifier: Apache-2.0
// Copyright 2024, 2026 Joe Pearson
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The versioned object: an ordered run of time-slices sharing one UUID.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::geom::Point;
use crate::id::Uuid;
use crate::model::{Body, TimeSlice, VariantKind};
use crate::recompute::RecomputeContext;
use crate::store::ObjectStore;
use crate::time::{Interpretation, SliceHeader};

/// A versioned object: a stable UUID plus every time-slice ever recorded
/// for it, baseline and deltas alike.
///
/// Slices are kept sorted by `validity.start_time`. Two slices of the same
/// `interpretation` may never overlap in validity; `baseline` slices must
/// tile the full history with no gaps once `permanent` deltas are applied.
/// `temp_delta` slices layer on top and are permitted to overlap a baseline
/// slice but not each other.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Object {
    uuid: Uuid,
    kind: VariantKind,
    slices: Vec<TimeSlice>,
    dirty: bool,
}

impl Object {
    pub fn new(uuid: Uuid, kind: VariantKind) -> Self {
        Self {
            uuid,
            kind,
            slices: Vec::new(),
            dirty: false,
        }
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn kind(&self) -> VariantKind {
        self.kind
    }

    pub fn slices(&self) -> &[TimeSlice] {
        &self.slices
    }

    /// Mutable access to every time-slice, for in-place field toggles (e.g.
    /// a restriction's `trace`/`enabled` flags) that don't change validity
    /// and so don't need `add_timeslice`'s overlap bookkeeping.
    pub fn slices_mut(&mut self) -> &mut [TimeSlice] {
        self.dirty = true;
        &mut self.slices
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Inserts a time-slice, keeping the list ordered by start time.
    ///
    /// Rejects a slice whose validity overlaps another slice of the same
    /// `interpretation`, since time-slices of one interpretation partition
    /// time rather than layering.
    pub fn add_timeslice(&mut self, slice: TimeSlice) -> Result<(), Error> {
        if slice.kind() != self.kind {
            return Err(Error::structural(format!(
                "object {} carries variant {:?}, cannot add a {:?} slice",
                self.uuid,
                self.kind,
                slice.kind()
            )));
        }

        let overlaps = self.slices.iter().any(|existing| {
            existing.header.interpretation == slice.header.interpretation
                && existing.header.validity.overlaps(&slice.header.validity)
        });
        if overlaps {
            return Err(Error::structural(format!(
                "object {} already has a {:?} slice overlapping {:?}",
                self.uuid, slice.header.interpretation, slice.header.validity
            )));
        }

        let pos = self
            .slices
            .partition_point(|existing| existing.header.validity.start_time <= slice.header.validity.start_time);
        self.slices.insert(pos, slice);
        self.dirty = true;
        Ok(())
    }

    /// Resolves every [`crate::id::Link`] and polygon back-reference
    /// reachable from this object's slices, in the order they were added.
    pub fn link(&mut self, store: &ObjectStore, depth: u32) -> Result<(), Error> {
        for slice in &mut self.slices {
            slice.body.link(store, depth)?;
        }
        Ok(())
    }

    /// Re-derives every computed field across this object's slices.
    pub fn recompute(&mut self, ctx: &RecomputeContext) -> Result<(), Error> {
        for slice in &mut self.slices {
            slice.body.recompute(ctx)?;
        }
        Ok(())
    }

    /// The effective state at instant `t`: the `baseline` (or `perm_delta`)
    /// slice whose validity contains `t`, overridden by a `temp_delta` slice
    /// covering `t` if one exists.
    ///
    /// When more than one delta covers `t` -- which should not happen for
    /// well-formed data but is not rejected by `add_timeslice` across
    /// differing interpretations -- the slice with the latest `modified`
    /// timestamp wins.
    pub fn at(&self, t: i64) -> Option<&TimeSlice> {
        let mut best: Option<&TimeSlice> = None;
        for slice in &self.slices {
            if !slice.header.validity.contains(t) {
                continue;
            }
            let better = match best {
                None => true,
                Some(current) => slice.header.modified > current.header.modified,
            };
            if better {
                best = Some(slice);
            }
        }
        best
    }

    /// The most recently modified slice regardless of validity, used by
    /// geometry resolution where only one slice's data realistically
    /// changes over an object's lifetime (e.g. a navaid's coordinate).
    pub fn latest_body(&self) -> Option<&Body> {
        self.slices
            .iter()
            .max_by_key(|slice| slice.header.modified)
            .map(|slice| &slice.body)
    }

    pub fn as_airspace(&self) -> Option<&crate::model::Airspace> {
        match self.latest_body()? {
            Body::Airspace(airspace) => Some(airspace),
            _ => None,
        }
    }

    /// The coordinate of this object, if it is any point-like variant.
    /// Used to resolve airspace polygon vertex back-references.
    pub fn point_coordinate(&self) -> Option<Point> {
        match self.latest_body()? {
            Body::Airport(a) => Some(a.common.coordinate),
            Body::Navaid(n) => Some(n.common.coordinate),
            Body::DesignatedPoint(d) => Some(d.common.coordinate),
            Body::AirportCollocation(c) => Some(c.common.coordinate),
            _ => None,
        }
    }

    pub fn baseline_header(&self) -> Option<&SliceHeader> {
        self.slices
            .iter()
            .find(|slice| slice.header.interpretation == Interpretation::Baseline)
            .map(|slice| &slice.header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Airport, Body, PointCommon};
    use crate::time::Validity;

    fn airport_slice(start: i64, end: i64, modified: i64) -> TimeSlice {
        TimeSlice::new(
            SliceHeader::baseline(Validity::new(start, end), modified),
            Body::Airport(Airport {
                common: PointCommon::new("LSZH", "Zurich", Point::new(47.45, 8.55)),
            }),
        )
    }

    #[test]
    fn add_timeslice_keeps_validity_sorted() {
        let mut obj = Object::new(Uuid::new_random(), VariantKind::Airport);
        obj.add_timeslice(airport_slice(100, 200, 1)).unwrap();
        obj.add_timeslice(airport_slice(0, 100, 1)).unwrap();
        assert_eq!(obj.slices()[0].header.validity.start_time, 0);
        assert_eq!(obj.slices()[1].header.validity.start_time, 100);
    }

    #[test]
    fn add_timeslice_rejects_overlap_within_interpretation() {
        let mut obj = Object::new(Uuid::new_random(), VariantKind::Airport);
        obj.add_timeslice(airport_slice(0, 100, 1)).unwrap();
        assert!(obj.add_timeslice(airport_slice(50, 150, 1)).is_err());
    }

    #[test]
    fn at_returns_none_outside_all_validity() {
        let mut obj = Object::new(Uuid::new_random(), VariantKind::Airport);
        obj.add_timeslice(airport_slice(0, 100, 1)).unwrap();
        assert!(obj.at(150).is_none());
        assert!(obj.at(50).is_some());
    }

    #[test]
    fn at_prefers_latest_modified_among_overlapping_interpretations() {
        let mut obj = Object::new(Uuid::new_random(), VariantKind::Airport);
        obj.add_timeslice(airport_slice(0, 1000, 1)).unwrap();
        let mut temp = airport_slice(100, 200, 5);
        temp.header.interpretation = Interpretation::TempDelta;
        obj.add_timeslice(temp).unwrap();
        let at150 = obj.at(150).unwrap();
        assert_eq!(at150.header.modified, 5);
        let at50 = obj.at(50).unwrap();
        assert_eq!(at50.header.modified, 1);
    }
}
