// SPDX-License-Identifier: Apache-2.0
// Copyright 2024, 2026 Joe Pearson

//! Route, procedure and level-table time-slice variants.

use serde::{Deserialize, Serialize};

use crate::geom::AltRange;
use crate::id::Link;
use crate::time::TimeTable;

/// A published route (airway).
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Route {
    pub ident: String,
}

/// Direction a [`Availability`] entry is open in.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub struct Direction {
    pub forward: bool,
    pub backward: bool,
}

impl Direction {
    pub const BOTH: Self = Self {
        forward: true,
        backward: true,
    };
}

/// Whether a segment is usable at all, or conditionally.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum SegmentStatus {
    Open,
    Closed,
    Conditional,
}

/// Conditional Route activation class.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum CdrClass {
    /// Permanently available, not a CDR.
    None,
    One,
    Two,
    Three,
}

/// A per-altitude-level availability entry of a [`RouteSegment`].
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Availability {
    pub status: SegmentStatus,
    pub direction: Direction,
    pub alt_range: AltRange,
    pub discrete_levels: Option<Link>,
    pub cdr_class: CdrClass,
    pub timetable: TimeTable,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct RouteSegment {
    pub start: Link,
    pub end: Link,
    pub route: Link,
    pub alt_range: AltRange,
    pub availability: Vec<Availability>,
}

impl RouteSegment {
    /// The availability entries that are open for `alt_ft` at evaluation
    /// time `at`.
    pub fn open_at(
        &self,
        alt_ft: i32,
        now: chrono::DateTime<chrono::Utc>,
        calendar: &dyn crate::time::HolidayCalendar,
    ) -> bool {
        self.availability.iter().any(|a| {
            a.status != SegmentStatus::Closed
                && a.alt_range.contains(alt_ft, (0, i32::MAX))
                && a.timetable.contains(now, calendar)
        })
    }
}

/// A standard level table row: a named series of discrete flight levels.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct StandardLevelTable {
    pub ident: String,
}

/// One column (direction band) of a [`StandardLevelTable`].
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct StandardLevelColumn {
    pub table: Link,
    pub direction: Direction,
    pub levels_ft: Vec<i32>,
}

/// Standard Instrument Departure.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Sid {
    pub ident: String,
    pub airport: Link,
}

/// Standard Terminal Arrival Route.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Star {
    pub ident: String,
    pub airport: Link,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct DepartureLeg {
    pub sid: Link,
    pub sequence: u16,
    pub fix: Link,
    pub alt_range: AltRange,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct ArrivalLeg {
    pub star: Link,
    pub sequence: u16,
    pub fix: Link,
    pub alt_range: AltRange,
}
