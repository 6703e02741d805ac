// SPDX-License-Identifier: Apache-2.0
// Copyright 2024, 2026 Joe Pearson

//! The time-slice model.

mod timetable;

pub use timetable::{HolidayCalendar, SpecialDay, TermOp, TimePattern, TimeTable, TimeTableElement};

use serde::{Deserialize, Serialize};

/// The composition kind of a time-slice.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum Interpretation {
    /// The full state for its interval.
    #[default]
    Baseline,
    /// Overrides selected fields of the baseline for a narrower, permanent
    /// interval.
    PermDelta,
    /// Overrides selected fields of the baseline for a narrower, temporary
    /// interval (e.g. a NOTAM-driven change).
    TempDelta,
}

/// A half-open validity interval `[start, end)` in UTC seconds.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct Validity {
    pub start_time: i64,
    pub end_time: i64,
}

impl Validity {
    pub fn new(start_time: i64, end_time: i64) -> Self {
        Self {
            start_time,
            end_time,
        }
    }

    pub const UNBOUNDED: Self = Self {
        start_time: i64::MIN,
        end_time: i64::MAX,
    };

    pub fn contains(&self, t: i64) -> bool {
        t >= self.start_time && t < self.end_time
    }

    pub fn overlaps(&self, other: &Validity) -> bool {
        self.start_time < other.end_time && other.start_time < self.end_time
    }
}

/// The header shared by every time-slice, regardless of variant.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct SliceHeader {
    pub validity: Validity,
    pub modified: i64,
    pub interpretation: Interpretation,
}

impl SliceHeader {
    pub fn new(validity: Validity, modified: i64, interpretation: Interpretation) -> Self {
        Self {
            validity,
            modified,
            interpretation,
        }
    }

    pub fn baseline(validity: Validity, modified: i64) -> Self {
        Self::new(validity, modified, Interpretation::Baseline)
    }
}
