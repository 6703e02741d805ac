// SPDX-License-Identifier: Apache-2.0
// Copyright 2024, 2026 Joe Pearson

//! Restriction activation schedules.

use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc, Weekday};

use serde::{Deserialize, Serialize};

/// A special-day pattern beyond plain weekday masks.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum SpecialDay {
    /// A public holiday.
    Holiday,
    /// The day after a public holiday.
    AfterHoliday,
    /// The day before a public holiday.
    BeforeHoliday,
    /// A Friday falling in a known busy period.
    BusyFriday,
}

/// A calendar used to resolve [`SpecialDay`] membership for a given date.
///
/// Determining actual public holidays is region-specific and out of scope
/// for the core; callers supply the calendar. A `()` calendar
/// that answers `false` to everything is provided for contexts with no such
/// data.
pub trait HolidayCalendar {
    fn is_special(&self, date: NaiveDate, day: SpecialDay) -> bool;
}

impl HolidayCalendar for () {
    fn is_special(&self, _date: NaiveDate, _day: SpecialDay) -> bool {
        false
    }
}

/// A weekday mask plus start/end minute-of-day, or a special-day pattern.
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
pub enum TimePattern {
    /// Applies on the given weekdays between `start_min` and `end_min`
    /// (minutes after midnight, end exclusive).
    Weekly {
        weekdays: [bool; 7],
        start_min: u16,
        end_min: u16,
    },
    /// Applies on days matching a [`SpecialDay`] classification.
    Special(SpecialDay),
}

impl TimePattern {
    pub fn matches(&self, at: DateTime<Utc>, calendar: &dyn HolidayCalendar) -> bool {
        match self {
            Self::Weekly {
                weekdays,
                start_min,
                end_min,
            } => {
                let idx = weekday_index(at.weekday());
                if !weekdays[idx] {
                    return false;
                }
                let minute_of_day = (at.time().num_seconds_from_midnight() / 60) as u16;
                minute_of_day >= *start_min && minute_of_day < *end_min
            }
            Self::Special(day) => calendar.is_special(at.date_naive(), *day),
        }
    }
}

fn weekday_index(w: Weekday) -> usize {
    match w {
        Weekday::Sun => 0,
        Weekday::Mon => 1,
        Weekday::Tue => 2,
        Weekday::Wed => 3,
        Weekday::Thu => 4,
        Weekday::Fri => 5,
        Weekday::Sat => 6,
    }
}

/// Whether a [`TimePattern`] term adds to or subtracts from a
/// [`TimeTableElement`]'s activation window.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum TermOp {
    Add,
    Subtract,
}

/// One date-bounded element of a [`TimeTable`]: a date interval plus an
/// optional sum-of-products of [`TimePattern`]s.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct TimeTableElement {
    pub from: NaiveDate,
    pub until: NaiveDate,
    pub terms: Vec<(TermOp, TimePattern)>,
    pub exclude: bool,
}

impl TimeTableElement {
    pub fn always(from: NaiveDate, until: NaiveDate) -> Self {
        Self {
            from,
            until,
            terms: Vec::new(),
            exclude: false,
        }
    }

    fn matches(&self, at: DateTime<Utc>, calendar: &dyn HolidayCalendar) -> bool {
        let date = at.date_naive();
        if date < self.from || date > self.until {
            return false;
        }

        let result = if self.terms.is_empty() {
            true
        } else {
            let mut active = false;
            for (op, pattern) in &self.terms {
                let hit = pattern.matches(at, calendar);
                match op {
                    TermOp::Add => active = active || hit,
                    TermOp::Subtract => active = active && !hit,
                }
            }
            active
        };

        result != self.exclude
    }
}

/// A disjunction of [`TimeTableElement`]s.
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct TimeTable {
    elements: Vec<TimeTableElement>,
}

impl TimeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, element: TimeTableElement) {
        self.elements.push(element);
    }

    pub fn elements(&self) -> &[TimeTableElement] {
        &self.elements
    }

    pub fn contains(&self, at: DateTime<Utc>, calendar: &dyn HolidayCalendar) -> bool {
        self.elements.iter().any(|e| e.matches(at, calendar))
    }

    /// True if no element of the table can ever match.
    pub fn is_never(&self) -> bool {
        self.elements.is_empty() || self.elements.iter().all(|e| e.from > e.until)
    }

    /// True if the table matches every instant (a single element spanning
    /// `[MIN, MAX]` with no patterns and no exclusion).
    pub fn is_always(&self) -> bool {
        self.elements
            .iter()
            .any(|e| e.terms.is_empty() && !e.exclude && e.from <= NaiveDate::MIN && e.until >= NaiveDate::MAX)
    }

    /// Reduces the table against a target evaluation interval, dropping
    /// elements entirely outside it.
    pub fn simplify(&self, from: NaiveDate, until: NaiveDate) -> TimeTable {
        let elements = self
            .elements
            .iter()
            .filter(|e| e.from <= until && e.until >= from)
            .cloned()
            .collect();
        TimeTable { elements }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn always_true_table_matches_any_instant() {
        let mut table = TimeTable::new();
        table.push(TimeTableElement::always(NaiveDate::MIN, NaiveDate::MAX));
        assert!(table.is_always());
        assert!(table.contains(at(2026, 7, 30, 10, 0), &()));
    }

    #[test]
    fn empty_table_is_never() {
        let table = TimeTable::new();
        assert!(table.is_never());
        assert!(!table.contains(at(2026, 7, 30, 10, 0), &()));
    }

    #[test]
    fn weekday_window_matches_only_inside_hours() {
        let mut table = TimeTable::new();
        let mut element = TimeTableElement::always(NaiveDate::MIN, NaiveDate::MAX);
        let mut weekdays = [false; 7];
        weekdays[4] = true; // Thursday
        element.terms.push((
            TermOp::Add,
            TimePattern::Weekly {
                weekdays,
                start_min: 8 * 60,
                end_min: 18 * 60,
            },
        ));
        table.push(element);

        // 2026-07-30 is a Thursday.
        assert!(table.contains(at(2026, 7, 30, 10, 0), &()));
        assert!(!table.contains(at(2026, 7, 30, 20, 0), &()));
        assert!(!table.contains(at(2026, 7, 31, 10, 0), &()));
    }

    #[test]
    fn simplify_drops_elements_outside_interval() {
        let mut table = TimeTable::new();
        table.push(TimeTableElement::always(
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2020, 12, 31).unwrap(),
        ));
        table.push(TimeTableElement::always(
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 12, 31).unwrap(),
        ));

        let simplified = table.simplify(
            NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
        );
        assert_eq!(simplified.elements().len(), 1);
    }

    #[test]
    fn simplify_preserves_membership_within_interval() {
        let mut table = TimeTable::new();
        let mut element = TimeTableElement::always(
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 12, 31).unwrap(),
        );
        let mut weekdays = [true; 7];
        weekdays[0] = false; // everything but Sunday
        element.terms.push((
            TermOp::Add,
            TimePattern::Weekly {
                weekdays,
                start_min: 0,
                end_min: 24 * 60,
            },
        ));
        table.push(element);

        let from = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();
        let until = NaiveDate::from_ymd_opt(2026, 7, 31).unwrap();
        let simplified = table.simplify(from, until);

        let mut day = from;
        while day <= until {
            let at_noon = day.and_hms_opt(12, 0, 0).unwrap().and_utc();
            assert_eq!(
                table.contains(at_noon, &()),
                simplified.contains(at_noon, &())
            );
            day = day.succ_opt().unwrap();
        }
    }
}
