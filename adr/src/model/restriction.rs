// SPDX-License-Identifier: Apache-2.0
// Copyright 2024, 2026 Joe Pearson

//! Restriction elements, the condition tree and `flight_restriction` itself.

use serde::{Deserialize, Serialize};

use crate::geom::AltRange;
use crate::id::Link;
use crate::time::TimeTable;

/// Whether a SID/STAR restriction element concerns a departure or arrival
/// procedure.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum ArrDep {
    Departure,
    Arrival,
}

/// One element of a restriction's allowed-route alternative.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub enum RestrictionElement {
    Point { point: Link, alt_range: AltRange },
    Airspace { airspace: Link, alt_range: AltRange },
    SidOrStar { procedure: Link, arr_dep: ArrDep, alt_range: AltRange },
    RouteSegment {
        start: Link,
        end: Link,
        route: Link,
        alt_range: AltRange,
    },
}

/// Aircraft category used by the `Aircraft` condition leaf.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum AircraftKind {
    Any,
    Landplane,
    Helicopter,
    Glider,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum EngineKind {
    Any,
    Jet,
    Turboprop,
    Piston,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum VerticalSepCapability {
    Any,
    Rvsm,
    NonRvsm,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum CivOrMil {
    Either,
    Civil,
    Military,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum FlightPurpose {
    Any,
    Scheduled,
    NonScheduled,
    General,
}

/// A tagged condition-tree expression node.
///
/// Leaf variants carry a `reference_location` bit marking whether the
/// matched location is the rule's anchor.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub enum Condition {
    CrossingAirspace1 {
        airspace: Link,
        alt_range: AltRange,
        reference_location: bool,
    },
    /// A border crossing: the plan must cross from `a`'s airspace into
    /// `b`'s (or vice-versa).
    CrossingAirspace2 {
        a: Link,
        b: Link,
        alt_range: AltRange,
        reference_location: bool,
    },
    CrossingPoint {
        point: Link,
        alt_range: AltRange,
        reference_location: bool,
    },
    CrossingSidOrStar {
        procedure: Link,
        arr_dep: ArrDep,
        reference_location: bool,
    },
    CrossingDct {
        alt_range: AltRange,
    },
    CrossingAirway {
        route: Link,
        alt_range: AltRange,
        reference_location: bool,
    },
    CrossingAirwayAvailable {
        route: Link,
    },
    DctLimit {
        nmi: f64,
    },
    Aircraft {
        icao_type: Option<String>,
        engine_count: Option<u8>,
        kind: AircraftKind,
        engine_kind: EngineKind,
        nav_spec: Vec<String>,
        vertical_sep: VerticalSepCapability,
    },
    Flight {
        civ_or_mil: CivOrMil,
        purpose: FlightPurpose,
    },
    DepArrPoint {
        point: Link,
        is_departure: bool,
    },
    DepArrAirspace {
        airspace: Link,
        is_departure: bool,
    },
    CrossingAirspaceActive {
        airspace: Link,
    },
    Constant(bool),

    /// `children[i]` is logically negated when `invert_children[i]` is set;
    /// the overall result is negated again when `invert_final` is set. OR is
    /// encoded as AND with every child and the final result inverted;
    /// AND-NOT as AND with one child inverted.
    And {
        children: Vec<Condition>,
        invert_children: Vec<bool>,
        invert_final: bool,
    },

    /// Children must match in order, with no interleaving matches of the
    /// same rule's elements.
    Sequence { children: Vec<Condition> },
}

impl Condition {
    pub fn or(children: Vec<Condition>) -> Self {
        let n = children.len();
        Self::And {
            children,
            invert_children: vec![true; n],
            invert_final: true,
        }
    }

    pub fn and(children: Vec<Condition>) -> Self {
        let n = children.len();
        Self::And {
            children,
            invert_children: vec![false; n],
            invert_final: false,
        }
    }
}

/// The four kinds a flight restriction can fire as.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum RestrictionKind {
    Mandatory,
    Forbidden,
    Closed,
    Allowed,
}

/// Classifies which legacy processing path produced the restriction.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum ProcessingIndicator {
    Tfr,
    RadDct,
    FraDct,
    Fpr,
    AdCp,
    AdFlightRule,
    FlightProperty,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct FlightRestriction {
    pub ident: String,
    pub kind: RestrictionKind,
    pub processing_indicator: ProcessingIndicator,
    pub enabled: bool,
    pub trace: bool,
    pub condition: Condition,
    /// Alternative routes; for `mandatory` restrictions at least one must
    /// also match for the rule to be satisfied, for `allowed` restrictions
    /// these are informational only.
    pub alternatives: Vec<Vec<RestrictionElement>>,
    pub timetable: TimeTable,
}

impl FlightRestriction {
    pub fn new(ident: impl Into<String>, kind: RestrictionKind, condition: Condition) -> Self {
        Self {
            ident: ident.into(),
            kind,
            processing_indicator: ProcessingIndicator::FlightProperty,
            enabled: true,
            trace: false,
            condition,
            alternatives: Vec::new(),
            timetable: TimeTable::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn or_of_constants_inverts_and_of_inverted_children() {
        let cond = Condition::or(vec![Condition::Constant(false), Condition::Constant(false)]);
        match cond {
            Condition::And {
                invert_final,
                invert_children,
                ..
            } => {
                assert!(invert_final);
                assert!(invert_children.iter().all(|&b| b));
            }
            _ => panic!("expected And"),
        }
    }
}
