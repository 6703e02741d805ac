// SPDX-License-Identifier: Apache-2.0
// Copyright 2024, 2026 Joe Pearson

//! Polymorphic time-slice variant bodies.
//!
//! Every persistent record is represented as a tagged sum of variants over
//! a shared [`SliceHeader`](crate::time::SliceHeader) rather than runtime
//! polymorphism: dispatch is an
//! exhaustive match on [`VariantKind`], which removes a heap allocation per
//! slice and makes the archive layout correspond directly to the in-memory
//! layout.

mod airspace;
mod misc;
mod point;
mod restriction;
mod route;

pub use airspace::{Airspace, Component, ComponentGeometry, ComponentOperator, AirspaceType};
pub use misc::{AirTrafficManagementService, AtsKind, OrganisationAuthority, SpecialDate, Unit};
pub use point::{
    AirportCollocation, Airport, AngleIndication, DesignatedPoint, DistanceIndication, Navaid,
    NavaidKind, PointCommon, PointFlags,
};
pub use restriction::{
    AircraftKind, ArrDep, CivOrMil, Condition, EngineKind, FlightPurpose, FlightRestriction,
    ProcessingIndicator, RestrictionElement, RestrictionKind, VerticalSepCapability,
};
pub use route::{
    ArrivalLeg, Availability, CdrClass, DepartureLeg, Direction, Route, RouteSegment,
    SegmentStatus, Sid, Star, StandardLevelColumn, StandardLevelTable,
};

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::id::Link;
use crate::recompute::RecomputeContext;
use crate::store::ObjectStore;
use crate::time::SliceHeader;

/// The variant tag a [`TimeSlice`] carries.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum VariantKind {
    Airport,
    AirportCollocation,
    DesignatedPoint,
    Navaid,
    AngleIndication,
    DistanceIndication,
    Airspace,
    StandardLevelTable,
    StandardLevelColumn,
    Route,
    RouteSegment,
    Sid,
    Star,
    DepartureLeg,
    ArrivalLeg,
    OrganisationAuthority,
    SpecialDate,
    Unit,
    AirTrafficManagementService,
    FlightRestriction,
}

/// The variant-specific payload of a [`TimeSlice`].
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub enum Body {
    Airport(Airport),
    AirportCollocation(AirportCollocation),
    DesignatedPoint(DesignatedPoint),
    Navaid(Navaid),
    AngleIndication(AngleIndication),
    DistanceIndication(DistanceIndication),
    Airspace(Box<Airspace>),
    StandardLevelTable(StandardLevelTable),
    StandardLevelColumn(StandardLevelColumn),
    Route(Route),
    RouteSegment(Box<RouteSegment>),
    Sid(Sid),
    Star(Star),
    DepartureLeg(DepartureLeg),
    ArrivalLeg(ArrivalLeg),
    OrganisationAuthority(OrganisationAuthority),
    SpecialDate(SpecialDate),
    Unit(Unit),
    AirTrafficManagementService(AirTrafficManagementService),
    FlightRestriction(Box<FlightRestriction>),
}

impl Body {
    pub fn kind(&self) -> VariantKind {
        match self {
            Self::Airport(_) => VariantKind::Airport,
            Self::AirportCollocation(_) => VariantKind::AirportCollocation,
            Self::DesignatedPoint(_) => VariantKind::DesignatedPoint,
            Self::Navaid(_) => VariantKind::Navaid,
            Self::AngleIndication(_) => VariantKind::AngleIndication,
            Self::DistanceIndication(_) => VariantKind::DistanceIndication,
            Self::Airspace(_) => VariantKind::Airspace,
            Self::StandardLevelTable(_) => VariantKind::StandardLevelTable,
            Self::StandardLevelColumn(_) => VariantKind::StandardLevelColumn,
            Self::Route(_) => VariantKind::Route,
            Self::RouteSegment(_) => VariantKind::RouteSegment,
            Self::Sid(_) => VariantKind::Sid,
            Self::Star(_) => VariantKind::Star,
            Self::DepartureLeg(_) => VariantKind::DepartureLeg,
            Self::ArrivalLeg(_) => VariantKind::ArrivalLeg,
            Self::OrganisationAuthority(_) => VariantKind::OrganisationAuthority,
            Self::SpecialDate(_) => VariantKind::SpecialDate,
            Self::Unit(_) => VariantKind::Unit,
            Self::AirTrafficManagementService(_) => VariantKind::AirTrafficManagementService,
            Self::FlightRestriction(_) => VariantKind::FlightRestriction,
        }
    }

    /// Resolves every [`Link`] reachable from this body through `store`,
    /// and the polygon vertex back-references of an `airspace`'s
    /// geometry. A no-op for variants with no resolved data.
    pub fn link(&mut self, store: &ObjectStore, depth: u32) -> Result<(), Error> {
        const MAX_DEPTH: u32 = 8;
        if depth > MAX_DEPTH {
            return Ok(());
        }
        match self {
            Self::Airspace(airspace) => airspace.link(store, depth),
            Self::RouteSegment(segment) => link_segment(segment, store),
            Self::AirportCollocation(collocation) => {
                collocation.host_airport.load(store)?;
                Ok(())
            }
            Self::FlightRestriction(restriction) => link_restriction(restriction, store),
            Self::Sid(sid) => {
                let mut link = sid.airport.clone();
                link.load(store)?;
                sid.airport = link;
                Ok(())
            }
            Self::Star(star) => {
                let mut link = star.airport.clone();
                link.load(store)?;
                star.airport = link;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Derives geometry, altitude bands, elevations and other computed
    /// fields. A no-op for variants with no derived data.
    pub fn recompute(&mut self, ctx: &RecomputeContext) -> Result<(), Error> {
        match self {
            Self::Airspace(airspace) => airspace.recompute(ctx),
            Self::Airport(airport) => {
                if let Some(elev) = ctx.terrain.elevation_ft(airport.common.coordinate) {
                    airport.common.elevation_ft = elev;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

fn link_segment(segment: &mut RouteSegment, store: &ObjectStore) -> Result<(), Error> {
    segment.start.load(store)?;
    segment.end.load(store)?;
    segment.route.load(store)?;
    for avail in &mut segment.availability {
        if let Some(levels) = &mut avail.discrete_levels {
            levels.load(store)?;
        }
    }
    Ok(())
}

fn link_restriction(restriction: &mut FlightRestriction, store: &ObjectStore) -> Result<(), Error> {
    link_condition(&mut restriction.condition, store)?;
    for alternative in &mut restriction.alternatives {
        for element in alternative {
            link_restriction_element(element, store)?;
        }
    }
    Ok(())
}

fn link_restriction_element(element: &mut RestrictionElement, store: &ObjectStore) -> Result<(), Error> {
    match element {
        RestrictionElement::Point { point, .. } => {
            point.load(store)?;
        }
        RestrictionElement::Airspace { airspace, .. } => {
            airspace.load(store)?;
        }
        RestrictionElement::SidOrStar { procedure, .. } => {
            procedure.load(store)?;
        }
        RestrictionElement::RouteSegment { start, end, route, .. } => {
            start.load(store)?;
            end.load(store)?;
            route.load(store)?;
        }
    }
    Ok(())
}

fn link_condition(condition: &mut Condition, store: &ObjectStore) -> Result<(), Error> {
    match condition {
        Condition::CrossingAirspace1 { airspace, .. } => {
            airspace.load(store)?;
        }
        Condition::CrossingAirspace2 { a, b, .. } => {
            a.load(store)?;
            b.load(store)?;
        }
        Condition::CrossingPoint { point, .. } => {
            point.load(store)?;
        }
        Condition::CrossingSidOrStar { procedure, .. } => {
            procedure.load(store)?;
        }
        Condition::CrossingAirway { route, .. } | Condition::CrossingAirwayAvailable { route } => {
            route.load(store)?;
        }
        Condition::DepArrPoint { point, .. } => {
            point.load(store)?;
        }
        Condition::DepArrAirspace { airspace, .. } | Condition::CrossingAirspaceActive { airspace } => {
            airspace.load(store)?;
        }
        Condition::And { children, .. } => {
            for child in children {
                link_condition(child, store)?;
            }
        }
        Condition::Sequence { children } => {
            for child in children {
                link_condition(child, store)?;
            }
        }
        Condition::CrossingDct { .. } | Condition::DctLimit { .. } | Condition::Aircraft { .. }
        | Condition::Flight { .. } | Condition::Constant(_) => {}
    }
    Ok(())
}

/// One temporally-bounded version of an object's state.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct TimeSlice {
    pub header: SliceHeader,
    pub body: Body,
}

impl TimeSlice {
    pub fn new(header: SliceHeader, body: Body) -> Self {
        Self { header, body }
    }

    pub fn kind(&self) -> VariantKind {
        self.body.kind()
    }
}

/// Returns the UUIDs this time-slice's body references through `Link`s,
/// used to build the recompute dependency graph.
pub fn dependencies(body: &Body) -> Vec<crate::id::Uuid> {
    let mut out = Vec::new();
    let push = |out: &mut Vec<crate::id::Uuid>, link: &Link| {
        if !link.is_nil() {
            out.push(link.uuid());
        }
    };

    match body {
        Body::AirportCollocation(c) => push(&mut out, &c.host_airport),
        Body::Airspace(airspace) => {
            for component in &airspace.components {
                if let ComponentGeometry::Contributor(link) = &component.geometry {
                    push(&mut out, link);
                }
            }
        }
        Body::RouteSegment(segment) => {
            push(&mut out, &segment.start);
            push(&mut out, &segment.end);
            push(&mut out, &segment.route);
        }
        Body::Sid(sid) => push(&mut out, &sid.airport),
        Body::Star(star) => push(&mut out, &star.airport),
        Body::DepartureLeg(leg) => {
            push(&mut out, &leg.sid);
            push(&mut out, &leg.fix);
        }
        Body::ArrivalLeg(leg) => {
            push(&mut out, &leg.star);
            push(&mut out, &leg.fix);
        }
        Body::Unit(unit) => push(&mut out, &unit.authority),
        Body::AirTrafficManagementService(service) => push(&mut out, &service.unit),
        Body::FlightRestriction(restriction) => {
            condition_dependencies(&restriction.condition, &mut out);
            for alt in &restriction.alternatives {
                for element in alt {
                    match element {
                        RestrictionElement::Point { point, .. } => push(&mut out, point),
                        RestrictionElement::Airspace { airspace, .. } => push(&mut out, airspace),
                        RestrictionElement::SidOrStar { procedure, .. } => push(&mut out, procedure),
                        RestrictionElement::RouteSegment { start, end, route, .. } => {
                            push(&mut out, start);
                            push(&mut out, end);
                            push(&mut out, route);
                        }
                    }
                }
            }
        }
        _ => {}
    }

    out
}

fn condition_dependencies(condition: &Condition, out: &mut Vec<crate::id::Uuid>) {
    let push = |out: &mut Vec<crate::id::Uuid>, link: &Link| {
        if !link.is_nil() {
            out.push(link.uuid());
        }
    };
    match condition {
        Condition::CrossingAirspace1 { airspace, .. } => push(out, airspace),
        Condition::CrossingAirspace2 { a, b, .. } => {
            push(out, a);
            push(out, b);
        }
        Condition::CrossingPoint { point, .. } => push(out, point),
        Condition::CrossingSidOrStar { procedure, .. } => push(out, procedure),
        Condition::CrossingAirway { route, .. } | Condition::CrossingAirwayAvailable { route } => {
            push(out, route)
        }
        Condition::DepArrPoint { point, .. } => push(out, point),
        Condition::DepArrAirspace { airspace, .. } | Condition::CrossingAirspaceActive { airspace } => {
            push(out, airspace)
        }
        Condition::And { children, .. } | Condition::Sequence { children } => {
            for child in children {
                condition_dependencies(child, out);
            }
        }
        Condition::CrossingDct { .. } | Condition::DctLimit { .. } | Condition::Aircraft { .. }
        | Condition::Flight { .. } | Condition::Constant(_) => {}
    }
}
