// SPDX-License-Identifier: Apache-2.0
// Copyright 2024, 2026 Joe Pearson

//! Matching a restriction's [`Condition`] tree against a resolved
//! [`super::evaluator::Plan`].
//!
//! Every leaf reports not just whether it matched but *which* plan vertices
//! and edges made it match, so a caller can highlight the offending leg
//! rather than just naming the rule. `And`/`Sequence` fold their children's
//! matched sets together; `Or` is expressed as `And` with every child (and
//! the final result) inverted, the usual De Morgan encoding, which is why
//! there is no separate `Or` arm here.

use std::collections::BTreeSet;

use crate::geom::Rect;
use crate::id::Uuid;
use crate::model::{CivOrMil, Condition, RestrictionElement};
use crate::time::Validity;

use super::evaluator::Plan;
use super::resolver::FlightRules;

/// The result of matching one [`Condition`] against a [`Plan`].
#[derive(Clone, Debug, Default)]
pub struct ConditionMatch {
    pub matched: bool,
    pub vertices: BTreeSet<usize>,
    pub edges: BTreeSet<usize>,
}

impl ConditionMatch {
    fn constant(matched: bool) -> Self {
        Self {
            matched,
            vertices: BTreeSet::new(),
            edges: BTreeSet::new(),
        }
    }
}

const UNBOUNDED_ENVELOPE: (i32, i32) = (i32::MIN, i32::MAX);

/// Evaluates `condition` against `plan`, returning both the boolean result
/// and the vertices/edges that produced it.
pub fn evaluate_condition(condition: &Condition, plan: &Plan) -> ConditionMatch {
    match condition {
        Condition::Constant(value) => ConditionMatch::constant(*value),

        Condition::CrossingPoint { point, alt_range, .. } => {
            let vertices: BTreeSet<usize> = plan
                .vertices
                .iter()
                .enumerate()
                .filter(|(_, v)| v.point_object == point.uuid() && alt_range.contains(v.altitude_ft, UNBOUNDED_ENVELOPE))
                .map(|(i, _)| i)
                .collect();
            ConditionMatch {
                matched: !vertices.is_empty(),
                vertices,
                edges: BTreeSet::new(),
            }
        }

        Condition::CrossingAirspace1 { airspace, alt_range, .. } => {
            let vertices: BTreeSet<usize> = plan
                .vertices
                .iter()
                .enumerate()
                .filter(|(_, v)| {
                    v.airspaces.contains(&airspace.uuid()) && alt_range.contains(v.altitude_ft, UNBOUNDED_ENVELOPE)
                })
                .map(|(i, _)| i)
                .collect();
            ConditionMatch {
                matched: !vertices.is_empty(),
                vertices,
                edges: BTreeSet::new(),
            }
        }

        Condition::CrossingAirspaceActive { airspace } => {
            let vertices: BTreeSet<usize> = plan
                .vertices
                .iter()
                .enumerate()
                .filter(|(_, v)| v.airspaces.contains(&airspace.uuid()))
                .map(|(i, _)| i)
                .collect();
            ConditionMatch {
                matched: !vertices.is_empty(),
                vertices,
                edges: BTreeSet::new(),
            }
        }

        Condition::CrossingAirspace2 { a, b, alt_range, .. } => {
            let mut vertices = BTreeSet::new();
            let mut edges = BTreeSet::new();
            for (idx, edge) in plan.edges.iter().enumerate() {
                let from = &plan.vertices[edge.from];
                let to = &plan.vertices[edge.to];
                let from_a = from.airspaces.contains(&a.uuid());
                let from_b = from.airspaces.contains(&b.uuid());
                let to_a = to.airspaces.contains(&a.uuid());
                let to_b = to.airspaces.contains(&b.uuid());
                let crosses = (from_a && !from_b && to_b && !to_a) || (from_b && !from_a && to_a && !to_b);
                if crosses && alt_range.contains(to.altitude_ft, UNBOUNDED_ENVELOPE) {
                    vertices.insert(edge.from);
                    vertices.insert(edge.to);
                    edges.insert(idx);
                }
            }
            ConditionMatch {
                matched: !edges.is_empty(),
                vertices,
                edges,
            }
        }

        Condition::CrossingSidOrStar { procedure, .. } => {
            let vertices: BTreeSet<usize> = plan
                .vertices
                .iter()
                .enumerate()
                .filter(|(_, v)| v.procedure == Some(procedure.uuid()))
                .map(|(i, _)| i)
                .collect();
            ConditionMatch {
                matched: !vertices.is_empty(),
                vertices,
                edges: BTreeSet::new(),
            }
        }

        Condition::CrossingAirway { route, alt_range, .. } => {
            let mut vertices = BTreeSet::new();
            let mut edges = BTreeSet::new();
            for (idx, edge) in plan.edges.iter().enumerate() {
                if edge.airway == Some(route.uuid()) && alt_range.contains(plan.vertices[edge.to].altitude_ft, UNBOUNDED_ENVELOPE) {
                    vertices.insert(edge.from);
                    vertices.insert(edge.to);
                    edges.insert(idx);
                }
            }
            ConditionMatch {
                matched: !edges.is_empty(),
                vertices,
                edges,
            }
        }

        Condition::CrossingAirwayAvailable { route } => ConditionMatch::constant(plan.available_routes.contains(&route.uuid())),

        Condition::CrossingDct { alt_range } => {
            let mut vertices = BTreeSet::new();
            let mut edges = BTreeSet::new();
            for (idx, edge) in plan.edges.iter().enumerate() {
                if edge.airway.is_none() && alt_range.contains(plan.vertices[edge.to].altitude_ft, UNBOUNDED_ENVELOPE) {
                    vertices.insert(edge.from);
                    vertices.insert(edge.to);
                    edges.insert(idx);
                }
            }
            ConditionMatch {
                matched: !edges.is_empty(),
                vertices,
                edges,
            }
        }

        Condition::DctLimit { nmi } => {
            let mut vertices = BTreeSet::new();
            let mut edges = BTreeSet::new();
            for (idx, edge) in plan.edges.iter().enumerate() {
                if edge.airway.is_none() && edge.distance_nm > *nmi {
                    vertices.insert(edge.from);
                    vertices.insert(edge.to);
                    edges.insert(idx);
                }
            }
            ConditionMatch {
                matched: !edges.is_empty(),
                vertices,
                edges,
            }
        }

        Condition::DepArrPoint { point, is_departure } => {
            let idx = if *is_departure { 0 } else { plan.vertices.len().saturating_sub(1) };
            let matched = plan.vertices.get(idx).is_some_and(|v| v.point_object == point.uuid());
            let mut vertices = BTreeSet::new();
            if matched {
                vertices.insert(idx);
            }
            ConditionMatch {
                matched,
                vertices,
                edges: BTreeSet::new(),
            }
        }

        Condition::DepArrAirspace { airspace, is_departure } => {
            let idx = if *is_departure { 0 } else { plan.vertices.len().saturating_sub(1) };
            let matched = plan.vertices.get(idx).is_some_and(|v| v.airspaces.contains(&airspace.uuid()));
            let mut vertices = BTreeSet::new();
            if matched {
                vertices.insert(idx);
            }
            ConditionMatch {
                matched,
                vertices,
                edges: BTreeSet::new(),
            }
        }

        Condition::Aircraft { icao_type, nav_spec, .. } => {
            let mut matched = true;
            if let Some(expected) = icao_type {
                matched &= !plan.aircraft_type.is_empty() && expected.eq_ignore_ascii_case(&plan.aircraft_type);
            }
            if !nav_spec.is_empty() {
                matched &= nav_spec.iter().all(|spec| plan.pbn.iter().any(|p| p.eq_ignore_ascii_case(spec)));
            }
            ConditionMatch::constant(matched)
        }

        Condition::Flight { civ_or_mil, purpose } => {
            let mut matched = true;
            if *civ_or_mil != CivOrMil::Either {
                matched &= *civ_or_mil == plan.civ_or_mil;
            }
            if *purpose != crate::model::FlightPurpose::Any {
                matched &= *purpose == plan.purpose;
            }
            ConditionMatch::constant(matched)
        }

        Condition::And {
            children,
            invert_children,
            invert_final,
        } => {
            let mut vertices = BTreeSet::new();
            let mut edges = BTreeSet::new();
            let mut all_true = true;
            for (child, invert) in children.iter().zip(invert_children) {
                let cm = evaluate_condition(child, plan);
                let effective = cm.matched ^ invert;
                if effective {
                    vertices.extend(cm.vertices);
                    edges.extend(cm.edges);
                }
                all_true &= effective;
            }
            ConditionMatch {
                matched: all_true ^ invert_final,
                vertices,
                edges,
            }
        }

        Condition::Sequence { children } => {
            let mut vertices = BTreeSet::new();
            let mut edges = BTreeSet::new();
            let mut cursor: Option<usize> = None;
            let mut matched = true;
            for child in children {
                let cm = evaluate_condition(child, plan);
                let earliest = cm.vertices.iter().copied().min();
                let in_order = match (cursor, earliest) {
                    (None, Some(_)) => true,
                    (Some(after), Some(v)) => v > after,
                    _ => false,
                };
                if !cm.matched || !in_order {
                    matched = false;
                    break;
                }
                cursor = cm.vertices.iter().copied().max();
                vertices.extend(cm.vertices);
                edges.extend(cm.edges);
            }
            ConditionMatch { matched, vertices, edges }
        }
    }
}

/// Context a [`Condition`] tree can be statically reduced against before
/// evaluating it over any particular plan, so a rule set of thousands of
/// restrictions doesn't walk every leaf for every plan.
pub struct SimplifyContext {
    pub bbox: Rect,
    pub alt_range: crate::geom::AltRange,
    pub aircraft_type: Option<String>,
    pub pbn: Vec<String>,
    pub flight_rules: FlightRules,
    pub civ_or_mil: CivOrMil,
    pub dep: Uuid,
    pub dest: Uuid,
    pub time_range: Validity,
}

/// Folds the leaves `ctx` can decide outright into [`Condition::Constant`],
/// propagating the fold through `And`/`Sequence` so a whole subtree collapses
/// once every leaf beneath it has.
pub fn pre_simplify(condition: &Condition, ctx: &SimplifyContext) -> Condition {
    match condition {
        Condition::Aircraft { icao_type, nav_spec, .. } => {
            if let (Some(expected), Some(actual)) = (icao_type, &ctx.aircraft_type) {
                if !expected.eq_ignore_ascii_case(actual) {
                    return Condition::Constant(false);
                }
            }
            if !nav_spec.is_empty() && !nav_spec.iter().all(|s| ctx.pbn.iter().any(|p| p.eq_ignore_ascii_case(s))) {
                return Condition::Constant(false);
            }
            condition.clone()
        }

        Condition::Flight { civ_or_mil, .. } => {
            if *civ_or_mil != CivOrMil::Either && *civ_or_mil != ctx.civ_or_mil {
                Condition::Constant(false)
            } else {
                condition.clone()
            }
        }

        Condition::DepArrPoint { point, is_departure } => {
            let anchor = if *is_departure { ctx.dep } else { ctx.dest };
            if !point.uuid().is_nil() && point.uuid() != anchor {
                Condition::Constant(false)
            } else {
                condition.clone()
            }
        }

        Condition::CrossingAirspace1 { alt_range, .. }
        | Condition::CrossingPoint { alt_range, .. }
        | Condition::CrossingAirway { alt_range, .. }
        | Condition::CrossingDct { alt_range } => {
            if alt_range.is_disjoint(&ctx.alt_range) {
                Condition::Constant(false)
            } else {
                condition.clone()
            }
        }

        Condition::And {
            children,
            invert_children,
            invert_final,
        } => {
            let simplified: Vec<Condition> = children.iter().map(|c| pre_simplify(c, ctx)).collect();
            if simplified.iter().all(|c| matches!(c, Condition::Constant(_))) {
                let mut acc = true;
                for (child, invert) in simplified.iter().zip(invert_children) {
                    let Condition::Constant(value) = child else { unreachable!() };
                    acc &= value ^ invert;
                }
                Condition::Constant(acc ^ invert_final)
            } else {
                Condition::And {
                    children: simplified,
                    invert_children: invert_children.clone(),
                    invert_final: *invert_final,
                }
            }
        }

        Condition::Sequence { children } => {
            let simplified: Vec<Condition> = children.iter().map(|c| pre_simplify(c, ctx)).collect();
            if simplified.iter().any(|c| matches!(c, Condition::Constant(false))) {
                Condition::Constant(false)
            } else {
                Condition::Sequence { children: simplified }
            }
        }

        _ => condition.clone(),
    }
}

/// Keeps only the alternatives of a mandatory restriction that could
/// plausibly apply to `ctx`'s altitude range -- an alternative naming no
/// element overlapping it can never match.
pub fn prune_alternatives(
    alternatives: &[Vec<RestrictionElement>],
    ctx: &SimplifyContext,
) -> Vec<Vec<RestrictionElement>> {
    alternatives
        .iter()
        .filter(|alt| {
            alt.iter().any(|element| {
                let alt_range = match element {
                    RestrictionElement::Point { alt_range, .. }
                    | RestrictionElement::Airspace { alt_range, .. }
                    | RestrictionElement::SidOrStar { alt_range, .. }
                    | RestrictionElement::RouteSegment { alt_range, .. } => alt_range,
                };
                !alt_range.is_disjoint(&ctx.alt_range)
            })
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{AltLimit, AltMode, AltRange};
    use crate::id::Link;

    use super::super::evaluator::{Plan, PlanEdge, PlanVertex};

    fn plan_with_two_vertices(point_a: Uuid, point_b: Uuid, airspace: Uuid) -> Plan {
        Plan {
            vertices: vec![
                PlanVertex {
                    point_object: point_a,
                    coord: None,
                    altitude_ft: 5000,
                    airspaces: vec![],
                    procedure: None,
                },
                PlanVertex {
                    point_object: point_b,
                    coord: None,
                    altitude_ft: 5000,
                    airspaces: vec![airspace],
                    procedure: None,
                },
            ],
            edges: vec![PlanEdge {
                from: 0,
                to: 1,
                airway: None,
                alt_range: AltRange::new(AltLimit::new(AltMode::Std, 5000), AltLimit::new(AltMode::Std, 5000)),
                distance_nm: 42.0,
            }],
            departure_airport: point_a,
            arrival_airport: point_b,
            aircraft_type: "C172".into(),
            equipment: vec![],
            pbn: vec![],
            civ_or_mil: CivOrMil::Civil,
            purpose: crate::model::FlightPurpose::Any,
            available_routes: vec![],
        }
    }

    #[test]
    fn crossing_point_matches_by_uuid_and_altitude() {
        let a = Uuid::new_random();
        let b = Uuid::new_random();
        let plan = plan_with_two_vertices(a, b, Uuid::new_random());
        let condition = Condition::CrossingPoint {
            point: Link::new(b),
            alt_range: AltRange::UNL,
            reference_location: false,
        };
        let cm = evaluate_condition(&condition, &plan);
        assert!(cm.matched);
        assert_eq!(cm.vertices, [1].into_iter().collect());
    }

    #[test]
    fn and_with_inverted_children_encodes_or() {
        let a = Uuid::new_random();
        let b = Uuid::new_random();
        let plan = plan_with_two_vertices(a, b, Uuid::new_random());
        let neither_present = Condition::CrossingPoint {
            point: Link::new(Uuid::new_random()),
            alt_range: AltRange::UNL,
            reference_location: false,
        };
        let present = Condition::CrossingPoint {
            point: Link::new(b),
            alt_range: AltRange::UNL,
            reference_location: false,
        };
        let or_condition = Condition::And {
            children: vec![neither_present, present],
            invert_children: vec![true, true],
            invert_final: true,
        };
        assert!(evaluate_condition(&or_condition, &plan).matched);
    }

    #[test]
    fn dct_limit_flags_long_direct_legs() {
        let a = Uuid::new_random();
        let b = Uuid::new_random();
        let plan = plan_with_two_vertices(a, b, Uuid::new_random());
        let condition = Condition::DctLimit { nmi: 10.0 };
        assert!(evaluate_condition(&condition, &plan).matched);
        let condition = Condition::DctLimit { nmi: 100.0 };
        assert!(!evaluate_condition(&condition, &plan).matched);
    }

    #[test]
    fn pre_simplify_folds_mismatched_aircraft_type() {
        let ctx = SimplifyContext {
            bbox: Rect::invalid(),
            alt_range: AltRange::UNL,
            aircraft_type: Some("A320".into()),
            pbn: vec![],
            flight_rules: FlightRules::Ifr,
            civ_or_mil: CivOrMil::Civil,
            dep: Uuid::new_random(),
            dest: Uuid::new_random(),
            time_range: Validity::UNBOUNDED,
        };
        let condition = Condition::Aircraft {
            icao_type: Some("C172".into()),
            engine_count: None,
            kind: crate::model::AircraftKind::Any,
            engine_kind: crate::model::EngineKind::Any,
            nav_spec: vec![],
            vertical_sep: crate::model::VerticalSepCapability::Any,
        };
        assert_eq!(pre_simplify(&condition, &ctx), Condition::Constant(false));
    }
}
