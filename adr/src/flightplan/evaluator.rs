// SPDX-License-Identifier: Apache-2.0
// Copyright 2024, 2026 Joe Pearson

//! Building a routing graph ([`Plan`]) from a resolved route and running a
//! rule set's conditions over it.
//!
//! Candidate rules are supplied by the caller rather than enumerated by this
//! module -- the store has no "every flight_restriction" query, only
//! `find_by_bbox`/`find_by_ident`, so callers narrow the candidate set
//! themselves.

use std::collections::BTreeSet;

use log::info;

use crate::error::Error;
use crate::geom::{AltLimit, AltMode, AltRange};
use crate::id::Uuid;
use crate::model::{Body, CivOrMil, ComponentGeometry, FlightPurpose, RestrictionElement, RestrictionKind};
use crate::store::ObjectStore;

use super::condition::evaluate_condition;
use super::resolver::{FlightPlanRequest, PathCode, ResolvedRoute};

/// One vertex of a resolved plan's routing graph.
#[derive(Clone, Debug)]
pub struct PlanVertex {
    pub point_object: Uuid,
    pub coord: Option<crate::geom::Point>,
    pub altitude_ft: i32,
    /// Every airspace (of any type) whose resolved geometry contains this
    /// vertex's coordinate.
    pub airspaces: Vec<Uuid>,
    /// The SID/STAR this vertex was expanded from, if any.
    pub procedure: Option<Uuid>,
}

/// One edge (leg) of a resolved plan's routing graph.
#[derive(Clone, Debug)]
pub struct PlanEdge {
    pub from: usize,
    pub to: usize,
    /// The airway this leg flies, or `None` for a direct (`DCT`) leg.
    pub airway: Option<Uuid>,
    pub alt_range: AltRange,
    pub distance_nm: f64,
}

/// A resolved route plus the context a restriction's condition tree needs to
/// match against it.
#[derive(Clone, Debug)]
pub struct Plan {
    pub vertices: Vec<PlanVertex>,
    pub edges: Vec<PlanEdge>,
    pub departure_airport: Uuid,
    pub arrival_airport: Uuid,
    pub aircraft_type: String,
    pub equipment: Vec<String>,
    pub pbn: Vec<String>,
    pub civ_or_mil: CivOrMil,
    pub purpose: FlightPurpose,
    /// Airways known to be open at the plan's time, for
    /// `Condition::CrossingAirwayAvailable`. Populated by the caller, since
    /// "open" depends on a calendar this module has no access to.
    pub available_routes: Vec<Uuid>,
}

/// Whether a component (or, recursively, a contributor airspace's own
/// components) contains `pt`. `ComponentOperator` has no subtractive
/// variant, so any containing component is sufficient regardless of the
/// others.
fn airspace_contains(
    store: &ObjectStore,
    airspace: &crate::model::Airspace,
    pt: crate::geom::Point,
    depth: u32,
) -> Result<bool, Error> {
    if depth > 4 {
        return Ok(false);
    }
    for component in &airspace.components {
        let hit = match &component.geometry {
            ComponentGeometry::Polygon(poly) => poly.contains(&pt),
            ComponentGeometry::Contributor(link) => match store.load(link.uuid())? {
                Some(obj) => match obj.as_airspace() {
                    Some(other) => airspace_contains(store, other, pt, depth + 1)?,
                    None => false,
                },
                None => false,
            },
        };
        if hit {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Builds a [`Plan`]'s routing graph from a [`ResolvedRoute`], computing
/// each vertex's airspace membership by a 1 nmi bounding-box query followed
/// by exact polygon containment.
pub fn build_plan(
    store: &ObjectStore,
    route: &ResolvedRoute,
    request: &FlightPlanRequest,
    departure_airport: Uuid,
    arrival_airport: Uuid,
) -> Result<Plan, Error> {
    let mut vertices = Vec::with_capacity(route.waypoints.len());
    for wp in &route.waypoints {
        let mut airspaces = Vec::new();
        for uuid in store.find_by_bbox(wp.coord.simple_box_nmi(1.0))? {
            if let Some(obj) = store.load(uuid)? {
                if let Some(airspace) = obj.as_airspace() {
                    if airspace_contains(store, airspace, wp.coord, 0)? {
                        airspaces.push(uuid);
                    }
                }
            }
        }
        let procedure = match wp.path_code {
            PathCode::Sid | PathCode::Star => Some(wp.path_object.uuid()),
            _ => None,
        };
        vertices.push(PlanVertex {
            point_object: wp.point_object.uuid(),
            coord: Some(wp.coord),
            altitude_ft: wp.altitude_ft,
            airspaces,
            procedure,
        });
    }

    let mut edges = Vec::with_capacity(vertices.len().saturating_sub(1));
    for (i, pair) in route.waypoints.windows(2).enumerate() {
        let distance_nm = pair[0].coord.spheric_distance(&pair[1].coord);
        let airway = match pair[1].path_code {
            PathCode::Airway => Some(pair[1].path_object.uuid()),
            _ => None,
        };
        let lower = pair[0].altitude_ft.min(pair[1].altitude_ft);
        let upper = pair[0].altitude_ft.max(pair[1].altitude_ft);
        edges.push(PlanEdge {
            from: i,
            to: i + 1,
            airway,
            alt_range: AltRange::new(AltLimit::new(AltMode::Std, lower), AltLimit::new(AltMode::Std, upper)),
            distance_nm,
        });
    }

    Ok(Plan {
        vertices,
        edges,
        departure_airport,
        arrival_airport,
        aircraft_type: request.aircraft_type.clone(),
        equipment: request.equipment.clone(),
        pbn: request.pbn.clone(),
        civ_or_mil: request.civ_or_mil,
        purpose: request.purpose,
        available_routes: Vec::new(),
    })
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum MessageSeverity {
    Info,
    Warning,
    Error,
}

#[derive(Clone, Debug)]
pub struct EvaluationMessage {
    pub severity: MessageSeverity,
    pub rule: Uuid,
    pub text: String,
}

/// The outcome of evaluating one restriction against a plan.
#[derive(Clone, Debug)]
pub struct RestrictionResult {
    pub rule: Uuid,
    pub ident: String,
    pub kind: RestrictionKind,
    /// Whether this restriction blocks the plan (`Forbidden`/`Closed`
    /// firing, or a `Mandatory` restriction with no alternative satisfied).
    pub failed: bool,
    pub vertices: BTreeSet<usize>,
    pub edges: BTreeSet<usize>,
    pub messages: Vec<EvaluationMessage>,
}

#[derive(Clone, Debug, Default)]
pub struct EvaluationSummary {
    pub ok: bool,
    pub results: Vec<RestrictionResult>,
}

fn obviously_irrelevant(condition: &crate::model::Condition, plan: &Plan) -> bool {
    use crate::model::Condition;
    match condition {
        Condition::DepArrPoint { point, is_departure } => {
            let anchor = if *is_departure { plan.departure_airport } else { plan.arrival_airport };
            !point.uuid().is_nil() && point.uuid() != anchor
        }
        Condition::DepArrAirspace { airspace, is_departure } => {
            let vertex = if *is_departure { plan.vertices.first() } else { plan.vertices.last() };
            vertex.is_some_and(|v| !v.airspaces.contains(&airspace.uuid()))
        }
        _ => false,
    }
}

const UNBOUNDED_ENVELOPE: (i32, i32) = (i32::MIN, i32::MAX);

fn element_position(element: &RestrictionElement, plan: &Plan, from: usize) -> Option<usize> {
    match element {
        RestrictionElement::Point { point, alt_range } => plan
            .vertices
            .iter()
            .enumerate()
            .skip(from)
            .find(|(_, v)| v.point_object == point.uuid() && alt_range.contains(v.altitude_ft, UNBOUNDED_ENVELOPE))
            .map(|(i, _)| i),
        RestrictionElement::Airspace { airspace, alt_range } => plan
            .vertices
            .iter()
            .enumerate()
            .skip(from)
            .find(|(_, v)| v.airspaces.contains(&airspace.uuid()) && alt_range.contains(v.altitude_ft, UNBOUNDED_ENVELOPE))
            .map(|(i, _)| i),
        RestrictionElement::SidOrStar { procedure, .. } => plan
            .vertices
            .iter()
            .enumerate()
            .skip(from)
            .find(|(_, v)| v.procedure == Some(procedure.uuid()))
            .map(|(i, _)| i),
        RestrictionElement::RouteSegment { route, .. } => plan
            .edges
            .iter()
            .enumerate()
            .skip(from.min(plan.edges.len()))
            .find(|(_, e)| e.airway == Some(route.uuid()))
            .map(|(i, _)| i),
    }
}

/// Checks whether `alt`'s elements appear, in order, somewhere in the plan,
/// returning whether the whole alternative matched and how many of its
/// elements were found regardless (for reporting the closest-matching
/// alternative when none fully match).
fn alternative_matches(alt: &[RestrictionElement], plan: &Plan) -> (bool, usize) {
    let mut matched = 0;
    let mut cursor = 0usize;
    for element in alt {
        match element_position(element, plan, cursor) {
            Some(pos) => {
                matched += 1;
                cursor = pos + 1;
            }
            None => break,
        }
    }
    (matched == alt.len(), matched)
}

/// Evaluates `candidate_rules` against `plan` at instant `at`, returning the
/// overall pass/fail result plus a per-rule breakdown.
///
/// A restriction is skipped outright if it is disabled, not active at `at`,
/// or its condition is [`obviously_irrelevant`] to this plan's departure or
/// arrival. When `trace` is set on a restriction, every step -- skip,
/// condition result, and each alternative checked -- is both logged and
/// appended as an info message, so a caller with no log subscriber still
/// observes the trace.
pub fn evaluate(
    store: &ObjectStore,
    plan: &Plan,
    at: i64,
    candidate_rules: &[Uuid],
) -> Result<EvaluationSummary, Error> {
    let mut results = Vec::new();
    let mut ok = true;

    for &uuid in candidate_rules {
        let Some(obj) = store.load(uuid)? else { continue };
        let Some(slice) = obj.at(at) else { continue };
        let Body::FlightRestriction(restriction) = &slice.body else { continue };
        if !restriction.enabled {
            continue;
        }

        let mut messages = Vec::new();
        if obviously_irrelevant(&restriction.condition, plan) {
            if restriction.trace {
                info!("restriction {} ({uuid}): skipped, structurally irrelevant", restriction.ident);
                messages.push(EvaluationMessage {
                    severity: MessageSeverity::Info,
                    rule: uuid,
                    text: "skipped: structurally irrelevant to this plan".to_string(),
                });
                results.push(RestrictionResult {
                    rule: uuid,
                    ident: restriction.ident.clone(),
                    kind: restriction.kind,
                    failed: false,
                    vertices: BTreeSet::new(),
                    edges: BTreeSet::new(),
                    messages,
                });
            }
            continue;
        }

        let cm = evaluate_condition(&restriction.condition, plan);
        if restriction.trace {
            info!("restriction {} ({uuid}): condition matched = {}", restriction.ident, cm.matched);
            messages.push(EvaluationMessage {
                severity: MessageSeverity::Info,
                rule: uuid,
                text: format!("condition matched = {}", cm.matched),
            });
        }
        if !cm.matched {
            if restriction.trace {
                results.push(RestrictionResult {
                    rule: uuid,
                    ident: restriction.ident.clone(),
                    kind: restriction.kind,
                    failed: false,
                    vertices: cm.vertices,
                    edges: cm.edges,
                    messages,
                });
            }
            continue;
        }

        let failed = match restriction.kind {
            RestrictionKind::Forbidden | RestrictionKind::Closed => {
                messages.push(EvaluationMessage {
                    severity: MessageSeverity::Error,
                    rule: uuid,
                    text: format!("{} restriction {} fired", describe_kind(restriction.kind), restriction.ident),
                });
                true
            }
            RestrictionKind::Mandatory => {
                if restriction.alternatives.is_empty() {
                    false
                } else {
                    let mut longest = 0usize;
                    let mut satisfied = false;
                    for alt in &restriction.alternatives {
                        let (full, n) = alternative_matches(alt, plan);
                        if restriction.trace {
                            messages.push(EvaluationMessage {
                                severity: MessageSeverity::Info,
                                rule: uuid,
                                text: format!("alternative matched {n}/{} elements", alt.len()),
                            });
                        }
                        longest = longest.max(n);
                        if full {
                            satisfied = true;
                            break;
                        }
                    }
                    if !satisfied {
                        messages.push(EvaluationMessage {
                            severity: MessageSeverity::Error,
                            rule: uuid,
                            text: format!(
                                "mandatory restriction {} not satisfied, best alternative matched {longest} elements",
                                restriction.ident
                            ),
                        });
                    }
                    !satisfied
                }
            }
            RestrictionKind::Allowed => {
                messages.push(EvaluationMessage {
                    severity: MessageSeverity::Info,
                    rule: uuid,
                    text: format!("allowed restriction {} matched", restriction.ident),
                });
                false
            }
        };

        if failed {
            ok = false;
        }
        results.push(RestrictionResult {
            rule: uuid,
            ident: restriction.ident.clone(),
            kind: restriction.kind,
            failed,
            vertices: cm.vertices,
            edges: cm.edges,
            messages,
        });
    }

    Ok(EvaluationSummary { ok, results })
}

fn describe_kind(kind: RestrictionKind) -> &'static str {
    match kind {
        RestrictionKind::Mandatory => "mandatory",
        RestrictionKind::Forbidden => "forbidden",
        RestrictionKind::Closed => "closed",
        RestrictionKind::Allowed => "allowed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AircraftKind, Condition, EngineKind, FlightRestriction, VerticalSepCapability};
    use crate::id::Link;
    use crate::object::Object;
    use crate::model::{TimeSlice, VariantKind};
    use crate::time::{SliceHeader, Validity};

    fn two_vertex_plan(a: Uuid, b: Uuid) -> Plan {
        Plan {
            vertices: vec![
                PlanVertex { point_object: a, coord: None, altitude_ft: 5000, airspaces: vec![], procedure: None },
                PlanVertex { point_object: b, coord: None, altitude_ft: 5000, airspaces: vec![], procedure: None },
            ],
            edges: vec![PlanEdge {
                from: 0,
                to: 1,
                airway: None,
                alt_range: AltRange::new(AltLimit::new(AltMode::Std, 5000), AltLimit::new(AltMode::Std, 5000)),
                distance_nm: 50.0,
            }],
            departure_airport: a,
            arrival_airport: b,
            aircraft_type: "C172".into(),
            equipment: vec![],
            pbn: vec![],
            civ_or_mil: CivOrMil::Civil,
            purpose: FlightPurpose::Any,
            available_routes: vec![],
        }
    }

    fn save_restriction(store: &ObjectStore, uuid: Uuid, restriction: FlightRestriction) {
        let mut obj = Object::new(uuid, VariantKind::FlightRestriction);
        obj.add_timeslice(TimeSlice::new(
            SliceHeader::baseline(Validity::UNBOUNDED, 0),
            Body::FlightRestriction(Box::new(restriction)),
        ))
        .unwrap();
        store.save(obj).unwrap();
    }

    #[test]
    fn forbidden_restriction_fails_when_its_condition_matches() {
        let store = ObjectStore::in_memory();
        let a = Uuid::new_random();
        let b = Uuid::new_random();
        let plan = two_vertex_plan(a, b);

        let rule_uuid = Uuid::new_random();
        save_restriction(
            &store,
            rule_uuid,
            FlightRestriction::new(
                "FORBID-B",
                RestrictionKind::Forbidden,
                Condition::DepArrPoint { point: Link::new(b), is_departure: false },
            ),
        );

        let summary = evaluate(&store, &plan, 0, &[rule_uuid]).unwrap();
        assert!(!summary.ok);
        assert_eq!(summary.results.len(), 1);
        assert!(summary.results[0].failed);
    }

    #[test]
    fn mandatory_restriction_passes_when_an_alternative_matches() {
        let store = ObjectStore::in_memory();
        let a = Uuid::new_random();
        let b = Uuid::new_random();
        let plan = two_vertex_plan(a, b);

        let mut restriction = FlightRestriction::new(
            "MANDATORY-DCT",
            RestrictionKind::Mandatory,
            Condition::DepArrPoint { point: Link::new(b), is_departure: false },
        );
        restriction.alternatives = vec![vec![RestrictionElement::Point { point: Link::new(b), alt_range: AltRange::UNL }]];

        let rule_uuid = Uuid::new_random();
        save_restriction(&store, rule_uuid, restriction);

        let summary = evaluate(&store, &plan, 0, &[rule_uuid]).unwrap();
        assert!(summary.ok);
        assert!(!summary.results[0].failed);
    }

    #[test]
    fn disabled_restriction_is_skipped() {
        let store = ObjectStore::in_memory();
        let a = Uuid::new_random();
        let b = Uuid::new_random();
        let plan = two_vertex_plan(a, b);

        let mut restriction = FlightRestriction::new(
            "DISABLED",
            RestrictionKind::Forbidden,
            Condition::DepArrPoint { point: Link::new(b), is_departure: false },
        );
        restriction.enabled = false;
        let rule_uuid = Uuid::new_random();
        save_restriction(&store, rule_uuid, restriction);

        let summary = evaluate(&store, &plan, 0, &[rule_uuid]).unwrap();
        assert!(summary.ok);
        assert!(summary.results.is_empty());
    }

    #[test]
    fn trace_emits_an_info_message_even_when_the_condition_does_not_match() {
        let store = ObjectStore::in_memory();
        let a = Uuid::new_random();
        let b = Uuid::new_random();
        let plan = two_vertex_plan(a, b);

        let mut restriction = FlightRestriction::new(
            "TRACE-ME",
            RestrictionKind::Forbidden,
            Condition::Aircraft {
                icao_type: Some("B738".into()),
                engine_count: None,
                kind: AircraftKind::Any,
                engine_kind: EngineKind::Any,
                nav_spec: vec![],
                vertical_sep: VerticalSepCapability::Any,
            },
        );
        restriction.trace = true;
        let rule_uuid = Uuid::new_random();
        save_restriction(&store, rule_uuid, restriction);

        let summary = evaluate(&store, &plan, 0, &[rule_uuid]).unwrap();
        assert!(summary.ok);
        assert_eq!(summary.results.len(), 1);
        assert!(summary.results[0]
            .messages
            .iter()
            .any(|m| matches!(m.severity, MessageSeverity::Info) && m.rule == rule_uuid));
    }
}
