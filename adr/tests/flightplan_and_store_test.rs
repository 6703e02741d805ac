// SPDX-License-Identifier: Apache-2.0
// Copyright 2024, 2026 Joe Pearson

//! End-to-end coverage across import, recompute, promotion and flight-plan
//! evaluation -- the seams a single module's unit tests can't reach.

use adr::geom::{AltLimit, AltMode, AltRange, Point, Rect};
use adr::id::{Link, Uuid};
use adr::model::{
    Airport, Airspace, AirspaceType, Body, Component, ComponentGeometry, ComponentOperator,
    Condition, FlightRestriction, PointCommon, RestrictionElement, RestrictionKind, TimeSlice,
    VariantKind,
};
use adr::object::Object;
use adr::recompute::NoTerrainDb;
use adr::store::ObjectStore;
use adr::time::{SliceHeader, Validity};

fn save_airport(store: &ObjectStore, ident: &str, coord: Point) -> Uuid {
    let uuid = Uuid::new_random();
    let mut obj = Object::new(uuid, VariantKind::Airport);
    obj.add_timeslice(TimeSlice::new(
        SliceHeader::baseline(Validity::UNBOUNDED, 0),
        Body::Airport(Airport {
            common: PointCommon::new(ident, ident, coord),
        }),
    ))
    .unwrap();
    store.save(obj).unwrap();
    uuid
}

#[test]
fn countryborder_uuids_are_stable_and_distinct() {
    // The documented test vector only commits to a 3-byte prefix, not a full
    // UUID; that's what this asserts against.
    assert_eq!(
        Uuid::from_countryborder("SWITZERLAND").as_bytes()[0..3],
        [0x8f, 0x7e, 0x3c]
    );
    assert_eq!(
        Uuid::from_countryborder("SWITZERLAND"),
        Uuid::from_countryborder("SWITZERLAND")
    );
    assert_ne!(
        Uuid::from_countryborder("SWITZERLAND"),
        Uuid::from_countryborder("FRANCE")
    );
}

#[test]
fn recompute_promotes_a_temp_object_and_leaves_an_unresolved_contributor_invalid() {
    let store = ObjectStore::in_memory();

    let mut airspace = Airspace::new("XXAA", "Unresolved contributor test", AirspaceType::Tma);
    airspace.components.push(Component {
        operator: ComponentOperator::Base,
        geometry: ComponentGeometry::Contributor(Link::new(Uuid::new_random())),
        alt_range: AltRange::new(AltLimit::new(AltMode::Std, 0), AltLimit::new(AltMode::Std, 10_000)),
    });

    let uuid = Uuid::new_random();
    let mut obj = Object::new(uuid, VariantKind::Airspace);
    obj.add_timeslice(TimeSlice::new(
        SliceHeader::baseline(Validity::UNBOUNDED, 0),
        Body::Airspace(airspace),
    ))
    .unwrap();
    store.save_temp(obj).unwrap();

    assert!(store.all_temp_uuids().unwrap().contains(&uuid));

    let stats = adr::recompute::run(&store, &NoTerrainDb, 0, None, &|| false).unwrap();
    assert_eq!(stats.modified, 1);
    assert_eq!(stats.unmodified, 0);

    // Promoted: no longer shadowed by the temp overlay.
    assert!(!store.all_temp_uuids().unwrap().contains(&uuid));

    let recomputed = store.load(uuid).unwrap().unwrap();
    let Some(Body::Airspace(airspace)) = recomputed.latest_body() else {
        panic!("expected an airspace body");
    };
    assert_eq!(airspace.bbox, Rect::invalid());
    assert_eq!(airspace.floor_ft, 0);
    assert_eq!(airspace.ceiling_ft, 10_000);
}

#[test]
fn save_does_not_duplicate_index_entries_across_promotion() {
    let store = ObjectStore::in_memory();
    let uuid = Uuid::new_random();
    let mut obj = Object::new(uuid, VariantKind::Airport);
    obj.add_timeslice(TimeSlice::new(
        SliceHeader::baseline(Validity::UNBOUNDED, 0),
        Body::Airport(Airport {
            common: PointCommon::new("EDDF", "EDDF", Point::new(50.03, 8.57)),
        }),
    ))
    .unwrap();

    store.save_temp(obj.clone()).unwrap();
    store.save(obj).unwrap();

    assert_eq!(store.find_by_ident("EDDF").unwrap(), vec![uuid]);
}

#[test]
fn mandatory_waypoint_restriction_blocks_a_plan_that_skips_it() {
    use adr::flightplan::{build_plan, evaluate, resolve, FlightPlanRequest};

    let store = ObjectStore::in_memory();
    let eddh = save_airport(&store, "EDDH", Point::new(53.63, 9.99));
    let edhl = save_airport(&store, "EDHL", Point::new(53.81, 10.70));
    let lunix = save_airport(&store, "LUNIX", Point::new(53.70, 10.20));

    let mut restriction = FlightRestriction::new(
        "MUST-LUNIX",
        RestrictionKind::Mandatory,
        Condition::DepArrPoint { point: Link::new(edhl), is_departure: false },
    );
    restriction.alternatives =
        vec![vec![RestrictionElement::Point { point: Link::new(lunix), alt_range: AltRange::UNL }]];
    let rule_uuid = Uuid::new_random();
    let mut rule_obj = Object::new(rule_uuid, VariantKind::FlightRestriction);
    rule_obj
        .add_timeslice(TimeSlice::new(
            SliceHeader::baseline(Validity::UNBOUNDED, 0),
            Body::FlightRestriction(Box::new(restriction)),
        ))
        .unwrap();
    store.save(rule_obj).unwrap();

    // Direct route bypasses the mandatory waypoint -- fails.
    let request = FlightPlanRequest::new("DCT", "EDDH", "EDHL", 0);
    let route = resolve(&store, &request).unwrap();
    let plan = build_plan(&store, &route, &request, eddh, edhl).unwrap();
    let summary = evaluate(&store, &plan, 0, &[rule_uuid]).unwrap();
    assert!(!summary.ok);
    assert!(summary.results[0].failed);

    // Routing via the waypoint satisfies the alternative -- passes.
    let request = FlightPlanRequest::new("DCT LUNIX DCT", "EDDH", "EDHL", 0);
    let route = resolve(&store, &request).unwrap();
    let plan = build_plan(&store, &route, &request, eddh, edhl).unwrap();
    let summary = evaluate(&store, &plan, 0, &[rule_uuid]).unwrap();
    assert!(summary.ok);
    assert!(!summary.results[0].failed);
}

#[test]
fn set_rule_trace_surfaces_an_info_message_through_the_store_api() {
    use adr::flightplan::{build_plan, evaluate, resolve, FlightPlanRequest};

    let store = ObjectStore::in_memory();
    let eddh = save_airport(&store, "EDDH", Point::new(53.63, 9.99));
    let edhl = save_airport(&store, "EDHL", Point::new(53.81, 10.70));

    let restriction = FlightRestriction::new(
        "TRACE-ME",
        RestrictionKind::Forbidden,
        Condition::DepArrPoint { point: Link::new(Uuid::new_random()), is_departure: false },
    );
    let rule_uuid = Uuid::new_random();
    let mut rule_obj = Object::new(rule_uuid, VariantKind::FlightRestriction);
    rule_obj
        .add_timeslice(TimeSlice::new(
            SliceHeader::baseline(Validity::UNBOUNDED, 0),
            Body::FlightRestriction(Box::new(restriction)),
        ))
        .unwrap();
    store.save(rule_obj).unwrap();

    store.set_rule_trace(rule_uuid, true).unwrap();

    let request = FlightPlanRequest::new("DCT", "EDDH", "EDHL", 0);
    let route = resolve(&store, &request).unwrap();
    let plan = build_plan(&store, &route, &request, eddh, edhl).unwrap();
    let summary = evaluate(&store, &plan, 0, &[rule_uuid]).unwrap();

    assert!(summary.ok);
    assert_eq!(summary.results.len(), 1);
    assert!(summary.results[0].messages.iter().any(|m| m.rule == rule_uuid));

    store.set_rule_enabled(rule_uuid, false).unwrap();
    let reloaded = store.load(rule_uuid).unwrap().unwrap();
    let Some(Body::FlightRestriction(restriction)) = reloaded.latest_body() else {
        panic!("expected a flight_restriction body");
    };
    assert!(!restriction.enabled);
}

#[test]
fn a_snapshot_written_from_a_relational_store_answers_the_same_ident_query() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("archive.adrbin");

    let store = ObjectStore::in_memory();
    let uuid = save_airport(&store, "LSZH", Point::new(47.46, 8.55));
    store.write_binfile(&path).unwrap();

    let snapshot_store = ObjectStore::open_snapshot(&path).unwrap();
    assert_eq!(snapshot_store.find_by_ident("LSZH").unwrap(), vec![uuid]);
    let reloaded = snapshot_store.load(uuid).unwrap().unwrap();
    assert_eq!(reloaded.uuid(), uuid);
}

#[test]
fn flush_cache_returns_the_number_of_unreferenced_objects_evicted() {
    let store = ObjectStore::in_memory();
    for i in 0..5 {
        save_airport(&store, &format!("TEST{i}"), Point::new(0.0, 0.0));
    }
    assert_eq!(store.flush_cache(), 5);
    assert_eq!(store.flush_cache(), 0);
}
