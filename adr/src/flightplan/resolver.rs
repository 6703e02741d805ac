// SPDX-License-Identifier: Apache-2.0
// Copyright 2024, 2026 Joe Pearson

//! ICAO field-15 route string resolution.
//!
//! Like `efb::route::token`'s two-phase lexer/tokenizer, resolution happens
//! in two passes: [`lex`] splits the route string into context-free
//! [`RouteWord`]s (an identifier, possibly with an attached altitude/speed
//! change, or `DCT`), then [`resolve`] walks the words with the store and
//! the previously resolved waypoint as context, since a token's meaning (a
//! SID fix vs. an airway designator vs. a bare waypoint) depends on what
//! came before it.

use std::collections::HashMap;

use log::{debug, warn};

use crate::error::Error;
use crate::geom::{AltRange, Point};
use crate::id::{Link, Uuid};
use crate::model::{Body, CivOrMil, FlightPurpose, VariantKind};
use crate::object::Object;
use crate::recompute::TerrainDb;
use crate::store::ObjectStore;
use crate::time::Validity;

/// ICAO flight rules for the plan as a whole.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum FlightRules {
    Ifr,
    Vfr,
    /// VFR then IFR.
    Y,
    /// IFR then VFR.
    Z,
}

/// What produced a [`ResolvedWaypoint`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum PathCode {
    Sid,
    Star,
    Airway,
    Direct,
    Terminal,
}

/// One resolved point along the plan, in flown order.
#[derive(Clone, Debug)]
pub struct ResolvedWaypoint {
    pub ident: String,
    pub coord: Point,
    pub altitude_ft: i32,
    pub path_code: PathCode,
    /// The SID/STAR/airway designator this waypoint was expanded from, if
    /// any.
    pub path_name: Option<String>,
    pub path_object: Link,
    pub point_object: Link,
    /// Set for a waypoint produced by expanding a SID, STAR or airway
    /// rather than typed directly into the route string.
    pub is_expanded: bool,
}

/// The departure/destination and aircraft parameters a route string is
/// resolved against.
#[derive(Clone, Debug)]
pub struct FlightPlanRequest {
    pub route_string: String,
    pub departure: String,
    pub destination: String,
    pub aircraft_type: String,
    pub equipment: Vec<String>,
    pub pbn: Vec<String>,
    pub flight_rules: FlightRules,
    pub requested_level_ft: i32,
    pub eobt: i64,
    pub cruise_kt: f64,
    pub civ_or_mil: CivOrMil,
    pub purpose: FlightPurpose,
    /// Whether an airway designator expands into its intermediate segment
    /// points, or collapses straight to the next resolved waypoint.
    pub expand_airways: bool,
}

impl FlightPlanRequest {
    pub fn new(
        route_string: impl Into<String>,
        departure: impl Into<String>,
        destination: impl Into<String>,
        eobt: i64,
    ) -> Self {
        Self {
            route_string: route_string.into(),
            departure: departure.into(),
            destination: destination.into(),
            aircraft_type: String::new(),
            equipment: Vec::new(),
            pbn: Vec::new(),
            flight_rules: FlightRules::Ifr,
            requested_level_ft: 0,
            eobt,
            cruise_kt: 250.0,
            civ_or_mil: CivOrMil::Either,
            purpose: FlightPurpose::Any,
            expand_airways: true,
        }
    }
}

/// A fully resolved plan: waypoints in flown order plus aggregate estimates.
#[derive(Clone, Debug, Default)]
pub struct ResolvedRoute {
    pub waypoints: Vec<ResolvedWaypoint>,
    pub total_distance_nm: f64,
    pub total_time_s: i64,
}

/// A token is matched against the store's ident index within this window of
/// the departure time, so a revision that becomes valid shortly before or
/// after EOBT is still found.
const DEPARTURE_WINDOW_S: i64 = 24 * 3600;

#[derive(Clone, Debug)]
enum RouteWord {
    Dct,
    Ident { ident: String, altitude_ft: Option<i32> },
}

fn lex(route_string: &str) -> Vec<RouteWord> {
    route_string
        .to_ascii_uppercase()
        .split_whitespace()
        .map(|word| match word.split_once('/') {
            Some((ident, suffix)) => RouteWord::Ident {
                ident: ident.to_string(),
                altitude_ft: parse_level_suffix(suffix),
            },
            None if word == "DCT" => RouteWord::Dct,
            None => RouteWord::Ident {
                ident: word.to_string(),
                altitude_ft: None,
            },
        })
        .collect()
}

/// Parses the level half of a field-15 `speed/level` suffix (e.g.
/// `N0450F350` -> `35000`), skipping over the leading speed group.
fn parse_level_suffix(suffix: &str) -> Option<i32> {
    let pos = suffix.find(|c: char| matches!(c, 'F' | 'A' | 'S' | 'M'))?;
    let (tag, digits) = suffix[pos..].split_at(1);
    let n: f64 = digits.parse().ok()?;
    match tag {
        "F" | "A" => Some((n * 100.0) as i32),
        "S" => Some((n * 10.0 * 3.28084) as i32),
        "M" => Some((n * 3.28084) as i32),
        _ => None,
    }
}

fn active_within_window(obj: &Object, at: i64) -> bool {
    let window = Validity::new(at - DEPARTURE_WINDOW_S, at + DEPARTURE_WINDOW_S);
    obj.slices().iter().any(|s| s.header.validity.overlaps(&window))
}

/// The natural ident of a point-like body, used to label waypoints expanded
/// from a procedure or airway rather than typed by the caller.
fn point_ident(body: Option<&Body>) -> Option<&str> {
    match body? {
        Body::Airport(a) => Some(&a.common.ident),
        Body::Navaid(n) => Some(&n.common.ident),
        Body::DesignatedPoint(p) => Some(&p.common.ident),
        Body::AirportCollocation(c) => Some(&c.common.ident),
        _ => None,
    }
}

fn resolve_airport(store: &ObjectStore, icao: &str, at: i64) -> Result<ResolvedWaypoint, Error> {
    for uuid in store.find_by_ident(icao)? {
        let Some(obj) = store.load(uuid)? else { continue };
        if obj.kind() != VariantKind::Airport || !active_within_window(&obj, at) {
            continue;
        }
        let Some(coord) = obj.point_coordinate() else { continue };
        return Ok(ResolvedWaypoint {
            ident: icao.to_string(),
            coord,
            altitude_ft: 0,
            path_code: PathCode::Terminal,
            path_name: None,
            path_object: Link::nil(),
            point_object: Link::new(uuid),
            is_expanded: false,
        });
    }
    Err(Error::structural(format!("unknown departure/destination airport {icao:?}")))
}

/// Resolves a bare ident against the store's ident index, disambiguating
/// multiple matches by proximity to `near` (the previously resolved
/// waypoint's coordinate).
fn resolve_point(
    store: &ObjectStore,
    ident: &str,
    at: i64,
    near: Option<Point>,
) -> Result<Option<ResolvedWaypoint>, Error> {
    let mut candidates = Vec::new();
    for uuid in store.find_by_ident(ident)? {
        let Some(obj) = store.load(uuid)? else { continue };
        if !active_within_window(&obj, at) {
            continue;
        }
        let Some(coord) = obj.point_coordinate() else { continue };
        candidates.push((uuid, coord));
    }

    let chosen = match near {
        Some(near) if candidates.len() > 1 => candidates.iter().copied().min_by(|a, b| {
            a.1.spheric_distance(&near)
                .partial_cmp(&b.1.spheric_distance(&near))
                .unwrap_or(std::cmp::Ordering::Equal)
        }),
        _ => {
            if candidates.len() > 1 {
                warn!("ambiguous route token {ident:?} with no prior coordinate, taking the first match");
            }
            candidates.first().copied()
        }
    };

    Ok(chosen.map(|(uuid, coord)| ResolvedWaypoint {
        ident: ident.to_string(),
        coord,
        altitude_ft: 0,
        path_code: PathCode::Direct,
        path_name: None,
        path_object: Link::nil(),
        point_object: Link::new(uuid),
        is_expanded: false,
    }))
}

fn find_airway(store: &ObjectStore, ident: &str, at: i64) -> Result<Option<Uuid>, Error> {
    for uuid in store.find_by_ident(ident)? {
        let Some(obj) = store.load(uuid)? else { continue };
        if obj.kind() == VariantKind::Route && active_within_window(&obj, at) {
            return Ok(Some(uuid));
        }
    }
    Ok(None)
}

/// The SID/STAR whose designator matches `ident` *and* is published for
/// `airport`. Does not disambiguate further when a designator is reused
/// across unrelated procedures at the same airport -- AIXM designators are
/// expected to be locally unique, so this is treated as a data-quality
/// issue rather than something the resolver works around.
fn find_procedure_sid(store: &ObjectStore, ident: &str, airport: Uuid) -> Result<Option<Uuid>, Error> {
    for uuid in store.find_by_ident(ident)? {
        let Some(obj) = store.load(uuid)? else { continue };
        if let Some(Body::Sid(sid)) = obj.latest_body() {
            if sid.airport.uuid() == airport {
                return Ok(Some(uuid));
            }
        }
    }
    Ok(None)
}

fn find_procedure_star(store: &ObjectStore, ident: &str, airport: Uuid) -> Result<Option<Uuid>, Error> {
    for uuid in store.find_by_ident(ident)? {
        let Some(obj) = store.load(uuid)? else { continue };
        if let Some(Body::Star(star)) = obj.latest_body() {
            if star.airport.uuid() == airport {
                return Ok(Some(uuid));
            }
        }
    }
    Ok(None)
}

fn sid_legs(store: &ObjectStore, sid_uuid: Uuid) -> Result<Vec<(Uuid, AltRange)>, Error> {
    let mut legs = Vec::new();
    for uuid in store.find_dependson(sid_uuid)? {
        let Some(obj) = store.load(uuid)? else { continue };
        if let Some(Body::DepartureLeg(leg)) = obj.latest_body() {
            if leg.sid.uuid() == sid_uuid {
                legs.push((leg.sequence, leg.fix.uuid(), leg.alt_range));
            }
        }
    }
    legs.sort_by_key(|(seq, _, _)| *seq);
    Ok(legs.into_iter().map(|(_, fix, alt)| (fix, alt)).collect())
}

fn star_legs(store: &ObjectStore, star_uuid: Uuid) -> Result<Vec<(Uuid, AltRange)>, Error> {
    let mut legs = Vec::new();
    for uuid in store.find_dependson(star_uuid)? {
        let Some(obj) = store.load(uuid)? else { continue };
        if let Some(Body::ArrivalLeg(leg)) = obj.latest_body() {
            if leg.star.uuid() == star_uuid {
                legs.push((leg.sequence, leg.fix.uuid(), leg.alt_range));
            }
        }
    }
    legs.sort_by_key(|(seq, _, _)| *seq);
    Ok(legs.into_iter().map(|(_, fix, alt)| (fix, alt)).collect())
}

fn procedure_waypoint(
    store: &ObjectStore,
    fix_uuid: Uuid,
    alt_range: AltRange,
    requested_altitude: i32,
    path_code: PathCode,
    designator: &str,
    procedure_uuid: Uuid,
) -> Result<Option<ResolvedWaypoint>, Error> {
    let Some(obj) = store.load(fix_uuid)? else { return Ok(None) };
    let Some(coord) = obj.point_coordinate() else { return Ok(None) };
    let altitude_ft = requested_altitude.clamp(alt_range.lower.value, alt_range.upper.value.max(alt_range.lower.value));
    Ok(Some(ResolvedWaypoint {
        ident: point_ident(obj.latest_body()).unwrap_or_default().to_string(),
        coord,
        altitude_ft,
        path_code,
        path_name: Some(designator.to_string()),
        path_object: Link::new(procedure_uuid),
        point_object: Link::new(fix_uuid),
        is_expanded: true,
    }))
}

fn route_segments(store: &ObjectStore, route_uuid: Uuid) -> Result<Vec<(Uuid, Uuid)>, Error> {
    let mut out = Vec::new();
    for seg_uuid in store.find_dependson(route_uuid)? {
        let Some(obj) = store.load(seg_uuid)? else { continue };
        if let Some(Body::RouteSegment(segment)) = obj.latest_body() {
            if segment.route.uuid() == route_uuid {
                out.push((segment.start.uuid(), segment.end.uuid()));
            }
        }
    }
    Ok(out)
}

fn bfs_path(adjacency: &HashMap<Uuid, Vec<Uuid>>, from: Uuid, to: Uuid) -> Option<Vec<Uuid>> {
    use std::collections::VecDeque;
    let mut queue = VecDeque::new();
    let mut came_from: HashMap<Uuid, Uuid> = HashMap::new();
    queue.push_back(from);
    came_from.insert(from, from);

    while let Some(node) = queue.pop_front() {
        if node == to {
            let mut path = vec![node];
            let mut cur = node;
            while cur != from {
                cur = came_from[&cur];
                path.push(cur);
            }
            path.reverse();
            return Some(path);
        }
        for &next in adjacency.get(&node).into_iter().flatten() {
            if !came_from.contains_key(&next) {
                came_from.insert(next, node);
                queue.push_back(next);
            }
        }
    }
    None
}

/// Expands the route segments of `route_uuid` between `from_uuid` and
/// `to_uuid` by breadth-first search over the segment graph. When `expand`
/// is false only `to_uuid` itself is returned, collapsing the airway into a
/// single leg.
fn expand_airway(
    store: &ObjectStore,
    route_uuid: Uuid,
    route_ident: &str,
    from_uuid: Uuid,
    to_uuid: Uuid,
    expand: bool,
) -> Result<Vec<ResolvedWaypoint>, Error> {
    let segments = route_segments(store, route_uuid)?;
    let mut adjacency: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for (start, end) in &segments {
        adjacency.entry(*start).or_default().push(*end);
        adjacency.entry(*end).or_default().push(*start);
    }

    let path = bfs_path(&adjacency, from_uuid, to_uuid).unwrap_or_else(|| vec![from_uuid, to_uuid]);
    let last_index = path.len() - 1;
    let mut out = Vec::new();

    for (idx, uuid) in path.iter().enumerate().skip(1) {
        let is_last = idx == last_index;
        if !expand && !is_last {
            continue;
        }
        let Some(obj) = store.load(*uuid)? else { continue };
        let Some(coord) = obj.point_coordinate() else { continue };
        out.push(ResolvedWaypoint {
            ident: point_ident(obj.latest_body()).unwrap_or_default().to_string(),
            coord,
            altitude_ft: 0,
            path_code: PathCode::Airway,
            path_name: Some(route_ident.to_string()),
            path_object: Link::new(route_uuid),
            point_object: Link::new(*uuid),
            is_expanded: !is_last,
        });
    }
    Ok(out)
}

fn lookahead_ident(rest: &[RouteWord]) -> Option<String> {
    match rest.first()? {
        RouteWord::Ident { ident, .. } => Some(ident.clone()),
        RouteWord::Dct => None,
    }
}

/// Resolves `request.route_string` into an ordered list of waypoints.
///
/// Each en-route token is matched, in order: first against a SID published
/// at the departure airport (only for the first token), then against a STAR
/// published at the destination airport (only for the last token), then as
/// an airway designator (if the previous token was not `DCT`), and finally
/// as a bare point ident. `fix_invalid_altitudes` is a separate pass so
/// callers without a terrain database can skip it outright.
pub fn resolve(store: &ObjectStore, request: &FlightPlanRequest) -> Result<ResolvedRoute, Error> {
    let departure = resolve_airport(store, &request.departure, request.eobt)?;
    let destination = resolve_airport(store, &request.destination, request.eobt)?;
    let departure_uuid = departure.point_object.uuid();
    let destination_uuid = destination.point_object.uuid();

    let words = lex(&request.route_string);
    let mut waypoints = vec![departure];
    let mut pending_direct = true;
    let mut current_altitude = request.requested_level_ft;

    let mut i = 0;
    while i < words.len() {
        let (ident, altitude_ft) = match &words[i] {
            RouteWord::Dct => {
                pending_direct = true;
                i += 1;
                continue;
            }
            RouteWord::Ident { ident, altitude_ft } => (ident.clone(), *altitude_ft),
        };
        if let Some(alt) = altitude_ft {
            current_altitude = alt;
        }

        if waypoints.len() == 1 {
            if let Some(sid_uuid) = find_procedure_sid(store, &ident, departure_uuid)? {
                for (fix, alt_range) in sid_legs(store, sid_uuid)? {
                    if let Some(wp) = procedure_waypoint(
                        store,
                        fix,
                        alt_range,
                        current_altitude,
                        PathCode::Sid,
                        &ident,
                        sid_uuid,
                    )? {
                        waypoints.push(wp);
                    }
                }
                pending_direct = false;
                i += 1;
                continue;
            }
        }

        if i == words.len() - 1 {
            if let Some(star_uuid) = find_procedure_star(store, &ident, destination_uuid)? {
                for (fix, alt_range) in star_legs(store, star_uuid)? {
                    if let Some(wp) = procedure_waypoint(
                        store,
                        fix,
                        alt_range,
                        current_altitude,
                        PathCode::Star,
                        &ident,
                        star_uuid,
                    )? {
                        waypoints.push(wp);
                    }
                }
                pending_direct = false;
                i += 1;
                continue;
            }
        }

        if !pending_direct {
            if let Some(route_uuid) = find_airway(store, &ident, request.eobt)? {
                if let Some(next_ident) = lookahead_ident(&words[i + 1..]) {
                    let prev_coord = waypoints.last().map(|w| w.coord);
                    if let Some(target) = resolve_point(store, &next_ident, request.eobt, prev_coord)? {
                        let from_uuid = waypoints.last().unwrap().point_object.uuid();
                        let expanded = expand_airway(
                            store,
                            route_uuid,
                            &ident,
                            from_uuid,
                            target.point_object.uuid(),
                            request.expand_airways,
                        )?;
                        for mut wp in expanded {
                            wp.altitude_ft = current_altitude;
                            waypoints.push(wp);
                        }
                        pending_direct = false;
                        i += 2;
                        continue;
                    }
                }
            }
        }

        let prev_coord = waypoints.last().map(|w| w.coord);
        match resolve_point(store, &ident, request.eobt, prev_coord)? {
            Some(mut wp) => {
                wp.altitude_ft = current_altitude;
                waypoints.push(wp);
                pending_direct = false;
            }
            None => warn!("could not resolve route token {ident:?}, dropping it"),
        }
        i += 1;
    }

    waypoints.push(ResolvedWaypoint {
        altitude_ft: current_altitude,
        ..destination
    });

    let total_distance_nm: f64 = waypoints
        .windows(2)
        .map(|pair| pair[0].coord.spheric_distance(&pair[1].coord))
        .sum();
    let total_time_s = if request.cruise_kt > 0.0 {
        ((total_distance_nm / request.cruise_kt) * 3600.0) as i64
    } else {
        0
    };

    debug!(
        "resolved {} waypoints, {:.1} nm, {} s",
        waypoints.len(),
        total_distance_nm,
        total_time_s
    );

    Ok(ResolvedRoute {
        waypoints,
        total_distance_nm,
        total_time_s,
    })
}

/// Raises any leg whose cruising altitude lies below `terrain + min_clearance_ft`
/// to the lowest semicircular level that clears it, given the leg's inbound
/// track. VFR/Y rules add the customary 500 ft offset to the IFR levels.
pub fn fix_invalid_altitudes(
    route: &mut ResolvedRoute,
    terrain: &dyn TerrainDb,
    rules: FlightRules,
    min_clearance_ft: i32,
) {
    for i in 1..route.waypoints.len() {
        let coord = route.waypoints[i].coord;
        let Some(terrain_ft) = terrain.elevation_ft(coord) else { continue };
        let min_alt = terrain_ft + min_clearance_ft;
        if route.waypoints[i].altitude_ft >= min_alt {
            continue;
        }
        let bearing = route.waypoints[i - 1].coord.bearing(&coord);
        let adjusted = lowest_valid_level(min_alt, bearing, rules);
        debug!(
            "raising {} from {} ft to {} ft for terrain clearance",
            route.waypoints[i].ident, route.waypoints[i].altitude_ft, adjusted
        );
        route.waypoints[i].altitude_ft = adjusted;
    }
}

/// The lowest flight level at or above `min_alt` on the semicircular side
/// matching `bearing` (odd thousands eastbound, even thousands westbound),
/// with the VFR 500 ft offset applied when `rules` calls for it.
fn lowest_valid_level(min_alt: i32, bearing: f64, rules: FlightRules) -> i32 {
    let eastbound = (0.0..180.0).contains(&bearing);
    let vfr_offset = matches!(rules, FlightRules::Vfr | FlightRules::Y);
    let mut thousands = (min_alt + 999) / 1000;
    loop {
        if (thousands % 2 == 1) == eastbound {
            let candidate = thousands * 1000 + if vfr_offset { 500 } else { 0 };
            if candidate >= min_alt {
                return candidate;
            }
        }
        thousands += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Airport, Navaid, NavaidKind, PointCommon, TimeSlice};
    use crate::object::Object;
    use crate::time::SliceHeader;

    fn airport(store: &ObjectStore, ident: &str, coord: Point) {
        let mut obj = Object::new(Uuid::new_random(), VariantKind::Airport);
        obj.add_timeslice(TimeSlice::new(
            SliceHeader::baseline(Validity::UNBOUNDED, 0),
            Body::Airport(Airport {
                common: PointCommon::new(ident, ident, coord),
            }),
        ))
        .unwrap();
        store.save(obj).unwrap();
    }

    fn navaid(store: &ObjectStore, ident: &str, coord: Point) {
        let mut obj = Object::new(Uuid::new_random(), VariantKind::Navaid);
        obj.add_timeslice(TimeSlice::new(
            SliceHeader::baseline(Validity::UNBOUNDED, 0),
            Body::Navaid(Navaid {
                common: PointCommon::new(ident, ident, coord),
                navaid_kind: NavaidKind::Vor,
                frequency_khz: None,
            }),
        ))
        .unwrap();
        store.save(obj).unwrap();
    }

    #[test]
    fn lex_splits_dct_and_altitude_suffix() {
        let words = lex("KONAN/N0450F350 DCT LUNIX");
        assert!(matches!(&words[0], RouteWord::Ident { ident, altitude_ft: Some(35000) } if ident == "KONAN"));
        assert!(matches!(words[1], RouteWord::Dct));
        assert!(matches!(&words[2], RouteWord::Ident { ident, altitude_ft: None } if ident == "LUNIX"));
    }

    #[test]
    fn resolves_direct_route_between_two_airports_via_a_navaid() {
        let store = ObjectStore::in_memory();
        airport(&store, "EDDH", Point::new(53.63, 9.99));
        navaid(&store, "LUNIX", Point::new(53.70, 10.20));
        airport(&store, "EDHL", Point::new(53.81, 10.70));

        let mut request = FlightPlanRequest::new("DCT LUNIX DCT", "EDDH", "EDHL", 0);
        request.requested_level_ft = 5000;
        let route = resolve(&store, &request).unwrap();

        assert_eq!(route.waypoints.len(), 3);
        assert_eq!(route.waypoints[0].ident, "EDDH");
        assert_eq!(route.waypoints[1].ident, "LUNIX");
        assert_eq!(route.waypoints[1].altitude_ft, 5000);
        assert_eq!(route.waypoints[2].ident, "EDHL");
        assert!(route.total_distance_nm > 0.0);
    }

    #[test]
    fn unresolvable_token_is_dropped_with_a_warning() {
        let store = ObjectStore::in_memory();
        airport(&store, "EDDH", Point::new(53.63, 9.99));
        airport(&store, "EDHL", Point::new(53.81, 10.70));

        let request = FlightPlanRequest::new("DCT GHOST", "EDDH", "EDHL", 0);
        let route = resolve(&store, &request).unwrap();
        assert_eq!(route.waypoints.len(), 2);
    }

    #[test]
    fn lowest_valid_level_respects_semicircular_rule() {
        assert_eq!(lowest_valid_level(4200, 90.0, FlightRules::Ifr), 5000);
        assert_eq!(lowest_valid_level(4200, 270.0, FlightRules::Ifr), 6000);
        assert_eq!(lowest_valid_level(4200, 90.0, FlightRules::Vfr), 5500);
    }
}
