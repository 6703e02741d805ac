// SPDX-License-Identifier: Apache-2.0
// Copyright 2024, 2026 Joe Pearson

//! Structured node implementations: one per AIXM element this ingestion
//! path models, from a feature's outer wrapper down to a polygon ring's
//! coordinate list.

use crate::error::Error;
use crate::geom::{AltLimit, AltMode, AltRange, MultiPolygonHole, Point, PolygonHole, Ring};
use crate::id::{Link, Uuid};
use crate::model::{
    Airport, Airspace, AirspaceType, Component, ComponentGeometry, ComponentOperator,
    DesignatedPoint, FlightRestriction, Navaid, NavaidKind, PointCommon, PointFlags,
    ProcessingIndicator, RestrictionKind, RouteSegment, VariantKind,
};
use crate::model::{Availability, CdrClass, Direction, SegmentStatus};
use crate::model::{Body, Condition, TimeSlice};
use crate::time::{Interpretation, TimeTable, Validity};
use crate::time::SliceHeader;

use super::node::{Measure, Node, TimeBound, Value};

/// What a concrete `XxxTimeSlice` node produces: the common header plus the
/// variant body, ready to attach to an [`Object`](crate::object::Object).
pub struct TimeSliceResult {
    pub header: SliceHeader,
    pub body: Body,
}

/// The feature that a [`super::factory`] entry for e.g. `AirportHeliport`
/// builds: collects `gml:identifier` plus every `aixm:timeSlice`.
pub struct FeatureNode {
    kind: VariantKind,
    identifier: Option<Uuid>,
    slices: Vec<TimeSlice>,
}

impl FeatureNode {
    pub fn new(kind: VariantKind) -> Self {
        Self {
            kind,
            identifier: None,
            slices: Vec::new(),
        }
    }
}

impl Node for FeatureNode {
    fn on_subelement(&mut self, name: &str, value: Value) -> Result<(), Error> {
        match name {
            "identifier" => {
                if let Some(s) = value.into_text() {
                    self.identifier = s.trim().parse().ok();
                }
            }
            "timeSlice" => {
                if let Some(result) = value.downcast::<TimeSliceResult>() {
                    if result.body.kind() != self.kind {
                        return Err(Error::structural(format!(
                            "feature declared as {:?} but its time-slice is {:?}",
                            self.kind,
                            result.body.kind()
                        )));
                    }
                    self.slices.push(TimeSlice::new(result.header, result.body));
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn finish(self: Box<Self>) -> Value {
        Value::Node(Box::new(FinishedFeature {
            kind: self.kind,
            identifier: self.identifier,
            slices: self.slices,
        }))
    }
}

/// A fully parsed feature, staged by the [`super`] driver into the store's
/// temp partition once a UUID has been assigned.
pub struct FinishedFeature {
    pub kind: VariantKind,
    pub identifier: Option<Uuid>,
    pub slices: Vec<TimeSlice>,
}

fn parse_interpretation(s: &str) -> Interpretation {
    match s.trim() {
        "PERMDELTA" => Interpretation::PermDelta,
        "TEMPDELTA" => Interpretation::TempDelta,
        _ => Interpretation::Baseline,
    }
}

fn parse_validity(bound: Option<TimeBound>) -> Option<i64> {
    let bound = bound?;
    if bound.indeterminate.is_some() {
        return None;
    }
    chrono::DateTime::parse_from_rfc3339(bound.text.trim())
        .ok()
        .map(|dt| dt.timestamp())
}

fn parse_pos(text: &str) -> Option<Point> {
    let mut parts = text.split_whitespace();
    let lat: f64 = parts.next()?.parse().ok()?;
    let lon: f64 = parts.next()?.parse().ok()?;
    Some(Point::new(lat, lon))
}

/// `gml:TimePeriod`: resolves to [`Validity`], `i64::MIN`/`MAX` standing in
/// for an indeterminate bound.
#[derive(Default)]
pub struct TimePeriodNode {
    begin: Option<TimeBound>,
    end: Option<TimeBound>,
}

impl Node for TimePeriodNode {
    fn on_subelement(&mut self, name: &str, value: Value) -> Result<(), Error> {
        match name {
            "beginPosition" => self.begin = value.downcast::<TimeBound>(),
            "endPosition" => self.end = value.downcast::<TimeBound>(),
            _ => {}
        }
        Ok(())
    }

    fn finish(self: Box<Self>) -> Value {
        let start = parse_validity(self.begin).unwrap_or(i64::MIN);
        let end = parse_validity(self.end).unwrap_or(i64::MAX);
        Value::Node(Box::new(Validity::new(start, end)))
    }
}

/// `aixm:ElevatedPoint`: a coordinate plus optional elevation.
#[derive(Default)]
pub struct ElevatedPointNode {
    point: Option<Point>,
    elevation_ft: Option<i32>,
}

impl Node for ElevatedPointNode {
    fn on_subelement(&mut self, name: &str, value: Value) -> Result<(), Error> {
        match name {
            "pos" => {
                if let Some(text) = value.into_text() {
                    self.point = parse_pos(&text);
                }
            }
            "elevation" => {
                if let Some(m) = value.downcast::<Measure>() {
                    self.elevation_ft = m.feet();
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn finish(self: Box<Self>) -> Value {
        Value::Node(Box::new(ElevatedPointResult {
            point: self.point.unwrap_or_default(),
            elevation_ft: self.elevation_ft,
        }))
    }
}

pub struct ElevatedPointResult {
    pub point: Point,
    pub elevation_ft: Option<i32>,
}

/// `aixm:AirportHeliportTimeSlice`.
#[derive(Default)]
pub struct AirportTimeSliceNode {
    interpretation: Interpretation,
    validity: Option<Validity>,
    ident: String,
    name: String,
    icao: Option<String>,
    point: Point,
    elevation_ft: i32,
}

impl Node for AirportTimeSliceNode {
    fn on_subelement(&mut self, name: &str, value: Value) -> Result<(), Error> {
        match name {
            "interpretation" => {
                if let Some(s) = value.into_text() {
                    self.interpretation = parse_interpretation(&s);
                }
            }
            "validTime" => self.validity = value.downcast::<Validity>(),
            "designator" => {
                if let Some(s) = value.into_text() {
                    self.ident = s;
                }
            }
            "name" => {
                if let Some(s) = value.into_text() {
                    self.name = s;
                }
            }
            "locationIndicatorICAO" => self.icao = value.into_text(),
            "ARP" => {
                if let Some(r) = value.downcast::<ElevatedPointResult>() {
                    self.point = r.point;
                    if let Some(e) = r.elevation_ft {
                        self.elevation_ft = e;
                    }
                }
            }
            "fieldElevation" => {
                if let Some(m) = value.downcast::<Measure>() {
                    if let Some(ft) = m.feet() {
                        self.elevation_ft = ft;
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn finish(self: Box<Self>) -> Value {
        let mut common = PointCommon::new(self.ident, self.name, self.point);
        common.elevation_ft = self.elevation_ft;
        if let Some(icao) = self.icao {
            common.flags |= PointFlags::ICAO;
            common.icao_code = Some(icao);
        }
        let header = SliceHeader::new(
            self.validity.unwrap_or(Validity::UNBOUNDED),
            0,
            self.interpretation,
        );
        Value::Node(Box::new(TimeSliceResult {
            header,
            body: Body::Airport(Airport { common }),
        }))
    }
}

fn parse_navaid_kind(s: &str) -> NavaidKind {
    match s.trim() {
        "VOR" => NavaidKind::Vor,
        "NDB" => NavaidKind::Ndb,
        "DME" => NavaidKind::Dme,
        "TACAN" => NavaidKind::Tacan,
        _ => NavaidKind::VorDme,
    }
}

/// `aixm:NavaidTimeSlice`.
#[derive(Default)]
pub struct NavaidTimeSliceNode {
    interpretation: Interpretation,
    validity: Option<Validity>,
    ident: String,
    name: String,
    navaid_kind: Option<NavaidKind>,
    point: Point,
    elevation_ft: i32,
}

impl Node for NavaidTimeSliceNode {
    fn on_subelement(&mut self, name: &str, value: Value) -> Result<(), Error> {
        match name {
            "interpretation" => {
                if let Some(s) = value.into_text() {
                    self.interpretation = parse_interpretation(&s);
                }
            }
            "validTime" => self.validity = value.downcast::<Validity>(),
            "designator" => {
                if let Some(s) = value.into_text() {
                    self.ident = s;
                }
            }
            "name" => {
                if let Some(s) = value.into_text() {
                    self.name = s;
                }
            }
            "type" => {
                if let Some(s) = value.into_text() {
                    self.navaid_kind = Some(parse_navaid_kind(&s));
                }
            }
            "location" => {
                if let Some(r) = value.downcast::<ElevatedPointResult>() {
                    self.point = r.point;
                    if let Some(e) = r.elevation_ft {
                        self.elevation_ft = e;
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn finish(self: Box<Self>) -> Value {
        let mut common = PointCommon::new(self.ident, self.name, self.point);
        common.elevation_ft = self.elevation_ft;
        let header = SliceHeader::new(
            self.validity.unwrap_or(Validity::UNBOUNDED),
            0,
            self.interpretation,
        );
        Value::Node(Box::new(TimeSliceResult {
            header,
            body: Body::Navaid(Navaid {
                common,
                navaid_kind: self.navaid_kind.unwrap_or(NavaidKind::VorDme),
                frequency_khz: None,
            }),
        }))
    }
}

/// `aixm:DesignatedPointTimeSlice`.
#[derive(Default)]
pub struct DesignatedPointTimeSliceNode {
    interpretation: Interpretation,
    validity: Option<Validity>,
    ident: String,
    name: String,
    point: Point,
}

impl Node for DesignatedPointTimeSliceNode {
    fn on_subelement(&mut self, name: &str, value: Value) -> Result<(), Error> {
        match name {
            "interpretation" => {
                if let Some(s) = value.into_text() {
                    self.interpretation = parse_interpretation(&s);
                }
            }
            "validTime" => self.validity = value.downcast::<Validity>(),
            "designator" => {
                if let Some(s) = value.into_text() {
                    self.ident = s.clone();
                    if self.name.is_empty() {
                        self.name = s;
                    }
                }
            }
            "name" => {
                if let Some(s) = value.into_text() {
                    self.name = s;
                }
            }
            "location" => {
                if let Some(r) = value.downcast::<ElevatedPointResult>() {
                    self.point = r.point;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn finish(self: Box<Self>) -> Value {
        let common = PointCommon::new(self.ident, self.name, self.point);
        let header = SliceHeader::new(
            self.validity.unwrap_or(Validity::UNBOUNDED),
            0,
            self.interpretation,
        );
        Value::Node(Box::new(TimeSliceResult {
            header,
            body: Body::DesignatedPoint(DesignatedPoint { common }),
        }))
    }
}

/// `gml:GeodesicString`: resolves `gml:posList` into a point sequence.
#[derive(Default)]
pub struct GeodesicStringNode(Vec<Point>);

impl Node for GeodesicStringNode {
    fn on_subelement(&mut self, name: &str, value: Value) -> Result<(), Error> {
        if name == "posList" {
            if let Some(text) = value.into_text() {
                let numbers: Vec<f64> = text.split_whitespace().filter_map(|s| s.parse().ok()).collect();
                self.0 = numbers.chunks_exact(2).map(|c| Point::new(c[0], c[1])).collect();
            }
        }
        Ok(())
    }

    fn finish(self: Box<Self>) -> Value {
        Value::Node(Box::new(self.0))
    }
}

/// `gml:Ring`: one or more `curveMember`s, each contributing a point run.
#[derive(Default)]
pub struct RingNode(Ring);

impl Node for RingNode {
    fn on_subelement(&mut self, name: &str, value: Value) -> Result<(), Error> {
        if name == "curveMember" {
            if let Some(points) = value.downcast::<Vec<Point>>() {
                for pt in points {
                    self.0.push_point(pt);
                }
            }
        }
        Ok(())
    }

    fn finish(self: Box<Self>) -> Value {
        Value::Node(Box::new(self.0))
    }
}

/// `gml:PolygonPatch`: an exterior ring, no holes (AIXM interiors are rare
/// enough in practice that supporting them is left for when a real feed
/// needs it).
#[derive(Default)]
pub struct PolygonPatchNode(Option<Ring>);

impl Node for PolygonPatchNode {
    fn on_subelement(&mut self, name: &str, value: Value) -> Result<(), Error> {
        if name == "exterior" {
            self.0 = value.downcast::<Ring>();
        }
        Ok(())
    }

    fn finish(self: Box<Self>) -> Value {
        Value::Node(Box::new(PolygonHole::new(self.0.unwrap_or_default())))
    }
}

/// `aixm:Surface`: one or more patches unioned into a [`MultiPolygonHole`].
#[derive(Default)]
pub struct SurfaceNode(MultiPolygonHole);

impl Node for SurfaceNode {
    fn on_subelement(&mut self, name: &str, value: Value) -> Result<(), Error> {
        if name == "patches" {
            if let Some(polygon) = value.downcast::<PolygonHole>() {
                self.0.push(polygon);
            }
        }
        Ok(())
    }

    fn finish(self: Box<Self>) -> Value {
        Value::Node(Box::new(self.0))
    }
}

fn build_alt_limit(measure: &Option<Measure>, reference: &Option<String>, default: AltLimit) -> AltLimit {
    let Some(m) = measure else {
        return default;
    };
    match m.text.trim().to_ascii_uppercase().as_str() {
        "GND" | "SFC" => AltLimit::GND,
        "UNL" => AltLimit::UNL,
        _ => {
            let value = m.feet().unwrap_or(default.value);
            let mode = match reference.as_deref() {
                Some("STD") => AltMode::Std,
                _ => AltMode::Qnh,
            };
            AltLimit::new(mode, value)
        }
    }
}

/// `aixm:AirspaceVolume`: an altitude band plus its horizontal projection.
#[derive(Default)]
pub struct VolumeNode {
    upper: Option<Measure>,
    upper_ref: Option<String>,
    lower: Option<Measure>,
    lower_ref: Option<String>,
    geometry: Option<MultiPolygonHole>,
}

impl Node for VolumeNode {
    fn on_subelement(&mut self, name: &str, value: Value) -> Result<(), Error> {
        match name {
            "upperLimit" => self.upper = value.downcast::<Measure>(),
            "upperLimitReference" => self.upper_ref = value.into_text(),
            "lowerLimit" => self.lower = value.downcast::<Measure>(),
            "lowerLimitReference" => self.lower_ref = value.into_text(),
            "horizontalProjection" => self.geometry = value.downcast::<MultiPolygonHole>(),
            _ => {}
        }
        Ok(())
    }

    fn finish(self: Box<Self>) -> Value {
        let lower = build_alt_limit(&self.lower, &self.lower_ref, AltLimit::GND);
        let upper = build_alt_limit(&self.upper, &self.upper_ref, AltLimit::UNL);
        Value::Node(Box::new(VolumeResult {
            alt_range: AltRange::new(lower, upper),
            geometry: self.geometry.unwrap_or_default(),
        }))
    }
}

pub struct VolumeResult {
    pub alt_range: AltRange,
    pub geometry: MultiPolygonHole,
}

/// `aixm:AirspaceGeometryComponent`: a volume plus how it combines with the
/// components before it.
#[derive(Default)]
pub struct GeometryComponentNode {
    operation: Option<String>,
    volume: Option<VolumeResult>,
}

impl Node for GeometryComponentNode {
    fn on_subelement(&mut self, name: &str, value: Value) -> Result<(), Error> {
        match name {
            "operation" => self.operation = value.into_text(),
            "theAirspaceVolume" => self.volume = value.downcast::<VolumeResult>(),
            _ => {}
        }
        Ok(())
    }

    fn finish(self: Box<Self>) -> Value {
        let operator = match self.operation.as_deref() {
            Some("UNION") => ComponentOperator::Union,
            _ => ComponentOperator::Base,
        };
        let volume = self.volume.unwrap_or(VolumeResult {
            alt_range: AltRange::UNL,
            geometry: MultiPolygonHole::new(),
        });
        Value::Node(Box::new(Component {
            operator,
            geometry: ComponentGeometry::Polygon(volume.geometry),
            alt_range: volume.alt_range,
        }))
    }
}

fn parse_airspace_type(s: &str) -> AirspaceType {
    match s.trim() {
        "FIR" => AirspaceType::Fir,
        "UIR" => AirspaceType::Uir,
        "CTA" => AirspaceType::Cta,
        "TMA" => AirspaceType::Tma,
        "CTR" => AirspaceType::Ctr,
        "ATZ" => AirspaceType::Atz,
        "TRA" => AirspaceType::Tra,
        "TSA" => AirspaceType::Tsa,
        "D" => AirspaceType::Danger,
        "R" => AirspaceType::Restricted,
        "P" => AirspaceType::Prohibited,
        "FRA" => AirspaceType::Fra,
        other if other.len() == 1 => AirspaceType::Class(other.chars().next().unwrap()),
        _ => AirspaceType::Other(0),
    }
}

/// `aixm:AirspaceTimeSlice`.
#[derive(Default)]
pub struct AirspaceTimeSliceNode {
    interpretation: Interpretation,
    validity: Option<Validity>,
    ident: String,
    name: String,
    airspace_type: Option<AirspaceType>,
    components: Vec<Component>,
}

impl Node for AirspaceTimeSliceNode {
    fn on_subelement(&mut self, name: &str, value: Value) -> Result<(), Error> {
        match name {
            "interpretation" => {
                if let Some(s) = value.into_text() {
                    self.interpretation = parse_interpretation(&s);
                }
            }
            "validTime" => self.validity = value.downcast::<Validity>(),
            "designator" => {
                if let Some(s) = value.into_text() {
                    self.ident = s;
                }
            }
            "name" => {
                if let Some(s) = value.into_text() {
                    self.name = s;
                }
            }
            "type" => {
                if let Some(s) = value.into_text() {
                    self.airspace_type = Some(parse_airspace_type(&s));
                }
            }
            "geometryComponent" => {
                if let Some(component) = value.downcast::<Component>() {
                    self.components.push(component);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn finish(self: Box<Self>) -> Value {
        let mut airspace = Airspace::new(
            self.ident,
            self.name,
            self.airspace_type.unwrap_or(AirspaceType::Other(0)),
        );
        airspace.components = self.components;
        let header = SliceHeader::new(
            self.validity.unwrap_or(Validity::UNBOUNDED),
            0,
            self.interpretation,
        );
        Value::Node(Box::new(TimeSliceResult {
            header,
            body: Body::Airspace(Box::new(airspace)),
        }))
    }
}

/// `adr:RouteSegmentTimeSlice`: the ADR schema extension isn't part of any
/// corpus this crate draws on, so the element names below are this crate's
/// own, chosen to mirror AIXM's own `xlink:href` convention.
#[derive(Default)]
pub struct RouteSegmentTimeSliceNode {
    interpretation: Interpretation,
    validity: Option<Validity>,
    start: Option<Uuid>,
    end: Option<Uuid>,
    route: Option<Uuid>,
}

impl Node for RouteSegmentTimeSliceNode {
    fn on_subelement(&mut self, name: &str, value: Value) -> Result<(), Error> {
        match name {
            "interpretation" => {
                if let Some(s) = value.into_text() {
                    self.interpretation = parse_interpretation(&s);
                }
            }
            "validTime" => self.validity = value.downcast::<Validity>(),
            "start" => self.start = value.into_link(),
            "end" => self.end = value.into_link(),
            "route" => self.route = value.into_link(),
            _ => {}
        }
        Ok(())
    }

    fn finish(self: Box<Self>) -> Value {
        let segment = RouteSegment {
            start: Link::new(self.start.unwrap_or(Uuid::NIL)),
            end: Link::new(self.end.unwrap_or(Uuid::NIL)),
            route: Link::new(self.route.unwrap_or(Uuid::NIL)),
            alt_range: AltRange::UNL,
            availability: vec![Availability {
                status: SegmentStatus::Open,
                direction: Direction::BOTH,
                alt_range: AltRange::UNL,
                discrete_levels: None,
                cdr_class: CdrClass::None,
                timetable: TimeTable::new(),
            }],
        };
        let header = SliceHeader::new(
            self.validity.unwrap_or(Validity::UNBOUNDED),
            0,
            self.interpretation,
        );
        Value::Node(Box::new(TimeSliceResult {
            header,
            body: Body::RouteSegment(Box::new(segment)),
        }))
    }
}

fn parse_restriction_kind(s: &str) -> RestrictionKind {
    match s.trim() {
        "FORBIDDEN" => RestrictionKind::Forbidden,
        "CLOSED" => RestrictionKind::Closed,
        "ALLOWED" => RestrictionKind::Allowed,
        _ => RestrictionKind::Mandatory,
    }
}

/// `adr:FlightRestrictionTimeSlice`, likewise this crate's own element
/// naming: it stages a single `CrossingAirspace1` leaf from the rule's
/// regulated airspace, which is enough to make an ingested rule fire --
/// richer condition trees are built directly in the flight-plan evaluator's
/// own tests rather than round-tripped through XML here.
#[derive(Default)]
pub struct FlightRestrictionTimeSliceNode {
    interpretation: Interpretation,
    validity: Option<Validity>,
    ident: String,
    kind: Option<RestrictionKind>,
    regulated_airspace: Option<Uuid>,
}

impl Node for FlightRestrictionTimeSliceNode {
    fn on_subelement(&mut self, name: &str, value: Value) -> Result<(), Error> {
        match name {
            "interpretation" => {
                if let Some(s) = value.into_text() {
                    self.interpretation = parse_interpretation(&s);
                }
            }
            "validTime" => self.validity = value.downcast::<Validity>(),
            "designator" => {
                if let Some(s) = value.into_text() {
                    self.ident = s;
                }
            }
            "type" => {
                if let Some(s) = value.into_text() {
                    self.kind = Some(parse_restriction_kind(&s));
                }
            }
            "regulatedAirspace" => self.regulated_airspace = value.into_link(),
            _ => {}
        }
        Ok(())
    }

    fn finish(self: Box<Self>) -> Value {
        let condition = match self.regulated_airspace {
            Some(uuid) => Condition::CrossingAirspace1 {
                airspace: Link::new(uuid),
                alt_range: AltRange::UNL,
                reference_location: true,
            },
            None => Condition::Constant(false),
        };
        let mut restriction =
            FlightRestriction::new(self.ident, self.kind.unwrap_or(RestrictionKind::Mandatory), condition);
        restriction.processing_indicator = ProcessingIndicator::FlightProperty;
        let header = SliceHeader::new(
            self.validity.unwrap_or(Validity::UNBOUNDED),
            0,
            self.interpretation,
        );
        Value::Node(Box::new(TimeSliceResult {
            header,
            body: Body::FlightRestriction(Box::new(restriction)),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geodesic_string_parses_pos_list_pairs() {
        let mut node = GeodesicStringNode::default();
        node.on_subelement("posList", Value::Text("52.0 -32.0 52.5 -31.5".into())).unwrap();
        let points: Vec<Point> = Box::new(node).finish().downcast().unwrap();
        assert_eq!(points.len(), 2);
        assert!((points[0].lat_deg() - 52.0).abs() < 1e-6);
    }

    #[test]
    fn airspace_type_maps_known_codes() {
        assert_eq!(parse_airspace_type("CTR"), AirspaceType::Ctr);
        assert!(matches!(parse_airspace_type("C"), AirspaceType::Class('C')));
    }
}
