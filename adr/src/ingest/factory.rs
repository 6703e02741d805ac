// SPDX-License-Identifier: Apache-2.0
// Copyright 2024, 2026 Joe Pearson

//! The name-keyed table the dispatcher consults on every `Event::Start` to
//! decide what kind of [`Node`] an element opens.

use super::node::{IgnoreNode, LinkNode, MeasureNode, Node, PassthroughNode, TextNode, TimeBoundNode};
use super::slices::{
    AirportTimeSliceNode, AirspaceTimeSliceNode, DesignatedPointTimeSliceNode, ElevatedPointNode,
    FeatureNode, FlightRestrictionTimeSliceNode, GeodesicStringNode, GeometryComponentNode,
    NavaidTimeSliceNode, PolygonPatchNode, RingNode, RouteSegmentTimeSliceNode, SurfaceNode,
    TimePeriodNode, VolumeNode,
};
use crate::model::VariantKind;

/// What the factory table says about a local element name: either a
/// constructor for the node that should open, or [`None`] for an
/// unrecognised name, which becomes an [`IgnoreNode`].
pub type Constructor = fn() -> Box<dyn Node>;

/// The element table, sorted by name for [`element_kind`]'s binary search.
/// ASCII sorts capitalised feature/type names before the all-lowercase
/// leaf/wrapper names, which is why the two runs look out of alphabetical
/// order at a glance -- they're each sorted within their own case class.
const TABLE: &[(&str, Constructor)] = &[
    ("ARP", || Box::new(PassthroughNode::default())),
    ("AirportHeliport", || Box::new(FeatureNode::new(VariantKind::Airport))),
    ("AirportHeliportTimeSlice", || Box::new(AirportTimeSliceNode::default())),
    ("Airspace", || Box::new(FeatureNode::new(VariantKind::Airspace))),
    ("AirspaceGeometryComponent", || Box::new(GeometryComponentNode::default())),
    ("AirspaceTimeSlice", || Box::new(AirspaceTimeSliceNode::default())),
    ("AirspaceVolume", || Box::new(VolumeNode::default())),
    ("Curve", || Box::new(PassthroughNode::default())),
    ("DesignatedPoint", || Box::new(FeatureNode::new(VariantKind::DesignatedPoint))),
    ("DesignatedPointTimeSlice", || Box::new(DesignatedPointTimeSliceNode::default())),
    ("ElevatedPoint", || Box::new(ElevatedPointNode::default())),
    ("FlightRestriction", || Box::new(FeatureNode::new(VariantKind::FlightRestriction))),
    ("FlightRestrictionTimeSlice", || Box::new(FlightRestrictionTimeSliceNode::default())),
    ("GeodesicString", || Box::new(GeodesicStringNode::default())),
    ("Navaid", || Box::new(FeatureNode::new(VariantKind::Navaid))),
    ("NavaidTimeSlice", || Box::new(NavaidTimeSliceNode::default())),
    ("PolygonPatch", || Box::new(PolygonPatchNode::default())),
    ("Ring", || Box::new(RingNode::default())),
    ("RouteSegment", || Box::new(FeatureNode::new(VariantKind::RouteSegment))),
    ("RouteSegmentTimeSlice", || Box::new(RouteSegmentTimeSliceNode::default())),
    ("Surface", || Box::new(SurfaceNode::default())),
    ("TimePeriod", || Box::new(TimePeriodNode::default())),
    ("beginPosition", || Box::new(TimeBoundNode::default())),
    ("curveMember", || Box::new(PassthroughNode::default())),
    ("designator", || Box::new(TextNode::default())),
    ("elevation", || Box::new(MeasureNode::default())),
    ("end", || Box::new(LinkNode::default())),
    ("endPosition", || Box::new(TimeBoundNode::default())),
    ("exterior", || Box::new(PassthroughNode::default())),
    ("fieldElevation", || Box::new(MeasureNode::default())),
    ("hasMember", || Box::new(PassthroughNode::default())),
    ("horizontalProjection", || Box::new(PassthroughNode::default())),
    ("identifier", || Box::new(TextNode::default())),
    ("interpretation", || Box::new(TextNode::default())),
    ("location", || Box::new(PassthroughNode::default())),
    ("locationIndicatorICAO", || Box::new(TextNode::default())),
    ("lowerLimit", || Box::new(MeasureNode::default())),
    ("lowerLimitReference", || Box::new(TextNode::default())),
    ("name", || Box::new(TextNode::default())),
    ("operation", || Box::new(TextNode::default())),
    ("patches", || Box::new(PassthroughNode::default())),
    ("pos", || Box::new(TextNode::default())),
    ("posList", || Box::new(TextNode::default())),
    ("regulatedAirspace", || Box::new(LinkNode::default())),
    ("route", || Box::new(LinkNode::default())),
    ("segments", || Box::new(PassthroughNode::default())),
    ("start", || Box::new(LinkNode::default())),
    ("theAirspaceVolume", || Box::new(PassthroughNode::default())),
    ("timeSlice", || Box::new(PassthroughNode::default())),
    ("type", || Box::new(TextNode::default())),
    ("upperLimit", || Box::new(MeasureNode::default())),
    ("upperLimitReference", || Box::new(TextNode::default())),
    ("validTime", || Box::new(PassthroughNode::default())),
];

/// Constructs the node that should open for a local (namespace-stripped)
/// element name, defaulting unrecognised names to [`IgnoreNode`].
pub fn make_node(name: &str) -> Box<dyn Node> {
    match TABLE.binary_search_by_key(&name, |(key, _)| *key) {
        Ok(index) => (TABLE[index].1)(),
        Err(_) => Box::new(IgnoreNode),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_stays_sorted_by_name() {
        for pair in TABLE.windows(2) {
            assert!(
                pair[0].0 < pair[1].0,
                "table out of order: {:?} should come after {:?}",
                pair[0].0,
                pair[1].0
            );
        }
    }

    #[test]
    fn unknown_name_ignores() {
        let node = make_node("bogusElement");
        assert!(matches!(node.finish(), super::super::node::Value::Ignore));
    }
}
