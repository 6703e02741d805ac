// SPDX-License-Identifier: Apache-2.0
// Copyright 2024, 2026 Joe Pearson

//! Streaming AIXM 5.1 / ADR XML ingestion.
//!
//! Unlike a DOM parser, the document is never materialised as a tree: a
//! stack of open-element [`Node`]s mirrors the parser's current nesting, and
//! each element resolves its contribution to its parent through
//! [`Node::on_subelement`] the moment its closing tag is reached. An element
//! name the [`factory`] table doesn't recognise becomes an [`IgnoreNode`],
//! so ingesting a document that uses schema extensions this crate doesn't
//! model degrades gracefully rather than failing outright.

mod border;
mod factory;
mod node;
mod slices;
mod uom;

pub use border::{import_borders, BorderStats};
pub use node::{IgnoreNode, Node, Value};
pub use slices::FinishedFeature;

use crate::error::Error;
use crate::id::Uuid;
use crate::model::Body;
use crate::object::Object;
use crate::store::ObjectStore;

/// One tokenised XML event, as produced by an external tokeniser.
///
/// This crate never parses XML itself: a SAX-style tokeniser owned outside
/// this crate (the sibling `adr-xml` crate's `quick-xml`-based one, or any
/// other) walks the document and hands element boundaries, attributes and
/// character data across this one narrow seam. Namespace prefixes are
/// expected to already be stripped from `name`/attribute keys by whatever
/// produced the event.
pub enum XmlEvent {
    /// An opening tag with children still to come.
    Start { name: String, attrs: Vec<(String, String)> },
    /// A self-closing tag (`<foo/>`); equivalent to `Start` immediately
    /// followed by `End` but kept distinct so the dispatcher doesn't have to
    /// track which `Start`s are still awaiting their `End`.
    Empty { name: String, attrs: Vec<(String, String)> },
    /// Character data within the current element.
    Text(String),
    /// The closing tag of the innermost still-open element.
    End,
}

/// Tally of an [`import_xml`] run.
#[derive(Copy, Clone, Default, Debug)]
pub struct ImportStats {
    /// Objects staged into the store's temp partition.
    pub objects: usize,
    /// Time-slices discarded because they overlapped an existing one of the
    /// same interpretation, or referenced a variant mismatching the rest of
    /// their feature.
    pub warnings: usize,
}

/// Consumes a stream of already-tokenised [`XmlEvent`]s and stages every
/// feature it describes into `store`'s temp partition via
/// [`ObjectStore::save_temp`].
///
/// `imported_at` becomes every staged slice's `modified` timestamp --
/// callers pass their own clock reading rather than this function reaching
/// for one, so a batch of documents can be imported with a single
/// consistent timestamp and so tests are reproducible.
pub fn import_xml<I>(store: &ObjectStore, events: I, imported_at: i64) -> Result<ImportStats, Error>
where
    I: IntoIterator<Item = Result<XmlEvent, Error>>,
{
    let mut stack: Vec<(String, Box<dyn Node>)> = Vec::new();
    let mut stats = ImportStats::default();

    for event in events {
        match event? {
            XmlEvent::Start { name, attrs } => {
                let mut node = factory::make_node(&name);
                for (key, value) in &attrs {
                    node.on_attribute(key, value);
                }
                stack.push((name, node));
            }
            XmlEvent::Empty { name, attrs } => {
                let mut node = factory::make_node(&name);
                for (key, value) in &attrs {
                    node.on_attribute(key, value);
                }
                let value = node.finish();
                dispatch(store, &mut stack, &name, value, imported_at, &mut stats)?;
            }
            XmlEvent::Text(text) => {
                if let Some((_, node)) = stack.last_mut() {
                    node.on_text(&text);
                }
            }
            XmlEvent::End => {
                let Some((name, node)) = stack.pop() else {
                    continue;
                };
                let value = node.finish();
                dispatch(store, &mut stack, &name, value, imported_at, &mut stats)?;
            }
        }
    }

    Ok(stats)
}

/// Integrates a just-closed element's value into its parent, or -- for
/// `message:hasMember`, the one element whose parent is the document root
/// this crate has no node for -- stages the finished feature into the
/// store.
fn dispatch(
    store: &ObjectStore,
    stack: &mut [(String, Box<dyn Node>)],
    name: &str,
    value: Value,
    imported_at: i64,
    stats: &mut ImportStats,
) -> Result<(), Error> {
    if name == "hasMember" {
        if let Some(feature) = value.downcast::<FinishedFeature>() {
            save_feature(store, feature, imported_at, stats)?;
        }
        return Ok(());
    }
    if let Some((_, parent)) = stack.last_mut() {
        parent.on_subelement(name, value)?;
    }
    Ok(())
}

fn save_feature(
    store: &ObjectStore,
    feature: FinishedFeature,
    imported_at: i64,
    stats: &mut ImportStats,
) -> Result<(), Error> {
    if feature.slices.is_empty() {
        return Ok(());
    }

    let uuid = feature.identifier.unwrap_or_else(|| synthesize_uuid(&feature));
    let mut object = Object::new(uuid, feature.kind);
    for mut slice in feature.slices {
        slice.header.modified = imported_at;
        if let Err(e) = object.add_timeslice(slice) {
            log::warn!("discarding time-slice for {uuid}: {e}");
            stats.warnings += 1;
        }
    }
    if object.slices().is_empty() {
        return Ok(());
    }

    store.save_temp(object)?;
    stats.objects += 1;
    Ok(())
}

/// Synthesises a stable identifier for a feature that arrived with no
/// `gml:identifier`, keyed off its own natural identifying field rather than
/// any enclosing parent, since nothing at this point in the ingestion
/// pipeline has a more meaningful owner UUID to hash against.
fn synthesize_uuid(feature: &FinishedFeature) -> Uuid {
    let discriminator = feature
        .slices
        .first()
        .map(|slice| natural_discriminator(&slice.body))
        .unwrap_or_default();
    Uuid::from_namespace(Uuid::NIL, &discriminator)
}

fn natural_discriminator(body: &Body) -> String {
    match body {
        Body::Airport(a) => a.common.ident.clone(),
        Body::Navaid(n) => n.common.ident.clone(),
        Body::DesignatedPoint(p) => p.common.ident.clone(),
        Body::Airspace(a) => a.ident.clone(),
        Body::FlightRestriction(r) => r.ident.clone(),
        Body::RouteSegment(s) => format!("{}-{}-{}", s.start.uuid(), s.end.uuid(), s.route.uuid()),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ObjectStore;

    // These hand-build the tokenised event stream a SAX-style tokeniser
    // would otherwise produce from the equivalent AIXM XML, so the
    // dispatcher's own logic is exercised without this crate touching XML
    // itself; see the `adr-xml` crate for coverage of the actual byte-level
    // tokenising.

    fn start(name: &str) -> Result<XmlEvent, Error> {
        Ok(XmlEvent::Start { name: name.to_string(), attrs: Vec::new() })
    }

    fn empty(name: &str, attrs: &[(&str, &str)]) -> Result<XmlEvent, Error> {
        Ok(XmlEvent::Empty {
            name: name.to_string(),
            attrs: attrs.iter().map(|&(k, v)| (k.to_string(), v.to_string())).collect(),
        })
    }

    fn text(s: &str) -> Result<XmlEvent, Error> {
        Ok(XmlEvent::Text(s.to_string()))
    }

    fn end() -> Result<XmlEvent, Error> {
        Ok(XmlEvent::End)
    }

    #[test]
    fn imports_airport_with_explicit_identifier() {
        let events = vec![
            start("AIXMBasicMessage"),
            start("hasMember"),
            start("AirportHeliport"),
            start("identifier"),
            text("dd062d88-3e64-4a5d-bebd-89476db9ebea"),
            end(),
            start("timeSlice"),
            start("AirportHeliportTimeSlice"),
            start("validTime"),
            start("TimePeriod"),
            start("beginPosition"),
            text("2009-01-01T00:00:00Z"),
            end(),
            empty("endPosition", &[("indeterminatePosition", "unknown")]),
            end(), // TimePeriod
            end(), // validTime
            start("interpretation"),
            text("BASELINE"),
            end(),
            start("designator"),
            text("EADH"),
            end(),
            start("name"),
            text("WROCLAW"),
            end(),
            start("locationIndicatorICAO"),
            text("EADH"),
            end(),
            start("ARP"),
            start("ElevatedPoint"),
            start("pos"),
            text("51.1027777778 16.8858333333"),
            end(),
            start("elevation"),
            text("404"),
            end(),
            end(), // ElevatedPoint
            end(), // ARP
            end(), // AirportHeliportTimeSlice
            end(), // timeSlice
            end(), // AirportHeliport
            end(), // hasMember
            end(), // AIXMBasicMessage
        ];

        let store = ObjectStore::in_memory();
        let stats = import_xml(&store, events, 1_000).unwrap();
        assert_eq!(stats.objects, 1);
        assert_eq!(stats.warnings, 0);

        let uuid: Uuid = "dd062d88-3e64-4a5d-bebd-89476db9ebea".parse().unwrap();
        let object = store.load(uuid).unwrap().expect("staged object loads");
        let Body::Airport(airport) = object.latest_body().unwrap() else {
            panic!("expected an airport body");
        };
        assert_eq!(airport.common.ident, "EADH");
        assert_eq!(airport.common.elevation_ft, 404);
    }

    #[test]
    fn unknown_elements_are_ignored_without_error() {
        let events = vec![
            start("AIXMBasicMessage"),
            start("hasMember"),
            start("notAFeature"),
            empty("stillNotAFeature", &[]),
            end(), // notAFeature
            end(), // hasMember
            end(), // AIXMBasicMessage
        ];

        let store = ObjectStore::in_memory();
        let stats = import_xml(&store, events, 0).unwrap();
        assert_eq!(stats.objects, 0);
    }
}
