// SPDX-License-Identifier: Apache-2.0
// Copyright 2024, 2026 Joe Pearson

//! `quick-xml` tokeniser feeding [`adr::ingest::import_xml`].
//!
//! `adr` itself never depends on an XML library: its ingestion dispatcher
//! consumes a stream of already-tokenised [`adr::ingest::XmlEvent`]s through
//! a narrow callback interface. This crate is the tokeniser -- it walks an
//! AIXM/ADR XML byte slice with `quick-xml` and turns each event into the
//! form the dispatcher expects, stripping namespace prefixes along the way.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use adr::error::Error;
use adr::ingest::{import_xml, ImportStats, XmlEvent};
use adr::store::ObjectStore;

/// Tokenises `data` and stages every feature it contains into `store`'s
/// temp partition. See [`adr::ingest::import_xml`] for the semantics of
/// `imported_at` and the returned stats.
pub fn import_xml_bytes(store: &ObjectStore, data: &[u8], imported_at: i64) -> Result<ImportStats, Error> {
    import_xml(store, Events::new(data), imported_at)
}

/// Streaming adapter from a `quick-xml` byte reader to [`XmlEvent`].
struct Events<'a> {
    reader: Reader<&'a [u8]>,
    buf: Vec<u8>,
}

impl<'a> Events<'a> {
    fn new(data: &'a [u8]) -> Self {
        let mut reader = Reader::from_reader(data);
        reader.config_mut().trim_text(true);
        Self { reader, buf: Vec::new() }
    }

    fn start_event(&self, start: &BytesStart, empty: bool) -> Result<XmlEvent, Error> {
        let name = local_name(start.name().as_ref());
        let mut attrs = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| Error::structural(format!("XML attribute error: {e}")))?;
            let key = local_name(attr.key.as_ref());
            let value = attr
                .decode_and_unescape_value(self.reader.decoder())
                .map_err(|e| Error::structural(format!("XML attribute value error: {e}")))?
                .into_owned();
            attrs.push((key, value));
        }
        Ok(if empty {
            XmlEvent::Empty { name, attrs }
        } else {
            XmlEvent::Start { name, attrs }
        })
    }
}

impl<'a> Iterator for Events<'a> {
    type Item = Result<XmlEvent, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            let event = match self.reader.read_event_into(&mut self.buf) {
                Ok(event) => event,
                Err(e) => return Some(Err(Error::structural(format!("XML parse error: {e}")))),
            };
            return match event {
                Event::Start(start) => Some(self.start_event(&start, false)),
                Event::Empty(start) => Some(self.start_event(&start, true)),
                Event::Text(text) => match text.unescape() {
                    Ok(s) => Some(Ok(XmlEvent::Text(s.into_owned()))),
                    Err(e) => Some(Err(Error::structural(format!("XML text error: {e}")))),
                },
                Event::End(_) => Some(Ok(XmlEvent::End)),
                Event::Eof => None,
                _ => continue,
            };
        }
    }
}

/// Strips a namespace prefix (`aixm:Foo` -> `Foo`) from a raw element or
/// attribute name.
fn local_name(name: &[u8]) -> String {
    let local = name
        .iter()
        .position(|&b| b == b':')
        .map_or(name, |pos| &name[pos + 1..]);
    String::from_utf8_lossy(local).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use adr::id::Uuid;
    use adr::model::Body;

    const MESSAGE: &str = r#"<message:AIXMBasicMessage
        xmlns:aixm="http://www.aixm.aero/schema/5.1"
        xmlns:gml="http://www.opengis.net/gml/3.2"
        xmlns:message="http://www.aixm.aero/schema/5.1/message"
        xmlns:xlink="http://www.w3.org/1999/xlink">
        <message:hasMember>
            <aixm:AirportHeliport gml:id="uuid.dd062d88-3e64-4a5d-bebd-89476db9ebea">
                <gml:identifier codeSpace="urn:uuid:">dd062d88-3e64-4a5d-bebd-89476db9ebea</gml:identifier>
                <aixm:timeSlice>
                    <aixm:AirportHeliportTimeSlice gml:id="AHP_EADH">
                        <gml:validTime>
                            <gml:TimePeriod gml:id="vt1">
                                <gml:beginPosition>2009-01-01T00:00:00Z</gml:beginPosition>
                                <gml:endPosition indeterminatePosition="unknown"/>
                            </gml:TimePeriod>
                        </gml:validTime>
                        <aixm:interpretation>BASELINE</aixm:interpretation>
                        <aixm:designator>EADH</aixm:designator>
                        <aixm:name>WROCLAW</aixm:name>
                        <aixm:locationIndicatorICAO>EADH</aixm:locationIndicatorICAO>
                        <aixm:ARP>
                            <aixm:ElevatedPoint gml:id="ARP_EADH">
                                <gml:pos>51.1027777778 16.8858333333</gml:pos>
                                <aixm:elevation uom="FT">404</aixm:elevation>
                            </aixm:ElevatedPoint>
                        </aixm:ARP>
                    </aixm:AirportHeliportTimeSlice>
                </aixm:timeSlice>
            </aixm:AirportHeliport>
        </message:hasMember>
    </message:AIXMBasicMessage>"#;

    #[test]
    fn tokenises_and_imports_an_airport_feature() {
        let store = ObjectStore::in_memory();
        let stats = import_xml_bytes(&store, MESSAGE.as_bytes(), 1_000).unwrap();
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
        let xml = br#"<message:AIXMBasicMessage xmlns:message="http://www.aixm.aero/schema/5.1/message">
            <message:hasMember>
                <notAFeature><stillNotAFeature/></notAFeature>
            </message:hasMember>
        </message:AIXMBasicMessage>"#;
        let store = ObjectStore::in_memory();
        let stats = import_xml_bytes(&store, xml, 0).unwrap();
        assert_eq!(stats.objects, 0);
    }
}
