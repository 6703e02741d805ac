// SPDX-License-Identifier: Apache-2.0
// Copyright 2024, 2026 Joe Pearson

//! Country-border loading.
//!
//! This crate's dependency surface carries `geo` for geometry conversion
//! but no OGR/GDAL binding -- reading the actual shapefile is left to the
//! caller (typically the `gdal` crate's `Dataset`/`Layer` iteration), which
//! hands this module one [`BorderFeature`] per record. Everything
//! downstream of that -- name remapping, stable UUID assignment, geometry
//! conversion, and the border/composite airspace time-slices -- lives here.

use std::collections::HashMap;

use geo::{ConvexHull, Geometry};

use crate::error::Error;
use crate::geom::{AltRange, MultiPolygonHole, Point, PolygonHole, Ring};
use crate::id::{Link, Uuid};
use crate::model::{Airspace, AirspaceType, Component, ComponentGeometry, ComponentOperator, Body, VariantKind};
use crate::object::Object;
use crate::store::ObjectStore;
use crate::time::{SliceHeader, Validity};

/// One OGR feature: a country name attribute plus its geometry, already
/// decoded into `geo` types by the caller.
pub struct BorderFeature {
    pub name: String,
    pub geometry: Geometry<f64>,
}

/// Tally of an [`import_borders`] run.
#[derive(Copy, Clone, Default, Debug)]
pub struct BorderStats {
    pub borders: usize,
    pub composites: usize,
    pub duplicate_names: usize,
}

/// Source-data country names this loader has seen diverge from the
/// canonical identifier AIXM airspaces expect, mapped to that canonical
/// form. Not exhaustive -- grown as new source datasets turn up spelling
/// variants.
const COUNTRY_REMAP: &[(&str, &str)] = &[
    ("CZECH REPUBLIC", "CZECHIA"),
    ("GREAT BRITAIN", "UNITED KINGDOM"),
    ("RUSSIAN FEDERATION", "RUSSIA"),
    ("SLOVAK REPUBLIC", "SLOVAKIA"),
    ("UNITED KINGDOM OF GREAT BRITAIN AND NORTHERN IRELAND", "UNITED KINGDOM"),
    ("UNITED STATES OF AMERICA", "UNITED STATES"),
];

/// Composite-country definitions: a union of member borders, created even
/// when none of its members were present in the imported set (spec calls
/// this out explicitly so downstream rules can still reference the
/// composite by name). This list is illustrative of the union mechanism
/// rather than a complete enumeration of any real bloc's membership.
const COMPOSITES: &[(&str, &[&str])] = &[
    (
        "EU",
        &[
            "FRANCE", "GERMANY", "ITALY", "SPAIN", "POLAND", "NETHERLANDS", "BELGIUM", "AUSTRIA",
            "CZECHIA", "SLOVAKIA",
        ],
    ),
    ("UK", &["UNITED KINGDOM", "IRELAND"]),
    ("USA", &["UNITED STATES"]),
];

fn remap_country_name(raw: &str) -> String {
    let upper = raw.trim().to_ascii_uppercase();
    match COUNTRY_REMAP.iter().find(|(from, _)| *from == upper) {
        Some((_, canonical)) => canonical.to_string(),
        None => upper,
    }
}

fn convert_ring(line: &geo::LineString<f64>) -> Ring {
    let mut ring = Ring::new();
    for coord in line.coords() {
        ring.push_point(Point::new(coord.y, coord.x));
    }
    ring
}

fn convert_polygon(polygon: &geo::Polygon<f64>) -> PolygonHole {
    let mut hole = PolygonHole::new(convert_ring(polygon.exterior()));
    for interior in polygon.interiors() {
        hole.push_interior(convert_ring(interior));
    }
    hole
}

/// Converts an OGR-sourced geometry into this crate's polygon model.
/// `Polygon`/`MultiPolygon` convert directly; `GeometryCollection` recurses
/// over its members; anything else (a bare `LineString`, a `Point` cluster,
/// ...) falls back to its convex hull, since a border record with such a
/// geometry is malformed data this loader still needs to produce *some*
/// usable polygon for.
fn convert_geometry(geometry: &Geometry<f64>, out: &mut MultiPolygonHole) {
    match geometry {
        Geometry::Polygon(polygon) => out.push(convert_polygon(polygon)),
        Geometry::MultiPolygon(multi) => {
            for polygon in multi {
                out.push(convert_polygon(polygon));
            }
        }
        Geometry::GeometryCollection(collection) => {
            for member in collection {
                convert_geometry(member, out);
            }
        }
        other => out.push(convert_polygon(&other.convex_hull())),
    }
}

fn save_border_airspace(
    store: &ObjectStore,
    uuid: Uuid,
    ident: &str,
    airspace_type: AirspaceType,
    components: Vec<Component>,
    imported_at: i64,
) -> Result<(), Error> {
    let mut airspace = Airspace::new(ident, ident, airspace_type);
    airspace.components = components;
    let slice = crate::model::TimeSlice::new(
        SliceHeader::baseline(Validity::UNBOUNDED, imported_at),
        Body::Airspace(Box::new(airspace)),
    );
    let mut object = Object::new(uuid, VariantKind::Airspace);
    object.add_timeslice(slice)?;
    store.save_temp(object)
}

/// Loads country-border features into `store`, then runs the composite
/// pass over [`COMPOSITES`].
pub fn import_borders(
    store: &ObjectStore,
    features: impl IntoIterator<Item = BorderFeature>,
    imported_at: i64,
) -> Result<BorderStats, Error> {
    let mut stats = BorderStats::default();
    let mut imported: HashMap<String, Uuid> = HashMap::new();

    for feature in features {
        let canonical = remap_country_name(&feature.name);
        if imported.contains_key(&canonical) {
            log::warn!("duplicate country border name {canonical:?}, keeping the first");
            stats.duplicate_names += 1;
            continue;
        }

        let uuid = Uuid::from_countryborder(&canonical);
        let mut geometry = MultiPolygonHole::new();
        convert_geometry(&feature.geometry, &mut geometry);
        geometry.normalize_boostgeom();

        let component = Component {
            operator: ComponentOperator::Base,
            geometry: ComponentGeometry::Polygon(geometry),
            alt_range: AltRange::UNL,
        };
        save_border_airspace(store, uuid, &canonical, AirspaceType::Border, vec![component], imported_at)?;
        imported.insert(canonical, uuid);
        stats.borders += 1;
    }

    for (name, members) in COMPOSITES {
        let uuid = Uuid::from_countryborder(name);
        let mut components = Vec::new();
        for member in *members {
            if let Some(&member_uuid) = imported.get(*member) {
                components.push(Component {
                    operator: if components.is_empty() {
                        ComponentOperator::Base
                    } else {
                        ComponentOperator::Union
                    },
                    geometry: ComponentGeometry::Contributor(Link::new(member_uuid)),
                    alt_range: AltRange::UNL,
                });
            }
        }
        save_border_airspace(store, uuid, name, AirspaceType::Composite, components, imported_at)?;
        stats.composites += 1;
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(sw: (f64, f64), ne: (f64, f64)) -> Geometry<f64> {
        let coords = vec![
            (sw.1, sw.0),
            (sw.1, ne.0),
            (ne.1, ne.0),
            (ne.1, sw.0),
            (sw.1, sw.0),
        ];
        Geometry::Polygon(geo::Polygon::new(geo::LineString::from(coords), vec![]))
    }

    #[test]
    fn country_border_uuid_is_stable() {
        assert_eq!(Uuid::from_countryborder("FRANCE"), Uuid::from_countryborder("FRANCE"));
    }

    #[test]
    fn duplicate_name_is_counted_and_skipped() {
        let store = ObjectStore::in_memory();
        let features = vec![
            BorderFeature { name: "France".into(), geometry: square((42.0, -5.0), (51.0, 8.0)) },
            BorderFeature { name: "FRANCE".into(), geometry: square((42.0, -5.0), (51.0, 8.0)) },
        ];
        let stats = import_borders(&store, features, 0).unwrap();
        assert_eq!(stats.borders, 1);
        assert_eq!(stats.duplicate_names, 1);
    }

    #[test]
    fn composite_is_created_even_when_no_members_present() {
        let store = ObjectStore::in_memory();
        let stats = import_borders(&store, Vec::new(), 0).unwrap();
        assert_eq!(stats.composites, COMPOSITES.len());
        let uuid = Uuid::from_countryborder("EU");
        let object = store.load(uuid).unwrap().expect("composite is staged even when empty");
        let Body::Airspace(airspace) = object.latest_body().unwrap() else {
            panic!("expected an airspace body");
        };
        assert!(airspace.components.is_empty());
    }

    #[test]
    fn remap_normalises_known_variants() {
        assert_eq!(remap_country_name("Czech Republic"), "CZECHIA");
        assert_eq!(remap_country_name("Elbonia"), "ELBONIA");
    }
}
