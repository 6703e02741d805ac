// SPDX-License-Identifier: Apache-2.0
// Copyright 2024, 2026 Joe Pearson

//! The `airspace` time-slice variant.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::geom::{AltRange, MultiPolygonHole, Rect};
use crate::id::Link;
use crate::recompute::RecomputeContext;
use crate::store::ObjectStore;

/// The AIXM airspace `type` enumeration. Not exhaustive of the ~30+ values
/// AIXM defines; the tags used elsewhere in this crate (evaluator, border
/// loader) are represented precisely, with `Other` absorbing the remainder
/// so the archive format stays forward-compatible.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum AirspaceType {
    Fir,
    Uir,
    Cta,
    Tma,
    Ctr,
    Atz,
    Class(char),
    Tra,
    Tsa,
    Danger,
    Restricted,
    Prohibited,
    Fra,
    /// A country border, synthesised by the border loader.
    Border,
    /// A union-of-borders composite, e.g. `EU`.
    Composite,
    Other(u16),
}

/// How a [`Component`]'s geometry combines with the ones before it.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum ComponentOperator {
    /// Replaces the running geometry.
    Base,
    /// Unions with the running geometry.
    Union,
}

/// Either a reference to another airspace whose geometry should be
/// contributed, or a fully specified polygon hierarchy.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub enum ComponentGeometry {
    Contributor(Link),
    Polygon(MultiPolygonHole),
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Component {
    pub operator: ComponentOperator,
    pub geometry: ComponentGeometry,
    pub alt_range: AltRange,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Airspace {
    pub ident: String,
    pub name: String,
    pub airspace_type: AirspaceType,
    pub local_type: Option<String>,
    pub icao: bool,
    pub flexible_use: bool,
    pub components: Vec<Component>,

    /// Derived by `recompute`: the bounding box over all resolved
    /// component geometry. [`Rect::invalid`] if a component's geometry
    /// could not be resolved.
    pub bbox: Rect,
    /// Derived by `recompute`: the lowest floor across all components, in
    /// feet, used to resolve `FLOOR` sentinels in [`AltRange`] evaluation.
    pub floor_ft: i32,
    /// Derived by `recompute`: the highest ceiling across all components,
    /// in feet, used to resolve `CEILING` sentinels.
    pub ceiling_ft: i32,
}

impl Airspace {
    pub fn new(ident: impl Into<String>, name: impl Into<String>, airspace_type: AirspaceType) -> Self {
        Self {
            ident: ident.into(),
            name: name.into(),
            airspace_type,
            local_type: None,
            icao: false,
            flexible_use: false,
            components: Vec::new(),
            bbox: Rect::invalid(),
            floor_ft: 0,
            ceiling_ft: i32::MAX,
        }
    }

    pub fn envelope(&self) -> (i32, i32) {
        (self.floor_ft, self.ceiling_ft)
    }

    /// Resolves contributor links and polygon vertex back-references.
    pub fn link(&mut self, store: &ObjectStore, _depth: u32) -> Result<(), Error> {
        for component in &mut self.components {
            match &mut component.geometry {
                ComponentGeometry::Contributor(link) => {
                    link.load(store)?;
                }
                ComponentGeometry::Polygon(poly) => resolve_polygon_refs(poly, store)?,
            }
        }
        Ok(())
    }

    /// Derives `bbox`, `floor_ft` and `ceiling_ft` by unioning each
    /// component's geometry and altitude band, in component order, applying
    /// `Base`/`Union` per `ComponentOperator`.
    pub fn recompute(&mut self, _ctx: &RecomputeContext) -> Result<(), Error> {
        let mut bbox = Rect::invalid();
        let mut floor_ft = i32::MAX;
        let mut ceiling_ft = i32::MIN;
        let mut any = false;

        for component in &self.components {
            let comp_bbox = match &component.geometry {
                ComponentGeometry::Polygon(poly) => poly.envelope(),
                ComponentGeometry::Contributor(link) => link
                    .cached()
                    .and_then(|obj| obj.as_airspace())
                    .map(|other| other.bbox)
                    .unwrap_or_else(Rect::invalid),
            };

            match component.operator {
                ComponentOperator::Base => {
                    bbox = comp_bbox;
                    floor_ft = component.alt_range.lower.value;
                    ceiling_ft = component.alt_range.upper.value;
                    any = true;
                }
                ComponentOperator::Union => {
                    if !comp_bbox.is_invalid() {
                        bbox.add(comp_bbox.sw());
                        bbox.add(comp_bbox.ne());
                    }
                    floor_ft = floor_ft.min(component.alt_range.lower.value);
                    ceiling_ft = ceiling_ft.max(component.alt_range.upper.value);
                    any = true;
                }
            }
        }

        self.bbox = bbox;
        self.floor_ft = if any { floor_ft } else { 0 };
        self.ceiling_ft = if any { ceiling_ft } else { i32::MAX };
        Ok(())
    }
}

fn resolve_polygon_refs(poly: &mut MultiPolygonHole, store: &ObjectStore) -> Result<(), Error> {
    for polygon in poly.polygons_mut() {
        resolve_ring_refs(polygon.exterior_mut(), store)?;
        for interior in polygon.interiors_mut() {
            resolve_ring_refs(interior, store)?;
        }
    }
    Ok(())
}

fn resolve_ring_refs(
    ring: &mut crate::geom::Ring,
    store: &ObjectStore,
) -> Result<(), Error> {
    let pending: Vec<_> = ring.unresolved().to_vec();
    for (index, uuid) in pending {
        if let Some(obj) = store.load(uuid)? {
            if let Some(coordinate) = obj.point_coordinate() {
                ring.resolve(index, coordinate);
            }
        }
    }
    Ok(())
}
