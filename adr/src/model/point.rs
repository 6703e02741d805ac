// SPDX-License-Identifier: Apache-2.0
// Copyright 2024, 2026 Joe Pearson

//! Point-like time-slice variants.

use serde::{Deserialize, Serialize};

use crate::geom::Point;
use crate::id::Link;

bitflags::bitflags! {
    /// Classification flags shared by point-like entities.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    #[derive(Serialize, Deserialize)]
    pub struct PointFlags: u32 {
        const ICAO            = 0b0000_0001;
        const MILITARY        = 0b0000_0010;
        const VISUAL_REPORTING = 0b0000_0100;
        const HELIPORT        = 0b0000_1000;
    }
}

/// Fields shared by `airport`, `navaid` and `designated_point`.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct PointCommon {
    pub ident: String,
    pub name: String,
    pub coordinate: Point,
    pub elevation_ft: i32,
    pub flags: PointFlags,
    pub icao_code: Option<String>,
    pub iata_code: Option<String>,
}

impl PointCommon {
    pub fn new(ident: impl Into<String>, name: impl Into<String>, coordinate: Point) -> Self {
        Self {
            ident: ident.into(),
            name: name.into(),
            coordinate,
            elevation_ft: 0,
            flags: PointFlags::empty(),
            icao_code: None,
            iata_code: None,
        }
    }
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Airport {
    pub common: PointCommon,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Navaid {
    pub common: PointCommon,
    pub navaid_kind: NavaidKind,
    pub frequency_khz: Option<u32>,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum NavaidKind {
    Vor,
    Ndb,
    Dme,
    VorDme,
    Tacan,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct DesignatedPoint {
    pub common: PointCommon,
}

/// An airport-collocation record, for facilities (e.g. a heliport) hosted at
/// an airport but lacking their own `gml:identifier` -- keyed from the host
/// airport's UUID plus a discriminator.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct AirportCollocation {
    pub host_airport: Link,
    pub discriminator: String,
    pub common: PointCommon,
}

/// An angle measurement used by procedure legs (e.g. a magnetic course).
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct AngleIndication {
    pub degrees: f32,
    pub is_magnetic: bool,
}

/// A distance measurement used by procedure legs.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct DistanceIndication {
    pub nmi: f32,
}
