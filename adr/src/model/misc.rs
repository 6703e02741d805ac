// SPDX-License-Identifier: Apache-2.0
// Copyright 2024, 2026 Joe Pearson

//! The remaining, lighter-weight time-slice variants.

use serde::{Deserialize, Serialize};

use crate::id::Link;

/// An authority responsible for an organisation or airspace.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct OrganisationAuthority {
    pub ident: String,
    pub name: String,
}

/// A unit (e.g. an ATC unit) operated by an [`OrganisationAuthority`].
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Unit {
    pub ident: String,
    pub name: String,
    pub authority: Link,
}

/// An Air Traffic Management service provided by a [`Unit`].
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct AirTrafficManagementService {
    pub unit: Link,
    pub kind: AtsKind,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum AtsKind {
    Area,
    Approach,
    Tower,
    Fis,
}

/// A named special day (e.g. a specific public holiday date), referenced by
/// `TimePattern::Special` resolution tables.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct SpecialDate {
    pub ident: String,
    pub date: chrono::NaiveDate,
}
