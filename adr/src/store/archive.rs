// SPDX-License-Identifier: Apache-2.0
// Copyright 2024, 2026 Joe Pearson

//! The archive envelope: a versioned, length-prefixed encoding of an
//! [`Object`] shared by the sqlite blob column and the packed snapshot
//! format.

use crate::error::Error;
use crate::object::Object;

/// Bumped whenever the wire layout of [`Object`] or any type it contains
/// changes incompatibly. A mismatch against a persisted archive's own
/// version is reported as [`Error::SchemaMismatch`].
pub const ARCHIVE_VERSION: i64 = 1;

pub fn encode(object: &Object) -> Result<Vec<u8>, Error> {
    bincode::serialize(object)
        .map_err(|e| Error::structural(format!("archive encode failed: {e}")))
}

pub fn decode(bytes: &[u8]) -> Result<Object, Error> {
    bincode::deserialize(bytes).map_err(|e| Error::structural(format!("archive decode failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Point;
    use crate::id::Uuid;
    use crate::model::{Airport, Body, PointCommon, VariantKind};
    use crate::time::{SliceHeader, Validity};
    use crate::model::TimeSlice;

    #[test]
    fn object_round_trips_through_archive_bytes() {
        let mut obj = Object::new(Uuid::new_random(), VariantKind::Airport);
        obj.add_timeslice(TimeSlice::new(
            SliceHeader::baseline(Validity::new(0, 100), 1),
            Body::Airport(Airport {
                common: PointCommon::new("LSZH", "Zurich", Point::new(47.45, 8.55)),
            }),
        ))
        .unwrap();

        let bytes = encode(&obj).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.uuid(), obj.uuid());
        assert_eq!(decoded.slices().len(), 1);
    }
}
