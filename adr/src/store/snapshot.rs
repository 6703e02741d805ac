// SPDX-License-Identifier: Apache-2.0
// Copyright 2024, 2026 Joe Pearson

//! The packed binary snapshot format: a read-only, mmap-backed export of a
//! store's objects.
//!
//! Layout: a 64-byte header, followed by one 64-byte directory entry per
//! object sorted by UUID, followed by the concatenated archive-encoded
//! object blobs. Every multi-byte integer is big-endian, matching the
//! reference implementation's on-disk byte order so snapshots are portable
//! across architectures.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use memmap2::Mmap;

use crate::error::Error;
use crate::id::Uuid;
use crate::object::Object;

const MAGIC: &[u8; 8] = b"ADRSNAP1";
const HEADER_LEN: usize = 64;
const DIRECTORY_ENTRY_LEN: usize = 64;

struct DirEntry {
    uuid: Uuid,
    offset: u64,
    length: u64,
}

/// Writes every object in `objects` to a fresh snapshot file at `path`.
pub fn write_binfile<'a>(
    path: &Path,
    objects: impl Iterator<Item = &'a Object>,
) -> Result<(), Error> {
    let mut encoded: Vec<(Uuid, Vec<u8>)> = objects
        .map(|obj| super::archive::encode(obj).map(|bytes| (obj.uuid(), bytes)))
        .collect::<Result<_, Error>>()?;
    encoded.sort_by_key(|(uuid, _)| *uuid);

    let directory_offset = HEADER_LEN as u64 + (encoded.len() * DIRECTORY_ENTRY_LEN) as u64;
    let mut data_offset = directory_offset;
    let mut directory = Vec::with_capacity(encoded.len());
    for (uuid, bytes) in &encoded {
        directory.push(DirEntry {
            uuid: *uuid,
            offset: data_offset,
            length: bytes.len() as u64,
        });
        data_offset += bytes.len() as u64;
    }

    let file = File::create(path).map_err(|e| Error::io(path.display().to_string(), e))?;
    let mut w = BufWriter::new(file);

    w.write_all(MAGIC).map_err(|e| Error::io(path.display().to_string(), e))?;
    w.write_i64::<BigEndian>(super::archive::ARCHIVE_VERSION)
        .map_err(|e| Error::io(path.display().to_string(), e))?;
    w.write_u64::<BigEndian>(encoded.len() as u64)
        .map_err(|e| Error::io(path.display().to_string(), e))?;
    w.write_u64::<BigEndian>(HEADER_LEN as u64)
        .map_err(|e| Error::io(path.display().to_string(), e))?;
    // Pad the header out to HEADER_LEN bytes (8 + 8 + 8 + 8 = 32 so far).
    w.write_all(&[0u8; HEADER_LEN - 32])
        .map_err(|e| Error::io(path.display().to_string(), e))?;

    for entry in &directory {
        w.write_all(entry.uuid.as_bytes())
            .map_err(|e| Error::io(path.display().to_string(), e))?;
        w.write_u64::<BigEndian>(entry.offset)
            .map_err(|e| Error::io(path.display().to_string(), e))?;
        w.write_u64::<BigEndian>(entry.length)
            .map_err(|e| Error::io(path.display().to_string(), e))?;
        // Pad the directory entry out to DIRECTORY_ENTRY_LEN bytes (16 + 8 + 8 = 32).
        w.write_all(&[0u8; DIRECTORY_ENTRY_LEN - 32])
            .map_err(|e| Error::io(path.display().to_string(), e))?;
    }

    for (_, bytes) in &encoded {
        w.write_all(bytes).map_err(|e| Error::io(path.display().to_string(), e))?;
    }

    w.flush().map_err(|e| Error::io(path.display().to_string(), e))
}

/// A read-only, mmap-backed view onto a snapshot file.
pub struct Snapshot {
    mmap: Mmap,
    directory: Vec<DirEntry>,
}

impl Snapshot {
    pub fn open(path: &Path) -> Result<Self, Error> {
        let file = File::open(path).map_err(|e| Error::io(path.display().to_string(), e))?;
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| Error::io(path.display().to_string(), e))?;

        if mmap.len() < HEADER_LEN || &mmap[0..8] != MAGIC {
            return Err(Error::structural("snapshot: bad magic"));
        }
        let mut header = &mmap[8..HEADER_LEN];
        let version = header
            .read_i64::<BigEndian>()
            .map_err(|_| Error::structural("snapshot: truncated header"))?;
        if version != super::archive::ARCHIVE_VERSION {
            return Err(Error::SchemaMismatch {
                found: version,
                expected: super::archive::ARCHIVE_VERSION,
            });
        }
        let count = header
            .read_u64::<BigEndian>()
            .map_err(|_| Error::structural("snapshot: truncated header"))?;
        let directory_offset = header
            .read_u64::<BigEndian>()
            .map_err(|_| Error::structural("snapshot: truncated header"))? as usize;

        let mut directory = Vec::with_capacity(count as usize);
        for i in 0..count as usize {
            let start = directory_offset + i * DIRECTORY_ENTRY_LEN;
            let mut slice = mmap
                .get(start..start + DIRECTORY_ENTRY_LEN)
                .ok_or_else(|| Error::structural("snapshot: truncated directory"))?;
            let mut uuid_bytes = [0u8; 16];
            slice
                .read_exact(&mut uuid_bytes)
                .map_err(|_| Error::structural("snapshot: truncated directory entry"))?;
            let offset = slice
                .read_u64::<BigEndian>()
                .map_err(|_| Error::structural("snapshot: truncated directory entry"))?;
            let length = slice
                .read_u64::<BigEndian>()
                .map_err(|_| Error::structural("snapshot: truncated directory entry"))?;
            directory.push(DirEntry {
                uuid: Uuid::from_bytes(uuid_bytes),
                offset,
                length,
            });
        }

        Ok(Self { mmap, directory })
    }

    pub fn len(&self) -> usize {
        self.directory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directory.is_empty()
    }

    /// Binary searches the directory (sorted by UUID at write time) and
    /// decodes the matching object, if any.
    pub fn load(&self, uuid: Uuid) -> Result<Option<Object>, Error> {
        let Ok(idx) = self.directory.binary_search_by_key(&uuid, |e| e.uuid) else {
            return Ok(None);
        };
        let entry = &self.directory[idx];
        let start = entry.offset as usize;
        let end = start + entry.length as usize;
        let bytes = self
            .mmap
            .get(start..end)
            .ok_or_else(|| Error::structural("snapshot: object blob out of range"))?;
        super::archive::decode(bytes).map(Some)
    }

    pub fn uuids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.directory.iter().map(|e| e.uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Point;
    use crate::model::{Airport, Body, PointCommon, TimeSlice, VariantKind};
    use crate::time::{SliceHeader, Validity};

    #[test]
    fn round_trips_objects_through_a_snapshot_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.bin");

        let mut obj = Object::new(Uuid::new_random(), VariantKind::Airport);
        obj.add_timeslice(TimeSlice::new(
            SliceHeader::baseline(Validity::new(0, 100), 1),
            Body::Airport(Airport {
                common: PointCommon::new("LSZH", "Zurich", Point::new(47.45, 8.55)),
            }),
        ))
        .unwrap();
        let uuid = obj.uuid();

        write_binfile(&path, std::iter::once(&obj)).unwrap();

        let snapshot = Snapshot::open(&path).unwrap();
        assert_eq!(snapshot.len(), 1);
        let loaded = snapshot.load(uuid).unwrap().unwrap();
        assert_eq!(loaded.uuid(), uuid);
        assert!(snapshot.load(Uuid::new_random()).unwrap().is_none());
    }
}
