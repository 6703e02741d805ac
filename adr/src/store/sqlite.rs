// SPDX-License-Identifier: Apache-2.0
// Copyright 2024, 2026 Joe Pearson

//! The relational backend: a `rusqlite` connection holding the permanent
//! object table plus its temporary-object mirror.

use rusqlite::{params, Connection, OptionalExtension};
use rusqlite_migration::{Migrations, M};

use crate::error::Error;
use crate::geom::Rect;
use crate::id::Uuid;
use crate::model::dependencies;
use crate::object::Object;

fn migrations() -> Migrations<'static> {
    Migrations::new(vec![M::up(
        "
        CREATE TABLE objects (
            uuid        BLOB PRIMARY KEY,
            kind        INTEGER NOT NULL,
            ident       TEXT,
            modified    INTEGER NOT NULL,
            min_lat     REAL,
            max_lat     REAL,
            min_lon     REAL,
            max_lon     REAL,
            data        BLOB NOT NULL
        );
        CREATE INDEX objects_ident ON objects(ident);
        CREATE INDEX objects_modified ON objects(modified);
        CREATE INDEX objects_bbox ON objects(min_lat, max_lat, min_lon, max_lon);

        CREATE TABLE deps (
            uuid BLOB NOT NULL,
            dep  BLOB NOT NULL
        );
        CREATE INDEX deps_uuid ON deps(uuid);
        CREATE INDEX deps_dep ON deps(dep);

        CREATE TABLE temp_objects (
            uuid        BLOB PRIMARY KEY,
            kind        INTEGER NOT NULL,
            modified    INTEGER NOT NULL,
            data        BLOB NOT NULL
        );

        CREATE TABLE temp_deps (
            uuid BLOB NOT NULL,
            dep  BLOB NOT NULL
        );

        -- Directly-usable-route-segment legs for DCT-limit evaluation
        --.
        CREATE TABLE dct_legs (
            start BLOB NOT NULL,
            end   BLOB NOT NULL,
            nmi   REAL NOT NULL
        );

        -- Airspace Use Plan activation overrides layered on top of a
        -- restriction's own timetable.
        CREATE TABLE aup (
            airspace   BLOB NOT NULL,
            start_time INTEGER NOT NULL,
            end_time   INTEGER NOT NULL,
            active     INTEGER NOT NULL
        );
        ",
    )])
}

pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    pub fn open(path: &std::path::Path, allow_migration: bool) -> Result<Self, Error> {
        let mut conn = Connection::open(path)?;
        Self::migrate(&mut conn, allow_migration)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, Error> {
        let mut conn = Connection::open_in_memory()?;
        migrations().to_latest(&mut conn)?;
        Ok(Self { conn })
    }

    /// Applies the schema, unless `allow_migration` is false and the
    /// database is not already initialised, in which case it errors out
    /// rather than silently creating tables in what might be the wrong
    /// file.
    fn migrate(conn: &mut Connection, allow_migration: bool) -> Result<(), Error> {
        let initialised: bool = conn
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE type='table' AND name='objects'",
                [],
                |row| row.get::<_, i64>(0),
            )
            .map(|n| n > 0)
            .unwrap_or(false);

        if !initialised && !allow_migration {
            return Err(Error::structural(
                "database has no schema and migrations are disabled",
            ));
        }
        migrations().to_latest(conn).map_err(Error::from)
    }

    pub fn set_wal(&self, enabled: bool) -> Result<(), Error> {
        let mode = if enabled { "WAL" } else { "DELETE" };
        self.conn
            .pragma_update(None, "journal_mode", mode)
            .map_err(Error::from)
    }

    fn bbox_of(object: &Object) -> Option<Rect> {
        match object.as_airspace() {
            Some(airspace) if !airspace.bbox.is_invalid() => Some(airspace.bbox),
            _ => None,
        }
    }

    fn ident_of(object: &Object) -> Option<String> {
        use crate::model::Body;
        object.latest_body().and_then(|body| match body {
            Body::Airport(a) => Some(a.common.ident.clone()),
            Body::Navaid(n) => Some(n.common.ident.clone()),
            Body::DesignatedPoint(d) => Some(d.common.ident.clone()),
            Body::Airspace(a) => Some(a.ident.clone()),
            Body::Route(r) => Some(r.ident.clone()),
            Body::Sid(s) => Some(s.ident.clone()),
            Body::Star(s) => Some(s.ident.clone()),
            Body::FlightRestriction(r) => Some(r.ident.clone()),
            _ => None,
        })
    }

    pub fn save(&self, object: &Object) -> Result<(), Error> {
        let data = super::archive::encode(object)?;
        let bbox = Self::bbox_of(object);
        let ident = Self::ident_of(object);
        let modified = object
            .slices()
            .iter()
            .map(|s| s.header.modified)
            .max()
            .unwrap_or(0);

        self.conn.execute(
            "INSERT INTO objects (uuid, kind, ident, modified, min_lat, max_lat, min_lon, max_lon, data)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(uuid) DO UPDATE SET
               kind = excluded.kind, ident = excluded.ident, modified = excluded.modified,
               min_lat = excluded.min_lat, max_lat = excluded.max_lat,
               min_lon = excluded.min_lon, max_lon = excluded.max_lon, data = excluded.data",
            params![
                object.uuid().as_bytes().to_vec(),
                object.kind() as i64,
                ident,
                modified,
                bbox.map(|r| r.sw().lat_deg()),
                bbox.map(|r| r.ne().lat_deg()),
                bbox.map(|r| r.sw().lon_deg()),
                bbox.map(|r| r.ne().lon_deg()),
                data,
            ],
        )?;

        self.conn
            .execute("DELETE FROM deps WHERE uuid = ?1", params![object.uuid().as_bytes().to_vec()])?;
        let mut deps = Vec::new();
        for slice in object.slices() {
            deps.extend(dependencies(&slice.body));
        }
        deps.sort();
        deps.dedup();
        for dep in deps {
            self.conn.execute(
                "INSERT INTO deps (uuid, dep) VALUES (?1, ?2)",
                params![object.uuid().as_bytes().to_vec(), dep.as_bytes().to_vec()],
            )?;
        }

        Ok(())
    }

    pub fn load(&self, uuid: Uuid) -> Result<Option<Object>, Error> {
        let data: Option<Vec<u8>> = self
            .conn
            .query_row(
                "SELECT data FROM objects WHERE uuid = ?1",
                params![uuid.as_bytes().to_vec()],
                |row| row.get(0),
            )
            .optional()?;
        data.map(|bytes| super::archive::decode(&bytes)).transpose()
    }

    pub fn find_by_ident(&self, ident: &str) -> Result<Vec<Uuid>, Error> {
        let mut stmt = self.conn.prepare("SELECT uuid FROM objects WHERE ident = ?1")?;
        let rows = stmt.query_map(params![ident], |row| row.get::<_, Vec<u8>>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(uuid_from_blob(row?)?);
        }
        Ok(out)
    }

    pub fn find_by_bbox(&self, rect: Rect) -> Result<Vec<Uuid>, Error> {
        let sw = rect.sw();
        let ne = rect.ne();
        let mut stmt = self.conn.prepare(
            "SELECT uuid FROM objects
             WHERE min_lat IS NOT NULL AND min_lat <= ?2 AND max_lat >= ?1
               AND min_lon <= ?4 AND max_lon >= ?3",
        )?;
        let rows = stmt.query_map(
            params![sw.lat_deg(), ne.lat_deg(), sw.lon_deg(), ne.lon_deg()],
            |row| row.get::<_, Vec<u8>>(0),
        )?;
        let mut out = Vec::new();
        for row in rows {
            out.push(uuid_from_blob(row?)?);
        }
        Ok(out)
    }

    pub fn find_dependencies(&self, uuid: Uuid) -> Result<Vec<Uuid>, Error> {
        let mut stmt = self.conn.prepare("SELECT dep FROM deps WHERE uuid = ?1")?;
        let rows = stmt.query_map(params![uuid.as_bytes().to_vec()], |row| row.get::<_, Vec<u8>>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(uuid_from_blob(row?)?);
        }
        Ok(out)
    }

    pub fn find_dependson(&self, uuid: Uuid) -> Result<Vec<Uuid>, Error> {
        let mut stmt = self.conn.prepare("SELECT uuid FROM deps WHERE dep = ?1")?;
        let rows = stmt.query_map(params![uuid.as_bytes().to_vec()], |row| row.get::<_, Vec<u8>>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(uuid_from_blob(row?)?);
        }
        Ok(out)
    }

    pub fn find_modifiedafter(&self, t: i64) -> Result<Vec<Uuid>, Error> {
        let mut stmt = self.conn.prepare("SELECT uuid FROM objects WHERE modified > ?1")?;
        let rows = stmt.query_map(params![t], |row| row.get::<_, Vec<u8>>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(uuid_from_blob(row?)?);
        }
        Ok(out)
    }

    pub fn save_temp(&self, object: &Object) -> Result<(), Error> {
        let data = super::archive::encode(object)?;
        let modified = object
            .slices()
            .iter()
            .map(|s| s.header.modified)
            .max()
            .unwrap_or(0);
        self.conn.execute(
            "INSERT INTO temp_objects (uuid, kind, modified, data) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(uuid) DO UPDATE SET kind = excluded.kind, modified = excluded.modified, data = excluded.data",
            params![object.uuid().as_bytes().to_vec(), object.kind() as i64, modified, data],
        )?;
        Ok(())
    }

    /// Drops `uuid`'s temp-partition mirror once it has been promoted to
    /// the main `objects` table via [`Self::save`].
    pub fn remove_temp(&self, uuid: Uuid) -> Result<(), Error> {
        self.conn.execute(
            "DELETE FROM temp_objects WHERE uuid = ?1",
            params![uuid.as_bytes().to_vec()],
        )?;
        self.conn.execute(
            "DELETE FROM temp_deps WHERE uuid = ?1",
            params![uuid.as_bytes().to_vec()],
        )?;
        Ok(())
    }

    pub fn load_temp(&self, uuid: Uuid) -> Result<Option<Object>, Error> {
        let data: Option<Vec<u8>> = self
            .conn
            .query_row(
                "SELECT data FROM temp_objects WHERE uuid = ?1",
                params![uuid.as_bytes().to_vec()],
                |row| row.get(0),
            )
            .optional()?;
        data.map(|bytes| super::archive::decode(&bytes)).transpose()
    }

    pub fn all_temp_uuids(&self) -> Result<Vec<Uuid>, Error> {
        let mut stmt = self.conn.prepare("SELECT uuid FROM temp_objects")?;
        let rows = stmt.query_map([], |row| row.get::<_, Vec<u8>>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(uuid_from_blob(row?)?);
        }
        Ok(out)
    }

    pub fn all_uuids(&self) -> Result<Vec<Uuid>, Error> {
        let mut stmt = self.conn.prepare("SELECT uuid FROM objects")?;
        let rows = stmt.query_map([], |row| row.get::<_, Vec<u8>>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(uuid_from_blob(row?)?);
        }
        Ok(out)
    }
}

fn uuid_from_blob(bytes: Vec<u8>) -> Result<Uuid, Error> {
    let arr: [u8; 16] = bytes
        .try_into()
        .map_err(|_| Error::structural("stored uuid blob was not 16 bytes"))?;
    Ok(Uuid::from_bytes(arr))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Point;
    use crate::model::{Airport, Body, PointCommon, TimeSlice, VariantKind};
    use crate::time::{SliceHeader, Validity};

    #[test]
    fn save_and_load_round_trips() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        let mut obj = Object::new(Uuid::new_random(), VariantKind::Airport);
        obj.add_timeslice(TimeSlice::new(
            SliceHeader::baseline(Validity::new(0, 100), 1),
            Body::Airport(Airport {
                common: PointCommon::new("LSZH", "Zurich", Point::new(47.45, 8.55)),
            }),
        ))
        .unwrap();
        let uuid = obj.uuid();

        backend.save(&obj).unwrap();
        let loaded = backend.load(uuid).unwrap().unwrap();
        assert_eq!(loaded.uuid(), uuid);

        let by_ident = backend.find_by_ident("LSZH").unwrap();
        assert_eq!(by_ident, vec![uuid]);
    }
}
