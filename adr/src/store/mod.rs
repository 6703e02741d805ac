// SPDX-License-Identifier: Apache-2.0
// Copyright 2024, 2026 Joe Pearson

//! The object store: the single point of contact between the in-memory
//! object graph and whichever backend persists it.
//!
//! Two backends are supported: a `rusqlite`-backed relational store used
//! during import and recompute, and a read-only, mmap-backed packed binary
//! snapshot exported for distribution. Both store the same
//! archive-encoded object bytes, so either can feed the other.

mod archive;
mod bbox;
mod cache;
#[cfg(feature = "sqlite")]
mod sqlite;
mod snapshot;

pub use archive::ARCHIVE_VERSION;
pub use snapshot::{write_binfile, Snapshot};

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use log::trace;

use crate::error::Error;
use crate::geom::Rect;
use crate::id::Uuid;
use crate::object::Object;

enum Backend {
    #[cfg(feature = "sqlite")]
    Sqlite(sqlite::SqliteBackend),
    Snapshot(Snapshot),
    /// No persistence: objects live only in the cache, for tests and small
    /// embedded uses.
    None,
}

/// An in-memory index over every dependency, identifier and bounding box
/// this store has seen, kept current as objects are saved and lazily
/// backfilled from the backend on first use.
#[derive(Default)]
struct Indices {
    loaded: bool,
    ident: HashMap<String, Vec<Uuid>>,
    deps: HashMap<Uuid, Vec<Uuid>>,
    dependson: HashMap<Uuid, Vec<Uuid>>,
    bbox: bbox::BboxIndex,
}

/// Builds a `rusqlite`-backed [`ObjectStore`], gathering the handful of
/// knobs opening one requires (database path, WAL mode, whether the schema
/// may be created/migrated) into one fluent call instead of a string of
/// positional arguments.
#[derive(Clone, Debug, Default)]
pub struct StoreOptions {
    path: Option<std::path::PathBuf>,
    wal: bool,
    allow_migration: bool,
}

impl StoreOptions {
    /// A new builder: WAL disabled and migrations disallowed until opted
    /// into, so opening a store never silently rewrites or creates a
    /// database the caller didn't ask for.
    pub fn new() -> Self {
        Self::default()
    }

    /// The database file to open; omit for an ephemeral in-memory store.
    pub fn path(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Enables WAL journal mode once the store is open.
    pub fn wal(mut self, enabled: bool) -> Self {
        self.wal = enabled;
        self
    }

    /// Permits creating the schema (or applying pending migrations) if the
    /// database isn't already at the latest version.
    pub fn allow_migration(mut self, enabled: bool) -> Self {
        self.allow_migration = enabled;
        self
    }

    #[cfg(feature = "sqlite")]
    pub fn open(self) -> Result<ObjectStore, Error> {
        let store = match &self.path {
            Some(path) => ObjectStore::open_with(path, self.allow_migration)?,
            None => ObjectStore::open_in_memory()?,
        };
        store.set_wal(self.wal)?;
        Ok(store)
    }
}

/// The object store contract.
pub struct ObjectStore {
    backend: Backend,
    cache: RefCell<cache::Cache>,
    temp: RefCell<HashMap<Uuid, Rc<Object>>>,
    indices: RefCell<Indices>,
}

impl ObjectStore {
    /// Opens (creating if absent) a `rusqlite`-backed store at `path`.
    #[cfg(feature = "sqlite")]
    pub fn open(path: &Path) -> Result<Self, Error> {
        Ok(Self {
            backend: Backend::Sqlite(sqlite::SqliteBackend::open(path, true)?),
            cache: RefCell::new(cache::Cache::new()),
            temp: RefCell::new(HashMap::new()),
            indices: RefCell::new(Indices::default()),
        })
    }

    /// Opens a `rusqlite`-backed store at `path`, erroring rather than
    /// creating the schema if it is absent and `allow_migration` is false.
    #[cfg(feature = "sqlite")]
    fn open_with(path: &Path, allow_migration: bool) -> Result<Self, Error> {
        Ok(Self {
            backend: Backend::Sqlite(sqlite::SqliteBackend::open(path, allow_migration)?),
            cache: RefCell::new(cache::Cache::new()),
            temp: RefCell::new(HashMap::new()),
            indices: RefCell::new(Indices::default()),
        })
    }

    /// An ephemeral `rusqlite`-backed store, useful for tests and one-shot
    /// recompute passes that don't need to persist afterwards.
    #[cfg(feature = "sqlite")]
    pub fn open_in_memory() -> Result<Self, Error> {
        Ok(Self {
            backend: Backend::Sqlite(sqlite::SqliteBackend::open_in_memory()?),
            cache: RefCell::new(cache::Cache::new()),
            temp: RefCell::new(HashMap::new()),
            indices: RefCell::new(Indices::default()),
        })
    }

    /// Opens a read-only packed binary snapshot.
    pub fn open_snapshot(path: &Path) -> Result<Self, Error> {
        Ok(Self {
            backend: Backend::Snapshot(Snapshot::open(path)?),
            cache: RefCell::new(cache::Cache::new()),
            temp: RefCell::new(HashMap::new()),
            indices: RefCell::new(Indices::default()),
        })
    }

    /// A store with no backing persistence, objects live only as long as
    /// something holds a reference to them.
    pub fn in_memory() -> Self {
        Self {
            backend: Backend::None,
            cache: RefCell::new(cache::Cache::new()),
            temp: RefCell::new(HashMap::new()),
            indices: RefCell::new(Indices::default()),
        }
    }

    /// Toggles WAL mode on the `rusqlite` backend; a no-op on the other
    /// backends.
    pub fn set_wal(&self, enabled: bool) -> Result<(), Error> {
        #[cfg(feature = "sqlite")]
        if let Backend::Sqlite(backend) = &self.backend {
            return backend.set_wal(enabled);
        }
        let _ = enabled;
        Ok(())
    }

    /// Resolves `uuid` through the temp overlay first, then the cache,
    /// then the backend.
    pub fn load(&self, uuid: Uuid) -> Result<Option<Rc<Object>>, Error> {
        if let Some(obj) = self.temp.borrow().get(&uuid) {
            return Ok(Some(Rc::clone(obj)));
        }
        if let Some(obj) = self.cache.borrow_mut().get(uuid) {
            return Ok(Some(obj));
        }

        let loaded = match &self.backend {
            #[cfg(feature = "sqlite")]
            Backend::Sqlite(backend) => backend.load(uuid)?,
            Backend::Snapshot(snapshot) => snapshot.load(uuid)?,
            Backend::None => None,
        };

        Ok(loaded.map(|obj| {
            let rc = Rc::new(obj);
            self.cache.borrow_mut().insert(Rc::clone(&rc));
            rc
        }))
    }

    /// Persists `object` as a main (non-temporary) record, updates the
    /// dependency, identifier and bbox indices, and -- since this is how an
    /// object is promoted out of the temp partition once recompute has
    /// settled it -- drops any shadowing temp-overlay entry for the same
    /// UUID, so `load` no longer returns the pre-recompute copy.
    pub fn save(&self, object: Object) -> Result<(), Error> {
        match &self.backend {
            #[cfg(feature = "sqlite")]
            Backend::Sqlite(backend) => {
                backend.save(&object)?;
            }
            Backend::Snapshot(_) => {
                return Err(Error::structural("cannot save into a read-only snapshot store"))
            }
            Backend::None => {
                self.ensure_indices_loaded()?;
                self.index_object(&object);
            }
        }

        let uuid = object.uuid();
        self.cache.borrow_mut().insert(Rc::new(object));
        self.temp.borrow_mut().remove(&uuid);
        #[cfg(feature = "sqlite")]
        if let Backend::Sqlite(backend) = &self.backend {
            backend.remove_temp(uuid)?;
        }
        Ok(())
    }

    /// Overlays `object` as a temporary record visible to `load` but not
    /// persisted to the main backend.
    pub fn save_temp(&self, object: Object) -> Result<(), Error> {
        #[cfg(feature = "sqlite")]
        if let Backend::Sqlite(backend) = &self.backend {
            backend.save_temp(&object)?;
        }
        self.index_object(&object);
        self.temp.borrow_mut().insert(object.uuid(), Rc::new(object));
        Ok(())
    }

    pub fn find_by_ident(&self, ident: &str) -> Result<Vec<Uuid>, Error> {
        match &self.backend {
            #[cfg(feature = "sqlite")]
            Backend::Sqlite(backend) => backend.find_by_ident(ident),
            _ => {
                self.ensure_indices_loaded()?;
                Ok(self.indices.borrow().ident.get(ident).cloned().unwrap_or_default())
            }
        }
    }

    pub fn find_by_bbox(&self, rect: Rect) -> Result<Vec<Uuid>, Error> {
        match &self.backend {
            #[cfg(feature = "sqlite")]
            Backend::Sqlite(backend) => backend.find_by_bbox(rect),
            _ => {
                self.ensure_indices_loaded()?;
                Ok(self.indices.borrow().bbox.query(rect))
            }
        }
    }

    pub fn find_dependencies(&self, uuid: Uuid) -> Result<Vec<Uuid>, Error> {
        // Temp-overlay deps are only ever tracked in-memory, so always
        // merge them in alongside whatever the backend reports.
        let mut out = match &self.backend {
            #[cfg(feature = "sqlite")]
            Backend::Sqlite(backend) => backend.find_dependencies(uuid)?,
            _ => {
                self.ensure_indices_loaded()?;
                self.indices.borrow().deps.get(&uuid).cloned().unwrap_or_default()
            }
        };
        if self.temp.borrow().contains_key(&uuid) {
            if let Some(extra) = self.indices.borrow().deps.get(&uuid) {
                for dep in extra {
                    if !out.contains(dep) {
                        out.push(*dep);
                    }
                }
            }
        }
        Ok(out)
    }

    pub fn find_dependson(&self, uuid: Uuid) -> Result<Vec<Uuid>, Error> {
        match &self.backend {
            #[cfg(feature = "sqlite")]
            Backend::Sqlite(backend) => backend.find_dependson(uuid),
            _ => {
                self.ensure_indices_loaded()?;
                Ok(self
                    .indices
                    .borrow()
                    .dependson
                    .get(&uuid)
                    .cloned()
                    .unwrap_or_default())
            }
        }
    }

    pub fn find_modifiedafter(&self, t: i64) -> Result<Vec<Uuid>, Error> {
        match &self.backend {
            #[cfg(feature = "sqlite")]
            Backend::Sqlite(backend) => backend.find_modifiedafter(t),
            _ => {
                self.ensure_indices_loaded()?;
                let mut out = Vec::new();
                let uuids: Vec<Uuid> = self.indices.borrow().deps.keys().copied().collect();
                for uuid in uuids {
                    if let Some(obj) = self.cache.borrow_mut().get(uuid) {
                        if obj.slices().iter().any(|s| s.header.modified > t) {
                            out.push(uuid);
                        }
                    }
                }
                Ok(out)
            }
        }
    }

    /// Every UUID this store's temp overlay currently holds, a starting
    /// point for a recompute pass's root set.
    pub fn all_temp_uuids(&self) -> Result<Vec<Uuid>, Error> {
        #[cfg(feature = "sqlite")]
        if let Backend::Sqlite(backend) = &self.backend {
            return backend.all_temp_uuids();
        }
        Ok(self.temp.borrow().keys().copied().collect())
    }

    /// Every UUID in the main partition, the other half of the recompute
    /// engine's vertex set alongside [`ObjectStore::all_temp_uuids`].
    pub fn all_main_uuids(&self) -> Result<Vec<Uuid>, Error> {
        match &self.backend {
            #[cfg(feature = "sqlite")]
            Backend::Sqlite(backend) => backend.all_uuids(),
            Backend::Snapshot(snapshot) => Ok(snapshot.uuids().collect()),
            Backend::None => {
                self.ensure_indices_loaded()?;
                Ok(self.indices.borrow().deps.keys().copied().collect())
            }
        }
    }

    /// Drops every cache entry that is not externally referenced. Returns
    /// how many entries were evicted.
    pub fn flush_cache(&self) -> usize {
        let evicted = self.cache.borrow_mut().flush();
        trace!("store: cache flushed, {evicted} evicted");
        evicted
    }

    /// Toggles a `flight_restriction` object's `trace` flag across every
    /// time-slice and re-saves it, without requiring a full re-import.
    pub fn set_rule_trace(&self, uuid: Uuid, trace: bool) -> Result<(), Error> {
        self.mutate_restriction(uuid, |r| r.trace = trace)
    }

    /// Toggles a `flight_restriction` object's `enabled` flag across every
    /// time-slice and re-saves it, without requiring a full re-import.
    pub fn set_rule_enabled(&self, uuid: Uuid, enabled: bool) -> Result<(), Error> {
        self.mutate_restriction(uuid, |r| r.enabled = enabled)
    }

    fn mutate_restriction(&self, uuid: Uuid, f: impl Fn(&mut crate::model::FlightRestriction)) -> Result<(), Error> {
        use crate::model::Body;

        let rc = self
            .load(uuid)?
            .ok_or_else(|| Error::structural(format!("no such object: {uuid}")))?;
        let mut object = (*rc).clone();
        let mut touched = false;
        for slice in object.slices_mut().iter_mut() {
            if let Body::FlightRestriction(restriction) = &mut slice.body {
                f(&mut **restriction);
                touched = true;
            }
        }
        if !touched {
            return Err(Error::structural(format!("{uuid} is not a flight_restriction object")));
        }
        self.save(object)
    }

    pub fn write_binfile(&self, path: &Path) -> Result<(), Error> {
        let uuids = self.all_main_uuids()?;
        let mut objects = Vec::with_capacity(uuids.len());
        for uuid in uuids {
            if let Some(obj) = self.load(uuid)? {
                objects.push(obj);
            }
        }
        write_binfile(path, objects.iter().map(|rc| rc.as_ref()))
    }

    /// Indexes `object`, first retracting whatever it previously
    /// contributed under its own UUID -- an object is re-indexed every time
    /// it moves from the temp partition to main, so without this the
    /// `dependson`/`ident` maps would accumulate a duplicate entry per
    /// save.
    fn index_object(&self, object: &Object) {
        let mut indices = self.indices.borrow_mut();
        let uuid = object.uuid();

        if let Some(old_deps) = indices.deps.remove(&uuid) {
            for dep in old_deps {
                if let Some(list) = indices.dependson.get_mut(&dep) {
                    list.retain(|&u| u != uuid);
                }
            }
        }
        for list in indices.ident.values_mut() {
            list.retain(|&u| u != uuid);
        }

        let mut deps = Vec::new();
        for slice in object.slices() {
            deps.extend(crate::model::dependencies(&slice.body));
        }
        deps.sort();
        deps.dedup();

        for dep in &deps {
            indices.dependson.entry(*dep).or_default().push(uuid);
        }
        indices.deps.insert(uuid, deps);

        if let Some(ident) = ident_of(object) {
            indices.ident.entry(ident).or_default().push(uuid);
        }
        if let Some(airspace) = object.as_airspace() {
            if !airspace.bbox.is_invalid() {
                indices.bbox.insert(uuid, airspace.bbox);
            }
        }
    }

    /// Backfills the in-memory indices from the backend exactly once,
    /// since a freshly opened sqlite or snapshot store has no in-memory
    /// index state yet.
    fn ensure_indices_loaded(&self) -> Result<(), Error> {
        if self.indices.borrow().loaded {
            return Ok(());
        }

        let uuids: Vec<Uuid> = match &self.backend {
            #[cfg(feature = "sqlite")]
            Backend::Sqlite(_) => Vec::new(), // sqlite indexes itself via SQL; nothing to backfill.
            Backend::Snapshot(snapshot) => snapshot.uuids().collect(),
            Backend::None => Vec::new(),
        };

        for uuid in uuids {
            if let Some(obj) = self.load(uuid)? {
                self.index_object(&obj);
            }
        }

        self.indices.borrow_mut().loaded = true;
        Ok(())
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Point;
    use crate::model::{Airport, Body, PointCommon, TimeSlice, VariantKind};
    use crate::time::{SliceHeader, Validity};

    fn airport(ident: &str) -> Object {
        let mut obj = Object::new(Uuid::new_random(), VariantKind::Airport);
        obj.add_timeslice(TimeSlice::new(
            SliceHeader::baseline(Validity::new(0, 100), 1),
            Body::Airport(Airport {
                common: PointCommon::new(ident, "name", Point::new(47.45, 8.55)),
            }),
        ))
        .unwrap();
        obj
    }

    #[test]
    fn save_then_load_round_trips_through_in_memory_store() {
        let store = ObjectStore::in_memory();
        let obj = airport("LSZH");
        let uuid = obj.uuid();
        store.save(obj).unwrap();
        let loaded = store.load(uuid).unwrap().unwrap();
        assert_eq!(loaded.uuid(), uuid);
        assert_eq!(store.find_by_ident("LSZH").unwrap(), vec![uuid]);
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn sqlite_backend_persists_and_resolves_dependencies() {
        let store = ObjectStore::open_in_memory().unwrap();
        let host = airport("LSZH");
        let host_uuid = host.uuid();
        store.save(host).unwrap();

        let mut collocation = Object::new(Uuid::new_random(), VariantKind::AirportCollocation);
        collocation
            .add_timeslice(TimeSlice::new(
                SliceHeader::baseline(Validity::new(0, 100), 1),
                Body::AirportCollocation(crate::model::AirportCollocation {
                    host_airport: crate::id::Link::new(host_uuid),
                    discriminator: "HELI".into(),
                    common: PointCommon::new("LSZH-H", "Zurich Heliport", Point::new(47.45, 8.55)),
                }),
            ))
            .unwrap();
        let collocation_uuid = collocation.uuid();
        store.save(collocation).unwrap();

        assert_eq!(store.find_dependencies(collocation_uuid).unwrap(), vec![host_uuid]);
        assert_eq!(store.find_dependson(host_uuid).unwrap(), vec![collocation_uuid]);
    }

    fn restriction(ident: &str) -> Object {
        use crate::model::{Condition, FlightRestriction, RestrictionKind};

        let mut obj = Object::new(Uuid::new_random(), VariantKind::FlightRestriction);
        obj.add_timeslice(TimeSlice::new(
            SliceHeader::baseline(Validity::new(0, 100), 1),
            Body::FlightRestriction(Box::new(FlightRestriction::new(
                ident,
                RestrictionKind::Forbidden,
                Condition::Constant(false),
            ))),
        ))
        .unwrap();
        obj
    }

    #[test]
    fn set_rule_trace_and_enabled_toggle_the_saved_object() {
        let store = ObjectStore::in_memory();
        let obj = restriction("LF-R1");
        let uuid = obj.uuid();
        store.save(obj).unwrap();

        store.set_rule_trace(uuid, true).unwrap();
        store.set_rule_enabled(uuid, false).unwrap();

        let reloaded = store.load(uuid).unwrap().unwrap();
        match reloaded.latest_body().unwrap() {
            Body::FlightRestriction(r) => {
                assert!(r.trace);
                assert!(!r.enabled);
            }
            _ => panic!("expected a flight_restriction"),
        }
    }

    #[test]
    fn set_rule_trace_rejects_a_non_restriction_uuid() {
        let store = ObjectStore::in_memory();
        let obj = airport("LSZH");
        let uuid = obj.uuid();
        store.save(obj).unwrap();
        assert!(store.set_rule_trace(uuid, true).is_err());
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn store_options_refuses_to_create_a_schema_without_allow_migration() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fresh.sqlite");
        let result = StoreOptions::new().path(path).allow_migration(false).open();
        assert!(result.is_err());
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn store_options_opens_and_persists_with_migration_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.sqlite");

        let store = StoreOptions::new()
            .path(path.clone())
            .wal(true)
            .allow_migration(true)
            .open()
            .unwrap();
        let obj = airport("LSZH");
        let uuid = obj.uuid();
        store.save(obj).unwrap();
        drop(store);

        let reopened = StoreOptions::new().path(path).allow_migration(false).open().unwrap();
        assert!(reopened.load(uuid).unwrap().is_some());
    }
}
