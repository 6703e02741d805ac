// SPDX-License-Identifier: Apache-2.0
// Copyright 2024, 2026 Joe Pearson

//! Dependency-ordered recompute engine.
//!
//! After an import lands new or temporary objects, every affected object
//! must be re-linked and re-derived in dependency order: an airspace that
//! contributes to another airspace's geometry must be recomputed before the
//! dependent one, or the dependent picks up stale bounds.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use log::{debug, trace, warn};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::error::Error;
use crate::geom::Point;
use crate::id::Uuid;
use crate::store::ObjectStore;

/// External terrain elevation lookup, consulted while recomputing
/// point-like variants whose elevation is not itself part of the imported
/// data.
pub trait TerrainDb {
    fn elevation_ft(&self, point: Point) -> Option<i32>;
}

/// A `TerrainDb` that never resolves an elevation; used where terrain data
/// is unavailable and elevations are trusted as imported.
pub struct NoTerrainDb;

impl TerrainDb for NoTerrainDb {
    fn elevation_ft(&self, _point: Point) -> Option<i32> {
        None
    }
}

/// Everything a variant's `recompute` needs besides its own fields.
pub struct RecomputeContext<'a> {
    pub store: &'a ObjectStore,
    pub terrain: &'a dyn TerrainDb,
    /// The instant recomputation is evaluated as-of, UTC seconds.
    pub as_of: i64,
}

/// How many objects `run` flushes the store's cache after, bounding memory
/// growth during a large recompute pass.
const FLUSH_EVERY: usize = 1024;
const FLUSH_MIN_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub struct RecomputeStats {
    pub modified: usize,
    pub unmodified: usize,
}

/// Recomputes every temp-partition object, plus every main-partition
/// object that either transitively depends on one that changed or whose
/// own `modified` timestamp is at or past `modified_after`, in dependency
/// order.
///
/// `modified_after` lets a caller re-derive a time-bounded slice of the
/// main partition (e.g. after a terrain database update) without staging
/// anything into temp first; pass `None` to only propagate from whatever
/// is in temp.
///
/// Returns `Err(Error::Cancelled)` if `cancelled` becomes true partway
/// through; objects processed before cancellation remain recomputed.
pub fn run(
    store: &ObjectStore,
    ctx_terrain: &dyn TerrainDb,
    as_of: i64,
    modified_after: Option<i64>,
    cancelled: &dyn Fn() -> bool,
) -> Result<RecomputeStats, Error> {
    let (order, is_temp) = topological_order(store)?;
    debug!("recompute: {} objects in dependency order", order.len());

    let mut stats = RecomputeStats::default();
    let mut last_flush = Instant::now();
    let mut changed: HashSet<Uuid> = HashSet::new();

    for (i, uuid) in order.iter().enumerate() {
        if cancelled() {
            warn!("recompute cancelled after {i} of {} objects", order.len());
            return Err(Error::Cancelled);
        }

        if !is_temp.contains(uuid) {
            let dependency_changed = store.find_dependencies(*uuid)?.iter().any(|dep| changed.contains(dep));
            let past_cutoff = modified_after.is_some_and(|cutoff| {
                store
                    .load(*uuid)
                    .ok()
                    .flatten()
                    .is_some_and(|obj| obj.slices().iter().any(|s| s.header.modified >= cutoff))
            });
            if !dependency_changed && !past_cutoff {
                trace!("recompute: {uuid} has no changed dependency and is before the cutoff, skipping");
                continue;
            }
        }

        let Some(obj) = store.load(*uuid)? else {
            trace!("recompute: {uuid} vanished before its turn, skipping");
            continue;
        };

        let before = format!("{:?}", obj.slices());
        let mut obj = (*obj).clone();
        let ctx = RecomputeContext {
            store,
            terrain: ctx_terrain,
            as_of,
        };
        obj.link(store, 0)?;
        obj.recompute(&ctx)?;
        let after = format!("{:?}", obj.slices());

        if after == before {
            stats.unmodified += 1;
        } else {
            for slice in obj.slices_mut() {
                slice.header.modified = as_of;
            }
            stats.modified += 1;
            changed.insert(*uuid);
            store.save(obj)?;
        }

        if (i + 1) % FLUSH_EVERY == 0 && last_flush.elapsed() >= FLUSH_MIN_INTERVAL {
            store.flush_cache();
            last_flush = Instant::now();
        }
    }

    debug!(
        "recompute done: {} modified, {} unmodified",
        stats.modified, stats.unmodified
    );
    Ok(stats)
}

/// Builds the dependency digraph over every temp- and main-partition
/// object and returns a topological order (every object before the
/// objects that depend on it, so each is recomputed with inputs already
/// settled) alongside the subset of the order that is temp-partition.
///
/// Unlike a closure grown from a caller-supplied root set, this always
/// spans the whole store: a main object that depends on something a
/// temp-partition object just changed must be found and re-derived even
/// though neither it nor its dependency was ever a "root" of anything.
fn topological_order(store: &ObjectStore) -> Result<(Vec<Uuid>, HashSet<Uuid>), Error> {
    let mut graph = DiGraph::<Uuid, ()>::new();
    let mut nodes: std::collections::HashMap<Uuid, NodeIndex> = std::collections::HashMap::new();

    let mut node_of = |graph: &mut DiGraph<Uuid, ()>, nodes: &mut std::collections::HashMap<Uuid, NodeIndex>, uuid: Uuid| {
        *nodes.entry(uuid).or_insert_with(|| graph.add_node(uuid))
    };

    let temp_uuids = store.all_temp_uuids()?;
    let main_uuids = store.all_main_uuids()?;
    let is_temp: HashSet<Uuid> = temp_uuids.iter().copied().collect();

    for &uuid in temp_uuids.iter().chain(main_uuids.iter()) {
        node_of(&mut graph, &mut nodes, uuid);
    }
    for &uuid in temp_uuids.iter().chain(main_uuids.iter()) {
        let from = node_of(&mut graph, &mut nodes, uuid);
        for dep in store.find_dependencies(uuid)? {
            let to = node_of(&mut graph, &mut nodes, dep);
            // An edge dep -> uuid: dep must be recomputed first.
            graph.add_edge(to, from, ());
        }
    }

    let order = toposort(&graph, None)
        .map(|order| order.into_iter().map(|idx| graph[idx]).collect())
        .map_err(|_| Error::Cycle)?;
    Ok((order, is_temp))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_terrain_db_never_resolves() {
        assert_eq!(NoTerrainDb.elevation_ft(Point::new(0.0, 0.0)), None);
    }
}
