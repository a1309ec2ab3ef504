//! Track state bookkeeping.
//!
//! Two keyed tables behind a single reader/writer lock: tracks this endpoint
//! advertised (local) and tracks observed from the peer (remote). The lock
//! spans both tables so the Add dedup check and the table write it guards
//! are one atomic step.

use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::id_types::TrackId;
use crate::track::TrackInfo;
use crate::types::TrackMap;

#[derive(Default)]
struct Tables {
    local: TrackMap,
    remote: TrackMap,
}

/// Concurrency-safe store for both track tables. Reads may proceed
/// concurrently; any mutation is exclusive.
#[derive(Default)]
pub struct TrackStore {
    tables: RwLock<Tables>,
}

impl TrackStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables {
                local: HashMap::new(),
                remote: HashMap::new(),
            }),
        }
    }

    /// Records a locally advertised track.
    pub async fn insert_local(&self, info: TrackInfo) {
        let mut tables = self.tables.write().await;
        tables.local.insert(info.id().clone(), info);
    }

    /// Evicts a locally advertised track, returning it if it was present.
    pub async fn remove_local(&self, id: &TrackId) -> Option<TrackInfo> {
        let mut tables = self.tables.write().await;
        tables.local.remove(id)
    }

    /// Upserts a remote-observed track. Returns `true` when the id was
    /// already known, which is the signal to suppress a refresh Add; the
    /// newest `TrackInfo` wins either way.
    pub async fn upsert_remote(&self, info: TrackInfo) -> bool {
        let mut tables = self.tables.write().await;
        tables.remote.insert(info.id().clone(), info).is_some()
    }

    /// Evicts a remote-observed track.
    pub async fn remove_remote(&self, id: &TrackId) {
        let mut tables = self.tables.write().await;
        tables.remote.remove(id);
    }

    /// Point-in-time copy of the local table. Never a live view.
    pub async fn local_tracks(&self) -> Vec<TrackInfo> {
        let tables = self.tables.read().await;
        tables.local.values().cloned().collect()
    }

    /// Point-in-time copy of the remote table. Never a live view.
    pub async fn remote_tracks(&self) -> Vec<TrackInfo> {
        let tables = self.tables.read().await;
        tables.remote.values().cloned().collect()
    }
}
