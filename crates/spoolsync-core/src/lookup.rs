// ── Inventory lookup ──
//
// Resolves a settled selection to a spool record. Each session owns its
// own lookup, so answers (including "absent") are cached per id for the
// life of that session only. There is no retry: a miss stays a miss until
// the id changes or a commit invalidates it.

use std::sync::Arc;

use dashmap::DashMap;
use spoolsync_api::BridgeClient;
use tracing::{debug, warn};

use crate::model::{SpoolId, SpoolRecord, SpoolSelection};

pub struct InventoryLookup {
    client: BridgeClient,
    cache: DashMap<SpoolId, Option<Arc<SpoolRecord>>>,
}

impl InventoryLookup {
    pub fn new(client: BridgeClient) -> Self {
        Self {
            client,
            cache: DashMap::new(),
        }
    }

    /// Look up the record for a selection. `Unset` and `NoSpool` answer
    /// `None` without a request; so does any non-success response.
    pub async fn lookup(&self, selection: SpoolSelection) -> Option<Arc<SpoolRecord>> {
        let id = selection.spool_id()?;
        if let Some(hit) = self.cached(id) {
            debug!(spool = %id, found = hit.is_some(), "inventory cache hit");
            return hit;
        }

        match self.client.get_spool(id.get()).await {
            Ok(record) => {
                let record = record.map(Arc::new);
                self.cache.insert(id, record.clone());
                record
            }
            Err(e) => {
                // Transport failures are reported as absent but not
                // remembered, so the next selection of this id asks again.
                warn!(spool = %id, error = %e, "inventory lookup failed");
                None
            }
        }
    }

    /// Cached answer for `id`: `Some(None)` is a remembered miss.
    pub fn cached(&self, id: SpoolId) -> Option<Option<Arc<SpoolRecord>>> {
        self.cache.get(&id).map(|entry| entry.value().clone())
    }

    pub fn invalidate(&self, id: SpoolId) {
        self.cache.remove(&id);
    }
}
