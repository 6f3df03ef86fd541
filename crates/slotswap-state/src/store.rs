//! StateStore — redb-backed persistence for the deployment record.
//!
//! Values are JSON-serialized into redb's `&[u8]` value columns. The store
//! supports both on-disk and in-memory backends (the latter for testing).

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::debug;

use slotswap_core::SlotPair;

use crate::error::{StateError, StateResult};
use crate::tables::*;
use crate::types::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Persistence used by the orchestrator.
///
/// `StateStore` is the production implementation; the seam lets callers
/// substitute a store whose writes fail.
pub trait DeploymentStore: Send + Sync {
    /// The persisted record, or `None` if nothing has been committed yet.
    fn get(&self) -> StateResult<Option<DeploymentState>>;

    /// Overwrite the record in place.
    fn save(&self, state: &DeploymentState) -> StateResult<()>;

    /// Append an operation outcome to the journal.
    fn record(&self, entry: &OperationRecord) -> StateResult<()>;

    /// Most recent journal entries, newest first.
    fn recent_operations(&self, limit: usize) -> StateResult<Vec<OperationRecord>>;

    /// Load the record, falling back to the first-run state.
    ///
    /// A missing record means "not yet initialized", not an error. A record
    /// whose active port is not one of `slots` is rejected.
    fn load(&self, slots: &SlotPair) -> StateResult<DeploymentState> {
        let state = match self.get()? {
            Some(state) => state,
            None => {
                debug!(active_port = slots.a.port, "no deployment record, using initial state");
                DeploymentState::initial(slots)
            }
        };
        state.active_slot(slots)?;
        Ok(state)
    }
}

/// State store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    ///
    /// Fails if another process already holds the database open.
    pub fn open(path: &Path) -> StateResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(map_err!(Open))?;
        }
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory state store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        txn.open_table(DEPLOYMENT).map_err(map_err!(Table))?;
        txn.open_table(JOURNAL).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }
}

impl DeploymentStore for StateStore {
    // ── Deployment record ──────────────────────────────────────────

    fn get(&self) -> StateResult<Option<DeploymentState>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(DEPLOYMENT).map_err(map_err!(Table))?;
        match table.get(CURRENT_KEY).map_err(map_err!(Read))? {
            Some(guard) => {
                let state: DeploymentState =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }

    fn save(&self, state: &DeploymentState) -> StateResult<()> {
        let value = serde_json::to_vec(state).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(DEPLOYMENT).map_err(map_err!(Table))?;
            table
                .insert(CURRENT_KEY, value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(
            active_port = state.active_port,
            previous_port = ?state.previous_port,
            "deployment state saved"
        );
        Ok(())
    }

    // ── Journal ────────────────────────────────────────────────────

    /// Entries landing in the same millisecond get a zero-padded `-NNNN`
    /// suffix so they sort in insertion order, after the bare key and
    /// before the next millisecond.
    fn record(&self, entry: &OperationRecord) -> StateResult<()> {
        let base = entry.table_key();
        let value = serde_json::to_vec(entry).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(JOURNAL).map_err(map_err!(Table))?;
            let mut key = base.clone();
            let mut seq = 0u32;
            while table.get(key.as_str()).map_err(map_err!(Read))?.is_some() {
                seq += 1;
                key = format!("{base}-{seq:04}");
            }
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    fn recent_operations(&self, limit: usize) -> StateResult<Vec<OperationRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(JOURNAL).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))?.rev() {
            if results.len() >= limit {
                break;
            }
            let (_, value) = entry.map_err(map_err!(Read))?;
            let record: OperationRecord =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(record);
        }
        Ok(results)
    }
}
