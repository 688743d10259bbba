//! Persistence collaborators for the engine: stimulus catalog, sessions,
//! snapshots, choice history, summaries and metrics.
//!
//! [`Store`] dispatches to one backend; both backends honour the same
//! atomicity for `commit_choice` and `complete_session`.

pub mod memory;
pub mod schema;
pub mod sqlite;

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::taste::metrics::AlgorithmMetricsRecord;
use crate::taste::types::{
    Category, ChoiceRecord, FinalPreferenceSummary, SessionRecord, StimulusItem,
};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("session not found: {0}")]
    SessionNotFound(String),
    #[error("corrupt row: {0}")]
    Corrupt(String),
    #[error("write rejected: {0}")]
    WriteRejected(String),
    #[error("read rejected: {0}")]
    ReadRejected(String),
}

#[derive(Clone)]
pub enum Store {
    Memory(Arc<MemoryStore>),
    Sqlite(Arc<SqliteStore>),
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Store").field(&self.kind()).finish()
    }
}

impl Store {
    pub fn memory() -> Self {
        Self::Memory(Arc::new(MemoryStore::new()))
    }

    pub async fn sqlite(path: &Path) -> Result<Self, StoreError> {
        Ok(Self::Sqlite(Arc::new(SqliteStore::open(path).await?)))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Sqlite(_) => "sqlite",
        }
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        match self {
            Self::Memory(_) => Ok(()),
            Self::Sqlite(s) => s.ping().await,
        }
    }

    pub async fn list_by_category(&self, category: Category) -> Result<Vec<StimulusItem>, StoreError> {
        match self {
            Self::Memory(s) => Ok(s.list_by_category(category)),
            Self::Sqlite(s) => s.list_by_category(category).await,
        }
    }

    /// Items in the order requested; unknown ids are skipped.
    pub async fn lookup_by_ids(&self, ids: &[i64]) -> Result<Vec<StimulusItem>, StoreError> {
        match self {
            Self::Memory(s) => Ok(s.lookup_by_ids(ids)),
            Self::Sqlite(s) => s.lookup_by_ids(ids).await,
        }
    }

    pub async fn upsert_items(&self, items: &[StimulusItem]) -> Result<usize, StoreError> {
        match self {
            Self::Memory(s) => s.upsert_items(items),
            Self::Sqlite(s) => s.upsert_items(items).await,
        }
    }

    pub async fn create_session(&self, session: &SessionRecord, snapshot: &str) -> Result<(), StoreError> {
        match self {
            Self::Memory(s) => s.create_session(session, snapshot),
            Self::Sqlite(s) => s.create_session(session, snapshot).await,
        }
    }

    pub async fn get_session(&self, session_id: &str) -> Result<Option<SessionRecord>, StoreError> {
        match self {
            Self::Memory(s) => Ok(s.get_session(session_id)),
            Self::Sqlite(s) => s.get_session(session_id).await,
        }
    }

    pub async fn load_snapshot(&self, session_id: &str) -> Result<Option<String>, StoreError> {
        match self {
            Self::Memory(s) => s.load_snapshot(session_id),
            Self::Sqlite(s) => s.load_snapshot(session_id).await,
        }
    }

    pub async fn save_snapshot(&self, session_id: &str, snapshot: &str) -> Result<(), StoreError> {
        match self {
            Self::Memory(s) => s.save_snapshot(session_id, snapshot),
            Self::Sqlite(s) => s.save_snapshot(session_id, snapshot).await,
        }
    }

    /// Appends the choice, replaces the snapshot and bumps the interaction
    /// count in one unit; on error nothing is written.
    pub async fn commit_choice(&self, choice: &ChoiceRecord, snapshot: &str) -> Result<(), StoreError> {
        match self {
            Self::Memory(s) => s.commit_choice(choice, snapshot),
            Self::Sqlite(s) => s.commit_choice(choice, snapshot).await,
        }
    }

    pub async fn list_choices(&self, session_id: &str) -> Result<Vec<ChoiceRecord>, StoreError> {
        match self {
            Self::Memory(s) => Ok(s.list_choices(session_id)),
            Self::Sqlite(s) => s.list_choices(session_id).await,
        }
    }

    /// Records the final choice, snapshot, summary and metrics and closes
    /// the session in one unit.
    pub async fn complete_session(
        &self,
        choice: &ChoiceRecord,
        snapshot: &str,
        summary: &FinalPreferenceSummary,
        metrics: &AlgorithmMetricsRecord,
        completed_at_ms: i64,
    ) -> Result<(), StoreError> {
        match self {
            Self::Memory(s) => s.complete_session(choice, snapshot, summary, metrics, completed_at_ms),
            Self::Sqlite(s) => s.complete_session(choice, snapshot, summary, metrics, completed_at_ms).await,
        }
    }

    pub async fn get_summary(&self, session_id: &str) -> Result<Option<FinalPreferenceSummary>, StoreError> {
        match self {
            Self::Memory(s) => Ok(s.get_summary(session_id)),
            Self::Sqlite(s) => s.get_summary(session_id).await,
        }
    }

    /// Most recent records first.
    pub async fn list_metrics(&self, limit: usize) -> Result<Vec<AlgorithmMetricsRecord>, StoreError> {
        match self {
            Self::Memory(s) => Ok(s.list_metrics(limit)),
            Self::Sqlite(s) => s.list_metrics(limit).await,
        }
    }
}
