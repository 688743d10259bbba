//! Versioned preference snapshots and the incremental state adapter.
//!
//! A snapshot carries every piece of model state: the four score tables,
//! the correlation table, complexity accumulators, the running-weight
//! accumulators, both scalars, the shown-pair set and the uncertain queue.
//! Resuming from a snapshot and replaying the full history from scratch
//! must produce the same model.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::OwnedMutexGuard;

use crate::store::{Store, StoreError};
use crate::taste::error::EngineError;
use crate::taste::model::{CorrelationTable, PreferenceModel, ScoreTable, UncertainPair};
use crate::taste::types::PairKey;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u32),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceSnapshot {
    pub version: u32,
    pub saved_at_ms: i64,
    pub style_scores: ScoreTable,
    pub subject_scores: ScoreTable,
    pub palette_scores: ScoreTable,
    pub emotional_tones: ScoreTable,
    pub correlations: CorrelationTable,
    pub complexity_weighted_sum: f64,
    pub complexity_weight_total: f64,
    pub weight_sum: f64,
    pub weight_count: u32,
    pub confidence: f64,
    pub consistency: f64,
    pub shown_pairs: Vec<PairKey>,
    pub uncertain_pairs: Vec<UncertainPair>,
    pub events_processed: u32,
}

impl PreferenceSnapshot {
    pub fn capture(model: &PreferenceModel) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            saved_at_ms: chrono::Utc::now().timestamp_millis(),
            style_scores: model.style_scores.clone(),
            subject_scores: model.subject_scores.clone(),
            palette_scores: model.palette_scores.clone(),
            emotional_tones: model.emotional_tones.clone(),
            correlations: model.correlations.clone(),
            complexity_weighted_sum: model.complexity_weighted_sum,
            complexity_weight_total: model.complexity_weight_total,
            weight_sum: model.weight_sum,
            weight_count: model.weight_count,
            confidence: model.confidence(),
            consistency: model.consistency(),
            shown_pairs: model.shown_pairs.iter().copied().collect(),
            uncertain_pairs: model.uncertain_pairs.iter().cloned().collect(),
            events_processed: model.events_processed,
        }
    }

    pub fn restore(self) -> PreferenceModel {
        let mut model = PreferenceModel::new();
        model.style_scores = self.style_scores;
        model.subject_scores = self.subject_scores;
        model.palette_scores = self.palette_scores;
        model.emotional_tones = self.emotional_tones;
        model.correlations = self.correlations;
        model.complexity_weighted_sum = self.complexity_weighted_sum;
        model.complexity_weight_total = self.complexity_weight_total;
        model.weight_sum = self.weight_sum;
        model.weight_count = self.weight_count;
        model.shown_pairs = self.shown_pairs.into_iter().collect();
        model.uncertain_pairs = self.uncertain_pairs.into_iter().collect();
        model.events_processed = self.events_processed;
        model.restore_scalars(self.confidence, self.consistency);
        model
    }
}

pub fn encode(model: &PreferenceModel) -> Result<String, SnapshotError> {
    Ok(serde_json::to_string(&PreferenceSnapshot::capture(model))?)
}

pub fn decode(raw: &str) -> Result<PreferenceModel, SnapshotError> {
    let snapshot: PreferenceSnapshot = serde_json::from_str(raw)?;
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(SnapshotError::UnsupportedVersion(snapshot.version));
    }
    Ok(snapshot.restore())
}

/// Loads and saves session models through the store.
#[derive(Debug, Clone)]
pub struct StateAdapter {
    store: Store,
}

impl StateAdapter {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// A missing or undecodable snapshot yields a fresh model. A failed
    /// read is returned as an error so the stored snapshot is never
    /// overwritten by a reset model.
    pub async fn load(&self, session_id: &str) -> Result<PreferenceModel, EngineError> {
        let raw = match self.store.load_snapshot(session_id).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Ok(PreferenceModel::new()),
            Err(e) => {
                tracing::warn!(session_id, error = %e, "snapshot read failed");
                return Err(EngineError::Store(e));
            }
        };
        match decode(&raw) {
            Ok(model) => Ok(model),
            Err(e) => {
                tracing::warn!(session_id, error = %e, "corrupt snapshot, starting fresh");
                Ok(PreferenceModel::new())
            }
        }
    }

    pub async fn save(&self, session_id: &str, model: &PreferenceModel) -> Result<(), EngineError> {
        let blob = encode_for_store(model)?;
        self.store
            .save_snapshot(session_id, &blob)
            .await
            .map_err(|e| persist_failure(session_id, e))
    }
}

pub(crate) fn encode_for_store(model: &PreferenceModel) -> Result<String, EngineError> {
    encode(model).map_err(|e| match e {
        SnapshotError::Json(e) => EngineError::StatePersistFailure(StoreError::Serde(e)),
        other => EngineError::StatePersistFailure(StoreError::Corrupt(other.to_string())),
    })
}

pub(crate) fn persist_failure(session_id: &str, error: StoreError) -> EngineError {
    tracing::warn!(session_id, error = %error, "failed to persist session state");
    EngineError::StatePersistFailure(error)
}

/// One async mutex per session id, serialising load, update and save.
///
/// An entry lives only while a guard or a waiter holds it; the last guard
/// to drop removes it, so finished and abandoned sessions leave nothing
/// behind.
#[derive(Debug, Default)]
pub struct SessionLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, session_id: &str) -> SessionGuard<'_> {
        // Built before waiting so a cancelled acquire still prunes.
        let mut guard = SessionGuard {
            locks: self,
            session_id: session_id.to_string(),
            held: None,
        };
        let lock = {
            let mut locks = self.locks.lock();
            locks
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        guard.held = Some(lock.lock_owned().await);
        guard
    }

    /// Removes the entry when the map holds the only reference.
    fn prune(&self, session_id: &str) {
        let mut locks = self.locks.lock();
        if locks
            .get(session_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(session_id);
        }
    }

    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.lock().is_empty()
    }
}

/// Exclusive access to one session until dropped.
#[derive(Debug)]
pub struct SessionGuard<'a> {
    locks: &'a SessionLocks,
    session_id: String,
    held: Option<OwnedMutexGuard<()>>,
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        self.held.take();
        self.locks.prune(&self.session_id);
    }
}
