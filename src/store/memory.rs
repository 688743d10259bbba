use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use crate::store::StoreError;
use crate::taste::metrics::AlgorithmMetricsRecord;
use crate::taste::types::{
    Category, ChoiceRecord, FinalPreferenceSummary, SessionRecord, StimulusItem,
};

#[derive(Default)]
struct Inner {
    items: BTreeMap<i64, StimulusItem>,
    sessions: HashMap<String, SessionRecord>,
    snapshots: HashMap<String, String>,
    choices: HashMap<String, Vec<ChoiceRecord>>,
    summaries: HashMap<String, FinalPreferenceSummary>,
    metrics: Vec<AlgorithmMetricsRecord>,
}

/// Process-local store. Writes can be switched off to exercise the
/// persistence-failure path.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }

    /// Makes snapshot reads fail, to exercise transient read errors.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::Relaxed);
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(StoreError::WriteRejected("memory store is read-only".to_string()));
        }
        Ok(())
    }

    pub fn list_by_category(&self, category: Category) -> Vec<StimulusItem> {
        self.inner
            .read()
            .items
            .values()
            .filter(|item| item.category == category)
            .cloned()
            .collect()
    }

    pub fn lookup_by_ids(&self, ids: &[i64]) -> Vec<StimulusItem> {
        let inner = self.inner.read();
        ids.iter().filter_map(|id| inner.items.get(id).cloned()).collect()
    }

    pub fn upsert_items(&self, items: &[StimulusItem]) -> Result<usize, StoreError> {
        self.check_writable()?;
        let mut inner = self.inner.write();
        for item in items {
            inner.items.insert(item.id, item.clone());
        }
        Ok(items.len())
    }

    pub fn create_session(&self, session: &SessionRecord, snapshot: &str) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut inner = self.inner.write();
        inner.sessions.insert(session.id.clone(), session.clone());
        inner.snapshots.insert(session.id.clone(), snapshot.to_string());
        inner.choices.entry(session.id.clone()).or_default();
        Ok(())
    }

    pub fn get_session(&self, session_id: &str) -> Option<SessionRecord> {
        self.inner.read().sessions.get(session_id).cloned()
    }

    pub fn load_snapshot(&self, session_id: &str) -> Result<Option<String>, StoreError> {
        if self.fail_reads.load(Ordering::Relaxed) {
            return Err(StoreError::ReadRejected("snapshot reads disabled".to_string()));
        }
        Ok(self.inner.read().snapshots.get(session_id).cloned())
    }

    pub fn save_snapshot(&self, session_id: &str, snapshot: &str) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut inner = self.inner.write();
        if !inner.sessions.contains_key(session_id) {
            return Err(StoreError::SessionNotFound(session_id.to_string()));
        }
        inner.snapshots.insert(session_id.to_string(), snapshot.to_string());
        Ok(())
    }

    pub fn commit_choice(&self, choice: &ChoiceRecord, snapshot: &str) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut inner = self.inner.write();
        let session = inner
            .sessions
            .get_mut(&choice.session_id)
            .ok_or_else(|| StoreError::SessionNotFound(choice.session_id.clone()))?;
        session.interaction_count += 1;
        inner
            .snapshots
            .insert(choice.session_id.clone(), snapshot.to_string());
        inner
            .choices
            .entry(choice.session_id.clone())
            .or_default()
            .push(choice.clone());
        Ok(())
    }

    pub fn list_choices(&self, session_id: &str) -> Vec<ChoiceRecord> {
        self.inner
            .read()
            .choices
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn complete_session(
        &self,
        choice: &ChoiceRecord,
        snapshot: &str,
        summary: &FinalPreferenceSummary,
        metrics: &AlgorithmMetricsRecord,
        completed_at_ms: i64,
    ) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut inner = self.inner.write();
        let session_id = choice.session_id.clone();
        let session = inner
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| StoreError::SessionNotFound(session_id.clone()))?;
        session.interaction_count += 1;
        session.completed_at_ms = Some(completed_at_ms);
        inner.snapshots.insert(session_id.clone(), snapshot.to_string());
        inner
            .choices
            .entry(session_id.clone())
            .or_default()
            .push(choice.clone());
        inner.summaries.insert(session_id.clone(), summary.clone());
        inner.metrics.retain(|m| m.session_id != session_id);
        inner.metrics.push(metrics.clone());
        Ok(())
    }

    pub fn get_summary(&self, session_id: &str) -> Option<FinalPreferenceSummary> {
        self.inner.read().summaries.get(session_id).cloned()
    }

    pub fn list_metrics(&self, limit: usize) -> Vec<AlgorithmMetricsRecord> {
        self.inner
            .read()
            .metrics
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taste::types::{ChosenSide, ComparisonEvent, StatedPreferences};
    use crate::taste::variant::Variant;

    fn item(id: i64, category: Category) -> StimulusItem {
        StimulusItem {
            id,
            image_url: None,
            style: Some("minimalist".into()),
            subject: None,
            palette: None,
            complexity: None,
            category,
        }
    }

    fn session(id: &str) -> SessionRecord {
        SessionRecord {
            id: id.to_string(),
            variant: Variant::Advanced,
            stated: StatedPreferences::default(),
            interaction_count: 0,
            created_at_ms: 0,
            completed_at_ms: None,
        }
    }

    fn choice(session_id: &str, seq: u32) -> ChoiceRecord {
        ChoiceRecord {
            session_id: session_id.to_string(),
            event: ComparisonEvent {
                left: item(1, Category::Style),
                right: item(2, Category::Style),
                chosen: ChosenSide::Left,
                latency_ms: 800,
                sequence_index: seq,
            },
            recorded_at_ms: 10,
        }
    }

    #[test]
    fn catalog_lookup_preserves_request_order() {
        let store = MemoryStore::new();
        store
            .upsert_items(&[item(3, Category::Color), item(1, Category::Style), item(2, Category::Style)])
            .expect("upsert");
        assert_eq!(store.list_by_category(Category::Style).len(), 2);
        let ids: Vec<i64> = store.lookup_by_ids(&[3, 99, 1]).iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![3, 1]);
    }

    #[test]
    fn commit_choice_is_all_or_nothing() {
        let store = MemoryStore::new();
        store.create_session(&session("s"), "{}").expect("create");
        store.set_fail_writes(true);
        assert!(store.commit_choice(&choice("s", 1), "next").is_err());
        assert_eq!(store.get_session("s").map(|s| s.interaction_count), Some(0));
        assert_eq!(store.load_snapshot("s").expect("read").as_deref(), Some("{}"));
        assert!(store.list_choices("s").is_empty());

        store.set_fail_writes(false);
        store.commit_choice(&choice("s", 1), "next").expect("commit");
        assert_eq!(store.get_session("s").map(|s| s.interaction_count), Some(1));
        assert_eq!(store.load_snapshot("s").expect("read").as_deref(), Some("next"));
        assert_eq!(store.list_choices("s").len(), 1);
    }

    #[test]
    fn commit_for_unknown_session_fails() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.commit_choice(&choice("ghost", 1), "x"),
            Err(StoreError::SessionNotFound(_))
        ));
    }
}
