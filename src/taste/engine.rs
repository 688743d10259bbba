//! Session orchestration: variant assignment, per-choice updates, pair
//! selection and completion.
//!
//! Every mutation of a session runs under its [`SessionLocks`] entry and
//! ends in a single atomic store write, so a failed write leaves the
//! session exactly as it was and the request can be retried.

use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::store::Store;
use crate::taste::config::EngineConfig;
use crate::taste::error::EngineError;
use crate::taste::finalizer::finalize;
use crate::taste::metrics::{
    AlgorithmMetricsRecord, MetricsSink, TracingMetricsSink, VariantReport, REPORT_WINDOW,
};
use crate::taste::model::PreferenceModel;
use crate::taste::selector::{fallback_pair, is_fallback_id, SelectionPlan};
use crate::taste::snapshot::{encode_for_store, persist_failure, SessionLocks, StateAdapter};
use crate::taste::types::{
    Category, ChoiceRecord, ChosenSide, ComparisonEvent, FinalPreferenceSummary, PairKey,
    SessionRecord, StatedPreferences, StimulusItem, StimulusPair,
};
use crate::taste::variant::{Variant, VariantProfile, VariantSelector};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStart {
    pub session_id: String,
    pub variant: Variant,
    pub first_pair: StimulusPair,
    pub target_interactions: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChoiceOutcome {
    InProgress {
        next_pair: StimulusPair,
        interaction_count: u32,
        progress: f64,
        confidence: f64,
    },
    Complete {
        summary: FinalPreferenceSummary,
    },
}

impl ChoiceOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }
}

pub struct TasteEngine {
    config: EngineConfig,
    store: Store,
    adapter: StateAdapter,
    locks: SessionLocks,
    variants: VariantSelector,
    metrics: Arc<dyn MetricsSink>,
    rng: Mutex<StdRng>,
}

impl TasteEngine {
    pub fn new(config: EngineConfig, store: Store, metrics: Arc<dyn MetricsSink>) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            variants: VariantSelector::new(config.distribution.clone()),
            adapter: StateAdapter::new(store.clone()),
            locks: SessionLocks::new(),
            metrics,
            rng: Mutex::new(rng),
            store,
            config,
        }
    }

    pub fn with_tracing_metrics(config: EngineConfig, store: Store) -> Self {
        Self::new(config, store, Arc::new(TracingMetricsSink))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn adapter(&self) -> &StateAdapter {
        &self.adapter
    }

    pub async fn start_session(&self, stated: StatedPreferences) -> Result<SessionStart, EngineError> {
        let variant = {
            let mut rng = self.rng.lock();
            self.variants.assign(&mut *rng)
        };
        self.start_session_with_variant(stated, variant).await
    }

    /// Starts a session with a fixed variant instead of a weighted draw.
    pub async fn start_session_with_variant(
        &self,
        stated: StatedPreferences,
        variant: Variant,
    ) -> Result<SessionStart, EngineError> {
        let session_id = uuid::Uuid::new_v4().to_string();
        let profile = variant.profile(&self.config);

        let mut model = PreferenceModel::new();
        let first_pair = self.next_pair(&profile, 0, &mut model).await?;

        let session = SessionRecord {
            id: session_id.clone(),
            variant,
            stated,
            interaction_count: 0,
            created_at_ms: chrono::Utc::now().timestamp_millis(),
            completed_at_ms: None,
        };
        let blob = encode_for_store(&model)?;
        self.store
            .create_session(&session, &blob)
            .await
            .map_err(|e| persist_failure(&session_id, e))?;

        tracing::info!(session_id = %session_id, variant = %variant, "session started");

        Ok(SessionStart {
            session_id,
            variant,
            first_pair,
            target_interactions: self.config.target_interactions,
        })
    }

    /// Builds an event from catalog ids. Fallback ids resolve to the
    /// synthetic pair of `category`.
    pub async fn resolve_event(
        &self,
        left_id: i64,
        right_id: i64,
        chosen: ChosenSide,
        latency_ms: i64,
        sequence_index: u32,
        category: Option<Category>,
    ) -> Result<ComparisonEvent, EngineError> {
        let fallback = fallback_pair(category.unwrap_or_default());
        let lookup: Vec<i64> = [left_id, right_id]
            .into_iter()
            .filter(|id| !is_fallback_id(*id))
            .collect();
        let found = self.store.lookup_by_ids(&lookup).await?;

        let resolve = |id: i64| -> Result<StimulusItem, EngineError> {
            if id == fallback.left.id {
                return Ok(fallback.left.clone());
            }
            if id == fallback.right.id {
                return Ok(fallback.right.clone());
            }
            found
                .iter()
                .find(|item| item.id == id)
                .cloned()
                .ok_or(EngineError::UnknownStimulus(id))
        };

        Ok(ComparisonEvent {
            left: resolve(left_id)?,
            right: resolve(right_id)?,
            chosen,
            latency_ms: latency_ms.max(0),
            sequence_index,
        })
    }

    pub async fn submit_choice(
        &self,
        session_id: &str,
        event: ComparisonEvent,
    ) -> Result<ChoiceOutcome, EngineError> {
        let _guard = self.locks.acquire(session_id).await;

        let Some(session) = self.store.get_session(session_id).await? else {
            return Err(EngineError::SessionNotFound(session_id.to_string()));
        };
        if session.is_complete() {
            return Err(EngineError::SessionComplete(session_id.to_string()));
        }
        let expected = session.interaction_count + 1;
        if event.sequence_index != expected {
            return Err(EngineError::SequenceMismatch {
                expected,
                actual: event.sequence_index,
            });
        }

        let profile = session.variant.profile(&self.config);
        let mut model = self.adapter.load(session_id).await?;
        let weight = profile.processor().process(&mut model, &event);
        mark_answered(&mut model, &event);

        tracing::debug!(
            session_id,
            variant = %session.variant,
            sequence_index = event.sequence_index,
            weight = weight.weight,
            confidence = model.confidence(),
            consistency = model.consistency(),
            "choice processed"
        );

        let now = chrono::Utc::now().timestamp_millis();
        let choice = ChoiceRecord {
            session_id: session_id.to_string(),
            event,
            recorded_at_ms: now,
        };
        let interaction_count = choice.event.sequence_index;

        if interaction_count >= self.config.target_interactions {
            let summary = finalize(&model, &session.stated);
            let mut events: Vec<ComparisonEvent> = self
                .store
                .list_choices(session_id)
                .await?
                .into_iter()
                .map(|c| c.event)
                .collect();
            events.push(choice.event.clone());
            let record = AlgorithmMetricsRecord::from_session(&session, &events, &model, now);

            let blob = encode_for_store(&model)?;
            self.store
                .complete_session(&choice, &blob, &summary, &record, now)
                .await
                .map_err(|e| persist_failure(session_id, e))?;

            self.metrics.emit(&record);

            tracing::info!(session_id, variant = %session.variant, style = %summary.style, "session complete");
            return Ok(ChoiceOutcome::Complete { summary });
        }

        let next_pair = self.next_pair(&profile, interaction_count, &mut model).await?;
        let blob = encode_for_store(&model)?;
        self.store
            .commit_choice(&choice, &blob)
            .await
            .map_err(|e| persist_failure(session_id, e))?;

        Ok(ChoiceOutcome::InProgress {
            next_pair,
            interaction_count,
            progress: interaction_count as f64 / self.config.target_interactions as f64,
            confidence: model.confidence(),
        })
    }

    /// Replays the stored choice history into a fresh model.
    pub async fn rebuild_from_history(&self, session_id: &str) -> Result<PreferenceModel, EngineError> {
        let session = self
            .store
            .get_session(session_id)
            .await?
            .ok_or_else(|| EngineError::SessionNotFound(session_id.to_string()))?;
        let choices = self.store.list_choices(session_id).await?;

        let processor = session.variant.profile(&self.config).processor();
        let mut model = PreferenceModel::new();
        for choice in &choices {
            processor.process(&mut model, &choice.event);
            mark_answered(&mut model, &choice.event);
        }
        Ok(model)
    }

    pub async fn session(&self, session_id: &str) -> Result<SessionRecord, EngineError> {
        self.store
            .get_session(session_id)
            .await?
            .ok_or_else(|| EngineError::SessionNotFound(session_id.to_string()))
    }

    pub async fn summary(&self, session_id: &str) -> Result<FinalPreferenceSummary, EngineError> {
        let session = self.session(session_id).await?;
        if !session.is_complete() {
            return Err(EngineError::SessionInProgress(session_id.to_string()));
        }
        self.store
            .get_summary(session_id)
            .await?
            .ok_or_else(|| EngineError::SessionInProgress(session_id.to_string()))
    }

    pub async fn metrics_report(&self) -> Result<VariantReport, EngineError> {
        let records = self.store.list_metrics(REPORT_WINDOW).await?;
        Ok(VariantReport::aggregate(&records))
    }

    async fn next_pair(
        &self,
        profile: &VariantProfile,
        interaction: u32,
        model: &mut PreferenceModel,
    ) -> Result<StimulusPair, EngineError> {
        let selector = profile.pair_selector();
        let plan = {
            let mut rng = self.rng.lock();
            selector.plan(interaction, model, &mut *rng)
        };

        let category = match plan {
            SelectionPlan::Category(category) => category,
            SelectionPlan::Revisit(revisit) => {
                let items = self.store.lookup_by_ids(&[revisit.left, revisit.right]).await?;
                if let Some(pair) = selector.resolve_revisit(&revisit, &items, model) {
                    return Ok(pair);
                }
                tracing::debug!(left = revisit.left, right = revisit.right, "revisit pair no longer in catalog");
                selector.category_for(interaction, model)
            }
        };

        let items = self.store.list_by_category(category).await?;
        let mut rng = self.rng.lock();
        Ok(selector.choose(category, &items, model, &mut *rng))
    }
}

fn mark_answered(model: &mut PreferenceModel, event: &ComparisonEvent) {
    if is_fallback_id(event.left.id) || is_fallback_id(event.right.id) {
        return;
    }
    model.mark_shown(PairKey::of(&event.left, &event.right));
}
