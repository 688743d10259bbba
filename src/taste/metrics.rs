//! Per-session algorithm metrics and the variant performance report.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::taste::model::PreferenceModel;
use crate::taste::processor::{is_quick_decision, is_slow_decision};
use crate::taste::types::{ComparisonEvent, SessionRecord};
use crate::taste::variant::Variant;

pub const REPORT_WINDOW: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlgorithmMetricsRecord {
    pub variant: Variant,
    pub session_id: String,
    pub completion_time_ms: i64,
    pub confidence: f64,
    pub consistency: f64,
    pub total_choices: u32,
    pub avg_response_time_ms: f64,
    pub quick_decisions: u32,
    pub slow_decisions: u32,
    pub uncertain_pairs: u32,
    pub recorded_at_ms: i64,
}

impl AlgorithmMetricsRecord {
    /// Builds the record from the complete event history, including the final event.
    pub fn from_session(
        session: &SessionRecord,
        events: &[ComparisonEvent],
        model: &PreferenceModel,
        completed_at_ms: i64,
    ) -> Self {
        let total = events.len() as u32;
        let avg_response_time_ms = if events.is_empty() {
            0.0
        } else {
            events.iter().map(|e| e.latency_ms as f64).sum::<f64>() / events.len() as f64
        };

        Self {
            variant: session.variant,
            session_id: session.id.clone(),
            completion_time_ms: (completed_at_ms - session.created_at_ms).max(0),
            confidence: model.confidence(),
            consistency: model.consistency(),
            total_choices: total,
            avg_response_time_ms,
            quick_decisions: events.iter().filter(|e| is_quick_decision(e.latency_ms)).count() as u32,
            slow_decisions: events.iter().filter(|e| is_slow_decision(e.latency_ms)).count() as u32,
            uncertain_pairs: model.uncertain_pairs.len() as u32,
            recorded_at_ms: completed_at_ms,
        }
    }
}

/// Receives one record per completed session.
pub trait MetricsSink: Send + Sync {
    fn emit(&self, record: &AlgorithmMetricsRecord);
}

/// Writes records as structured log events under `taste::metrics`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMetricsSink;

impl MetricsSink for TracingMetricsSink {
    fn emit(&self, record: &AlgorithmMetricsRecord) {
        tracing::info!(
            target: "taste::metrics",
            variant = %record.variant,
            session_id = %record.session_id,
            completion_time_ms = record.completion_time_ms,
            confidence = record.confidence,
            consistency = record.consistency,
            total_choices = record.total_choices,
            avg_response_time_ms = record.avg_response_time_ms,
            "session completed"
        );
    }
}

/// Keeps emitted records in memory.
#[derive(Debug, Default, Clone)]
pub struct CollectingMetricsSink {
    records: Arc<Mutex<Vec<AlgorithmMetricsRecord>>>,
}

impl CollectingMetricsSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AlgorithmMetricsRecord> {
        self.records.lock().clone()
    }
}

impl MetricsSink for CollectingMetricsSink {
    fn emit(&self, record: &AlgorithmMetricsRecord) {
        self.records.lock().push(record.clone());
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantStats {
    pub total_sessions: u32,
    pub avg_completion_time_ms: f64,
    pub avg_response_time_ms: f64,
    pub avg_confidence: f64,
    pub avg_consistency: f64,
    pub quick_decision_rate: f64,
    pub slow_decision_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentSession {
    pub session_id: String,
    pub variant: Variant,
    pub completed_at_ms: i64,
    pub confidence: f64,
    pub avg_response_time_ms: f64,
    pub total_choices: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantReport {
    pub total_sessions: u32,
    pub variants: BTreeMap<Variant, VariantStats>,
    pub algorithms_in_use: Vec<Variant>,
    pub best_performing: Option<Variant>,
    pub recent_sessions: Vec<RecentSession>,
}

const RECENT_SESSIONS: usize = 20;

impl VariantReport {
    /// Aggregates records given newest first.
    pub fn aggregate(records: &[AlgorithmMetricsRecord]) -> Self {
        let mut sums: BTreeMap<Variant, VariantStats> = BTreeMap::new();

        for record in records {
            let stats = sums.entry(record.variant).or_default();
            stats.total_sessions += 1;
            stats.avg_completion_time_ms += record.completion_time_ms as f64;
            stats.avg_response_time_ms += record.avg_response_time_ms;
            stats.avg_confidence += record.confidence;
            stats.avg_consistency += record.consistency;
            if record.total_choices > 0 {
                let total = record.total_choices as f64;
                stats.quick_decision_rate += record.quick_decisions as f64 / total;
                stats.slow_decision_rate += record.slow_decisions as f64 / total;
            }
        }

        for stats in sums.values_mut() {
            let n = stats.total_sessions as f64;
            stats.avg_completion_time_ms /= n;
            stats.avg_response_time_ms /= n;
            stats.avg_confidence /= n;
            stats.avg_consistency /= n;
            stats.quick_decision_rate /= n;
            stats.slow_decision_rate /= n;
        }

        let mut best_performing: Option<(Variant, f64)> = None;
        for (variant, stats) in &sums {
            match best_performing {
                Some((_, best)) if stats.avg_confidence <= best => {}
                _ => best_performing = Some((*variant, stats.avg_confidence)),
            }
        }

        let recent_sessions = records
            .iter()
            .take(RECENT_SESSIONS)
            .map(|r| RecentSession {
                session_id: r.session_id.clone(),
                variant: r.variant,
                completed_at_ms: r.recorded_at_ms,
                confidence: r.confidence,
                avg_response_time_ms: r.avg_response_time_ms,
                total_choices: r.total_choices,
            })
            .collect();

        Self {
            total_sessions: records.len() as u32,
            algorithms_in_use: sums.keys().copied().collect(),
            best_performing: best_performing.map(|(v, _)| v),
            variants: sums,
            recent_sessions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(variant: Variant, confidence: f64, quick: u32, slow: u32) -> AlgorithmMetricsRecord {
        AlgorithmMetricsRecord {
            variant,
            session_id: format!("{variant}-{confidence}"),
            completion_time_ms: 60_000,
            confidence,
            consistency: 1.0,
            total_choices: 20,
            avg_response_time_ms: 1500.0,
            quick_decisions: quick,
            slow_decisions: slow,
            uncertain_pairs: 0,
            recorded_at_ms: 1,
        }
    }

    #[test]
    fn empty_report() {
        let report = VariantReport::aggregate(&[]);
        assert_eq!(report.total_sessions, 0);
        assert!(report.best_performing.is_none());
        assert!(report.variants.is_empty());
    }

    #[test]
    fn aggregates_per_variant() {
        let records = vec![
            record(Variant::Basic, 0.4, 10, 0),
            record(Variant::Advanced, 0.9, 20, 0),
            record(Variant::Advanced, 0.7, 10, 10),
        ];
        let report = VariantReport::aggregate(&records);
        assert_eq!(report.total_sessions, 3);
        assert_eq!(report.algorithms_in_use, vec![Variant::Basic, Variant::Advanced]);
        let advanced = &report.variants[&Variant::Advanced];
        assert_eq!(advanced.total_sessions, 2);
        assert!((advanced.avg_confidence - 0.8).abs() < 1e-12);
        assert!((advanced.quick_decision_rate - 0.75).abs() < 1e-12);
        assert!((advanced.slow_decision_rate - 0.25).abs() < 1e-12);
        assert_eq!(report.best_performing, Some(Variant::Advanced));
        assert_eq!(report.recent_sessions.len(), 3);
    }

    #[test]
    fn record_from_session_counts_decisions() {
        use crate::taste::types::{Category, ChosenSide, StatedPreferences, StimulusItem};

        let item = |id| StimulusItem {
            id,
            image_url: None,
            style: None,
            subject: None,
            palette: None,
            complexity: None,
            category: Category::Style,
        };
        let events: Vec<ComparisonEvent> = [500, 2500, 6000, 900]
            .iter()
            .enumerate()
            .map(|(i, latency)| ComparisonEvent {
                left: item(1),
                right: item(2),
                chosen: ChosenSide::Left,
                latency_ms: *latency,
                sequence_index: i as u32 + 1,
            })
            .collect();
        let session = SessionRecord {
            id: "s1".into(),
            variant: Variant::Experimental,
            stated: StatedPreferences::default(),
            interaction_count: 3,
            created_at_ms: 1_000,
            completed_at_ms: None,
        };
        let record =
            AlgorithmMetricsRecord::from_session(&session, &events, &PreferenceModel::new(), 31_000);
        assert_eq!(record.completion_time_ms, 30_000);
        assert_eq!(record.total_choices, 4);
        assert_eq!(record.quick_decisions, 2);
        assert_eq!(record.slow_decisions, 1);
        assert!((record.avg_response_time_ms - 2475.0).abs() < 1e-9);
        assert_eq!(record.variant, Variant::Experimental);
    }
}
