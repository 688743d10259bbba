use std::collections::{BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::taste::types::{PairKey, StyleCorrelation};

pub const CONFIDENCE_MIN: f64 = 0.0;
pub const CONFIDENCE_MAX: f64 = 1.0;
pub const CONSISTENCY_MIN: f64 = 0.5;
pub const CONSISTENCY_MAX: f64 = 1.5;
pub const CONSISTENCY_INITIAL: f64 = 1.0;

/// Label -> score map that remembers insertion order.
///
/// Ranking is a stable sort on score, so equal scores resolve to the label
/// that was inserted first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreTable {
    entries: Vec<(String, f64)>,
}

impl ScoreTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, label: &str) -> f64 {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| *v)
            .unwrap_or(0.0)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.entries.iter().any(|(l, _)| l == label)
    }

    pub fn add(&mut self, label: &str, delta: f64) {
        match self.entries.iter_mut().find(|(l, _)| l == label) {
            Some((_, v)) => *v += delta,
            None => self.entries.push((label.to_string(), delta)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(l, v)| (l.as_str(), *v))
    }

    /// Entries sorted by descending score, ties in insertion order.
    pub fn ranked(&self) -> Vec<(&str, f64)> {
        let mut ranked: Vec<(&str, f64)> = self.iter().collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked
    }

    pub fn top(&self) -> Option<(&str, f64)> {
        self.ranked().into_iter().next()
    }
}

/// Accumulated (style, subject) co-occurrence strength, insertion ordered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationTable {
    entries: Vec<StyleCorrelation>,
}

impl CorrelationTable {
    pub fn add(&mut self, style: &str, subject: &str, weight: f64) {
        match self
            .entries
            .iter_mut()
            .find(|c| c.style == style && c.subject == subject)
        {
            Some(existing) => existing.strength += weight,
            None => self.entries.push(StyleCorrelation {
                style: style.to_string(),
                subject: subject.to_string(),
                strength: weight,
            }),
        }
    }

    pub fn strength(&self, style: &str, subject: &str) -> f64 {
        self.entries
            .iter()
            .find(|c| c.style == style && c.subject == subject)
            .map(|c| c.strength)
            .unwrap_or(0.0)
    }

    pub fn for_style<'a>(&'a self, style: &'a str) -> impl Iterator<Item = &'a StyleCorrelation> {
        self.entries.iter().filter(move |c| c.style == style)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StyleCorrelation> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UncertainPair {
    pub left: i64,
    pub right: i64,
    pub uncertainty: f64,
}

/// Session-scoped preference accumulator.
///
/// Mutated once per comparison event and by the pair selector (shown pairs,
/// uncertain-pair queue); read-only during finalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceModel {
    pub style_scores: ScoreTable,
    pub subject_scores: ScoreTable,
    pub palette_scores: ScoreTable,
    pub emotional_tones: ScoreTable,
    pub correlations: CorrelationTable,
    pub complexity_weighted_sum: f64,
    pub complexity_weight_total: f64,
    /// Sum and count of applied evidence weights, for the running average.
    pub weight_sum: f64,
    pub weight_count: u32,
    confidence: f64,
    consistency: f64,
    pub shown_pairs: BTreeSet<PairKey>,
    pub uncertain_pairs: VecDeque<UncertainPair>,
    pub events_processed: u32,
}

impl Default for PreferenceModel {
    fn default() -> Self {
        Self {
            style_scores: ScoreTable::new(),
            subject_scores: ScoreTable::new(),
            palette_scores: ScoreTable::new(),
            emotional_tones: ScoreTable::new(),
            correlations: CorrelationTable::default(),
            complexity_weighted_sum: 0.0,
            complexity_weight_total: 0.0,
            weight_sum: 0.0,
            weight_count: 0,
            confidence: CONFIDENCE_MIN,
            consistency: CONSISTENCY_INITIAL,
            shown_pairs: BTreeSet::new(),
            uncertain_pairs: VecDeque::new(),
            events_processed: 0,
        }
    }
}

impl PreferenceModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn consistency(&self) -> f64 {
        self.consistency
    }

    pub fn adjust_confidence(&mut self, delta: f64) {
        self.confidence = (self.confidence + delta).clamp(CONFIDENCE_MIN, CONFIDENCE_MAX);
    }

    pub fn adjust_consistency(&mut self, delta: f64) {
        self.consistency = (self.consistency + delta).clamp(CONSISTENCY_MIN, CONSISTENCY_MAX);
    }

    /// Restores scalars from persisted values, clamping anything out of range.
    pub(crate) fn restore_scalars(&mut self, confidence: f64, consistency: f64) {
        self.confidence = if confidence.is_finite() {
            confidence.clamp(CONFIDENCE_MIN, CONFIDENCE_MAX)
        } else {
            CONFIDENCE_MIN
        };
        self.consistency = if consistency.is_finite() {
            consistency.clamp(CONSISTENCY_MIN, CONSISTENCY_MAX)
        } else {
            CONSISTENCY_INITIAL
        };
    }

    pub fn running_average_weight(&self) -> f64 {
        if self.weight_count == 0 {
            0.0
        } else {
            self.weight_sum / self.weight_count as f64
        }
    }

    pub fn average_complexity(&self) -> f64 {
        if self.complexity_weight_total > 0.0 {
            self.complexity_weighted_sum / self.complexity_weight_total
        } else {
            0.5
        }
    }

    pub fn has_shown(&self, key: &PairKey) -> bool {
        self.shown_pairs.contains(key)
    }

    /// Returns false when the key was already present.
    pub fn mark_shown(&mut self, key: PairKey) -> bool {
        self.shown_pairs.insert(key)
    }

    /// Queues a pair for a later revisit. No automatic policy calls this.
    pub fn flag_uncertain(&mut self, left: i64, right: i64, uncertainty: f64) {
        self.uncertain_pairs.push_back(UncertainPair {
            left,
            right,
            uncertainty,
        });
    }

    pub fn next_uncertain(&mut self) -> Option<UncertainPair> {
        self.uncertain_pairs.pop_front()
    }

    /// Field-wise comparison with a float tolerance.
    pub fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        self.same_evidence(other, tolerance)
            && self.shown_pairs == other.shown_pairs
            && self.uncertain_pairs == other.uncertain_pairs
    }

    /// Like [`Self::approx_eq`] but ignores selector bookkeeping
    /// (shown pairs and the uncertain queue).
    pub fn same_evidence(&self, other: &Self, tolerance: f64) -> bool {
        fn close(a: f64, b: f64, tol: f64) -> bool {
            (a - b).abs() <= tol
        }
        fn tables(a: &ScoreTable, b: &ScoreTable, tol: f64) -> bool {
            a.len() == b.len()
                && a.iter()
                    .zip(b.iter())
                    .all(|((la, va), (lb, vb))| la == lb && close(va, vb, tol))
        }

        tables(&self.style_scores, &other.style_scores, tolerance)
            && tables(&self.subject_scores, &other.subject_scores, tolerance)
            && tables(&self.palette_scores, &other.palette_scores, tolerance)
            && tables(&self.emotional_tones, &other.emotional_tones, tolerance)
            && self.correlations.len() == other.correlations.len()
            && self
                .correlations
                .iter()
                .zip(other.correlations.iter())
                .all(|(a, b)| {
                    a.style == b.style
                        && a.subject == b.subject
                        && close(a.strength, b.strength, tolerance)
                })
            && close(self.complexity_weighted_sum, other.complexity_weighted_sum, tolerance)
            && close(self.complexity_weight_total, other.complexity_weight_total, tolerance)
            && close(self.weight_sum, other.weight_sum, tolerance)
            && self.weight_count == other.weight_count
            && close(self.confidence, other.confidence, tolerance)
            && close(self.consistency, other.consistency, tolerance)
            && self.events_processed == other.events_processed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_table_ranking_keeps_insertion_order_on_ties() {
        let mut table = ScoreTable::new();
        table.add("bold", 1.0);
        table.add("calm", 2.0);
        table.add("airy", 2.0);
        let ranked: Vec<&str> = table.ranked().into_iter().map(|(l, _)| l).collect();
        assert_eq!(ranked, vec!["calm", "airy", "bold"]);
        assert_eq!(table.top(), Some(("calm", 2.0)));
    }

    #[test]
    fn score_table_unknown_label_is_zero() {
        let table = ScoreTable::new();
        assert_eq!(table.get("missing"), 0.0);
        assert!(table.top().is_none());
    }

    #[test]
    fn scalars_are_clamped() {
        let mut model = PreferenceModel::new();
        for _ in 0..50 {
            model.adjust_confidence(0.05);
            model.adjust_consistency(0.05);
        }
        assert_eq!(model.confidence(), CONFIDENCE_MAX);
        assert_eq!(model.consistency(), CONSISTENCY_MAX);
        for _ in 0..100 {
            model.adjust_confidence(-0.02);
            model.adjust_consistency(-0.02);
        }
        assert_eq!(model.confidence(), CONFIDENCE_MIN);
        assert_eq!(model.consistency(), CONSISTENCY_MIN);
    }

    #[test]
    fn restore_scalars_rejects_garbage() {
        let mut model = PreferenceModel::new();
        model.restore_scalars(f64::NAN, 9.0);
        assert_eq!(model.confidence(), CONFIDENCE_MIN);
        assert_eq!(model.consistency(), CONSISTENCY_MAX);
    }

    #[test]
    fn uncertain_queue_is_fifo() {
        let mut model = PreferenceModel::new();
        model.flag_uncertain(1, 2, 0.4);
        model.flag_uncertain(3, 4, 0.9);
        assert_eq!(model.next_uncertain().map(|p| p.left), Some(1));
        assert_eq!(model.next_uncertain().map(|p| p.left), Some(3));
        assert!(model.next_uncertain().is_none());
    }

    #[test]
    fn correlation_accumulates() {
        let mut table = CorrelationTable::default();
        table.add("minimalist", "ocean", 1.0);
        table.add("minimalist", "ocean", 0.5);
        table.add("bold", "city", 2.0);
        assert_eq!(table.strength("minimalist", "ocean"), 1.5);
        assert_eq!(table.for_style("bold").count(), 1);
    }

    #[test]
    fn empty_model_complexity_defaults() {
        assert_eq!(PreferenceModel::new().average_complexity(), 0.5);
    }
}
