//! Choice processing: turns one comparison into weighted evidence.
//!
//! Weight = response-time step × experience ramp × current consistency.
//! Variants may switch to uniform weighting and append modifier hooks that
//! run after the base scoring step.

use serde::{Deserialize, Serialize};

use crate::taste::model::PreferenceModel;
use crate::taste::types::ComparisonEvent;

pub const TIME_WEIGHT_STEPS: [f64; 5] = [1.5, 1.2, 1.0, 0.8, 0.6];

const STYLE_REJECT_PENALTY: f64 = 0.5;
const SUBJECT_REJECT_PENALTY: f64 = 0.3;
const PALETTE_FACTOR: f64 = 0.7;
const CONSISTENCY_STYLE_THRESHOLD: f64 = 2.0;
const CONSISTENCY_GAIN: f64 = 0.05;
const CONSISTENCY_LOSS: f64 = 0.02;
const CONSISTENCY_VARIANCE_LIMIT: f64 = 0.5;
const CONFIDENCE_GAIN: f64 = 0.05;
const CONFIDENCE_LOSS: f64 = 0.02;
const QUICK_LATENCY_MS: i64 = 2000;
const SLOW_LATENCY_MS: i64 = 5000;
const EMOTION_LATENCY_MS: i64 = 1500;

const COMPLEXITY_BUCKETS: &[(&str, f64)] = &[
    ("ultra minimal", 0.1),
    ("single element", 0.2),
    ("simple clean", 0.3),
    ("3 simple shapes", 0.4),
    ("balanced moderate", 0.5),
    ("5-7 layered elements", 0.6),
    ("rich detailed", 0.7),
    ("10+ intricate details", 0.8),
    ("maximum", 0.9),
    ("dense maximum complexity", 1.0),
];

pub const DEFAULT_COMPLEXITY: f64 = 0.5;

/// Response-time weight: faster decisions carry more evidence.
pub fn time_weight(latency_ms: i64) -> f64 {
    if latency_ms < 1000 {
        TIME_WEIGHT_STEPS[0]
    } else if latency_ms < 2000 {
        TIME_WEIGHT_STEPS[1]
    } else if latency_ms < 3500 {
        TIME_WEIGHT_STEPS[2]
    } else if latency_ms < 5000 {
        TIME_WEIGHT_STEPS[3]
    } else {
        TIME_WEIGHT_STEPS[4]
    }
}

pub fn experience_weight(sequence_index: u32) -> f64 {
    (0.8 + 0.02 * sequence_index as f64).min(1.2)
}

pub fn complexity_value(bucket: Option<&str>) -> f64 {
    let Some(bucket) = bucket else {
        return DEFAULT_COMPLEXITY;
    };
    let normalized = bucket.trim().to_lowercase();
    COMPLEXITY_BUCKETS
        .iter()
        .find(|(label, _)| *label == normalized)
        .map(|(_, v)| *v)
        .unwrap_or(DEFAULT_COMPLEXITY)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weighting {
    /// Every choice counts 1.0.
    Uniform,
    /// Response time, experience and consistency multiply together.
    Adaptive,
}

/// Extra bookkeeping appended after the base scoring step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventModifier {
    EmotionalTone,
}

impl EventModifier {
    fn apply(&self, model: &mut PreferenceModel, event: &ComparisonEvent) {
        match self {
            Self::EmotionalTone => {
                if event.latency_ms >= EMOTION_LATENCY_MS {
                    return;
                }
                match event.chosen_item().style() {
                    Some("minimalist") => model.emotional_tones.add("calm", 1.0),
                    Some("maximalist") => model.emotional_tones.add("energetic", 1.0),
                    _ => {}
                }
            }
        }
    }
}

/// Outcome of processing one event, for logging and metrics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChoiceWeight {
    pub time_weight: f64,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceProcessor {
    weighting: Weighting,
    modifiers: Vec<EventModifier>,
}

impl Default for ChoiceProcessor {
    fn default() -> Self {
        Self::new(Weighting::Adaptive, Vec::new())
    }
}

impl ChoiceProcessor {
    pub fn new(weighting: Weighting, modifiers: Vec<EventModifier>) -> Self {
        Self {
            weighting,
            modifiers,
        }
    }

    pub fn weighting(&self) -> Weighting {
        self.weighting
    }

    pub fn modifiers(&self) -> &[EventModifier] {
        &self.modifiers
    }

    fn choice_weight(&self, model: &PreferenceModel, event: &ComparisonEvent) -> ChoiceWeight {
        let tw = time_weight(event.latency_ms);
        let weight = match self.weighting {
            Weighting::Uniform => 1.0,
            Weighting::Adaptive => {
                tw * experience_weight(event.sequence_index) * model.consistency()
            }
        };
        ChoiceWeight {
            time_weight: tw,
            weight,
        }
    }

    pub fn process(&self, model: &mut PreferenceModel, event: &ComparisonEvent) -> ChoiceWeight {
        let cw = self.choice_weight(model, event);
        let weight = cw.weight;
        let (chosen, rejected) = event.sides();

        model.weight_sum += weight;
        model.weight_count += 1;

        if let (Some(cs), Some(rs)) = (chosen.style(), rejected.style()) {
            if cs != rs {
                model.style_scores.add(cs, weight);
                model.style_scores.add(rs, -STYLE_REJECT_PENALTY * weight);
                if let Some(subject) = chosen.subject() {
                    model.correlations.add(cs, subject, weight);
                }
            }
        }

        if let (Some(cs), Some(rs)) = (chosen.subject(), rejected.subject()) {
            if cs != rs {
                model.subject_scores.add(cs, weight);
                model.subject_scores.add(rs, -SUBJECT_REJECT_PENALTY * weight);
            }
        }

        if let (Some(cp), Some(rp)) = (chosen.palette(), rejected.palette()) {
            if cp != rp {
                model.palette_scores.add(cp, PALETTE_FACTOR * weight);
            }
        }

        model.complexity_weighted_sum += complexity_value(chosen.complexity()) * weight;
        model.complexity_weight_total += weight;

        if let Some(cs) = chosen.style() {
            if model.style_scores.get(cs) > CONSISTENCY_STYLE_THRESHOLD {
                model.adjust_consistency(CONSISTENCY_GAIN);
            }
        }
        if (cw.time_weight - model.running_average_weight()).abs() > CONSISTENCY_VARIANCE_LIMIT {
            model.adjust_consistency(-CONSISTENCY_LOSS);
        }

        if event.latency_ms < QUICK_LATENCY_MS && weight > 1.0 {
            model.adjust_confidence(CONFIDENCE_GAIN);
        }
        if event.latency_ms > SLOW_LATENCY_MS {
            model.adjust_confidence(-CONFIDENCE_LOSS);
        }

        for modifier in &self.modifiers {
            modifier.apply(model, event);
        }

        model.events_processed += 1;
        cw
    }

    /// Replays an ordered history into a fresh model.
    pub fn replay<'a>(&self, events: impl IntoIterator<Item = &'a ComparisonEvent>) -> PreferenceModel {
        let mut model = PreferenceModel::new();
        for event in events {
            self.process(&mut model, event);
        }
        model
    }
}

pub fn is_quick_decision(latency_ms: i64) -> bool {
    latency_ms < QUICK_LATENCY_MS
}

pub fn is_slow_decision(latency_ms: i64) -> bool {
    latency_ms > SLOW_LATENCY_MS
}
