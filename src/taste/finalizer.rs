//! Reduces a finished model into the presentable preference summary.

use std::collections::BTreeMap;

use crate::taste::model::PreferenceModel;
use crate::taste::types::{FinalPreferenceSummary, StatedPreferences, StyleCorrelation};

pub const DEFAULT_STYLE: &str = "minimalist";
pub const DEFAULT_SUBJECTS: [&str; 3] = ["nature elements", "geometric shapes", "abstract patterns"];

const SUBJECT_COUNT: usize = 3;
const SECONDARY_STYLES: usize = 2;
const TOP_CORRELATIONS: usize = 3;
const CORRELATION_BOOST: f64 = 0.3;
const BEHAVIORAL_PALETTE_THRESHOLD: f64 = 2.0;

pub fn complexity_descriptor(complexity: f64) -> &'static str {
    if complexity < 0.3 {
        "very minimal"
    } else if complexity < 0.5 {
        "simple and clean"
    } else if complexity < 0.7 {
        "balanced"
    } else if complexity < 0.9 {
        "richly detailed"
    } else {
        "highly complex"
    }
}

pub fn confidence_phrase(confidence: f64) -> &'static str {
    if confidence > 0.7 {
        "strongly prefer"
    } else if confidence > 0.4 {
        "tend to like"
    } else {
        "might enjoy"
    }
}

pub fn consistency_phrase(consistency: f64) -> &'static str {
    if consistency > 1.2 {
        "clear and consistent preferences"
    } else if consistency > 0.8 {
        "developing preferences"
    } else {
        "you're still exploring your taste"
    }
}

pub fn rationale(
    style: &str,
    subjects: &[String],
    complexity: f64,
    confidence: f64,
    consistency: f64,
) -> String {
    let first = subjects.first().map(String::as_str).unwrap_or(DEFAULT_SUBJECTS[0]);
    let second = subjects.get(1).map(String::as_str).unwrap_or(DEFAULT_SUBJECTS[1]);
    format!(
        "Based on your choices, you {} {} style artwork featuring {} and {}, with {} composition. \
         Your decision-making pattern suggests {}.",
        confidence_phrase(confidence),
        style,
        first,
        second,
        complexity_descriptor(complexity),
        consistency_phrase(consistency),
    )
}

/// Top three subjects after the correlation boost, padded from [`DEFAULT_SUBJECTS`].
pub fn ranked_subjects(model: &PreferenceModel, top_style: &str) -> Vec<String> {
    let mut boosted = model.subject_scores.clone();
    for correlation in model.correlations.for_style(top_style) {
        boosted.add(&correlation.subject, CORRELATION_BOOST * correlation.strength);
    }

    let mut subjects: Vec<String> = boosted
        .ranked()
        .into_iter()
        .filter(|(_, score)| *score > 0.0)
        .take(SUBJECT_COUNT)
        .map(|(label, _)| label.to_string())
        .collect();

    for default in DEFAULT_SUBJECTS {
        if subjects.len() >= SUBJECT_COUNT {
            break;
        }
        if !subjects.iter().any(|s| s == default) {
            subjects.push(default.to_string());
        }
    }
    subjects
}

pub fn finalize(model: &PreferenceModel, stated: &StatedPreferences) -> FinalPreferenceSummary {
    let complexity = model.average_complexity();

    let ranked_styles = model.style_scores.ranked();
    let style = ranked_styles
        .first()
        .map(|(label, _)| label.to_string())
        .unwrap_or_else(|| DEFAULT_STYLE.to_string());
    let secondary_styles = ranked_styles
        .iter()
        .skip(1)
        .take(SECONDARY_STYLES)
        .map(|(label, _)| label.to_string())
        .collect();

    let subjects = ranked_subjects(model, &style);

    let palette = match model.palette_scores.top() {
        Some((label, score)) if score > BEHAVIORAL_PALETTE_THRESHOLD => label.to_string(),
        _ => stated.palette.clone(),
    };

    let mut correlations: Vec<StyleCorrelation> = model.correlations.for_style(&style).cloned().collect();
    correlations.sort_by(|a, b| {
        b.strength
            .partial_cmp(&a.strength)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    correlations.truncate(TOP_CORRELATIONS);

    let rationale = rationale(
        &style,
        &subjects,
        complexity,
        model.confidence(),
        model.consistency(),
    );

    FinalPreferenceSummary {
        style,
        subjects,
        complexity,
        palette,
        confidence: model.confidence(),
        consistency: model.consistency(),
        rationale,
        secondary_styles,
        correlations,
        style_distribution: style_distribution(model),
        subject_scores: model
            .subject_scores
            .iter()
            .filter(|(_, score)| *score > 0.0)
            .map(|(label, score)| (label.to_string(), score))
            .collect(),
        orientation: stated.orientation.clone(),
        emotional_tone: model
            .emotional_tones
            .top()
            .filter(|(_, score)| *score > 0.0)
            .map(|(label, _)| label.to_string()),
    }
}

/// Positive style scores normalised to sum to 1.
fn style_distribution(model: &PreferenceModel) -> BTreeMap<String, f64> {
    let positive: Vec<(&str, f64)> = model
        .style_scores
        .iter()
        .filter(|(_, score)| *score > 0.0)
        .collect();
    let total: f64 = positive.iter().map(|(_, s)| s).sum();
    if positive.is_empty() || total <= 0.0 {
        return BTreeMap::from([(DEFAULT_STYLE.to_string(), 1.0)]);
    }
    positive
        .into_iter()
        .map(|(label, score)| (label.to_string(), score / total))
        .collect()
}
