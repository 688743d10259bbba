//! Next-comparison selection.
//!
//! Selection is split in two so the catalog can be queried between the
//! steps: [`PairSelector::plan`] picks a category (or a queued revisit), and
//! [`PairSelector::choose`] scores random candidates from that category's
//! items by heuristic information gain.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::taste::model::{PreferenceModel, UncertainPair};
use crate::taste::types::{Category, PairKey, StimulusItem, StimulusPair};

pub const FALLBACK_LEFT_ID: i64 = -1;
pub const FALLBACK_RIGHT_ID: i64 = -2;

const LOW_CONFIDENCE: f64 = 0.3;
const STYLE_UNCERTAINTY_GAP: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorConfig {
    /// Score candidates by information gain; otherwise the first unseen one wins.
    pub information_gain: bool,
    /// Force style comparisons while confidence is below 0.3.
    pub confidence_override: bool,
    pub revisit_uncertain: bool,
    pub trials: usize,
    pub revisit_after: u32,
    pub revisit_probability: f64,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            information_gain: true,
            confidence_override: true,
            revisit_uncertain: true,
            trials: 10,
            revisit_after: 15,
            revisit_probability: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectionPlan {
    /// Re-ask a queued uncertain pair; the caller resolves its ids.
    Revisit(UncertainPair),
    Category(Category),
}

/// Category schedule by interaction index, before any confidence override.
pub fn scheduled_category(interaction: u32) -> Category {
    match interaction {
        0..=7 => Category::Style,
        8..=12 => Category::Complexity,
        13..=17 => Category::Subject,
        _ => Category::Color,
    }
}

pub fn information_gain(model: &PreferenceModel, left: &StimulusItem, right: &StimulusItem) -> f64 {
    let mut gain = 0.0;
    if left.style() != right.style() {
        gain += 2.0;
    }
    if left.subject() != right.subject() {
        gain += 1.5;
    }
    if left.complexity() != right.complexity() {
        gain += 1.0;
    }
    let left_score = left.style().map(|s| model.style_scores.get(s)).unwrap_or(0.0);
    let right_score = right.style().map(|s| model.style_scores.get(s)).unwrap_or(0.0);
    if (left_score - right_score).abs() < STYLE_UNCERTAINTY_GAP {
        gain += 1.5;
    }
    gain
}

/// Deterministic stand-in used when a category has fewer than two items.
pub fn fallback_pair(category: Category) -> StimulusPair {
    StimulusPair {
        left: StimulusItem {
            id: FALLBACK_LEFT_ID,
            image_url: None,
            style: Some("minimalist".to_string()),
            subject: Some("abstract".to_string()),
            palette: Some("neutral".to_string()),
            complexity: Some("simple".to_string()),
            category,
        },
        right: StimulusItem {
            id: FALLBACK_RIGHT_ID,
            image_url: None,
            style: Some("detailed".to_string()),
            subject: Some("nature".to_string()),
            palette: Some("warm".to_string()),
            complexity: Some("complex".to_string()),
            category,
        },
        category,
    }
}

pub fn is_fallback_id(id: i64) -> bool {
    id == FALLBACK_LEFT_ID || id == FALLBACK_RIGHT_ID
}

#[derive(Debug, Clone, Default)]
pub struct PairSelector {
    config: SelectorConfig,
}

impl PairSelector {
    pub fn new(config: SelectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    pub fn category_for(&self, interaction: u32, model: &PreferenceModel) -> Category {
        if self.config.confidence_override && model.confidence() < LOW_CONFIDENCE {
            return Category::Style;
        }
        scheduled_category(interaction)
    }

    /// Decides between a queued revisit and a fresh category draw.
    ///
    /// The uniform draw only happens when a revisit is possible, so the RNG
    /// stream is unchanged for sessions that never queue uncertain pairs.
    pub fn plan<R: Rng + ?Sized>(
        &self,
        interaction: u32,
        model: &mut PreferenceModel,
        rng: &mut R,
    ) -> SelectionPlan {
        if self.config.revisit_uncertain
            && interaction > self.config.revisit_after
            && !model.uncertain_pairs.is_empty()
            && rng.random::<f64>() < self.config.revisit_probability
        {
            if let Some(pair) = model.next_uncertain() {
                return SelectionPlan::Revisit(pair);
            }
        }
        SelectionPlan::Category(self.category_for(interaction, model))
    }

    /// Picks a pair from `items` and marks it shown.
    pub fn choose<R: Rng + ?Sized>(
        &self,
        category: Category,
        items: &[StimulusItem],
        model: &mut PreferenceModel,
        rng: &mut R,
    ) -> StimulusPair {
        if items.len() < 2 {
            return fallback_pair(category);
        }

        let mut order: Vec<usize> = (0..items.len()).collect();
        let mut best: Option<(usize, usize, f64)> = None;

        for _ in 0..self.config.trials {
            order.shuffle(rng);
            let (l, r) = (order[0], order[1]);
            let (left, right) = (&items[l], &items[r]);
            let key = PairKey::of(left, right);
            if left.id == right.id || model.has_shown(&key) {
                continue;
            }
            let gain = if self.config.information_gain {
                information_gain(model, left, right)
            } else {
                0.0
            };
            match best {
                None => best = Some((l, r, gain)),
                Some((_, _, best_gain)) if gain > best_gain => best = Some((l, r, gain)),
                _ => {}
            }
        }

        let picked = best
            .map(|(l, r, _)| (l, r))
            .or_else(|| first_unshown(items, model));

        match picked {
            Some((l, r)) => {
                let pair = StimulusPair {
                    left: items[l].clone(),
                    right: items[r].clone(),
                    category,
                };
                model.mark_shown(pair.key());
                pair
            }
            None => {
                tracing::debug!(category = %category, "every pair in category already shown");
                fallback_pair(category)
            }
        }
    }

    /// Turns a revisit into a concrete pair once its items are resolved.
    pub fn resolve_revisit(
        &self,
        revisit: &UncertainPair,
        resolved: &[StimulusItem],
        model: &mut PreferenceModel,
    ) -> Option<StimulusPair> {
        let left = resolved.iter().find(|it| it.id == revisit.left)?;
        let right = resolved.iter().find(|it| it.id == revisit.right)?;
        let pair = StimulusPair {
            left: left.clone(),
            right: right.clone(),
            category: left.category,
        };
        model.mark_shown(pair.key());
        Some(pair)
    }
}

/// Exhaustive scan once random trials found nothing unseen.
fn first_unshown(items: &[StimulusItem], model: &PreferenceModel) -> Option<(usize, usize)> {
    for i in 0..items.len() {
        for j in (i + 1)..items.len() {
            if items[i].id == items[j].id {
                continue;
            }
            if !model.has_shown(&PairKey::of(&items[i], &items[j])) {
                return Some((i, j));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn item(id: i64, style: &str, subject: &str, complexity: &str, category: Category) -> StimulusItem {
        StimulusItem {
            id,
            image_url: None,
            style: Some(style.into()),
            subject: Some(subject.into()),
            palette: None,
            complexity: Some(complexity.into()),
            category,
        }
    }

    fn catalog(n: i64, category: Category) -> Vec<StimulusItem> {
        (1..=n)
            .map(|i| item(i, &format!("s{}", i % 3), &format!("t{}", i % 2), "maximum", category))
            .collect()
    }

    #[test]
    fn schedule_bands() {
        assert_eq!(scheduled_category(0), Category::Style);
        assert_eq!(scheduled_category(7), Category::Style);
        assert_eq!(scheduled_category(8), Category::Complexity);
        assert_eq!(scheduled_category(12), Category::Complexity);
        assert_eq!(scheduled_category(13), Category::Subject);
        assert_eq!(scheduled_category(17), Category::Subject);
        assert_eq!(scheduled_category(18), Category::Color);
        assert_eq!(scheduled_category(40), Category::Color);
    }

    #[test]
    fn low_confidence_forces_style() {
        let selector = PairSelector::default();
        let mut model = PreferenceModel::new();
        assert_eq!(selector.category_for(19, &model), Category::Style);
        model.adjust_confidence(0.3);
        assert_eq!(selector.category_for(19, &model), Category::Color);

        let fixed = PairSelector::new(SelectorConfig {
            confidence_override: false,
            ..SelectorConfig::default()
        });
        assert_eq!(fixed.category_for(9, &PreferenceModel::new()), Category::Complexity);
    }

    #[test]
    fn gain_formula() {
        let model = PreferenceModel::new();
        let a = item(1, "x", "p", "maximum", Category::Style);
        let b = item(2, "y", "q", "ultra minimal", Category::Style);
        assert_eq!(information_gain(&model, &a, &b), 6.0);
        let c = item(3, "x", "p", "maximum", Category::Style);
        // identical attributes, equal (zero) scores
        assert_eq!(information_gain(&model, &a, &c), 1.5);
    }

    #[test]
    fn known_style_gap_drops_uncertainty_bonus() {
        let mut model = PreferenceModel::new();
        model.style_scores.add("x", 3.0);
        let a = item(1, "x", "p", "maximum", Category::Style);
        let b = item(2, "y", "p", "maximum", Category::Style);
        assert_eq!(information_gain(&model, &a, &b), 2.0);
    }

    #[test]
    fn single_item_category_yields_fallback() {
        let selector = PairSelector::default();
        let mut model = PreferenceModel::new();
        let mut rng = StdRng::seed_from_u64(7);
        let items = catalog(1, Category::Color);
        let pair = selector.choose(Category::Color, &items, &mut model, &mut rng);
        assert_eq!(pair, fallback_pair(Category::Color));
        assert_eq!(pair.left.category, Category::Color);
        assert!(model.shown_pairs.is_empty());
    }

    #[test]
    fn never_repeats_until_exhausted() {
        let selector = PairSelector::default();
        let mut model = PreferenceModel::new();
        let mut rng = StdRng::seed_from_u64(42);
        let items = catalog(5, Category::Style);
        let mut seen = std::collections::HashSet::new();
        // 5 items -> 10 unordered pairs
        for _ in 0..10 {
            let pair = selector.choose(Category::Style, &items, &mut model, &mut rng);
            assert!(pair.left.id > 0);
            assert!(seen.insert(pair.key()), "pair {} repeated", pair.key());
        }
        let exhausted = selector.choose(Category::Style, &items, &mut model, &mut rng);
        assert_eq!(exhausted, fallback_pair(Category::Style));
    }

    #[test]
    fn same_seed_same_pairs() {
        let selector = PairSelector::default();
        let items = catalog(8, Category::Subject);
        let run = |seed: u64| {
            let mut model = PreferenceModel::new();
            let mut rng = StdRng::seed_from_u64(seed);
            (0..6)
                .map(|_| selector.choose(Category::Subject, &items, &mut model, &mut rng).key())
                .collect::<Vec<_>>()
        };
        assert_eq!(run(9), run(9));
    }

    #[test]
    fn revisit_needs_late_interaction_and_queue() {
        let selector = PairSelector::new(SelectorConfig {
            revisit_probability: 1.0,
            ..SelectorConfig::default()
        });
        let mut rng = StdRng::seed_from_u64(1);
        let mut model = PreferenceModel::new();
        model.flag_uncertain(4, 9, 0.5);

        assert_eq!(
            selector.plan(15, &mut model, &mut rng),
            SelectionPlan::Category(Category::Style)
        );
        match selector.plan(16, &mut model, &mut rng) {
            SelectionPlan::Revisit(p) => assert_eq!((p.left, p.right), (4, 9)),
            other => panic!("expected revisit, got {other:?}"),
        }
        assert!(model.uncertain_pairs.is_empty());
    }

    #[test]
    fn revisit_disabled_for_plain_config() {
        let selector = PairSelector::new(SelectorConfig {
            revisit_uncertain: false,
            revisit_probability: 1.0,
            ..SelectorConfig::default()
        });
        let mut rng = StdRng::seed_from_u64(1);
        let mut model = PreferenceModel::new();
        model.flag_uncertain(4, 9, 0.5);
        assert!(matches!(
            selector.plan(19, &mut model, &mut rng),
            SelectionPlan::Category(_)
        ));
        assert_eq!(model.uncertain_pairs.len(), 1);
    }

    #[test]
    fn resolve_revisit_requires_both_items() {
        let selector = PairSelector::default();
        let mut model = PreferenceModel::new();
        let revisit = UncertainPair {
            left: 1,
            right: 2,
            uncertainty: 0.2,
        };
        let only_one = catalog(1, Category::Style);
        assert!(selector.resolve_revisit(&revisit, &only_one, &mut model).is_none());
        let both = catalog(2, Category::Style);
        let pair = selector
            .resolve_revisit(&revisit, &both, &mut model)
            .expect("both resolved");
        assert!(model.has_shown(&pair.key()));
    }
}
