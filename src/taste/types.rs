use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::taste::variant::Variant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum Category {
    #[default]
    Style,
    Complexity,
    Subject,
    Color,
}

impl Category {
    pub fn all() -> &'static [Category] {
        &[
            Category::Style,
            Category::Complexity,
            Category::Subject,
            Category::Color,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Style => "style",
            Self::Complexity => "complexity",
            Self::Subject => "subject",
            Self::Color => "color",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "style" => Some(Self::Style),
            "complexity" => Some(Self::Complexity),
            "subject" => Some(Self::Subject),
            "color" | "colour" | "palette" => Some(Self::Color),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One comparison stimulus from the external catalog.
///
/// Attribute labels are optional: a missing label never produces a score
/// update and never matches another item's label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StimulusItem {
    pub id: i64,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub palette: Option<String>,
    #[serde(default)]
    pub complexity: Option<String>,
    pub category: Category,
}

impl StimulusItem {
    pub fn style(&self) -> Option<&str> {
        label(&self.style)
    }

    pub fn subject(&self) -> Option<&str> {
        label(&self.subject)
    }

    pub fn palette(&self) -> Option<&str> {
        label(&self.palette)
    }

    pub fn complexity(&self) -> Option<&str> {
        label(&self.complexity)
    }
}

fn label(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Unordered identity of a shown pair: `(min id, max id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PairKey {
    pub low: i64,
    pub high: i64,
}

impl PairKey {
    pub fn new(a: i64, b: i64) -> Self {
        Self {
            low: a.min(b),
            high: a.max(b),
        }
    }

    pub fn of(left: &StimulusItem, right: &StimulusItem) -> Self {
        Self::new(left.id, right.id)
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.low, self.high)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StimulusPair {
    pub left: StimulusItem,
    pub right: StimulusItem,
    pub category: Category,
}

impl StimulusPair {
    pub fn key(&self) -> PairKey {
        PairKey::of(&self.left, &self.right)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChosenSide {
    Left,
    Right,
}

impl ChosenSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }
}

/// One recorded user decision. `sequence_index` is 1-based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonEvent {
    pub left: StimulusItem,
    pub right: StimulusItem,
    pub chosen: ChosenSide,
    pub latency_ms: i64,
    pub sequence_index: u32,
}

impl ComparisonEvent {
    /// Returns `(chosen, rejected)`.
    pub fn sides(&self) -> (&StimulusItem, &StimulusItem) {
        match self.chosen {
            ChosenSide::Left => (&self.left, &self.right),
            ChosenSide::Right => (&self.right, &self.left),
        }
    }

    pub fn chosen_item(&self) -> &StimulusItem {
        self.sides().0
    }
}

/// Preferences the user typed in before the first comparison.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatedPreferences {
    pub palette: String,
    #[serde(default)]
    pub orientation: Option<String>,
    #[serde(default)]
    pub room: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleCorrelation {
    pub style: String,
    pub subject: String,
    pub strength: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalPreferenceSummary {
    pub style: String,
    pub subjects: Vec<String>,
    pub complexity: f64,
    pub palette: String,
    pub confidence: f64,
    pub consistency: f64,
    pub rationale: String,
    pub secondary_styles: Vec<String>,
    pub correlations: Vec<StyleCorrelation>,
    pub style_distribution: BTreeMap<String, f64>,
    pub subject_scores: BTreeMap<String, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emotional_tone: Option<String>,
}

/// Session row as seen by the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    pub variant: Variant,
    pub stated: StatedPreferences,
    pub interaction_count: u32,
    pub created_at_ms: i64,
    pub completed_at_ms: Option<i64>,
}

impl SessionRecord {
    pub fn is_complete(&self) -> bool {
        self.completed_at_ms.is_some()
    }
}

/// A processed choice as written to the choice history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceRecord {
    pub session_id: String,
    pub event: ComparisonEvent,
    pub recorded_at_ms: i64,
}
