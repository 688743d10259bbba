//! Adaptive preference discovery.
//!
//! Leaves first: [`model`] holds the per-session accumulator, [`processor`]
//! folds one comparison into it, [`selector`] picks the next pair,
//! [`snapshot`] persists the model between requests, [`variant`] describes
//! the competing strategies, [`finalizer`] turns the model into a summary and
//! [`engine`] ties them together.

pub mod config;
pub mod engine;
pub mod error;
pub mod finalizer;
pub mod metrics;
pub mod model;
pub mod processor;
pub mod selector;
pub mod snapshot;
pub mod types;
pub mod variant;

pub use config::{ConfigError, EngineConfig};
pub use engine::{ChoiceOutcome, SessionStart, TasteEngine};
pub use error::EngineError;
pub use model::PreferenceModel;
pub use types::{
    Category, ChosenSide, ComparisonEvent, FinalPreferenceSummary, StatedPreferences,
    StimulusItem, StimulusPair,
};
pub use variant::{Variant, VariantDistribution};
