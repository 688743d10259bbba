#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;

use taste_discovery::create_app;
use taste_discovery::state::AppState;
use taste_discovery::store::{MemoryStore, Store};
use taste_discovery::taste::metrics::CollectingMetricsSink;
use taste_discovery::taste::{Category, EngineConfig, StatedPreferences, StimulusItem, TasteEngine};

pub struct TestApp {
    pub router: Router,
    pub memory: Arc<MemoryStore>,
    pub engine: Arc<TasteEngine>,
}

pub fn test_config(target: u32) -> EngineConfig {
    EngineConfig {
        target_interactions: target,
        ..EngineConfig::default()
    }
    .with_seed(7)
}

pub async fn create_test_app(target: u32) -> TestApp {
    let memory = Arc::new(MemoryStore::new());
    let store = Store::Memory(memory.clone());
    store.upsert_items(&catalog(6)).await.expect("seed catalog");

    let engine = Arc::new(TasteEngine::new(
        test_config(target),
        store,
        Arc::new(CollectingMetricsSink::new()),
    ));
    let router = create_app(AppState::new(engine.clone()));
    TestApp {
        router,
        memory,
        engine,
    }
}

/// `per_category` items in every category, alternating minimalist and baroque.
pub fn catalog(per_category: i64) -> Vec<StimulusItem> {
    let subjects = ["ocean", "city", "forest"];
    let complexities = ["ultra minimal", "balanced moderate", "rich detailed"];
    let mut items = Vec::new();
    for (c, category) in Category::all().iter().enumerate() {
        for i in 0..per_category {
            let id = (c as i64 + 1) * 100 + i;
            items.push(StimulusItem {
                id,
                image_url: Some(format!("https://img.example/{id}.jpg")),
                style: Some(if i % 2 == 0 { "minimalist" } else { "baroque" }.to_string()),
                subject: Some(subjects[i as usize % subjects.len()].to_string()),
                palette: Some(format!("palette-{}", i % 4)),
                complexity: Some(complexities[i as usize % complexities.len()].to_string()),
                category: *category,
            });
        }
    }
    items
}

pub fn stated(palette: &str) -> StatedPreferences {
    StatedPreferences {
        palette: palette.to_string(),
        orientation: Some("landscape".to_string()),
        room: Some("living room".to_string()),
        size: None,
    }
}
