use std::sync::Arc;
use std::time::Instant;

use crate::store::Store;
use crate::taste::TasteEngine;

#[derive(Clone)]
pub struct AppState {
    engine: Arc<TasteEngine>,
    started_at: Instant,
}

impl AppState {
    pub fn new(engine: Arc<TasteEngine>) -> Self {
        Self {
            engine,
            started_at: Instant::now(),
        }
    }

    pub fn engine(&self) -> &TasteEngine {
        &self.engine
    }

    pub fn store(&self) -> &Store {
        self.engine.store()
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
