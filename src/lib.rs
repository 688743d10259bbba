pub mod config;
pub mod logging;
pub mod response;
pub mod routes;
pub mod seed;
pub mod state;
pub mod store;
pub mod taste;

use std::sync::Arc;

use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::{Config, StoreKind};
use crate::state::AppState;
use crate::store::{Store, StoreError};
use crate::taste::TasteEngine;

pub fn create_app(state: AppState) -> axum::Router {
    routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

pub async fn open_store(config: &Config) -> Result<Store, StoreError> {
    match config.store {
        StoreKind::Memory => Ok(Store::memory()),
        StoreKind::Sqlite => Store::sqlite(&config.sqlite_path).await,
    }
}

/// Opens the store, seeds the catalog when a path is configured and wires the engine.
pub async fn build_state(config: &Config) -> Result<AppState, StoreError> {
    let store = open_store(config).await?;

    if let Some(path) = &config.catalog_path {
        if let Err(err) = seed::seed_catalog_from_file(&store, path).await {
            tracing::warn!(error = %err, path = %path.display(), "catalog seeding failed");
        }
    }

    let engine = TasteEngine::with_tracing_metrics(config.engine.clone(), store);
    Ok(AppState::new(Arc::new(engine)))
}
