use std::path::Path;

use thiserror::Error;

use crate::store::{Store, StoreError};
use crate::taste::StimulusItem;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Parses a JSON array of stimulus items.
pub fn parse_catalog(raw: &str) -> Result<Vec<StimulusItem>, SeedError> {
    Ok(serde_json::from_str(raw)?)
}

pub async fn seed_catalog_from_file(store: &Store, path: &Path) -> Result<usize, SeedError> {
    let raw = tokio::fs::read_to_string(path).await?;
    let items = parse_catalog(&raw)?;
    let count = store.upsert_items(&items).await?;
    tracing::info!(path = %path.display(), count, "seeded stimulus catalog");
    Ok(count)
}
