use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::response::{ok, AppError};
use crate::routes::body_error;
use crate::state::AppState;
use crate::taste::{Category, StimulusItem};

#[derive(Debug, Deserialize)]
pub struct UpsertCatalogRequest {
    items: Vec<StimulusItem>,
}

#[derive(Debug, Serialize)]
struct UpsertCatalogResponse {
    upserted: usize,
}

pub async fn upsert(
    State(state): State<AppState>,
    body: Result<Json<UpsertCatalogRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(req) = body.map_err(body_error)?;
    if let Some(bad) = req.items.iter().find(|item| item.id < 0) {
        return Err(AppError::validation(format!(
            "item id {} is reserved, catalog ids must be non-negative",
            bad.id
        )));
    }
    let upserted = state.store().upsert_items(&req.items).await?;
    Ok(ok(UpsertCatalogResponse { upserted }))
}

pub async fn list(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Response, AppError> {
    let category = Category::parse(&category)
        .ok_or_else(|| AppError::validation(format!("unknown category: {category}")))?;
    let items = state.store().list_by_category(category).await?;
    Ok(ok(items))
}
