use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use serde::Serialize;

use crate::response::{ok, AppError};
use crate::routes::body_error;
use crate::state::AppState;
use crate::taste::{StatedPreferences, Variant};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionDetail {
    id: String,
    variant: Variant,
    stated_preferences: StatedPreferences,
    interaction_count: u32,
    target_interactions: u32,
    complete: bool,
    created_at_ms: i64,
    completed_at_ms: Option<i64>,
}

pub async fn start(
    State(state): State<AppState>,
    body: Result<Json<StatedPreferences>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(stated) = body.map_err(body_error)?;
    if stated.palette.trim().is_empty() {
        return Err(AppError::validation("palette is required"));
    }
    let started = state.engine().start_session(stated).await?;
    Ok(ok(started))
}

pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let session = state.engine().session(&id).await?;
    Ok(ok(SessionDetail {
        complete: session.is_complete(),
        id: session.id,
        variant: session.variant,
        stated_preferences: session.stated,
        interaction_count: session.interaction_count,
        target_interactions: state.engine().config().target_interactions,
        created_at_ms: session.created_at_ms,
        completed_at_ms: session.completed_at_ms,
    }))
}

pub async fn summary(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let summary = state.engine().summary(&id).await?;
    Ok(ok(summary))
}
