use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::response::{ok, AppError};
use crate::routes::body_error;
use crate::state::AppState;
use crate::taste::{Category, ChoiceOutcome, ChosenSide, FinalPreferenceSummary, StimulusPair};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitChoiceRequest {
    session_id: String,
    left_id: i64,
    right_id: i64,
    chosen: ChosenSide,
    latency_ms: i64,
    sequence_index: u32,
    /// Needed only to resolve fallback pair ids.
    #[serde(default)]
    category: Option<Category>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChoiceResponse {
    complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_pair: Option<StimulusPair>,
    #[serde(skip_serializing_if = "Option::is_none")]
    interaction_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    progress: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<FinalPreferenceSummary>,
}

impl From<ChoiceOutcome> for ChoiceResponse {
    fn from(outcome: ChoiceOutcome) -> Self {
        match outcome {
            ChoiceOutcome::InProgress {
                next_pair,
                interaction_count,
                progress,
                confidence,
            } => Self {
                complete: false,
                next_pair: Some(next_pair),
                interaction_count: Some(interaction_count),
                progress: Some(progress),
                confidence: Some(confidence),
                summary: None,
            },
            ChoiceOutcome::Complete { summary } => Self {
                complete: true,
                next_pair: None,
                interaction_count: None,
                progress: Some(1.0),
                confidence: Some(summary.confidence),
                summary: Some(summary),
            },
        }
    }
}

pub async fn submit(
    State(state): State<AppState>,
    body: Result<Json<SubmitChoiceRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(req) = body.map_err(body_error)?;
    if req.session_id.trim().is_empty() {
        return Err(AppError::validation("sessionId is required"));
    }
    if req.sequence_index == 0 {
        return Err(AppError::validation("sequenceIndex is 1-based"));
    }
    if req.latency_ms < 0 {
        return Err(AppError::validation("latencyMs must not be negative"));
    }
    if req.left_id == req.right_id {
        return Err(AppError::validation("leftId and rightId must differ"));
    }

    let engine = state.engine();
    // An unknown session outranks unknown stimulus ids.
    engine.session(&req.session_id).await?;
    let event = engine
        .resolve_event(
            req.left_id,
            req.right_id,
            req.chosen,
            req.latency_ms,
            req.sequence_index,
            req.category,
        )
        .await?;
    let outcome = engine.submit_choice(&req.session_id, event).await?;
    Ok(ok(ChoiceResponse::from(outcome)))
}
