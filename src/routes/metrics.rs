use axum::extract::State;
use axum::response::Response;

use crate::response::{ok, AppError};
use crate::state::AppState;

pub async fn report(State(state): State<AppState>) -> Result<Response, AppError> {
    let report = state.engine().metrics_report().await?;
    Ok(ok(report))
}
