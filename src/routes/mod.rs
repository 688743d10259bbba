mod catalog;
mod choice;
mod health;
mod metrics;
mod session;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;

use crate::response::{json_error, AppError};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/session/start",
            post(session::start).fallback(fallback_handler),
        )
        .route(
            "/api/session/:id",
            get(session::detail).fallback(fallback_handler),
        )
        .route(
            "/api/session/:id/summary",
            get(session::summary).fallback(fallback_handler),
        )
        .route("/api/choice", post(choice::submit).fallback(fallback_handler))
        .route("/api/metrics", get(metrics::report).fallback(fallback_handler))
        .route("/api/catalog", post(catalog::upsert).fallback(fallback_handler))
        .route(
            "/api/catalog/:category",
            get(catalog::list).fallback(fallback_handler),
        )
        .nest("/health", health::router())
        .fallback(fallback_handler)
        .with_state(state)
}

async fn fallback_handler() -> Response {
    json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "route not found").into_response()
}

pub(crate) fn body_error(rejection: JsonRejection) -> AppError {
    AppError::validation(rejection.body_text())
}
