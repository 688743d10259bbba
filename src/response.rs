use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::store::StoreError;
use crate::taste::EngineError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse<T> {
    pub success: bool,
    pub data: T,
}

pub fn ok<T: Serialize>(data: T) -> Response {
    Json(SuccessResponse { success: true, data }).into_response()
}

#[derive(Debug, Clone)]
pub struct AppError {
    status: StatusCode,
    code: String,
    message: String,
    is_operational: bool,
}

impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::CONFLICT, "CONFLICT", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "INTERNAL_ERROR".to_string(),
            message: message.into(),
            is_operational: false,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    fn operational(
        status: StatusCode,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            is_operational: true,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = if self.is_operational {
            self.message
        } else {
            tracing::error!(code = %self.code, error = %self.message, "internal error");
            "internal server error".to_string()
        };

        let body = ErrorResponse {
            success: false,
            error: message,
            code: self.code,
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        let message = err.to_string();
        match err {
            EngineError::SessionNotFound(_) => {
                json_error(StatusCode::NOT_FOUND, "SESSION_NOT_FOUND", message)
            }
            EngineError::UnknownStimulus(_) => {
                json_error(StatusCode::BAD_REQUEST, "UNKNOWN_STIMULUS", message)
            }
            EngineError::SessionComplete(_) => {
                json_error(StatusCode::CONFLICT, "SESSION_COMPLETE", message)
            }
            EngineError::SessionInProgress(_) => {
                json_error(StatusCode::CONFLICT, "SESSION_IN_PROGRESS", message)
            }
            EngineError::SequenceMismatch { .. } => {
                json_error(StatusCode::CONFLICT, "SEQUENCE_MISMATCH", message)
            }
            EngineError::StatePersistFailure(_) => json_error(
                StatusCode::SERVICE_UNAVAILABLE,
                "STATE_PERSIST_FAILURE",
                "session state could not be saved, retry the request",
            ),
            EngineError::Store(_) => AppError::internal(message),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::internal(err.to_string())
    }
}

pub fn json_error(
    status: StatusCode,
    code: impl Into<String>,
    message: impl Into<String>,
) -> AppError {
    AppError {
        status,
        code: code.into(),
        message: message.into(),
        is_operational: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_errors_map_to_statuses() {
        let cases = [
            (EngineError::SessionNotFound("x".into()), StatusCode::NOT_FOUND, "SESSION_NOT_FOUND"),
            (EngineError::UnknownStimulus(4), StatusCode::BAD_REQUEST, "UNKNOWN_STIMULUS"),
            (EngineError::SessionComplete("x".into()), StatusCode::CONFLICT, "SESSION_COMPLETE"),
            (
                EngineError::SequenceMismatch { expected: 2, actual: 5 },
                StatusCode::CONFLICT,
                "SEQUENCE_MISMATCH",
            ),
            (
                EngineError::StatePersistFailure(StoreError::WriteRejected("down".into())),
                StatusCode::SERVICE_UNAVAILABLE,
                "STATE_PERSIST_FAILURE",
            ),
            (
                EngineError::Store(StoreError::Corrupt("row".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
            ),
        ];
        for (err, status, code) in cases {
            let app: AppError = err.into();
            assert_eq!(app.status(), status);
            assert_eq!(app.code(), code);
        }
    }
}
