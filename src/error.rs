use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{dao::storage::StorageError, state::engine::EngineError};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// No room exists behind the supplied join code.
    #[error("room `{0}` not found")]
    RoomNotFound(String),
    /// Requested player or resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// A room transition rejected the request.
    #[error("{source}")]
    Rejected {
        /// Stable machine-readable code for the rejection.
        reason: &'static str,
        /// The engine rejection itself.
        #[source]
        source: EngineError,
    },
    /// No fresh join code could be allocated.
    #[error("no free room code available")]
    CodesExhausted,
    /// The question catalog ran dry for this room.
    #[error("no unused question left for this room")]
    QuestionsExhausted,
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl From<EngineError> for ServiceError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::PlayerNotFound => {
                ServiceError::NotFound("player not found in this room".into())
            }
            other => ServiceError::Rejected {
                reason: other.reason_code(),
                source: other,
            },
        }
    }
}

impl ServiceError {
    /// Machine-readable code mirrored into error events and HTTP bodies.
    pub fn reason_code(&self) -> &'static str {
        match self {
            ServiceError::Unavailable(_) => "storage_unavailable",
            ServiceError::InvalidInput(_) => "invalid_input",
            ServiceError::RoomNotFound(_) => "room_not_found",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::Rejected { reason, .. } => reason,
            ServiceError::CodesExhausted => "codes_exhausted",
            ServiceError::QuestionsExhausted => "questions_exhausted",
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest("invalid_input", format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {1}")]
    BadRequest(&'static str, String),
    /// Action reserved for another player (host or current answerer).
    #[error("forbidden: {1}")]
    Forbidden(&'static str, String),
    /// Requested resource not found.
    #[error("not found: {1}")]
    NotFound(&'static str, String),
    /// Conflict with current room state.
    #[error("conflict: {1}")]
    Conflict(&'static str, String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {1}")]
    ServiceUnavailable(&'static str, String),
    /// Internal server error.
    #[error("internal error: {1}")]
    Internal(&'static str, String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        let reason = err.reason_code();
        let message = err.to_string();
        match &err {
            ServiceError::Unavailable(_) => AppError::ServiceUnavailable(reason, message),
            ServiceError::InvalidInput(_) => AppError::BadRequest(reason, message),
            ServiceError::RoomNotFound(_) | ServiceError::NotFound(_) => {
                AppError::NotFound(reason, message)
            }
            ServiceError::Rejected { source, .. } => match source {
                EngineError::NotHost | EngineError::NotYourTurn | EngineError::SelfPrediction => {
                    AppError::Forbidden(reason, message)
                }
                EngineError::NameTaken { .. } => AppError::BadRequest(reason, message),
                _ => AppError::Conflict(reason, message),
            },
            ServiceError::CodesExhausted | ServiceError::QuestionsExhausted => {
                AppError::ServiceUnavailable(reason, message)
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    reason: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(..) => StatusCode::BAD_REQUEST,
            AppError::Forbidden(..) => StatusCode::FORBIDDEN,
            AppError::NotFound(..) => StatusCode::NOT_FOUND,
            AppError::Conflict(..) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(..) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(..) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let (reason, message) = match self {
            AppError::BadRequest(reason, message)
            | AppError::Forbidden(reason, message)
            | AppError::NotFound(reason, message)
            | AppError::Conflict(reason, message)
            | AppError::ServiceUnavailable(reason, message)
            | AppError::Internal(reason, message) => (reason, message),
        };

        (status, Json(ErrorBody { reason, message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_rejections_keep_their_reason_codes() {
        let service: ServiceError = EngineError::RoomFull { max_players: 4 }.into();
        assert_eq!(service.reason_code(), "room_full");

        let app: AppError = service.into();
        assert!(matches!(app, AppError::Conflict("room_full", _)));
    }

    #[test]
    fn host_only_rejections_map_to_forbidden() {
        let app: AppError = ServiceError::from(EngineError::NotHost).into();
        assert!(matches!(app, AppError::Forbidden("not_host", _)));
    }

    #[test]
    fn missing_player_maps_to_not_found() {
        let service: ServiceError = EngineError::PlayerNotFound.into();
        assert!(matches!(service, ServiceError::NotFound(_)));
    }
}
