use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};
use axum_valid::Valid;

use crate::{
    dto::{
        events::{PredictionsProgressEvent, ScoringResultsEvent},
        game::{AnswerRequest, PlayerActionRequest, PredictionRequest, RoomSummary},
    },
    error::AppError,
    services::round_service,
    state::SharedState,
};

/// Routes handling gameplay actions, mirroring the WebSocket messages for
/// clients that drive the game over plain HTTP.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/rooms/{code}/start", post(start_game))
        .route("/rooms/{code}/predictions", post(submit_prediction))
        .route("/rooms/{code}/answer", post(submit_answer))
}

/// Host-only: start the game once the room is full.
#[utoipa::path(
    post,
    path = "/rooms/{code}/start",
    tag = "game",
    params(("code" = String, Path, description = "Four-digit join code")),
    request_body = PlayerActionRequest,
    responses(
        (status = 200, description = "Game started", body = RoomSummary),
        (status = 403, description = "Caller is not the host"),
        (status = 409, description = "Room not full or already started")
    )
)]
pub async fn start_game(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Valid(Json(payload)): Valid<Json<PlayerActionRequest>>,
) -> Result<Json<RoomSummary>, AppError> {
    Ok(Json(
        round_service::start_game(&state, &code, payload.player_id).await?,
    ))
}

/// Record the caller's prediction for the current round.
#[utoipa::path(
    post,
    path = "/rooms/{code}/predictions",
    tag = "game",
    params(("code" = String, Path, description = "Four-digit join code")),
    request_body = PredictionRequest,
    responses(
        (status = 200, description = "Prediction recorded", body = PredictionsProgressEvent),
        (status = 403, description = "The answerer cannot predict"),
        (status = 409, description = "Duplicate prediction or round inactive")
    )
)]
pub async fn submit_prediction(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Valid(Json(payload)): Valid<Json<PredictionRequest>>,
) -> Result<Json<PredictionsProgressEvent>, AppError> {
    Ok(Json(
        round_service::submit_prediction(&state, &code, payload.player_id, payload.predicted_choice)
            .await?,
    ))
}

/// Record the answerer's choice and resolve the round.
#[utoipa::path(
    post,
    path = "/rooms/{code}/answer",
    tag = "game",
    params(("code" = String, Path, description = "Four-digit join code")),
    request_body = AnswerRequest,
    responses(
        (status = 200, description = "Round resolved", body = ScoringResultsEvent),
        (status = 403, description = "Caller is not the current answerer"),
        (status = 409, description = "Predictions still open or answer already given")
    )
)]
pub async fn submit_answer(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Valid(Json(payload)): Valid<Json<AnswerRequest>>,
) -> Result<Json<ScoringResultsEvent>, AppError> {
    Ok(Json(
        round_service::submit_answer(&state, &code, payload.player_id, payload.choice).await?,
    ))
}
