use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get, post},
};
use axum_valid::Valid;

use crate::{
    dto::game::{
        CreateRoomRequest, GameStateSnapshot, JoinRoomRequest, PlayerActionRequest, PlayerSummary,
        QuestionSummary, RoomMembership, RoomStats, RoomSummary, RoomValidation, RoundSummary,
    },
    error::AppError,
    services::room_service,
    state::{SharedState, room::{GameSettings, LeaderboardEntry}},
};

/// Routes handling room lifecycle and read projections.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/rooms", post(create_room))
        .route("/rooms/join", post(join_room))
        .route("/rooms/{code}/validate", get(validate_room))
        .route("/rooms/{code}", get(get_room))
        .route("/rooms/{code}/state", get(get_game_state))
        .route("/rooms/{code}/players", get(get_players))
        .route("/rooms/{code}/settings", get(get_settings))
        .route("/rooms/{code}/rounds", get(get_rounds))
        .route("/rooms/{code}/current-round", get(get_current_round))
        .route("/rooms/{code}/question", get(get_current_question))
        .route("/rooms/{code}/leaderboard", get(get_leaderboard))
        .route("/rooms/{code}/stats", get(get_stats))
        .route("/rooms/{code}/ready", post(toggle_ready))
        .route("/rooms/{code}/leave", delete(leave_room))
}

/// Open a new room; the caller becomes its host.
#[utoipa::path(
    post,
    path = "/rooms",
    tag = "rooms",
    request_body = CreateRoomRequest,
    responses(
        (status = 200, description = "Room created", body = RoomMembership)
    )
)]
pub async fn create_room(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateRoomRequest>>,
) -> Result<Json<RoomMembership>, AppError> {
    let membership = room_service::create_room(&state, &payload.host_name).await?;
    Ok(Json(membership))
}

/// Join an existing waiting room by code.
#[utoipa::path(
    post,
    path = "/rooms/join",
    tag = "rooms",
    request_body = JoinRoomRequest,
    responses(
        (status = 200, description = "Room joined", body = RoomMembership),
        (status = 404, description = "Room not found"),
        (status = 409, description = "Room full or not joinable")
    )
)]
pub async fn join_room(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<JoinRoomRequest>>,
) -> Result<Json<RoomMembership>, AppError> {
    let membership =
        room_service::join_room(&state, &payload.room_code, &payload.player_name).await?;
    Ok(Json(membership))
}

/// Probe whether a join code exists and still accepts players.
#[utoipa::path(
    get,
    path = "/rooms/{code}/validate",
    tag = "rooms",
    params(("code" = String, Path, description = "Four-digit join code")),
    responses((status = 200, description = "Probe result", body = RoomValidation))
)]
pub async fn validate_room(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Json<RoomValidation> {
    Json(room_service::validate_code(&state, &code).await)
}

/// Full room snapshot.
#[utoipa::path(
    get,
    path = "/rooms/{code}",
    tag = "rooms",
    params(("code" = String, Path, description = "Four-digit join code")),
    responses(
        (status = 200, description = "Room snapshot", body = RoomSummary),
        (status = 404, description = "Room not found")
    )
)]
pub async fn get_room(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<RoomSummary>, AppError> {
    Ok(Json(room_service::room_summary(&state, &code).await?))
}

/// Live gameplay snapshot for polling clients.
#[utoipa::path(
    get,
    path = "/rooms/{code}/state",
    tag = "rooms",
    params(("code" = String, Path, description = "Four-digit join code")),
    responses(
        (status = 200, description = "Gameplay snapshot", body = GameStateSnapshot),
        (status = 404, description = "Room not found")
    )
)]
pub async fn get_game_state(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<GameStateSnapshot>, AppError> {
    Ok(Json(room_service::game_state(&state, &code).await?))
}

/// Roster of the room in join order.
#[utoipa::path(
    get,
    path = "/rooms/{code}/players",
    tag = "rooms",
    params(("code" = String, Path, description = "Four-digit join code")),
    responses(
        (status = 200, description = "Room roster", body = [PlayerSummary]),
        (status = 404, description = "Room not found")
    )
)]
pub async fn get_players(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<Vec<PlayerSummary>>, AppError> {
    let summary = room_service::room_summary(&state, &code).await?;
    Ok(Json(summary.players))
}

/// Timing settings applied to the room's phases.
#[utoipa::path(
    get,
    path = "/rooms/{code}/settings",
    tag = "rooms",
    params(("code" = String, Path, description = "Four-digit join code")),
    responses(
        (status = 200, description = "Room settings", body = GameSettings),
        (status = 404, description = "Room not found")
    )
)]
pub async fn get_settings(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<GameSettings>, AppError> {
    let summary = room_service::room_summary(&state, &code).await?;
    Ok(Json(summary.settings))
}

/// Every round played so far.
#[utoipa::path(
    get,
    path = "/rooms/{code}/rounds",
    tag = "rooms",
    params(("code" = String, Path, description = "Four-digit join code")),
    responses(
        (status = 200, description = "Rounds played", body = [RoundSummary]),
        (status = 404, description = "Room not found")
    )
)]
pub async fn get_rounds(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<Vec<RoundSummary>>, AppError> {
    Ok(Json(room_service::round_summaries(&state, &code).await?))
}

/// The round currently in flight.
#[utoipa::path(
    get,
    path = "/rooms/{code}/current-round",
    tag = "rooms",
    params(("code" = String, Path, description = "Four-digit join code")),
    responses(
        (status = 200, description = "Current round", body = RoundSummary),
        (status = 404, description = "Room or round not found")
    )
)]
pub async fn get_current_round(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<RoundSummary>, AppError> {
    Ok(Json(
        room_service::current_round_summary(&state, &code).await?,
    ))
}

/// The question currently on display.
#[utoipa::path(
    get,
    path = "/rooms/{code}/question",
    tag = "rooms",
    params(("code" = String, Path, description = "Four-digit join code")),
    responses(
        (status = 200, description = "Current question", body = QuestionSummary),
        (status = 404, description = "Room not found or no round in flight")
    )
)]
pub async fn get_current_question(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<QuestionSummary>, AppError> {
    Ok(Json(room_service::current_question(&state, &code).await?))
}

/// Ranked standings, score descending with join-order ties.
#[utoipa::path(
    get,
    path = "/rooms/{code}/leaderboard",
    tag = "rooms",
    params(("code" = String, Path, description = "Four-digit join code")),
    responses(
        (status = 200, description = "Leaderboard", body = [LeaderboardEntry]),
        (status = 404, description = "Room not found")
    )
)]
pub async fn get_leaderboard(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<Vec<LeaderboardEntry>>, AppError> {
    Ok(Json(room_service::leaderboard(&state, &code).await?))
}

/// Aggregate diagnostics about the room.
#[utoipa::path(
    get,
    path = "/rooms/{code}/stats",
    tag = "rooms",
    params(("code" = String, Path, description = "Four-digit join code")),
    responses(
        (status = 200, description = "Room statistics", body = RoomStats),
        (status = 404, description = "Room not found")
    )
)]
pub async fn get_stats(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<RoomStats>, AppError> {
    Ok(Json(room_service::room_stats(&state, &code).await?))
}

/// Toggle the caller's lobby ready flag.
#[utoipa::path(
    post,
    path = "/rooms/{code}/ready",
    tag = "rooms",
    params(("code" = String, Path, description = "Four-digit join code")),
    request_body = PlayerActionRequest,
    responses(
        (status = 200, description = "Ready flag toggled", body = RoomSummary),
        (status = 404, description = "Room or player not found")
    )
)]
pub async fn toggle_ready(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Valid(Json(payload)): Valid<Json<PlayerActionRequest>>,
) -> Result<Json<RoomSummary>, AppError> {
    Ok(Json(
        room_service::toggle_ready(&state, &code, payload.player_id).await?,
    ))
}

/// Leave the room; mid-game callers are detached instead of removed.
#[utoipa::path(
    delete,
    path = "/rooms/{code}/leave",
    tag = "rooms",
    params(("code" = String, Path, description = "Four-digit join code")),
    request_body = PlayerActionRequest,
    responses(
        (status = 204, description = "Player removed or detached"),
        (status = 404, description = "Room or player not found")
    )
)]
pub async fn leave_room(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Valid(Json(payload)): Valid<Json<PlayerActionRequest>>,
) -> Result<axum::http::StatusCode, AppError> {
    room_service::leave_room(&state, &code, payload.player_id).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}
