//! Room lifecycle: creation, joining, leaving, and read projections.
//!
//! Mutating flows follow one shape: take the room's lock, load a snapshot,
//! run the engine transition on the copy, persist, then broadcast. A failed
//! persist leaves the store untouched and nothing is fanned out.

use rand::Rng;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dto::game::{
        GameStateSnapshot, QuestionSummary, RoomMembership, RoomStats, RoomSummary, RoomValidation,
        RoundSummary,
    },
    error::ServiceError,
    services::events,
    state::{
        SharedState,
        engine::{self, RemovalOutcome},
        room::{LeaderboardEntry, Room},
    },
};

/// Attempts at drawing an unused 4-digit code before giving up.
const CODE_ATTEMPTS: usize = 64;

/// Open a new room hosted by `host_name` and return the membership handle.
pub async fn create_room(
    state: &SharedState,
    host_name: &str,
) -> Result<RoomMembership, ServiceError> {
    for _ in 0..CODE_ATTEMPTS {
        let code = format!("{:04}", rand::rng().random_range(0..10_000));
        let room = Room::new(code.clone(), host_name.trim().to_string(), state.config());
        let player_id = room.host_id;
        let summary = RoomSummary::from(&room);
        if state.store().insert_room(room).await? {
            info!(room = %code, host = %player_id, "room created");
            return Ok(RoomMembership {
                room: summary,
                player_id,
            });
        }
    }
    warn!("could not allocate a free room code after {CODE_ATTEMPTS} attempts");
    Err(ServiceError::CodesExhausted)
}

/// Join an existing waiting room under its lock.
pub async fn join_room(
    state: &SharedState,
    code: &str,
    player_name: &str,
) -> Result<RoomMembership, ServiceError> {
    let _guard = state.locks().acquire(code).await;
    let mut room = load_room(state, code).await?;
    let player_id = engine::admit_player(&mut room, player_name)?;
    persist_room(state, &room).await?;

    events::broadcast_player_joined(state, &room, player_id);
    events::broadcast_room_state(state, &room);
    info!(room = code, player = %player_id, "player joined");
    Ok(RoomMembership {
        room: RoomSummary::from(&room),
        player_id,
    })
}

/// Toggle a player's lobby ready flag.
pub async fn toggle_ready(
    state: &SharedState,
    code: &str,
    player_id: Uuid,
) -> Result<RoomSummary, ServiceError> {
    let _guard = state.locks().acquire(code).await;
    let mut room = load_room(state, code).await?;
    let is_ready = engine::toggle_ready(&mut room, player_id)?;
    persist_room(state, &room).await?;

    events::broadcast_player_ready(state, code, player_id, is_ready);
    events::broadcast_room_state(state, &room);
    Ok(RoomSummary::from(&room))
}

/// Remove a player from a room. Lobby departures free the slot and may
/// reassign the host; mid-game departures only detach the player. An emptied
/// room is deleted together with its hub, lock, and timers.
pub async fn leave_room(
    state: &SharedState,
    code: &str,
    player_id: Uuid,
) -> Result<(), ServiceError> {
    let _guard = state.locks().acquire(code).await;
    let mut room = load_room(state, code).await?;
    match engine::remove_player(&mut room, player_id)? {
        RemovalOutcome::DeleteRoom => {
            state.store().delete_room(code).await?;
            state.release_room(code);
            info!(room = code, "room emptied and deleted");
        }
        RemovalOutcome::Removed { new_host_id } => {
            persist_room(state, &room).await?;
            events::broadcast_player_left(state, code, player_id, new_host_id);
            events::broadcast_room_state(state, &room);
            info!(room = code, player = %player_id, "player left");
        }
        RemovalOutcome::Detached => {
            persist_room(state, &room).await?;
            events::broadcast_player_disconnected(state, code, player_id);
            info!(room = code, player = %player_id, "player detached mid-game");
        }
    }
    Ok(())
}

/// Full room snapshot.
pub async fn room_summary(state: &SharedState, code: &str) -> Result<RoomSummary, ServiceError> {
    Ok(RoomSummary::from(&load_room(state, code).await?))
}

/// Existence/joinability probe for a join code.
pub async fn validate_code(state: &SharedState, code: &str) -> RoomValidation {
    match state.store().find_room(code).await {
        Ok(Some(room)) => RoomValidation::from_room(&room),
        Ok(None) => RoomValidation::missing(code.to_string(), state.config().max_players),
        Err(err) => {
            warn!(room = code, error = %err, "room lookup failed during validation");
            RoomValidation::missing(code.to_string(), state.config().max_players)
        }
    }
}

/// Live gameplay snapshot for polling clients.
pub async fn game_state(state: &SharedState, code: &str) -> Result<GameStateSnapshot, ServiceError> {
    let room = load_room(state, code).await?;
    let question = room
        .current_round_record()
        .and_then(|round| state.questions().question(round.question_id).map(QuestionSummary::from));
    let predictions_received = room
        .current_round_record()
        .map(|round| round.predictor_count())
        .unwrap_or(0);
    Ok(GameStateSnapshot {
        status: room.status,
        phase: room.phase,
        current_round: room.current_round,
        total_rounds: room.total_rounds,
        current_player_id: room.current_player_id,
        question,
        predictions_received,
        predictions_expected: room.expected_predictions(),
        leaderboard: engine::compute_leaderboard(&room),
    })
}

/// Every round played so far, most recent last.
pub async fn round_summaries(
    state: &SharedState,
    code: &str,
) -> Result<Vec<RoundSummary>, ServiceError> {
    let room = load_room(state, code).await?;
    Ok(room.rounds.iter().map(RoundSummary::from).collect())
}

/// The in-flight round, if any.
pub async fn current_round_summary(
    state: &SharedState,
    code: &str,
) -> Result<RoundSummary, ServiceError> {
    let room = load_room(state, code).await?;
    room.current_round_record()
        .map(RoundSummary::from)
        .ok_or_else(|| ServiceError::NotFound("no round in flight".into()))
}

/// The question on display for the round in flight.
pub async fn current_question(
    state: &SharedState,
    code: &str,
) -> Result<QuestionSummary, ServiceError> {
    let room = load_room(state, code).await?;
    let round = room
        .current_round_record()
        .ok_or_else(|| ServiceError::NotFound("no round in flight".into()))?;
    state
        .questions()
        .question(round.question_id)
        .map(QuestionSummary::from)
        .ok_or_else(|| ServiceError::NotFound("question not in the catalog".into()))
}

/// Ranked standings for a room.
pub async fn leaderboard(
    state: &SharedState,
    code: &str,
) -> Result<Vec<LeaderboardEntry>, ServiceError> {
    let room = load_room(state, code).await?;
    Ok(engine::compute_leaderboard(&room))
}

/// Aggregate diagnostics for a room.
pub async fn room_stats(state: &SharedState, code: &str) -> Result<RoomStats, ServiceError> {
    Ok(RoomStats::from(&load_room(state, code).await?))
}

/// Load the room behind a code or fail with `room_not_found`.
pub(crate) async fn load_room(state: &SharedState, code: &str) -> Result<Room, ServiceError> {
    state
        .store()
        .find_room(code)
        .await?
        .ok_or_else(|| ServiceError::RoomNotFound(code.to_string()))
}

/// Persist a room snapshot, retrying once before surfacing the failure to
/// the originating caller. On failure nothing has been broadcast.
pub(crate) async fn persist_room(state: &SharedState, room: &Room) -> Result<(), ServiceError> {
    if let Err(err) = state.store().save_room(room.clone()).await {
        warn!(room = %room.code, error = %err, "room save failed, retrying once");
        state.store().save_room(room.clone()).await?;
    }
    Ok(())
}
