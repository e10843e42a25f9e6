//! Room event names and broadcast helpers.
//!
//! Every mutation fans out through [`send_room_event`] after its snapshot has
//! been persisted, so subscribers never observe state the store lost.

use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::{
    dto::{
        events::{
            AnsweringPhaseEvent, ErrorEvent, FinalScoresEvent, GameCompletedEvent, NextRoundEvent,
            PlayerDisconnectedEvent, PlayerJoinedEvent, PlayerLeftEvent, PlayerReadyEvent,
            PlayerReconnectedEvent, PredictionsProgressEvent, RoomStateEvent, RoundStartedEvent,
            ScoreUpdateSummary, ScoringResultsEvent, ServerEvent, WinnerAnimationEvent,
        },
        game::{PlayerSummary, QuestionSummary, RoomSummary},
    },
    state::{
        SharedState,
        engine::ScoringOutcome,
        room::{LeaderboardEntry, Room},
    },
};

/// Full room snapshot.
pub const EVENT_ROOM_STATE: &str = "room_state";
/// A player was admitted to the lobby.
pub const EVENT_PLAYER_JOINED: &str = "player_joined";
/// A player left a waiting or finished room.
pub const EVENT_PLAYER_LEFT: &str = "player_left";
/// A mid-game player dropped.
pub const EVENT_PLAYER_DISCONNECTED: &str = "player_disconnected";
/// A dropped player re-attached.
pub const EVENT_PLAYER_RECONNECTED: &str = "player_reconnected";
/// A lobby ready flag toggled.
pub const EVENT_PLAYER_READY: &str = "player_ready";
/// A round opened with its question.
pub const EVENT_ROUND_STARTED: &str = "round_started";
/// Running prediction tally.
pub const EVENT_PREDICTIONS_PROGRESS: &str = "predictions_progress";
/// Predictions closed, the answerer is on the clock.
pub const EVENT_ANSWERING_PHASE: &str = "answering_phase";
/// A round resolved with the revealed answer.
pub const EVENT_SCORING_RESULTS: &str = "scoring_results";
/// Rollover to the next round.
pub const EVENT_NEXT_ROUND: &str = "next_round";
/// Final leaderboard dwell.
pub const EVENT_FINAL_SCORES: &str = "final_scores";
/// Winner celebration.
pub const EVENT_WINNER_ANIMATION: &str = "winner_animation";
/// Terminal event of a game.
pub const EVENT_GAME_COMPLETED: &str = "game_completed";
/// Room-wide fault.
pub const EVENT_ERROR: &str = "error";

/// Broadcast the full room snapshot after a roster or phase change.
pub fn broadcast_room_state(state: &SharedState, room: &Room) {
    let payload = RoomStateEvent { room: room.into() };
    send_room_event(state, &room.code, EVENT_ROOM_STATE, &payload);
}

/// Broadcast a lobby admission.
pub fn broadcast_player_joined(state: &SharedState, room: &Room, player_id: Uuid) {
    let Some(player) = room.player(player_id) else {
        return;
    };
    let payload = PlayerJoinedEvent {
        player: PlayerSummary::from_player(player, room.host_id),
        player_count: room.players.len(),
        max_players: room.max_players,
    };
    send_room_event(state, &room.code, EVENT_PLAYER_JOINED, &payload);
}

/// Broadcast a lobby departure and the possible host handover.
pub fn broadcast_player_left(
    state: &SharedState,
    code: &str,
    player_id: Uuid,
    new_host_id: Option<Uuid>,
) {
    let payload = PlayerLeftEvent {
        player_id,
        new_host_id,
    };
    send_room_event(state, code, EVENT_PLAYER_LEFT, &payload);
}

/// Broadcast a mid-game drop; the slot stays in the roster.
pub fn broadcast_player_disconnected(state: &SharedState, code: &str, player_id: Uuid) {
    let payload = PlayerDisconnectedEvent { player_id };
    send_room_event(state, code, EVENT_PLAYER_DISCONNECTED, &payload);
}

/// Broadcast that a dropped player re-attached.
pub fn broadcast_player_reconnected(state: &SharedState, code: &str, player_id: Uuid) {
    let payload = PlayerReconnectedEvent { player_id };
    send_room_event(state, code, EVENT_PLAYER_RECONNECTED, &payload);
}

/// Broadcast a ready-flag toggle.
pub fn broadcast_player_ready(state: &SharedState, code: &str, player_id: Uuid, is_ready: bool) {
    let payload = PlayerReadyEvent {
        player_id,
        is_ready,
    };
    send_room_event(state, code, EVENT_PLAYER_READY, &payload);
}

/// Broadcast a round opening with its question and prediction deadline.
pub fn broadcast_round_started(state: &SharedState, room: &Room, question: QuestionSummary) {
    let Some(current_player_id) = room.current_player_id else {
        return;
    };
    let payload = RoundStartedEvent {
        round_number: room.current_round,
        total_rounds: room.total_rounds,
        current_player_id,
        question,
        prediction_secs: room.settings.prediction_secs,
    };
    send_room_event(state, &room.code, EVENT_ROUND_STARTED, &payload);
}

/// Broadcast the running prediction tally without revealing choices.
pub fn broadcast_predictions_progress(state: &SharedState, room: &Room, received: usize) {
    let payload = PredictionsProgressEvent {
        round_number: room.current_round,
        received,
        expected: room.expected_predictions(),
    };
    send_room_event(state, &room.code, EVENT_PREDICTIONS_PROGRESS, &payload);
}

/// Broadcast that predictions closed and the answerer is on the clock.
pub fn broadcast_answering_phase(state: &SharedState, room: &Room) {
    let Some(current_player_id) = room.current_player_id else {
        return;
    };
    let payload = AnsweringPhaseEvent {
        round_number: room.current_round,
        current_player_id,
        answer_secs: room.settings.answer_secs,
    };
    send_room_event(state, &room.code, EVENT_ANSWERING_PHASE, &payload);
}

/// Broadcast a resolved round with the revealed answer and standings.
pub fn broadcast_scoring_results(state: &SharedState, room: &Room, outcome: &ScoringOutcome) {
    let payload = ScoringResultsEvent {
        round_number: outcome.round_number,
        answer: outcome.answer,
        score_updates: outcome
            .score_updates
            .iter()
            .map(ScoreUpdateSummary::from)
            .collect(),
        leaderboard: room.leaderboard.clone(),
        scoring_secs: room.settings.scoring_secs,
    };
    send_room_event(state, &room.code, EVENT_SCORING_RESULTS, &payload);
}

/// Broadcast the rollover to the next round's answerer.
pub fn broadcast_next_round(state: &SharedState, room: &Room, next_player_id: Uuid) {
    let payload = NextRoundEvent {
        next_round: room.current_round,
        total_rounds: room.total_rounds,
        next_player_id,
    };
    send_room_event(state, &room.code, EVENT_NEXT_ROUND, &payload);
}

/// Broadcast the final leaderboard dwell.
pub fn broadcast_final_scores(state: &SharedState, room: &Room) {
    let payload = FinalScoresEvent {
        leaderboard: room.leaderboard.clone(),
        final_scores_secs: room.settings.final_scores_secs,
    };
    send_room_event(state, &room.code, EVENT_FINAL_SCORES, &payload);
}

/// Broadcast the winner celebration.
pub fn broadcast_winner_animation(state: &SharedState, room: &Room, winner: LeaderboardEntry) {
    let payload = WinnerAnimationEvent {
        winner,
        winner_animation_secs: room.settings.winner_animation_secs,
    };
    send_room_event(state, &room.code, EVENT_WINNER_ANIMATION, &payload);
}

/// Broadcast the terminal event of a game.
pub fn broadcast_game_completed(state: &SharedState, room: &Room) {
    let payload = GameCompletedEvent {
        leaderboard: room.leaderboard.clone(),
    };
    send_room_event(state, &room.code, EVENT_GAME_COMPLETED, &payload);
}

/// Broadcast a room-wide fault, such as question exhaustion.
pub fn broadcast_room_error(state: &SharedState, code: &str, reason: &str, message: &str) {
    let payload = ErrorEvent {
        reason: reason.to_string(),
        message: message.to_string(),
    };
    send_room_event(state, code, EVENT_ERROR, &payload);
}

fn send_room_event(state: &SharedState, code: &str, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(event, payload) {
        Ok(event) => state.hubs().broadcast(code, event),
        Err(err) => warn!(room = code, event, error = %err, "failed to serialize room event payload"),
    }
}
