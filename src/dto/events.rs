use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::game::{PlayerSummary, QuestionSummary, RoomSummary},
    state::{
        engine::ScoreUpdate,
        room::{Choice, LeaderboardEntry},
    },
};

#[derive(Clone, Debug)]
/// Dispatched payload carried across a room's broadcast hub to both the
/// WebSocket and SSE fan-out.
pub struct ServerEvent {
    /// Event name, used as SSE event type and WS envelope tag.
    pub event: String,
    /// JSON payload.
    pub data: serde_json::Value,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the data field.
    pub fn json<T>(event: &str, payload: &T) -> serde_json::Result<Self>
    where
        T: Serialize,
    {
        Ok(Self {
            event: event.to_string(),
            data: serde_json::to_value(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Full room snapshot, sent on subscription and after roster changes.
pub struct RoomStateEvent {
    pub room: RoomSummary,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a player is admitted to the lobby.
pub struct PlayerJoinedEvent {
    pub player: PlayerSummary,
    pub player_count: usize,
    pub max_players: usize,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a player leaves a waiting room.
pub struct PlayerLeftEvent {
    pub player_id: Uuid,
    /// Present when the departing player was hosting and the role moved on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_host_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a mid-game player drops; their slot and score remain.
pub struct PlayerDisconnectedEvent {
    pub player_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a disconnected player re-attaches to the room.
pub struct PlayerReconnectedEvent {
    pub player_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a lobby player toggles their ready flag.
pub struct PlayerReadyEvent {
    pub player_id: Uuid,
    pub is_ready: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Opens a round: the question is shown and the prediction window starts.
pub struct RoundStartedEvent {
    pub round_number: u32,
    pub total_rounds: u32,
    pub current_player_id: Uuid,
    pub question: QuestionSummary,
    /// Seconds until the prediction window is forced shut.
    pub prediction_secs: u64,
}

#[derive(Debug, Serialize, ToSchema)]
/// Announces how many predictors are in, without revealing any choice.
pub struct PredictionsProgressEvent {
    pub round_number: u32,
    pub received: usize,
    pub expected: usize,
}

#[derive(Debug, Serialize, ToSchema)]
/// Predictions closed; the answerer is on the clock.
pub struct AnsweringPhaseEvent {
    pub round_number: u32,
    pub current_player_id: Uuid,
    /// Seconds until a default answer is injected.
    pub answer_secs: u64,
}

#[derive(Debug, Serialize, ToSchema)]
/// Per-predictor outcome of a resolved round.
pub struct ScoreUpdateSummary {
    pub player_id: Uuid,
    pub player_name: String,
    pub predicted_choice: Choice,
    pub is_correct: bool,
    pub points_earned: u32,
    pub new_score: u32,
}

impl From<&ScoreUpdate> for ScoreUpdateSummary {
    fn from(update: &ScoreUpdate) -> Self {
        Self {
            player_id: update.player_id,
            player_name: update.player_name.clone(),
            predicted_choice: update.predicted_choice,
            is_correct: update.is_correct,
            points_earned: update.points_earned,
            new_score: update.new_score,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Reveals the answer and every predictor's result.
pub struct ScoringResultsEvent {
    pub round_number: u32,
    pub answer: Choice,
    pub score_updates: Vec<ScoreUpdateSummary>,
    pub leaderboard: Vec<LeaderboardEntry>,
    /// Seconds the results screen stays up before the game advances.
    pub scoring_secs: u64,
}

#[derive(Debug, Serialize, ToSchema)]
/// The game rolls over to the next round and answerer.
pub struct NextRoundEvent {
    pub next_round: u32,
    pub total_rounds: u32,
    pub next_player_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
/// Final leaderboard shown once the last round resolved.
pub struct FinalScoresEvent {
    pub leaderboard: Vec<LeaderboardEntry>,
    /// Seconds the leaderboard stays up before the winner celebration.
    pub final_scores_secs: u64,
}

#[derive(Debug, Serialize, ToSchema)]
/// Winner celebration dwell.
pub struct WinnerAnimationEvent {
    pub winner: LeaderboardEntry,
    /// Seconds the celebration lasts.
    pub winner_animation_secs: u64,
}

#[derive(Debug, Serialize, ToSchema)]
/// Terminal event; clients may return to the main screen.
pub struct GameCompletedEvent {
    pub leaderboard: Vec<LeaderboardEntry>,
}

#[derive(Debug, Serialize, ToSchema)]
/// Rejection or room-wide fault surfaced over the event stream.
pub struct ErrorEvent {
    /// Stable machine-readable code.
    pub reason: String,
    pub message: String,
}
