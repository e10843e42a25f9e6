use std::time::SystemTime;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::AppConfig;

/// One of the two answers a binary question admits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Choice {
    /// First labeled option.
    A,
    /// Second labeled option.
    B,
}

impl Choice {
    /// Fallback injected when the answer timer fires before the answerer acts.
    pub const DEFAULT_ANSWER: Choice = Choice::A;
}

/// Coarse lifecycle of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    /// Room accepts joins; the game has not started.
    Waiting,
    /// A game is in progress.
    Playing,
    /// The game reached its last round.
    Finished,
}

/// Fine-grained phase driving timers and client rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RoomPhase {
    /// Lobby: players joining and readying up.
    Waiting,
    /// Predictors pick what they think the answerer will choose.
    Predicting,
    /// Predictions are closed; the answerer reveals their choice.
    Answering,
    /// Round results are displayed before advancing.
    Scoring,
    /// Final leaderboard dwell after the last round.
    FinalScores,
    /// Winner celebration dwell.
    WinnerAnimation,
    /// Terminal phase; clients may return to the main screen.
    Finished,
}

/// Per-room timing knobs, seeded from [`AppConfig`] defaults.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GameSettings {
    /// Seconds predictors get before the phase is forced forward.
    pub prediction_secs: u64,
    /// Seconds the answerer gets before a default answer is injected.
    pub answer_secs: u64,
    /// Dwell on the per-round score display.
    pub scoring_secs: u64,
    /// Dwell on the final leaderboard.
    pub final_scores_secs: u64,
    /// Dwell on the winner celebration.
    pub winner_animation_secs: u64,
}

/// A participant embedded in a room, ordered by join time.
#[derive(Debug, Clone)]
pub struct Player {
    /// Opaque server-generated identifier.
    pub id: Uuid,
    /// Display name, trimmed, case-insensitively unique within the room.
    pub name: String,
    /// Cumulative score; only grows while a game runs.
    pub score: u32,
    /// Lobby ready flag.
    pub is_ready: bool,
    /// Presence flag maintained by the connection layer.
    pub is_connected: bool,
    /// Join timestamp; join order defines answerer rotation and host handoff.
    pub joined_at: SystemTime,
}

/// A single guess recorded against the current answerer.
#[derive(Debug, Clone)]
pub struct Prediction {
    /// The predictor (never the round's answerer).
    pub player_id: Uuid,
    /// Question the prediction was made for.
    pub question_id: Uuid,
    /// The answerer being predicted (the round's current player).
    pub target_player_id: Uuid,
    /// The guessed choice.
    pub predicted_choice: Choice,
    /// Resolved when the answer is revealed; `None` until then.
    pub is_correct: Option<bool>,
    /// Submission timestamp.
    pub submitted_at: SystemTime,
}

/// One predicting/answering cycle; immutable once completed.
#[derive(Debug, Clone)]
pub struct Round {
    /// 1-based position in the game.
    pub round_number: u32,
    /// The answerer for this round; fixed at creation.
    pub current_player_id: Uuid,
    /// Question presented this round.
    pub question_id: Uuid,
    /// Guesses received so far, at most one per predictor.
    pub predictions: Vec<Prediction>,
    /// The answerer's revealed choice; set exactly once.
    pub player_answer: Option<Choice>,
    /// Round creation timestamp.
    pub started_at: SystemTime,
    /// When the answer was recorded.
    pub answered_at: Option<SystemTime>,
    /// True once the answer is in and correctness flags are resolved.
    pub is_completed: bool,
}

impl Round {
    /// Number of distinct players that have predicted so far.
    pub fn predictor_count(&self) -> usize {
        self.predictions.len()
    }

    /// Look up the prediction a given player submitted, if any.
    pub fn prediction_of(&self, player_id: Uuid) -> Option<&Prediction> {
        self.predictions.iter().find(|p| p.player_id == player_id)
    }
}

/// Cached ranked standing derived from scores and prediction history.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LeaderboardEntry {
    /// Ranked player id.
    pub player_id: Uuid,
    /// Ranked player display name.
    pub player_name: String,
    /// Cumulative score.
    pub score: u32,
    /// Count of predictions resolved correct across all rounds.
    pub correct_predictions: u32,
}

/// Aggregate root for one play session, addressed by its 4-digit code.
#[derive(Debug, Clone)]
pub struct Room {
    /// Unique 4-digit code.
    pub code: String,
    /// Creator of the room; reassigned on host departure.
    pub host_id: Uuid,
    /// Participants in join order.
    pub players: Vec<Player>,
    /// Coarse lifecycle state.
    pub status: RoomStatus,
    /// Fine-grained phase.
    pub phase: RoomPhase,
    /// 1-based current round, 0 before the game starts.
    pub current_round: u32,
    /// Total rounds for the game (`max_players * rounds_per_player`).
    pub total_rounds: u32,
    /// Answerer of the current round.
    pub current_player_id: Option<Uuid>,
    /// Round records, one per started round, append-only.
    pub rounds: Vec<Round>,
    /// Capacity quota; a game starts only with exactly this many players.
    pub max_players: usize,
    /// Questions already presented, never repeated within the room.
    pub used_question_ids: IndexSet<Uuid>,
    /// Cached standings, recomputed whenever scores change.
    pub leaderboard: Vec<LeaderboardEntry>,
    /// Timing configuration for this room.
    pub settings: GameSettings,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Last mutation timestamp.
    pub last_activity_at: SystemTime,
}

impl Room {
    /// Build a fresh waiting room hosted by a newly created player.
    pub fn new(code: String, host_name: String, config: &AppConfig) -> Self {
        let now = SystemTime::now();
        let host = Player {
            id: Uuid::new_v4(),
            name: host_name,
            score: 0,
            is_ready: false,
            is_connected: true,
            joined_at: now,
        };
        let host_id = host.id;
        Self {
            code,
            host_id,
            players: vec![host],
            status: RoomStatus::Waiting,
            phase: RoomPhase::Waiting,
            current_round: 0,
            total_rounds: config.max_players as u32 * config.rounds_per_player,
            current_player_id: None,
            rounds: Vec::new(),
            max_players: config.max_players,
            used_question_ids: IndexSet::new(),
            leaderboard: Vec::new(),
            settings: config.default_settings(),
            created_at: now,
            last_activity_at: now,
        }
    }

    /// Borrow a player by id.
    pub fn player(&self, id: Uuid) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    /// Borrow a player mutably by id.
    pub fn player_mut(&mut self, id: Uuid) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    /// Borrow the round currently being played, if one was materialized.
    pub fn current_round_record(&self) -> Option<&Round> {
        let number = self.current_round;
        self.rounds.iter().find(|r| r.round_number == number)
    }

    /// Mutable access to the round currently being played.
    pub fn current_round_record_mut(&mut self) -> Option<&mut Round> {
        let number = self.current_round;
        self.rounds.iter_mut().find(|r| r.round_number == number)
    }

    /// Predictions expected per round: everyone except the answerer.
    pub fn expected_predictions(&self) -> usize {
        self.players.len().saturating_sub(1)
    }

    /// Whether the room still accepts joins.
    pub fn is_joinable(&self) -> bool {
        self.status == RoomStatus::Waiting && self.players.len() < self.max_players
    }

    /// Refresh the activity timestamp after a mutation.
    pub fn touch(&mut self) {
        self.last_activity_at = SystemTime::now();
    }
}
