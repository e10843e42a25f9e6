use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    dao::questions::Question,
    dto::{format_system_time, validation::validate_player_name},
    state::room::{Choice, GameSettings, Player, Room, RoomPhase, RoomStatus, Round},
};

/// Payload used to open a brand-new room.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRoomRequest {
    /// Display name of the creating player, who becomes the host.
    pub host_name: String,
}

impl Validate for CreateRoomRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Err(e) = validate_player_name(&self.host_name) {
            errors.add("host_name", e);
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Payload used to join an existing waiting room.
#[derive(Debug, Deserialize, ToSchema)]
pub struct JoinRoomRequest {
    /// Four-digit join code.
    pub room_code: String,
    /// Display name of the joining player.
    pub player_name: String,
}

impl Validate for JoinRoomRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Err(e) = crate::dto::validation::validate_room_code(&self.room_code) {
            errors.add("room_code", e);
        }
        if let Err(e) = validate_player_name(&self.player_name) {
            errors.add("player_name", e);
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Identifies the acting player for room-scoped actions.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct PlayerActionRequest {
    /// The acting player's id.
    pub player_id: Uuid,
}

/// A predictor's guess for the current round.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct PredictionRequest {
    /// The predicting player's id.
    pub player_id: Uuid,
    /// Which option they believe the answerer will pick.
    pub predicted_choice: Choice,
}

/// The answerer's own choice for the current round.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct AnswerRequest {
    /// The answering player's id.
    pub player_id: Uuid,
    /// The choice they actually make.
    pub choice: Choice,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
/// Public projection of a player exposed to REST/WS/SSE clients.
pub struct PlayerSummary {
    pub id: Uuid,
    pub name: String,
    pub score: u32,
    pub is_ready: bool,
    pub is_connected: bool,
    pub is_host: bool,
    pub joined_at: String,
}

impl PlayerSummary {
    /// Project a roster entry, flagging the room's host.
    pub fn from_player(player: &Player, host_id: Uuid) -> Self {
        Self {
            id: player.id,
            name: player.name.clone(),
            score: player.score,
            is_ready: player.is_ready,
            is_connected: player.is_connected,
            is_host: player.id == host_id,
            joined_at: format_system_time(player.joined_at),
        }
    }
}

#[derive(Clone, Debug, Serialize, ToSchema)]
/// Full room projection returned by creation, join, and room lookups.
pub struct RoomSummary {
    pub code: String,
    pub host_id: Uuid,
    pub status: RoomStatus,
    pub phase: RoomPhase,
    pub players: Vec<PlayerSummary>,
    pub current_round: u32,
    pub total_rounds: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_player_id: Option<Uuid>,
    pub settings: GameSettings,
    pub created_at: String,
    pub last_activity_at: String,
}

impl From<&Room> for RoomSummary {
    fn from(room: &Room) -> Self {
        Self {
            code: room.code.clone(),
            host_id: room.host_id,
            status: room.status,
            phase: room.phase,
            players: room
                .players
                .iter()
                .map(|player| PlayerSummary::from_player(player, room.host_id))
                .collect(),
            current_round: room.current_round,
            total_rounds: room.total_rounds,
            current_player_id: room.current_player_id,
            settings: room.settings.clone(),
            created_at: format_system_time(room.created_at),
            last_activity_at: format_system_time(room.last_activity_at),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Returned when a room was created or joined, pairing the room snapshot
/// with the caller's server-assigned player id.
pub struct RoomMembership {
    pub room: RoomSummary,
    pub player_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
/// Lightweight existence probe for a join code.
pub struct RoomValidation {
    pub code: String,
    pub exists: bool,
    pub joinable: bool,
    pub player_count: usize,
    pub max_players: usize,
}

impl RoomValidation {
    /// Probe result for a code with no room behind it.
    pub fn missing(code: String, max_players: usize) -> Self {
        Self {
            code,
            exists: false,
            joinable: false,
            player_count: 0,
            max_players,
        }
    }

    /// Probe result for an existing room.
    pub fn from_room(room: &Room) -> Self {
        Self {
            code: room.code.clone(),
            exists: true,
            joinable: room.is_joinable(),
            player_count: room.players.len(),
            max_players: room.max_players,
        }
    }
}

#[derive(Clone, Debug, Serialize, ToSchema)]
/// Projection of a question as shown to the room.
pub struct QuestionSummary {
    pub id: Uuid,
    pub prompt: String,
    pub option_a: String,
    pub option_b: String,
}

impl From<&Question> for QuestionSummary {
    fn from(question: &Question) -> Self {
        Self {
            id: question.id,
            prompt: question.prompt.clone(),
            option_a: question.option_a.clone(),
            option_b: question.option_b.clone(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Projection of one round. The answer is only revealed once the round
/// completed, so polling clients cannot read it early.
pub struct RoundSummary {
    pub round_number: u32,
    pub current_player_id: Uuid,
    pub question_id: Uuid,
    pub predictions_received: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_answer: Option<Choice>,
    pub is_completed: bool,
    pub started_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answered_at: Option<String>,
}

impl From<&Round> for RoundSummary {
    fn from(round: &Round) -> Self {
        Self {
            round_number: round.round_number,
            current_player_id: round.current_player_id,
            question_id: round.question_id,
            predictions_received: round.predictor_count(),
            player_answer: round.player_answer.filter(|_| round.is_completed),
            is_completed: round.is_completed,
            started_at: format_system_time(round.started_at),
            answered_at: round.answered_at.map(format_system_time),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Live gameplay snapshot served by the state-polling route.
pub struct GameStateSnapshot {
    pub status: RoomStatus,
    pub phase: RoomPhase,
    pub current_round: u32,
    pub total_rounds: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_player_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<QuestionSummary>,
    pub predictions_received: usize,
    pub predictions_expected: usize,
    pub leaderboard: Vec<crate::state::room::LeaderboardEntry>,
}

#[derive(Debug, Serialize, ToSchema)]
/// Aggregate figures about one room, for diagnostics dashboards.
pub struct RoomStats {
    pub code: String,
    pub status: RoomStatus,
    pub phase: RoomPhase,
    pub player_count: usize,
    pub connected_players: usize,
    pub rounds_played: usize,
    pub total_rounds: u32,
    pub predictions_made: usize,
    pub questions_used: usize,
    pub created_at: String,
    pub last_activity_at: String,
}

impl From<&Room> for RoomStats {
    fn from(room: &Room) -> Self {
        Self {
            code: room.code.clone(),
            status: room.status,
            phase: room.phase,
            player_count: room.players.len(),
            connected_players: room.players.iter().filter(|p| p.is_connected).count(),
            rounds_played: room.rounds.iter().filter(|r| r.is_completed).count(),
            total_rounds: room.total_rounds,
            predictions_made: room.rounds.iter().map(|r| r.predictions.len()).sum(),
            questions_used: room.used_question_ids.len(),
            created_at: format_system_time(room.created_at),
            last_activity_at: format_system_time(room.last_activity_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn round_summary_hides_answer_until_completed() {
        let config = AppConfig::default();
        let room = Room::new("1234".into(), "Ava".into(), &config);
        let mut round = Round {
            round_number: 1,
            current_player_id: room.host_id,
            question_id: Uuid::new_v4(),
            predictions: Vec::new(),
            player_answer: Some(Choice::B),
            started_at: std::time::SystemTime::now(),
            answered_at: None,
            is_completed: false,
        };
        assert!(RoundSummary::from(&round).player_answer.is_none());

        round.is_completed = true;
        assert_eq!(RoundSummary::from(&round).player_answer, Some(Choice::B));
    }

    #[test]
    fn join_request_validation_checks_both_fields() {
        let bad = JoinRoomRequest {
            room_code: "12x4".into(),
            player_name: "   ".into(),
        };
        let errors = bad.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("room_code"));
        assert!(errors.field_errors().contains_key("player_name"));
    }
}
