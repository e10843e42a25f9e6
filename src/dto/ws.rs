use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::state::room::Choice;

#[derive(Debug, Deserialize, Serialize, ToSchema)]
/// Messages accepted from player WebSocket clients.
///
/// The first frame on a fresh socket must be `identify`; everything else is
/// rejected until the connection is attached to a room.
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlayerInboundMessage {
    /// Attach this socket to a room as an existing player.
    Identify { room_code: String, player_id: Uuid },
    /// Toggle the lobby ready flag.
    Ready,
    /// Host-only: start the game.
    Start,
    /// Predict the current answerer's choice.
    SubmitPrediction { predicted_choice: Choice },
    /// Answer the current round's question.
    SubmitAnswer { choice: Choice },
    #[serde(other)]
    /// Anything unrecognized; answered with an error event.
    Unknown,
}

#[derive(Debug, Serialize, ToSchema)]
/// Positive acknowledgement sent to a socket after successful identification.
pub struct IdentifyAck {
    pub room_code: String,
    pub player_id: Uuid,
    pub status: String,
}
