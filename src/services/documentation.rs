use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Second Guess Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::room_stream,
        crate::routes::websocket::ws_handler,
        crate::routes::rooms::create_room,
        crate::routes::rooms::join_room,
        crate::routes::rooms::validate_room,
        crate::routes::rooms::get_room,
        crate::routes::rooms::get_game_state,
        crate::routes::rooms::get_players,
        crate::routes::rooms::get_settings,
        crate::routes::rooms::get_rounds,
        crate::routes::rooms::get_current_round,
        crate::routes::rooms::get_current_question,
        crate::routes::rooms::get_leaderboard,
        crate::routes::rooms::get_stats,
        crate::routes::rooms::toggle_ready,
        crate::routes::rooms::leave_room,
        crate::routes::game::start_game,
        crate::routes::game::submit_prediction,
        crate::routes::game::submit_answer,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::ws::PlayerInboundMessage,
            crate::dto::ws::IdentifyAck,
            crate::dto::game::CreateRoomRequest,
            crate::dto::game::JoinRoomRequest,
            crate::dto::game::PlayerActionRequest,
            crate::dto::game::PredictionRequest,
            crate::dto::game::AnswerRequest,
            crate::dto::game::RoomMembership,
            crate::dto::game::RoomSummary,
            crate::dto::game::RoomValidation,
            crate::dto::game::PlayerSummary,
            crate::dto::game::GameStateSnapshot,
            crate::dto::game::QuestionSummary,
            crate::dto::game::RoundSummary,
            crate::dto::game::RoomStats,
            crate::dto::events::PredictionsProgressEvent,
            crate::dto::events::ScoringResultsEvent,
            crate::state::room::Choice,
            crate::state::room::RoomStatus,
            crate::state::room::RoomPhase,
            crate::state::room::GameSettings,
            crate::state::room::LeaderboardEntry,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "rooms", description = "Room lifecycle and read projections"),
        (name = "game", description = "Gameplay actions mirroring the WebSocket flow"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;
