/// OpenAPI documentation generation.
pub mod documentation;
/// Room event names and broadcast helpers.
pub mod events;
/// Health check service.
pub mod health_service;
/// Connection attach/detach and reconnection handling.
pub mod presence_service;
/// Room lifecycle: creation, joining, leaving, read projections.
pub mod room_service;
/// Round flow: starting games, predictions, answers, phase timers.
pub mod round_service;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// WebSocket connection and message handling service.
pub mod websocket_service;
