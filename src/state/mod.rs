pub mod coordinator;
pub mod engine;
mod hub;
pub mod room;
pub mod timers;

use std::sync::Arc;

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dao::{questions::QuestionSource, room_store::RoomStore},
};

pub use self::hub::{HubRegistry, RoomHub};
use self::{coordinator::RoomLocks, timers::TimerRegistry};

/// Shared handle to the application state.
pub type SharedState = Arc<AppState>;

#[derive(Clone)]
/// Handle used to push messages to a connected player's socket.
pub struct PlayerConnection {
    /// The player behind the socket.
    pub player_id: Uuid,
    /// Room the socket is attached to.
    pub room_code: String,
    /// Writer half of the socket.
    pub tx: mpsc::UnboundedSender<Message>,
}

/// Central application state storing the room store, live connections, and
/// the per-room coordination primitives.
pub struct AppState {
    config: AppConfig,
    store: Arc<dyn RoomStore>,
    questions: Arc<dyn QuestionSource>,
    hubs: HubRegistry,
    locks: RoomLocks,
    timers: TimerRegistry,
    connections: DashMap<Uuid, PlayerConnection>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(
        config: AppConfig,
        store: Arc<dyn RoomStore>,
        questions: Arc<dyn QuestionSource>,
    ) -> SharedState {
        Arc::new(Self {
            config,
            store,
            questions,
            hubs: HubRegistry::new(),
            locks: RoomLocks::new(),
            timers: TimerRegistry::new(),
            connections: DashMap::new(),
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Handle to the room store.
    pub fn store(&self) -> &Arc<dyn RoomStore> {
        &self.store
    }

    /// Handle to the question catalog.
    pub fn questions(&self) -> &Arc<dyn QuestionSource> {
        &self.questions
    }

    /// Per-room broadcast hubs.
    pub fn hubs(&self) -> &HubRegistry {
        &self.hubs
    }

    /// Per-room mutation locks.
    pub fn locks(&self) -> &RoomLocks {
        &self.locks
    }

    /// Per-room phase timers.
    pub fn timers(&self) -> &TimerRegistry {
        &self.timers
    }

    /// Registry of active player sockets keyed by player id.
    pub fn connections(&self) -> &DashMap<Uuid, PlayerConnection> {
        &self.connections
    }

    /// Tear down every live handle for a deleted room.
    pub fn release_room(&self, code: &str) {
        self.timers.cancel(code);
        self.hubs.remove(code);
        self.locks.forget(code);
        self.connections
            .retain(|_, connection| connection.room_code != code);
    }
}
