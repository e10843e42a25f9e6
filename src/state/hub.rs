//! Per-room broadcast hubs feeding both the WebSocket and SSE fan-out.

use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::dto::events::ServerEvent;

/// Channel capacity for each room hub. Slow subscribers that lag behind this
/// many events are dropped by the broadcast channel and must resync.
const ROOM_HUB_CAPACITY: usize = 32;

/// Broadcast hub fanning one room's events out to all its subscribers.
pub struct RoomHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl RoomHub {
    fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers, ignoring delivery errors.
    pub fn broadcast(&self, event: ServerEvent) {
        let _ = self.sender.send(event);
    }
}

/// Registry of room hubs keyed by join code.
#[derive(Default)]
pub struct HubRegistry {
    hubs: DashMap<String, RoomHub>,
}

impl HubRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Broadcast an event to a room, creating its hub on first use.
    pub fn broadcast(&self, code: &str, event: ServerEvent) {
        self.hubs
            .entry(code.to_string())
            .or_insert_with(|| RoomHub::new(ROOM_HUB_CAPACITY))
            .broadcast(event);
    }

    /// Subscribe to a room's events, creating its hub on first use.
    pub fn subscribe(&self, code: &str) -> broadcast::Receiver<ServerEvent> {
        self.hubs
            .entry(code.to_string())
            .or_insert_with(|| RoomHub::new(ROOM_HUB_CAPACITY))
            .subscribe()
    }

    /// Drop a room's hub once the room is deleted, closing its subscribers.
    pub fn remove(&self, code: &str) {
        self.hubs.remove(code);
    }
}
