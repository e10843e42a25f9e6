//! In-process room store backed by a concurrent map. Snapshots live for the
//! lifetime of the server; there is no durability across restarts.

use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;

use crate::dao::room_store::RoomStore;
use crate::dao::storage::StorageResult;
use crate::state::room::Room;

/// Room store keeping every snapshot in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryRoomStore {
    rooms: Arc<DashMap<String, Room>>,
}

impl MemoryRoomStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rooms currently stored.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

impl RoomStore for MemoryRoomStore {
    fn insert_room(&self, room: Room) -> BoxFuture<'static, StorageResult<bool>> {
        let rooms = Arc::clone(&self.rooms);
        Box::pin(async move {
            match rooms.entry(room.code.clone()) {
                dashmap::Entry::Occupied(_) => Ok(false),
                dashmap::Entry::Vacant(slot) => {
                    slot.insert(room);
                    Ok(true)
                }
            }
        })
    }

    fn save_room(&self, room: Room) -> BoxFuture<'static, StorageResult<()>> {
        let rooms = Arc::clone(&self.rooms);
        Box::pin(async move {
            rooms.insert(room.code.clone(), room);
            Ok(())
        })
    }

    fn find_room(&self, code: &str) -> BoxFuture<'static, StorageResult<Option<Room>>> {
        let rooms = Arc::clone(&self.rooms);
        let code = code.to_string();
        Box::pin(async move { Ok(rooms.get(&code).map(|entry| entry.value().clone())) })
    }

    fn delete_room(&self, code: &str) -> BoxFuture<'static, StorageResult<()>> {
        let rooms = Arc::clone(&self.rooms);
        let code = code.to_string();
        Box::pin(async move {
            rooms.remove(&code);
            Ok(())
        })
    }

    fn list_codes(&self) -> BoxFuture<'static, StorageResult<Vec<String>>> {
        let rooms = Arc::clone(&self.rooms);
        Box::pin(async move { Ok(rooms.iter().map(|entry| entry.key().clone()).collect()) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn sample_room(code: &str) -> Room {
        Room::new(code.to_string(), "Ava".into(), &AppConfig::default())
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_codes() {
        let store = MemoryRoomStore::new();
        assert!(store.insert_room(sample_room("4242")).await.unwrap());
        assert!(!store.insert_room(sample_room("4242")).await.unwrap());
        assert_eq!(store.room_count(), 1);
    }

    #[tokio::test]
    async fn save_overwrites_and_find_returns_snapshot() {
        let store = MemoryRoomStore::new();
        let mut room = sample_room("1111");
        store.insert_room(room.clone()).await.unwrap();

        room.touch();
        store.save_room(room.clone()).await.unwrap();
        let found = store.find_room("1111").await.unwrap().unwrap();
        assert_eq!(found.last_activity_at, room.last_activity_at);

        assert!(store.find_room("9999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_removes_room() {
        let store = MemoryRoomStore::new();
        store.insert_room(sample_room("1234")).await.unwrap();
        store.delete_room("1234").await.unwrap();
        assert!(store.find_room("1234").await.unwrap().is_none());
        assert_eq!(store.room_count(), 0);
    }
}
