pub mod memory;

use futures::future::BoxFuture;

use crate::dao::storage::StorageResult;
use crate::state::room::Room;

/// Abstraction over the persistence layer for rooms.
///
/// Rooms are keyed by their four-digit join code. Backends store full
/// snapshots; callers load, mutate a copy, and save it back under the
/// per-room lock so writes never interleave.
pub trait RoomStore: Send + Sync {
    /// Insert a new room if its code is free. Resolves to `false` when the
    /// code is already taken, letting the caller retry with a fresh code.
    fn insert_room(&self, room: Room) -> BoxFuture<'static, StorageResult<bool>>;
    /// Overwrite the stored snapshot for an existing room.
    fn save_room(&self, room: Room) -> BoxFuture<'static, StorageResult<()>>;
    /// Fetch a room snapshot by code.
    fn find_room(&self, code: &str) -> BoxFuture<'static, StorageResult<Option<Room>>>;
    /// Remove a room entirely.
    fn delete_room(&self, code: &str) -> BoxFuture<'static, StorageResult<()>>;
    /// Codes of every stored room, for diagnostics.
    fn list_codes(&self) -> BoxFuture<'static, StorageResult<Vec<String>>>;
    /// Verify the backend is reachable.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
