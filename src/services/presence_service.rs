//! Connection attach/detach handling.
//!
//! A socket only counts as presence once it identified itself with a room
//! code and player id. A dropped socket never touches the roster: the player
//! is marked disconnected and the room is told, whatever the room's status.
//! Leaving a room is an explicit action handled by the room service.

use axum::extract::ws::Message;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::ServiceError,
    services::{events, room_service},
    state::{PlayerConnection, SharedState},
};

/// Attach an identified socket to its room. Replaces any previous socket for
/// the same player and flips a mid-game disconnected flag back on.
pub async fn attach(
    state: &SharedState,
    code: &str,
    player_id: Uuid,
    tx: mpsc::UnboundedSender<Message>,
) -> Result<(), ServiceError> {
    let _guard = state.locks().acquire(code).await;
    let mut room = room_service::load_room(state, code).await?;
    let Some(player) = room.player_mut(player_id) else {
        return Err(ServiceError::NotFound(
            "player not found in this room".into(),
        ));
    };

    let reconnecting = !player.is_connected;
    player.is_connected = true;
    if reconnecting {
        room.touch();
        room_service::persist_room(state, &room).await?;
    }

    state.connections().insert(
        player_id,
        PlayerConnection {
            player_id,
            room_code: code.to_string(),
            tx,
        },
    );

    if reconnecting {
        events::broadcast_player_reconnected(state, code, player_id);
        events::broadcast_room_state(state, &room);
        info!(room = code, player = %player_id, "player reconnected");
    } else {
        info!(room = code, player = %player_id, "player socket attached");
    }
    Ok(())
}

/// Handle a socket teardown. The player keeps their roster slot in every
/// room status; only their presence flag flips and the room is notified.
pub async fn detach(state: &SharedState, code: &str, player_id: Uuid) {
    // A newer socket may have replaced this one; leave it alone then.
    let still_current = state
        .connections()
        .get(&player_id)
        .map(|connection| connection.room_code == code)
        .unwrap_or(false);
    if still_current {
        state.connections().remove(&player_id);
    }

    if let Err(err) = mark_disconnected(state, code, player_id).await {
        warn!(room = code, player = %player_id, error = %err, "socket teardown bookkeeping failed");
    }
}

async fn mark_disconnected(
    state: &SharedState,
    code: &str,
    player_id: Uuid,
) -> Result<(), ServiceError> {
    let _guard = state.locks().acquire(code).await;
    let mut room = room_service::load_room(state, code).await?;
    let Some(player) = room.player_mut(player_id) else {
        return Ok(());
    };
    if !player.is_connected {
        return Ok(());
    }
    player.is_connected = false;
    room.touch();
    room_service::persist_room(state, &room).await?;

    events::broadcast_player_disconnected(state, code, player_id);
    info!(room = code, player = %player_id, "player disconnected");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{questions::BuiltinQuestionBank, room_store::memory::MemoryRoomStore},
        services::round_service,
        state::{
            AppState,
            room::{Room, RoomPhase, RoomStatus},
            timers::TimerKey,
        },
    };

    fn test_state() -> SharedState {
        AppState::new(
            AppConfig::default(),
            Arc::new(MemoryRoomStore::new()),
            Arc::new(BuiltinQuestionBank::new()),
        )
    }

    fn socket_tx() -> mpsc::UnboundedSender<Message> {
        mpsc::unbounded_channel().0
    }

    async fn stored_room(state: &SharedState, code: &str) -> Room {
        state.store().find_room(code).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn lobby_disconnect_keeps_the_roster_slot() {
        let state = test_state();
        let host = room_service::create_room(&state, "Ava").await.unwrap();
        let code = host.room.code.clone();
        let ben = room_service::join_room(&state, &code, "Ben")
            .await
            .unwrap()
            .player_id;
        attach(&state, &code, ben, socket_tx()).await.unwrap();

        detach(&state, &code, ben).await;

        let room = stored_room(&state, &code).await;
        assert_eq!(room.players.len(), 2);
        assert!(!room.player(ben).unwrap().is_connected);
        assert!(!state.connections().contains_key(&ben));
    }

    #[tokio::test]
    async fn sole_host_disconnect_keeps_the_room() {
        let state = test_state();
        let host = room_service::create_room(&state, "Ava").await.unwrap();
        let code = host.room.code.clone();
        attach(&state, &code, host.player_id, socket_tx())
            .await
            .unwrap();

        detach(&state, &code, host.player_id).await;

        let room = stored_room(&state, &code).await;
        assert_eq!(room.host_id, host.player_id);
        assert!(!room.player(host.player_id).unwrap().is_connected);
    }

    #[tokio::test]
    async fn reattach_flips_the_presence_flag_back() {
        let state = test_state();
        let host = room_service::create_room(&state, "Ava").await.unwrap();
        let code = host.room.code.clone();
        let ben = room_service::join_room(&state, &code, "Ben")
            .await
            .unwrap()
            .player_id;
        attach(&state, &code, ben, socket_tx()).await.unwrap();
        detach(&state, &code, ben).await;
        assert!(!stored_room(&state, &code).await.player(ben).unwrap().is_connected);

        attach(&state, &code, ben, socket_tx()).await.unwrap();

        let room = stored_room(&state, &code).await;
        assert!(room.player(ben).unwrap().is_connected);
        assert!(state.connections().contains_key(&ben));
    }

    #[tokio::test]
    async fn mid_game_disconnect_leaves_the_phase_timer_alone() {
        let state = test_state();
        let host = room_service::create_room(&state, "Ava").await.unwrap();
        let code = host.room.code.clone();
        let mut others = Vec::new();
        for name in ["Ben", "Cy", "Dee"] {
            others.push(
                room_service::join_room(&state, &code, name)
                    .await
                    .unwrap()
                    .player_id,
            );
        }
        round_service::start_game(&state, &code, host.player_id)
            .await
            .unwrap();

        detach(&state, &code, others[0]).await;

        let room = stored_room(&state, &code).await;
        assert_eq!(room.status, RoomStatus::Playing);
        assert_eq!(room.phase, RoomPhase::Predicting);
        assert_eq!(room.players.len(), 4);
        assert!(!room.player(others[0]).unwrap().is_connected);
        assert_eq!(
            state.timers().pending(&code),
            Some(TimerKey {
                round: 1,
                phase: RoomPhase::Predicting
            })
        );
    }

    #[tokio::test]
    async fn finished_room_disconnect_keeps_the_player() {
        let state = test_state();
        let host = room_service::create_room(&state, "Ava").await.unwrap();
        let code = host.room.code.clone();
        let ben = room_service::join_room(&state, &code, "Ben")
            .await
            .unwrap()
            .player_id;
        let mut room = stored_room(&state, &code).await;
        room.status = RoomStatus::Finished;
        room.phase = RoomPhase::Finished;
        state.store().save_room(room).await.unwrap();

        detach(&state, &code, ben).await;

        let room = stored_room(&state, &code).await;
        assert_eq!(room.players.len(), 2);
        assert!(!room.player(ben).unwrap().is_connected);
    }
}
