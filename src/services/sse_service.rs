use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::{
    dto::events::{RoomStateEvent, ServerEvent},
    error::ServiceError,
    services::{events, room_service},
    state::SharedState,
};

/// Subscribe to one room's event stream, verifying the room exists first.
pub async fn subscribe_room(
    state: &SharedState,
    code: &str,
) -> Result<(broadcast::Receiver<ServerEvent>, ServerEvent), ServiceError> {
    let room = room_service::load_room(state, code).await?;
    let receiver = state.hubs().subscribe(code);
    // Initial snapshot so a late subscriber renders without waiting for the
    // next mutation.
    let snapshot = ServerEvent::json(
        events::EVENT_ROOM_STATE,
        &RoomStateEvent { room: (&room).into() },
    )
    .map_err(|err| ServiceError::InvalidInput(format!("snapshot serialization failed: {err}")))?;
    Ok((receiver, snapshot))
}

/// Convert a broadcast receiver into an SSE response, forwarding events and
/// cleaning up once the client disconnects.
pub fn to_sse_stream(
    mut receiver: broadcast::Receiver<ServerEvent>,
    initial: ServerEvent,
    room_code: String,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    // forwarder task: reads from broadcast and pushes into mpsc
    tokio::spawn(async move {
        if tx.send(Ok(to_event(&initial))).await.is_err() {
            return;
        }
        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            if tx.send(Ok(to_event(&payload))).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(_)) => {
                            // Skip lagged messages but keep the stream alive.
                            continue;
                        }
                    }
                }
            }
        }
        tracing::info!(room = %room_code, "room SSE stream disconnected");
    });

    // response stream reads from mpsc; when client disconnects axum drops this stream
    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn to_event(payload: &ServerEvent) -> Event {
    Event::default()
        .event(payload.event.clone())
        .data(payload.data.to_string())
}
