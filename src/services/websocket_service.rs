use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dto::{
        events::{ErrorEvent, RoomStateEvent, ServerEvent},
        ws::{IdentifyAck, PlayerInboundMessage},
    },
    error::ServiceError,
    services::{events, presence_service, room_service, round_service},
    state::SharedState,
};

const IDENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Handle the full lifecycle for an individual player WebSocket connection.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let initial_message = match tokio::time::timeout(IDENT_TIMEOUT, receiver.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => text,
        Ok(Some(Ok(Message::Close(_)))) => {
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(Some(Ok(_))) => {
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(Some(Err(err))) => {
            warn!(error = %err, "websocket receive error");
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(None) | Err(_) => {
            warn!("websocket identification timed out");
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let inbound = match serde_json::from_str::<PlayerInboundMessage>(&initial_message) {
        Ok(message) => message,
        Err(err) => {
            warn!(error = %err, "failed to parse websocket message");
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let PlayerInboundMessage::Identify {
        room_code,
        player_id,
    } = inbound
    else {
        warn!("first websocket message was not identify");
        let _ = outbound_tx.send(Message::Close(None));
        finalize(writer_task, outbound_tx).await;
        return;
    };

    if let Err(err) = presence_service::attach(&state, &room_code, player_id, outbound_tx.clone()).await
    {
        send_error_frame(&outbound_tx, &err);
        let _ = outbound_tx.send(Message::Close(None));
        finalize(writer_task, outbound_tx).await;
        return;
    }

    info!(room = %room_code, player = %player_id, "player websocket connected");

    send_frame(
        &outbound_tx,
        "identify_ack",
        &IdentifyAck {
            room_code: room_code.clone(),
            player_id,
            status: "connected".into(),
        },
    );
    send_initial_snapshot(&state, &room_code, &outbound_tx).await;

    // Forward the room's broadcast events onto this socket.
    let forwarder_task = spawn_event_forwarder(&state, &room_code, outbound_tx.clone());

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                match serde_json::from_str::<PlayerInboundMessage>(&text) {
                    Ok(inbound) => {
                        if let Err(err) =
                            dispatch(&state, &room_code, player_id, inbound).await
                        {
                            send_error_frame(&outbound_tx, &err);
                        }
                    }
                    Err(err) => {
                        warn!(player = %player_id, error = %err, "failed to parse websocket message");
                        send_frame(
                            &outbound_tx,
                            events::EVENT_ERROR,
                            &ErrorEvent {
                                reason: "invalid_input".into(),
                                message: "unrecognized message".into(),
                            },
                        );
                    }
                }
            }
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                info!(player = %player_id, "player websocket closed");
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) => {}
            Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(player = %player_id, error = %err, "websocket error");
                break;
            }
        }
    }

    forwarder_task.abort();
    presence_service::detach(&state, &room_code, player_id).await;
    info!(room = %room_code, player = %player_id, "player websocket disconnected");

    finalize(writer_task, outbound_tx).await;
}

/// Route one identified inbound message to the matching service call.
async fn dispatch(
    state: &SharedState,
    room_code: &str,
    player_id: Uuid,
    inbound: PlayerInboundMessage,
) -> Result<(), ServiceError> {
    match inbound {
        PlayerInboundMessage::Identify { .. } => {
            warn!(player = %player_id, "ignoring duplicate identify message");
            Ok(())
        }
        PlayerInboundMessage::Ready => {
            room_service::toggle_ready(state, room_code, player_id).await?;
            Ok(())
        }
        PlayerInboundMessage::Start => {
            round_service::start_game(state, room_code, player_id).await?;
            Ok(())
        }
        PlayerInboundMessage::SubmitPrediction { predicted_choice } => {
            round_service::submit_prediction(state, room_code, player_id, predicted_choice)
                .await?;
            Ok(())
        }
        PlayerInboundMessage::SubmitAnswer { choice } => {
            round_service::submit_answer(state, room_code, player_id, choice).await?;
            Ok(())
        }
        PlayerInboundMessage::Unknown => Err(ServiceError::InvalidInput(
            "unrecognized message type".into(),
        )),
    }
}

/// Pipe a room hub subscription into the socket's writer channel.
fn spawn_event_forwarder(
    state: &SharedState,
    room_code: &str,
    tx: mpsc::UnboundedSender<Message>,
) -> JoinHandle<()> {
    let mut receiver = state.hubs().subscribe(room_code);
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if send_server_event(&tx, &event).is_err() {
                        break;
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    // The client fell behind; it must resync via the state route.
                    warn!(skipped, "websocket subscriber lagged behind room events");
                    continue;
                }
            }
        }
    })
}

/// Push a freshly loaded room snapshot onto a just-attached socket.
async fn send_initial_snapshot(
    state: &SharedState,
    room_code: &str,
    tx: &mpsc::UnboundedSender<Message>,
) {
    match room_service::load_room(state, room_code).await {
        Ok(room) => send_frame(
            tx,
            events::EVENT_ROOM_STATE,
            &RoomStateEvent {
                room: (&room).into(),
            },
        ),
        Err(err) => warn!(room = room_code, error = %err, "could not send initial room snapshot"),
    }
}

fn send_error_frame(tx: &mpsc::UnboundedSender<Message>, err: &ServiceError) {
    send_frame(
        tx,
        events::EVENT_ERROR,
        &ErrorEvent {
            reason: err.reason_code().to_string(),
            message: err.to_string(),
        },
    );
}

/// Wrap a payload in the `{type, payload}` envelope and queue it for writing.
fn send_frame<T>(tx: &mpsc::UnboundedSender<Message>, event: &str, payload: &T)
where
    T: serde::Serialize,
{
    let value = match serde_json::to_value(payload) {
        Ok(value) => value,
        Err(err) => {
            warn!(event, error = %err, "failed to serialize websocket payload");
            return;
        }
    };
    let envelope = json!({ "type": event, "payload": value });
    let _ = tx.send(Message::Text(envelope.to_string().into()));
}

fn send_server_event(
    tx: &mpsc::UnboundedSender<Message>,
    event: &ServerEvent,
) -> Result<(), ()> {
    let envelope = json!({ "type": event.event, "payload": event.data });
    tx.send(Message::Text(envelope.to_string().into()))
        .map_err(|_| ())
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
