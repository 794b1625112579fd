//! Per-connection relay lifecycle: upgrade, validation, history replay,
//! the receive → persist → broadcast loop, and teardown.
//!
//! Each connection runs as its own task and owns its socket exclusively.
//! Outbound frames (replay, broadcasts from peers, pongs, the final close)
//! flow through a bounded mpsc channel drained by a writer task, so a slow
//! peer never stalls a sender's loop — a full channel drops that one
//! delivery instead.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket, close_code};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use duet_core::{NewMessage, ParticipantId, RelayError, SessionId};

use crate::AppState;
use crate::metrics::{
    RELAY_BROADCAST_FAILURES_TOTAL, RELAY_MALFORMED_FRAMES_TOTAL, RELAY_MESSAGES_TOTAL,
    RELAY_REPLAYED_RECORDS_TOTAL, RELAY_VALIDATION_FAILURES_TOTAL, STORE_APPEND_FAILURES_TOTAL,
    WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_DISCONNECTIONS_TOTAL,
};

/// Join request metadata, taken from the upgrade request's query string.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinParams {
    /// The connecting participant.
    #[serde(default)]
    pub user_id: String,
    /// The intended partner.
    #[serde(default)]
    pub partner_id: String,
}

/// An outbound frame queued for the writer task.
#[derive(Clone, Debug)]
pub enum Outbound {
    /// A text frame (replayed history or a broadcast message).
    Text(Utf8Bytes),
    /// Reply to an inbound ping.
    Pong(Bytes),
    /// Echo the observed close and stop writing.
    Close(Option<CloseFrame>),
}

/// One participant's live attachment to a session.
///
/// Owned by the relay task handling the socket; peers only ever see it
/// through registry snapshots, and only to queue outbound text.
pub struct RelayConnection {
    /// Unique connection id (distinct from the participant id — the same
    /// participant may hold several connections).
    pub id: String,
    participant_id: ParticipantId,
    session_id: SessionId,
    outbound: mpsc::Sender<Outbound>,
}

impl RelayConnection {
    /// Create a connection handle around an outbound channel.
    pub fn new(
        id: String,
        participant_id: ParticipantId,
        session_id: SessionId,
        outbound: mpsc::Sender<Outbound>,
    ) -> Self {
        Self { id, participant_id, session_id, outbound }
    }

    /// Session this connection belongs to.
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Participant on this end of the connection.
    pub fn participant_id(&self) -> &ParticipantId {
        &self.participant_id
    }

    /// Queue a text frame without blocking.
    ///
    /// Returns `false` when the channel is full or the writer is gone;
    /// the caller logs and moves on to the next target.
    pub fn send_text(&self, content: Utf8Bytes) -> bool {
        self.outbound.try_send(Outbound::Text(content)).is_ok()
    }
}

/// `GET /ws?userId=…&partnerId=…` — upgrade and hand off to the relay task.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(params): Query<JoinParams>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, params, socket))
}

/// Drive one connection from validation to close.
pub(crate) async fn handle_socket(state: AppState, params: JoinParams, socket: WebSocket) {
    // Both identifier checks happen before any registry or storage
    // interaction.
    let (user, partner, session_id) = match validate(&params) {
        Ok(validated) => validated,
        Err(error) => {
            reject(socket, &error).await;
            return;
        }
    };

    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);

    let connection_id = format!("conn_{}", Uuid::now_v7());
    let (outbound_tx, outbound_rx) = mpsc::channel(state.config.channel_capacity);
    let connection = Arc::new(RelayConnection::new(
        connection_id.clone(),
        user.clone(),
        session_id.clone(),
        outbound_tx.clone(),
    ));

    let (sink, mut stream) = socket.split();
    let writer = tokio::spawn(write_outbound(sink, outbound_rx));

    // Registered before replay: a peer's message sent while history is
    // still streaming is delivered live, possibly interleaved with it.
    state.registry.join(Arc::clone(&connection)).await;
    info!(
        session_id = %session_id,
        participant = %user,
        conn_id = %connection_id,
        "connection joined"
    );

    let observed_close = if replay_history(&state, &session_id, &outbound_tx).await {
        relay_loop(&state, &connection, &partner, &outbound_tx, &mut stream).await
    } else {
        None
    };

    // Closing: deregister (idempotent), then echo the observed close.
    state.registry.leave(&session_id, &connection_id).await;
    let _ = outbound_tx.send(Outbound::Close(observed_close)).await;
    drop(outbound_tx);
    drop(connection);
    let _ = writer.await;

    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
    counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
    info!(session_id = %session_id, conn_id = %connection_id, "connection closed");
}

/// Check the identifier pair and derive the session key.
pub(crate) fn validate(
    params: &JoinParams,
) -> Result<(ParticipantId, ParticipantId, SessionId), RelayError> {
    let user = ParticipantId::new(params.user_id.clone());
    let partner = ParticipantId::new(params.partner_id.clone());
    let session_id = SessionId::for_pair(&user, &partner)?;
    Ok((user, partner, session_id))
}

/// Send one error frame, then close with a policy-violation code carrying
/// the same reason.
async fn reject(mut socket: WebSocket, error: &RelayError) {
    counter!(RELAY_VALIDATION_FAILURES_TOTAL).increment(1);
    let reason = error.to_string();
    warn!(reason = %reason, "rejecting join request");
    let _ = socket.send(Message::Text(reason.clone().into())).await;
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code: close_code::POLICY,
            reason: reason.into(),
        })))
        .await;
}

/// Drain the outbound channel into the socket's write half.
async fn write_outbound(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<Outbound>,
) {
    while let Some(frame) = outbound.recv().await {
        match frame {
            Outbound::Text(text) => {
                if sink.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            Outbound::Pong(payload) => {
                if sink.send(Message::Pong(payload)).await.is_err() {
                    break;
                }
            }
            Outbound::Close(frame) => {
                let _ = sink.send(Message::Close(frame)).await;
                break;
            }
        }
    }
}

/// Stream the session's persisted history to the joining connection.
///
/// Returns `false` when the transport died mid-replay. A store failure is
/// logged and replay is skipped — live relaying still proceeds.
async fn replay_history(
    state: &AppState,
    session_id: &SessionId,
    outbound: &mpsc::Sender<Outbound>,
) -> bool {
    let records = match state.store.history(session_id).await {
        Ok(records) => records,
        Err(error) => {
            warn!(
                session_id = %session_id,
                error = %error,
                "history fetch failed, continuing without replay"
            );
            return true;
        }
    };

    let count = records.len();
    for record in records {
        if outbound.send(Outbound::Text(record.content.into())).await.is_err() {
            return false;
        }
    }
    if count > 0 {
        counter!(RELAY_REPLAYED_RECORDS_TOTAL).increment(count as u64);
        debug!(session_id = %session_id, records = count, "history replayed");
    }
    true
}

/// Blocking receive loop; runs until a close frame or a receive error.
///
/// Returns the close frame observed from the peer, if any, so teardown can
/// echo it.
async fn relay_loop(
    state: &AppState,
    connection: &Arc<RelayConnection>,
    partner: &ParticipantId,
    outbound: &mpsc::Sender<Outbound>,
    stream: &mut SplitStream<WebSocket>,
) -> Option<CloseFrame> {
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(payload)) => match parse_content(payload.as_str()) {
                Ok(content) => {
                    persist_and_broadcast(state, connection, partner, content).await;
                }
                Err(error) => {
                    counter!(RELAY_MALFORMED_FRAMES_TOTAL).increment(1);
                    warn!(conn_id = %connection.id, error = %error, "dropping malformed frame");
                }
            },
            Ok(Message::Binary(_)) => {
                counter!(RELAY_MALFORMED_FRAMES_TOTAL).increment(1);
                warn!(conn_id = %connection.id, "dropping binary frame");
            }
            Ok(Message::Ping(payload)) => {
                if outbound.send(Outbound::Pong(payload)).await.is_err() {
                    return None;
                }
            }
            Ok(Message::Pong(_)) => {}
            Ok(Message::Close(frame)) => return frame,
            Err(error) => {
                warn!(conn_id = %connection.id, error = %error, "receive failed");
                return None;
            }
        }
    }
    None
}

/// Persist the message, then fan it out to every other live connection in
/// the session.
///
/// An append failure is logged and delivery proceeds — a storage outage
/// must not block live traffic. A per-target queue failure is logged and
/// the remaining targets still get the message.
async fn persist_and_broadcast(
    state: &AppState,
    connection: &Arc<RelayConnection>,
    partner: &ParticipantId,
    content: String,
) {
    counter!(RELAY_MESSAGES_TOTAL).increment(1);

    let record = NewMessage::now(
        connection.participant_id().clone(),
        partner.clone(),
        content.clone(),
        connection.session_id().clone(),
    );
    if let Err(error) = state.store.append(record).await {
        counter!(STORE_APPEND_FAILURES_TOTAL).increment(1);
        warn!(
            session_id = %connection.session_id(),
            error = %error,
            "append failed, broadcasting anyway"
        );
    }

    let payload = Utf8Bytes::from(content);
    let targets = state
        .registry
        .broadcast_targets(connection.session_id(), &connection.id)
        .await;
    let mut delivered = 0usize;
    for target in &targets {
        if target.send_text(payload.clone()) {
            delivered += 1;
        } else {
            counter!(RELAY_BROADCAST_FAILURES_TOTAL).increment(1);
            warn!(
                conn_id = %target.id,
                session_id = %connection.session_id(),
                "failed to queue broadcast (channel full or closed)"
            );
        }
    }
    debug!(
        session_id = %connection.session_id(),
        recipients = delivered,
        targets = targets.len(),
        "message relayed"
    );
}

/// Extract the `content` field from an inbound payload.
pub(crate) fn parse_content(payload: &str) -> Result<String, RelayError> {
    let value: serde_json::Value = serde_json::from_str(payload)
        .map_err(|e| RelayError::MalformedContent(format!("payload is not valid JSON: {e}")))?;
    match value.get("content").and_then(serde_json::Value::as_str) {
        Some(content) => Ok(content.to_owned()),
        None => Err(RelayError::MalformedContent(
            "payload has no string `content` field".into(),
        )),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
