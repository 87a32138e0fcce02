//! WebSocket endpoint for streaming sessions.
//!
//! One socket drives at most one session at a time. Client messages are
//! applied in order; session events are forwarded as they arrive.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use std::sync::Arc;
use swing_core::{PoseFrame, SessionId};
use swing_stream::{SessionEvent, StartSession};
use tokio::sync::mpsc;

use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut session = SocketSession::new(state);

    'socket: loop {
        tokio::select! {
            event = session.next_event() => {
                let Some(event) = event else { continue };
                // Already echoed as `session_started`
                if matches!(event, SessionEvent::Started { .. }) {
                    continue;
                }
                if send(&mut sender, &ServerMessage::Event(event)).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => {
                let text = match incoming {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => continue,
                };
                let replies = match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(message) => session.handle(message).await,
                    Err(e) => vec![ServerMessage::error("bad_request", e.to_string())],
                };
                for reply in &replies {
                    if send(&mut sender, reply).await.is_err() {
                        break 'socket;
                    }
                }
            }
        }
    }

    session.shutdown().await;
}

async fn send(
    sender: &mut SplitSink<WebSocket, Message>,
    message: &ServerMessage,
) -> Result<(), axum::Error> {
    match serde_json::to_string(message) {
        Ok(text) => sender.send(Message::Text(text)).await,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to encode server message");
            Ok(())
        }
    }
}

struct LiveSession {
    id: SessionId,
    events: mpsc::Receiver<SessionEvent>,
}

/// Per-socket protocol state, independent of the transport
pub struct SocketSession {
    state: Arc<AppState>,
    live: Option<LiveSession>,
}

impl SocketSession {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state, live: None }
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.live.as_ref().map(|live| live.id)
    }

    /// Apply one client message, returning the direct replies
    pub async fn handle(&mut self, message: ClientMessage) -> Vec<ServerMessage> {
        match message {
            ClientMessage::Start {
                user_id,
                club,
                handedness,
                overrides,
            } => {
                if let Some(id) = self.session_id() {
                    return vec![ServerMessage::error(
                        "session_active",
                        format!("session {id} is still running"),
                    )];
                }
                let request = StartSession {
                    user_id,
                    club_name: club,
                    handedness,
                    overrides,
                };
                match self.state.sessions.start_session(request).await {
                    Ok(started) => {
                        self.live = Some(LiveSession {
                            id: started.session_id,
                            events: started.events,
                        });
                        vec![ServerMessage::SessionStarted {
                            session_id: started.session_id,
                            club: started.club,
                            config: started.config,
                        }]
                    }
                    Err(e) => vec![ServerMessage::from(&e)],
                }
            }
            ClientMessage::Frame { frame } => self.push(vec![frame]).await,
            ClientMessage::Frames { frames } => self.push(frames).await,
            ClientMessage::End => {
                let Some(id) = self.session_id() else {
                    return vec![no_session()];
                };
                // The close record arrives as an event
                match self.state.sessions.end_session(id).await {
                    Ok(_) => Vec::new(),
                    Err(e) => vec![ServerMessage::from(&e)],
                }
            }
            ClientMessage::Cancel => {
                let Some(id) = self.session_id() else {
                    return vec![no_session()];
                };
                match self.state.sessions.cancel_session(id).await {
                    Ok(_) => Vec::new(),
                    Err(e) => vec![ServerMessage::from(&e)],
                }
            }
            ClientMessage::Stats => {
                let Some(id) = self.session_id() else {
                    return vec![no_session()];
                };
                match self.state.sessions.session_stats(id).await {
                    Ok(stats) => vec![ServerMessage::Stats { stats }],
                    Err(e) => vec![ServerMessage::from(&e)],
                }
            }
        }
    }

    async fn push(&mut self, frames: Vec<PoseFrame>) -> Vec<ServerMessage> {
        let Some(id) = self.session_id() else {
            return vec![no_session()];
        };
        for frame in frames {
            // Rejections are reported through session events
            if let Err(e) = self.state.sessions.push_frame(id, frame).await {
                return vec![ServerMessage::from(&e)];
            }
        }
        Vec::new()
    }

    /// Next event of the live session; pending while none is live
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        let Some(live) = self.live.as_mut() else {
            return std::future::pending().await;
        };
        let event = live.events.recv().await;
        match &event {
            Some(event) if event.is_terminal() => self.live = None,
            None => self.live = None,
            _ => {}
        }
        event
    }

    /// Cancel a session left running by a disconnected client
    pub async fn shutdown(&mut self) {
        if let Some(live) = self.live.take() {
            tracing::info!(session = %live.id, "Client disconnected; cancelling session");
            if let Err(e) = self.state.sessions.cancel_session(live.id).await {
                tracing::debug!(session = %live.id, error = %e, "Cancel after disconnect failed");
            }
        }
    }
}

fn no_session() -> ServerMessage {
    ServerMessage::error("no_session", "no session started on this connection")
}
