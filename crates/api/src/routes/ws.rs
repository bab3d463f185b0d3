//! Realtime transport.
//!
//! `GET /ws` upgrades to a WebSocket speaking `{"event", "data"}` frames.
//! A connection may join several sessions; for each it runs a forwarder task
//! that relays the session topic into the connection's outbound queue,
//! shaped for the role it joined with. Replies meant for this connection only
//! (mastery updates, errors, requested engagement) go straight to the queue.

use std::collections::HashMap;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use classroom_core::{ClientMessage, Error, ErrorFrame, JoinSession, Role, ServerEvent};
use session_engine::{EventReceiver, SessionController};
use telemetry::metrics;

use crate::state::AppState;

/// Outbound frames buffered per connection.
const OUTBOUND_CAPACITY: usize = 256;

/// GET /ws - WebSocket upgrade.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state.controller))
}

struct Membership {
    role: Role,
    user_id: String,
    forwarder: JoinHandle<()>,
}

/// Per-connection state.
struct Connection {
    id: Uuid,
    controller: SessionController,
    outbound: mpsc::Sender<String>,
    sessions: HashMap<String, Membership>,
}

impl Connection {
    /// Queues a reply for this connection. Never waits: the queue is
    /// drained by the same loop that is handling the current frame.
    fn send(&self, event: &ServerEvent) {
        let frame = match event.to_json() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(connection_id = %self.id, error = %e, "Failed to encode frame");
                return;
            }
        };
        if let Err(e) = self.outbound.try_send(frame) {
            warn!(
                connection_id = %self.id,
                event = event.event_name(),
                error = %e,
                "Reply dropped"
            );
        }
    }

    fn send_error(&self, err: &Error) {
        self.send(&ServerEvent::Error(ErrorFrame::from(err)));
    }

    async fn handle_text(&mut self, text: &str) {
        let message = match ClientMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                metrics().invalid_frames.inc();
                debug!(connection_id = %self.id, error = %e, "Rejected frame");
                self.send_error(&e);
                return;
            }
        };

        debug!(
            connection_id = %self.id,
            event = message.event_name(),
            session_id = message.session_id(),
            "Frame received"
        );

        match message {
            ClientMessage::Join(join) => self.join(join).await,
            ClientMessage::Leave(leave) => {
                self.unsubscribe(&leave.session_id);
                self.controller.leave(&leave.session_id, &leave.user_id).await;
            }
            ClientMessage::PushQuestion(push) => {
                if !self.is_teacher_of(&push.session_id) {
                    warn!(
                        connection_id = %self.id,
                        session_id = %push.session_id,
                        "Push from a connection that is not the session's teacher"
                    );
                    self.send_error(&Error::forbidden(
                        "only the session's teacher may push questions",
                    ));
                    return;
                }
                if let Err(e) = self.controller.push_question(&push).await {
                    self.send_error(&e);
                }
            }
            ClientMessage::Answer(answer) => match self.controller.submit_answer(&answer).await {
                Ok(Some(update)) => self.send(&ServerEvent::MasteryUpdate(update)),
                Ok(None) => {}
                Err(e) => self.send_error(&e),
            },
            ClientMessage::RequestEngagement(request) => {
                if let Some(state) = self.controller.engagement(&request.session_id).await {
                    self.send(&ServerEvent::EngagementUpdate(state));
                }
            }
        }
    }

    async fn join(&mut self, join: JoinSession) {
        // Subscribe before joining so this connection sees the join's own
        // engagement broadcast. A join that found no session drops the
        // receiver and its topic.
        self.unsubscribe(&join.session_id);
        let events = self.controller.subscribe(&join.session_id);

        if !self.controller.join(&join).await {
            drop(events);
            self.controller.release_topic(&join.session_id);
            return;
        }

        let forwarder = tokio::spawn(forward(
            self.id,
            events,
            self.outbound.clone(),
            join.role,
            self.controller.config().reveal_answer_to_students,
        ));
        self.sessions.insert(
            join.session_id.clone(),
            Membership {
                role: join.role,
                user_id: join.user_id.clone(),
                forwarder,
            },
        );
    }

    fn unsubscribe(&mut self, session_id: &str) {
        if let Some(membership) = self.sessions.remove(session_id) {
            membership.forwarder.abort();
        }
    }

    fn is_teacher_of(&self, session_id: &str) -> bool {
        self.sessions
            .get(session_id)
            .is_some_and(|m| m.role == Role::Teacher)
    }

    fn close(&mut self) {
        for (session_id, membership) in self.sessions.drain() {
            membership.forwarder.abort();
            debug!(
                connection_id = %self.id,
                %session_id,
                user_id = %membership.user_id,
                "Stopped forwarding"
            );
        }
    }
}

/// Relays one session topic into a connection's outbound queue.
async fn forward(
    connection_id: Uuid,
    mut events: EventReceiver,
    outbound: mpsc::Sender<String>,
    role: Role,
    reveal_answer: bool,
) {
    loop {
        match events.recv().await {
            Ok(event) => {
                let frame = match event.for_role(role, reveal_answer).to_json() {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!(%connection_id, error = %e, "Failed to encode broadcast");
                        continue;
                    }
                };
                if outbound.send(frame).await.is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(%connection_id, skipped = n, "Connection lagged behind session topic");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn handle_socket(socket: WebSocket, controller: SessionController) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound, mut outbound_rx) = mpsc::channel::<String>(OUTBOUND_CAPACITY);

    let mut connection = Connection {
        id: Uuid::new_v4(),
        controller,
        outbound,
        sessions: HashMap::new(),
    };

    metrics().active_connections.inc();
    info!(connection_id = %connection.id, "Client connected");

    loop {
        tokio::select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => connection.handle_text(&text).await,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!(connection_id = %connection.id, error = %e, "Socket error");
                        break;
                    }
                    _ => {}
                }
            }

            frame = outbound_rx.recv() => {
                let Some(frame) = frame else { break };
                if let Err(e) = sender.send(Message::Text(frame)).await {
                    debug!(connection_id = %connection.id, error = %e, "Send failed");
                    break;
                }
            }
        }
    }

    connection.close();
    metrics().active_connections.dec();
    info!(connection_id = %connection.id, "Client disconnected");
}
