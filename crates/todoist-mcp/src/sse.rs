//! HTTP/SSE transport.
//!
//! `GET /sse` opens a session and streams its responses; the first event is
//! `endpoint`, carrying the URL to POST messages to. `POST
//! /messages?session_id=<id>` accepts one JSON-RPC message and answers `202`;
//! the JSON-RPC response arrives later as a `message` event on the stream.

use std::collections::HashMap;
use std::convert::Infallible;
use std::io;
use std::sync::{Arc, PoisonError, RwLock};

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::Router;
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::handlers::ToolHandler;
use crate::protocol::JsonRpcResponse;
use crate::server::McpServer;

/// Pending responses buffered per session.
const RESPONSE_BUFFER: usize = 64;

#[derive(Clone)]
struct Session {
    server: Arc<McpServer>,
    sender: mpsc::Sender<JsonRpcResponse>,
}

type Sessions = Arc<RwLock<HashMap<Uuid, Session>>>;

#[derive(Clone)]
struct SseState {
    handler: Arc<ToolHandler>,
    sessions: Sessions,
}

impl SseState {
    fn insert(&self, id: Uuid, session: Session) {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, session);
    }

    fn get(&self, id: &Uuid) -> Option<Session> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }
}

/// Removes its session from the registry when the event stream is dropped.
struct SessionGuard {
    id: Uuid,
    sessions: Sessions,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
        info!(session_id = %self.id, "SSE session closed");
    }
}

#[derive(Debug, Deserialize)]
struct MessageQuery {
    session_id: Uuid,
}

/// Build the SSE router.
pub fn router(handler: Arc<ToolHandler>) -> Router {
    let state = SseState {
        handler,
        sessions: Arc::new(RwLock::new(HashMap::new())),
    };

    Router::new()
        .route("/sse", get(open_stream))
        .route("/messages", post(post_message))
        .with_state(state)
}

/// Bind `host:port` and serve until the process stops.
pub async fn serve(handler: Arc<ToolHandler>, host: &str, port: u16) -> io::Result<()> {
    let listener = TcpListener::bind((host, port)).await?;
    serve_listener(listener, handler).await
}

/// Serve on an already bound listener.
pub async fn serve_listener(listener: TcpListener, handler: Arc<ToolHandler>) -> io::Result<()> {
    info!(address = %listener.local_addr()?, "Serving MCP over SSE");
    axum::serve(listener, router(handler)).await
}

async fn open_stream(
    State(state): State<SseState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let session_id = Uuid::new_v4();
    let (sender, receiver) = mpsc::channel(RESPONSE_BUFFER);

    state.insert(
        session_id,
        Session {
            server: Arc::new(McpServer::new(state.handler.clone())),
            sender,
        },
    );
    info!(session_id = %session_id, "SSE session opened");

    let guard = SessionGuard {
        id: session_id,
        sessions: state.sessions.clone(),
    };

    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("/messages?session_id={}", session_id));

    let messages = stream::unfold((receiver, guard), |(mut receiver, guard)| async move {
        loop {
            let response: JsonRpcResponse = receiver.recv().await?;
            match serde_json::to_string(&response) {
                Ok(json) => {
                    let event = Event::default().event("message").data(json);
                    return Some((Ok(event), (receiver, guard)));
                }
                Err(e) => warn!(session_id = %guard.id, "Failed to serialize response: {}", e),
            }
        }
    });

    Sse::new(stream::once(async move { Ok::<_, Infallible>(endpoint) }).chain(messages))
        .keep_alive(KeepAlive::default())
}

async fn post_message(
    State(state): State<SseState>,
    Query(query): Query<MessageQuery>,
    body: String,
) -> StatusCode {
    let Some(session) = state.get(&query.session_id) else {
        warn!(session_id = %query.session_id, "Message for unknown session");
        return StatusCode::NOT_FOUND;
    };

    debug!(session_id = %query.session_id, "Received: {}", body);

    tokio::spawn(async move {
        if let Some(response) = session.server.handle_line(&body).await {
            if session.sender.send(response).await.is_err() {
                debug!("Session closed before the response was sent");
            }
        }
    });

    StatusCode::ACCEPTED
}

#[cfg(test)]
mod tests {
    use super::*;
    use todoist_api::TodoistClient;
    use todoist_core::Credential;

    fn state() -> SseState {
        let credential = Credential::new("test-token").unwrap();
        let client = TodoistClient::with_base_url("http://127.0.0.1:1", &credential).unwrap();
        SseState {
            handler: Arc::new(ToolHandler::new(Arc::new(client))),
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    #[tokio::test]
    async fn test_guard_removes_session() {
        let state = state();
        let id = Uuid::new_v4();
        let (sender, _receiver) = mpsc::channel(1);
        state.insert(
            id,
            Session {
                server: Arc::new(McpServer::new(state.handler.clone())),
                sender,
            },
        );
        assert!(state.get(&id).is_some());

        drop(SessionGuard {
            id,
            sessions: state.sessions.clone(),
        });
        assert!(state.get(&id).is_none());
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let status = post_message(
            State(state()),
            Query(MessageQuery {
                session_id: Uuid::new_v4(),
            }),
            r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#.to_string(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_message_answered_on_session_channel() {
        let state = state();
        let id = Uuid::new_v4();
        let (sender, mut receiver) = mpsc::channel(1);
        state.insert(
            id,
            Session {
                server: Arc::new(McpServer::new(state.handler.clone())),
                sender,
            },
        );

        let status = post_message(
            State(state.clone()),
            Query(MessageQuery { session_id: id }),
            r#"{"jsonrpc":"2.0","id":"p","method":"ping"}"#.to_string(),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);

        let response = receiver.recv().await.unwrap();
        assert_eq!(
            response.id,
            crate::protocol::RequestId::String("p".to_string())
        );
        assert!(response.result.is_some());
    }
}
