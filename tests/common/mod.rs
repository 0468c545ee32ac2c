//! In-process notification server for integration tests.
//!
//! Serves the REST routes and the `/ws/notifications` push channel on a
//! random local port and records every mutation request it receives.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use adoption_notification_feed::config::{ApiConfig, AppConfig, Settings};

#[derive(Debug, Clone)]
pub enum PushFrame {
    Text(String),
    Close,
}

#[derive(Clone)]
struct ServerState {
    token: String,
    initial: Arc<Mutex<Vec<Value>>>,
    requests: Arc<Mutex<Vec<String>>>,
    pushes: broadcast::Sender<PushFrame>,
}

pub struct FakeServer {
    pub addr: SocketAddr,
    state: ServerState,
}

impl FakeServer {
    /// Start a server that accepts `token` and lists `initial` on fetch
    pub async fn spawn(token: &str, initial: Vec<Value>) -> Self {
        let (pushes, _) = broadcast::channel(64);
        let state = ServerState {
            token: token.to_string(),
            initial: Arc::new(Mutex::new(initial)),
            requests: Arc::new(Mutex::new(Vec::new())),
            pushes,
        };

        let app = Router::new()
            .route("/notifications", get(list).delete(clear_all))
            .route("/notifications/read-all", patch(mark_all_read))
            .route("/notifications/{id}/read", patch(mark_read))
            .route("/ws/notifications", get(ws_handler))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Settings pointing the client at this server through `api.base_url`
    pub fn settings(&self) -> Settings {
        Settings {
            api: ApiConfig {
                base_url: Some(self.base_url()),
                request_timeout_secs: 5,
            },
            ..Default::default()
        }
    }

    /// Settings that only know the page origin
    pub fn page_only_settings(&self) -> Settings {
        Settings {
            app: AppConfig {
                page_url: Some(self.base_url()),
            },
            ..Default::default()
        }
    }

    pub fn push(&self, payload: impl Into<String>) {
        self.state
            .pushes
            .send(PushFrame::Text(payload.into()))
            .expect("no push channel subscribed");
    }

    pub fn close_channels(&self) {
        let _ = self.state.pushes.send(PushFrame::Close);
    }

    pub fn requests(&self) -> Vec<String> {
        self.state.requests.lock().unwrap().clone()
    }
}

fn authorized(state: &ServerState, headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t == state.token)
        .unwrap_or(false)
}

fn record(state: &ServerState, line: String) {
    state.requests.lock().unwrap().push(line);
}

async fn list(State(state): State<ServerState>, headers: HeaderMap) -> Response {
    if !authorized(&state, &headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    record(&state, "GET /notifications".to_string());
    let body = state.initial.lock().unwrap().clone();
    Json(body).into_response()
}

async fn mark_read(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> StatusCode {
    if !authorized(&state, &headers) {
        return StatusCode::UNAUTHORIZED;
    }
    record(&state, format!("PATCH /notifications/{}/read", id));
    StatusCode::NO_CONTENT
}

async fn mark_all_read(State(state): State<ServerState>, headers: HeaderMap) -> StatusCode {
    if !authorized(&state, &headers) {
        return StatusCode::UNAUTHORIZED;
    }
    record(&state, "PATCH /notifications/read-all".to_string());
    StatusCode::NO_CONTENT
}

async fn clear_all(State(state): State<ServerState>, headers: HeaderMap) -> StatusCode {
    if !authorized(&state, &headers) {
        return StatusCode::UNAUTHORIZED;
    }
    record(&state, "DELETE /notifications".to_string());
    StatusCode::NO_CONTENT
}

#[derive(Debug, Deserialize)]
struct WsQuery {
    token: Option<String>,
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<ServerState>,
    Query(query): Query<WsQuery>,
) -> Response {
    if query.token.as_deref() != Some(state.token.as_str()) {
        return (StatusCode::UNAUTHORIZED, "Invalid token").into_response();
    }

    // Subscribe before the upgrade completes so no push is missed
    let pushes = state.pushes.subscribe();
    ws.on_upgrade(move |socket| handle_socket(socket, pushes))
}

async fn handle_socket(mut socket: WebSocket, mut pushes: broadcast::Receiver<PushFrame>) {
    if socket
        .send(Message::Text(r#"{"type":"connected"}"#.into()))
        .await
        .is_err()
    {
        return;
    }

    loop {
        tokio::select! {
            frame = pushes.recv() => match frame {
                Ok(PushFrame::Text(text)) => {
                    if socket.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Ok(PushFrame::Close) | Err(_) => {
                    let _ = socket.send(Message::Close(None)).await;
                    break;
                }
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
        }
    }
}
