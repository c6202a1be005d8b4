//! HTTP surface of the dev server
//!
//! Two routes: `GET /` serves a human-readable status string, `GET /dev`
//! upgrades to the WebSocket clients attach to. Each accepted socket gets a
//! task that shuttles frames between the connection and the session loop;
//! connection errors end that task without touching the loop.

use crate::config::{DevServerConfig, ServerMode};
use crate::protocol::Payload;
use crate::session::{DevSession, Event};
use crate::watcher::SourceWatcher;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use pynative_core::error::{Error, ErrorCode, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Status string served on `/`
pub const INDEX_PAGE: &str =
    "pynative dev server. When you change a source file it pushes to the app.";

#[derive(Clone)]
struct AppState {
    events: mpsc::Sender<Event>,
    next_id: Arc<AtomicUsize>,
}

/// Run the dev server until the process is stopped.
///
/// Watcher setup happens before the listener binds, so a bad watch path
/// fails startup instead of leaving a half-initialized server.
pub async fn serve(config: DevServerConfig) -> Result<()> {
    let (session, events_tx, events_rx) = DevSession::new(&config);

    let _watcher = match config.mode {
        ServerMode::Normal => Some(SourceWatcher::start(&config.source_root, events_tx.clone())?),
        ServerMode::Forwarding => None,
    };

    tokio::spawn(session.run(events_rx));

    if config.adb_reverse {
        let events = events_tx.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(std::time::Duration::from_secs(1));
            loop {
                tick.tick().await;
                if events.send(Event::ReconnectTick).await.is_err() {
                    break;
                }
            }
        });
    }

    let state = AppState {
        events: events_tx,
        next_id: Arc::new(AtomicUsize::new(0)),
    };
    let app = Router::new()
        .route("/", get(index))
        .route("/dev", get(upgrade))
        .with_state(state);

    let addr = ("0.0.0.0", config.port);
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        Error::new(
            ErrorCode::BindError,
            format!("Failed to bind port {}: {}", config.port, e),
        )
    })?;
    tracing::info!("dev server started on port {}", config.port);

    axum::serve(listener, app)
        .await
        .map_err(|e| Error::server(format!("Server error: {}", e)))
}

async fn index() -> impl IntoResponse {
    INDEX_PAGE
}

async fn upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let id = state.next_id.fetch_add(1, Ordering::SeqCst);
    let (tx, mut rx) = mpsc::unbounded_channel::<Payload>();
    if state
        .events
        .send(Event::Connected { id, tx })
        .await
        .is_err()
    {
        return;
    }

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                let payload = match incoming {
                    Some(Ok(Message::Text(text))) => Payload::Text(text.as_str().to_owned()),
                    Some(Ok(Message::Binary(bytes))) => Payload::Binary(bytes.to_vec()),
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => continue, // ping/pong answered by axum
                };
                if state.events.send(Event::Incoming { id, payload }).await.is_err() {
                    break;
                }
            }
            outgoing = rx.recv() => {
                let Some(payload) = outgoing else { break };
                let message = match payload {
                    Payload::Text(text) => Message::Text(text.into()),
                    Payload::Binary(bytes) => Message::Binary(bytes.into()),
                };
                if socket.send(message).await.is_err() {
                    break;
                }
            }
        }
    }

    let _ = state.events.send(Event::Disconnected { id }).await;
}
