//! GET /monitor - WebSocket с лентой команд к хранилищу.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Router,
};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/monitor", get(monitor))
}

async fn monitor(State(state): State<Arc<AppState>>, ws: WebSocketUpgrade) -> Response {
    // Подписываемся до апгрейда, чтобы не потерять команды между ними
    let feed = state.monitor.subscribe();
    ws.on_upgrade(move |socket| stream_commands(socket, feed))
}

async fn stream_commands(mut socket: WebSocket, mut feed: broadcast::Receiver<String>) {
    info!("Monitor client connected");

    loop {
        tokio::select! {
            command = feed.recv() => match command {
                Ok(line) => {
                    if socket.send(Message::Text(line.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Monitor client lagged, skipped {} commands", skipped);
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("Monitor socket error: {}", e);
                    break;
                }
            },
        }
    }

    info!("Monitor client disconnected");
}
