//
// Copyright 2025-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! HTTP relay: liveness, the operator command channel and the status snapshot

use crate::controller::{CommandOutcome, RelayCommand};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use hearth_common::{CommandMessage, StatusSnapshot};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct RelayState {
    commands: mpsc::Sender<RelayCommand>,
    status: watch::Receiver<Option<StatusSnapshot>>,
}

impl RelayState {
    pub fn new(
        commands: mpsc::Sender<RelayCommand>,
        status: watch::Receiver<Option<StatusSnapshot>>,
    ) -> Self {
        Self { commands, status }
    }
}

pub fn router(state: RelayState) -> Router {
    Router::new()
        .route("/", get(liveness))
        .route("/command", post(command))
        .route("/status", get(status))
        .with_state(state)
}

/// Serve the relay until `shutdown` fires
pub async fn serve(
    listener: TcpListener,
    state: RelayState,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

async fn liveness() -> &'static str {
    "Agent running"
}

async fn command(State(state): State<RelayState>, Json(message): Json<CommandMessage>) -> Response {
    let (command, reply) = RelayCommand::new(message);
    if state.commands.send(command).await.is_err() {
        return offline();
    }
    match reply.await {
        Ok(CommandOutcome::Replied(text)) => (StatusCode::OK, text).into_response(),
        Ok(CommandOutcome::Ignored) => StatusCode::NO_CONTENT.into_response(),
        // Dropped replies mean the session went away mid-command
        Ok(CommandOutcome::Offline) | Err(_) => offline(),
    }
}

fn offline() -> Response {
    (StatusCode::SERVICE_UNAVAILABLE, "Agent offline").into_response()
}

async fn status(State(state): State<RelayState>) -> Result<Json<StatusSnapshot>, StatusCode> {
    let snapshot = state.status.borrow().clone();
    snapshot.map(Json).ok_or(StatusCode::NOT_FOUND)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{StatusSink, WatchStatusSink};
    use chrono::Utc;
    use hearth_common::Vec3;
    use std::net::SocketAddr;

    async fn relay() -> (SocketAddr, mpsc::Receiver<RelayCommand>, WatchStatusSink) {
        let (commands, command_rx) = mpsc::channel(4);
        let sink = WatchStatusSink::new();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = RelayState::new(commands, sink.subscribe());
        tokio::spawn(serve(listener, state, CancellationToken::new()));
        (addr, command_rx, sink)
    }

    #[tokio::test]
    async fn test_liveness() {
        let (addr, _commands, _sink) = relay().await;
        let response = reqwest::get(format!("http://{}/", addr)).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(response.text().await.unwrap(), "Agent running");
    }

    #[tokio::test]
    async fn test_status_not_found_until_published() {
        let (addr, _commands, sink) = relay().await;
        let url = format!("http://{}/status", addr);
        let response = reqwest::get(&url).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);

        sink.publish(StatusSnapshot {
            mode: "Wander".to_string(),
            position: Vec3::new(1.0, 2.0, 3.0),
            biome: None,
            time_of_day: None,
            travel: None,
            captured_at: Utc::now(),
        })
        .await;
        let snapshot: StatusSnapshot = reqwest::get(&url).await.unwrap().json().await.unwrap();
        assert_eq!(snapshot.mode, "Wander");
        assert_eq!(snapshot.position, Vec3::new(1.0, 2.0, 3.0));
    }

    #[tokio::test]
    async fn test_command_forwarded_and_answered() {
        let (addr, mut commands, _sink) = relay().await;
        tokio::spawn(async move {
            while let Some(command) = commands.recv().await {
                let outcome = match command.message.text.as_str() {
                    "stay" => CommandOutcome::Replied("Mode Stay".to_string()),
                    _ => CommandOutcome::Ignored,
                };
                command.respond(outcome);
            }
        });

        let client = reqwest::Client::new();
        let url = format!("http://{}/command", addr);
        let response = client
            .post(&url)
            .json(&CommandMessage::new("alex#0001", "9001", "stay"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(response.text().await.unwrap(), "Mode Stay");

        let response = client
            .post(&url)
            .json(&CommandMessage::new("alex#0001", "9001", "dance"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_command_unavailable_without_controller() {
        let (addr, commands, _sink) = relay().await;
        drop(commands);
        let response = reqwest::Client::new()
            .post(format!("http://{}/command", addr))
            .json(&CommandMessage::new("a", "b", "stay"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);
    }
}
