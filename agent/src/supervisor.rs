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

//! Connection supervisor
//!
//! Owns the session lifecycle: connect, run a fresh [`Controller`] until the session
//! ends, wait out the reconnect delay, repeat. Relay commands that arrive while no
//! controller is running are answered [`CommandOutcome::Offline`].

use crate::controller::{CommandOutcome, Controller, ControllerSettings, RelayCommand};
use crate::error::SessionEnd;
use crate::session::{SessionConnector, SessionParams};
use crate::status::StatusSink;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Commands buffered between the supervisor and a running controller
const CONTROLLER_QUEUE: usize = 16;

pub struct ConnectionSupervisor {
    connector: Arc<dyn SessionConnector>,
    params: SessionParams,
    settings: ControllerSettings,
    status: Arc<dyn StatusSink>,
    reconnect_delay: Duration,
    commands: mpsc::Receiver<RelayCommand>,
    shutdown: CancellationToken,
}

impl ConnectionSupervisor {
    pub fn new(
        connector: Arc<dyn SessionConnector>,
        params: SessionParams,
        settings: ControllerSettings,
        status: Arc<dyn StatusSink>,
        reconnect_delay: Duration,
        commands: mpsc::Receiver<RelayCommand>,
    ) -> Self {
        Self {
            connector,
            params,
            settings,
            status,
            reconnect_delay,
            commands,
            shutdown: CancellationToken::new(),
        }
    }

    /// Token that stops [`run`](Self::run) after the current session is torn down
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Keep a session alive until shutdown is requested
    pub async fn run(mut self) {
        let mut attempt: u64 = 0;
        while !self.shutdown.is_cancelled() {
            attempt += 1;
            tracing::info!(
                "Connecting to {}:{} as {} (attempt {})",
                self.params.host,
                self.params.port,
                self.params.identity,
                attempt
            );
            let end = self.run_session().await;
            match &end {
                SessionEnd::Faulted(_) | SessionEnd::Error(_) => {
                    tracing::error!("Session ended: {}", end)
                }
                _ => tracing::warn!("Session ended: {}", end),
            }
            if self.shutdown.is_cancelled() {
                break;
            }
            tracing::info!("Reconnecting in {:?}", self.reconnect_delay);
            self.backoff().await;
        }
        tracing::info!("Connection supervisor stopped");
    }

    /// Connect once and run a controller until the session ends
    pub async fn run_session(&mut self) -> SessionEnd {
        let handle = match self.connector.connect(&self.params).await {
            Ok(handle) => handle,
            Err(err) => return SessionEnd::Error(format!("connect failed: {}", err)),
        };

        let controller = Controller::new(
            handle,
            self.settings.clone(),
            Arc::clone(&self.status),
            StdRng::from_os_rng(),
        );
        let id = controller.id();
        let (queue, queue_rx) = mpsc::channel(CONTROLLER_QUEUE);
        // Run in its own task so a panic ends the session instead of the supervisor
        let mut task = tokio::spawn(controller.run(queue_rx));

        loop {
            tokio::select! {
                joined = &mut task => {
                    return match joined {
                        Ok(end) => end,
                        Err(err) => {
                            tracing::error!("Controller {} panicked: {}", id, err);
                            SessionEnd::Faulted(err.to_string())
                        }
                    };
                }
                Some(command) = self.commands.recv() => {
                    if let Err(mpsc::error::SendError(command)) = queue.send(command).await {
                        command.respond(CommandOutcome::Offline);
                    }
                }
                _ = self.shutdown.cancelled() => {
                    task.abort();
                    let _ = task.await;
                    return SessionEnd::Disconnected("supervisor shut down".to_string());
                }
            }
        }
    }

    /// Sleep the reconnect delay, answering relay commands as offline meanwhile
    async fn backoff(&mut self) {
        let delay = tokio::time::sleep(self.reconnect_delay);
        tokio::pin!(delay);
        loop {
            tokio::select! {
                _ = &mut delay => return,
                _ = self.shutdown.cancelled() => return,
                Some(command) = self.commands.recv() => {
                    tracing::debug!("Session offline, refusing command from {}", command.message.sender_identity);
                    command.respond(CommandOutcome::Offline);
                }
            }
        }
    }
}
