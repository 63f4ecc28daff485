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

//! Newline-delimited JSON session transport
//!
//! Connects to a world bridge over TCP. Requests are correlated with replies by id; the
//! reader task forwards world events to the controller and resolves pending requests.

use super::{AgentSession, Navigator, SessionConnector, SessionHandle, SessionParams};
use crate::error::SessionError;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use hearth_common::{
    ActionFault, ActionReply, ActionRequest, ClientFrame, Goal, ServerFrame, WorldEvent,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio_util::codec::{Framed, LinesCodec};

const MAX_LINE_LENGTH: usize = 1024 * 1024;
const OUTBOUND_QUEUE: usize = 256;
const EVENT_QUEUE: usize = 1024;

type PendingReplies = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<ActionReply, ActionFault>>>>>;

/// Opens [`JsonLineSession`]s
#[derive(Debug, Clone)]
pub struct JsonLineConnector {
    request_timeout: Duration,
}

impl JsonLineConnector {
    pub fn new(request_timeout: Duration) -> Self {
        Self { request_timeout }
    }
}

impl Default for JsonLineConnector {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

#[async_trait]
impl SessionConnector for JsonLineConnector {
    async fn connect(&self, params: &SessionParams) -> Result<SessionHandle, SessionError> {
        tracing::info!(
            "Connecting to {}:{} as {}",
            params.host,
            params.port,
            params.identity
        );
        let stream = TcpStream::connect((params.host.as_str(), params.port))
            .await
            .map_err(|e| SessionError::Protocol(format!("Connection failed: {}", e)))?;

        let framed = Framed::new(stream, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));
        let (mut sink, mut lines) = framed.split();

        let hello = encode(&ClientFrame::Hello {
            identity: params.identity.clone(),
        })?;
        sink.send(hello)
            .await
            .map_err(|e| SessionError::Protocol(format!("Handshake failed: {}", e)))?;

        let (outbound_tx, mut outbound_rx) = mpsc::channel::<ClientFrame>(OUTBOUND_QUEUE);
        let (event_tx, event_rx) = mpsc::channel::<WorldEvent>(EVENT_QUEUE);
        let pending: PendingReplies = Arc::new(Mutex::new(HashMap::new()));

        // Writer: drains outbound frames until every session handle is dropped
        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                let line = match encode(&frame) {
                    Ok(line) => line,
                    Err(e) => {
                        tracing::error!("Dropping unencodable frame: {}", e);
                        continue;
                    }
                };
                if let Err(e) = sink.send(line).await {
                    tracing::warn!("Session write failed: {}", e);
                    break;
                }
            }
            tracing::debug!("Session writer stopped");
        });

        // Reader: stops on EOF, read error, or once the controller drops the event stream
        let reader_pending = pending.clone();
        tokio::spawn(async move {
            let reason = loop {
                let line = tokio::select! {
                    _ = event_tx.closed() => break "event stream dropped".to_string(),
                    line = lines.next() => line,
                };
                match line {
                    Some(Ok(line)) => {
                        if !dispatch_line(&line, &event_tx, &reader_pending).await {
                            break "event stream dropped".to_string();
                        }
                    }
                    Some(Err(e)) => break format!("read error: {}", e),
                    None => break "connection closed".to_string(),
                }
            };
            tracing::info!("Session reader stopped: {}", reason);

            // Dropping the senders fails every waiting request with Disconnected
            reader_pending.lock().await.clear();
            let _ = event_tx.send(WorldEvent::Disconnected { reason }).await;
        });

        let session = Arc::new(JsonLineSession {
            outbound: outbound_tx,
            pending,
            next_id: AtomicU64::new(1),
            request_timeout: self.request_timeout,
        });

        Ok(SessionHandle {
            session: session.clone(),
            navigator: session,
            events: event_rx,
        })
    }
}

/// Returns false once nobody is listening for events anymore
async fn dispatch_line(
    line: &str,
    events: &mpsc::Sender<WorldEvent>,
    pending: &PendingReplies,
) -> bool {
    let frame: ServerFrame = match serde_json::from_str(line) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!("Ignoring malformed frame: {}", e);
            return true;
        }
    };

    match frame {
        ServerFrame::Event { event } => {
            if let WorldEvent::EntityUpdate { entity } = &event {
                if !entity.is_valid() {
                    tracing::warn!("Dropping invalid entity record {}", entity.id);
                    return true;
                }
            }
            events.send(event).await.is_ok()
        }
        ServerFrame::Reply { id, outcome } => {
            match pending.lock().await.remove(&id) {
                Some(waiter) => {
                    let _ = waiter.send(outcome);
                }
                None => tracing::debug!("Reply for unknown or expired request {}", id),
            }
            true
        }
    }
}

fn encode(frame: &ClientFrame) -> Result<String, SessionError> {
    serde_json::to_string(frame).map_err(|e| SessionError::Protocol(e.to_string()))
}

/// Session over a newline-delimited JSON connection
pub struct JsonLineSession {
    outbound: mpsc::Sender<ClientFrame>,
    pending: PendingReplies,
    next_id: AtomicU64,
    request_timeout: Duration,
}

#[async_trait]
impl AgentSession for JsonLineSession {
    async fn perform(&self, action: ActionRequest) -> Result<ActionReply, SessionError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (reply_tx, reply_rx) = oneshot::channel();
        self.pending.lock().await.insert(id, reply_tx);

        if self
            .outbound
            .send(ClientFrame::Request { id, action })
            .await
            .is_err()
        {
            self.pending.lock().await.remove(&id);
            return Err(SessionError::Disconnected);
        }

        match tokio::time::timeout(self.request_timeout, reply_rx).await {
            Ok(Ok(outcome)) => outcome.map_err(SessionError::from),
            Ok(Err(_)) => Err(SessionError::Disconnected),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(SessionError::Busy)
            }
        }
    }
}

#[async_trait]
impl Navigator for JsonLineSession {
    async fn set_goal(&self, generation: u64, goal: Goal) -> Result<(), SessionError> {
        self.outbound
            .send(ClientFrame::Goal { generation, goal })
            .await
            .map_err(|_| SessionError::Disconnected)
    }
}
