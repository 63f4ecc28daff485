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

//! Behavior controller
//!
//! One [`Controller`] drives one session. It applies world events to the agent state,
//! runs the behavior loops once the agent has spawned, and handles operator commands.
//! Nothing survives the controller: a reconnect builds a new one from scratch.

pub mod arbiter;
pub mod combat;
pub mod command;
mod context;
mod idle;
pub mod items;
pub mod schedule;
pub mod social;
pub mod state;
pub mod survival;

#[cfg(test)]
mod test_utils;

pub use self::command::CommandOutcome;
pub use self::context::{AgentContext, ControllerSettings};
pub use self::state::{AgentState, Mode};

use self::schedule::JitteredInterval;
use crate::error::SessionEnd;
use crate::session::SessionHandle;
use crate::status::StatusSink;
use hearth_common::{CommandMessage, PathStatus, WorldEvent};
use rand::rngs::StdRng;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use uuid::Uuid;

/// World events handled back to back before a waiting relay command gets a turn
const EVENT_BATCH: usize = 32;

/// An operator message from the relay, answered through `reply`
#[derive(Debug)]
pub struct RelayCommand {
    pub message: CommandMessage,
    pub reply: oneshot::Sender<CommandOutcome>,
}

impl RelayCommand {
    pub fn new(message: CommandMessage) -> (Self, oneshot::Receiver<CommandOutcome>) {
        let (reply, receiver) = oneshot::channel();
        (Self { message, reply }, receiver)
    }

    pub fn respond(self, outcome: CommandOutcome) {
        // The relay may have given up waiting
        let _ = self.reply.send(outcome);
    }
}

pub struct Controller {
    ctx: Arc<AgentContext>,
    events: mpsc::Receiver<WorldEvent>,
    loops: JoinSet<()>,
}

impl Controller {
    pub fn new(
        handle: SessionHandle,
        settings: ControllerSettings,
        status: Arc<dyn StatusSink>,
        rng: StdRng,
    ) -> Self {
        let ctx = AgentContext::new(handle.session, handle.navigator, settings, status, rng);
        Self {
            ctx: Arc::new(ctx),
            events: handle.events,
            loops: JoinSet::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.ctx.id()
    }

    /// Drive the session until it ends. Every loop and task is stopped before returning.
    pub async fn run(mut self, mut commands: mpsc::Receiver<RelayCommand>) -> SessionEnd {
        let id = self.ctx.id();
        tracing::info!("Controller {} started", id);

        let mut events_in_row = 0;
        let end = loop {
            // A steady event stream must not starve operator commands
            if events_in_row >= EVENT_BATCH {
                events_in_row = 0;
                if let Ok(command) = commands.try_recv() {
                    self.answer(command).await;
                    continue;
                }
            }

            // World events first, so commands see the latest state
            tokio::select! {
                biased;
                event = self.events.recv() => match event {
                    Some(event) => {
                        events_in_row += 1;
                        if let Some(end) = self.handle_event(event).await {
                            break end;
                        }
                    }
                    None => break SessionEnd::Disconnected("event stream closed".to_string()),
                },
                Some(command) = commands.recv() => {
                    events_in_row = 0;
                    self.answer(command).await;
                }
                Some(joined) = self.loops.join_next() => {
                    if let Err(err) = joined {
                        if err.is_panic() {
                            tracing::error!("Controller {} loop panicked: {}", id, err);
                            break SessionEnd::Faulted(err.to_string());
                        }
                    }
                }
            }
        };

        tracing::info!("Controller {} stopping: {}", id, end);
        self.ctx.shutdown().await;
        while let Some(joined) = self.loops.join_next().await {
            if let Err(err) = joined {
                if err.is_panic() {
                    tracing::error!("Controller {} loop panicked: {}", id, err);
                }
            }
        }
        tracing::info!("Controller {} stopped", id);
        end
    }

    async fn answer(&self, command: RelayCommand) {
        let outcome = self.relay_command(&command.message).await;
        command.respond(outcome);
    }

    async fn handle_event(&mut self, event: WorldEvent) -> Option<SessionEnd> {
        match &event {
            WorldEvent::Kicked { reason } => {
                tracing::warn!("Kicked from session: {}", reason);
                return Some(SessionEnd::Kicked(reason.clone()));
            }
            WorldEvent::Error { message } => {
                tracing::error!("Session error: {}", message);
                return Some(SessionEnd::Error(message.clone()));
            }
            WorldEvent::Disconnected { reason } => {
                tracing::info!("Session disconnected: {}", reason);
                return Some(SessionEnd::Disconnected(reason.clone()));
            }
            _ => {}
        }

        let spawned = self
            .ctx
            .with_state(|state| {
                let was_spawned = state.world.spawned;
                state.world.apply(&event);
                let spawned = !was_spawned && state.world.spawned;
                if spawned {
                    arbiter::check_mode(state);
                }
                spawned
            })
            .await;
        if spawned {
            tracing::info!("Controller {} spawned, starting behavior loops", self.ctx.id());
            self.start_loops();
        }

        match event {
            WorldEvent::Chat { sender, message } => self.chat_command(&sender, &message).await,
            WorldEvent::Path {
                generation,
                status: status @ (PathStatus::NoPath | PathStatus::Timeout),
            } => {
                tracing::debug!("Navigator reported {:?} for goal {}", status, generation);
                let result = self
                    .ctx
                    .with_state(|state| arbiter::on_planning_failed(state, generation))
                    .await;
                if let Err(err) = result {
                    tracing::warn!("Point travel abandoned: {}", err);
                }
            }
            _ => {}
        }
        None
    }

    async fn chat_command(&self, sender: &str, message: &str) {
        if !command::authorize_chat(&self.ctx.settings, sender) {
            return;
        }
        if let CommandOutcome::Replied(reply) = command::handle(&self.ctx, message).await {
            if let Err(err) = self.ctx.session.chat(&reply).await {
                tracing::warn!("Could not reply to {}: {}", sender, err);
            }
        }
    }

    async fn relay_command(&self, message: &CommandMessage) -> CommandOutcome {
        if !command::authorize_relay(&self.ctx.settings, message) {
            tracing::debug!("Ignoring relay message from {}", message.sender_identity);
            return CommandOutcome::Ignored;
        }
        command::handle(&self.ctx, &message.text).await
    }

    fn start_loops(&mut self) {
        let schedule = self.ctx.settings.schedule.clone();
        let seconds = |secs| JitteredInterval::fixed(Duration::from_secs(secs));

        self.spawn_loop("mode-check", seconds(schedule.mode_check_secs), |ctx| async move {
            ctx.with_state(arbiter::check_mode).await;
        });
        self.spawn_loop(
            "wander",
            JitteredInterval::from_secs(schedule.wander_min_secs, schedule.wander_max_secs),
            |ctx| async move {
                let behavior = &ctx.settings.behavior;
                let point = ctx.random_point(behavior.safe_center, behavior.wander_radius);
                ctx.with_state(|state| arbiter::refresh_wander(state, point)).await;
            },
        );
        self.spawn_loop(
            "idle",
            JitteredInterval::from_secs(schedule.idle_min_secs, schedule.idle_max_secs),
            |ctx| async move { idle::tick(&ctx).await },
        );
        self.spawn_loop("survival", seconds(schedule.survival_secs), |ctx| async move {
            survival::tick(&ctx).await
        });
        self.spawn_loop(
            "frame",
            JitteredInterval::fixed(Duration::from_millis(schedule.frame_millis)),
            |ctx| async move { frame(&ctx).await },
        );
        self.spawn_loop("status", seconds(schedule.status_secs), |ctx| async move {
            ctx.publish_status().await;
        });
    }

    fn spawn_loop<F, Fut>(&mut self, name: &'static str, interval: JitteredInterval, tick: F)
    where
        F: Fn(Arc<AgentContext>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let ctx = Arc::clone(&self.ctx);
        self.loops.spawn(async move {
            tracing::debug!("Loop {} started", name);
            loop {
                let delay = ctx.jitter(&interval);
                if !ctx.sleep(delay).await {
                    break;
                }
                tokio::select! {
                    _ = ctx.cancelled() => break,
                    _ = tick(Arc::clone(&ctx)) => {}
                }
            }
            tracing::debug!("Loop {} stopped", name);
        });
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        // Reached without a clean stop when the run was aborted or panicked
        self.ctx.cancel();
    }
}

/// Per-frame work, in a fixed order: arrival, mounting, eating, combat
async fn frame(ctx: &Arc<AgentContext>) {
    let behavior = &ctx.settings.behavior;
    ctx.with_state(|state| arbiter::check_arrival(state, behavior))
        .await;
    social::tick(ctx).await;
    if let Err(err) = survival::eat(ctx).await {
        tracing::warn!("Eating failed: {}", err);
    }
    combat::tick(ctx).await;
}
