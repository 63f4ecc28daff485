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

//! Controller context shared by every loop and task of one session

use super::arbiter;
use super::schedule::JitteredInterval;
use super::state::{AgentState, GoalTicket};
use crate::config::{BehaviorConfig, Configuration, ScheduleConfig};
use crate::error::{BehaviorError, SessionError};
use crate::session::{AgentSession, Navigator};
use crate::status::StatusSink;
use hearth_common::Vec3;
use rand::Rng;
use rand::rngs::StdRng;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use uuid::Uuid;

/// Goals handed to the navigator per lock acquisition. Bounds the no-path fallback chain.
const MAX_GOAL_DISPATCH: usize = 3;

/// How often [`AgentContext::wait_for`] re-checks its condition
const WAIT_POLL: Duration = Duration::from_millis(250);

/// Settings a controller instance runs with
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub owner_name: String,
    pub operator_identity: Option<String>,
    pub operator_channel: Option<String>,
    pub behavior: BehaviorConfig,
    pub schedule: ScheduleConfig,
}

impl ControllerSettings {
    pub fn new(owner_name: impl Into<String>) -> Self {
        Self {
            owner_name: owner_name.into(),
            operator_identity: None,
            operator_channel: None,
            behavior: BehaviorConfig::default(),
            schedule: ScheduleConfig::default(),
        }
    }

    pub fn from_config(config: &Configuration) -> Self {
        Self {
            owner_name: config.owner.name.as_str().to_string(),
            operator_identity: config.operator.identity.as_ref().map(|id| id.as_str().to_string()),
            operator_channel: config.operator.channel.as_ref().map(|ch| ch.as_str().to_string()),
            behavior: config.behavior.clone(),
            schedule: config.schedule.clone(),
        }
    }
}

/// Everything a behavior step needs. One per controller, dropped with it.
pub struct AgentContext {
    id: Uuid,
    state: Mutex<AgentState>,
    pub session: Arc<dyn AgentSession>,
    navigator: Arc<dyn Navigator>,
    pub settings: ControllerSettings,
    status: Arc<dyn StatusSink>,
    rng: std::sync::Mutex<StdRng>,
    cancel: CancellationToken,
    tracker: TaskTracker,
}

impl AgentContext {
    pub fn new(
        session: Arc<dyn AgentSession>,
        navigator: Arc<dyn Navigator>,
        settings: ControllerSettings,
        status: Arc<dyn StatusSink>,
        rng: StdRng,
    ) -> Self {
        let state = AgentState::new(settings.owner_name.clone(), settings.behavior.safe_center);
        Self {
            id: Uuid::new_v4(),
            state: Mutex::new(state),
            session,
            navigator,
            settings,
            status,
            rng: std::sync::Mutex::new(rng),
            cancel: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }

    #[cfg(test)]
    pub fn with_initial_state(mut self, state: AgentState) -> Self {
        self.state = Mutex::new(state);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Mutate the agent state under the lock.
    ///
    /// A goal replaced by `f` reaches the navigator before the lock is released, so
    /// goals are dispatched in the order they were set.
    pub async fn with_state<R>(&self, f: impl FnOnce(&mut AgentState) -> R) -> R {
        let mut state = self.state.lock().await;
        let result = f(&mut state);
        self.dispatch_goal(&mut state).await;
        result
    }

    /// Read the agent state under the lock
    pub async fn read<R>(&self, f: impl FnOnce(&AgentState) -> R) -> R {
        let state = self.state.lock().await;
        f(&state)
    }

    async fn dispatch_goal(&self, state: &mut AgentState) {
        for _ in 0..MAX_GOAL_DISPATCH {
            let Some((goal, generation)) = state.take_pending_goal() else {
                return;
            };
            match self.navigator.set_goal(generation, goal).await {
                Ok(()) => {}
                Err(SessionError::NoPath) => {
                    if let Err(err) = arbiter::on_planning_failed(state, generation) {
                        tracing::warn!("Point travel abandoned: {}", err);
                    }
                }
                Err(err) => {
                    tracing::warn!("Navigator rejected goal: {}", err);
                    return;
                }
            }
        }
    }

    /// Publish the current status to the status sink
    pub async fn publish_status(&self) -> hearth_common::StatusSnapshot {
        let snapshot = self.read(AgentState::snapshot).await;
        self.status.publish(snapshot.clone()).await;
        snapshot
    }

    pub fn with_rng<R>(&self, f: impl FnOnce(&mut StdRng) -> R) -> R {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut rng)
    }

    pub fn jitter(&self, interval: &JitteredInterval) -> Duration {
        self.with_rng(|rng| interval.next_delay(rng))
    }

    /// Uniform point on the horizontal disc of `radius` around `center`
    pub fn random_point(&self, center: Vec3, radius: f64) -> Vec3 {
        self.with_rng(|rng| {
            let angle = rng.random_range(0.0..std::f64::consts::TAU);
            let distance = radius * rng.random_range(0.0f64..=1.0).sqrt();
            center.offset(distance * angle.cos(), 0.0, distance * angle.sin())
        })
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    /// Sleep unless the controller stops first. Returns false if it stopped.
    pub async fn sleep(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }

    /// Poll `condition` until it holds, the goal behind `ticket` is replaced, or
    /// `timeout` elapses.
    pub async fn wait_for(
        &self,
        ticket: &GoalTicket,
        timeout: Duration,
        condition: impl Fn(&AgentState) -> bool,
    ) -> Result<(), BehaviorError> {
        let deadline = Instant::now() + timeout;
        loop {
            let (held, done) = self.read(|state| (state.holds(ticket), condition(state))).await;
            if !held {
                return Err(BehaviorError::Aborted("goal superseded"));
            }
            if done {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(BehaviorError::Aborted("timed out"));
            }
            if !self.sleep(WAIT_POLL).await {
                return Err(BehaviorError::Aborted("controller stopped"));
            }
        }
    }

    /// Run a short-lived task tied to this controller. It is stopped with the controller.
    pub fn spawn_task<F>(&self, name: &'static str, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = self.cancel.clone();
        let inner = tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = task => {}
            }
        });
        self.tracker.spawn(async move {
            if let Err(err) = inner.await {
                if err.is_panic() {
                    tracing::error!("Task {} panicked: {}", name, err);
                }
            }
        });
    }

    /// Signal every loop and task to stop
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Stop every loop and task and wait for the tasks to finish
    pub async fn shutdown(&self) {
        self.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }
}
