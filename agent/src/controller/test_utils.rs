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

//! Recording session fake for behavior tests

use super::context::{AgentContext, ControllerSettings};
use super::state::AgentState;
use crate::error::SessionError;
use crate::session::{AgentSession, Navigator};
use crate::status::WatchStatusSink;
use async_trait::async_trait;
use hearth_common::{ActionReply, ActionRequest, FurnaceState, Goal};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::{Arc, Mutex};

type Matcher = Box<dyn Fn(&ActionRequest) -> bool + Send + Sync>;

#[derive(Default)]
struct Recorded {
    actions: Vec<ActionRequest>,
    goals: Vec<Goal>,
    responders: Vec<(Matcher, Result<ActionReply, SessionError>)>,
    no_path: bool,
}

/// Records every action and goal. Replies `Done` unless told otherwise.
#[derive(Clone, Default)]
pub struct FakeSession {
    recorded: Arc<Mutex<Recorded>>,
}

impl FakeSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer actions matching `matcher` with `reply`. Later registrations win.
    pub fn respond(
        &self,
        matcher: impl Fn(&ActionRequest) -> bool + Send + Sync + 'static,
        reply: Result<ActionReply, SessionError>,
    ) {
        self.recorded
            .lock()
            .unwrap()
            .responders
            .push((Box::new(matcher), reply));
    }

    pub fn fail_on(&self, matcher: impl Fn(&ActionRequest) -> bool + Send + Sync + 'static) {
        self.respond(matcher, Err(SessionError::Protocol("refused".to_string())));
    }

    /// Make the navigator reject every goal as unreachable
    pub fn reject_goals(&self) {
        self.recorded.lock().unwrap().no_path = true;
    }

    pub fn actions(&self) -> Vec<ActionRequest> {
        self.recorded.lock().unwrap().actions.clone()
    }

    pub fn count(&self, matcher: impl Fn(&ActionRequest) -> bool) -> usize {
        self.recorded
            .lock()
            .unwrap()
            .actions
            .iter()
            .filter(|action| matcher(action))
            .count()
    }

    pub fn goals(&self) -> Vec<Goal> {
        self.recorded.lock().unwrap().goals.clone()
    }

    pub fn last_goal(&self) -> Option<Goal> {
        self.recorded.lock().unwrap().goals.last().cloned()
    }
}

#[async_trait]
impl AgentSession for FakeSession {
    async fn perform(&self, action: ActionRequest) -> Result<ActionReply, SessionError> {
        let mut recorded = self.recorded.lock().unwrap();
        recorded.actions.push(action.clone());
        if let Some((_, reply)) = recorded
            .responders
            .iter()
            .rev()
            .find(|(matcher, _)| matcher(&action))
        {
            return reply.clone();
        }
        Ok(match action {
            ActionRequest::FindBlock { .. } => ActionReply::Block { position: None },
            ActionRequest::OpenFurnace { .. } => ActionReply::Furnace {
                state: FurnaceState::default(),
            },
            ActionRequest::FurnaceTakeOutput => ActionReply::Taken { item: None },
            _ => ActionReply::Done,
        })
    }
}

#[async_trait]
impl Navigator for FakeSession {
    async fn set_goal(&self, _generation: u64, goal: Goal) -> Result<(), SessionError> {
        let mut recorded = self.recorded.lock().unwrap();
        let unreachable = recorded.no_path && !goal.is_none();
        recorded.goals.push(goal);
        if unreachable {
            Err(SessionError::NoPath)
        } else {
            Ok(())
        }
    }
}

/// Controller context over `session` starting from `state`
pub fn context_with(session: &FakeSession, state: AgentState) -> Arc<AgentContext> {
    let settings = ControllerSettings {
        behavior: crate::config::BehaviorConfig {
            safe_center: state.safe_center,
            ..Default::default()
        },
        ..ControllerSettings::new(state.owner_name.clone())
    };
    let ctx = AgentContext::new(
        Arc::new(session.clone()),
        Arc::new(session.clone()),
        settings,
        Arc::new(WatchStatusSink::new()),
        StdRng::seed_from_u64(7),
    )
    .with_initial_state(state);
    Arc::new(ctx)
}
