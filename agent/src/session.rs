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

//! Agent session and navigator seams
//!
//! The controller never talks to the world directly. Everything goes through an
//! [`AgentSession`] (actions) and a [`Navigator`] (movement goals), both obtained from a
//! [`SessionConnector`] together with the stream of [`WorldEvent`]s for that session.

mod transport;

pub use self::transport::JsonLineConnector;

use crate::error::SessionError;
use async_trait::async_trait;
use hearth_common::{
    ActionReply, ActionRequest, EntityId, EquipSlot, FurnaceState, Goal, ItemStack, Vec3,
    WorldEvent,
};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Actions the controller can ask of the world
#[async_trait]
pub trait AgentSession: Send + Sync {
    /// Perform a single action and wait for the world's answer
    async fn perform(&self, action: ActionRequest) -> Result<ActionReply, SessionError>;

    async fn look_at(&self, point: Vec3) -> Result<(), SessionError> {
        self.perform(ActionRequest::LookAt { point }).await.map(drop)
    }

    async fn turn(&self, yaw: f64, pitch: f64) -> Result<(), SessionError> {
        self.perform(ActionRequest::Turn { yaw, pitch }).await.map(drop)
    }

    async fn jump(&self) -> Result<(), SessionError> {
        self.perform(ActionRequest::Jump).await.map(drop)
    }

    async fn swing_arm(&self) -> Result<(), SessionError> {
        self.perform(ActionRequest::SwingArm).await.map(drop)
    }

    /// Release every movement control the agent is holding
    async fn clear_controls(&self) -> Result<(), SessionError> {
        self.perform(ActionRequest::ClearControls).await.map(drop)
    }

    async fn attack(&self, target: EntityId) -> Result<(), SessionError> {
        self.perform(ActionRequest::Attack { target }).await.map(drop)
    }

    async fn equip(&self, item: &str, slot: EquipSlot) -> Result<(), SessionError> {
        self.perform(ActionRequest::Equip {
            item: item.to_string(),
            slot,
        })
        .await
        .map(drop)
    }

    /// Eat whatever is held
    async fn consume(&self) -> Result<(), SessionError> {
        self.perform(ActionRequest::Consume).await.map(drop)
    }

    async fn find_block(&self, block: &str, max_distance: f64) -> Result<Option<Vec3>, SessionError> {
        match self
            .perform(ActionRequest::FindBlock {
                block: block.to_string(),
                max_distance,
            })
            .await?
        {
            ActionReply::Block { position } => Ok(position),
            other => Err(unexpected_reply("find_block", &other)),
        }
    }

    async fn craft(&self, recipe: &str, count: u32, station: Option<Vec3>) -> Result<(), SessionError> {
        self.perform(ActionRequest::Craft {
            recipe: recipe.to_string(),
            count,
            station,
        })
        .await
        .map(drop)
    }

    async fn open_furnace(&self, at: Vec3) -> Result<FurnaceState, SessionError> {
        match self.perform(ActionRequest::OpenFurnace { at }).await? {
            ActionReply::Furnace { state } => Ok(state),
            other => Err(unexpected_reply("open_furnace", &other)),
        }
    }

    async fn furnace_put_fuel(&self, item: &str, count: u32) -> Result<(), SessionError> {
        self.perform(ActionRequest::FurnacePutFuel {
            item: item.to_string(),
            count,
        })
        .await
        .map(drop)
    }

    async fn furnace_put_input(&self, item: &str, count: u32) -> Result<(), SessionError> {
        self.perform(ActionRequest::FurnacePutInput {
            item: item.to_string(),
            count,
        })
        .await
        .map(drop)
    }

    async fn furnace_take_output(&self) -> Result<Option<ItemStack>, SessionError> {
        match self.perform(ActionRequest::FurnaceTakeOutput).await? {
            ActionReply::Taken { item } => Ok(item),
            other => Err(unexpected_reply("furnace_take_output", &other)),
        }
    }

    async fn close_furnace(&self) -> Result<(), SessionError> {
        self.perform(ActionRequest::CloseFurnace).await.map(drop)
    }

    async fn mount(&self, vehicle: EntityId) -> Result<(), SessionError> {
        self.perform(ActionRequest::Mount { vehicle }).await.map(drop)
    }

    async fn dismount(&self) -> Result<(), SessionError> {
        self.perform(ActionRequest::Dismount).await.map(drop)
    }

    async fn chat(&self, message: &str) -> Result<(), SessionError> {
        self.perform(ActionRequest::Chat {
            message: message.to_string(),
        })
        .await
        .map(drop)
    }
}

fn unexpected_reply(action: &str, reply: &ActionReply) -> SessionError {
    SessionError::Protocol(format!("unexpected reply to {}: {:?}", action, reply))
}

/// Executes movement goals. Replacing the goal cancels whatever was in flight.
///
/// `set_goal` only hands the goal over; planning outcomes arrive later as
/// [`WorldEvent::Path`] events carrying the same `generation`. An immediate
/// [`SessionError::NoPath`] is treated the same as a reported `no_path`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Navigator: Send + Sync {
    async fn set_goal(&self, generation: u64, goal: Goal) -> Result<(), SessionError>;
}

/// Where and as whom to connect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionParams {
    pub host: String,
    pub port: u16,
    pub identity: String,
}

/// A live session: action and navigation handles plus its event stream
pub struct SessionHandle {
    pub session: Arc<dyn AgentSession>,
    pub navigator: Arc<dyn Navigator>,
    pub events: mpsc::Receiver<WorldEvent>,
}

/// Opens sessions for the connection supervisor
#[async_trait]
pub trait SessionConnector: Send + Sync {
    async fn connect(&self, params: &SessionParams) -> Result<SessionHandle, SessionError>;
}
