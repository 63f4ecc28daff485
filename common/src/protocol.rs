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

//! Session protocol between the agent and a world bridge
//!
//! Frames are newline-delimited JSON. The agent opens with [`ClientFrame::Hello`], then
//! issues correlated [`ClientFrame::Request`]s and fire-and-forget [`ClientFrame::Goal`]s.
//! The bridge streams [`WorldEvent`]s and answers requests with [`ServerFrame::Reply`].

use crate::entity::{EntityId, EntityRecord, Equipment, ItemStack};
use crate::geometry::Vec3;
use crate::goal::Goal;
use serde::{Deserialize, Serialize};

/// Frames sent by the agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Hello { identity: String },
    Request { id: u64, action: ActionRequest },
    /// Replace the navigator's goal. `generation` is echoed back in path reports.
    Goal { generation: u64, goal: Goal },
}

/// Frames sent by the world bridge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    Event { event: WorldEvent },
    Reply {
        id: u64,
        outcome: Result<ActionReply, ActionFault>,
    },
}

/// Equipment destination for an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipSlot {
    Hand,
    Torso,
}

/// Actions the agent asks the world to perform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionRequest {
    LookAt { point: Vec3 },
    Turn { yaw: f64, pitch: f64 },
    Jump,
    SwingArm,
    ClearControls,
    Attack { target: EntityId },
    Equip { item: String, slot: EquipSlot },
    Consume,
    FindBlock { block: String, max_distance: f64 },
    Craft { recipe: String, count: u32, station: Option<Vec3> },
    OpenFurnace { at: Vec3 },
    FurnacePutFuel { item: String, count: u32 },
    FurnacePutInput { item: String, count: u32 },
    FurnaceTakeOutput,
    CloseFurnace,
    Mount { vehicle: EntityId },
    Dismount,
    Chat { message: String },
}

/// Successful replies to an [`ActionRequest`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reply", rename_all = "snake_case")]
pub enum ActionReply {
    Done,
    Block { position: Option<Vec3> },
    Furnace { state: FurnaceState },
    Taken { item: Option<ItemStack> },
}

/// Typed failures of an [`ActionRequest`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "fault", rename_all = "snake_case")]
pub enum ActionFault {
    NotFound { what: String },
    Busy,
    Disconnected,
    NoPath,
    Failed { message: String },
}

/// Slots of an open furnace
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FurnaceState {
    #[serde(default)]
    pub fuel: Option<ItemStack>,
    #[serde(default)]
    pub input: Option<ItemStack>,
    #[serde(default)]
    pub output: Option<ItemStack>,
}

/// Navigator progress reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathStatus {
    Planned,
    NoPath,
    Timeout,
    GoalReached,
}

/// Everything the world tells the agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WorldEvent {
    /// The agent entered the world
    Spawned { entity: EntityId, position: Vec3 },
    /// The agent's own body moved or changed
    SelfUpdate {
        position: Vec3,
        #[serde(default)]
        yaw: f64,
        #[serde(default)]
        pitch: f64,
        food: u8,
        #[serde(default)]
        vehicle: Option<EntityId>,
    },
    EntityUpdate { entity: EntityRecord },
    EntityRemoved { id: EntityId },
    Inventory {
        items: Vec<ItemStack>,
        #[serde(default)]
        equipment: Equipment,
    },
    Environment {
        #[serde(default)]
        biome: Option<String>,
        time_of_day: u32,
    },
    Chat { sender: String, message: String },
    /// Planning progress for the goal sent with `generation`
    Path { generation: u64, status: PathStatus },
    Kicked { reason: String },
    Error { message: String },
    Disconnected { reason: String },
}
