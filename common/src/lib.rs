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

//! Hearth Common Types and Protocols
//!
//! This crate defines the types shared between the companion agent and the world bridge:
//! - Geometry and entity records observed in the world
//! - Navigation goals
//! - The newline-delimited JSON session protocol
//! - Operator command messages and status snapshots

pub mod command;
pub mod entity;
pub mod geometry;
pub mod goal;
pub mod protocol;
pub mod status;

pub use command::CommandMessage;
pub use entity::{EntityCategory, EntityId, EntityRecord, Equipment, ItemStack};
pub use geometry::Vec3;
pub use goal::Goal;
pub use protocol::{
    ActionFault, ActionReply, ActionRequest, ClientFrame, EquipSlot, FurnaceState, PathStatus,
    ServerFrame, WorldEvent,
};
pub use status::{StatusSnapshot, TravelStatus};
