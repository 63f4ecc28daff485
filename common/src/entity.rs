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

//! Entities and items observed through the session

use crate::geometry::Vec3;
use serde::{Deserialize, Serialize};

/// Session-scoped entity identifier. Only meaningful for the lifetime of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u32);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Display category of an entity as reported by the world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityCategory {
    Hostile,
    Animal,
    Other,
}

/// An entity the agent can currently see
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: EntityId,

    /// Player name or mob type name
    pub name: String,

    pub position: Vec3,

    pub category: EntityCategory,

    /// Vehicle this entity is riding, if any
    #[serde(default)]
    pub riding: Option<EntityId>,
}

impl EntityRecord {
    pub fn new(id: EntityId, name: impl Into<String>, position: Vec3, category: EntityCategory) -> Self {
        Self {
            id,
            name: name.into(),
            position,
            category,
            riding: None,
        }
    }

    pub fn riding(mut self, vehicle: EntityId) -> Self {
        self.riding = Some(vehicle);
        self
    }

    /// Records with unusable coordinates or no name are rejected at the session boundary
    pub fn is_valid(&self) -> bool {
        self.position.is_finite() && !self.name.is_empty()
    }
}

/// A stack of items in the agent's inventory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub name: String,
    pub count: u32,
}

impl ItemStack {
    pub fn new(name: impl Into<String>, count: u32) -> Self {
        Self {
            name: name.into(),
            count,
        }
    }
}

/// What the agent currently has equipped
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equipment {
    #[serde(default)]
    pub hand: Option<String>,
    #[serde(default)]
    pub torso: Option<String>,
}
