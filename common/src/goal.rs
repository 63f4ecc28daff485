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

//! Navigation goals handed to the navigator

use crate::entity::EntityId;
use crate::geometry::Vec3;
use serde::{Deserialize, Serialize};

/// A navigation intent. The agent pursues at most one at a time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Goal {
    /// Stand still
    #[default]
    None,
    /// Keep within `range` of a moving entity
    FollowEntity { entity: EntityId, range: f64 },
    /// Reach an exact point
    ReachPoint { target: Vec3 },
    /// Reach any block in the column within `radius` of `(x, z)`, at any altitude
    ReachAreaXz { x: f64, z: f64, radius: f64 },
}

impl Goal {
    pub fn is_none(&self) -> bool {
        matches!(self, Goal::None)
    }
}
