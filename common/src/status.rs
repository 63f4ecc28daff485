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

//! Status snapshots published for operators

use crate::geometry::Vec3;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Progress of an active point-travel request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelStatus {
    pub target: Vec3,
    pub distance_remaining: f64,
}

/// Point-in-time description of the agent. Publishing the same snapshot twice is harmless.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub mode: String,
    pub position: Vec3,
    pub biome: Option<String>,
    pub time_of_day: Option<u32>,
    pub travel: Option<TravelStatus>,
    pub captured_at: DateTime<Utc>,
}

impl StatusSnapshot {
    /// One-line human readable summary, used for chat replies
    pub fn summary(&self) -> String {
        let mut line = format!("mode {} at {}", self.mode, self.position);
        if let Some(biome) = &self.biome {
            line.push_str(&format!(" in {}", biome));
        }
        if let Some(time) = self.time_of_day {
            line.push_str(&format!(", time {}", time));
        }
        if let Some(travel) = &self.travel {
            line.push_str(&format!(
                ", travelling to {} ({:.0} left)",
                travel.target, travel.distance_remaining
            ));
        }
        line
    }
}
