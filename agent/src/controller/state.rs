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

//! Agent state shared by every behavior loop
//!
//! All writes happen under the controller's single state lock. The navigation goal lives
//! in exactly one slot; replacing it is the only way to change where the agent is headed.

use chrono::Utc;
use hearth_common::{
    EntityId, EntityRecord, Equipment, Goal, ItemStack, StatusSnapshot, TravelStatus, Vec3,
    WorldEvent,
};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Minimum spacing between two attack actions, on any target
pub const ATTACK_COOLDOWN: Duration = Duration::from_millis(600);

/// Radius of the column goal used when exact planning fails
pub const XZ_FALLBACK_RADIUS: f64 = 2.0;

/// Range kept to the owner while partnering
pub const FOLLOW_DISTANCE: f64 = 2.0;

/// How far short of the owner a come-to-owner trip stops
pub const COME_STANDOFF: f64 = 2.0;

/// Top-level behavior of the agent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Mode {
    #[default]
    None,
    Partner,
    Wander,
    Travel,
    Goto,
    Stay,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::None => "None",
            Mode::Partner => "Partner",
            Mode::Wander => "Wander",
            Mode::Travel => "Travel",
            Mode::Goto => "Goto",
            Mode::Stay => "Stay",
        }
    }

    /// Long travel that automatic switching, survival and eating leave alone
    pub fn is_travelling(&self) -> bool {
        matches!(self, Mode::Travel | Mode::Goto)
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who set the current goal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GoalOwner {
    /// The goal the current mode wants
    Mode,
    Hunt,
    Cook,
    Mount,
}

/// Proof that a subsystem set the current goal. Invalidated by any later goal change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoalTicket {
    owner: GoalOwner,
    generation: u64,
}

impl GoalTicket {
    pub fn owner(&self) -> GoalOwner {
        self.owner
    }
}

/// How precisely the current Goto waypoint is pursued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    Exact,
    /// Any altitude within [`XZ_FALLBACK_RADIUS`] of the waypoint column
    ColumnXz,
}

/// Point-travel bookkeeping, present only while in [`Mode::Goto`]
#[derive(Debug, Clone, PartialEq)]
pub struct TravelPlan {
    /// Final destination requested by the operator
    pub target: Vec3,
    /// Distance to `target` when the request was accepted
    pub origin_distance: f64,
    /// Sub-target currently handed to the navigator
    pub waypoint: Vec3,
    pub precision: Precision,
    pub segments_completed: u32,
    /// Smallest remaining distance observed at a segment boundary
    pub best_remaining: f64,
    /// Times the current segment was cut short after a planning failure
    pub shortened: u32,
}

impl TravelPlan {
    pub fn goal(&self) -> Goal {
        match self.precision {
            Precision::Exact => Goal::ReachPoint {
                target: self.waypoint,
            },
            Precision::ColumnXz => Goal::ReachAreaXz {
                x: self.waypoint.x,
                z: self.waypoint.z,
                radius: XZ_FALLBACK_RADIUS,
            },
        }
    }

    /// Whether the current waypoint is the final target rather than a staging point
    pub fn is_final_leg(&self) -> bool {
        self.waypoint == self.target
    }

    /// Whether `position` satisfies the current waypoint
    pub fn waypoint_reached(&self, position: &Vec3, radius: f64) -> bool {
        match self.precision {
            Precision::Exact => position.distance(&self.waypoint) < radius,
            Precision::ColumnXz => position.distance_xz(&self.waypoint) < radius,
        }
    }
}

/// Enforces [`ATTACK_COOLDOWN`] across every attacker in the agent
#[derive(Debug, Clone, Default)]
pub struct AttackClock {
    last: Option<Instant>,
}

impl AttackClock {
    /// Claim an attack slot. Returns false while the cooldown is running.
    pub fn try_fire(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last {
            if now.saturating_duration_since(last) < ATTACK_COOLDOWN {
                return false;
            }
        }
        self.last = Some(now);
        true
    }
}

/// What the session last told us about the world
#[derive(Debug, Clone, Default)]
pub struct WorldView {
    pub self_id: Option<EntityId>,
    pub spawned: bool,
    pub position: Vec3,
    pub yaw: f64,
    pub pitch: f64,
    /// 0..=20
    pub food: u8,
    pub vehicle: Option<EntityId>,
    pub inventory: Vec<ItemStack>,
    pub equipment: Equipment,
    pub entities: HashMap<EntityId, EntityRecord>,
    pub biome: Option<String>,
    pub time_of_day: Option<u32>,
}

impl WorldView {
    pub fn new() -> Self {
        Self {
            food: 20,
            ..Default::default()
        }
    }

    /// Refresh observed fields from a session event
    pub fn apply(&mut self, event: &WorldEvent) {
        match event {
            WorldEvent::Spawned { entity, position } => {
                self.self_id = Some(*entity);
                self.position = *position;
                self.spawned = true;
            }
            WorldEvent::SelfUpdate {
                position,
                yaw,
                pitch,
                food,
                vehicle,
            } => {
                self.position = *position;
                self.yaw = *yaw;
                self.pitch = *pitch;
                self.food = (*food).min(20);
                self.vehicle = *vehicle;
            }
            WorldEvent::EntityUpdate { entity } => {
                if Some(entity.id) != self.self_id {
                    self.entities.insert(entity.id, entity.clone());
                }
            }
            WorldEvent::EntityRemoved { id } => {
                self.entities.remove(id);
            }
            WorldEvent::Inventory { items, equipment } => {
                self.inventory = items.clone();
                self.equipment = equipment.clone();
            }
            WorldEvent::Environment { biome, time_of_day } => {
                self.biome = biome.clone();
                self.time_of_day = Some(*time_of_day);
            }
            WorldEvent::Chat { .. }
            | WorldEvent::Path { .. }
            | WorldEvent::Kicked { .. }
            | WorldEvent::Error { .. }
            | WorldEvent::Disconnected { .. } => {}
        }
    }

    pub fn entity(&self, id: EntityId) -> Option<&EntityRecord> {
        self.entities.get(&id)
    }

    pub fn entity_named(&self, name: &str) -> Option<&EntityRecord> {
        self.entities.values().find(|entity| entity.name == name)
    }

    pub fn count_item(&self, name: &str) -> u32 {
        self.inventory
            .iter()
            .filter(|stack| stack.name == name)
            .map(|stack| stack.count)
            .sum()
    }

    pub fn find_item(&self, predicate: impl Fn(&str) -> bool) -> Option<&ItemStack> {
        self.inventory
            .iter()
            .find(|stack| stack.count > 0 && predicate(&stack.name))
    }
}

/// The single mutable record every loop reads and writes
#[derive(Debug, Clone)]
pub struct AgentState {
    pub mode: Mode,
    pub manual_override: bool,

    goal: Goal,
    goal_owner: GoalOwner,
    goal_generation: u64,
    pending_dispatch: Option<Goal>,

    /// Present only while in [`Mode::Goto`]
    pub travel: Option<TravelPlan>,
    /// Last owner position seen while in [`Mode::Travel`]. The goal stops
    /// [`COME_STANDOFF`] short of it.
    pub come_target: Option<Vec3>,
    /// Current wander destination, if any
    pub wander_point: Option<Vec3>,

    pub attack_clock: AttackClock,
    pub mounting: bool,
    pub eating: bool,
    pub hunting: Option<EntityId>,
    pub cooking: bool,

    pub owner_name: String,
    pub safe_center: Vec3,
    pub world: WorldView,
}

impl AgentState {
    pub fn new(owner_name: impl Into<String>, safe_center: Vec3) -> Self {
        Self {
            mode: Mode::None,
            manual_override: false,
            goal: Goal::None,
            goal_owner: GoalOwner::Mode,
            goal_generation: 0,
            pending_dispatch: None,
            travel: None,
            come_target: None,
            wander_point: None,
            attack_clock: AttackClock::default(),
            mounting: false,
            eating: false,
            hunting: None,
            cooking: false,
            owner_name: owner_name.into(),
            safe_center,
            world: WorldView::new(),
        }
    }

    pub fn active_goal(&self) -> &Goal {
        &self.goal
    }

    pub fn goal_owner(&self) -> GoalOwner {
        self.goal_owner
    }

    /// Generation of the active goal. Navigator reports name the generation they answer.
    pub fn goal_generation(&self) -> u64 {
        self.goal_generation
    }

    /// The owner's entity, if the owner is online and visible
    pub fn owner(&self) -> Option<&EntityRecord> {
        self.world.entity_named(&self.owner_name)
    }

    pub fn owner_online(&self) -> bool {
        self.owner().is_some()
    }

    /// Switch modes. Leaving [`Mode::Goto`] or [`Mode::Travel`] drops their bookkeeping.
    pub fn set_mode(&mut self, mode: Mode) {
        if mode != self.mode {
            tracing::info!("Mode {} -> {}", self.mode, mode);
            self.mode = mode;
        }
        if mode != Mode::Goto {
            self.travel = None;
        }
        if mode != Mode::Travel {
            self.come_target = None;
        }
    }

    /// Replace the single active goal. The previous goal is superseded immediately.
    pub fn replace_goal(&mut self, goal: Goal, owner: GoalOwner) -> GoalTicket {
        self.goal_generation += 1;
        if goal != self.goal || owner != self.goal_owner {
            tracing::debug!("Goal {:?} ({:?}) -> {:?} ({:?})", self.goal, self.goal_owner, goal, owner);
        }
        self.goal = goal.clone();
        self.goal_owner = owner;
        self.pending_dispatch = Some(goal);
        GoalTicket {
            owner,
            generation: self.goal_generation,
        }
    }

    /// Set a temporary goal on behalf of a subsystem.
    ///
    /// Refused while travelling or staying, and while another subsystem holds the goal,
    /// except that mounting may take the goal from a hunt or cook.
    pub fn claim_goal(&mut self, owner: GoalOwner, goal: Goal) -> Option<GoalTicket> {
        if self.mode.is_travelling() || self.mode == Mode::Stay || owner == GoalOwner::Mode {
            return None;
        }
        let preempts = match self.goal_owner {
            GoalOwner::Mode => true,
            current if current == owner => true,
            GoalOwner::Hunt | GoalOwner::Cook => owner == GoalOwner::Mount,
            GoalOwner::Mount => false,
        };
        if !preempts {
            return None;
        }
        Some(self.replace_goal(goal, owner))
    }

    /// Whether the goal set with `ticket` is still the active one
    pub fn holds(&self, ticket: &GoalTicket) -> bool {
        ticket.generation == self.goal_generation && ticket.owner == self.goal_owner
    }

    /// Hand the goal back to the mode, if `ticket` still holds it
    pub fn release_goal(&mut self, ticket: &GoalTicket) -> bool {
        if !self.holds(ticket) {
            return false;
        }
        let goal = self.mode_goal();
        self.replace_goal(goal, GoalOwner::Mode);
        true
    }

    /// The goal the current mode calls for
    pub fn mode_goal(&self) -> Goal {
        match self.mode {
            Mode::None | Mode::Stay => Goal::None,
            Mode::Partner => self
                .owner()
                .map(|owner| Goal::FollowEntity {
                    entity: owner.id,
                    range: FOLLOW_DISTANCE,
                })
                .unwrap_or(Goal::None),
            Mode::Wander => self
                .wander_point
                .map(|target| Goal::ReachPoint { target })
                .unwrap_or(Goal::None),
            Mode::Travel => self
                .come_target
                .map(|owner| Goal::ReachPoint {
                    target: self.world.position.approach(&owner, COME_STANDOFF),
                })
                .unwrap_or(Goal::None),
            Mode::Goto => self
                .travel
                .as_ref()
                .map(TravelPlan::goal)
                .unwrap_or(Goal::None),
        }
    }

    /// Take the goal that still has to be handed to the navigator, with its generation
    pub fn take_pending_goal(&mut self) -> Option<(Goal, u64)> {
        self.pending_dispatch
            .take()
            .map(|goal| (goal, self.goal_generation))
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let travel = self.travel.as_ref().map(|plan| TravelStatus {
            target: plan.target,
            distance_remaining: self.world.position.distance(&plan.target),
        });
        StatusSnapshot {
            mode: self.mode.to_string(),
            position: self.world.position,
            biome: self.world.biome.clone(),
            time_of_day: self.world.time_of_day,
            travel,
            captured_at: Utc::now(),
        }
    }
}
