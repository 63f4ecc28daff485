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

//! Mode state machine and goal arbiter
//!
//! Every function here runs under the state lock and only records the goal change;
//! the controller hands the resulting goal to the navigator before releasing the lock.
//!
//! Transition table:
//!
//! | request  | result                                                          |
//! |----------|-----------------------------------------------------------------|
//! | none     | unchanged while Travel/Goto or manual override, else Partner if |
//! |          | the owner is online, Wander if not                              |
//! | wander   | Wander, manual override set                                     |
//! | stay     | Stay, manual override set                                       |
//! | follow   | Partner, manual override cleared; refused if owner offline      |
//! | come     | Travel; refused if owner offline                                |
//! | goto     | Goto                                                            |
//!
//! Planning failures only count against the goal generation they were reported for.
//! On the final leg of a Goto, no path to the exact point falls back to its column,
//! and no path to the column ends the trip. A staging waypoint with no path is moved
//! halfway back towards the agent, up to [`MAX_SEGMENT_SHORTENING`] times.

use super::state::{AgentState, GoalOwner, Mode, Precision, TravelPlan};
use crate::config::BehaviorConfig;
use crate::error::{BehaviorError, CommandError};
use hearth_common::{Goal, Vec3};

/// Distance to the Goto target (or waypoint) that counts as arrived
pub const ARRIVAL_RADIUS: f64 = 3.0;

/// A reached waypoint farther than this from the final target is only a segment
pub const SEGMENT_THRESHOLD: f64 = 5.0;

/// Distance to the owner that ends a come-to-owner trip
pub const OWNER_REACHED: f64 = 3.0;

/// Every completed segment must bring the agent at least this much closer
const MIN_SEGMENT_PROGRESS: f64 = 1.0;

/// Halvings of an unplannable staging segment before the trip is abandoned
pub const MAX_SEGMENT_SHORTENING: u32 = 3;

/// A mode change asked for by the operator
#[derive(Debug, Clone, PartialEq)]
pub enum ModeRequest {
    Wander,
    Stay,
    Follow,
    Come,
    Goto(Vec3),
}

/// Outcome of the transition table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub mode: Mode,
    pub manual_override: bool,
}

/// The transition table. Total and free of side effects.
pub fn decide(
    current: Mode,
    manual_override: bool,
    owner_online: bool,
    request: Option<&ModeRequest>,
    owner_name: &str,
) -> Result<Transition, CommandError> {
    let transition = |mode, manual_override| Ok(Transition { mode, manual_override });
    match request {
        None if current.is_travelling() || manual_override => transition(current, manual_override),
        None if owner_online => transition(Mode::Partner, manual_override),
        None => transition(Mode::Wander, manual_override),
        Some(ModeRequest::Wander) => transition(Mode::Wander, true),
        Some(ModeRequest::Stay) => transition(Mode::Stay, true),
        Some(ModeRequest::Follow | ModeRequest::Come) if !owner_online => {
            Err(CommandError::OwnerOffline(owner_name.to_string()))
        }
        Some(ModeRequest::Follow) => transition(Mode::Partner, false),
        Some(ModeRequest::Come) => transition(Mode::Travel, manual_override),
        Some(ModeRequest::Goto(_)) => transition(Mode::Goto, manual_override),
    }
}

/// Periodic automatic mode check. Returns true when the mode changed.
pub fn check_mode(state: &mut AgentState) -> bool {
    let Ok(next) = decide(
        state.mode,
        state.manual_override,
        state.owner_online(),
        None,
        &state.owner_name,
    ) else {
        return false;
    };

    if next.mode == state.mode {
        // Already partnering: only re-issue if the owner came back as a new entity
        if state.mode == Mode::Partner && state.goal_owner() == GoalOwner::Mode {
            let wanted = state.mode_goal();
            if &wanted != state.active_goal() {
                state.replace_goal(wanted, GoalOwner::Mode);
            }
        }
        return false;
    }

    match next.mode {
        Mode::Partner => enter(state, Mode::Partner),
        Mode::Wander => {
            state.wander_point = Some(state.safe_center);
            enter(state, Mode::Wander);
        }
        _ => {}
    }
    true
}

/// Apply an operator request through the transition table
pub fn apply_request(
    state: &mut AgentState,
    request: &ModeRequest,
    behavior: &BehaviorConfig,
) -> Result<Transition, CommandError> {
    let next = decide(
        state.mode,
        state.manual_override,
        state.owner_online(),
        Some(request),
        &state.owner_name,
    )?;
    state.manual_override = next.manual_override;

    match request {
        ModeRequest::Wander | ModeRequest::Stay | ModeRequest::Follow => {
            if next.mode != state.mode || state.goal_owner() != GoalOwner::Mode {
                if next.mode == Mode::Wander {
                    state.wander_point = Some(state.safe_center);
                }
                enter(state, next.mode);
            }
        }
        ModeRequest::Come => {
            state.set_mode(Mode::Travel);
            state.come_target = state.owner().map(|owner| owner.position);
            let goal = state.mode_goal();
            state.replace_goal(goal, GoalOwner::Mode);
        }
        ModeRequest::Goto(target) => start_goto(state, *target, behavior),
    }
    Ok(next)
}

/// Enter `mode` and issue the goal it calls for
fn enter(state: &mut AgentState, mode: Mode) {
    state.set_mode(mode);
    let goal = state.mode_goal();
    state.replace_goal(goal, GoalOwner::Mode);
}

/// Begin point travel towards `target`, staging it if it is far away
pub fn start_goto(state: &mut AgentState, target: Vec3, behavior: &BehaviorConfig) {
    let position = state.world.position;
    let remaining = position.distance(&target);
    state.set_mode(Mode::Goto);
    state.travel = Some(plan_segment(position, target, behavior, remaining, 0, remaining));
    tracing::info!("Travelling to {} ({:.0} away)", target, remaining);
    let goal = state.mode_goal();
    state.replace_goal(goal, GoalOwner::Mode);
}

fn plan_segment(
    position: Vec3,
    target: Vec3,
    behavior: &BehaviorConfig,
    origin_distance: f64,
    segments_completed: u32,
    best_remaining: f64,
) -> TravelPlan {
    let remaining = position.distance(&target);
    let (waypoint, precision) = if remaining > behavior.segment_length {
        // Intermediate altitude is unknown, so staged waypoints are column goals
        (
            position.lerp(&target, behavior.segment_length / remaining),
            Precision::ColumnXz,
        )
    } else {
        (target, Precision::Exact)
    };
    TravelPlan {
        target,
        origin_distance,
        waypoint,
        precision,
        segments_completed,
        best_remaining,
        shortened: 0,
    }
}

/// Per-frame arrival checks for Goto and Travel. Returns true when the mode changed.
pub fn check_arrival(state: &mut AgentState, behavior: &BehaviorConfig) -> bool {
    match state.mode {
        Mode::Goto => check_goto_arrival(state, behavior),
        Mode::Travel => check_travel_arrival(state),
        _ => false,
    }
}

fn check_goto_arrival(state: &mut AgentState, behavior: &BehaviorConfig) -> bool {
    let Some(plan) = state.travel.clone() else {
        finish_travel(state, "no travel plan");
        return true;
    };
    let position = state.world.position;

    if position.distance(&plan.target) < ARRIVAL_RADIUS {
        finish_travel(state, "arrived");
        return true;
    }
    if !plan.waypoint_reached(&position, ARRIVAL_RADIUS) {
        return false;
    }
    if plan.target.distance(&plan.waypoint) <= SEGMENT_THRESHOLD {
        finish_travel(state, "arrived near target");
        return true;
    }

    // Segment complete: stage the next one unless travel has stopped making progress
    let remaining = position.distance(&plan.target);
    let segments_completed = plan.segments_completed + 1;
    if segments_completed > behavior.max_segments {
        finish_travel(state, "segment limit reached");
        return true;
    }
    if remaining > plan.best_remaining - MIN_SEGMENT_PROGRESS {
        finish_travel(state, "no progress towards target");
        return true;
    }

    tracing::info!(
        "Segment {} complete, {:.0} remaining to {}",
        segments_completed,
        remaining,
        plan.target
    );
    state.travel = Some(plan_segment(
        position,
        plan.target,
        behavior,
        plan.origin_distance,
        segments_completed,
        remaining,
    ));
    let goal = state.mode_goal();
    state.replace_goal(goal, GoalOwner::Mode);
    false
}

fn check_travel_arrival(state: &mut AgentState) -> bool {
    let position = state.world.position;
    match state.owner().map(|owner| owner.position) {
        Some(owner_position) if position.distance(&owner_position) <= OWNER_REACHED => {
            enter(state, Mode::Partner);
            true
        }
        Some(owner_position) => {
            // Chase the owner without re-planning on every small step
            let stale = state
                .come_target
                .is_none_or(|target| target.distance(&owner_position) > OWNER_REACHED);
            if stale {
                state.come_target = Some(owner_position);
                let goal = state.mode_goal();
                state.replace_goal(goal, GoalOwner::Mode);
            }
            false
        }
        None => {
            // Owner vanished: give up once the last known spot is reached
            let reached = state
                .come_target
                .is_none_or(|target| position.distance(&target) <= OWNER_REACHED);
            if reached {
                state.wander_point = None;
                enter(state, Mode::Wander);
            }
            reached
        }
    }
}

fn finish_travel(state: &mut AgentState, reason: &str) {
    tracing::info!("Point travel finished: {}", reason);
    state.wander_point = None;
    enter(state, Mode::Wander);
}

/// The navigator could not plan a path for the goal of `generation`.
///
/// Reports for a superseded goal are ignored. Returns
/// [`BehaviorError::PlanningFailed`] when the Goto had to be abandoned.
pub fn on_planning_failed(state: &mut AgentState, generation: u64) -> Result<(), BehaviorError> {
    if generation != state.goal_generation() {
        tracing::debug!(
            "Ignoring stale planning failure for goal {} (current {})",
            generation,
            state.goal_generation()
        );
        return Ok(());
    }
    if state.mode != Mode::Goto || state.goal_owner() != GoalOwner::Mode {
        tracing::debug!("No path for {:?} in mode {}", state.active_goal(), state.mode);
        return Ok(());
    }
    let position = state.world.position;
    let Some(plan) = state.travel.as_mut() else {
        return Ok(());
    };

    if !plan.is_final_leg() {
        if plan.shortened >= MAX_SEGMENT_SHORTENING {
            tracing::warn!("No path towards {} even over short segments", plan.target);
            finish_travel(state, "unreachable");
            return Err(BehaviorError::PlanningFailed);
        }
        plan.shortened += 1;
        plan.waypoint = position.lerp(&plan.waypoint, 0.5);
        tracing::warn!("No path to waypoint, shortening the segment to {}", plan.waypoint);
        let goal = plan.goal();
        state.replace_goal(goal, GoalOwner::Mode);
        return Ok(());
    }

    match plan.precision {
        Precision::Exact => {
            tracing::warn!("No path to {}, falling back to its column", plan.waypoint);
            plan.precision = Precision::ColumnXz;
            let goal = plan.goal();
            state.replace_goal(goal, GoalOwner::Mode);
            Ok(())
        }
        Precision::ColumnXz => {
            tracing::warn!("No path to the column of {} either", plan.waypoint);
            finish_travel(state, "unreachable");
            Err(BehaviorError::PlanningFailed)
        }
    }
}

/// Pick a new wander destination. Ignored unless wandering with a mode-owned goal.
pub fn refresh_wander(state: &mut AgentState, point: Vec3) -> bool {
    if state.mode != Mode::Wander || state.goal_owner() != GoalOwner::Mode {
        return false;
    }
    state.wander_point = Some(point);
    state.replace_goal(Goal::ReachPoint { target: point }, GoalOwner::Mode);
    true
}
