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

//! Social subsystem: ride along with the owner

use super::context::AgentContext;
use super::state::{AgentState, GoalOwner, GoalTicket};
use crate::error::BehaviorError;
use hearth_common::{EntityId, Goal};
use std::sync::Arc;
use std::time::Duration;

const BOARDING_DISTANCE: f64 = 1.3;
/// Slack over [`BOARDING_DISTANCE`] accepted before trying to mount
const BOARDING_SLACK: f64 = 0.7;
const APPROACH_TIMEOUT: Duration = Duration::from_secs(15);
const SETTLE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RideAction {
    Board {
        vehicle: EntityId,
        ticket: GoalTicket,
        riding_other: bool,
    },
    Dismount,
}

fn owner_vehicle(state: &AgentState) -> Option<EntityId> {
    state.owner().and_then(|owner| owner.riding)
}

/// Decide whether to board or leave a vehicle, taking the mount guard if so
fn plan(state: &mut AgentState) -> Option<RideAction> {
    if state.mounting {
        return None;
    }
    match (owner_vehicle(state), state.world.vehicle) {
        (Some(vehicle), current) if current != Some(vehicle) => {
            // Refused while travelling or staying
            let ticket = state.claim_goal(
                GoalOwner::Mount,
                Goal::FollowEntity {
                    entity: vehicle,
                    range: BOARDING_DISTANCE,
                },
            )?;
            state.mounting = true;
            Some(RideAction::Board {
                vehicle,
                ticket,
                riding_other: current.is_some(),
            })
        }
        (None, Some(_)) => {
            state.mounting = true;
            Some(RideAction::Dismount)
        }
        _ => None,
    }
}

/// Frame step
pub async fn tick(ctx: &Arc<AgentContext>) {
    match ctx.with_state(plan).await {
        Some(RideAction::Board {
            vehicle,
            ticket,
            riding_other,
        }) => {
            tracing::info!("Owner is riding {}, boarding", vehicle);
            let task_ctx = Arc::clone(ctx);
            ctx.spawn_task("mount", async move {
                let result = board(&task_ctx, vehicle, &ticket, riding_other).await;
                if let Err(err) = result {
                    tracing::warn!("Boarding {} failed: {}", vehicle, err);
                }
                task_ctx
                    .with_state(|state| {
                        state.release_goal(&ticket);
                        state.mounting = false;
                    })
                    .await;
            });
        }
        Some(RideAction::Dismount) => {
            tracing::info!("Owner left their vehicle, dismounting");
            if let Err(err) = ctx.session.dismount().await {
                tracing::warn!("Dismount failed: {}", err);
            }
            ctx.with_state(|state| state.mounting = false).await;
        }
        None => {}
    }
}

async fn board(
    ctx: &AgentContext,
    vehicle: EntityId,
    ticket: &GoalTicket,
    riding_other: bool,
) -> Result<(), BehaviorError> {
    if riding_other {
        ctx.session
            .dismount()
            .await
            .map_err(BehaviorError::action("dismount"))?;
    }
    ctx.session
        .clear_controls()
        .await
        .map_err(BehaviorError::action("clear_controls"))?;

    ctx.wait_for(ticket, APPROACH_TIMEOUT, |state| {
        state
            .world
            .entity(vehicle)
            .is_some_and(|v| v.position.distance(&state.world.position) <= BOARDING_DISTANCE + BOARDING_SLACK)
    })
    .await?;

    if !ctx.sleep(SETTLE).await {
        return Err(BehaviorError::Aborted("controller stopped"));
    }
    let still_wanted = ctx
        .read(|state| {
            state.holds(ticket)
                && state.world.vehicle != Some(vehicle)
                && owner_vehicle(state) == Some(vehicle)
        })
        .await;
    if !still_wanted {
        return Err(BehaviorError::Aborted("owner moved on"));
    }

    ctx.session
        .mount(vehicle)
        .await
        .map_err(BehaviorError::action("mount"))?;
    tracing::info!("Mounted {}", vehicle);
    Ok(())
}
