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

//! Survival subsystem: eating, hunting, cooking and armor
//!
//! Each step is best effort. A failed step is logged and the remaining steps still run;
//! the next survival tick starts over from fresh state.

use super::combat;
use super::context::AgentContext;
use super::items;
use super::state::{AgentState, GoalOwner, GoalTicket};
use crate::error::BehaviorError;
use hearth_common::{EntityCategory, EntityId, EquipSlot, Goal, Vec3};
use std::sync::Arc;
use std::time::Duration;

/// Eat while food is below this
pub const EAT_BELOW: u8 = 18;

/// Hunt and cook while food is at or below this
pub const FORAGE_AT_OR_BELOW: u8 = 18;

pub const HUNT_RADIUS: f64 = 30.0;
const HUNT_ESCAPE_RADIUS: f64 = 40.0;
const HUNT_STRIKE_RANGE: f64 = 3.0;
const HUNT_FOLLOW_DISTANCE: f64 = 1.5;
const HUNT_PERIOD: Duration = Duration::from_millis(500);

/// Furnaces and crafting tables farther than this are not used
pub const STATION_RADIUS: f64 = 8.0;
const FURNACE_REACH: f64 = 3.0;
const FURNACE_APPROACH_TIMEOUT: Duration = Duration::from_secs(20);
pub const COOK_DWELL: Duration = Duration::from_secs(10);

/// Slow survival tick. Skipped while travelling.
pub async fn tick(ctx: &Arc<AgentContext>) {
    let (mode, food) = ctx.read(|state| (state.mode, state.world.food)).await;
    if mode.is_travelling() {
        tracing::debug!("Survival skipped while in {}", mode);
        return;
    }

    report("eat", eat(ctx).await);
    if food <= FORAGE_AT_OR_BELOW {
        report("hunt", start_hunt(ctx).await);
        report("cook", cook(ctx).await);
    }
    report("craft armor", craft_armor(ctx).await);
}

fn report(step: &str, result: Result<bool, BehaviorError>) {
    match result {
        Ok(true) => tracing::debug!("Survival step {} done", step),
        Ok(false) => {}
        Err(err @ BehaviorError::Aborted(_)) => {
            tracing::debug!("Survival step {} abandoned: {}", step, err)
        }
        Err(err) => tracing::warn!("Survival step {} failed: {}", step, err),
    }
}

/// Eat something if hungry. Prepared food first, raw meat only as a fallback.
pub async fn eat(ctx: &AgentContext) -> Result<bool, BehaviorError> {
    let food = ctx
        .with_state(|state| {
            if state.eating || state.mode.is_travelling() || state.world.food >= EAT_BELOW {
                return None;
            }
            let item = state
                .world
                .find_item(items::is_prepared_food)
                .or_else(|| state.world.find_item(items::is_raw_meat))?
                .name
                .clone();
            state.eating = true;
            Some(item)
        })
        .await;
    let Some(food) = food else {
        return Ok(false);
    };

    tracing::info!("Eating {}", food);
    let result = consume(ctx, &food).await;
    ctx.with_state(|state| state.eating = false).await;
    result.map(|_| true)
}

async fn consume(ctx: &AgentContext, food: &str) -> Result<(), BehaviorError> {
    ctx.session
        .equip(food, EquipSlot::Hand)
        .await
        .map_err(BehaviorError::action("equip"))?;
    ctx.session
        .consume()
        .await
        .map_err(BehaviorError::action("consume"))
}

fn nearest_prey(state: &AgentState) -> Option<EntityId> {
    let position = state.world.position;
    state
        .world
        .entities
        .values()
        .filter(|entity| entity.category == EntityCategory::Animal)
        .map(|entity| (entity.position.distance(&position), entity.id))
        .filter(|(distance, _)| *distance <= HUNT_RADIUS)
        .min_by(|(a, _), (b, _)| a.total_cmp(b))
        .map(|(_, id)| id)
}

/// Chase the nearest animal. The chase itself runs as a separate task.
pub async fn start_hunt(ctx: &Arc<AgentContext>) -> Result<bool, BehaviorError> {
    let claim = ctx
        .with_state(|state| {
            if state.hunting.is_some() || state.world.food > FORAGE_AT_OR_BELOW {
                return None;
            }
            let prey = nearest_prey(state)?;
            let ticket = state.claim_goal(
                GoalOwner::Hunt,
                Goal::FollowEntity {
                    entity: prey,
                    range: HUNT_FOLLOW_DISTANCE,
                },
            )?;
            state.hunting = Some(prey);
            Some((prey, ticket))
        })
        .await;
    let Some((prey, ticket)) = claim else {
        return Ok(false);
    };

    tracing::info!("Hunting {}", prey);
    let task_ctx = Arc::clone(ctx);
    ctx.spawn_task("hunt", async move { hunt(&task_ctx, prey, ticket).await });
    Ok(true)
}

enum HuntStep {
    Strike(hearth_common::EntityRecord),
    Chase,
    Stop(&'static str),
}

async fn hunt(ctx: &AgentContext, prey: EntityId, ticket: GoalTicket) {
    loop {
        let step = ctx
            .read(|state| {
                if !state.holds(&ticket) {
                    return HuntStep::Stop("goal superseded");
                }
                if state.world.food > FORAGE_AT_OR_BELOW {
                    return HuntStep::Stop("no longer hungry");
                }
                let Some(target) = state.world.entity(prey) else {
                    return HuntStep::Stop("target lost");
                };
                let distance = state.world.position.distance(&target.position);
                if distance > HUNT_ESCAPE_RADIUS {
                    HuntStep::Stop("target escaped")
                } else if distance <= HUNT_STRIKE_RANGE {
                    HuntStep::Strike(target.clone())
                } else {
                    HuntStep::Chase
                }
            })
            .await;

        match step {
            HuntStep::Stop(reason) => {
                tracing::info!("Hunt for {} over: {}", prey, reason);
                break;
            }
            HuntStep::Strike(target) => {
                if let Err(err) = combat::strike(ctx, &target).await {
                    tracing::warn!("Strike on {} failed: {}", prey, err);
                }
            }
            HuntStep::Chase => {}
        }
        if !ctx.sleep(HUNT_PERIOD).await {
            return;
        }
    }

    ctx.with_state(|state| {
        state.release_goal(&ticket);
        if state.hunting == Some(prey) {
            state.hunting = None;
        }
    })
    .await;
}

struct Pantry {
    raw: String,
    fuel: Option<String>,
    building_blocks: u32,
}

/// Cook one piece of raw meat at a nearby furnace
pub async fn cook(ctx: &AgentContext) -> Result<bool, BehaviorError> {
    let pantry = ctx
        .read(|state| {
            if state.cooking || state.world.food > FORAGE_AT_OR_BELOW {
                return None;
            }
            Some(Pantry {
                raw: state.world.find_item(items::is_raw_meat)?.name.clone(),
                fuel: state
                    .world
                    .find_item(items::is_fuel)
                    .map(|stack| stack.name.clone()),
                building_blocks: state.world.count_item(items::BUILDING_BLOCK),
            })
        })
        .await;
    let Some(pantry) = pantry else {
        return Ok(false);
    };

    let furnace = ctx
        .session
        .find_block("furnace", STATION_RADIUS)
        .await
        .map_err(BehaviorError::action("find_block"))?;
    let Some(furnace) = furnace else {
        // Crafted furnaces are left for the operator to place
        craft_furnace(ctx, pantry.building_blocks).await?;
        return Ok(false);
    };

    let ticket = ctx
        .with_state(|state| {
            if state.cooking {
                return None;
            }
            let ticket = state.claim_goal(
                GoalOwner::Cook,
                Goal::ReachAreaXz {
                    x: furnace.x,
                    z: furnace.z,
                    radius: FURNACE_REACH - 1.0,
                },
            )?;
            state.cooking = true;
            Some(ticket)
        })
        .await
        .ok_or(BehaviorError::Aborted("goal unavailable"))?;

    tracing::info!("Cooking {} at furnace {}", pantry.raw, furnace);
    let result = tend_furnace(ctx, &ticket, furnace, &pantry).await;
    ctx.with_state(|state| {
        state.release_goal(&ticket);
        state.cooking = false;
    })
    .await;
    result.map(|_| true)
}

async fn tend_furnace(
    ctx: &AgentContext,
    ticket: &GoalTicket,
    furnace: Vec3,
    pantry: &Pantry,
) -> Result<(), BehaviorError> {
    ctx.wait_for(ticket, FURNACE_APPROACH_TIMEOUT, |state| {
        state.world.position.distance(&furnace) <= FURNACE_REACH
    })
    .await?;

    let contents = ctx
        .session
        .open_furnace(furnace)
        .await
        .map_err(BehaviorError::action("open_furnace"))?;
    let result = load_and_collect(ctx, ticket, &contents, pantry).await;
    if let Err(err) = ctx.session.close_furnace().await {
        tracing::warn!("Could not close furnace: {}", err);
    }
    result
}

async fn load_and_collect(
    ctx: &AgentContext,
    ticket: &GoalTicket,
    contents: &hearth_common::FurnaceState,
    pantry: &Pantry,
) -> Result<(), BehaviorError> {
    if contents.fuel.is_none() {
        let fuel = pantry
            .fuel
            .as_deref()
            .ok_or(BehaviorError::Aborted("no fuel"))?;
        ctx.session
            .furnace_put_fuel(fuel, 1)
            .await
            .map_err(BehaviorError::action("furnace_put_fuel"))?;
    }
    if contents.input.is_none() {
        ctx.session
            .furnace_put_input(&pantry.raw, 1)
            .await
            .map_err(BehaviorError::action("furnace_put_input"))?;
    }

    if !ctx.sleep(COOK_DWELL).await {
        return Err(BehaviorError::Aborted("controller stopped"));
    }
    if !ctx.read(|state| state.holds(ticket)).await {
        return Err(BehaviorError::Aborted("goal superseded"));
    }

    let output = ctx
        .session
        .furnace_take_output()
        .await
        .map_err(BehaviorError::action("furnace_take_output"))?;
    match output {
        Some(stack) => tracing::info!("Collected {} x{}", stack.name, stack.count),
        None => tracing::debug!("Furnace had nothing to collect"),
    }
    Ok(())
}

async fn craft_furnace(ctx: &AgentContext, building_blocks: u32) -> Result<(), BehaviorError> {
    if building_blocks < items::FURNACE_COST {
        return Ok(());
    }
    let Some(table) = ctx
        .session
        .find_block("crafting_table", STATION_RADIUS)
        .await
        .map_err(BehaviorError::action("find_block"))?
    else {
        return Ok(());
    };
    ctx.session
        .craft("furnace", 1, Some(table))
        .await
        .map_err(BehaviorError::action("craft"))?;
    tracing::info!("Crafted a furnace; it needs to be placed by hand");
    Ok(())
}

/// Craft and wear a chestplate when the materials and a crafting table are at hand
pub async fn craft_armor(ctx: &AgentContext) -> Result<bool, BehaviorError> {
    let piece = ctx
        .read(|state| {
            if state.world.equipment.torso.is_some() {
                return None;
            }
            items::CHESTPLATES
                .iter()
                .find(|(material, _)| state.world.count_item(material) >= items::CHESTPLATE_COST)
                .map(|(_, piece)| *piece)
        })
        .await;
    let Some(piece) = piece else {
        return Ok(false);
    };

    let Some(table) = ctx
        .session
        .find_block("crafting_table", STATION_RADIUS)
        .await
        .map_err(BehaviorError::action("find_block"))?
    else {
        return Ok(false);
    };

    ctx.session
        .craft(piece, 1, Some(table))
        .await
        .map_err(BehaviorError::action("craft"))?;
    ctx.session
        .equip(piece, EquipSlot::Torso)
        .await
        .map_err(BehaviorError::action("equip"))?;
    tracing::info!("Crafted and equipped {}", piece);
    Ok(true)
}
