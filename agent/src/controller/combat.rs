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

//! Combat subsystem
//!
//! Defends the owner while partnering. Runs on the frame loop; every failure is logged
//! and the next frame tries again.

use super::context::AgentContext;
use super::items;
use super::state::{AgentState, Mode};
use crate::error::BehaviorError;
use hearth_common::{EntityCategory, EntityRecord, EquipSlot};
use tokio::time::Instant;

/// Hostiles closer than this to both the owner and the agent are engaged
pub const ENGAGE_RADIUS: f64 = 8.0;

/// Strike at roughly chest height
const HIT_POINT_HEIGHT: f64 = 1.0;

/// Pick the hostile most threatening to the owner or the agent
pub fn select_target(state: &AgentState) -> Option<EntityRecord> {
    if state.mode != Mode::Partner {
        return None;
    }
    let owner = state.owner()?.position;
    let agent = state.world.position;

    state
        .world
        .entities
        .values()
        .filter(|entity| entity.category == EntityCategory::Hostile)
        .filter_map(|entity| {
            let to_owner = entity.position.distance(&owner);
            let to_agent = entity.position.distance(&agent);
            (to_owner < ENGAGE_RADIUS && to_agent < ENGAGE_RADIUS)
                .then_some((to_owner.min(to_agent), entity))
        })
        .min_by(|(a, _), (b, _)| a.total_cmp(b))
        .map(|(_, entity)| entity.clone())
}

/// Frame step: attack the best target, if any
pub async fn tick(ctx: &AgentContext) {
    let Some(target) = ctx.read(select_target).await else {
        return;
    };
    match strike(ctx, &target).await {
        Ok(true) => tracing::debug!("Struck {} {}", target.name, target.id),
        Ok(false) => {}
        Err(err) => tracing::warn!("Attack on {} failed: {}", target.id, err),
    }
}

/// Attack `target` once, respecting the shared attack cooldown.
///
/// Returns `Ok(false)` without touching the session while the cooldown is running.
pub async fn strike(ctx: &AgentContext, target: &EntityRecord) -> Result<bool, BehaviorError> {
    let claim = ctx
        .with_state(|state| {
            if !state.attack_clock.try_fire(Instant::now()) {
                return None;
            }
            let weapon = state
                .world
                .find_item(items::is_weapon)
                .map(|stack| stack.name.clone())
                .filter(|name| state.world.equipment.hand.as_ref() != Some(name));
            Some(weapon)
        })
        .await;
    let Some(weapon) = claim else {
        return Ok(false);
    };

    if let Some(weapon) = weapon {
        // Fall back to fighting unarmed
        if let Err(err) = ctx.session.equip(&weapon, EquipSlot::Hand).await {
            tracing::warn!("Could not equip {}: {}", weapon, err);
        }
    }

    ctx.session
        .look_at(target.position.offset(0.0, HIT_POINT_HEIGHT, 0.0))
        .await
        .map_err(BehaviorError::action("look_at"))?;
    ctx.session
        .attack(target.id)
        .await
        .map_err(BehaviorError::action("attack"))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::test_utils::{FakeSession, context_with};
    use hearth_common::{ActionRequest, EntityId, ItemStack, Vec3};
    use std::time::Duration;

    fn partner_state() -> AgentState {
        let mut state = AgentState::new("Alex", Vec3::default());
        state.world.entities.insert(
            EntityId(1),
            EntityRecord::new(EntityId(1), "Alex", Vec3::new(2.0, 0.0, 0.0), EntityCategory::Other),
        );
        state.set_mode(Mode::Partner);
        state
    }

    fn hostile(id: u32, position: Vec3) -> EntityRecord {
        EntityRecord::new(EntityId(id), "zombie", position, EntityCategory::Hostile)
    }

    #[test]
    fn test_select_nearest_threat() {
        let mut state = partner_state();
        for entity in [
            hostile(10, Vec3::new(6.0, 0.0, 0.0)),
            hostile(11, Vec3::new(3.0, 0.0, 1.0)),
            hostile(12, Vec3::new(-9.0, 0.0, 0.0)),
        ] {
            state.world.entities.insert(entity.id, entity);
        }
        state.world.entities.insert(
            EntityId(13),
            EntityRecord::new(EntityId(13), "cow", Vec3::new(1.0, 0.0, 0.0), EntityCategory::Animal),
        );

        assert_eq!(select_target(&state).map(|e| e.id), Some(EntityId(11)));
    }

    #[test]
    fn test_no_target_outside_partner() {
        let mut state = partner_state();
        state
            .world
            .entities
            .insert(EntityId(10), hostile(10, Vec3::new(1.0, 0.0, 0.0)));
        state.set_mode(Mode::Wander);
        assert!(select_target(&state).is_none());
    }

    #[test]
    fn test_requires_threat_to_both() {
        let mut state = partner_state();
        // Close to the owner at x=2 but 8.5 from the agent
        state
            .world
            .entities
            .insert(EntityId(10), hostile(10, Vec3::new(8.5, 0.0, 0.0)));
        assert!(select_target(&state).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_strike_rate_limited() {
        let session = FakeSession::new();
        let ctx = context_with(&session, partner_state());
        let target = hostile(10, Vec3::new(3.0, 0.0, 0.0));

        assert!(strike(&ctx, &target).await.unwrap());
        tokio::time::advance(Duration::from_millis(300)).await;
        assert!(!strike(&ctx, &target).await.unwrap());
        assert_eq!(session.count(|a| matches!(a, ActionRequest::Attack { .. })), 1);

        tokio::time::advance(Duration::from_millis(300)).await;
        assert!(strike(&ctx, &target).await.unwrap());
        assert_eq!(session.count(|a| matches!(a, ActionRequest::Attack { .. })), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_strike_equips_sword_and_faces_target() {
        let session = FakeSession::new();
        let mut state = partner_state();
        state.world.inventory = vec![ItemStack::new("bread", 2), ItemStack::new("stone_sword", 1)];
        let ctx = context_with(&session, state);

        strike(&ctx, &hostile(10, Vec3::new(3.0, 0.0, 0.0))).await.unwrap();
        assert_eq!(
            session.actions(),
            vec![
                ActionRequest::Equip { item: "stone_sword".into(), slot: EquipSlot::Hand },
                ActionRequest::LookAt { point: Vec3::new(3.0, 1.0, 0.0) },
                ActionRequest::Attack { target: EntityId(10) },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_equip_failure_still_attacks() {
        let session = FakeSession::new();
        session.fail_on(|a| matches!(a, ActionRequest::Equip { .. }));
        let mut state = partner_state();
        state.world.inventory = vec![ItemStack::new("iron_sword", 1)];
        let ctx = context_with(&session, state);

        assert!(strike(&ctx, &hostile(10, Vec3::new(3.0, 0.0, 0.0))).await.unwrap());
        assert_eq!(session.count(|a| matches!(a, ActionRequest::Attack { .. })), 1);
    }
}
