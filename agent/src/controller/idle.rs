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

//! Idle gestures. Cosmetic, and they keep the session from timing out for inactivity.

use super::context::AgentContext;
use crate::error::BehaviorError;
use rand::Rng;

/// Largest look nudge in radians
const MAX_NUDGE: f64 = 0.6;
const PITCH_LIMIT: f64 = 1.2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    Look { yaw: f64, pitch: f64 },
    Jump,
    Swing,
}

/// Roll a gesture. Looking around is twice as likely as the other two.
pub fn choose<R: Rng>(rng: &mut R, yaw: f64, pitch: f64) -> Gesture {
    match rng.random_range(0..4) {
        0 => Gesture::Jump,
        1 => Gesture::Swing,
        _ => Gesture::Look {
            yaw: yaw + rng.random_range(-MAX_NUDGE..=MAX_NUDGE),
            pitch: (pitch + rng.random_range(-MAX_NUDGE..=MAX_NUDGE) / 2.0)
                .clamp(-PITCH_LIMIT, PITCH_LIMIT),
        },
    }
}

pub async fn tick(ctx: &AgentContext) {
    if let Err(err) = gesture(ctx).await {
        tracing::debug!("Idle gesture failed: {}", err);
    }
}

async fn gesture(ctx: &AgentContext) -> Result<(), BehaviorError> {
    let (yaw, pitch) = ctx.read(|state| (state.world.yaw, state.world.pitch)).await;
    match ctx.with_rng(|rng| choose(rng, yaw, pitch)) {
        Gesture::Look { yaw, pitch } => ctx
            .session
            .turn(yaw, pitch)
            .await
            .map_err(BehaviorError::action("turn")),
        Gesture::Jump => ctx
            .session
            .jump()
            .await
            .map_err(BehaviorError::action("jump")),
        Gesture::Swing => ctx
            .session
            .swing_arm()
            .await
            .map_err(BehaviorError::action("swing_arm")),
    }
}
