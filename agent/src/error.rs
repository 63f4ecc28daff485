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

//! Error types for the agent controller

use hearth_common::ActionFault;
use thiserror::Error;

/// Typed failures surfaced by the session or the navigator
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Session busy")]
    Busy,

    #[error("Session disconnected")]
    Disconnected,

    #[error("No path to goal")]
    NoPath,

    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl From<ActionFault> for SessionError {
    fn from(fault: ActionFault) -> Self {
        match fault {
            ActionFault::NotFound { what } => SessionError::NotFound(what),
            ActionFault::Busy => SessionError::Busy,
            ActionFault::Disconnected => SessionError::Disconnected,
            ActionFault::NoPath => SessionError::NoPath,
            ActionFault::Failed { message } => SessionError::Protocol(message),
        }
    }
}

/// Failure of one behavior step. Never escapes the tick that produced it.
#[derive(Debug, Error)]
pub enum BehaviorError {
    #[error("{action} failed: {source}")]
    ActionFailed {
        action: &'static str,
        #[source]
        source: SessionError,
    },

    #[error("Planning failed")]
    PlanningFailed,

    #[error("Step aborted: {0}")]
    Aborted(&'static str),
}

impl BehaviorError {
    pub fn action(action: &'static str) -> impl FnOnce(SessionError) -> BehaviorError {
        move |source| BehaviorError::ActionFailed { action, source }
    }
}

/// Operator command rejections, reported back to the sender
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("{0} is not online")]
    OwnerOffline(String),
}

/// Why a controller run finished. Every variant leads to a reconnect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionEnd {
    #[error("Disconnected: {0}")]
    Disconnected(String),

    #[error("Kicked: {0}")]
    Kicked(String),

    #[error("Session error: {0}")]
    Error(String),

    #[error("Controller fault: {0}")]
    Faulted(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_conversion() {
        assert_eq!(SessionError::from(ActionFault::NoPath), SessionError::NoPath);
        assert_eq!(
            SessionError::from(ActionFault::NotFound {
                what: "furnace".into()
            }),
            SessionError::NotFound("furnace".into())
        );
    }

    #[test]
    fn test_behavior_error_display() {
        let err = BehaviorError::action("attack")(SessionError::Busy);
        assert_eq!(err.to_string(), "attack failed: Session busy");
    }
}
