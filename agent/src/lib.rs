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

//! Hearth Agent Library
//!
//! Behavior controller for an autonomous companion agent: a mode state machine with a
//! goal arbiter, combat, survival and social subsystems, operator commands, and the
//! connection supervisor that keeps a session alive.

pub mod config;
pub mod controller;
pub mod error;
pub mod relay;
pub mod session;
pub mod status;
pub mod supervisor;

// Re-export commonly used types
pub use controller::{CommandOutcome, Controller, ControllerSettings, Mode, RelayCommand};
pub use error::{BehaviorError, CommandError, SessionEnd, SessionError};
pub use session::{AgentSession, JsonLineConnector, Navigator, SessionConnector, SessionHandle, SessionParams};
pub use status::{LogStatusSink, StatusSink, StatusSinks, WatchStatusSink};
pub use supervisor::ConnectionSupervisor;
