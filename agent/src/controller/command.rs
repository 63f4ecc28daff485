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

//! Operator command interface
//!
//! Commands arrive either as chat from the owner or as [`CommandMessage`]s from the
//! relay. Unauthorized senders and unrecognized text are ignored without side effects.

use super::arbiter::{self, ModeRequest};
use super::context::{AgentContext, ControllerSettings};
use super::state::Mode;
use crate::error::CommandError;
use hearth_common::{CommandMessage, Vec3};

const GOTO_USAGE: &str = "goto <x> <y> <z>";

/// A recognized operator command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Mode(ModeRequest),
    Status,
}

/// What came of an operator message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Unauthorized or unrecognized; nothing happened
    Ignored,
    Replied(String),
    /// No session is connected
    Offline,
}

/// Parse operator text. `None` means the text is not a command at all.
pub fn parse(text: &str) -> Option<Result<Command, CommandError>> {
    let text = text.trim();
    let text = text.strip_prefix('!').unwrap_or(text);
    let mut words = text.split_whitespace();
    let verb = words.next()?.to_lowercase();
    let args: Vec<&str> = words.collect();

    let command = match verb.as_str() {
        "wander" => Command::Mode(ModeRequest::Wander),
        "stay" => Command::Mode(ModeRequest::Stay),
        "follow" => Command::Mode(ModeRequest::Follow),
        "come" => Command::Mode(ModeRequest::Come),
        "status" => Command::Status,
        "goto" => return Some(parse_goto(&args).map(|target| Command::Mode(ModeRequest::Goto(target)))),
        _ => return None,
    };
    Some(Ok(command))
}

fn parse_goto(args: &[&str]) -> Result<Vec3, CommandError> {
    let coordinates = args
        .iter()
        .map(|arg| arg.parse::<f64>().ok().filter(|value| value.is_finite()))
        .collect::<Option<Vec<_>>>();
    match coordinates.as_deref() {
        Some(&[x, y, z]) => Ok(Vec3::new(x, y, z)),
        _ => Err(CommandError::Usage(GOTO_USAGE)),
    }
}

/// Only the owner may command over chat
pub fn authorize_chat(settings: &ControllerSettings, sender: &str) -> bool {
    sender == settings.owner_name
}

/// Relay messages must come from the operator identity (the owner name when none is
/// configured) and, if one is configured, on the operator channel
pub fn authorize_relay(settings: &ControllerSettings, message: &CommandMessage) -> bool {
    let identity = settings
        .operator_identity
        .as_deref()
        .unwrap_or(&settings.owner_name);
    let channel_ok = settings
        .operator_channel
        .as_deref()
        .is_none_or(|channel| channel == message.channel_id);
    message.sender_identity == identity && channel_ok
}

/// Parse and run already-authorized command text
pub async fn handle(ctx: &AgentContext, text: &str) -> CommandOutcome {
    match parse(text) {
        None => CommandOutcome::Ignored,
        Some(Err(err)) => {
            tracing::info!("Rejected command {:?}: {}", text, err);
            CommandOutcome::Replied(err.to_string())
        }
        Some(Ok(command)) => CommandOutcome::Replied(execute(ctx, command).await),
    }
}

/// Run a command and describe the result for the sender
pub async fn execute(ctx: &AgentContext, command: Command) -> String {
    match command {
        Command::Status => ctx.publish_status().await.summary(),
        Command::Mode(request) => {
            let behavior = &ctx.settings.behavior;
            let result = ctx
                .with_state(|state| arbiter::apply_request(state, &request, behavior))
                .await;
            match result {
                Ok(transition) => {
                    tracing::info!("Command {:?} -> {}", request, transition.mode);
                    describe(transition.mode, &request)
                }
                Err(err) => {
                    tracing::info!("Command {:?} refused: {}", request, err);
                    err.to_string()
                }
            }
        }
    }
}

fn describe(mode: Mode, request: &ModeRequest) -> String {
    match request {
        ModeRequest::Goto(target) => format!("Heading to {}", target),
        ModeRequest::Come => "On my way".to_string(),
        _ => format!("Mode {}", mode),
    }
}
