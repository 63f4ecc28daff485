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

//! Operator command messages

use serde::{Deserialize, Serialize};

/// A message delivered by an external command channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandMessage {
    pub sender_identity: String,
    #[serde(default)]
    pub channel_id: String,
    pub text: String,
}

impl CommandMessage {
    pub fn new(sender: impl Into<String>, channel: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            sender_identity: sender.into(),
            channel_id: channel.into(),
            text: text.into(),
        }
    }
}
