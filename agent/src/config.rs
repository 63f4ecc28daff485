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

use clap::Parser;
use hearth_common::Vec3;
use serde::{Deserialize, Serialize};
use serde_env_field::EnvField;
use std::net::{AddrParseError, IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Arguments {
    #[arg(
        short = 'c',
        long = "config",
        help = "Path to configuration file",
        default_value = "agent/config.yaml"
    )]
    pub config_file: String,

    #[arg(
        short = 'e',
        long = "env",
        help = "Path to environment file",
        default_value = "agent/.env"
    )]
    pub env_file: Option<String>,
}

impl Default for Arguments {
    fn default() -> Self {
        Self {
            config_file: "config.yaml".to_string(),
            env_file: Some(".env".to_string()),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Configuration {
    pub session: SessionConfig,

    pub owner: OwnerConfig,

    #[serde(default)]
    pub operator: OperatorConfig,

    #[serde(default)]
    pub relay: RelayConfig,

    #[serde(default)]
    pub supervisor: SupervisorConfig,

    #[serde(default)]
    pub behavior: BehaviorConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,
}

impl Configuration {
    pub fn load(path: &str) -> Result<Configuration, String> {
        tracing::debug!("Loading configuration from file: {}", path);
        let file =
            std::fs::File::open(path).map_err(|e| format!("Failed to open config file: {}", e))?;

        let conf = serde_yaml::from_reader(file)
            .map_err(|e| format!("Failed to parse config file: {}", e))?;

        Ok(conf)
    }

    /// Reject settings the agent cannot run with. This is the only fatal startup check.
    pub fn validate(&self) -> Result<(), String> {
        if self.session.host.is_empty() {
            return Err("session.host must not be empty".to_string());
        }
        if *self.session.port == 0 {
            return Err("session.port must not be zero".to_string());
        }
        if self.session.identity.is_empty() {
            return Err("session.identity must not be empty".to_string());
        }
        if self.owner.name.is_empty() {
            return Err("owner.name must not be empty".to_string());
        }
        if !(10..=30).contains(&self.supervisor.reconnect_delay) {
            return Err(format!(
                "supervisor.reconnect_delay must be between 10 and 30 seconds, got {}",
                self.supervisor.reconnect_delay
            ));
        }
        if self.behavior.wander_radius <= 0.0 {
            return Err("behavior.wander_radius must be positive".to_string());
        }
        if self.behavior.segment_length <= 5.0 {
            return Err("behavior.segment_length must be greater than 5".to_string());
        }
        self.schedule.validate()
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    pub host: EnvField<String>,
    pub port: EnvField<u16>,

    /// Name the agent logs in with
    pub identity: EnvField<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct OwnerConfig {
    /// Player the agent follows and takes chat commands from
    pub name: EnvField<String>,
}

/// External command channel restrictions
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct OperatorConfig {
    #[serde(default)]
    pub identity: Option<EnvField<String>>,

    #[serde(default)]
    pub channel: Option<EnvField<String>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub addr: EnvField<RelayBinding>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Seconds to wait before reconnecting after the session ends
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay: u64,
}

fn default_reconnect_delay() -> u64 {
    10
}

impl SupervisorConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay)
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: default_reconnect_delay(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorConfig {
    /// Anchor the agent wanders around while the owner is away
    #[serde(default)]
    pub safe_center: Vec3,

    #[serde(default = "default_wander_radius")]
    pub wander_radius: f64,

    /// Spacing of waypoints on long point-travel requests
    #[serde(default = "default_segment_length")]
    pub segment_length: f64,

    #[serde(default = "default_max_segments")]
    pub max_segments: u32,
}

fn default_wander_radius() -> f64 {
    16.0
}

fn default_segment_length() -> f64 {
    96.0
}

fn default_max_segments() -> u32 {
    16
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            safe_center: Vec3::default(),
            wander_radius: default_wander_radius(),
            segment_length: default_segment_length(),
            max_segments: default_max_segments(),
        }
    }
}

/// Loop periods. Ranged entries are re-rolled uniformly after every run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_mode_check_secs")]
    pub mode_check_secs: u64,
    #[serde(default = "default_wander_min_secs")]
    pub wander_min_secs: u64,
    #[serde(default = "default_wander_max_secs")]
    pub wander_max_secs: u64,
    #[serde(default = "default_idle_min_secs")]
    pub idle_min_secs: u64,
    #[serde(default = "default_idle_max_secs")]
    pub idle_max_secs: u64,
    #[serde(default = "default_survival_secs")]
    pub survival_secs: u64,
    #[serde(default = "default_frame_millis")]
    pub frame_millis: u64,
    #[serde(default = "default_status_secs")]
    pub status_secs: u64,
}

fn default_mode_check_secs() -> u64 {
    5
}
fn default_wander_min_secs() -> u64 {
    8
}
fn default_wander_max_secs() -> u64 {
    15
}
fn default_idle_min_secs() -> u64 {
    3
}
fn default_idle_max_secs() -> u64 {
    6
}
fn default_survival_secs() -> u64 {
    15
}
fn default_frame_millis() -> u64 {
    50
}
fn default_status_secs() -> u64 {
    60
}

impl ScheduleConfig {
    fn validate(&self) -> Result<(), String> {
        let periods = [
            ("mode_check_secs", self.mode_check_secs),
            ("wander_min_secs", self.wander_min_secs),
            ("idle_min_secs", self.idle_min_secs),
            ("survival_secs", self.survival_secs),
            ("frame_millis", self.frame_millis),
            ("status_secs", self.status_secs),
        ];
        if let Some((name, _)) = periods.iter().find(|(_, value)| *value == 0) {
            return Err(format!("schedule.{} must not be zero", name));
        }
        if self.wander_min_secs > self.wander_max_secs {
            return Err("schedule.wander_min_secs exceeds wander_max_secs".to_string());
        }
        if self.idle_min_secs > self.idle_max_secs {
            return Err("schedule.idle_min_secs exceeds idle_max_secs".to_string());
        }
        Ok(())
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            mode_check_secs: default_mode_check_secs(),
            wander_min_secs: default_wander_min_secs(),
            wander_max_secs: default_wander_max_secs(),
            idle_min_secs: default_idle_min_secs(),
            idle_max_secs: default_idle_max_secs(),
            survival_secs: default_survival_secs(),
            frame_millis: default_frame_millis(),
            status_secs: default_status_secs(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RelayBinding(SocketAddr);

impl RelayBinding {
    pub fn to_addr(&self) -> SocketAddr {
        self.0
    }
    pub fn to_ip(&self) -> IpAddr {
        self.0.ip()
    }
    pub fn to_port(&self) -> u16 {
        self.0.port()
    }
}

impl FromStr for RelayBinding {
    type Err = AddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        tracing::debug!("Parsing relay binding from string: {}", s);
        Ok(Self(SocketAddr::from_str(s)?))
    }
}

impl Default for RelayBinding {
    fn default() -> Self {
        Self(SocketAddr::V4(SocketAddrV4::new(
            Ipv4Addr::new(0, 0, 0, 0),
            3000,
        )))
    }
}

impl std::fmt::Display for RelayBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
