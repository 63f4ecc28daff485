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

//! Status snapshot sinks

use async_trait::async_trait;
use hearth_common::StatusSnapshot;
use tokio::sync::watch;

/// Receives status snapshots. Delivery and display are up to the sink.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatusSink: Send + Sync {
    async fn publish(&self, snapshot: StatusSnapshot);
}

/// Keeps the latest snapshot for the relay's status route
#[derive(Debug, Clone)]
pub struct WatchStatusSink {
    sender: watch::Sender<Option<StatusSnapshot>>,
}

impl WatchStatusSink {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self { sender }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<StatusSnapshot>> {
        self.sender.subscribe()
    }

    pub fn latest(&self) -> Option<StatusSnapshot> {
        self.sender.borrow().clone()
    }
}

impl Default for WatchStatusSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StatusSink for WatchStatusSink {
    async fn publish(&self, snapshot: StatusSnapshot) {
        // send_replace keeps the value even with no receiver attached
        self.sender.send_replace(Some(snapshot));
    }
}

/// Writes every snapshot to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogStatusSink;

#[async_trait]
impl StatusSink for LogStatusSink {
    async fn publish(&self, snapshot: StatusSnapshot) {
        tracing::info!("Status: {}", snapshot.summary());
    }
}

/// Fans a snapshot out to several sinks
pub struct StatusSinks(Vec<std::sync::Arc<dyn StatusSink>>);

impl StatusSinks {
    pub fn new(sinks: Vec<std::sync::Arc<dyn StatusSink>>) -> Self {
        Self(sinks)
    }
}

#[async_trait]
impl StatusSink for StatusSinks {
    async fn publish(&self, snapshot: StatusSnapshot) {
        for sink in &self.0 {
            sink.publish(snapshot.clone()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use hearth_common::Vec3;
    use std::sync::Arc;

    fn snapshot(mode: &str) -> StatusSnapshot {
        StatusSnapshot {
            mode: mode.to_string(),
            position: Vec3::new(1.0, 64.0, 2.0),
            biome: Some("plains".to_string()),
            time_of_day: Some(6000),
            travel: None,
            captured_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_watch_sink_keeps_latest() {
        let sink = WatchStatusSink::new();
        assert!(sink.latest().is_none());

        sink.publish(snapshot("Wander")).await;
        sink.publish(snapshot("Partner")).await;
        assert_eq!(sink.latest().unwrap().mode, "Partner");
    }

    #[tokio::test]
    async fn test_fan_out_reaches_every_sink() {
        let mut first = MockStatusSink::new();
        first.expect_publish().times(1).return_const(());
        let mut second = MockStatusSink::new();
        second
            .expect_publish()
            .withf(|snapshot| snapshot.mode == "Stay")
            .times(1)
            .return_const(());

        let sinks = StatusSinks::new(vec![
            Arc::new(first) as Arc<dyn StatusSink>,
            Arc::new(second) as Arc<dyn StatusSink>,
        ]);
        sinks.publish(snapshot("Stay")).await;
    }
}
