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

use async_trait::async_trait;
use hearth_agent::config::BehaviorConfig;
use hearth_agent::{
    AgentSession, CommandOutcome, ConnectionSupervisor, Controller, ControllerSettings,
    Navigator, RelayCommand, SessionConnector, SessionEnd, SessionError, SessionHandle,
    SessionParams, WatchStatusSink,
};
use hearth_common::{
    ActionReply, ActionRequest, CommandMessage, EntityCategory, EntityId, EntityRecord,
    Equipment, FurnaceState, Goal, ItemStack, PathStatus, Vec3, WorldEvent,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant, sleep};

const AGENT: EntityId = EntityId(1);
const OWNER: EntityId = EntityId(2);
const SAFE_CENTER: Vec3 = Vec3::new(100.0, 64.0, 100.0);
const FURNACE: Vec3 = Vec3::new(2.0, 64.0, 0.0);

/// World fake: records actions and goals, finds a furnace next to the spawn point
#[derive(Clone, Default)]
struct FakeWorld {
    actions: Arc<Mutex<Vec<ActionRequest>>>,
    goals: Arc<Mutex<Vec<(u64, Goal)>>>,
}

impl FakeWorld {
    fn count(&self, matcher: impl Fn(&ActionRequest) -> bool) -> usize {
        self.actions.lock().unwrap().iter().filter(|a| matcher(a)).count()
    }

    fn last_goal(&self) -> Option<Goal> {
        self.goals.lock().unwrap().last().map(|(_, goal)| goal.clone())
    }

    fn last_generation(&self) -> u64 {
        self.goals.lock().unwrap().last().map_or(0, |(generation, _)| *generation)
    }

    fn goals(&self) -> Vec<Goal> {
        self.goals.lock().unwrap().iter().map(|(_, goal)| goal.clone()).collect()
    }
}

#[async_trait]
impl AgentSession for FakeWorld {
    async fn perform(&self, action: ActionRequest) -> Result<ActionReply, SessionError> {
        self.actions.lock().unwrap().push(action.clone());
        Ok(match action {
            ActionRequest::FindBlock { block, .. } if block == "furnace" => ActionReply::Block {
                position: Some(FURNACE),
            },
            ActionRequest::FindBlock { .. } => ActionReply::Block { position: None },
            ActionRequest::OpenFurnace { .. } => ActionReply::Furnace {
                state: FurnaceState::default(),
            },
            ActionRequest::FurnaceTakeOutput => ActionReply::Taken {
                item: Some(ItemStack::new("cooked_beef", 1)),
            },
            _ => ActionReply::Done,
        })
    }
}

#[async_trait]
impl Navigator for FakeWorld {
    async fn set_goal(&self, generation: u64, goal: Goal) -> Result<(), SessionError> {
        self.goals.lock().unwrap().push((generation, goal));
        Ok(())
    }
}

fn settings() -> ControllerSettings {
    ControllerSettings {
        behavior: BehaviorConfig {
            safe_center: SAFE_CENTER,
            ..Default::default()
        },
        ..ControllerSettings::new("Alex")
    }
}

struct Running {
    world: FakeWorld,
    events: mpsc::Sender<WorldEvent>,
    commands: mpsc::Sender<RelayCommand>,
    run: tokio::task::JoinHandle<SessionEnd>,
}

impl Running {
    async fn send(&self, event: WorldEvent) {
        self.events.send(event).await.unwrap();
    }

    async fn command(&self, text: &str) -> CommandOutcome {
        relay(&self.commands, text).await
    }
}

async fn relay(commands: &mpsc::Sender<RelayCommand>, text: &str) -> CommandOutcome {
    let (command, reply) = RelayCommand::new(CommandMessage::new("Alex", "", text));
    commands.send(command).await.unwrap();
    reply.await.unwrap_or(CommandOutcome::Offline)
}

fn start_controller() -> Running {
    let world = FakeWorld::default();
    let (events, event_rx) = mpsc::channel(64);
    let (commands, command_rx) = mpsc::channel(8);
    let handle = SessionHandle {
        session: Arc::new(world.clone()),
        navigator: Arc::new(world.clone()),
        events: event_rx,
    };
    let controller = Controller::new(
        handle,
        settings(),
        Arc::new(WatchStatusSink::new()),
        StdRng::seed_from_u64(9),
    );
    let run = tokio::spawn(controller.run(command_rx));
    Running {
        world,
        events,
        commands,
        run,
    }
}

fn spawned_at(position: Vec3) -> WorldEvent {
    WorldEvent::Spawned {
        entity: AGENT,
        position,
    }
}

fn owner_at(position: Vec3) -> WorldEvent {
    WorldEvent::EntityUpdate {
        entity: EntityRecord::new(OWNER, "Alex", position, EntityCategory::Other),
    }
}

fn moved_to(position: Vec3, food: u8) -> WorldEvent {
    WorldEvent::SelfUpdate {
        position,
        yaw: 0.0,
        pitch: 0.0,
        food,
        vehicle: None,
    }
}

fn mode_of(outcome: CommandOutcome) -> String {
    match outcome {
        CommandOutcome::Replied(summary) => summary
            .split_whitespace()
            .nth(1)
            .unwrap_or_default()
            .to_string(),
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_owner_going_offline_switches_to_wander() {
    let running = start_controller();
    running.send(owner_at(Vec3::new(3.0, 64.0, 0.0))).await;
    running.send(spawned_at(Vec3::new(0.0, 64.0, 0.0))).await;
    assert_eq!(mode_of(running.command("status").await), "Partner");

    running.send(WorldEvent::EntityRemoved { id: OWNER }).await;
    sleep(Duration::from_secs(5) + Duration::from_millis(100)).await;

    assert_eq!(mode_of(running.command("status").await), "Wander");
    assert!(running.world.goals().contains(&Goal::ReachPoint { target: SAFE_CENTER }));
}

#[tokio::test(start_paused = true)]
async fn test_no_path_falls_back_to_column_goal() {
    let running = start_controller();
    running.send(spawned_at(Vec3::new(0.0, 64.0, 0.0))).await;

    let reply = running.command("goto 10 64 -5").await;
    assert_eq!(reply, CommandOutcome::Replied("Heading to (10.0, 64.0, -5.0)".to_string()));
    assert_eq!(
        running.world.last_goal(),
        Some(Goal::ReachPoint { target: Vec3::new(10.0, 64.0, -5.0) })
    );

    let generation = running.world.last_generation();
    running.send(WorldEvent::Path { generation, status: PathStatus::NoPath }).await;
    assert_eq!(mode_of(running.command("status").await), "Goto");
    assert_eq!(
        running.world.last_goal(),
        Some(Goal::ReachAreaXz { x: 10.0, z: -5.0, radius: 2.0 })
    );
}

#[tokio::test(start_paused = true)]
async fn test_late_no_path_for_replaced_goal_is_ignored() {
    let running = start_controller();
    running.send(spawned_at(Vec3::new(0.0, 64.0, 0.0))).await;
    assert_eq!(mode_of(running.command("status").await), "Wander");
    let stale = running.world.last_generation();

    running.command("goto 10 64 -5").await;
    let current = running.world.last_generation();
    assert!(current > stale);

    // Arrives after the Goto replaced the wander goal
    running.send(WorldEvent::Path { generation: stale, status: PathStatus::NoPath }).await;
    assert_eq!(mode_of(running.command("status").await), "Goto");
    assert_eq!(
        running.world.last_goal(),
        Some(Goal::ReachPoint { target: Vec3::new(10.0, 64.0, -5.0) })
    );

    running.send(WorldEvent::Path { generation: current, status: PathStatus::NoPath }).await;
    running.command("status").await;
    assert_eq!(
        running.world.last_goal(),
        Some(Goal::ReachAreaXz { x: 10.0, z: -5.0, radius: 2.0 })
    );
}

#[tokio::test(start_paused = true)]
async fn test_goto_arrival_within_one_frame() {
    let running = start_controller();
    running.send(spawned_at(Vec3::new(0.0, 64.0, 0.0))).await;
    running.command("goto 10 64 -5").await;

    running.send(moved_to(Vec3::new(9.0, 64.0, -4.0), 20)).await;
    sleep(Duration::from_millis(60)).await;
    assert_eq!(mode_of(running.command("status").await), "Wander");
}

#[tokio::test(start_paused = true)]
async fn test_automatic_switching_leaves_goto_alone() {
    let running = start_controller();
    running.send(spawned_at(Vec3::new(0.0, 64.0, 0.0))).await;
    running.command("goto 50 64 50").await;

    running.send(owner_at(Vec3::new(3.0, 64.0, 0.0))).await;
    sleep(Duration::from_secs(11)).await;
    assert_eq!(mode_of(running.command("status").await), "Goto");
}

#[tokio::test(start_paused = true)]
async fn test_attacks_are_rate_limited() {
    let running = start_controller();
    running.send(owner_at(Vec3::new(2.0, 64.0, 0.0))).await;
    running.send(spawned_at(Vec3::new(0.0, 64.0, 0.0))).await;
    running
        .send(WorldEvent::EntityUpdate {
            entity: EntityRecord::new(
                EntityId(30),
                "zombie",
                Vec3::new(3.0, 64.0, 1.0),
                EntityCategory::Hostile,
            ),
        })
        .await;

    // Twenty frames, each of which wants to attack
    sleep(Duration::from_millis(1000)).await;
    assert_eq!(
        running
            .world
            .count(|a| matches!(a, ActionRequest::Attack { target: EntityId(30) })),
        2
    );
}

#[tokio::test(start_paused = true)]
async fn test_session_error_ends_run() {
    let running = start_controller();
    running
        .send(WorldEvent::Error {
            message: "protocol violation".into(),
        })
        .await;
    assert_eq!(
        running.run.await.unwrap(),
        SessionEnd::Error("protocol violation".to_string())
    );
}

/// Connector handing out fresh fake worlds, keeping their event senders
#[derive(Clone, Default)]
struct FakeConnector {
    sessions: Arc<Mutex<Vec<(FakeWorld, mpsc::Sender<WorldEvent>, Instant)>>>,
}

impl FakeConnector {
    fn connections(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    fn session(&self, index: usize) -> (FakeWorld, mpsc::Sender<WorldEvent>, Instant) {
        self.sessions.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl SessionConnector for FakeConnector {
    async fn connect(&self, _params: &SessionParams) -> Result<SessionHandle, SessionError> {
        let world = FakeWorld::default();
        let (events, event_rx) = mpsc::channel(64);
        self.sessions
            .lock()
            .unwrap()
            .push((world.clone(), events, Instant::now()));
        Ok(SessionHandle {
            session: Arc::new(world.clone()),
            navigator: Arc::new(world),
            events: event_rx,
        })
    }
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_mid_cook_restarts_fresh_controller() {
    let connector = FakeConnector::default();
    let (commands, command_rx) = mpsc::channel(8);
    let supervisor = ConnectionSupervisor::new(
        Arc::new(connector.clone()),
        SessionParams {
            host: "localhost".to_string(),
            port: 25570,
            identity: "Hearth".to_string(),
        },
        settings(),
        Arc::new(WatchStatusSink::new()),
        Duration::from_secs(10),
        command_rx,
    );
    let shutdown = supervisor.shutdown_token();
    let supervisor = tokio::spawn(supervisor.run());

    while connector.connections() < 1 {
        sleep(Duration::from_millis(10)).await;
    }
    let (world, events, _) = connector.session(0);
    events.send(spawned_at(Vec3::new(0.0, 64.0, 0.0))).await.unwrap();
    events.send(moved_to(Vec3::new(0.0, 64.0, 0.0), 12)).await.unwrap();
    events
        .send(WorldEvent::Inventory {
            items: vec![ItemStack::new("beef", 4), ItemStack::new("coal", 2)],
            equipment: Equipment::default(),
        })
        .await
        .unwrap();

    // First survival tick at 15s starts cooking; the dwell runs to 25s
    sleep(Duration::from_secs(20)).await;
    assert_eq!(world.count(|a| matches!(a, ActionRequest::FurnacePutInput { .. })), 1);
    assert_eq!(world.count(|a| matches!(a, ActionRequest::FurnaceTakeOutput)), 0);

    events
        .send(WorldEvent::Disconnected {
            reason: "connection reset".into(),
        })
        .await
        .unwrap();
    let disconnected_at = Instant::now();
    sleep(Duration::from_secs(1)).await;
    assert_eq!(relay(&commands, "status").await, CommandOutcome::Offline);

    while connector.connections() < 2 {
        sleep(Duration::from_millis(100)).await;
    }
    let (_, _, reconnected_at) = connector.session(1);
    assert!(reconnected_at - disconnected_at >= Duration::from_secs(10));
    assert_eq!(mode_of(relay(&commands, "status").await), "None");

    // The abandoned cook never resumes
    sleep(Duration::from_secs(15)).await;
    assert_eq!(world.count(|a| matches!(a, ActionRequest::FurnaceTakeOutput)), 0);

    shutdown.cancel();
    tokio_test::assert_ok!(supervisor.await);
}
