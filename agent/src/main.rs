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
use hearth_agent::config::{Arguments, Configuration};
use hearth_agent::relay::{self, RelayState};
use hearth_agent::{
    ConnectionSupervisor, ControllerSettings, JsonLineConnector, LogStatusSink, SessionParams,
    StatusSink, StatusSinks, WatchStatusSink,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Relay commands waiting for the supervisor
const RELAY_QUEUE: usize = 32;

#[tokio::main]
async fn main() {
    // Load arguments from the command line
    let arguments: Arguments = Parser::parse();

    // Initialize tracing/logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .with_ansi(true)
        .init();

    // Load environment variables from .env file if specified
    if let Some(ref env_file) = arguments.env_file {
        if std::path::Path::new(env_file).exists() {
            tracing::debug!("Loading environment variables from file: {}", env_file);
            dotenv::from_filename(env_file).ok();
        }
    } else {
        // Try default .env file
        tracing::debug!("Loading environment variables from default file");
        dotenv::dotenv().ok();
    }

    // Load configuration from a file with environment variable substitution
    let config: Configuration = Configuration::load(&arguments.config_file)
        .inspect_err(|err| eprintln!("Configuration load error: {}", err))
        .expect("Unable to load configuration file");
    config
        .validate()
        .inspect_err(|err| eprintln!("Configuration invalid: {}", err))
        .expect("Invalid configuration");

    debug!("Configuration loaded: {:?}", config);
    info!("Starting Hearth Agent...");

    // Status goes to the log and to the relay's status route
    let watch_sink = WatchStatusSink::new();
    let status = Arc::new(StatusSinks::new(vec![
        Arc::new(watch_sink.clone()) as Arc<dyn StatusSink>,
        Arc::new(LogStatusSink) as Arc<dyn StatusSink>,
    ]));

    let (relay_tx, relay_rx) = mpsc::channel(RELAY_QUEUE);
    let supervisor = ConnectionSupervisor::new(
        Arc::new(JsonLineConnector::default()),
        SessionParams {
            host: config.session.host.as_str().to_string(),
            port: *config.session.port,
            identity: config.session.identity.as_str().to_string(),
        },
        ControllerSettings::from_config(&config),
        status,
        config.supervisor.reconnect_delay(),
        relay_rx,
    );
    let shutdown = supervisor.shutdown_token();

    let relay_listener = tokio::net::TcpListener::bind(config.relay.addr.to_addr())
        .await
        .expect("Unable to bind to the relay port");
    info!(
        "Relay listening on {} ({}:{})",
        *config.relay.addr,
        config.relay.addr.to_ip(),
        config.relay.addr.to_port()
    );

    let relay_state = RelayState::new(relay_tx, watch_sink.subscribe());
    let relay_shutdown = shutdown.clone();
    let relay_handle = tokio::spawn(async move {
        if let Err(e) = relay::serve(relay_listener, relay_state, relay_shutdown).await {
            tracing::error!("Relay server error: {}", e);
        }
    });

    let supervisor_handle = tokio::spawn(supervisor.run());

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
            shutdown.cancel();
        }
    });

    let _ = tokio::join!(relay_handle, supervisor_handle);
    info!("Hearth Agent stopped");
}
