mod bridge;
mod cli;
mod config_file;
mod logging;
mod mqtt_client;
mod supervisor;
mod udp_server;

use std::sync::Arc;

use clap::Parser;
use rumqttc::AsyncClient;
use tracing::{error, info};

use relay_core::config::SnapshotCell;

use crate::bridge::Bridge;
use crate::cli::Cli;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init(cli.log_level.as_deref());

    let initial = config_file::load(&cli.config)?;
    info!("starting, broker={} miniserver={}", initial.broker.host, initial.miniserver.miniserver_ip);

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(run(cli, initial))
}

async fn run(cli: Cli, initial: relay_core::config::SnapshotInner) -> Result<(), Box<dyn std::error::Error>> {
    let snapshot = Arc::new(SnapshotCell::new(initial));
    let current = snapshot.load();

    let mqtt_options = mqtt_client::build_options(&current);
    let (mqtt_client_handle, mut eventloop) = AsyncClient::new(mqtt_options, 64);
    mqtt_client::subscribe_all(&mqtt_client_handle, &current).await;

    let bridge = Arc::new(Bridge::new(cli.config.clone(), snapshot.clone(), mqtt_client_handle, cli.headless));

    bridge.resync_whitelist().await;

    let ws_bridge = bridge.clone();
    tokio::spawn(async move { ws_bridge.drain_websocket().await });

    let udp_port = current.udp.udp_in_port;
    let udp_bridge = bridge.clone();
    tokio::spawn(async move {
        match udp_server::bind(udp_port).await {
            Ok(socket) => loop {
                if let Some((_command, topic, value)) = udp_server::recv_command(&socket).await {
                    udp_bridge.handle_message(&topic, value.as_bytes()).await;
                }
            },
            Err(err) => error!("failed to bind udp listener on port {udp_port}: {err}"),
        }
    });

    bridge.start_ui().await;
    info!("mqtt relay started");

    loop {
        let message = mqtt_client::next_message(&mut eventloop).await;
        let bridge = bridge.clone();
        tokio::spawn(async move {
            bridge.handle_message(&message.topic, &message.payload).await;
        });
    }
}
