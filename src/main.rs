//! Lorabridge - event and command bridge for LoRa concentrator daemons
//!
//! Connects to a running concentratord instance over its event and
//! command sockets and republishes uplink frames, gateway statistics and
//! downlink acknowledgements on application queues.

mod bridge;
mod common;
mod config;
mod gw;
mod protocol;

use anyhow::Result;
use tokio::signal;
use tracing::{error, info, warn};

use bridge::Backend;
use config::{env::get_config_path, load_and_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Lorabridge v{} starting...", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_path = get_config_path();
    info!("Loading configuration from {}...", config_path);

    let config = load_and_validate(&config_path).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        error!(
            "Please ensure {} exists and is properly formatted.",
            config_path
        );
        error!("See lorabridge.conf.example for reference.");
        e
    })?;

    info!("Configuration loaded successfully");
    info!("  Event socket: {}", config.concentratord.event_url);
    info!("  Command socket: {}", config.concentratord.command_url);
    info!("  CRC check: {}", config.concentratord.crc_check());

    // ============================================================
    // Connect to the concentrator daemon
    // ============================================================
    let (backend, queues) = Backend::new(&config.concentratord).await?;
    info!("Gateway {} ready", backend.gateway_id());

    let bridge::EventQueues {
        mut uplink_rx,
        mut stats_rx,
        mut ack_rx,
        mut subscribe_rx,
    } = queues;

    // ============================================================
    // Spawn queue consumer tasks
    // ============================================================

    // Task 1: uplink frames
    let mut uplink_task = tokio::spawn(async move {
        while let Some(frame) = uplink_rx.recv().await {
            let frequency = frame
                .tx_info
                .as_ref()
                .map(|tx_info| tx_info.frequency)
                .unwrap_or_default();
            info!(
                frequency,
                payload_len = frame.phy_payload.len(),
                "Uplink frame"
            );
        }
        info!("Uplink consumer ended");
    });

    // Task 2: gateway statistics
    let mut stats_task = tokio::spawn(async move {
        while let Some(stats) = stats_rx.recv().await {
            info!(
                rx_received = stats.rx_packets_received,
                rx_received_ok = stats.rx_packets_received_ok,
                tx_received = stats.tx_packets_received,
                tx_emitted = stats.tx_packets_emitted,
                "Gateway statistics"
            );
        }
        info!("Stats consumer ended");
    });

    // Task 3: downlink acknowledgements
    let mut ack_task = tokio::spawn(async move {
        while let Some(ack) = ack_rx.recv().await {
            if ack.error.is_empty() {
                info!(downlink_id = %common::uuid_from_bytes(&ack.downlink_id), "Downlink acknowledged");
            } else {
                warn!(
                    downlink_id = %common::uuid_from_bytes(&ack.downlink_id),
                    error = %ack.error,
                    "Downlink rejected"
                );
            }
        }
        info!("Ack consumer ended");
    });

    // Task 4: gateway subscriptions
    let mut subscribe_task = tokio::spawn(async move {
        while let Some(event) = subscribe_rx.recv().await {
            info!(
                gateway_id = %event.gateway_id,
                subscribe = event.subscribe,
                "Gateway subscription changed"
            );
        }
        info!("Subscribe consumer ended");
    });

    // ============================================================
    // Run until a signal arrives or a consumer stops
    // ============================================================
    let shutdown = tokio::select! {
        biased;
        _ = shutdown_signal() => {
            info!("Shutdown signal received - closing backend...");
            true
        }
        _ = &mut uplink_task => false,
        _ = &mut stats_task => false,
        _ = &mut ack_task => false,
        _ = &mut subscribe_task => false,
    };

    if shutdown {
        backend.close();
        // The receive loop exits the process once it observes the closed
        // event stream; wait on a consumer instead of racing that with a
        // clean return.
        if let Err(e) = uplink_task.await {
            warn!("Consumer task panicked: {}", e);
        }
    }

    info!("Exiting...");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
