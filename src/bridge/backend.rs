//! Backend lifecycle and command surface.

use bytes::Bytes;
use prost::Message;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{error, info, warn};

use crate::bridge::channels::{EventQueues, QueueBundle, QueueSenders};
use crate::bridge::events::EventLoop;
use crate::common::error::{DownlinkError, SetupError, TransportError};
use crate::common::{uuid_from_bytes, GatewayId, SubscribeEvent};
use crate::config::ConcentratordConfig;
use crate::gw;
use crate::protocol::{CommandChannel, Endpoint, EventChannel};

/// Command topic for downlink transmissions.
const COMMAND_DOWNLINK: &str = "down";
/// Command topic for the gateway identifier query.
const COMMAND_GATEWAY_ID: &str = "gateway_id";

/// A broken daemon socket is not recoverable: log it and terminate so the
/// supervisor restarts the whole process. Under test the exit is skipped
/// and the fault propagates to the caller instead.
pub(crate) fn fatal_channel_fault(channel: &str, error: &TransportError) {
    error!("Fatal fault on the {} channel: {}", channel, error);
    if !cfg!(test) {
        std::process::exit(1);
    }
}

/// Bridge to one concentrator daemon.
///
/// Owns the command channel and the close signal for the background
/// receive loop. Daemon events arrive on the [`EventQueues`] returned
/// alongside the backend.
pub struct Backend {
    command: Mutex<CommandChannel>,
    gateway_id: GatewayId,
    ack_tx: mpsc::Sender<gw::DownlinkTxAck>,
    subscribe_tx: mpsc::Sender<SubscribeEvent>,
    close_tx: watch::Sender<bool>,
}

impl Backend {
    /// Connect to the daemon and start the background receive loop.
    pub async fn new(config: &ConcentratordConfig) -> Result<(Self, EventQueues), SetupError> {
        let event_endpoint: Endpoint = config.event_url.parse()?;
        let command_endpoint: Endpoint = config.command_url.parse()?;

        let events = EventChannel::connect(&event_endpoint).await?;
        let command = CommandChannel::connect(&command_endpoint).await?;

        Self::start(events, command, config.crc_check()).await
    }

    /// Wire a backend over already connected channels.
    pub(crate) async fn start(
        events: EventChannel,
        mut command: CommandChannel,
        crc_check: bool,
    ) -> Result<(Self, EventQueues), SetupError> {
        let gateway_id = query_gateway_id(&mut command).await?;
        info!(gateway_id = %gateway_id, "Connected to concentratord");

        let QueueBundle { senders, queues } = QueueBundle::new();
        let QueueSenders {
            uplink_tx,
            stats_tx,
            ack_tx,
            subscribe_tx,
        } = senders;

        let (close_tx, close_rx) = watch::channel(false);

        let event_loop = EventLoop::new(events, uplink_tx, stats_tx, crc_check, close_rx);
        tokio::spawn(event_loop.run());

        // Announce the gateway before any daemon event can reach the queues.
        // The queue is freshly created, so this cannot block.
        if let Err(e) = subscribe_tx.try_send(SubscribeEvent {
            subscribe: true,
            gateway_id,
        }) {
            warn!("Failed to enqueue subscribe event: {}", e);
        }

        Ok((
            Self {
                command: Mutex::new(command),
                gateway_id,
                ack_tx,
                subscribe_tx,
                close_tx,
            },
            queues,
        ))
    }

    /// Identifier of the gateway this backend fronts.
    pub fn gateway_id(&self) -> GatewayId {
        self.gateway_id
    }

    /// Stop the background receive loop.
    ///
    /// Only the event side is torn down; the command socket stays open
    /// until the backend is dropped. The loop treats the closed event
    /// stream as a fatal channel fault, so in production the process
    /// terminates from the loop shortly after this call.
    pub fn close(&self) {
        info!("Closing backend");
        let _ = self.close_tx.send(true);
    }

    /// Transmit a downlink frame and wait for the daemon's acknowledgement.
    ///
    /// The frame's LoRa bandwidth is given in kHz and rebased to Hz in
    /// place for the daemon. The acknowledgement is returned and also
    /// published on the ack queue.
    pub async fn send_downlink(
        &self,
        frame: &mut gw::DownlinkFrame,
    ) -> Result<gw::DownlinkTxAck, DownlinkError> {
        // The application layer works in kHz, the daemon in Hz
        if let Some(tx_info) = frame.tx_info.as_mut() {
            if let Some(lora) = tx_info.lora_modulation_info_mut() {
                lora.bandwidth *= 1000;
            }
        }

        let downlink_id = uuid_from_bytes(&frame.downlink_id);
        info!(downlink_id = %downlink_id, "Sending downlink frame");

        let payload = frame.encode_to_vec();

        let reply = {
            // One request in flight at a time, replies correlate by order
            let mut command = self.command.lock().await;
            match command.request(COMMAND_DOWNLINK, payload.into()).await {
                Ok(reply) => reply,
                Err(e) => {
                    fatal_channel_fault("command", &e);
                    return Err(e.into());
                }
            }
        };

        if reply.is_empty() {
            return Err(DownlinkError::EmptyReply);
        }

        let ack = gw::DownlinkTxAck::decode(reply)?;

        if self.ack_tx.send(ack.clone()).await.is_err() {
            warn!("Ack queue consumer is gone, dropping ack");
        }

        Ok(ack)
    }

    /// Apply a configuration update.
    ///
    /// The daemon manages its own channel configuration, so the update is
    /// accepted and ignored.
    pub fn apply_configuration(
        &self,
        _config: &gw::GatewayConfiguration,
    ) -> Result<(), TransportError> {
        Ok(())
    }

    /// Forward a raw packet-forwarder command.
    ///
    /// The daemon exposes no raw command interface, so the command is
    /// accepted and ignored.
    pub fn raw_packet_forwarder_command(
        &self,
        _command: &gw::RawPacketForwarderCommand,
    ) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Ask the daemon for its gateway identifier.
async fn query_gateway_id(command: &mut CommandChannel) -> Result<GatewayId, SetupError> {
    let reply = command
        .request(COMMAND_GATEWAY_ID, Bytes::new())
        .await
        .map_err(SetupError::IdentifierQuery)?;
    let gateway_id = GatewayId::try_from(&reply[..])?;
    Ok(gateway_id)
}
