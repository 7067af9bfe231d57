//! Background receive loop for the daemon event stream.

use bytes::Bytes;
use prost::Message;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::bridge::backend::fatal_channel_fault;
use crate::common::error::TransportError;
use crate::common::uuid_from_bytes;
use crate::gw;
use crate::protocol::{EventChannel, Multipart};

/// Topic frame carried by uplink frame events.
const TOPIC_UPLINK: &[u8] = b"up";
/// Topic frame carried by gateway statistics events.
const TOPIC_STATS: &[u8] = b"stats";

/// Reads daemon events and routes them onto the output queues.
///
/// Runs as a background task for the lifetime of the backend. Malformed
/// messages are logged and skipped; a transport fault or a close signal
/// ends the loop.
pub(crate) struct EventLoop {
    events: EventChannel,
    uplink_tx: mpsc::Sender<gw::UplinkFrame>,
    stats_tx: mpsc::Sender<gw::GatewayStats>,
    crc_check: bool,
    close_rx: watch::Receiver<bool>,
}

impl EventLoop {
    pub fn new(
        events: EventChannel,
        uplink_tx: mpsc::Sender<gw::UplinkFrame>,
        stats_tx: mpsc::Sender<gw::GatewayStats>,
        crc_check: bool,
        close_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            events,
            uplink_tx,
            stats_tx,
            crc_check,
            close_rx,
        }
    }

    /// Run until the transport faults or the backend is closed.
    pub async fn run(mut self) {
        info!("Event loop started");

        loop {
            let received = tokio::select! {
                received = self.events.recv() => received,
                _ = self.close_rx.changed() => Err(TransportError::Closed),
            };

            match received {
                Ok(message) => self.dispatch(message).await,
                Err(e) => {
                    fatal_channel_fault("event", &e);
                    return;
                }
            }
        }
    }

    async fn dispatch(&self, message: Multipart) {
        // Heartbeat messages are empty, drop them without noise
        if message.frames.is_empty() {
            return;
        }
        if message.frames.len() != 2 {
            error!(
                frames = message.frames.len(),
                "Event message does not have two frames"
            );
            return;
        }

        let topic = &message.frames[0];
        let payload = message.frames[1].clone();

        match &topic[..] {
            TOPIC_UPLINK => {
                if let Err(e) = self.handle_uplink(payload).await {
                    error!("Failed to decode uplink frame: {}", e);
                }
            }
            TOPIC_STATS => {
                if let Err(e) = self.handle_stats(payload).await {
                    error!("Failed to decode gateway stats: {}", e);
                }
            }
            other => {
                error!(
                    topic = %String::from_utf8_lossy(other),
                    "Unknown event type, skipping"
                );
            }
        }
    }

    /// Gate on CRC, rebase the LoRa bandwidth to kHz and publish.
    async fn handle_uplink(&self, payload: Bytes) -> Result<(), prost::DecodeError> {
        let mut frame = gw::UplinkFrame::decode(payload)?;

        if self.crc_check {
            let crc_ok = frame
                .rx_info
                .as_ref()
                .map(|rx_info| rx_info.crc_status() == gw::CrcStatus::CrcOk)
                .unwrap_or(false);
            if !crc_ok {
                debug!("Dropping uplink frame with invalid CRC");
                return Ok(());
            }
        }

        // The daemon reports bandwidth in Hz, the application layer in kHz
        if let Some(tx_info) = frame.tx_info.as_mut() {
            if let Some(lora) = tx_info.lora_modulation_info_mut() {
                lora.bandwidth /= 1000;
            }
        }

        let uplink_id = uuid_from_bytes(
            frame
                .rx_info
                .as_ref()
                .map(|rx_info| rx_info.uplink_id.as_slice())
                .unwrap_or_default(),
        );
        info!(uplink_id = %uplink_id, "Uplink frame received");

        if self.uplink_tx.send(frame).await.is_err() {
            warn!("Uplink queue consumer is gone, dropping frame");
        }
        Ok(())
    }

    /// Publish gateway statistics as they come.
    async fn handle_stats(&self, payload: Bytes) -> Result<(), prost::DecodeError> {
        let stats = gw::GatewayStats::decode(payload)?;

        let stats_id = uuid_from_bytes(&stats.stats_id);
        info!(stats_id = %stats_id, "Gateway statistics received");

        if self.stats_tx.send(stats).await.is_err() {
            warn!("Stats queue consumer is gone, dropping message");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use futures::SinkExt;
    use tokio::io::duplex;
    use tokio_util::codec::Framed;

    use crate::protocol::multipart::MultipartCodec;

    struct Harness {
        daemon: Framed<tokio::io::DuplexStream, MultipartCodec>,
        uplink_rx: mpsc::Receiver<gw::UplinkFrame>,
        stats_rx: mpsc::Receiver<gw::GatewayStats>,
        close_tx: watch::Sender<bool>,
        handle: tokio::task::JoinHandle<()>,
    }

    fn start_loop(crc_check: bool) -> Harness {
        let (client, daemon) = duplex(4096);
        let (uplink_tx, uplink_rx) = mpsc::channel(1);
        let (stats_tx, stats_rx) = mpsc::channel(1);
        let (close_tx, close_rx) = watch::channel(false);

        let event_loop = EventLoop::new(
            EventChannel::from_stream(client),
            uplink_tx,
            stats_tx,
            crc_check,
            close_rx,
        );
        let handle = tokio::spawn(event_loop.run());

        Harness {
            daemon: Framed::new(daemon, MultipartCodec),
            uplink_rx,
            stats_rx,
            close_tx,
            handle,
        }
    }

    fn uplink_event(bandwidth: u32, crc_status: gw::CrcStatus, payload: &[u8]) -> Multipart {
        let frame = gw::UplinkFrame {
            phy_payload: payload.to_vec(),
            tx_info: Some(gw::UplinkTxInfo {
                frequency: 868_100_000,
                modulation_info: Some(gw::ModulationInfo::Lora(gw::LoraModulationInfo {
                    bandwidth,
                    spreading_factor: 7,
                    code_rate: "4/5".to_string(),
                    polarization_inversion: true,
                })),
            }),
            rx_info: Some(gw::UplinkRxInfo {
                uplink_id: vec![0x42; 16],
                crc_status: crc_status as i32,
                ..Default::default()
            }),
        };
        Multipart::tagged("up", frame.encode_to_vec().into())
    }

    #[tokio::test]
    async fn test_uplink_bandwidth_is_rebased_to_khz() {
        let mut harness = start_loop(false);

        harness
            .daemon
            .send(uplink_event(125_000, gw::CrcStatus::BadCrc, b"payload"))
            .await
            .unwrap();

        let frame = harness.uplink_rx.recv().await.unwrap();
        assert_eq!(frame.phy_payload, b"payload");
        assert_eq!(
            frame
                .tx_info
                .unwrap()
                .lora_modulation_info()
                .unwrap()
                .bandwidth,
            125
        );
    }

    #[tokio::test]
    async fn test_crc_gate_drops_failed_frames() {
        let mut harness = start_loop(true);

        harness
            .daemon
            .send(uplink_event(125_000, gw::CrcStatus::BadCrc, b"bad"))
            .await
            .unwrap();
        harness
            .daemon
            .send(uplink_event(125_000, gw::CrcStatus::NoCrc, b"missing"))
            .await
            .unwrap();
        harness
            .daemon
            .send(uplink_event(125_000, gw::CrcStatus::CrcOk, b"good"))
            .await
            .unwrap();

        let frame = harness.uplink_rx.recv().await.unwrap();
        assert_eq!(frame.phy_payload, b"good");
    }

    #[tokio::test]
    async fn test_stats_are_published_unconditionally() {
        let mut harness = start_loop(true);

        let stats = gw::GatewayStats {
            gateway_id: vec![1, 2, 3, 4, 5, 6, 7, 8],
            stats_id: vec![0x11; 16],
            rx_packets_received: 10,
            rx_packets_received_ok: 9,
            ..Default::default()
        };
        harness
            .daemon
            .send(Multipart::tagged("stats", stats.encode_to_vec().into()))
            .await
            .unwrap();

        let received = harness.stats_rx.recv().await.unwrap();
        assert_eq!(received.rx_packets_received, 10);
        assert_eq!(received.rx_packets_received_ok, 9);
    }

    #[tokio::test]
    async fn test_loop_survives_malformed_messages() {
        let mut harness = start_loop(false);

        // Zero frames, wrong frame count, unknown topic, undecodable payload
        harness.daemon.send(Multipart::default()).await.unwrap();
        harness
            .daemon
            .send(Multipart::new(vec![Bytes::from_static(b"up")]))
            .await
            .unwrap();
        harness
            .daemon
            .send(Multipart::tagged("gps", Bytes::from_static(b"?")))
            .await
            .unwrap();
        harness
            .daemon
            .send(Multipart::tagged("up", Bytes::from_static(&[0xff, 0xff, 0xff])))
            .await
            .unwrap();

        harness
            .daemon
            .send(uplink_event(500_000, gw::CrcStatus::CrcOk, b"still alive"))
            .await
            .unwrap();

        let frame = harness.uplink_rx.recv().await.unwrap();
        assert_eq!(frame.phy_payload, b"still alive");
    }

    #[tokio::test]
    async fn test_loop_future_can_run_on_a_spawned_task() {
        fn assert_send<F: std::future::Future + Send>(future: F) -> F {
            future
        }

        let (client, _daemon) = duplex(16);
        let (uplink_tx, _uplink_rx) = mpsc::channel(1);
        let (stats_tx, _stats_rx) = mpsc::channel(1);
        let (close_tx, close_rx) = watch::channel(false);

        let event_loop = EventLoop::new(
            EventChannel::from_stream(client),
            uplink_tx,
            stats_tx,
            true,
            close_rx,
        );
        let handle = tokio::spawn(assert_send(event_loop.run()));

        close_tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_close_signal_stops_the_loop() {
        let harness = start_loop(false);

        harness.close_tx.send(true).unwrap();
        harness.handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_peer_disconnect_stops_the_loop() {
        let harness = start_loop(false);

        drop(harness.daemon);
        harness.handle.await.unwrap();
    }
}
