//! Bridge channel management.
//!
//! Provides the four output queues the backend publishes daemon traffic
//! on, grouping the producer and consumer halves.

use tokio::sync::mpsc;

use crate::common::SubscribeEvent;
use crate::gw;

/// Capacity of every output queue.
///
/// One slot, matching the daemon protocol's lockstep delivery: a slow
/// consumer backpressures the receive loop instead of buffering events.
const QUEUE_CAPACITY: usize = 1;

/// Producer half of the output queues.
///
/// Held by the backend and its receive loop.
pub(crate) struct QueueSenders {
    /// Sender for received uplink frames.
    pub uplink_tx: mpsc::Sender<gw::UplinkFrame>,
    /// Sender for periodic gateway statistics.
    pub stats_tx: mpsc::Sender<gw::GatewayStats>,
    /// Sender for downlink acknowledgements.
    pub ack_tx: mpsc::Sender<gw::DownlinkTxAck>,
    /// Sender for gateway subscription notifications.
    pub subscribe_tx: mpsc::Sender<SubscribeEvent>,
}

/// Consumer half of the output queues, handed to the application.
pub struct EventQueues {
    /// Received uplink frames.
    pub uplink_rx: mpsc::Receiver<gw::UplinkFrame>,
    /// Periodic gateway statistics.
    pub stats_rx: mpsc::Receiver<gw::GatewayStats>,
    /// Acknowledgements for transmitted downlinks.
    pub ack_rx: mpsc::Receiver<gw::DownlinkTxAck>,
    /// Gateway subscription notifications.
    pub subscribe_rx: mpsc::Receiver<SubscribeEvent>,
}

/// Bundle of all queues created for one backend.
pub(crate) struct QueueBundle {
    /// Producer half, kept by the backend.
    pub senders: QueueSenders,
    /// Consumer half, handed to the application.
    pub queues: EventQueues,
}

impl QueueBundle {
    /// Create a new set of bridge queues.
    pub fn new() -> Self {
        let (uplink_tx, uplink_rx) = mpsc::channel(QUEUE_CAPACITY);
        let (stats_tx, stats_rx) = mpsc::channel(QUEUE_CAPACITY);
        let (ack_tx, ack_rx) = mpsc::channel(QUEUE_CAPACITY);
        let (subscribe_tx, subscribe_rx) = mpsc::channel(QUEUE_CAPACITY);

        Self {
            senders: QueueSenders {
                uplink_tx,
                stats_tx,
                ack_tx,
                subscribe_tx,
            },
            queues: EventQueues {
                uplink_rx,
                stats_rx,
                ack_rx,
                subscribe_rx,
            },
        }
    }
}
