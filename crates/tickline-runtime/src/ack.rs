//! Acknowledgements over the outbound channel

use tickline_core::{NetMessage, Tick};
use tickline_state::AckSink;
use tokio::sync::mpsc;
use tracing::trace;

/// Queues `StateAck` messages for the network task (fire-and-forget)
#[derive(Clone, Debug)]
pub struct ChannelAckSink {
    tx: mpsc::UnboundedSender<NetMessage>,
}

impl ChannelAckSink {
    pub fn new(tx: mpsc::UnboundedSender<NetMessage>) -> Self {
        ChannelAckSink { tx }
    }
}

impl AckSink for ChannelAckSink {
    fn send_ack(&mut self, tick: Tick) {
        if self.tx.send(NetMessage::StateAck(tick)).is_err() {
            trace!(tick = %tick, "outbound channel closed; ack dropped");
        }
    }
}
