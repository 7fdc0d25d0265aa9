//! Network to simulation handoff
//!
//! The network task pushes classified messages into an unbounded channel; the
//! simulation thread drains it without blocking once per frame. Outbound
//! messages (acks, full-state requests) travel the other way.

use tickline_core::{NetMessage, TicklineError, TicklineResult};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

/// Network-side handle for delivering received messages to a session
#[derive(Clone, Debug)]
pub struct SnapshotSender {
    tx: mpsc::UnboundedSender<NetMessage>,
}

impl SnapshotSender {
    /// Hand a message to the simulation thread
    pub fn send(&self, message: NetMessage) -> TicklineResult<()> {
        self.tx.send(message).map_err(|_| TicklineError::ChannelClosed)
    }

    /// The owning session has been dropped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Simulation-side end of the handoff channel
#[derive(Debug)]
pub struct SnapshotInbox {
    rx: mpsc::UnboundedReceiver<NetMessage>,
}

impl SnapshotInbox {
    /// Next pending message, without blocking
    ///
    /// `Ok(None)` when nothing is pending; `ChannelClosed` once every sender
    /// is gone and the queue is empty.
    pub fn try_next(&mut self) -> TicklineResult<Option<NetMessage>> {
        match self.rx.try_recv() {
            Ok(message) => Ok(Some(message)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(TicklineError::ChannelClosed),
        }
    }

    /// Drop every pending message, returning how many were discarded
    pub fn discard_pending(&mut self) -> usize {
        let mut discarded = 0;
        while self.rx.try_recv().is_ok() {
            discarded += 1;
        }
        discarded
    }
}

/// Create a connected sender/inbox pair
pub fn handoff_channel() -> (SnapshotSender, SnapshotInbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    (SnapshotSender { tx }, SnapshotInbox { rx })
}

/// What the network task keeps for a session
///
/// `inbound` feeds received messages to the session; `outbound` yields the
/// acknowledgements and requests the session wants transmitted.
#[derive(Debug)]
pub struct NetworkHandle {
    pub inbound: SnapshotSender,
    pub outbound: mpsc::UnboundedReceiver<NetMessage>,
}

impl NetworkHandle {
    /// Cloneable sender for additional receive tasks
    pub fn sender(&self) -> SnapshotSender {
        self.inbound.clone()
    }

    /// Wait for the next message to transmit; `None` once the session is gone
    pub async fn next_outbound(&mut self) -> Option<NetMessage> {
        self.outbound.recv().await
    }

    /// Everything queued for transmission right now
    pub fn drain_outbound(&mut self) -> Vec<NetMessage> {
        let mut out = Vec::new();
        while let Ok(message) = self.outbound.try_recv() {
            out.push(message);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickline_core::{SnapshotEnvelope, Tick};

    #[test]
    fn test_inbox_empty_then_message() {
        let (tx, mut inbox) = handoff_channel();
        assert!(inbox.try_next().unwrap().is_none());

        tx.send(NetMessage::StateAck(Tick::new(3))).unwrap();
        assert_eq!(inbox.try_next().unwrap(), Some(NetMessage::StateAck(Tick::new(3))));
    }

    #[test]
    fn test_inbox_reports_closed_after_drain() {
        let (tx, mut inbox) = handoff_channel();
        let env = SnapshotEnvelope::full(Tick::new(4)).unwrap();
        tx.send(NetMessage::classify(env)).unwrap();
        drop(tx);

        // Pending messages are still delivered before the close is reported
        assert!(inbox.try_next().unwrap().is_some());
        assert!(matches!(inbox.try_next(), Err(TicklineError::ChannelClosed)));
    }

    #[test]
    fn test_sender_fails_when_inbox_dropped() {
        let (tx, inbox) = handoff_channel();
        drop(inbox);

        assert!(tx.is_closed());
        assert!(matches!(
            tx.send(NetMessage::StateAck(Tick::new(1))),
            Err(TicklineError::ChannelClosed)
        ));
    }

    #[test]
    fn test_discard_pending() {
        let (tx, mut inbox) = handoff_channel();
        for t in 1..=4 {
            tx.send(NetMessage::StateAck(Tick::new(t))).unwrap();
        }
        assert_eq!(inbox.discard_pending(), 4);
        assert!(inbox.try_next().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_send_from_network_task() {
        let (tx, mut inbox) = handoff_channel();

        let task = tokio::spawn(async move {
            for t in 2..=6u32 {
                let env = SnapshotEnvelope::delta(Tick::new(t - 1), Tick::new(t)).unwrap();
                tx.send(NetMessage::classify(env)).unwrap();
            }
        });
        task.await.unwrap();

        let mut ticks = Vec::new();
        while let Some(message) = inbox.try_next().unwrap_or(None) {
            ticks.push(message.tick());
        }
        assert_eq!(ticks, (2..=6).map(Tick::new).collect::<Vec<_>>());
    }
}
