//! Scripted authoritative side
//!
//! Produces one envelope per server tick: a full snapshot first (and after
//! every full-state request), deltas afterwards. Each envelope's world payload
//! is its `to_tick` encoded little-endian, so a simulation can tell exactly
//! which tick it applied.

use std::collections::VecDeque;

use bytes::Bytes;
use tickline_core::{NetMessage, SnapshotEnvelope, Tick, TicklineResult};
use tracing::{debug, trace};

#[derive(Clone, Debug, Default)]
pub struct ServerStats {
    pub fulls_sent: u64,
    pub deltas_sent: u64,
    pub acks_received: u64,
    pub full_requests: u64,
}

/// Snapshot producer standing in for a game server
pub struct ScriptedServer {
    /// Last tick produced
    tick: Tick,
    /// Next envelope must be a full snapshot
    send_full: bool,
    /// Produced but not yet acknowledged
    retained: VecDeque<Tick>,
    /// Extra bytes appended to every entity payload
    entity_payload: Bytes,
    stats: ServerStats,
}

impl ScriptedServer {
    /// Server whose first (full) snapshot is for `start`
    pub fn new(start: Tick) -> Self {
        ScriptedServer {
            tick: start.prev(),
            send_full: true,
            retained: VecDeque::new(),
            entity_payload: Bytes::new(),
            stats: ServerStats::default(),
        }
    }

    /// Attach an entity payload of `size` bytes to every envelope
    pub fn with_entity_payload(mut self, size: usize) -> Self {
        self.entity_payload = Bytes::from(vec![0xA5; size]);
        self
    }

    /// Produce the envelope for the next server tick
    pub fn produce(&mut self) -> TicklineResult<NetMessage> {
        let from = self.tick;
        self.tick = self.tick.next();
        if self.tick.is_zero() {
            // Zero is reserved for "no base"
            self.tick = self.tick.next();
        }

        let envelope = if self.send_full {
            self.send_full = false;
            self.stats.fulls_sent += 1;
            debug!(tick = %self.tick, "producing full snapshot");
            SnapshotEnvelope::full(self.tick)?
        } else {
            self.stats.deltas_sent += 1;
            SnapshotEnvelope::delta(from, self.tick)?
        };

        let mut envelope = envelope.with_world_delta(self.tick.to_bytes().to_vec());
        if !self.entity_payload.is_empty() {
            envelope = envelope.with_entity_deltas(self.entity_payload.clone());
        }

        self.retained.push_back(self.tick);
        Ok(NetMessage::classify(envelope))
    }

    /// Handle a message from the client
    pub fn handle(&mut self, message: &NetMessage) {
        match message {
            NetMessage::StateAck(tick) => {
                self.stats.acks_received += 1;
                let before = self.retained.len();
                self.retained.retain(|t| t.is_after(*tick));
                trace!(tick = %tick, pruned = before - self.retained.len(), "ack received");
            }
            NetMessage::RequestFullState(tick) => {
                self.stats.full_requests += 1;
                self.send_full = true;
                debug!(client_tick = %tick, "full state requested");
            }
            NetMessage::FullState(_) | NetMessage::DeltaState(_) => {
                trace!(kind = ?message.kind(), "server ignoring snapshot message");
            }
        }
    }

    /// Last tick produced
    pub fn tick(&self) -> Tick {
        self.tick
    }

    /// Produced ticks not yet covered by an acknowledgement
    pub fn retained(&self) -> usize {
        self.retained.len()
    }

    pub fn stats(&self) -> &ServerStats {
        &self.stats
    }
}

/// Decode the tick a [`ScriptedServer`] wrote into a world payload
pub fn payload_tick(payload: &Bytes) -> Option<Tick> {
    let bytes: [u8; 4] = payload.get(..4)?.try_into().ok()?;
    Some(Tick::from_bytes(bytes))
}
