//! Network messages exchanged with the authoritative side
//!
//! Messages are classified once, at the network boundary, so nothing past the
//! handoff inspects envelope contents to decide what kind of message it is.

use crate::{SnapshotEnvelope, Tick};

/// Message kind tag
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageKind {
    FullState = 0x01,
    DeltaState = 0x02,
    StateAck = 0x10,
    RequestFullState = 0x11,
}

impl MessageKind {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(MessageKind::FullState),
            0x02 => Some(MessageKind::DeltaState),
            0x10 => Some(MessageKind::StateAck),
            0x11 => Some(MessageKind::RequestFullState),
            _ => None,
        }
    }

    #[inline]
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Does this kind carry a snapshot envelope?
    pub fn carries_snapshot(self) -> bool {
        matches!(self, MessageKind::FullState | MessageKind::DeltaState)
    }
}

/// A decoded, already-classified network message
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NetMessage {
    /// Complete state for a tick (remote → client)
    FullState(SnapshotEnvelope),
    /// Incremental state between two ticks (remote → client)
    DeltaState(SnapshotEnvelope),
    /// Receipt of an envelope's `to_tick` (client → remote)
    StateAck(Tick),
    /// Ask the remote side for a fresh full snapshot (client → remote)
    RequestFullState(Tick),
}

impl NetMessage {
    /// Wrap a decoded envelope in the variant matching its kind
    pub fn classify(envelope: SnapshotEnvelope) -> Self {
        if envelope.is_full() {
            NetMessage::FullState(envelope)
        } else {
            NetMessage::DeltaState(envelope)
        }
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            NetMessage::FullState(_) => MessageKind::FullState,
            NetMessage::DeltaState(_) => MessageKind::DeltaState,
            NetMessage::StateAck(_) => MessageKind::StateAck,
            NetMessage::RequestFullState(_) => MessageKind::RequestFullState,
        }
    }

    /// Tick the message is addressed to
    pub fn tick(&self) -> Tick {
        match self {
            NetMessage::FullState(env) | NetMessage::DeltaState(env) => env.to_tick(),
            NetMessage::StateAck(tick) | NetMessage::RequestFullState(tick) => *tick,
        }
    }

    /// Take the envelope out of a snapshot-carrying message
    pub fn into_envelope(self) -> Option<SnapshotEnvelope> {
        match self {
            NetMessage::FullState(env) | NetMessage::DeltaState(env) => Some(env),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        let full = SnapshotEnvelope::full(Tick::new(3)).unwrap();
        let delta = SnapshotEnvelope::delta(Tick::new(3), Tick::new(4)).unwrap();

        assert_eq!(NetMessage::classify(full).kind(), MessageKind::FullState);
        assert_eq!(NetMessage::classify(delta).kind(), MessageKind::DeltaState);
    }

    #[test]
    fn test_message_tick() {
        let delta = SnapshotEnvelope::delta(Tick::new(3), Tick::new(4)).unwrap();
        assert_eq!(NetMessage::classify(delta).tick(), Tick::new(4));
        assert_eq!(NetMessage::StateAck(Tick::new(9)).tick(), Tick::new(9));
    }

    #[test]
    fn test_kind_byte_roundtrip() {
        for kind in [
            MessageKind::FullState,
            MessageKind::DeltaState,
            MessageKind::StateAck,
            MessageKind::RequestFullState,
        ] {
            assert_eq!(MessageKind::from_byte(kind.to_byte()), Some(kind));
        }
        assert_eq!(MessageKind::from_byte(0xFF), None);
        assert!(!MessageKind::StateAck.carries_snapshot());
    }

    #[test]
    fn test_into_envelope() {
        assert!(NetMessage::StateAck(Tick::new(1)).into_envelope().is_none());
        let full = SnapshotEnvelope::full(Tick::new(3)).unwrap();
        assert!(NetMessage::classify(full).into_envelope().is_some());
    }
}
