//! Snapshot envelopes
//!
//! An envelope carries the replicated state changes that take the simulation
//! from `from_tick` to `to_tick`. A `from_tick` of [`Tick::ZERO`] marks a full
//! snapshot. Payload sections are opaque to this crate.

use bytes::Bytes;

use crate::{Tick, TicklineError, TicklineResult};

/// Immutable bundle of state changes addressed to one tick
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnapshotEnvelope {
    from_tick: Tick,
    to_tick: Tick,
    world_delta: Option<Bytes>,
    entity_deltas: Option<Bytes>,
    entity_removals: Option<Bytes>,
    player_deltas: Option<Bytes>,
    synthetic: bool,
}

impl SnapshotEnvelope {
    /// Create a full snapshot for `to_tick`
    pub fn full(to_tick: Tick) -> TicklineResult<Self> {
        Self::delta(Tick::ZERO, to_tick)
    }

    /// Create an incremental envelope taking state from `from_tick` to `to_tick`
    ///
    /// Passing `Tick::ZERO` as `from_tick` yields a full snapshot, valid for any
    /// non-zero `to_tick`.
    pub fn delta(from_tick: Tick, to_tick: Tick) -> TicklineResult<Self> {
        let valid = if from_tick.is_zero() {
            !to_tick.is_zero()
        } else {
            to_tick.is_after(from_tick)
        };
        if !valid {
            return Err(TicklineError::InvalidEnvelope {
                from: from_tick,
                to: to_tick,
            });
        }

        Ok(SnapshotEnvelope {
            from_tick,
            to_tick,
            world_delta: None,
            entity_deltas: None,
            entity_removals: None,
            player_deltas: None,
            synthetic: false,
        })
    }

    /// Locally fabricated placeholder with an empty payload
    ///
    /// Used when the real envelope for `to_tick` has not arrived yet.
    pub fn synthetic(to_tick: Tick) -> Self {
        SnapshotEnvelope {
            from_tick: to_tick.prev(),
            to_tick,
            world_delta: None,
            entity_deltas: None,
            entity_removals: None,
            player_deltas: None,
            synthetic: true,
        }
    }

    pub fn with_world_delta(mut self, payload: impl Into<Bytes>) -> Self {
        self.world_delta = Some(payload.into());
        self
    }

    pub fn with_entity_deltas(mut self, payload: impl Into<Bytes>) -> Self {
        self.entity_deltas = Some(payload.into());
        self
    }

    pub fn with_entity_removals(mut self, payload: impl Into<Bytes>) -> Self {
        self.entity_removals = Some(payload.into());
        self
    }

    pub fn with_player_deltas(mut self, payload: impl Into<Bytes>) -> Self {
        self.player_deltas = Some(payload.into());
        self
    }

    #[inline]
    pub fn from_tick(&self) -> Tick {
        self.from_tick
    }

    #[inline]
    pub fn to_tick(&self) -> Tick {
        self.to_tick
    }

    /// True for a real envelope that carries complete state
    #[inline]
    pub fn is_full(&self) -> bool {
        self.from_tick.is_zero() && !self.synthetic
    }

    #[inline]
    pub fn is_synthetic(&self) -> bool {
        self.synthetic
    }

    pub fn world_delta(&self) -> Option<&Bytes> {
        self.world_delta.as_ref()
    }

    pub fn entity_deltas(&self) -> Option<&Bytes> {
        self.entity_deltas.as_ref()
    }

    pub fn entity_removals(&self) -> Option<&Bytes> {
        self.entity_removals.as_ref()
    }

    pub fn player_deltas(&self) -> Option<&Bytes> {
        self.player_deltas.as_ref()
    }

    /// True if no payload section is present
    pub fn is_empty(&self) -> bool {
        self.world_delta.is_none()
            && self.entity_deltas.is_none()
            && self.entity_removals.is_none()
            && self.player_deltas.is_none()
    }
}
