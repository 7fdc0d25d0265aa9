//! Simulation double that records every Apply

use bytes::Bytes;
use tickline_core::{ApplyStage, SnapshotEnvelope, Tick, TicklineError, TicklineResult};
use tickline_state::{EntityState, PlayerState, WorldState};

use crate::payload_tick;

/// One applied bracketing pair
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ApplyRecord {
    /// Tick of the current envelope (predecessor of `next`)
    pub tick: Tick,
    /// Tick decoded from the world payload; `None` for a placeholder
    pub payload_tick: Option<Tick>,
    pub next: Tick,
    pub next_synthetic: bool,
}

impl ApplyRecord {
    pub fn is_placeholder(&self) -> bool {
        self.payload_tick.is_none()
    }
}

#[derive(Debug, Default)]
pub struct RecordingSimulation {
    records: Vec<ApplyRecord>,
    pending_world: Option<Option<Tick>>,
    fail_at: Option<Tick>,
    player_applies: u64,
}

impl RecordingSimulation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the entity stage fail when applying `tick`
    pub fn fail_at(mut self, tick: Tick) -> Self {
        self.fail_at = Some(tick);
        self
    }

    pub fn records(&self) -> &[ApplyRecord] {
        &self.records
    }

    pub fn last(&self) -> Option<&ApplyRecord> {
        self.records.last()
    }

    /// Applies whose current envelope carried real data
    pub fn real_applies(&self) -> usize {
        self.records.iter().filter(|r| !r.is_placeholder()).count()
    }

    pub fn placeholder_applies(&self) -> usize {
        self.records.len() - self.real_applies()
    }

    pub fn player_applies(&self) -> u64 {
        self.player_applies
    }
}

impl WorldState for RecordingSimulation {
    fn apply_world_delta(&mut self, delta: Option<&Bytes>) -> TicklineResult<()> {
        self.pending_world = Some(delta.and_then(payload_tick));
        Ok(())
    }
}

impl EntityState for RecordingSimulation {
    fn apply_entity_deltas(
        &mut self,
        _deltas: Option<&Bytes>,
        _removals: Option<&Bytes>,
        next: &SnapshotEnvelope,
    ) -> TicklineResult<()> {
        let tick = next.to_tick().prev();
        if self.fail_at == Some(tick) {
            return Err(TicklineError::apply(tick, ApplyStage::Entities, "injected failure"));
        }

        self.records.push(ApplyRecord {
            tick,
            payload_tick: self.pending_world.take().flatten(),
            next: next.to_tick(),
            next_synthetic: next.is_synthetic(),
        });
        Ok(())
    }
}

impl PlayerState for RecordingSimulation {
    fn apply_player_deltas(&mut self, _deltas: Option<&Bytes>) -> TicklineResult<()> {
        self.player_applies += 1;
        Ok(())
    }
}
