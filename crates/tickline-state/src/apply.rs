//! Apply step: the boundary into the simulation being synchronized
//!
//! The engine hands a bracketing pair of envelopes to the simulation. World
//! state is applied first, then entities, then player/session state. An error
//! from any stage is fatal for the pass and propagates to the caller.

use bytes::Bytes;
use tickline_core::{SnapshotEnvelope, TicklineResult};

/// World/map state
pub trait WorldState {
    fn apply_world_delta(&mut self, delta: Option<&Bytes>) -> TicklineResult<()>;
}

/// Entity state
pub trait EntityState {
    /// Apply entity deltas and removals for the current tick
    ///
    /// `next` is the envelope for the following tick, so interpolation targets
    /// can be computed without a second buffer lookup. It may be synthetic.
    fn apply_entity_deltas(
        &mut self,
        deltas: Option<&Bytes>,
        removals: Option<&Bytes>,
        next: &SnapshotEnvelope,
    ) -> TicklineResult<()>;
}

/// Player records and session state
pub trait PlayerState {
    fn apply_player_deltas(&mut self, deltas: Option<&Bytes>) -> TicklineResult<()>;
}

/// Everything the Apply step writes into
pub trait Simulation: WorldState + EntityState + PlayerState {}

impl<T: WorldState + EntityState + PlayerState> Simulation for T {}

/// Apply the bracketing pair `(current, next)` to a simulation
///
/// The envelopes are only borrowed for the duration of the call.
pub fn apply_pair<S: Simulation + ?Sized>(
    sim: &mut S,
    current: &SnapshotEnvelope,
    next: &SnapshotEnvelope,
) -> TicklineResult<()> {
    sim.apply_world_delta(current.world_delta())?;
    sim.apply_entity_deltas(current.entity_deltas(), current.entity_removals(), next)?;
    sim.apply_player_deltas(current.player_deltas())?;
    Ok(())
}
