//! Snapshot buffer
//!
//! Holds received envelopes keyed by `to_tick`, the most recent full snapshot,
//! and whether the session is still waiting for its first full snapshot.

use std::borrow::Cow;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

use tickline_core::{SnapshotEnvelope, Tick};
use tracing::trace;

/// What `insert` did with an envelope
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    /// New entry for its tick
    Stored,
    /// A synthetic placeholder for the same tick was evicted in favour of it
    ReplacedSynthetic,
    /// A real envelope for the same tick is already held; incoming dropped
    Duplicate,
    /// Already consumed by reconciliation; incoming dropped
    Late,
    /// Became the held full snapshot
    FullStored,
    /// Older than (or same as) the held full snapshot; dropped
    FullIgnored,
}

impl InsertOutcome {
    /// Did the buffer keep the envelope?
    pub fn is_retained(self) -> bool {
        matches!(
            self,
            InsertOutcome::Stored | InsertOutcome::ReplacedSynthetic | InsertOutcome::FullStored
        )
    }
}

/// Buffer of envelopes waiting to be reconciled
#[derive(Debug)]
pub struct SnapshotBuffer {
    /// Non-full envelopes, one per `to_tick`
    entries: HashMap<Tick, SnapshotEnvelope>,
    /// Most recent full snapshot seen
    last_full: Option<SnapshotEnvelope>,
    /// Still waiting for the first full snapshot handoff
    awaiting_full: bool,
    /// Last tick consumed by reconciliation
    last_applied: Tick,
}

impl SnapshotBuffer {
    pub fn new() -> Self {
        SnapshotBuffer {
            entries: HashMap::new(),
            last_full: None,
            awaiting_full: true,
            last_applied: Tick::ZERO,
        }
    }

    /// Insert a received envelope
    ///
    /// Never mutates a stored entry; replacement is remove then insert.
    pub fn insert(&mut self, envelope: SnapshotEnvelope) -> InsertOutcome {
        let to_tick = envelope.to_tick();

        if envelope.is_full() {
            let newer = self
                .last_full
                .as_ref()
                .map_or(true, |held| to_tick.is_after(held.to_tick()));

            if !newer {
                trace!(tick = %to_tick, "ignoring stale full snapshot");
                return InsertOutcome::FullIgnored;
            }

            self.last_full = Some(envelope);
            return InsertOutcome::FullStored;
        }

        if !self.awaiting_full && !to_tick.is_after(self.last_applied) {
            trace!(tick = %to_tick, last_applied = %self.last_applied, "dropping late envelope");
            return InsertOutcome::Late;
        }

        match self.entries.get(&to_tick).map(SnapshotEnvelope::is_synthetic) {
            Some(true) => {
                self.entries.remove(&to_tick);
                self.entries.insert(to_tick, envelope);
                InsertOutcome::ReplacedSynthetic
            }
            Some(false) => {
                trace!(tick = %to_tick, "dropping duplicate envelope");
                InsertOutcome::Duplicate
            }
            None => {
                self.entries.insert(to_tick, envelope);
                InsertOutcome::Stored
            }
        }
    }

    /// Store a locally fabricated placeholder unless the tick is already held
    ///
    /// Returns true if a placeholder was inserted.
    pub(crate) fn insert_synthetic(&mut self, to_tick: Tick) -> bool {
        match self.entries.entry(to_tick) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(SnapshotEnvelope::synthetic(to_tick));
                true
            }
        }
    }

    /// Remove every non-full envelope whose `to_tick` comes before `older_than`
    ///
    /// Returns the number of envelopes removed.
    pub fn purge(&mut self, older_than: Tick) -> usize {
        let before = self.entries.len();
        self.entries.retain(|tick, _| !tick.is_before(older_than));
        before - self.entries.len()
    }

    pub fn get(&self, tick: Tick) -> Option<&SnapshotEnvelope> {
        self.entries.get(&tick)
    }

    /// Both envelopes of a bracketing pair
    ///
    /// A tick that is not held is answered with a placeholder built on the spot.
    pub fn bracket(&self, current: Tick, next: Tick) -> (Cow<'_, SnapshotEnvelope>, Cow<'_, SnapshotEnvelope>) {
        (self.held_or_synthetic(current), self.held_or_synthetic(next))
    }

    fn held_or_synthetic(&self, tick: Tick) -> Cow<'_, SnapshotEnvelope> {
        self.entries
            .get(&tick)
            .map_or_else(|| Cow::Owned(SnapshotEnvelope::synthetic(tick)), Cow::Borrowed)
    }

    pub fn contains(&self, tick: Tick) -> bool {
        self.entries.contains_key(&tick)
    }

    /// Number of buffered non-full envelopes
    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last_full_snapshot(&self) -> Option<&SnapshotEnvelope> {
        self.last_full.as_ref()
    }

    pub fn is_awaiting_full(&self) -> bool {
        self.awaiting_full
    }

    pub fn last_applied(&self) -> Tick {
        self.last_applied
    }

    /// Leave "awaiting full" mode after the handoff pair was applied
    pub(crate) fn complete_handoff(&mut self) {
        self.awaiting_full = false;
    }

    pub(crate) fn mark_applied(&mut self, tick: Tick) {
        self.last_applied = tick;
    }

    /// Ticks currently buffered, in ascending order (diagnostics)
    pub fn ticks(&self) -> Vec<Tick> {
        let mut ticks: Vec<Tick> = self.entries.keys().copied().collect();
        if let Some(first) = ticks.first().copied() {
            ticks.sort_by_key(|t| t.diff(first));
        }
        ticks
    }

    /// Empty the buffer and go back to waiting for a full snapshot
    pub fn clear(&mut self) {
        self.entries.clear();
        self.last_full = None;
        self.awaiting_full = true;
        self.last_applied = Tick::ZERO;
    }
}

impl Default for SnapshotBuffer {
    fn default() -> Self {
        Self::new()
    }
}
