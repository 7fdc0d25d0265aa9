//! Snapshot reconciliation pipeline
//!
//! Once per local tick the engine picks the bracketing pair of envelopes for
//! `(current, current + 1)`, fabricating empty placeholders for whichever is
//! missing, applies it to the simulation and steers the clock's fast-forward
//! signal from the buffer depth.

use tickline_core::{SnapshotEnvelope, Tick, TicklineResult};
use tickline_time::SequenceClock;
use tracing::{debug, info, trace, warn};

use crate::{apply_pair, AckSink, InsertOutcome, Simulation, SnapshotBuffer};

/// Minimum working set kept in the buffer: last, current and next
pub const WORKING_SET: usize = 3;

/// Reconciliation configuration
#[derive(Clone, Debug)]
pub struct ReconcileConfig {
    /// Envelopes tolerated beyond the working set before fast-forwarding
    pub target_ratio: u32,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        ReconcileConfig { target_ratio: 2 }
    }
}

impl ReconcileConfig {
    /// Drain any backlog immediately (LAN, local servers)
    pub fn low_latency() -> Self {
        ReconcileConfig { target_ratio: 0 }
    }

    /// Tolerate a deeper buffer before speeding up (high-jitter links)
    pub fn high_jitter() -> Self {
        ReconcileConfig { target_ratio: 4 }
    }

    /// Buffer depth above which fast-forward is asserted
    pub fn fast_forward_threshold(&self) -> usize {
        WORKING_SET + self.target_ratio as usize
    }
}

/// Counters for diagnostics
#[derive(Clone, Debug, Default)]
pub struct ReconcileStats {
    pub passes: u64,
    pub applied: u64,
    pub synthesized_current: u64,
    pub synthesized_next: u64,
    pub stored: u64,
    pub duplicates: u64,
    pub late: u64,
    pub replaced_synthetic: u64,
    pub full_received: u64,
    pub acks_sent: u64,
    pub purged: u64,
    pub full_requests: u64,
    pub fast_forward_passes: u64,
}

/// The pair applied by one reconciliation pass
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AppliedPair {
    pub current: Tick,
    pub next: Tick,
    pub current_synthetic: bool,
    pub next_synthetic: bool,
    /// This pass left "awaiting full" mode
    pub handoff: bool,
    /// Non-full envelopes left in the buffer after the pass
    pub buffer_depth: usize,
    /// Fast-forward decision sent to the clock
    pub fast_forward: bool,
}

/// Result of one reconciliation pass
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// No full snapshot has been received; nothing applied
    AwaitingFull,
    /// Clock resynced to the full snapshot, but its successor has not arrived
    AwaitingNext { resync: Tick },
    /// Exactly one bracketing pair was applied
    Applied(AppliedPair),
}

impl ReconcileOutcome {
    pub fn applied(&self) -> Option<&AppliedPair> {
        match self {
            ReconcileOutcome::Applied(pair) => Some(pair),
            _ => None,
        }
    }
}

/// Tick-buffered reconciliation engine
pub struct ReconciliationEngine {
    buffer: SnapshotBuffer,
    config: ReconcileConfig,
    stats: ReconcileStats,
}

impl ReconciliationEngine {
    pub fn new() -> Self {
        Self::with_config(ReconcileConfig::default())
    }

    pub fn with_config(config: ReconcileConfig) -> Self {
        ReconciliationEngine {
            buffer: SnapshotBuffer::new(),
            config,
            stats: ReconcileStats::default(),
        }
    }

    pub fn buffer(&self) -> &SnapshotBuffer {
        &self.buffer
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    pub fn stats(&self) -> &ReconcileStats {
        &self.stats
    }

    pub fn is_awaiting_full(&self) -> bool {
        self.buffer.is_awaiting_full()
    }

    /// Take a received envelope: buffer it and acknowledge its `to_tick`
    ///
    /// The acknowledgement goes out whatever the buffer decides to do with it.
    pub fn receive<A: AckSink + ?Sized>(
        &mut self,
        envelope: SnapshotEnvelope,
        acks: &mut A,
    ) -> InsertOutcome {
        let tick = envelope.to_tick();
        let full = envelope.is_full();

        let outcome = self.buffer.insert(envelope);
        match outcome {
            InsertOutcome::Stored => self.stats.stored += 1,
            InsertOutcome::ReplacedSynthetic => self.stats.replaced_synthetic += 1,
            InsertOutcome::Duplicate => self.stats.duplicates += 1,
            InsertOutcome::Late => self.stats.late += 1,
            InsertOutcome::FullStored if !self.buffer.is_awaiting_full() => {
                // Stored only: an unsolicited full snapshot does not resync a running session.
                warn!(tick = %tick, "full snapshot received in steady state; storing without resync");
            }
            InsertOutcome::FullStored | InsertOutcome::FullIgnored => {}
        }
        if full {
            self.stats.full_received += 1;
        }

        acks.send_ack(tick);
        self.stats.acks_sent += 1;
        trace!(tick = %tick, ?outcome, "acknowledged envelope");

        outcome
    }

    /// Run one reconciliation pass for the clock's current tick
    ///
    /// Any error comes from the Apply step and is not retried.
    pub fn reconcile_tick<C, S>(&mut self, clock: &mut C, sim: &mut S) -> TicklineResult<ReconcileOutcome>
    where
        C: SequenceClock + ?Sized,
        S: Simulation + ?Sized,
    {
        self.stats.passes += 1;

        if self.buffer.is_awaiting_full() {
            self.reconcile_awaiting_full(clock, sim)
        } else {
            self.reconcile_steady(clock, sim)
        }
    }

    fn reconcile_awaiting_full<C, S>(&mut self, clock: &mut C, sim: &mut S) -> TicklineResult<ReconcileOutcome>
    where
        C: SequenceClock + ?Sized,
        S: Simulation + ?Sized,
    {
        clock.set_fast_forward(false);

        let Some(full_tick) = self.buffer.last_full_snapshot().map(SnapshotEnvelope::to_tick) else {
            return Ok(ReconcileOutcome::AwaitingFull);
        };

        clock.set_current_tick(full_tick);
        self.purge(full_tick.prev());

        let next = full_tick.next();
        let (Some(full), Some(next_env)) = (self.buffer.last_full_snapshot(), self.buffer.get(next)) else {
            trace!(resync = %full_tick, "waiting for envelope following full snapshot");
            return Ok(ReconcileOutcome::AwaitingNext { resync: full_tick });
        };

        apply_pair(sim, full, next_env)?;

        self.buffer.complete_handoff();
        self.buffer.mark_applied(full_tick);
        self.stats.applied += 1;
        info!(tick = %full_tick, "full snapshot applied; entering steady state");

        let (buffer_depth, fast_forward) = self.update_backlog_signal(clock);
        Ok(ReconcileOutcome::Applied(AppliedPair {
            current: full_tick,
            next,
            current_synthetic: false,
            next_synthetic: false,
            handoff: true,
            buffer_depth,
            fast_forward,
        }))
    }

    fn reconcile_steady<C, S>(&mut self, clock: &mut C, sim: &mut S) -> TicklineResult<ReconcileOutcome>
    where
        C: SequenceClock + ?Sized,
        S: Simulation + ?Sized,
    {
        let current = clock.current_tick();
        let last = current.prev();
        let next = current.next();

        self.purge(last);

        let current_synthetic = self.buffer.insert_synthetic(current);
        if current_synthetic {
            debug!(tick = %current, "current envelope missing; substituting placeholder");
            self.stats.synthesized_current += 1;
        }

        let next_synthetic = self.buffer.insert_synthetic(next);
        if next_synthetic {
            debug!(tick = %next, "next envelope missing; substituting placeholder");
            self.stats.synthesized_next += 1;
        }

        {
            let (cur_env, next_env) = self.buffer.bracket(current, next);
            apply_pair(sim, &cur_env, &next_env)?;
        }

        self.buffer.mark_applied(current);
        self.stats.applied += 1;

        let (buffer_depth, fast_forward) = self.update_backlog_signal(clock);
        Ok(ReconcileOutcome::Applied(AppliedPair {
            current,
            next,
            current_synthetic,
            next_synthetic,
            handoff: false,
            buffer_depth,
            fast_forward,
        }))
    }

    fn purge(&mut self, older_than: Tick) {
        let purged = self.buffer.purge(older_than);
        if purged > 0 {
            debug!(older_than = %older_than, purged, "purged stale envelopes");
            self.stats.purged += purged as u64;
        }
    }

    /// Assert fast-forward iff the buffer holds more than the working set plus the target ratio
    fn update_backlog_signal<C: SequenceClock + ?Sized>(&mut self, clock: &mut C) -> (usize, bool) {
        let depth = self.buffer.depth();
        let fast_forward = depth > self.config.fast_forward_threshold();

        clock.set_fast_forward(fast_forward);
        if fast_forward {
            self.stats.fast_forward_passes += 1;
        }

        (depth, fast_forward)
    }

    /// Drop everything buffered and wait for a fresh full snapshot
    ///
    /// Returns the tick the clock was at, to be sent with the request.
    pub fn request_full_state<C: SequenceClock + ?Sized>(&mut self, clock: &mut C) -> Tick {
        let tick = clock.current_tick();
        self.buffer.clear();
        clock.set_fast_forward(false);
        self.stats.full_requests += 1;
        info!(tick = %tick, "requesting full state");
        tick
    }

    /// Session reset (disconnect/reconnect): empty buffer, await full snapshot
    pub fn reset(&mut self) {
        self.buffer.clear();
        info!("reconciliation engine reset");
    }
}

impl Default for ReconciliationEngine {
    fn default() -> Self {
        Self::new()
    }
}
