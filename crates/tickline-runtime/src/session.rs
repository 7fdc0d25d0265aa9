//! Client session - per-frame loop around the reconciliation engine

use std::time::Duration;

use tickline_core::{NetMessage, Tick, TicklineError, TicklineResult};
use tickline_state::{ReconcileConfig, ReconcileOutcome, ReconcileStats, ReconciliationEngine, Simulation};
use tickline_time::{ClockConfig, SequenceClock, SharedClock, TickClock};
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

use crate::{handoff_channel, ChannelAckSink, NetworkHandle, SnapshotInbox};

/// Session configuration
#[derive(Clone, Debug, Default)]
pub struct SessionConfig {
    pub reconcile: ReconcileConfig,
    pub clock: ClockConfig,
}

impl SessionConfig {
    /// LAN or local server: drain any backlog at once
    pub fn low_latency() -> Self {
        SessionConfig {
            reconcile: ReconcileConfig::low_latency(),
            clock: ClockConfig::default(),
        }
    }

    /// Lossy or jittery links: buffer deeper before fast-forwarding
    pub fn high_jitter() -> Self {
        SessionConfig {
            reconcile: ReconcileConfig::high_jitter(),
            clock: ClockConfig::default(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct SessionStats {
    pub messages_in: u64,
    pub messages_ignored: u64,
    pub frames: u64,
    pub ticks_run: u64,
}

/// What one frame did
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Ticks the clock said were due
    pub ticks_due: u32,
    /// Bracketing pairs applied
    pub applied: u32,
    /// Still waiting for the full snapshot handoff
    pub awaiting_full: bool,
}

/// Client side of one replication session
///
/// Owned by the simulation thread. The network task talks to it only through
/// the [`NetworkHandle`] returned by [`ClientSession::new`].
pub struct ClientSession {
    engine: ReconciliationEngine,
    clock: SharedClock,
    inbox: SnapshotInbox,
    outbound: mpsc::UnboundedSender<NetMessage>,
    acks: ChannelAckSink,
    stats: SessionStats,
}

impl ClientSession {
    pub fn new(config: SessionConfig) -> (Self, NetworkHandle) {
        let (inbound, inbox) = handoff_channel();
        let (outbound, outbound_rx) = mpsc::unbounded_channel();

        let session = ClientSession {
            engine: ReconciliationEngine::with_config(config.reconcile),
            clock: SharedClock::new(TickClock::with_config(config.clock)),
            inbox,
            acks: ChannelAckSink::new(outbound.clone()),
            outbound,
            stats: SessionStats::default(),
        };

        let handle = NetworkHandle {
            inbound,
            outbound: outbound_rx,
        };

        (session, handle)
    }

    /// Shared clock handle (render/UI threads may read it)
    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    pub fn engine(&self) -> &ReconciliationEngine {
        &self.engine
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn reconcile_stats(&self) -> &ReconcileStats {
        self.engine.stats()
    }

    pub fn current_tick(&self) -> Tick {
        self.clock.current_tick()
    }

    /// Drain the handoff channel into the buffer, acknowledging each envelope
    ///
    /// Returns the number of messages taken. Fails with `ChannelClosed` once
    /// the network side is gone and nothing is left to drain.
    pub fn pump(&mut self) -> TicklineResult<usize> {
        let mut taken = 0;

        while let Some(message) = self.inbox.try_next()? {
            taken += 1;
            self.stats.messages_in += 1;

            let kind = message.kind();
            match message.into_envelope() {
                Some(envelope) => {
                    self.engine.receive(envelope, &mut self.acks);
                }
                None => {
                    self.stats.messages_ignored += 1;
                    trace!(?kind, "ignoring non-snapshot message");
                }
            }
        }

        Ok(taken)
    }

    /// One reconciliation pass at the current tick
    pub fn reconcile_tick<S: Simulation + ?Sized>(&mut self, sim: &mut S) -> TicklineResult<ReconcileOutcome> {
        let outcome = self.engine.reconcile_tick(&mut self.clock, sim)?;
        self.stats.ticks_run += 1;
        Ok(outcome)
    }

    /// Per-frame entry point
    ///
    /// Pumps the inbox, then runs one reconciliation pass per tick the clock
    /// says is due. The clock only steps past a tick whose pair was applied;
    /// while waiting for a full snapshot it stays where the handoff put it.
    pub fn frame<S: Simulation + ?Sized>(&mut self, dt: Duration, sim: &mut S) -> TicklineResult<FrameReport> {
        self.stats.frames += 1;
        self.pump()?;

        let ticks_due = self.clock.advance(dt);
        let mut report = FrameReport {
            ticks_due,
            ..Default::default()
        };

        for _ in 0..ticks_due {
            match self.reconcile_tick(sim)? {
                ReconcileOutcome::Applied(_) => {
                    report.applied += 1;
                    self.clock.step();
                }
                ReconcileOutcome::AwaitingFull | ReconcileOutcome::AwaitingNext { .. } => break,
            }
        }

        report.awaiting_full = self.engine.is_awaiting_full();
        Ok(report)
    }

    /// Discard buffered state and ask the remote side for a full snapshot
    pub fn request_full_state(&mut self) -> TicklineResult<Tick> {
        let tick = self.engine.request_full_state(&mut self.clock);
        self.outbound
            .send(NetMessage::RequestFullState(tick))
            .map_err(|_| TicklineError::ChannelClosed)?;
        Ok(tick)
    }

    /// Drop the session's replicated state (disconnect / before reconnect)
    pub fn disconnect(&mut self) {
        self.engine.reset();
        self.clock.reset();
        let discarded = self.inbox.discard_pending();
        if discarded > 0 {
            debug!(discarded, "discarded undelivered messages");
        }
        info!("session disconnected");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use tickline_core::SnapshotEnvelope;
    use tickline_state::{EntityState, PlayerState, WorldState};

    #[derive(Default)]
    struct CountingSim {
        applies: u32,
        last_next: Option<Tick>,
    }

    impl WorldState for CountingSim {
        fn apply_world_delta(&mut self, _delta: Option<&Bytes>) -> TicklineResult<()> {
            self.applies += 1;
            Ok(())
        }
    }

    impl EntityState for CountingSim {
        fn apply_entity_deltas(
            &mut self,
            _deltas: Option<&Bytes>,
            _removals: Option<&Bytes>,
            next: &SnapshotEnvelope,
        ) -> TicklineResult<()> {
            self.last_next = Some(next.to_tick());
            Ok(())
        }
    }

    impl PlayerState for CountingSim {
        fn apply_player_deltas(&mut self, _deltas: Option<&Bytes>) -> TicklineResult<()> {
            Ok(())
        }
    }

    fn delta(from: u32, to: u32) -> NetMessage {
        NetMessage::classify(SnapshotEnvelope::delta(Tick::new(from), Tick::new(to)).unwrap())
    }

    fn full(to: u32) -> NetMessage {
        NetMessage::classify(SnapshotEnvelope::full(Tick::new(to)).unwrap())
    }

    fn test_config() -> SessionConfig {
        SessionConfig {
            reconcile: ReconcileConfig::default(),
            clock: ClockConfig {
                tick_rate: 10,
                fast_forward_rate: 1.25,
                max_ticks_per_advance: 5,
            },
        }
    }

    #[test]
    fn test_pump_acks_every_envelope() {
        let (mut session, mut handle) = ClientSession::new(test_config());

        handle.inbound.send(full(5)).unwrap();
        handle.inbound.send(delta(5, 6)).unwrap();
        handle.inbound.send(delta(5, 6)).unwrap();
        handle.inbound.send(NetMessage::StateAck(Tick::new(1))).unwrap();

        assert_eq!(session.pump().unwrap(), 4);
        assert_eq!(session.stats().messages_ignored, 1);

        let acks = handle.drain_outbound();
        assert_eq!(
            acks,
            vec![
                NetMessage::StateAck(Tick::new(5)),
                NetMessage::StateAck(Tick::new(6)),
                NetMessage::StateAck(Tick::new(6)),
            ]
        );
    }

    #[test]
    fn test_frame_handoff_then_steady() {
        let (mut session, handle) = ClientSession::new(test_config());
        let mut sim = CountingSim::default();

        handle.inbound.send(full(5)).unwrap();
        handle.inbound.send(delta(5, 6)).unwrap();
        handle.inbound.send(delta(6, 7)).unwrap();

        // One tick due at 10 Hz
        let report = session.frame(Duration::from_millis(100), &mut sim).unwrap();
        assert_eq!(report.applied, 1);
        assert!(!report.awaiting_full);
        assert_eq!(session.current_tick(), Tick::new(6));

        let report = session.frame(Duration::from_millis(100), &mut sim).unwrap();
        assert_eq!(report.applied, 1);
        assert_eq!(session.current_tick(), Tick::new(7));
        assert_eq!(sim.last_next, Some(Tick::new(7)));
        assert_eq!(sim.applies, 2);
    }

    #[test]
    fn test_frame_waits_for_full_snapshot() {
        let (mut session, handle) = ClientSession::new(test_config());
        let mut sim = CountingSim::default();

        handle.inbound.send(delta(3, 4)).unwrap();
        let report = session.frame(Duration::from_millis(300), &mut sim).unwrap();

        assert_eq!(report.ticks_due, 3);
        assert_eq!(report.applied, 0);
        assert!(report.awaiting_full);
        assert_eq!(session.current_tick(), Tick::ZERO);
        assert_eq!(sim.applies, 0);
    }

    #[test]
    fn test_request_full_state_sends_request() {
        let (mut session, mut handle) = ClientSession::new(test_config());
        let mut sim = CountingSim::default();

        handle.inbound.send(full(5)).unwrap();
        handle.inbound.send(delta(5, 6)).unwrap();
        session.frame(Duration::from_millis(100), &mut sim).unwrap();
        handle.drain_outbound();

        let tick = session.request_full_state().unwrap();
        assert_eq!(tick, Tick::new(6));
        assert!(session.engine().is_awaiting_full());
        assert_eq!(handle.drain_outbound(), vec![NetMessage::RequestFullState(Tick::new(6))]);
    }

    #[test]
    fn test_disconnect_resets_session() {
        let (mut session, handle) = ClientSession::new(test_config());
        let mut sim = CountingSim::default();

        handle.inbound.send(full(5)).unwrap();
        handle.inbound.send(delta(5, 6)).unwrap();
        session.frame(Duration::from_millis(100), &mut sim).unwrap();
        handle.inbound.send(delta(6, 7)).unwrap();

        session.disconnect();

        assert!(session.engine().is_awaiting_full());
        assert!(session.engine().buffer().is_empty());
        assert_eq!(session.current_tick(), Tick::ZERO);
        assert!(!session.clock().is_fast_forward());
        assert_eq!(session.pump().unwrap(), 0);
    }

    #[test]
    fn test_pump_reports_closed_network() {
        let (mut session, handle) = ClientSession::new(test_config());
        drop(handle);
        assert!(matches!(session.pump(), Err(TicklineError::ChannelClosed)));
    }

    #[tokio::test]
    async fn test_network_task_feeds_session() {
        let (mut session, mut handle) = ClientSession::new(test_config());
        let sender = handle.sender();

        tokio::spawn(async move {
            sender.send(full(20)).unwrap();
            for t in 21..=25u32 {
                sender.send(delta(t - 1, t)).unwrap();
            }
        })
        .await
        .unwrap();

        let mut sim = CountingSim::default();
        let report = session.frame(Duration::from_millis(500), &mut sim).unwrap();

        assert_eq!(report.applied, 5);
        assert_eq!(session.current_tick(), Tick::new(25));

        let mut acked = Vec::new();
        while let Ok(Some(message)) =
            tokio::time::timeout(Duration::from_millis(10), handle.next_outbound()).await
        {
            acked.push(message.tick());
        }
        assert_eq!(acked, (20..=25).map(Tick::new).collect::<Vec<_>>());
    }
}
