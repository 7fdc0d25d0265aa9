//! End-to-end scenario runner
//!
//! Drives a [`ScriptedServer`] and a [`ClientSession`] in lockstep simulated
//! time, with a chaos link in each direction. Nothing sleeps; a ten second
//! scenario runs as fast as the reconciliation itself.

use std::time::Duration;

use tickline_core::{NetMessage, Tick, TicklineResult};
use tickline_runtime::{ClientSession, SessionConfig, SessionStats};
use tickline_state::{ReconcileStats, Simulation};
use tickline_time::ClockConfig;
use tracing::{debug, info};

use crate::{ChaosConfig, ChaosLink, ChaosStats, ScriptedServer, ServerStats};

/// Scenario parameters
#[derive(Clone, Debug)]
pub struct ScenarioConfig {
    pub session: SessionConfig,
    /// Server to client
    pub downlink: ChaosConfig,
    /// Client to server
    pub uplink: ChaosConfig,
    pub seed: u64,
    /// First tick the server produces (as a full snapshot)
    pub server_start: Tick,
    /// Simulated wall time
    pub duration: Duration,
    /// Client frame length
    pub frame_dt: Duration,
    /// Ask for a full snapshot once this many frames have run
    pub request_full_after_frames: Option<u64>,
    /// Re-request a full snapshot after this many consecutive frames without one
    pub resync_after_frames: Option<u64>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        let clock = ClockConfig::default();
        let frame_dt = Duration::from_nanos(1_000_000_000 / clock.tick_rate.max(1) as u64);

        ScenarioConfig {
            session: SessionConfig {
                clock,
                ..Default::default()
            },
            downlink: ChaosConfig::perfect(Duration::from_millis(50)),
            uplink: ChaosConfig::perfect(Duration::from_millis(50)),
            seed: 1,
            server_start: Tick::new(100),
            duration: Duration::from_secs(10),
            frame_dt,
            request_full_after_frames: None,
            resync_after_frames: Some(90),
        }
    }
}

impl ScenarioConfig {
    /// Same links in both directions
    pub fn with_links(mut self, chaos: ChaosConfig) -> Self {
        self.downlink = chaos.clone();
        self.uplink = chaos;
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct ScenarioReport {
    pub frames: u64,
    pub ticks_due: u64,
    pub applied: u64,
    /// Frames that ended still waiting for the full snapshot handoff
    pub awaiting_frames: u64,
    /// Full-state requests sent because the handoff never completed
    pub resync_requests: u64,
    /// Frames that ended with fast-forward asserted
    pub fast_forward_frames: u64,
    pub final_tick: Tick,
    pub server_tick: Tick,
    /// Produced but unacknowledged on the server at the end
    pub server_retained: usize,
    pub reconcile: ReconcileStats,
    pub session: SessionStats,
    pub server: ServerStats,
    pub downlink: ChaosStats,
    pub uplink: ChaosStats,
}

/// Run a scenario against `sim`
///
/// Stops at the first Apply error, which is returned unchanged.
pub fn run_scenario<S: Simulation + ?Sized>(config: &ScenarioConfig, sim: &mut S) -> TicklineResult<ScenarioReport> {
    let (mut session, mut handle) = ClientSession::new(config.session.clone());
    let mut server = ScriptedServer::new(config.server_start);
    let mut downlink: ChaosLink<NetMessage> = ChaosLink::new(config.downlink.clone(), config.seed);
    let mut uplink: ChaosLink<NetMessage> = ChaosLink::new(config.uplink.clone(), config.seed.wrapping_add(1));

    let server_period = session.clock().tick_period();
    let mut server_time = Duration::ZERO;
    let mut elapsed = Duration::ZERO;
    let mut report = ScenarioReport::default();
    let mut awaiting_streak = 0u64;

    info!(seed = config.seed, duration = ?config.duration, "scenario starting");

    while elapsed < config.duration {
        elapsed += config.frame_dt;

        // Server runs at the nominal rate regardless of the client's clock
        server_time += config.frame_dt;
        while server_time >= server_period {
            server_time -= server_period;
            downlink.send(server.produce()?);
        }

        for message in downlink.advance(config.frame_dt) {
            handle.inbound.send(message)?;
        }

        let frame = session.frame(config.frame_dt, sim)?;
        report.frames += 1;
        report.ticks_due += frame.ticks_due as u64;
        report.applied += frame.applied as u64;
        if frame.awaiting_full {
            report.awaiting_frames += 1;
            awaiting_streak += 1;
        } else {
            awaiting_streak = 0;
        }
        if session.clock().is_fast_forward() {
            report.fast_forward_frames += 1;
        }

        if config.request_full_after_frames == Some(report.frames) {
            let tick = session.request_full_state()?;
            debug!(tick = %tick, "scenario requested full state");
        } else if config.resync_after_frames.is_some_and(|limit| awaiting_streak >= limit) {
            // Full snapshot (or the request for one) was lost on the link
            let tick = session.request_full_state()?;
            report.resync_requests += 1;
            awaiting_streak = 0;
            debug!(tick = %tick, "no handoff yet; re-requesting full state");
        }

        for message in handle.drain_outbound() {
            uplink.send(message);
        }
        for message in uplink.advance(config.frame_dt) {
            server.handle(&message);
        }
    }

    report.final_tick = session.current_tick();
    report.server_tick = server.tick();
    report.server_retained = server.retained();
    report.reconcile = session.reconcile_stats().clone();
    report.session = session.stats().clone();
    report.server = server.stats().clone();
    report.downlink = downlink.stats().clone();
    report.uplink = uplink.stats().clone();

    info!(
        frames = report.frames,
        applied = report.applied,
        final_tick = %report.final_tick,
        server_tick = %report.server_tick,
        "scenario finished"
    );

    Ok(report)
}
