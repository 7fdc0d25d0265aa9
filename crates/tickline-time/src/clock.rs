//! Sequence clock implementations

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tickline_core::Tick;

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Capability the reconciliation engine uses to read and steer the local tick
///
/// Passed into the engine explicitly so it can run against a fake clock.
pub trait SequenceClock {
    /// Current logical tick
    fn current_tick(&self) -> Tick;

    /// Jump to a tick (resynchronization after a full snapshot)
    fn set_current_tick(&mut self, tick: Tick);

    /// Ask the clock to run faster than nominal to drain a backlog
    fn set_fast_forward(&mut self, enabled: bool);
}

/// Clock configuration
#[derive(Clone, Debug)]
pub struct ClockConfig {
    /// Nominal ticks per second
    pub tick_rate: u32,
    /// Rate multiplier applied while fast-forward is asserted
    pub fast_forward_rate: f64,
    /// Upper bound on ticks reported by a single `advance`
    pub max_ticks_per_advance: u32,
}

impl Default for ClockConfig {
    fn default() -> Self {
        ClockConfig {
            tick_rate: 60,
            fast_forward_rate: 1.25,
            max_ticks_per_advance: 5,
        }
    }
}

impl ClockConfig {
    /// Configuration for low tick-rate simulations (slow-paced games, tests)
    pub fn low_rate() -> Self {
        ClockConfig {
            tick_rate: 20,
            fast_forward_rate: 1.5,
            max_ticks_per_advance: 3,
        }
    }
}

/// Fixed-rate tick clock with a fast-forward mode
///
/// Real time is accumulated by [`TickClock::advance`], which reports how many
/// ticks are due; the caller runs each tick and calls [`TickClock::step`].
pub struct TickClock {
    /// Current tick
    current: Tick,
    /// Accumulated real time not yet converted into ticks
    accumulator: Duration,
    /// Whether the backlog signal is asserted
    fast_forward: bool,
    /// Rate multiplier while fast-forwarding (1.0 - 2.0)
    fast_forward_rate: f64,
    tick_rate: u32,
    max_ticks_per_advance: u32,
}

impl TickClock {
    /// Create a new clock at tick zero with default configuration
    pub fn new() -> Self {
        Self::with_config(ClockConfig::default())
    }

    pub fn with_config(config: ClockConfig) -> Self {
        TickClock {
            current: Tick::ZERO,
            accumulator: Duration::ZERO,
            fast_forward: false,
            fast_forward_rate: config.fast_forward_rate.clamp(1.0, 2.0),
            tick_rate: config.tick_rate.max(1),
            max_ticks_per_advance: config.max_ticks_per_advance.max(1),
        }
    }

    /// Nominal tick period
    pub fn nominal_period(&self) -> Duration {
        Duration::from_nanos(NANOS_PER_SEC / self.tick_rate as u64)
    }

    /// Effective tick period, shortened while fast-forwarding
    pub fn tick_period(&self) -> Duration {
        if self.fast_forward {
            let rate = self.tick_rate as f64 * self.fast_forward_rate;
            Duration::from_nanos((NANOS_PER_SEC as f64 / rate) as u64)
        } else {
            self.nominal_period()
        }
    }

    /// Accumulate elapsed real time, returning the number of ticks now due
    ///
    /// Time beyond `max_ticks_per_advance` ticks is dropped (e.g. after the
    /// process was suspended) instead of being replayed in a burst.
    pub fn advance(&mut self, dt: Duration) -> u32 {
        self.accumulator += dt;
        let period = self.tick_period();

        let mut due = 0;
        while self.accumulator >= period && due < self.max_ticks_per_advance {
            self.accumulator -= period;
            due += 1;
        }

        if due == self.max_ticks_per_advance && self.accumulator >= period {
            self.accumulator = Duration::ZERO;
        }

        due
    }

    /// Move to the successor tick
    pub fn step(&mut self) -> Tick {
        self.current = self.current.next();
        self.current
    }

    pub fn now(&self) -> Tick {
        self.current
    }

    pub fn is_fast_forward(&self) -> bool {
        self.fast_forward
    }

    /// Fraction of the way to the next tick (0.0 - 1.0), for render interpolation
    pub fn tick_fraction(&self) -> f64 {
        let period = self.tick_period().as_secs_f64();
        (self.accumulator.as_secs_f64() / period).clamp(0.0, 1.0)
    }

    /// Back to tick zero, nominal rate, nothing accumulated
    pub fn reset(&mut self) {
        self.current = Tick::ZERO;
        self.accumulator = Duration::ZERO;
        self.fast_forward = false;
    }
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceClock for TickClock {
    fn current_tick(&self) -> Tick {
        self.current
    }

    fn set_current_tick(&mut self, tick: Tick) {
        self.current = tick;
    }

    fn set_fast_forward(&mut self, enabled: bool) {
        self.fast_forward = enabled;
    }
}

/// Thread-shareable handle to a [`TickClock`]
///
/// The simulation thread steers it; render or UI threads may read it.
#[derive(Clone, Default)]
pub struct SharedClock {
    inner: Arc<RwLock<TickClock>>,
}

impl SharedClock {
    pub fn new(clock: TickClock) -> Self {
        SharedClock {
            inner: Arc::new(RwLock::new(clock)),
        }
    }

    pub fn advance(&self, dt: Duration) -> u32 {
        self.inner.write().advance(dt)
    }

    pub fn step(&self) -> Tick {
        self.inner.write().step()
    }

    pub fn is_fast_forward(&self) -> bool {
        self.inner.read().is_fast_forward()
    }

    pub fn tick_fraction(&self) -> f64 {
        self.inner.read().tick_fraction()
    }

    pub fn tick_period(&self) -> Duration {
        self.inner.read().tick_period()
    }

    pub fn reset(&self) {
        self.inner.write().reset()
    }
}

impl SequenceClock for SharedClock {
    fn current_tick(&self) -> Tick {
        self.inner.read().now()
    }

    fn set_current_tick(&mut self, tick: Tick) {
        self.inner.write().set_current_tick(tick);
    }

    fn set_fast_forward(&mut self, enabled: bool) {
        self.inner.write().set_fast_forward(enabled);
    }
}
