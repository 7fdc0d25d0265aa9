//! Chaos link for session testing
//!
//! A one-way simulated link carrying any message type. It models:
//! - Base latency plus jitter
//! - Random and burst loss
//! - Reordering
//! - Duplication
//!
//! All randomness comes from a seeded `StdRng`, so a run is reproducible.

use std::time::Duration;

use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Jitter distribution
#[derive(Clone, Debug)]
pub enum JitterDistribution {
    /// No jitter
    None,
    Uniform { min_ms: u32, max_ms: u32 },
    /// Heavy tail, capped at one second
    Pareto { scale_ms: f64, shape: f64 },
}

impl JitterDistribution {
    pub fn sample(&self, rng: &mut StdRng) -> Duration {
        match self {
            JitterDistribution::None => Duration::ZERO,
            JitterDistribution::Uniform { min_ms, max_ms } => {
                if max_ms <= min_ms {
                    return Duration::from_millis(*min_ms as u64);
                }
                let dist = Uniform::new(*min_ms, *max_ms);
                Duration::from_millis(dist.sample(rng) as u64)
            }
            JitterDistribution::Pareto { scale_ms, shape } => {
                let u: f64 = rng.gen_range(f64::EPSILON..1.0);
                let value = scale_ms / u.powf(1.0 / shape);
                Duration::from_millis(value.min(1000.0) as u64)
            }
        }
    }
}

/// Link conditions
#[derive(Clone, Debug)]
pub struct ChaosConfig {
    pub base_latency: Duration,
    pub jitter: JitterDistribution,
    /// Independent loss probability (0.0 - 1.0)
    pub loss_rate: f64,
    /// Probability that a send starts a loss burst
    pub burst_loss_prob: f64,
    /// Burst length range (inclusive)
    pub burst_length: (u32, u32),
    /// Probability a message is held back behind later ones
    pub reorder_prob: f64,
    /// Extra delay given to a reordered message
    pub reorder_delay: Duration,
    pub duplicate_prob: f64,
}

impl Default for ChaosConfig {
    fn default() -> Self {
        ChaosConfig {
            base_latency: Duration::from_millis(50),
            jitter: JitterDistribution::Uniform { min_ms: 0, max_ms: 30 },
            loss_rate: 0.01,
            burst_loss_prob: 0.005,
            burst_length: (2, 4),
            reorder_prob: 0.05,
            reorder_delay: Duration::from_millis(40),
            duplicate_prob: 0.01,
        }
    }
}

impl ChaosConfig {
    /// Fixed latency, nothing lost, reordered or duplicated
    pub fn perfect(latency: Duration) -> Self {
        ChaosConfig {
            base_latency: latency,
            jitter: JitterDistribution::None,
            loss_rate: 0.0,
            burst_loss_prob: 0.0,
            burst_length: (0, 0),
            reorder_prob: 0.0,
            reorder_delay: Duration::ZERO,
            duplicate_prob: 0.0,
        }
    }

    pub fn good() -> Self {
        ChaosConfig {
            base_latency: Duration::from_millis(20),
            jitter: JitterDistribution::Uniform { min_ms: 0, max_ms: 10 },
            loss_rate: 0.001,
            burst_loss_prob: 0.0,
            burst_length: (1, 2),
            reorder_prob: 0.01,
            reorder_delay: Duration::from_millis(20),
            duplicate_prob: 0.001,
        }
    }

    pub fn poor() -> Self {
        ChaosConfig {
            base_latency: Duration::from_millis(100),
            jitter: JitterDistribution::Pareto {
                scale_ms: 20.0,
                shape: 1.5,
            },
            loss_rate: 0.05,
            burst_loss_prob: 0.02,
            burst_length: (2, 6),
            reorder_prob: 0.1,
            reorder_delay: Duration::from_millis(60),
            duplicate_prob: 0.02,
        }
    }

    pub fn hostile() -> Self {
        ChaosConfig {
            base_latency: Duration::from_millis(200),
            jitter: JitterDistribution::Pareto {
                scale_ms: 50.0,
                shape: 1.2,
            },
            loss_rate: 0.15,
            burst_loss_prob: 0.05,
            burst_length: (3, 10),
            reorder_prob: 0.2,
            reorder_delay: Duration::from_millis(120),
            duplicate_prob: 0.05,
        }
    }
}

#[derive(Clone, Debug)]
struct InFlight<T> {
    message: T,
    deliver_at: Duration,
    sent_at: Duration,
    seq: u64,
}

#[derive(Clone, Debug, Default)]
pub struct ChaosStats {
    pub sent: u64,
    pub delivered: u64,
    pub lost: u64,
    pub reordered: u64,
    pub duplicated: u64,
    pub total_latency_ms: u64,
    pub max_latency_ms: u64,
}

impl ChaosStats {
    pub fn loss_rate(&self) -> f64 {
        if self.sent == 0 {
            0.0
        } else {
            self.lost as f64 / self.sent as f64
        }
    }

    pub fn avg_latency_ms(&self) -> f64 {
        if self.delivered == 0 {
            0.0
        } else {
            self.total_latency_ms as f64 / self.delivered as f64
        }
    }
}

/// One-way chaos link
pub struct ChaosLink<T> {
    config: ChaosConfig,
    rng: StdRng,
    in_flight: Vec<InFlight<T>>,
    now: Duration,
    burst_remaining: u32,
    next_seq: u64,
    stats: ChaosStats,
}

impl<T: Clone> ChaosLink<T> {
    pub fn new(config: ChaosConfig, seed: u64) -> Self {
        ChaosLink {
            config,
            rng: StdRng::seed_from_u64(seed),
            in_flight: Vec::new(),
            now: Duration::ZERO,
            burst_remaining: 0,
            next_seq: 0,
            stats: ChaosStats::default(),
        }
    }

    /// Put a message on the link at the current link time
    pub fn send(&mut self, message: T) {
        self.stats.sent += 1;
        let seq = self.next_seq;
        self.next_seq += 1;

        if self.should_drop() {
            self.stats.lost += 1;
            return;
        }

        let mut deliver_at = self.now + self.config.base_latency + self.config.jitter.sample(&mut self.rng);
        if self.rng.gen_bool(self.config.reorder_prob.clamp(0.0, 1.0)) {
            deliver_at += self.config.reorder_delay;
            self.stats.reordered += 1;
        }

        if self.rng.gen_bool(self.config.duplicate_prob.clamp(0.0, 1.0)) {
            let dup_at = deliver_at + self.config.jitter.sample(&mut self.rng);
            self.in_flight.push(InFlight {
                message: message.clone(),
                deliver_at: dup_at,
                sent_at: self.now,
                seq,
            });
            self.stats.duplicated += 1;
        }

        self.in_flight.push(InFlight {
            message,
            deliver_at,
            sent_at: self.now,
            seq,
        });
    }

    fn should_drop(&mut self) -> bool {
        if self.burst_remaining > 0 {
            self.burst_remaining -= 1;
            return true;
        }

        if self.rng.gen_bool(self.config.burst_loss_prob.clamp(0.0, 1.0)) {
            let (min, max) = self.config.burst_length;
            // This message is the first of the burst
            self.burst_remaining = self.rng.gen_range(min..=max.max(min)).saturating_sub(1);
            return true;
        }

        self.rng.gen_bool(self.config.loss_rate.clamp(0.0, 1.0))
    }

    /// Advance link time, returning messages now due in delivery order
    pub fn advance(&mut self, dt: Duration) -> Vec<T> {
        self.now += dt;

        let now = self.now;
        let (mut due, pending): (Vec<_>, Vec<_>) = self.in_flight.drain(..).partition(|m| m.deliver_at <= now);
        self.in_flight = pending;
        due.sort_by_key(|m| (m.deliver_at, m.seq));

        due.into_iter()
            .map(|m| {
                let latency = (m.deliver_at - m.sent_at).as_millis() as u64;
                self.stats.delivered += 1;
                self.stats.total_latency_ms += latency;
                self.stats.max_latency_ms = self.stats.max_latency_ms.max(latency);
                m.message
            })
            .collect()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn stats(&self) -> &ChaosStats {
        &self.stats
    }

    pub fn now(&self) -> Duration {
        self.now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain_all(link: &mut ChaosLink<u32>, steps: usize) -> Vec<u32> {
        let mut out = Vec::new();
        for _ in 0..steps {
            out.extend(link.advance(Duration::from_millis(10)));
        }
        out
    }

    #[test]
    fn test_perfect_link_preserves_order() {
        let mut link = ChaosLink::new(ChaosConfig::perfect(Duration::from_millis(30)), 1);
        for i in 0..50 {
            link.send(i);
        }

        assert!(link.advance(Duration::from_millis(20)).is_empty());
        let delivered = drain_all(&mut link, 2);
        assert_eq!(delivered, (0..50).collect::<Vec<_>>());
        assert_eq!(link.stats().lost, 0);
        assert_eq!(link.in_flight(), 0);
    }

    #[test]
    fn test_good_link_delivers_most() {
        let mut link = ChaosLink::new(ChaosConfig::good(), 12345);
        for i in 0..100 {
            link.send(i);
        }

        let delivered = drain_all(&mut link, 100);
        assert!(delivered.len() > 90);
    }

    #[test]
    fn test_hostile_link_loses_messages() {
        let mut link = ChaosLink::new(ChaosConfig::hostile(), 12345);
        for i in 0..1000 {
            link.send(i);
        }
        drain_all(&mut link, 500);

        let stats = link.stats();
        assert!(stats.loss_rate() > 0.05);
        assert!(stats.reordered > 0);
    }

    #[test]
    fn test_same_seed_same_run() {
        let run = |seed| {
            let mut link = ChaosLink::new(ChaosConfig::poor(), seed);
            for i in 0..200 {
                link.send(i);
            }
            drain_all(&mut link, 200)
        };

        assert_eq!(run(7), run(7));
    }

    #[test]
    fn test_pareto_has_heavy_tail() {
        let mut rng = StdRng::seed_from_u64(42);
        let pareto = JitterDistribution::Pareto {
            scale_ms: 50.0,
            shape: 1.5,
        };

        let samples: Vec<u128> = (0..1000).map(|_| pareto.sample(&mut rng).as_millis()).collect();
        let avg = samples.iter().sum::<u128>() / 1000;
        let max = samples.iter().copied().max().unwrap();

        assert!(max > avg * 2);
    }
}
