//! tickline Time - Sequence clock for the fixed-tick simulation loop
//!
//! This crate provides:
//! - The `SequenceClock` capability the reconciliation engine steers
//! - `TickClock`: fixed tick rate, real-time accumulator, fast-forward mode
//! - `SharedClock`: the same clock behind a lock for cross-thread readers

pub mod clock;

pub use clock::*;
