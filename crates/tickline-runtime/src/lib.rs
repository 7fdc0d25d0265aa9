//! tickline Runtime - Client session orchestration
//!
//! Per frame the session:
//! 1. Drains messages handed over by the network task
//! 2. Buffers each envelope and queues its acknowledgement
//! 3. Advances the clock by the elapsed real time
//! 4. Runs one reconciliation pass per tick due
//! 5. Steps the clock past every applied tick

pub mod ack;
pub mod handoff;
pub mod logging;
pub mod session;

pub use ack::*;
pub use handoff::*;
pub use logging::{init_test_tracing, init_tracing};
pub use session::*;
