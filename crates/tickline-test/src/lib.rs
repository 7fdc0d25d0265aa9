//! tickline Test Harness - Scenario testing for replication sessions
//!
//! This crate provides:
//! - Chaos links (latency, jitter, loss, reordering, duplication)
//! - A scripted authoritative snapshot producer
//! - A recording simulation with failure injection
//! - A scenario runner wiring them to a `ClientSession`

pub mod chaos;
pub mod recording;
pub mod scenario;
pub mod server;

pub use chaos::*;
pub use recording::*;
pub use scenario::*;
pub use server::*;
