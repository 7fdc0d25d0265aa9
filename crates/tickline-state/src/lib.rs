//! tickline State - Snapshot buffering and reconciliation
//!
//! This crate implements the client side of tick-synchronized replication:
//! - Snapshot buffer keyed by tick, with late/duplicate filtering
//! - Reconciliation engine selecting one bracketing pair per local tick
//! - Synthetic placeholders for envelopes that have not arrived
//! - Backlog signal driving the clock's fast-forward mode
//! - Apply traits implemented by the simulation being synchronized

pub mod ack;
pub mod apply;
pub mod buffer;
pub mod reconcile;

pub use ack::*;
pub use apply::*;
pub use buffer::*;
pub use reconcile::*;
