//! tickline Core - Fundamental types for tick-synchronized state replication
//!
//! This crate defines the types shared by every other tickline crate:
//! - Tick sequence numbers with wrap-safe arithmetic
//! - Snapshot envelopes (full and incremental)
//! - Network messages, classified once at the network boundary
//! - Error types

pub mod tick;
pub mod snapshot;
pub mod message;
pub mod error;

pub use tick::*;
pub use snapshot::*;
pub use message::*;
pub use error::*;
