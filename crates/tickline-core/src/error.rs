//! Error types for tickline

use thiserror::Error;

use crate::Tick;

/// Stage of the Apply step that failed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyStage {
    World,
    Entities,
    Players,
}

impl std::fmt::Display for ApplyStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApplyStage::World => write!(f, "world"),
            ApplyStage::Entities => write!(f, "entities"),
            ApplyStage::Players => write!(f, "players"),
        }
    }
}

/// Core tickline errors
///
/// Late, duplicate and missing envelopes are not errors; they are absorbed by
/// the snapshot buffer and the reconciliation engine.
#[derive(Error, Debug)]
pub enum TicklineError {
    #[error("Invalid envelope: to_tick {to} must come after from_tick {from}")]
    InvalidEnvelope { from: Tick, to: Tick },

    #[error("Apply failed at tick {tick} ({stage}): {reason}")]
    Apply {
        tick: Tick,
        stage: ApplyStage,
        reason: String,
    },

    #[error("Network channel closed")]
    ChannelClosed,
}

impl TicklineError {
    /// Build an Apply failure for a simulation stage
    pub fn apply(tick: Tick, stage: ApplyStage, reason: impl Into<String>) -> Self {
        TicklineError::Apply {
            tick,
            stage,
            reason: reason.into(),
        }
    }
}

/// Result type for tickline operations
pub type TicklineResult<T> = Result<T, TicklineError>;
