//! Acknowledgement emitter
//!
//! Every received envelope is acknowledged by its `to_tick`, whether or not
//! the buffer keeps it, so the remote side can prune retained history.

use tickline_core::Tick;

/// Outbound path for acknowledgements (fire-and-forget)
pub trait AckSink {
    fn send_ack(&mut self, tick: Tick);
}

impl AckSink for Vec<Tick> {
    fn send_ack(&mut self, tick: Tick) {
        self.push(tick);
    }
}

impl<T: AckSink + ?Sized> AckSink for &mut T {
    fn send_ack(&mut self, tick: Tick) {
        (**self).send_ack(tick);
    }
}

/// Sink that drops every acknowledgement (replays, offline tools)
#[derive(Clone, Copy, Debug, Default)]
pub struct NullAckSink;

impl AckSink for NullAckSink {
    fn send_ack(&mut self, _tick: Tick) {}
}
