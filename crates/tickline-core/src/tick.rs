//! Tick sequence numbers
//!
//! Ticks are 32-bit and wrap. Ordering uses the half-range rule: `a` is after
//! `b` when `a - b` (mod 2^32) lies in `1..2^31`. Within any window smaller
//! than half the range this agrees with plain integer ordering.

use std::fmt;

const HALF_RANGE: u32 = 1 << 31;

/// One discrete simulation step
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Tick(pub u32);

impl Tick {
    /// Sentinel: no prior state. A `from_tick` of zero marks a full snapshot.
    pub const ZERO: Tick = Tick(0);

    #[inline]
    pub fn new(value: u32) -> Self {
        Tick(value)
    }

    #[inline]
    pub fn value(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Successor tick
    #[inline]
    pub fn next(self) -> Self {
        Tick(self.0.wrapping_add(1))
    }

    /// Predecessor tick
    #[inline]
    pub fn prev(self) -> Self {
        Tick(self.0.wrapping_sub(1))
    }

    #[inline]
    pub fn wrapping_add(self, n: u32) -> Self {
        Tick(self.0.wrapping_add(n))
    }

    #[inline]
    pub fn wrapping_sub(self, n: u32) -> Self {
        Tick(self.0.wrapping_sub(n))
    }

    /// True if `self` comes strictly after `other`
    #[inline]
    pub fn is_after(self, other: Tick) -> bool {
        let offset = self.0.wrapping_sub(other.0);
        offset != 0 && offset < HALF_RANGE
    }

    /// True if `self` comes strictly before `other`
    #[inline]
    pub fn is_before(self, other: Tick) -> bool {
        other.is_after(self)
    }

    /// Signed distance from `other` to `self` (positive if `self` is after)
    #[inline]
    pub fn diff(self, other: Tick) -> i64 {
        let offset = self.0.wrapping_sub(other.0);
        if offset <= HALF_RANGE {
            offset as i64
        } else {
            offset as i64 - (u32::MAX as i64 + 1)
        }
    }

    #[inline]
    pub fn to_bytes(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }

    #[inline]
    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        Tick(u32::from_le_bytes(bytes))
    }
}

impl From<u32> for Tick {
    fn from(value: u32) -> Self {
        Tick(value)
    }
}

impl fmt::Debug for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tick({})", self.0)
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
