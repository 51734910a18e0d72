//! MQTT access bits
//!
//! Access is a bitmask over READ, WRITE and SUBSCRIBE. The wire values match
//! the broker auth plugin protocol: NONE=0, READ=1, WRITE=2, SUBSCRIBE=4.
//! An empty mask means a connect-time check.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

/// Bitmask of MQTT access kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessBits(u8);

impl AccessBits {
    pub const NONE: AccessBits = AccessBits(0);
    pub const READ: AccessBits = AccessBits(1);
    pub const WRITE: AccessBits = AccessBits(2);
    pub const SUBSCRIBE: AccessBits = AccessBits(4);
    pub const ALL: AccessBits = AccessBits(7);

    /// Build from a wire value, dropping unknown bits
    pub fn from_bits_truncate(bits: u8) -> Self {
        Self(bits & Self::ALL.0)
    }

    /// Build from a wire value, rejecting unknown bits
    pub fn from_bits(bits: u8) -> Option<Self> {
        if bits & !Self::ALL.0 == 0 {
            Some(Self(bits))
        } else {
            None
        }
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True if every bit of `other` is set in `self`
    pub fn contains(self, other: AccessBits) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: AccessBits) -> bool {
        self.0 & other.0 != 0
    }

    pub fn is_readable(self) -> bool {
        self.contains(Self::READ)
    }

    pub fn is_writable(self) -> bool {
        self.contains(Self::WRITE)
    }

    pub fn is_subscribable(self) -> bool {
        self.contains(Self::SUBSCRIBE)
    }

    /// Number of access kinds set
    pub fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Iterate over the single-bit kinds set in this mask
    pub fn iter(self) -> impl Iterator<Item = AccessBits> {
        [Self::READ, Self::WRITE, Self::SUBSCRIBE]
            .into_iter()
            .filter(move |kind| self.contains(*kind))
    }
}

impl BitOr for AccessBits {
    type Output = AccessBits;

    fn bitor(self, rhs: Self) -> Self::Output {
        AccessBits(self.0 | rhs.0)
    }
}

impl BitOrAssign for AccessBits {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for AccessBits {
    type Output = AccessBits;

    fn bitand(self, rhs: Self) -> Self::Output {
        AccessBits(self.0 & rhs.0)
    }
}

/// Renders the set kinds as letters, e.g. `rs` for READ | SUBSCRIBE
impl fmt::Display for AccessBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("n");
        }
        for kind in self.iter() {
            let letter = match kind {
                Self::READ => 'r',
                Self::WRITE => 'w',
                _ => 's',
            };
            write!(f, "{}", letter)?;
        }
        Ok(())
    }
}
