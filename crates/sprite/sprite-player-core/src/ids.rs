//! Identifiers and a simple allocator for players.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Numeric frame identifier taken from the `frame_<n>` naming convention.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameId(pub u32);

impl FrameId {
    /// Parse an element id such as `frame_12` or `frame_0012`.
    pub fn from_element_id(element_id: &str) -> Option<Self> {
        let digits = element_id.strip_prefix("frame_")?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok().map(FrameId)
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame_{}", self.0)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub u32);

/// Monotonic allocator for PlayerId.
#[derive(Default, Debug)]
pub struct IdAllocator {
    next_player: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn alloc_player(&mut self) -> PlayerId {
        let id = PlayerId(self.next_player);
        self.next_player = self.next_player.wrapping_add(1);
        id
    }
}
