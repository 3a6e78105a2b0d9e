//! Identity types for Concord
//!
//! Identifiers are plain 64-bit values. Peer ids are chosen by the driver;
//! message ids are allocated at origination and never derived from payload.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Peer identity - unique within a topology
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PeerId(pub u64);

impl PeerId {
    pub const ZERO: PeerId = PeerId(0);

    #[inline]
    pub fn new(id: u64) -> Self {
        PeerId(id)
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Peer({})", self.0)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

impl From<u64> for PeerId {
    fn from(id: u64) -> Self {
        PeerId(id)
    }
}

/// Message identity for disseminated messages
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct MessageId(pub u64);

impl MessageId {
    #[inline]
    pub fn new(id: u64) -> Self {
        MessageId(id)
    }
}

impl fmt::Debug for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Msg({:016x})", self.0)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Allocates fresh message ids.
///
/// Shareable across threads and engines (wrap in `Arc`); every call to
/// [`next`](Self::next) returns an id no other call on the same allocator
/// has returned.
#[derive(Debug)]
pub struct MessageIdAllocator {
    next: AtomicU64,
}

impl MessageIdAllocator {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Start the sequence at `first`. Useful to keep id ranges of
    /// independent allocators disjoint.
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    #[inline]
    pub fn next(&self) -> MessageId {
        MessageId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for MessageIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
