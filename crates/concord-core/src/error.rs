//! Error types for Concord

use thiserror::Error;

use crate::PeerId;

/// Core Concord errors
///
/// Everything here except the runtime variants is a configuration error:
/// the driver wired something the protocols cannot run on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConcordError {
    // Topology errors
    #[error("Invalid peer reference: {0}")]
    InvalidPeerReference(PeerId),

    #[error("Duplicate peer: {0}")]
    DuplicatePeer(PeerId),

    #[error("Self-loop on peer {0}")]
    SelfLoop(PeerId),

    // Ring errors
    #[error("Ring too small: {size} peers (need at least 2)")]
    RingTooSmall { size: usize },

    #[error("Successor relation is not a single cycle: {visited} of {size} peers reachable from {start}")]
    NotSingleCycle {
        start: PeerId,
        visited: usize,
        size: usize,
    },

    #[error("Token from {origin} completed {hops} hops without being absorbed")]
    CirculationExhausted { origin: PeerId, hops: usize },

    // Runtime errors
    #[error("Channel closed for peer {0}")]
    ChannelClosed(PeerId),

    #[error("Timed out waiting for quiescence")]
    Timeout,
}

/// Result type for Concord operations
pub type ConcordResult<T> = Result<T, ConcordError>;
