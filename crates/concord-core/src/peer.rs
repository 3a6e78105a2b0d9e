//! Peer registry - arena of peers addressed by dense index
//!
//! Topologies are cyclic, so peers never hold references to each other.
//! The registry owns the id of every peer and hands out `PeerIndex` values;
//! neighbor and successor relations are stored as indices.

use std::collections::HashMap;
use std::fmt;

use crate::{ConcordError, ConcordResult, PeerId};

/// Dense index of a peer inside one registry
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeerIndex(usize);

impl PeerIndex {
    #[inline]
    pub fn as_usize(self) -> usize {
        self.0
    }
}

impl fmt::Debug for PeerIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Peer registry
#[derive(Debug, Clone, Default)]
pub struct PeerRegistry {
    /// Index -> id
    ids: Vec<PeerId>,
    /// Id -> index
    index: HashMap<PeerId, PeerIndex>,
}

impl PeerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a peer, returning its index
    pub fn register(&mut self, id: PeerId) -> ConcordResult<PeerIndex> {
        if self.index.contains_key(&id) {
            return Err(ConcordError::DuplicatePeer(id));
        }

        let idx = PeerIndex(self.ids.len());
        self.ids.push(id);
        self.index.insert(id, idx);
        Ok(idx)
    }

    /// Look up the index of a peer
    pub fn resolve(&self, id: PeerId) -> ConcordResult<PeerIndex> {
        self.index
            .get(&id)
            .copied()
            .ok_or(ConcordError::InvalidPeerReference(id))
    }

    /// Id of the peer at `idx`, or `None` if `idx` was minted by a
    /// different, larger registry
    #[inline]
    pub fn id(&self, idx: PeerIndex) -> Option<PeerId> {
        self.ids.get(idx.0).copied()
    }

    pub fn contains(&self, id: PeerId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// All peers in registration order
    pub fn iter(&self) -> impl Iterator<Item = (PeerIndex, PeerId)> + '_ {
        self.ids.iter().enumerate().map(|(i, &id)| (PeerIndex(i), id))
    }

    /// All peer ids in registration order
    pub fn ids(&self) -> &[PeerId] {
        &self.ids
    }
}
