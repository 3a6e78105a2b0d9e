//! Ring - validated cyclic successor relation

use std::collections::{HashMap, HashSet};

use concord_core::{ConcordError, ConcordResult, PeerId, PeerIndex, PeerRegistry};

/// A ring of at least two peers.
///
/// The successor of the peer at position `i` is the peer at `(i + 1) % len`.
/// Construction validates the topology once; protocol operations do not
/// re-check it.
#[derive(Debug, Clone)]
pub struct Ring {
    peers: PeerRegistry,
    /// Successor of each peer, indexed by `PeerIndex`
    successors: Vec<PeerIndex>,
}

impl Ring {
    /// Build a ring from peers in circular order
    pub fn new(order: Vec<PeerId>) -> ConcordResult<Self> {
        if order.len() < 2 {
            return Err(ConcordError::RingTooSmall { size: order.len() });
        }

        let mut peers = PeerRegistry::new();
        let mut slots = Vec::with_capacity(order.len());
        for id in order {
            slots.push(peers.register(id)?);
        }

        let n = slots.len();
        let successors = (0..n).map(|i| slots[(i + 1) % n]).collect();

        Ok(Self { peers, successors })
    }

    /// Build a ring from explicit `(peer, successor)` links.
    ///
    /// The links must form exactly one cycle covering every listed peer.
    /// The resulting order starts at the lowest peer id.
    pub fn from_successors<I>(links: I) -> ConcordResult<Self>
    where
        I: IntoIterator<Item = (PeerId, PeerId)>,
    {
        let mut next: HashMap<PeerId, PeerId> = HashMap::new();
        for (peer, succ) in links {
            if peer == succ {
                return Err(ConcordError::SelfLoop(peer));
            }
            if next.insert(peer, succ).is_some() {
                return Err(ConcordError::DuplicatePeer(peer));
            }
        }

        if next.len() < 2 {
            return Err(ConcordError::RingTooSmall { size: next.len() });
        }

        for succ in next.values() {
            if !next.contains_key(succ) {
                return Err(ConcordError::InvalidPeerReference(*succ));
            }
        }

        let Some(&start) = next.keys().min() else {
            return Err(ConcordError::RingTooSmall { size: 0 });
        };

        let mut order = vec![start];
        let mut visited = HashSet::from([start]);
        let mut current = next[&start];
        while current != start {
            if !visited.insert(current) {
                // Walked into a cycle that does not contain `start`
                break;
            }
            order.push(current);
            current = next[&current];
        }

        if current != start || order.len() != next.len() {
            return Err(ConcordError::NotSingleCycle {
                start,
                visited: order.len(),
                size: next.len(),
            });
        }

        Self::new(order)
    }

    /// Position of a peer in the ring
    pub fn resolve(&self, id: PeerId) -> ConcordResult<PeerIndex> {
        self.peers.resolve(id)
    }

    /// Position and registry index coincide; `idx` must come from this ring
    #[inline]
    pub(crate) fn id(&self, idx: PeerIndex) -> PeerId {
        self.peers.ids()[idx.as_usize()]
    }

    #[inline]
    pub(crate) fn successor(&self, idx: PeerIndex) -> PeerIndex {
        self.successors[idx.as_usize()]
    }

    /// Successor of a peer, by id
    pub fn successor_of(&self, id: PeerId) -> ConcordResult<PeerId> {
        let idx = self.peers.resolve(id)?;
        Ok(self.id(self.successor(idx)))
    }

    /// Peers in circular order
    pub fn peers(&self) -> &[PeerId] {
        self.peers.ids()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Always false: a ring holds at least two peers
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(id: u64) -> PeerId {
        PeerId::new(id)
    }

    #[test]
    fn test_successor_wraps() {
        let ring = Ring::new((0..5).map(p).collect()).unwrap();

        assert_eq!(ring.successor_of(p(2)).unwrap(), p(3));
        assert_eq!(ring.successor_of(p(4)).unwrap(), p(0));
    }

    #[test]
    fn test_ring_too_small() {
        assert_eq!(
            Ring::new(vec![p(1)]).unwrap_err(),
            ConcordError::RingTooSmall { size: 1 }
        );
        assert_eq!(
            Ring::new(Vec::new()).unwrap_err(),
            ConcordError::RingTooSmall { size: 0 }
        );
    }

    #[test]
    fn test_duplicate_in_order() {
        assert_eq!(
            Ring::new(vec![p(1), p(2), p(1)]).unwrap_err(),
            ConcordError::DuplicatePeer(p(1))
        );
    }

    #[test]
    fn test_from_successors_single_cycle() {
        let ring = Ring::from_successors([(p(3), p(1)), (p(1), p(7)), (p(7), p(3))]).unwrap();

        assert_eq!(ring.peers(), &[p(1), p(7), p(3)]);
        assert_eq!(ring.successor_of(p(3)).unwrap(), p(1));
    }

    #[test]
    fn test_from_successors_two_cycles() {
        let err = Ring::from_successors([(p(1), p(2)), (p(2), p(1)), (p(3), p(4)), (p(4), p(3))])
            .unwrap_err();

        assert_eq!(
            err,
            ConcordError::NotSingleCycle {
                start: p(1),
                visited: 2,
                size: 4
            }
        );
    }

    #[test]
    fn test_from_successors_tail_into_cycle() {
        // 1 -> 2 -> 3 -> 2: peer 1 hangs off the cycle
        let err = Ring::from_successors([(p(1), p(2)), (p(2), p(3)), (p(3), p(2))]).unwrap_err();

        assert!(matches!(err, ConcordError::NotSingleCycle { .. }));
    }

    #[test]
    fn test_from_successors_dangling() {
        assert_eq!(
            Ring::from_successors([(p(1), p(2)), (p(2), p(9))]).unwrap_err(),
            ConcordError::InvalidPeerReference(p(9))
        );
    }

    #[test]
    fn test_from_successors_self_loop() {
        assert_eq!(
            Ring::from_successors([(p(1), p(1)), (p(2), p(3))]).unwrap_err(),
            ConcordError::SelfLoop(p(1))
        );
    }
}
