//! Topology - The shape of the flooding graph
//!
//! Peers live in a registry arena; adjacency is stored as index lists.
//! Edges are directed. A driver that wants symmetric links wires both
//! directions (see [`Topology::connect_both`]).

use std::collections::{HashSet, VecDeque};

use concord_core::{ConcordError, ConcordResult, PeerId, PeerIndex, PeerRegistry};

/// Flooding topology
#[derive(Debug, Clone, Default)]
pub struct Topology {
    /// All peers in the topology
    peers: PeerRegistry,

    /// Neighbors of each peer, indexed by `PeerIndex`
    neighbors: Vec<Vec<PeerIndex>>,

    /// Number of directed edges
    edge_count: usize,
}

impl Topology {
    /// Create a new empty topology
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a peer
    pub fn add_peer(&mut self, id: PeerId) -> ConcordResult<PeerIndex> {
        let idx = self.peers.register(id)?;
        self.neighbors.push(Vec::new());
        Ok(idx)
    }

    /// Add a directed edge `from -> to`.
    ///
    /// Adding an edge that already exists is a no-op.
    pub fn connect(&mut self, from: PeerId, to: PeerId) -> ConcordResult<()> {
        if from == to {
            return Err(ConcordError::SelfLoop(from));
        }

        let f = self.peers.resolve(from)?;
        let t = self.peers.resolve(to)?;

        let list = &mut self.neighbors[f.as_usize()];
        if !list.contains(&t) {
            list.push(t);
            self.edge_count += 1;
        }
        Ok(())
    }

    /// Add edges in both directions
    pub fn connect_both(&mut self, a: PeerId, b: PeerId) -> ConcordResult<()> {
        self.connect(a, b)?;
        self.connect(b, a)
    }

    /// Neighbors of the peer at `idx`
    pub fn neighbors(&self, idx: PeerIndex) -> &[PeerIndex] {
        self.neighbors
            .get(idx.as_usize())
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Neighbor ids of a peer
    pub fn neighbor_ids(&self, id: PeerId) -> ConcordResult<Vec<PeerId>> {
        let idx = self.peers.resolve(id)?;
        Ok(self
            .neighbors(idx)
            .iter()
            .map(|&n| self.id(n))
            .collect())
    }

    /// Resolve a peer id to its arena index
    pub fn resolve(&self, id: PeerId) -> ConcordResult<PeerIndex> {
        self.peers.resolve(id)
    }

    /// The underlying registry
    pub fn registry(&self) -> &PeerRegistry {
        &self.peers
    }

    /// `idx` must come from this topology
    #[inline]
    pub(crate) fn id(&self, idx: PeerIndex) -> PeerId {
        self.peers.ids()[idx.as_usize()]
    }

    pub fn has_peer(&self, id: PeerId) -> bool {
        self.peers.contains(id)
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Every peer reachable from `start` along directed edges, `start` included
    pub fn reachable_from(&self, start: PeerId) -> ConcordResult<HashSet<PeerId>> {
        let start = self.peers.resolve(start)?;

        let mut visited = vec![false; self.peers.len()];
        let mut queue = VecDeque::from([start]);
        visited[start.as_usize()] = true;

        let mut reached = HashSet::new();
        while let Some(idx) = queue.pop_front() {
            reached.insert(self.id(idx));
            for &n in self.neighbors(idx) {
                if !visited[n.as_usize()] {
                    visited[n.as_usize()] = true;
                    queue.push_back(n);
                }
            }
        }

        Ok(reached)
    }

    /// Path `ids[0] - ids[1] - ... - ids[n-1]` with symmetric links
    pub fn path(ids: &[PeerId]) -> ConcordResult<Self> {
        let mut topo = Self::with_peers(ids)?;
        for pair in ids.windows(2) {
            topo.connect_both(pair[0], pair[1])?;
        }
        Ok(topo)
    }

    /// Star: `center` linked both ways to every leaf
    pub fn star(center: PeerId, leaves: &[PeerId]) -> ConcordResult<Self> {
        let mut topo = Self::new();
        topo.add_peer(center)?;
        for &leaf in leaves {
            topo.add_peer(leaf)?;
            topo.connect_both(center, leaf)?;
        }
        Ok(topo)
    }

    /// Mesh: every pair of peers linked both ways
    pub fn mesh(ids: &[PeerId]) -> ConcordResult<Self> {
        let mut topo = Self::with_peers(ids)?;
        for (i, &a) in ids.iter().enumerate() {
            for &b in &ids[i + 1..] {
                topo.connect_both(a, b)?;
            }
        }
        Ok(topo)
    }

    /// Tree: `root` followed by `nodes`, each node attached to the first
    /// peer in breadth-first order that still has room for a child.
    pub fn tree(root: PeerId, fanout: usize, nodes: &[PeerId]) -> ConcordResult<Self> {
        let fanout = fanout.max(1);

        let mut order = Vec::with_capacity(nodes.len() + 1);
        order.push(root);
        order.extend_from_slice(nodes);

        let mut topo = Self::with_peers(&order)?;
        for (i, &node) in order.iter().enumerate().skip(1) {
            let parent = order[(i - 1) / fanout];
            topo.connect_both(parent, node)?;
        }
        Ok(topo)
    }

    fn with_peers(ids: &[PeerId]) -> ConcordResult<Self> {
        let mut topo = Self::new();
        for &id in ids {
            topo.add_peer(id)?;
        }
        Ok(topo)
    }
}
