//! Seeded topology generators

use concord_core::{ConcordResult, PeerId};
use concord_diffusion::Topology;
use concord_ring::Ring;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Deterministic generator of random topologies
pub struct TopologyGenerator {
    rng: StdRng,
}

impl TopologyGenerator {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Peer ids `1..=n`
    pub fn peer_ids(n: usize) -> Vec<PeerId> {
        (1..=n as u64).map(PeerId::new).collect()
    }

    /// Connected graph with symmetric links: a random spanning tree plus
    /// `extra_edges` random chords, so cycles are likely.
    pub fn connected(&mut self, n: usize, extra_edges: usize) -> ConcordResult<Topology> {
        let ids = Self::peer_ids(n);
        let mut topo = Topology::new();
        for &id in &ids {
            topo.add_peer(id)?;
        }

        for i in 1..n {
            let parent = self.rng.gen_range(0..i);
            topo.connect_both(ids[parent], ids[i])?;
        }

        if n >= 2 {
            for _ in 0..extra_edges {
                let a = self.rng.gen_range(0..n);
                let b = self.rng.gen_range(0..n);
                if a != b {
                    topo.connect_both(ids[a], ids[b])?;
                }
            }
        }

        Ok(topo)
    }

    /// Directed graph where each ordered pair is linked with probability `p`.
    /// May be disconnected.
    pub fn directed(&mut self, n: usize, p: f64) -> ConcordResult<Topology> {
        let ids = Self::peer_ids(n);
        let mut topo = Topology::new();
        for &id in &ids {
            topo.add_peer(id)?;
        }

        for &a in &ids {
            for &b in &ids {
                if a != b && self.rng.gen_bool(p) {
                    topo.connect(a, b)?;
                }
            }
        }

        Ok(topo)
    }

    /// Ring of `k` peers in shuffled order
    pub fn ring(&mut self, k: usize) -> ConcordResult<Ring> {
        let mut ids = Self::peer_ids(k);
        ids.shuffle(&mut self.rng);
        Ring::new(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connected_reaches_everyone() {
        let mut generator = TopologyGenerator::with_seed(7);
        let topo = generator.connected(40, 30).unwrap();

        let reached = topo.reachable_from(PeerId::new(1)).unwrap();
        assert_eq!(reached.len(), 40);
    }

    #[test]
    fn test_same_seed_same_graph() {
        let a = TopologyGenerator::with_seed(3).directed(12, 0.2).unwrap();
        let b = TopologyGenerator::with_seed(3).directed(12, 0.2).unwrap();

        for id in TopologyGenerator::peer_ids(12) {
            assert_eq!(a.neighbor_ids(id).unwrap(), b.neighbor_ids(id).unwrap());
        }
    }

    #[test]
    fn test_ring_contains_all_peers() {
        let ring = TopologyGenerator::with_seed(1).ring(9).unwrap();

        let mut peers = ring.peers().to_vec();
        peers.sort();
        assert_eq!(peers, TopologyGenerator::peer_ids(9));
    }
}
