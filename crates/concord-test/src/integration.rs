//! End-to-end Integration Test Suite
//!
//! Tests that drive both protocols through the synchronous engines and the
//! concurrent runtime:
//! - At-most-once delivery on cyclic and disconnected graphs
//! - Reachability completeness
//! - Agreement between the two flood realizations
//! - Ring lap length and non-interference of concurrent tokens
//! - Convergence of the highest-candidate rule

use concord_core::{ConcordResult, PeerId};
use concord_diffusion::Topology;

use crate::{FloodScenario, TopologyGenerator};

/// Scenario originating one message at each of the first `origins` peers
pub fn multi_origin_scenario(topology: Topology, origins: usize) -> FloodScenario {
    let ids: Vec<PeerId> = topology.registry().ids().iter().copied().take(origins).collect();
    ids.into_iter()
        .fold(FloodScenario::new(topology), |s, id| s.originate_at(id))
}

/// Random connected graph with a few chords, for quick checks
pub fn small_connected(seed: u64) -> ConcordResult<Topology> {
    TopologyGenerator::with_seed(seed).connected(16, 12)
}
