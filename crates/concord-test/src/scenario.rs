//! Scenario runners
//!
//! A scenario fixes a topology and a set of protocol starts, then runs them
//! either through the synchronous engines or through the concurrent
//! runtime. Outcomes are plain data so the two can be compared.

use std::collections::{HashMap, HashSet};

use concord_core::{ConcordResult, PeerId};
use concord_diffusion::{DisseminationEngine, Topology};
use concord_ring::{DecisionRule, Ring, RingCoordinator};
use concord_runtime::{FloodNetwork, RingNetwork, RuntimeConfig};

use crate::{AbsorptionRecorder, DeliveryRecorder};

/// Flood scenario: one message per origin, payload `"m<i>"`
#[derive(Debug, Clone)]
pub struct FloodScenario {
    topology: Topology,
    origins: Vec<PeerId>,
}

/// What a flood run delivered
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FloodOutcome {
    /// payload -> peer -> number of deliveries
    pub per_message: HashMap<String, HashMap<PeerId, usize>>,
}

impl FloodOutcome {
    fn from_recorder(recorder: &DeliveryRecorder<String>) -> Self {
        let mut per_message: HashMap<String, HashMap<PeerId, usize>> = HashMap::new();
        for (peer, payload) in recorder.deliveries() {
            *per_message.entry(payload).or_default().entry(peer).or_insert(0) += 1;
        }
        Self { per_message }
    }

    /// Peers that were delivered `payload`
    pub fn delivered_to(&self, payload: &str) -> HashSet<PeerId> {
        self.per_message
            .get(payload)
            .map(|peers| peers.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Highest delivery count of any message at any peer
    pub fn max_deliveries(&self) -> usize {
        self.per_message
            .values()
            .flat_map(|peers| peers.values().copied())
            .max()
            .unwrap_or(0)
    }
}

impl FloodScenario {
    pub fn new(topology: Topology) -> Self {
        Self {
            topology,
            origins: Vec::new(),
        }
    }

    /// Add a message originated at `peer`
    pub fn originate_at(mut self, peer: PeerId) -> Self {
        self.origins.push(peer);
        self
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Payload used for the `i`-th origin
    pub fn payload(i: usize) -> String {
        format!("m{}", i)
    }

    /// Run through the synchronous worklist engine
    pub fn run_sync(&self) -> ConcordResult<FloodOutcome> {
        let recorder = DeliveryRecorder::new();
        let mut engine = DisseminationEngine::new(self.topology.clone(), recorder.clone());

        for (i, &origin) in self.origins.iter().enumerate() {
            engine.originate(origin, Self::payload(i))?;
        }

        Ok(FloodOutcome::from_recorder(&recorder))
    }

    /// Run through the task-per-peer runtime
    pub async fn run_concurrent(&self, config: RuntimeConfig) -> ConcordResult<FloodOutcome> {
        let recorder = DeliveryRecorder::new();
        let net = FloodNetwork::spawn(&self.topology, recorder.clone(), config);

        let started: ConcordResult<()> = self
            .origins
            .iter()
            .enumerate()
            .try_for_each(|(i, &origin)| net.originate(origin, Self::payload(i)).map(|_| ()));
        let result = match started {
            Ok(()) => net.wait_idle().await,
            Err(e) => Err(e),
        };
        net.shutdown().await;
        result?;

        Ok(FloodOutcome::from_recorder(&recorder))
    }
}

/// Ring scenario: tokens with `u64` values started at chosen peers
#[derive(Debug, Clone)]
pub struct RingScenario {
    ring: Ring,
    starts: Vec<(PeerId, u64)>,
}

/// What a ring run produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RingOutcome {
    /// Absorptions sorted by peer
    pub absorptions: Vec<(PeerId, u64)>,
    pub hops: u64,
    pub exhausted: u64,
}

impl RingScenario {
    pub fn new(ring: Ring) -> Self {
        Self {
            ring,
            starts: Vec::new(),
        }
    }

    pub fn initiate_at(mut self, peer: PeerId, value: u64) -> Self {
        self.starts.push((peer, value));
        self
    }

    /// Every peer starts a token carrying its own id
    pub fn everyone(mut self) -> Self {
        self.starts = self.ring.peers().iter().map(|&p| (p, p.0)).collect();
        self
    }

    pub fn ring(&self) -> &Ring {
        &self.ring
    }

    /// Run through the synchronous coordinator, tokens interleaved
    pub fn run_sync<R>(&self, rule: R) -> ConcordResult<RingOutcome>
    where
        R: DecisionRule<u64>,
    {
        let recorder = AbsorptionRecorder::new();
        let mut coord = RingCoordinator::new(self.ring.clone(), rule, recorder.clone());
        coord.initiate_all(self.starts.iter().copied())?;

        let mut absorptions = recorder.absorptions();
        absorptions.sort();
        Ok(RingOutcome {
            absorptions,
            hops: coord.stats().hops,
            exhausted: coord.stats().exhausted,
        })
    }

    /// Run through the task-per-peer runtime
    pub async fn run_concurrent<R>(&self, rule: R, config: RuntimeConfig) -> ConcordResult<RingOutcome>
    where
        R: DecisionRule<u64> + Send + Sync + 'static,
    {
        let recorder = AbsorptionRecorder::new();
        let net = RingNetwork::spawn(self.ring.clone(), rule, recorder.clone(), config);

        let started: ConcordResult<()> = self
            .starts
            .iter()
            .try_for_each(|&(peer, value)| net.initiate(peer, value));
        let result = match started {
            Ok(()) => net.wait_idle().await,
            Err(e) => Err(e),
        };
        let stats = net.stats();
        net.shutdown().await;
        result?;

        let mut absorptions = recorder.absorptions();
        absorptions.sort();
        Ok(RingOutcome {
            absorptions,
            hops: stats.hops,
            exhausted: stats.exhausted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_ring::AbsorbAtOrigin;

    #[test]
    fn test_flood_outcome_counts() {
        let ids = crate::TopologyGenerator::peer_ids(3);
        let outcome = FloodScenario::new(Topology::mesh(&ids).unwrap())
            .originate_at(ids[0])
            .originate_at(ids[1])
            .run_sync()
            .unwrap();

        assert_eq!(outcome.per_message.len(), 2);
        assert_eq!(outcome.delivered_to("m1").len(), 3);
        assert_eq!(outcome.max_deliveries(), 1);
    }

    #[test]
    fn test_ring_everyone() {
        let ring = Ring::new(crate::TopologyGenerator::peer_ids(4)).unwrap();
        let outcome = RingScenario::new(ring).everyone().run_sync(AbsorbAtOrigin).unwrap();

        assert_eq!(outcome.absorptions.len(), 4);
        assert_eq!(outcome.hops, 16);
    }
}
