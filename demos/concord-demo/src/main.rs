//! Concord Demo - drives both protocols over small fixed topologies
//!
//! Usage:
//!   concord-demo            human-readable output
//!   concord-demo --json     JSON lines
//!
//! Set RUST_LOG=debug to see every delivery and hop.

use std::collections::HashMap;

use concord_core::PeerId;
use concord_diffusion::{DisseminationEngine, Topology};
use concord_ring::{AbsorbAtOrigin, HighestCandidate, Ring, RingCoordinator};
use concord_runtime::{init_logging, FloodNetwork, LogConfig, RingNetwork, RuntimeConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let log_config = if std::env::args().any(|a| a == "--json") {
        LogConfig::json()
    } else {
        LogConfig::default()
    };
    init_logging(&log_config)?;

    flood_demo()?;
    ring_demo()?;
    concurrent_demo().await?;

    Ok(())
}

/// Four peers in a line, message sent from the first
fn flood_demo() -> Result<(), Box<dyn std::error::Error>> {
    let names: HashMap<PeerId, &str> = [(1, "Peer1"), (2, "Peer2"), (3, "Peer3"), (4, "Peer4")]
        .into_iter()
        .map(|(id, name)| (PeerId::new(id), name))
        .collect();
    let ids: Vec<PeerId> = (1..=4).map(PeerId::new).collect();

    let sink = |peer: PeerId, message: &String| {
        let name = names.get(&peer).copied().unwrap_or("?");
        info!("Peer {} received message: {}", name, message);
    };
    let mut engine = DisseminationEngine::new(Topology::path(&ids)?, sink);
    engine.originate(ids[0], "Hello, P2P Network!".to_string())?;

    Ok(())
}

/// Five nodes in a ring, every node starts circulation with its own index
fn ring_demo() -> Result<(), Box<dyn std::error::Error>> {
    let order: Vec<PeerId> = (0..5).map(PeerId::new).collect();
    let starts: Vec<(PeerId, u64)> = order.iter().map(|&p| (p, p.0)).collect();

    info!("ring, absorb at origin");
    let declare = |peer: PeerId, _value: &u64| info!("Node {} is the leader.", peer.0);
    let mut coord = RingCoordinator::new(Ring::new(order.clone())?, AbsorbAtOrigin, declare);
    coord.initiate_all(starts.clone())?;

    info!("ring, highest candidate");
    let agree = |peer: PeerId, value: &u64| info!("Node {} agrees node {} is the leader.", peer.0, value);
    let rule = HighestCandidate::new(|peer: PeerId| peer.0);
    let mut coord = RingCoordinator::new(Ring::new(order)?, rule, agree);
    coord.initiate_all(starts)?;

    Ok(())
}

/// Same scenarios with one task per peer
async fn concurrent_demo() -> Result<(), Box<dyn std::error::Error>> {
    let ids: Vec<PeerId> = (1..=4).map(PeerId::new).collect();
    let flood = FloodNetwork::spawn(
        &Topology::path(&ids)?,
        |peer: PeerId, message: &String| info!(peer = %peer, "received: {}", message),
        RuntimeConfig::default(),
    );
    flood.originate(ids[0], "Hello again, P2P Network!".to_string())?;
    flood.wait_idle().await?;
    info!(stats = ?flood.stats(), "concurrent flood finished");
    flood.shutdown().await;

    let order: Vec<PeerId> = (0..5).map(PeerId::new).collect();
    let ring = RingNetwork::spawn(
        Ring::new(order.clone())?,
        HighestCandidate::new(|peer: PeerId| peer.0),
        |peer: PeerId, value: &u64| info!(peer = %peer, leader = value, "token absorbed"),
        RuntimeConfig::default(),
    );
    for &peer in &order {
        ring.initiate(peer, peer.0)?;
    }
    ring.wait_idle().await?;
    info!(stats = ?ring.stats(), "concurrent ring finished");
    ring.shutdown().await;

    Ok(())
}
