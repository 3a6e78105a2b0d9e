//! Concord Diffusion
//!
//! Flood dissemination over an arbitrary peer graph.
//!
//! A message originated at one peer is handed to every neighbor except the
//! one it came from. Each peer keeps a seen-set of message ids and absorbs
//! anything it has already processed, so flooding terminates on cyclic
//! graphs and every reachable peer is delivered the message exactly once.
//!
//! Key pieces:
//! - Topology: the peer arena and its neighbor lists
//! - SeenSet: per-peer deduplication record
//! - DisseminationEngine: single-controller worklist that drives the flood
//! - DeliverySink: where delivery notifications go

pub mod delivery;
pub mod propagation;
pub mod topology;

pub use delivery::*;
pub use propagation::*;
pub use topology::*;
