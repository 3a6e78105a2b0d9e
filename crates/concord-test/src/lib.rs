//! Concord Test Harness - Protocol validation
//!
//! This crate provides:
//! - Recorders that capture delivery and absorption notifications
//! - Seeded random topology generators
//! - Scenario runners that drive the synchronous engines and the
//!   concurrent runtime over the same topology
//! - End-to-end integration tests comparing the two

pub mod generator;
pub mod integration;
pub mod recorder;
pub mod scenario;

pub use generator::*;
pub use recorder::*;
pub use scenario::*;
