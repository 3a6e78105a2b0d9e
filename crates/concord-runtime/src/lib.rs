//! Concord Runtime - Peers as concurrent tasks
//!
//! Each peer runs as its own tokio task and talks to its neighbors only by
//! handing envelopes to their inboxes. A peer task drains its inbox
//! serially, so the check-then-insert on its seen-set is atomic with
//! respect to every neighbor delivering at once.
//!
//! - FloodNetwork: concurrent flood dissemination
//! - RingNetwork: concurrent token circulation
//! - Pending: in-flight hand-off counter used to detect quiescence
//! - init_logging: tracing subscriber setup for drivers

pub mod config;
pub mod flood;
pub mod logging;
pub mod pending;
pub mod ring;
pub mod stats;

pub use config::*;
pub use flood::*;
pub use logging::*;
pub use pending::*;
pub use ring::*;
pub use stats::*;
