//! Concord Ring Coordination
//!
//! Circulates tokens around a fixed ring of peers. Every hop applies the
//! same pluggable decision rule, which either absorbs the token (the peer
//! declares a result), forwards it unchanged, or forwards it carrying a
//! replacement value.
//!
//! Two rules ship with the crate:
//! - `AbsorbAtOrigin`: a token stops when it returns to its originator.
//!   If every peer initiates, every peer declares itself.
//! - `HighestCandidate`: peers swap in their own candidate when it beats
//!   the carried one, so every lap ends carrying the ring-wide maximum.

pub mod coordinator;
pub mod ring;
pub mod rule;

pub use coordinator::*;
pub use ring::*;
pub use rule::*;
