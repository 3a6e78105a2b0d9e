//! Concord Core - Fundamental types shared by both protocols
//!
//! This crate defines:
//! - Identifiers (PeerId, MessageId) and message id allocation
//! - The peer registry: an arena addressing peers by dense index
//! - The error taxonomy for configuration errors

pub mod id;
pub mod peer;
pub mod error;

pub use id::*;
pub use peer::*;
pub use error::*;
