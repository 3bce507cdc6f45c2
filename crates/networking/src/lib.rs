// networking/src/lib.rs

//! Simulated peer-to-peer block propagation
//!
//! This crate implements:
//! - Peer nodes with per-node latency, bandwidth and loss parameters
//! - Random symmetric topology construction
//! - Event-driven block dissemination with duplicate suppression
//!
//! No sockets are opened; propagation is a timing and ordering model.

pub mod p2p;
pub mod peer;
pub mod propagation;

pub use p2p::{Network, NetworkConfig};
pub use peer::PeerNode;
pub use propagation::{Delivery, DeliveryOutcome, PropagationReport};

use sim_core::NodeId;

/// Result type for networking operations
pub type NetworkResult<T> = Result<T, NetworkError>;

/// Errors that can occur during networking operations
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("Invalid network configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    #[error("Peer error: {0}")]
    PeerError(String),
}
