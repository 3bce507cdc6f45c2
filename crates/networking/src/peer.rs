// networking/src/peer.rs

use serde::{Deserialize, Serialize};
use sim_core::{BlockHeight, NodeId};
use std::collections::{BTreeSet, HashSet};

/// A simulated peer
///
/// Neighbor links are symmetric; the set never contains the node itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerNode {
    pub id: NodeId,
    neighbors: BTreeSet<NodeId>,
    /// One-way latency contribution in seconds
    pub latency: f64,
    /// Bytes per second
    pub bandwidth: f64,
    /// Base per-delivery drop probability
    pub loss_rate: f64,
    /// Heights of blocks this node has stored
    stored: HashSet<BlockHeight>,
    pub bytes_received: u64,
    pub bytes_sent: u64,
    pub io_requests: u64,
}

impl PeerNode {
    pub fn new(id: NodeId, latency: f64, bandwidth: f64, loss_rate: f64) -> Self {
        Self {
            id,
            neighbors: BTreeSet::new(),
            latency,
            bandwidth,
            loss_rate,
            stored: HashSet::new(),
            bytes_received: 0,
            bytes_sent: 0,
            io_requests: 0,
        }
    }

    /// Link to `peer`. Self-links and repeats are ignored; returns whether
    /// a new link was added.
    pub fn add_neighbor(&mut self, peer: NodeId) -> bool {
        if peer == self.id {
            return false;
        }
        self.neighbors.insert(peer)
    }

    pub fn has_neighbor(&self, peer: NodeId) -> bool {
        self.neighbors.contains(&peer)
    }

    pub fn neighbors(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.neighbors.iter().copied()
    }

    pub fn neighbor_count(&self) -> usize {
        self.neighbors.len()
    }

    /// Store a block; returns `false` if it was already stored
    pub fn store(&mut self, height: BlockHeight) -> bool {
        self.stored.insert(height)
    }

    pub fn has_block(&self, height: BlockHeight) -> bool {
        self.stored.contains(&height)
    }

    pub fn stored_count(&self) -> usize {
        self.stored.len()
    }

    /// Account an inbound delivery, new or duplicate
    pub fn record_receive(&mut self, size: u64) {
        self.io_requests += 1;
        self.bytes_received += size;
    }

    pub fn record_send(&mut self, size: u64) {
        self.bytes_sent += size;
    }
}
