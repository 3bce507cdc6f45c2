// networking/src/p2p.rs

use crate::{peer::PeerNode, NetworkError, NetworkResult};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use sim_core::NodeId;
use std::collections::BTreeMap;

const MIB: f64 = 1024.0 * 1024.0;

/// Link and timing parameters of the simulated network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Per-node latency is drawn uniformly from `[latency_min, latency_max]` seconds
    pub latency_min: f64,
    pub latency_max: f64,
    /// Nominal per-node bandwidth in bytes per second
    pub bandwidth: f64,
    /// Relative spread of per-node bandwidth
    pub bandwidth_variance: f64,
    /// Nominal per-delivery drop probability
    pub packet_loss_rate: f64,
    /// Relative spread of per-node loss rate
    pub packet_loss_variance: f64,
    /// Receiver processing delay is drawn uniformly from this range, per delivery
    pub processing_delay_min: f64,
    pub processing_delay_max: f64,
    /// Relative spread of per-link distance, scaling link latency
    pub distance_variance: f64,
    /// Ceiling on a block's arrival time at any node, seconds after it was found
    pub max_propagation_time: f64,
    /// Block size in bytes above which transmission slows down
    pub congestion_threshold: u64,
    /// Extra transmission time per MiB above the threshold
    pub congestion_factor: f64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            latency_min: 0.001,
            latency_max: 0.1,
            bandwidth: 100.0 * MIB,
            bandwidth_variance: 0.2,
            packet_loss_rate: 0.001,
            packet_loss_variance: 0.5,
            processing_delay_min: 0.001,
            processing_delay_max: 0.01,
            distance_variance: 0.2,
            max_propagation_time: 60.0,
            congestion_threshold: 1024 * 1024,
            congestion_factor: 0.1,
        }
    }
}

impl NetworkConfig {
    /// Validate configuration
    pub fn validate(&self) -> NetworkResult<()> {
        let invalid = |msg: String| Err(NetworkError::InvalidConfiguration(msg));

        if !(self.latency_min >= 0.0 && self.latency_min <= self.latency_max && self.latency_max.is_finite()) {
            return invalid(format!("latency range [{}, {}] is invalid", self.latency_min, self.latency_max));
        }
        if !(self.processing_delay_min >= 0.0
            && self.processing_delay_min <= self.processing_delay_max
            && self.processing_delay_max.is_finite())
        {
            return invalid(format!(
                "processing delay range [{}, {}] is invalid",
                self.processing_delay_min, self.processing_delay_max
            ));
        }
        if !(self.bandwidth > 0.0 && self.bandwidth.is_finite()) {
            return invalid(format!("bandwidth must be positive, got {}", self.bandwidth));
        }
        if !(0.0..=1.0).contains(&self.packet_loss_rate) {
            return invalid(format!("packet loss rate must be in [0, 1], got {}", self.packet_loss_rate));
        }
        for (name, value) in [
            ("bandwidth_variance", self.bandwidth_variance),
            ("packet_loss_variance", self.packet_loss_variance),
            ("distance_variance", self.distance_variance),
        ] {
            if !(0.0..1.0).contains(&value) {
                return invalid(format!("{} must be in [0, 1), got {}", name, value));
            }
        }
        if !(self.max_propagation_time > 0.0) {
            return invalid(format!("max propagation time must be positive, got {}", self.max_propagation_time));
        }
        if self.congestion_threshold == 0 {
            return invalid("congestion threshold must be positive".into());
        }
        if !(self.congestion_factor >= 0.0 && self.congestion_factor.is_finite()) {
            return invalid(format!("congestion factor must be non-negative, got {}", self.congestion_factor));
        }
        Ok(())
    }
}

/// The simulated peer graph
pub struct Network {
    pub(crate) config: NetworkConfig,
    pub(crate) nodes: Vec<PeerNode>,
    /// Distance factor per undirected link, keyed `(low, high)`
    pub(crate) distance: BTreeMap<(NodeId, NodeId), f64>,
    pub(crate) rng: StdRng,
}

impl Network {
    /// Build `node_count` peers, each linking to `min(neighbors, node_count - 1)`
    /// random peers it is not yet linked with. Links are symmetric, so
    /// degrees end up at least that large.
    pub fn new(node_count: usize, neighbors: usize, config: NetworkConfig, seed: u64) -> NetworkResult<Self> {
        config.validate()?;
        if node_count == 0 {
            return Err(NetworkError::InvalidConfiguration("network needs at least one node".into()));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut nodes = Vec::with_capacity(node_count);

        for id in 0..node_count {
            let latency = rng.gen_range(config.latency_min..=config.latency_max);
            let bandwidth = config.bandwidth * spread(&mut rng, config.bandwidth_variance);
            let loss_rate = (config.packet_loss_rate * spread(&mut rng, config.packet_loss_variance)).min(1.0);
            tracing::debug!(node = id, latency, bandwidth_mib = bandwidth / MIB, loss_rate, "created node");
            nodes.push(PeerNode::new(id, latency, bandwidth, loss_rate));
        }

        let mut network = Self {
            config,
            nodes,
            distance: BTreeMap::new(),
            rng,
        };
        network.connect(neighbors);

        tracing::info!(
            nodes = node_count,
            neighbors,
            links = network.link_count(),
            "network topology created"
        );

        Ok(network)
    }

    fn connect(&mut self, neighbors: usize) {
        let count = self.nodes.len();
        for id in 0..count {
            let mut available: Vec<NodeId> = (0..count)
                .filter(|&peer| peer != id && !self.nodes[id].has_neighbor(peer))
                .collect();
            available.shuffle(&mut self.rng);

            let want = neighbors.min(count - 1).min(available.len());
            for &peer in available.iter().take(want) {
                self.link(id, peer);
            }
        }
    }

    fn link(&mut self, a: NodeId, b: NodeId) {
        self.nodes[a].add_neighbor(b);
        self.nodes[b].add_neighbor(a);
        let factor = spread(&mut self.rng, self.config.distance_variance);
        self.distance.insert((a.min(b), a.max(b)), factor);
    }

    /// Number of undirected links
    pub fn link_count(&self) -> usize {
        self.distance.len()
    }

    pub fn node(&self, id: NodeId) -> NetworkResult<&PeerNode> {
        self.nodes.get(id).ok_or(NetworkError::UnknownNode(id))
    }

    pub fn nodes(&self) -> &[PeerNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Link latency: mean endpoint latency scaled by the link's distance
    pub fn link_latency(&self, from: NodeId, to: NodeId) -> f64 {
        let factor = self.distance.get(&(from.min(to), from.max(to))).copied().unwrap_or(1.0);
        (self.nodes[from].latency + self.nodes[to].latency) / 2.0 * factor
    }

    /// Serialization time of `size` bytes over the slower endpoint, inflated
    /// linearly for each MiB above the congestion threshold
    pub fn transmission_time(&self, from: NodeId, to: NodeId, size: u64) -> f64 {
        let bandwidth = self.nodes[from].bandwidth.min(self.nodes[to].bandwidth);
        let base = size as f64 / bandwidth;
        let excess = size.saturating_sub(self.config.congestion_threshold) as f64 / MIB;
        base * (1.0 + self.config.congestion_factor * excess)
    }

    /// Drop probability of one delivery
    pub fn loss_probability(&self, from: NodeId, to: NodeId, size: u64) -> f64 {
        let avg = (self.nodes[from].loss_rate + self.nodes[to].loss_rate) / 2.0;
        (avg * (1.0 + size as f64 / self.config.congestion_threshold as f64)).min(1.0)
    }

    /// Heights stored at every node, summed
    pub fn total_blocks_stored(&self) -> usize {
        self.nodes.iter().map(|n| n.stored_count()).sum()
    }
}

/// Uniform factor in `[1 - variance, 1 + variance]`
fn spread(rng: &mut StdRng, variance: f64) -> f64 {
    if variance > 0.0 {
        rng.gen_range(1.0 - variance..=1.0 + variance)
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topology_is_symmetric_and_irreflexive() {
        let network = Network::new(20, 3, NetworkConfig::default(), 11).unwrap();

        for node in network.nodes() {
            assert!(!node.has_neighbor(node.id));
            assert!(node.neighbor_count() >= 3);
            for peer in node.neighbors() {
                assert!(network.node(peer).unwrap().has_neighbor(node.id));
            }
        }
    }

    #[test]
    fn test_degree_capped_by_network_size() {
        let network = Network::new(3, 10, NetworkConfig::default(), 1).unwrap();
        for node in network.nodes() {
            assert_eq!(node.neighbor_count(), 2);
        }
        assert_eq!(network.link_count(), 3);
    }

    #[test]
    fn test_single_node_has_no_links() {
        let network = Network::new(1, 3, NetworkConfig::default(), 1).unwrap();
        assert_eq!(network.node(0).unwrap().neighbor_count(), 0);
        assert!(network.node(1).is_err());
    }

    #[test]
    fn test_zero_nodes_rejected() {
        assert!(Network::new(0, 3, NetworkConfig::default(), 1).is_err());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = NetworkConfig {
            latency_min: 0.5,
            latency_max: 0.1,
            ..NetworkConfig::default()
        };
        assert!(config.validate().is_err());

        let config = NetworkConfig { bandwidth: 0.0, ..NetworkConfig::default() };
        assert!(Network::new(2, 1, config, 0).is_err());
    }

    #[test]
    fn test_congestion_inflates_transmission() {
        let config = NetworkConfig {
            bandwidth_variance: 0.0,
            ..NetworkConfig::default()
        };
        let network = Network::new(2, 1, config, 3).unwrap();

        let small = network.transmission_time(0, 1, 1024 * 1024);
        let large = network.transmission_time(0, 1, 3 * 1024 * 1024);
        // 3 MiB is 3x the bytes and 2 MiB over threshold: 3 * 1.2
        assert!((large / small - 3.6).abs() < 1e-9);
    }

    #[test]
    fn test_loss_grows_with_size() {
        let network = Network::new(2, 1, NetworkConfig::default(), 3).unwrap();
        let small = network.loss_probability(0, 1, 1024);
        let large = network.loss_probability(0, 1, 8 * 1024 * 1024);
        assert!(large > small);
        assert!(large <= 1.0);
    }

    #[test]
    fn test_same_seed_same_topology() {
        let a = Network::new(15, 4, NetworkConfig::default(), 99).unwrap();
        let b = Network::new(15, 4, NetworkConfig::default(), 99).unwrap();
        for (x, y) in a.nodes().iter().zip(b.nodes()) {
            assert_eq!(x.neighbors().collect::<Vec<_>>(), y.neighbors().collect::<Vec<_>>());
            assert_eq!(x.latency, y.latency);
        }
    }
}
