// sim-core/src/metrics.rs

use crate::{Amount, BlockHeight, SimTime};
use serde::{Deserialize, Serialize};

/// Network-wide propagation counters
///
/// Owned by the orchestrator and passed by reference into each broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkCounters {
    /// One per block delivery attempt, including duplicates and drops
    pub io_requests: u64,
    /// Bytes moved across all edges
    pub network_bytes: u64,
    /// Deliveries whose arrival hit the propagation ceiling
    pub propagation_timeouts: u64,
    /// Completed broadcasts
    pub blocks_propagated: u64,
    /// Sum of each broadcast's slowest store time
    pub total_propagation_time: SimTime,
}

impl NetworkCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account one delivery of `size` bytes
    pub fn record_delivery(&mut self, size: u64) {
        self.io_requests += 1;
        self.network_bytes += size;
    }

    pub fn record_timeout(&mut self) {
        self.propagation_timeouts += 1;
    }

    /// Account one finished broadcast whose last store happened at `slowest`
    pub fn record_propagation(&mut self, slowest: SimTime) {
        self.blocks_propagated += 1;
        self.total_propagation_time += slowest;
    }

    /// Mean time for a block to reach the last node that stored it
    pub fn average_propagation_time(&self) -> SimTime {
        if self.blocks_propagated == 0 {
            0.0
        } else {
            self.total_propagation_time / self.blocks_propagated as f64
        }
    }

    pub fn network_megabytes(&self) -> f64 {
        self.network_bytes as f64 / (1024.0 * 1024.0)
    }
}

/// Why a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Configured block count reached
    BlockLimit,
    /// Configured simulated duration elapsed
    Duration,
    /// Every scheduled transaction was created and confirmed
    WorkloadExhausted,
    /// Stopped between blocks on request
    Cancelled,
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            Termination::BlockLimit => "block limit reached",
            Termination::Duration => "duration reached",
            Termination::WorkloadExhausted => "workload exhausted",
            Termination::Cancelled => "cancelled",
        };
        f.write_str(reason)
    }
}

/// Point-in-time statistics exposed after each accepted block and at run end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Number of accepted blocks
    pub height: u64,
    /// Configured (or duration-derived) block target
    pub blocks_target: u64,
    /// Simulated clock
    pub sim_time: SimTime,
    pub average_block_time: f64,
    /// Confirmed transactions per simulated second
    pub tps: f64,
    /// Coins issued as a percentage of the theoretical maximum supply
    pub inflation_pct: f64,
    /// Projected yearly issuance relative to current supply
    pub annual_inflation_pct: f64,
    /// Estimated simulated seconds until termination
    pub eta_seconds: f64,
    pub difficulty: f64,
    pub total_hashrate: f64,
    /// Height of the tip block
    pub tip_id: Option<BlockHeight>,
    /// Hex digest of the tip block
    pub tip_hash: String,
    pub total_transactions: u64,
    pub coins_issued: Amount,
    pub total_fees: Amount,
    pub pool_size: usize,
    pub peak_pool_size: usize,
    pub dropped_transactions: u64,
    pub network_bytes: u64,
    pub io_requests: u64,
    pub propagation_timeouts: u64,
    pub blocks_propagated: u64,
    /// Mean seconds from a block being found to its last store
    pub average_propagation_time: f64,
    /// Blocks found per miner index
    pub blocks_per_miner: Vec<u64>,
    /// Set once the run has stopped
    pub termination: Option<Termination>,
}

impl Snapshot {
    /// Whether every monotone field is at least its value in `prev`
    pub fn is_monotonic_after(&self, prev: &Snapshot) -> bool {
        self.height >= prev.height
            && self.sim_time >= prev.sim_time
            && self.coins_issued >= prev.coins_issued
            && self.total_transactions >= prev.total_transactions
            && self.network_bytes >= prev.network_bytes
            && self.io_requests >= prev.io_requests
            && self.blocks_propagated >= prev.blocks_propagated
    }
}
