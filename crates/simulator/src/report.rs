// simulator/src/report.rs

use crate::SimulationConfig;
use serde::{Deserialize, Serialize};
use sim_core::{Snapshot, Termination};

/// Receives snapshots while a simulation runs
pub trait SnapshotObserver {
    /// Called every `print` accepted blocks
    fn on_block(&mut self, snapshot: &Snapshot);

    /// Called once with the final snapshot
    fn on_finish(&mut self, snapshot: &Snapshot, termination: Termination);
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl SnapshotObserver for NullObserver {
    fn on_block(&mut self, _snapshot: &Snapshot) {}

    fn on_finish(&mut self, _snapshot: &Snapshot, _termination: Termination) {}
}

/// Export record of a completed run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub config: SimulationConfig,
    pub termination: Termination,
    pub snapshot: Snapshot,
}

fn compact(value: f64) -> String {
    if value >= 1000.0 {
        format!("{:.0}K", value / 1000.0)
    } else {
        format!("{}", value)
    }
}

/// One-line progress summary
///
/// Running snapshots are prefixed with the simulated time; the final one
/// is marked `End` and shows the completed run.
pub fn format_summary(snapshot: &Snapshot, is_final: bool) -> String {
    let progress = if snapshot.blocks_target > 0 {
        snapshot.height as f64 / snapshot.blocks_target as f64 * 100.0
    } else {
        0.0
    };

    let head = if is_final {
        format!(
            "[******] End B:{}/{} {:.1}%",
            snapshot.height, snapshot.blocks_target, progress
        )
    } else {
        format!(
            "[{:.2}] Sum B:{}/{} {:.1}%",
            snapshot.sim_time, snapshot.height, snapshot.blocks_target, progress
        )
    };
    let eta = if is_final {
        String::new()
    } else {
        format!(" ETA:{:.2}s", snapshot.eta_seconds)
    };

    format!(
        "{} abt:{:.2}s tps:{:.2} infl:{:.2}%{} Diff:{:.1}B H:{:.0}M Tx:{} C:{} Pool:{} NMB:{:.2} IO:{}",
        head,
        snapshot.average_block_time,
        snapshot.tps,
        snapshot.inflation_pct,
        eta,
        snapshot.difficulty / 1e9,
        snapshot.total_hashrate / 1e6,
        snapshot.total_transactions,
        compact(snapshot.coins_issued.to_coins()),
        snapshot.pool_size,
        snapshot.network_bytes as f64 / (1024.0 * 1024.0),
        snapshot.io_requests,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::Amount;

    fn snapshot() -> Snapshot {
        Snapshot {
            height: 144,
            blocks_target: 288,
            sim_time: 86_400.0,
            average_block_time: 600.0,
            tps: 0.5,
            inflation_pct: 0.03,
            annual_inflation_pct: 12.0,
            eta_seconds: 86_400.0,
            difficulty: 3_000_000_000.0,
            total_hashrate: 5_000_000.0,
            tip_id: Some(143),
            tip_hash: "ab".repeat(32),
            total_transactions: 43_200,
            coins_issued: Amount::from_coins(7_200.0).unwrap(),
            total_fees: Amount::zero(),
            pool_size: 12,
            peak_pool_size: 40,
            dropped_transactions: 0,
            network_bytes: 3 * 1024 * 1024,
            io_requests: 2_880,
            propagation_timeouts: 0,
            blocks_propagated: 144,
            average_propagation_time: 0.8,
            blocks_per_miner: vec![144],
            termination: None,
        }
    }

    #[test]
    fn test_running_line() {
        let line = format_summary(&snapshot(), false);
        assert_eq!(
            line,
            "[86400.00] Sum B:144/288 50.0% abt:600.00s tps:0.50 infl:0.03% ETA:86400.00s \
             Diff:3.0B H:5M Tx:43200 C:7K Pool:12 NMB:3.00 IO:2880"
        );
    }

    #[test]
    fn test_final_line() {
        let line = format_summary(&snapshot(), true);
        assert!(line.starts_with("[******] End B:144/288 50.0% abt:600.00s"));
        assert!(!line.contains("ETA"));
    }

    #[test]
    fn test_compact_numbers() {
        assert_eq!(compact(50.0), "50");
        assert_eq!(compact(12.5), "12.5");
        assert_eq!(compact(2_625_000.0), "2625K");
    }
}
