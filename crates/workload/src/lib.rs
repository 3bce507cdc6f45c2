// workload/src/lib.rs

//! Synthetic wallet workload
//!
//! Provides the `WorkloadGenerator` trait and the wallet transfer workload
//! that feeds the transaction pool on a fixed schedule.

pub mod wallets;

pub use wallets::{WalletWorkload, WorkloadConfig};

use rand::RngCore;
use sim_core::{SimTime, Transaction};

/// Result type for workload operations
pub type WorkloadResult<T> = Result<T, WorkloadError>;

/// Trait for generating transaction workloads.
///
/// Uses `&mut dyn RngCore` so generators stay object-safe.
pub trait WorkloadGenerator: Send {
    /// Emit every transaction created at or before `until`, in creation order.
    fn generate_until(&mut self, until: SimTime, rng: &mut dyn RngCore) -> WorkloadResult<Vec<Transaction>>;

    /// Creation time of the next transaction, or `None` once exhausted.
    fn next_due(&self) -> Option<SimTime>;

    /// Number of transactions the workload will create in total.
    fn total(&self) -> u64;

    /// Number emitted so far.
    fn emitted(&self) -> u64;

    fn is_exhausted(&self) -> bool {
        self.emitted() >= self.total()
    }
}

/// Error type for workload generation.
#[derive(Debug, thiserror::Error)]
pub enum WorkloadError {
    #[error("Invalid workload configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Amount conversion failed: {0}")]
    AmountConversion(f64),

    #[error("Amount overflow: {0}")]
    Overflow(String),
}
