// sim-core/src/lib.rs

//! Core data model for the proof-of-work network simulator
//!
//! This crate provides:
//! - Block and coinbase structures
//! - Transaction types
//! - The FIFO transaction pool
//! - Accepted-chain history with at-most-once confirmation
//! - Network counters and the reporting snapshot

pub mod block;
pub mod chain;
pub mod mempool;
pub mod metrics;
pub mod transaction;
pub mod types;

pub use block::{Block, BlockHash, BlockHeader, Coinbase, HEADER_SIZE, TRANSACTION_SIZE};
pub use chain::ChainHistory;
pub use mempool::{PoolConfig, PoolMetrics, TransactionPool, TxStatus};
pub use metrics::{NetworkCounters, Snapshot, Termination};
pub use transaction::{Priority, Transaction};
pub use types::*;

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core operations
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid block: {0}")]
    InvalidBlock(String),

    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("Transaction {0} already pending or confirmed")]
    DuplicateTransaction(TxId),

    #[error("Transaction pool full ({0} entries)")]
    PoolFull(usize),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Amount overflow: {0}")]
    Overflow(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}
