// mining/src/lib.rs

//! Proof-of-work mining model
//!
//! This crate implements:
//! - The per-miner exponential race for the next block
//! - Hashrate-weighted attribution of the winning miner
//! - Windowed difficulty retargeting

pub mod difficulty;
pub mod miner;

pub use difficulty::{DifficultyConfig, DifficultyController, Retarget, DEFAULT_RETARGET_WINDOW};
pub use miner::{BlockFound, Miner, MinerPool, RaceMode};

use sim_core::MinerId;

/// Result type for mining operations
pub type MiningResult<T> = Result<T, MiningError>;

/// Errors that can occur in mining operations
#[derive(Debug, thiserror::Error)]
pub enum MiningError {
    #[error("Total hashrate is zero, no block can ever be found")]
    ZeroHashrate,

    #[error("Invalid hashrate for miner {miner}: {value}")]
    InvalidHashrate { miner: MinerId, value: f64 },

    #[error("Invalid difficulty: {0}")]
    InvalidDifficulty(f64),

    #[error("No finite next-block time (difficulty {difficulty}, hashrate {hashrate})")]
    NoFiniteEvent { difficulty: f64, hashrate: f64 },

    #[error("Unknown miner: {0}")]
    UnknownMiner(MinerId),

    #[error("Miner {0} already left")]
    InactiveMiner(MinerId),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}
