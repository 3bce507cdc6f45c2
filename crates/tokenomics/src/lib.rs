// tokenomics/src/lib.rs

//! Block reward issuance
//!
//! This crate implements:
//! - The halving reward schedule
//! - The issuance ledger crediting each accepted block's coinbase
//!
//! Amounts are integer base units, so cumulative issuance always equals
//! the exact sum of per-height rewards.

pub mod minting;
pub mod rewards;

pub use minting::{Issuance, MintingController};
pub use rewards::{RewardSchedule, MAX_HALVINGS};

/// Result type for tokenomics operations
pub type TokenomicsResult<T> = Result<T, TokenomicsError>;

/// Errors that can occur in tokenomics operations
#[derive(Debug, thiserror::Error)]
pub enum TokenomicsError {
    #[error("Minting error: {0}")]
    MintingError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Overflow error: {0}")]
    OverflowError(String),
}
