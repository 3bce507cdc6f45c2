// simulator/src/lib.rs

//! Proof-of-work network simulation orchestrator
//!
//! Ties the mining race, difficulty controller, reward schedule,
//! propagation network and transaction workload to one simulated clock.

pub mod clock;
pub mod config;
pub mod report;
pub mod runtime;

pub use clock::SimClock;
pub use config::SimulationConfig;
pub use report::{format_summary, NullObserver, RunSummary, SnapshotObserver};
pub use runtime::Simulator;
pub use sim_core::{Snapshot, Termination};

use mining::MiningError;
use networking::NetworkError;
use sim_core::CoreError;
use tokenomics::TokenomicsError;
use workload::WorkloadError;

/// Result type for simulation operations
pub type SimResult<T> = Result<T, SimulatorError>;

/// Errors that stop a simulation
///
/// Every variant is fatal. [`SimulatorError::is_configuration`] tells setup
/// problems apart from internal invariant violations.
#[derive(Debug, thiserror::Error)]
pub enum SimulatorError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Simulation already finished: {0}")]
    Finished(Termination),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Mining(#[from] MiningError),

    #[error(transparent)]
    Tokenomics(#[from] TokenomicsError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Workload(#[from] WorkloadError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SimulatorError {
    /// Whether the error stems from invalid parameters rather than a fault
    /// during the run
    pub fn is_configuration(&self) -> bool {
        match self {
            SimulatorError::Configuration(_) | SimulatorError::Io(_) => true,
            SimulatorError::Mining(e) => matches!(
                e,
                MiningError::ZeroHashrate
                    | MiningError::InvalidHashrate { .. }
                    | MiningError::InvalidDifficulty(_)
                    | MiningError::NoFiniteEvent { .. }
                    | MiningError::InvalidConfiguration(_)
            ),
            SimulatorError::Network(e) => matches!(e, NetworkError::InvalidConfiguration(_)),
            SimulatorError::Workload(e) => !matches!(e, WorkloadError::Overflow(_)),
            SimulatorError::Tokenomics(e) => matches!(e, TokenomicsError::InvalidConfiguration(_)),
            SimulatorError::InvariantViolation(_)
            | SimulatorError::Finished(_)
            | SimulatorError::Core(_) => false,
        }
    }
}
