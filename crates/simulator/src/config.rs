// simulator/src/config.rs
use crate::{SimResult, SimulatorError};
use mining::{DifficultyConfig, RaceMode, DEFAULT_RETARGET_WINDOW};
use networking::NetworkConfig;
use serde::{Deserialize, Serialize};
use sim_core::{Amount, PoolConfig, SECONDS_PER_YEAR};
use std::path::Path;
use tokenomics::RewardSchedule;
use workload::WorkloadConfig;

/// Every parameter of a simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Peer nodes in the propagation network
    pub nodes: usize,
    /// Links each node initiates
    pub neighbors: usize,
    pub miners: usize,
    /// Nominal hashrate per miner, hashes per second
    pub hashrate: f64,
    /// Explicit per-miner hashrates; overrides `miners` and `hashrate`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub miner_hashrates: Option<Vec<f64>>,
    /// Per-miner hashrate spread, drawn once from the seed
    pub hashrate_variance: f64,
    pub race_mode: RaceMode,
    /// Target seconds between blocks
    pub blocktime: f64,
    /// Initial difficulty; `blocktime * total_hashrate` when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<f64>,
    pub retarget_window: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_difficulty_adjustment: Option<f64>,
    /// Block reward in coins
    pub reward: f64,
    /// Blocks between halvings, 0 disables halving
    pub halving: u64,
    /// Maximum transactions per block
    pub blocksize: usize,
    pub wallets: usize,
    /// Transactions per wallet
    pub transactions: u64,
    /// Seconds between a wallet's transactions
    pub interval: f64,
    /// Stop after this many blocks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocks: Option<u64>,
    /// Stop after this many simulated years
    #[serde(skip_serializing_if = "Option::is_none")]
    pub years: Option<f64>,
    /// Report every this many blocks
    pub print: u64,
    pub seed: u64,
    pub network: NetworkConfig,
    pub pool: PoolConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            nodes: 10,
            neighbors: 3,
            miners: 5,
            hashrate: 1000.0,
            miner_hashrates: None,
            hashrate_variance: 0.1,
            race_mode: RaceMode::default(),
            blocktime: 600.0,
            difficulty: None,
            retarget_window: DEFAULT_RETARGET_WINDOW,
            max_difficulty_adjustment: None,
            reward: 50.0,
            halving: 210_000,
            blocksize: 4096,
            wallets: 0,
            transactions: 0,
            interval: 1.0,
            blocks: None,
            years: Some(1.0),
            print: 144,
            seed: 42,
            network: NetworkConfig::default(),
            pool: PoolConfig::default(),
        }
    }
}

impl SimulationConfig {
    pub fn from_file(path: impl AsRef<Path>) -> SimResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| SimulatorError::Configuration(e.to_string()))
    }

    pub fn to_file(&self, path: impl AsRef<Path>) -> SimResult<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| SimulatorError::Configuration(e.to_string()))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Check every parameter once, before any state is built
    pub fn validate(&self) -> SimResult<()> {
        fn positive(name: &str, value: f64) -> SimResult<()> {
            if value > 0.0 && value.is_finite() {
                Ok(())
            } else {
                Err(SimulatorError::Configuration(format!(
                    "{} must be positive, got {}",
                    name, value
                )))
            }
        }
        fn nonzero(name: &str, value: u64) -> SimResult<()> {
            if value > 0 {
                Ok(())
            } else {
                Err(SimulatorError::Configuration(format!("{} must be positive", name)))
            }
        }

        nonzero("nodes", self.nodes as u64)?;
        nonzero("neighbors", self.neighbors as u64)?;
        nonzero("blocksize", self.blocksize as u64)?;
        nonzero("print", self.print)?;
        positive("blocktime", self.blocktime)?;
        positive("reward", self.reward)?;

        match &self.miner_hashrates {
            Some(rates) => {
                if rates.is_empty() {
                    return Err(SimulatorError::Configuration("miner_hashrates is empty".into()));
                }
                if let Some(bad) = rates.iter().find(|r| !(r.is_finite() && **r >= 0.0)) {
                    return Err(SimulatorError::Configuration(format!(
                        "miner hashrate must be non-negative, got {}",
                        bad
                    )));
                }
            }
            None => {
                nonzero("miners", self.miners as u64)?;
                positive("hashrate", self.hashrate)?;
            }
        }
        if !(self.total_nominal_hashrate() > 0.0) {
            return Err(SimulatorError::Configuration(
                "total hashrate is zero, no block can ever be found".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.hashrate_variance) {
            return Err(SimulatorError::Configuration(format!(
                "hashrate_variance must be in [0, 1), got {}",
                self.hashrate_variance
            )));
        }

        if let Some(difficulty) = self.difficulty {
            positive("difficulty", difficulty)?;
        }
        if self.retarget_window < 2 {
            return Err(SimulatorError::Configuration(format!(
                "retarget_window must be at least 2, got {}",
                self.retarget_window
            )));
        }
        if let Some(max) = self.max_difficulty_adjustment {
            if !(max >= 1.0 && max.is_finite()) {
                return Err(SimulatorError::Configuration(format!(
                    "max_difficulty_adjustment must be >= 1, got {}",
                    max
                )));
            }
        }

        if Amount::from_coins(self.reward).is_none() {
            return Err(SimulatorError::Configuration(format!("reward {} is out of range", self.reward)));
        }
        if self.wallets > 0 && self.transactions > 0 {
            positive("interval", self.interval)?;
        }

        match (self.blocks, self.years) {
            (None, None) => {
                return Err(SimulatorError::Configuration(
                    "either blocks or years must be set".into(),
                ))
            }
            (blocks, years) => {
                if let Some(blocks) = blocks {
                    nonzero("blocks", blocks)?;
                }
                if let Some(years) = years {
                    positive("years", years)?;
                }
            }
        }

        self.network
            .validate()
            .map_err(|e| SimulatorError::Configuration(e.to_string()))?;

        Ok(())
    }

    /// Nominal per-miner hashrates before variance is applied
    pub fn miner_hashrates(&self) -> Vec<f64> {
        match &self.miner_hashrates {
            Some(rates) => rates.clone(),
            None => vec![self.hashrate; self.miners],
        }
    }

    pub fn total_nominal_hashrate(&self) -> f64 {
        self.miner_hashrates().iter().sum()
    }

    /// Block target used for progress and inflation reporting
    pub fn blocks_target(&self) -> u64 {
        match (self.blocks, self.years) {
            (Some(blocks), _) => blocks,
            (None, Some(years)) => ((years * SECONDS_PER_YEAR / self.blocktime).floor() as u64).max(1),
            (None, None) => 0,
        }
    }

    /// Simulated-time limit in seconds
    pub fn duration_limit(&self) -> Option<f64> {
        self.years.map(|years| years * SECONDS_PER_YEAR)
    }

    pub fn workload(&self) -> WorkloadConfig {
        WorkloadConfig {
            wallets: self.wallets,
            transactions_per_wallet: self.transactions,
            interval: self.interval,
            ..WorkloadConfig::default()
        }
    }

    pub fn difficulty_config(&self) -> DifficultyConfig {
        DifficultyConfig {
            target_block_time: self.blocktime,
            window: self.retarget_window,
            max_adjustment: self.max_difficulty_adjustment,
        }
    }

    pub fn reward_schedule(&self) -> SimResult<RewardSchedule> {
        let base = Amount::from_coins(self.reward)
            .ok_or_else(|| SimulatorError::Configuration(format!("reward {} is out of range", self.reward)))?;
        Ok(RewardSchedule::new(base, self.halving))
    }
}
