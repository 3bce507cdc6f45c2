// mining/src/difficulty.rs

//! Windowed difficulty retargeting
//!
//! Every `window` accepted blocks the controller compares the observed mean
//! inter-block time with the target and rescales difficulty by their ratio.

use crate::{MiningError, MiningResult};
use serde::{Deserialize, Serialize};
use sim_core::BlockHeight;

/// Default retarget window, in blocks
pub const DEFAULT_RETARGET_WINDOW: u64 = 2016;

/// Floor applied to the observed average so a burst of instant blocks
/// cannot divide by zero
const MIN_AVERAGE_BLOCK_TIME: f64 = 1e-9;

/// Configuration for difficulty adjustment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultyConfig {
    /// Target seconds between blocks
    pub target_block_time: f64,
    /// Blocks per retarget window
    pub window: u64,
    /// Optional bound on a single adjustment: the ratio is clamped to
    /// `[1 / max, max]`. Unclamped when `None`.
    pub max_adjustment: Option<f64>,
}

impl Default for DifficultyConfig {
    fn default() -> Self {
        Self {
            target_block_time: 600.0,
            window: DEFAULT_RETARGET_WINDOW,
            max_adjustment: None,
        }
    }
}

/// A completed retarget
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Retarget {
    /// Height of the block that closed the window
    pub height: BlockHeight,
    pub old: f64,
    pub new: f64,
    /// Observed mean inter-block time over the window
    pub actual_avg: f64,
}

impl Retarget {
    pub fn ratio(&self) -> f64 {
        self.new / self.old
    }
}

/// Tracks current difficulty and the rolling window accumulator
#[derive(Debug, Clone)]
pub struct DifficultyController {
    config: DifficultyConfig,
    current: f64,
    blocks_in_window: u64,
    window_time: f64,
    retargets: u64,
}

impl DifficultyController {
    pub fn new(config: DifficultyConfig, initial: f64) -> MiningResult<Self> {
        if !initial.is_finite() || initial <= 0.0 {
            return Err(MiningError::InvalidDifficulty(initial));
        }
        if !config.target_block_time.is_finite() || config.target_block_time <= 0.0 {
            return Err(MiningError::InvalidConfiguration(format!(
                "target block time must be positive, got {}",
                config.target_block_time
            )));
        }
        if config.window < 2 {
            return Err(MiningError::InvalidConfiguration(format!(
                "retarget window must be at least 2 blocks, got {}",
                config.window
            )));
        }
        if let Some(max) = config.max_adjustment {
            if !max.is_finite() || max < 1.0 {
                return Err(MiningError::InvalidConfiguration(format!(
                    "max difficulty adjustment must be >= 1, got {}",
                    max
                )));
            }
        }

        Ok(Self {
            config,
            current: initial,
            blocks_in_window: 0,
            window_time: 0.0,
            retargets: 0,
        })
    }

    /// Record an accepted block and retarget if it closes the window
    pub fn record_block(&mut self, height: BlockHeight, time_since_last: f64) -> Option<Retarget> {
        self.blocks_in_window += 1;
        self.window_time += time_since_last;

        if self.blocks_in_window < self.config.window {
            return None;
        }

        let actual_avg = (self.window_time / self.config.window as f64).max(MIN_AVERAGE_BLOCK_TIME);
        let mut ratio = self.config.target_block_time / actual_avg;
        if let Some(max) = self.config.max_adjustment {
            ratio = ratio.clamp(1.0 / max, max);
        }

        let old = self.current;
        self.current = old * ratio;
        self.blocks_in_window = 0;
        self.window_time = 0.0;
        self.retargets += 1;

        tracing::info!(
            height,
            old_difficulty = old,
            new_difficulty = self.current,
            actual_avg,
            target = self.config.target_block_time,
            "difficulty retarget"
        );

        Some(Retarget {
            height,
            old,
            new: self.current,
            actual_avg,
        })
    }

    /// Current difficulty
    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn blocks_in_window(&self) -> u64 {
        self.blocks_in_window
    }

    pub fn retargets(&self) -> u64 {
        self.retargets
    }

    pub fn config(&self) -> &DifficultyConfig {
        &self.config
    }
}
