// tokenomics/src/minting.rs

use crate::{rewards::RewardSchedule, TokenomicsError, TokenomicsResult};
use sim_core::{Amount, BlockHeight, MinerId, SECONDS_PER_YEAR};
use std::collections::BTreeMap;

/// Coinbase issued for one block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Issuance {
    pub height: BlockHeight,
    pub miner: MinerId,
    pub amount: Amount,
}

/// Issuance ledger
///
/// Tracks the next height to mint, total coins issued and per-miner
/// earnings. Heights must be minted in order.
pub struct MintingController {
    schedule: RewardSchedule,
    /// Height the next minted block must carry
    next_height: BlockHeight,
    total_minted: Amount,
    earnings: BTreeMap<MinerId, Amount>,
}

impl MintingController {
    /// Create new minting controller
    pub fn new(schedule: RewardSchedule) -> Self {
        Self {
            schedule,
            next_height: 0,
            total_minted: Amount::zero(),
            earnings: BTreeMap::new(),
        }
    }

    /// Reward the next block would receive
    pub fn current_reward(&self) -> Amount {
        self.schedule.reward_at(self.next_height)
    }

    /// Compute the issuance for `height` without applying it
    pub fn preview(&self, height: BlockHeight, miner: MinerId) -> TokenomicsResult<Issuance> {
        if height != self.next_height {
            return Err(TokenomicsError::MintingError(format!(
                "expected height {}, got {}",
                self.next_height, height
            )));
        }
        self.total_minted
            .checked_add(&self.schedule.reward_at(height))
            .ok_or_else(|| TokenomicsError::OverflowError("Total minted overflow".into()))?;

        Ok(Issuance {
            height,
            miner,
            amount: self.schedule.reward_at(height),
        })
    }

    /// Apply an issuance previously returned by [`preview`](Self::preview)
    pub fn commit(&mut self, issuance: Issuance) -> TokenomicsResult<()> {
        if issuance.height != self.next_height {
            return Err(TokenomicsError::MintingError(format!(
                "stale issuance for height {} (next is {})",
                issuance.height, self.next_height
            )));
        }

        self.total_minted = self.total_minted.checked_add(&issuance.amount)
            .ok_or_else(|| TokenomicsError::OverflowError("Total minted overflow".into()))?;

        let earned = self.earnings.entry(issuance.miner).or_insert_with(Amount::zero);
        *earned = earned.checked_add(&issuance.amount)
            .ok_or_else(|| TokenomicsError::OverflowError("Miner earnings overflow".into()))?;

        if self.schedule.is_halving_height(issuance.height) {
            tracing::info!(
                height = issuance.height,
                reward = %issuance.amount,
                "block reward halved"
            );
        }

        self.next_height += 1;
        Ok(())
    }

    /// Mint the coinbase for a block in one step
    pub fn mint_for_block(&mut self, height: BlockHeight, miner: MinerId) -> TokenomicsResult<Issuance> {
        let issuance = self.preview(height, miner)?;
        self.commit(issuance)?;
        Ok(issuance)
    }

    /// Get total minted amount
    pub fn total_minted(&self) -> Amount {
        self.total_minted
    }

    pub fn next_height(&self) -> BlockHeight {
        self.next_height
    }

    pub fn earnings(&self, miner: MinerId) -> Amount {
        self.earnings.get(&miner).copied().unwrap_or_else(Amount::zero)
    }

    pub fn schedule(&self) -> &RewardSchedule {
        &self.schedule
    }

    /// Issued coins as a percentage of the theoretical maximum supply
    pub fn supply_percentage(&self, blocks_target: u64) -> f64 {
        let max = self.schedule.theoretical_max(blocks_target);
        if max == 0 {
            return 0.0;
        }
        self.total_minted.units() as f64 / max as f64 * 100.0
    }

    /// Projected annual inflation at the current reward and block time
    pub fn calculate_annual_inflation(&self, block_time: f64) -> f64 {
        if self.total_minted.is_zero() || block_time <= 0.0 {
            return 0.0;
        }
        let blocks_per_year = SECONDS_PER_YEAR / block_time;
        let annual_minting = self.current_reward().units() as f64 * blocks_per_year;

        annual_minting / self.total_minted.units() as f64 * 100.0
    }
}
