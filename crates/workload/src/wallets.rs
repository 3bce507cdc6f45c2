// workload/src/wallets.rs

use crate::{WorkloadError, WorkloadGenerator, WorkloadResult};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use sim_core::{Amount, Priority, SimTime, Transaction, TxId, WalletId};

/// Wallet workload parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadConfig {
    pub wallets: usize,
    /// Transactions each wallet creates
    pub transactions_per_wallet: u64,
    /// Simulated seconds between a wallet's consecutive transactions
    pub interval: f64,
    /// Transfer amounts are uniform over this range, in coins
    pub min_amount: f64,
    pub max_amount: f64,
    /// Fee as a fraction of the amount
    pub fee_rate: f64,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            wallets: 0,
            transactions_per_wallet: 0,
            interval: 1.0,
            min_amount: 0.1,
            max_amount: 10.0,
            fee_rate: 0.01,
        }
    }
}

impl WorkloadConfig {
    /// A workload is active when it will create at least one transaction
    pub fn is_active(&self) -> bool {
        self.wallets > 0 && self.transactions_per_wallet > 0
    }

    pub fn total_transactions(&self) -> u64 {
        self.wallets as u64 * self.transactions_per_wallet
    }
}

/// Transfers between a fixed set of wallets
///
/// Wallet `w` creates its `k`-th transaction at `k * interval`. Within a
/// round, wallets emit in index order.
pub struct WalletWorkload {
    config: WorkloadConfig,
    min_units: u64,
    max_units: u64,
    /// Next round to emit
    round: u64,
    emitted: u64,
    next_id: TxId,
    generated_fees: Amount,
}

impl WalletWorkload {
    pub fn new(config: WorkloadConfig) -> WorkloadResult<Self> {
        if config.is_active() && !(config.interval > 0.0 && config.interval.is_finite()) {
            return Err(WorkloadError::InvalidConfiguration(format!(
                "generation interval must be positive, got {}",
                config.interval
            )));
        }
        if !(0.0..=1.0).contains(&config.fee_rate) {
            return Err(WorkloadError::InvalidConfiguration(format!(
                "fee rate must be in [0, 1], got {}",
                config.fee_rate
            )));
        }

        let min_units = Amount::from_coins(config.min_amount)
            .ok_or(WorkloadError::AmountConversion(config.min_amount))?
            .units();
        let max_units = Amount::from_coins(config.max_amount)
            .ok_or(WorkloadError::AmountConversion(config.max_amount))?
            .units();
        if min_units > max_units {
            return Err(WorkloadError::InvalidConfiguration(format!(
                "amount range [{}, {}] is empty",
                config.min_amount, config.max_amount
            )));
        }

        tracing::info!(
            wallets = config.wallets,
            per_wallet = config.transactions_per_wallet,
            interval = config.interval,
            "wallet workload ready"
        );

        Ok(Self {
            config,
            min_units,
            max_units,
            round: 0,
            emitted: 0,
            next_id: 0,
            generated_fees: Amount::zero(),
        })
    }

    pub fn config(&self) -> &WorkloadConfig {
        &self.config
    }

    /// Fees carried by every transaction emitted so far
    pub fn generated_fees(&self) -> Amount {
        self.generated_fees
    }

    fn round_time(&self, round: u64) -> SimTime {
        round as f64 * self.config.interval
    }

    fn make_transaction(
        &mut self,
        from: WalletId,
        created_at: SimTime,
        rng: &mut dyn RngCore,
    ) -> WorkloadResult<Transaction> {
        let wallets = self.config.wallets;
        let to = if wallets > 1 {
            let pick = rng.gen_range(0..wallets - 1);
            if pick >= from { pick + 1 } else { pick }
        } else {
            from
        };

        let amount = Amount::new(rng.gen_range(self.min_units..=self.max_units));
        let fee = Amount::new((amount.units() as f64 * self.config.fee_rate).round() as u64);
        let priority = match rng.gen_range(0..10u8) {
            0..=1 => Priority::Low,
            2..=6 => Priority::Normal,
            7..=8 => Priority::High,
            _ => Priority::Urgent,
        };

        self.generated_fees = self
            .generated_fees
            .checked_add(&fee)
            .ok_or_else(|| WorkloadError::Overflow(format!("generated fees after transaction {}", self.next_id)))?;
        let id = self.next_id;
        self.next_id += 1;

        Ok(Transaction::new(id, from, to, amount, fee, created_at).with_priority(priority))
    }
}

impl WorkloadGenerator for WalletWorkload {
    fn generate_until(&mut self, until: SimTime, rng: &mut dyn RngCore) -> WorkloadResult<Vec<Transaction>> {
        let mut batch = Vec::new();

        while self.round < self.config.transactions_per_wallet && self.round_time(self.round) <= until {
            let created_at = self.round_time(self.round);
            for wallet in 0..self.config.wallets {
                let tx = self.make_transaction(wallet, created_at, rng)?;
                batch.push(tx);
            }
            self.emitted += self.config.wallets as u64;
            self.round += 1;
        }

        if !batch.is_empty() {
            tracing::debug!(count = batch.len(), until, emitted = self.emitted, "generated transactions");
        }

        Ok(batch)
    }

    fn next_due(&self) -> Option<SimTime> {
        (!self.is_exhausted()).then(|| self.round_time(self.round))
    }

    fn total(&self) -> u64 {
        self.config.total_transactions()
    }

    fn emitted(&self) -> u64 {
        self.emitted
    }
}
