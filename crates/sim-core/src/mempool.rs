// sim-core/src/mempool.rs

use crate::{transaction::Transaction, Amount, CoreError, CoreResult, TxId};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

/// Transaction pool configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Maximum number of pending transactions. `None` means unbounded;
    /// when set, overflowing transactions are rejected and counted as dropped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_size: Option<usize>,
}

/// Pool metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoolMetrics {
    pub total_added: u64,
    pub total_drained: u64,
    pub total_dropped: u64,
    pub peak_size: usize,
}

/// Transaction status as seen by the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    /// Waiting in the pool
    Pending,
    /// Drained into a block
    Confirmed,
}

/// FIFO transaction pool
///
/// Insertion appends; `drain` removes the oldest entries. A drained
/// transaction is confirmed and can never re-enter.
pub struct TransactionPool {
    config: PoolConfig,
    queue: VecDeque<Transaction>,
    pending: HashSet<TxId>,
    confirmed: HashSet<TxId>,
    metrics: PoolMetrics,
}

impl TransactionPool {
    /// Create new transaction pool
    pub fn new(config: PoolConfig) -> Self {
        Self {
            config,
            queue: VecDeque::new(),
            pending: HashSet::new(),
            confirmed: HashSet::new(),
            metrics: PoolMetrics::default(),
        }
    }

    /// Append a transaction to the tail
    pub fn enqueue(&mut self, tx: Transaction) -> CoreResult<()> {
        tx.validate_basic()?;

        if self.confirmed.contains(&tx.id) || self.pending.contains(&tx.id) {
            return Err(CoreError::DuplicateTransaction(tx.id));
        }

        if let Some(max_size) = self.config.max_size {
            if self.queue.len() >= max_size {
                self.metrics.total_dropped += 1;
                tracing::warn!(tx = tx.id, max_size, "transaction pool full, dropping transaction");
                return Err(CoreError::PoolFull(max_size));
            }
        }

        self.pending.insert(tx.id);
        self.queue.push_back(tx);
        self.metrics.total_added += 1;
        self.metrics.peak_size = self.metrics.peak_size.max(self.queue.len());

        Ok(())
    }

    /// Remove and return the oldest `min(max_count, len)` transactions,
    /// preserving arrival order. They are confirmed from here on.
    pub fn drain(&mut self, max_count: usize) -> Vec<Transaction> {
        let count = max_count.min(self.queue.len());
        let batch: Vec<Transaction> = self.queue.drain(..count).collect();

        for tx in &batch {
            self.pending.remove(&tx.id);
            self.confirmed.insert(tx.id);
        }
        self.metrics.total_drained += batch.len() as u64;

        batch
    }

    /// Copy of the oldest `min(max_count, len)` transactions, pool unchanged
    pub fn peek(&self, max_count: usize) -> Vec<Transaction> {
        self.queue.iter().take(max_count).cloned().collect()
    }

    /// Look up where a transaction is
    pub fn status(&self, id: TxId) -> Option<TxStatus> {
        if self.pending.contains(&id) {
            Some(TxStatus::Pending)
        } else if self.confirmed.contains(&id) {
            Some(TxStatus::Confirmed)
        } else {
            None
        }
    }

    /// Sum of fees currently waiting in the pool
    pub fn pending_fees(&self) -> CoreResult<Amount> {
        self.queue.iter().try_fold(Amount::zero(), |total, tx| {
            total
                .checked_add(&tx.fee)
                .ok_or_else(|| CoreError::Overflow("pending fees".into()))
        })
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Get pool metrics
    pub fn metrics(&self) -> &PoolMetrics {
        &self.metrics
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }
}

impl Default for TransactionPool {
    fn default() -> Self {
        Self::new(PoolConfig::default())
    }
}
