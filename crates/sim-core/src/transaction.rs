// sim-core/src/transaction.rs

use crate::{types::*, CoreError, CoreResult};
use serde::{Deserialize, Serialize};

/// Priority class attached by the workload generator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

/// A user transaction waiting for (or embedded in) a block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TxId,
    pub from: WalletId,
    pub to: WalletId,
    pub amount: Amount,
    pub fee: Amount,
    /// Simulated creation time
    pub created_at: SimTime,
    pub priority: Priority,
}

impl Transaction {
    pub fn new(
        id: TxId,
        from: WalletId,
        to: WalletId,
        amount: Amount,
        fee: Amount,
        created_at: SimTime,
    ) -> Self {
        Self {
            id,
            from,
            to,
            amount,
            fee,
            created_at,
            priority: Priority::Normal,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Validate transaction basic properties
    pub fn validate_basic(&self) -> CoreResult<()> {
        if !self.created_at.is_finite() || self.created_at < 0.0 {
            return Err(CoreError::InvalidTransaction(format!(
                "tx {} has invalid creation time {}",
                self.id, self.created_at
            )));
        }
        Ok(())
    }
}
