// sim-core/src/chain.rs

use crate::{block::{Block, BlockHash}, types::*, CoreError, CoreResult};
use std::collections::HashSet;

/// History of accepted blocks
///
/// Owns every block; peer nodes only reference blocks by height.
pub struct ChainHistory {
    blocks: Vec<Block>,
    /// Every transaction id confirmed so far
    confirmed: HashSet<TxId>,
    total_transactions: u64,
    coins_issued: Amount,
    total_fees: Amount,
}

impl ChainHistory {
    pub fn new() -> Self {
        Self {
            blocks: Vec::new(),
            confirmed: HashSet::new(),
            total_transactions: 0,
            coins_issued: Amount::zero(),
            total_fees: Amount::zero(),
        }
    }

    /// Append an accepted block
    ///
    /// All checks run before any mutation, so a rejected block leaves the
    /// history untouched.
    pub fn append(&mut self, block: Block) -> CoreResult<()> {
        let parent = self.blocks.last();
        block.header.validate(parent.map(|b| &b.header), self.tip_hash())?;

        let mut seen = HashSet::with_capacity(block.transactions.len());
        for id in &block.transactions {
            if self.confirmed.contains(id) || !seen.insert(*id) {
                return Err(CoreError::InvariantViolation(format!(
                    "transaction {} confirmed twice (block {})",
                    id,
                    block.height()
                )));
            }
        }

        let coins_issued = self.coins_issued.checked_add(&block.reward())
            .ok_or_else(|| CoreError::Overflow("coins issued".into()))?;
        let total_fees = self.total_fees.checked_add(&block.fees)
            .ok_or_else(|| CoreError::Overflow("total fees".into()))?;

        self.confirmed.extend(seen);
        self.total_transactions += block.tx_count() as u64;
        self.coins_issued = coins_issued;
        self.total_fees = total_fees;
        self.blocks.push(block);

        Ok(())
    }

    /// Latest accepted block
    pub fn tip(&self) -> Option<&Block> {
        self.blocks.last()
    }

    /// Digest of the tip, or zero before the first block
    pub fn tip_hash(&self) -> BlockHash {
        self.tip().map(|b| b.hash).unwrap_or_else(BlockHash::zero)
    }

    /// Timestamp of the tip, or 0 before the first block
    pub fn tip_time(&self) -> SimTime {
        self.tip().map(|b| b.header.timestamp).unwrap_or(0.0)
    }

    /// Height the next accepted block will carry
    pub fn next_height(&self) -> BlockHeight {
        self.blocks.len() as BlockHeight
    }

    pub fn get(&self, height: BlockHeight) -> Option<&Block> {
        self.blocks.get(height as usize)
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn is_confirmed(&self, id: TxId) -> bool {
        self.confirmed.contains(&id)
    }

    pub fn total_transactions(&self) -> u64 {
        self.total_transactions
    }

    pub fn coins_issued(&self) -> Amount {
        self.coins_issued
    }

    pub fn total_fees(&self) -> Amount {
        self.total_fees
    }

    /// Mean inter-block time over the whole history
    pub fn average_block_time(&self) -> f64 {
        if self.blocks.is_empty() {
            return 0.0;
        }
        self.tip_time() / self.blocks.len() as f64
    }
}

impl Default for ChainHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BlockHeader, Transaction};

    fn next_block(chain: &ChainHistory, txs: &[TxId], reward: u64) -> Block {
        let height = chain.next_height();
        let header = BlockHeader {
            height,
            parent_hash: chain.tip_hash(),
            timestamp: chain.tip_time() + 600.0,
            time_since_last: 600.0,
            finder: 0,
            difficulty: 1.0,
        };
        let batch: Vec<Transaction> = txs.iter()
            .map(|id| Transaction::new(*id, 0, 1, Amount::new(100), Amount::new(1), 0.0))
            .collect();
        Block::assemble(header, &batch, Amount::new(reward)).unwrap()
    }

    #[test]
    fn test_append_tracks_totals() {
        let mut chain = ChainHistory::new();
        let b0 = next_block(&chain, &[1, 2], 50);
        chain.append(b0).unwrap();
        let b1 = next_block(&chain, &[3], 50);
        chain.append(b1).unwrap();

        assert_eq!(chain.len(), 2);
        assert_eq!(chain.total_transactions(), 3);
        assert_eq!(chain.coins_issued(), Amount::new(100));
        assert_eq!(chain.total_fees(), Amount::new(3));
        assert_eq!(chain.average_block_time(), 600.0);
        assert!(chain.is_confirmed(3));
    }

    #[test]
    fn test_double_confirmation_rejected() {
        let mut chain = ChainHistory::new();
        let b0 = next_block(&chain, &[1, 2], 50);
        chain.append(b0).unwrap();

        let replay = next_block(&chain, &[2, 9], 50);
        assert!(matches!(chain.append(replay), Err(CoreError::InvariantViolation(_))));

        // rejected block left no trace
        assert_eq!(chain.len(), 1);
        assert!(!chain.is_confirmed(9));
        assert_eq!(chain.coins_issued(), Amount::new(50));
    }

    #[test]
    fn test_out_of_order_height_rejected() {
        let mut chain = ChainHistory::new();
        let b0 = next_block(&chain, &[], 50);
        chain.append(b0.clone()).unwrap();

        assert!(chain.append(b0).is_err());
        assert_eq!(chain.len(), 1);
    }
}
