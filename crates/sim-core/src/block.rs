// sim-core/src/block.rs
use crate::{transaction::Transaction, types::*, CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Fixed per-block header overhead in bytes
pub const HEADER_SIZE: u64 = 1024;

/// Per-transaction size in bytes
pub const TRANSACTION_SIZE: u64 = 256;

/// A 32-byte block digest
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockHash([u8; 32]);

impl BlockHash {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Digest used as the parent of the first block
    pub fn zero() -> Self {
        Self([0u8; 32])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockHash({}...{})",
               hex::encode(&self.0[..4]),
               hex::encode(&self.0[28..]))
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Block header containing metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Block height (also the block identifier)
    pub height: BlockHeight,
    /// Digest of the previous block
    pub parent_hash: BlockHash,
    /// Simulated time the block was found
    pub timestamp: SimTime,
    /// Time since the previous block
    pub time_since_last: SimTime,
    /// Miner that found the block
    pub finder: MinerId,
    /// Difficulty the block was mined at
    pub difficulty: f64,
}

impl BlockHeader {
    /// Calculate header digest over (height, timestamp, parent, finder)
    pub fn hash(&self) -> CoreResult<BlockHash> {
        let preimage = (
            self.height,
            self.timestamp.to_bits(),
            self.parent_hash.0,
            self.finder as u64,
        );
        let bytes = bincode::serialize(&preimage)
            .map_err(|e| CoreError::SerializationError(e.to_string()))?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(BlockHash(hasher.finalize().into()))
    }

    /// Validate header against its parent (or as the first block)
    pub fn validate(&self, parent: Option<&BlockHeader>, parent_hash: BlockHash) -> CoreResult<()> {
        if !self.timestamp.is_finite() || self.time_since_last < 0.0 {
            return Err(CoreError::InvalidBlock(format!(
                "block {} has invalid timing (t={}, dt={})",
                self.height, self.timestamp, self.time_since_last
            )));
        }

        let expected_height = parent.map(|p| p.height + 1).unwrap_or(0);
        if self.height != expected_height {
            return Err(CoreError::InvalidBlock(
                format!("Invalid block height: expected {}, got {}",
                    expected_height, self.height)
            ));
        }

        if self.parent_hash != parent_hash {
            return Err(CoreError::InvalidBlock(
                "Parent hash mismatch".into()
            ));
        }

        if let Some(parent) = parent {
            if self.timestamp < parent.timestamp {
                return Err(CoreError::InvalidBlock(
                    "Block timestamp precedes parent".into()
                ));
            }
        }

        Ok(())
    }
}

/// Coinbase entry crediting the block finder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coinbase {
    pub miner: MinerId,
    pub amount: Amount,
}

/// Accepted block. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    /// Cached header digest
    pub hash: BlockHash,
    /// Included transaction identifiers, in drain order
    pub transactions: Vec<TxId>,
    pub coinbase: Coinbase,
    /// Sum of the included transactions' fees
    pub fees: Amount,
    /// Size in bytes
    pub size: u64,
}

impl Block {
    /// Assemble a block from a drained batch and exactly one coinbase entry
    pub fn assemble(
        header: BlockHeader,
        drained: &[Transaction],
        reward: Amount,
    ) -> CoreResult<Self> {
        let mut fees = Amount::zero();
        for tx in drained {
            fees = fees.checked_add(&tx.fee).ok_or_else(|| {
                CoreError::Overflow(format!("fee total of block {}", header.height))
            })?;
        }

        let hash = header.hash()?;
        let coinbase = Coinbase {
            miner: header.finder,
            amount: reward,
        };

        Ok(Self {
            hash,
            transactions: drained.iter().map(|tx| tx.id).collect(),
            coinbase,
            fees,
            size: Self::size_for(drained.len()),
            header,
        })
    }

    /// Block size in bytes for a given transaction count
    pub fn size_for(tx_count: usize) -> u64 {
        HEADER_SIZE + TRANSACTION_SIZE * tx_count as u64
    }

    pub fn height(&self) -> BlockHeight {
        self.header.height
    }

    pub fn tx_count(&self) -> usize {
        self.transactions.len()
    }

    pub fn reward(&self) -> Amount {
        self.coinbase.amount
    }

    pub fn finder(&self) -> MinerId {
        self.header.finder
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(height: BlockHeight, parent_hash: BlockHash, timestamp: SimTime) -> BlockHeader {
        BlockHeader {
            height,
            parent_hash,
            timestamp,
            time_since_last: 600.0,
            finder: 0,
            difficulty: 1.0,
        }
    }

    fn txs(n: u64) -> Vec<Transaction> {
        (0..n)
            .map(|i| Transaction::new(i, 0, 1, Amount::new(100), Amount::new(i + 1), 0.0))
            .collect()
    }

    #[test]
    fn test_block_size_and_fees() {
        let block = Block::assemble(header(0, BlockHash::zero(), 600.0), &txs(4), Amount::new(50)).unwrap();

        assert_eq!(block.size, 1024 + 4 * 256);
        assert_eq!(block.fees, Amount::new(1 + 2 + 3 + 4));
        assert_eq!(block.transactions, vec![0, 1, 2, 3]);
        assert_eq!(block.coinbase.amount, Amount::new(50));
    }

    #[test]
    fn test_empty_block() {
        let block = Block::assemble(header(0, BlockHash::zero(), 600.0), &[], Amount::new(50)).unwrap();
        assert_eq!(block.size, HEADER_SIZE);
        assert_eq!(block.tx_count(), 0);
        assert!(block.fees.is_zero());
    }

    #[test]
    fn test_block_hash() {
        let a = header(0, BlockHash::zero(), 600.0).hash().unwrap();
        let b = header(0, BlockHash::zero(), 600.0).hash().unwrap();
        let c = header(0, BlockHash::zero(), 601.0).hash().unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_hex().len(), 64);
    }

    #[test]
    fn test_header_validation() {
        let first = header(0, BlockHash::zero(), 600.0);
        assert!(first.validate(None, BlockHash::zero()).is_ok());

        let first_hash = first.hash().unwrap();
        let second = header(1, first_hash, 1200.0);
        assert!(second.validate(Some(&first), first_hash).is_ok());

        let skipped = header(2, first_hash, 1200.0);
        assert!(skipped.validate(Some(&first), first_hash).is_err());

        let wrong_parent = header(1, BlockHash::zero(), 1200.0);
        assert!(wrong_parent.validate(Some(&first), first_hash).is_err());

        let backwards = header(1, first_hash, 100.0);
        assert!(backwards.validate(Some(&first), first_hash).is_err());
    }
}
