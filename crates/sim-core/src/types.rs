// sim-core/src/types.rs

use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

/// Block height, zero-based. Doubles as the block identifier.
pub type BlockHeight = u64;

/// Transaction identifier
pub type TxId = u64;

/// Miner index
pub type MinerId = usize;

/// Peer node index
pub type NodeId = usize;

/// Wallet index
pub type WalletId = usize;

/// Simulated seconds since epoch 0
pub type SimTime = f64;

/// Base units per coin
pub const UNITS_PER_COIN: u64 = 100_000_000;

/// Seconds in a simulated year
pub const SECONDS_PER_YEAR: f64 = 365.0 * 24.0 * 3600.0;

/// Coin amount in integer base units
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Amount(u64);

impl Amount {
    pub const fn new(units: u64) -> Self {
        Self(units)
    }

    pub const fn zero() -> Self {
        Self(0)
    }

    /// Convert a coin quantity to base units, rounding to the nearest unit.
    /// Returns `None` for negative, NaN or out-of-range input.
    pub fn from_coins(coins: f64) -> Option<Self> {
        if !coins.is_finite() || coins < 0.0 {
            return None;
        }
        let units = (coins * UNITS_PER_COIN as f64).round();
        if units > u64::MAX as f64 {
            return None;
        }
        Some(Self(units as u64))
    }

    pub fn units(&self) -> u64 {
        self.0
    }

    pub fn to_coins(&self) -> f64 {
        self.0 as f64 / UNITS_PER_COIN as f64
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(&self, other: &Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(&self, other: &Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    /// Divide by `2^halvings`, flooring. Shifts past the width of the
    /// integer yield zero.
    pub fn halved(&self, halvings: u32) -> Amount {
        Amount(self.0.checked_shr(halvings).unwrap_or(0))
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, other: Amount) -> Amount {
        Amount(self.0 + other.0)
    }
}

impl Sub for Amount {
    type Output = Amount;

    fn sub(self, other: Amount) -> Amount {
        Amount(self.0 - other.0)
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:08}", self.0 / UNITS_PER_COIN, self.0 % UNITS_PER_COIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_arithmetic() {
        let a = Amount::new(100);
        let b = Amount::new(50);

        let sum = a.checked_add(&b).unwrap();
        assert_eq!(sum, Amount::new(150));

        let diff = sum.checked_sub(&b).unwrap();
        assert_eq!(diff, Amount::new(100));
    }

    #[test]
    fn test_amount_underflow() {
        let a = Amount::new(50);
        let b = Amount::new(100);

        assert!(a.checked_sub(&b).is_none());
    }

    #[test]
    fn test_from_coins() {
        assert_eq!(Amount::from_coins(50.0), Some(Amount::new(5_000_000_000)));
        assert_eq!(Amount::from_coins(51.8457072), Some(Amount::new(5_184_570_720)));
        assert_eq!(Amount::from_coins(-1.0), None);
        assert_eq!(Amount::from_coins(f64::NAN), None);
    }

    #[test]
    fn test_halving_shift() {
        let reward = Amount::from_coins(50.0).unwrap();
        assert_eq!(reward.halved(1), Amount::from_coins(25.0).unwrap());
        assert_eq!(reward.halved(64), Amount::zero());
        assert_eq!(reward.halved(200), Amount::zero());
    }

    #[test]
    fn test_display() {
        assert_eq!(Amount::from_coins(12.5).unwrap().to_string(), "12.50000000");
    }
}
