// tokenomics/src/rewards.rs

use serde::{Deserialize, Serialize};
use sim_core::{Amount, BlockHeight};

/// Halving count past which the reward is exactly zero
pub const MAX_HALVINGS: u64 = 35;

/// Reward schedule: `base >> floor(height / interval)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardSchedule {
    /// Reward of the first block
    pub base: Amount,
    /// Blocks between halvings. `None` keeps the reward constant.
    pub halving_interval: Option<u64>,
}

impl RewardSchedule {
    /// Build a schedule. An interval of 0 disables halving.
    pub fn new(base: Amount, halving_interval: u64) -> Self {
        Self {
            base,
            halving_interval: (halving_interval > 0).then_some(halving_interval),
        }
    }

    /// Number of halvings applied at `height`
    pub fn halvings_at(&self, height: BlockHeight) -> u64 {
        match self.halving_interval {
            Some(interval) => height / interval,
            None => 0,
        }
    }

    /// Reward credited to the finder of the block at `height`
    pub fn reward_at(&self, height: BlockHeight) -> Amount {
        let halvings = self.halvings_at(height);
        if halvings > MAX_HALVINGS {
            return Amount::zero();
        }
        self.base.halved(halvings as u32)
    }

    /// Whether `height` is the first block of a new halving era
    pub fn is_halving_height(&self, height: BlockHeight) -> bool {
        match self.halving_interval {
            Some(interval) => height > 0 && height % interval == 0,
            None => false,
        }
    }

    /// Upper bound on total issuance, in base units
    ///
    /// With halving this is the full geometric supply, independent of how
    /// long the run lasts. Without halving the supply is unbounded, so the
    /// bound is the issuance over `blocks_target` blocks. Computed in `u128`
    /// so any schedule the config accepts has a bound.
    pub fn theoretical_max(&self, blocks_target: u64) -> u128 {
        match self.halving_interval {
            Some(interval) => (0..=MAX_HALVINGS)
                .map(|era| self.base.halved(era as u32).units() as u128 * interval as u128)
                .sum(),
            None => self.base.units() as u128 * blocks_target as u128,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn btc() -> RewardSchedule {
        RewardSchedule::new(Amount::from_coins(50.0).unwrap(), 210_000)
    }

    #[test]
    fn test_halving_boundaries() {
        let schedule = btc();
        assert_eq!(schedule.reward_at(0), Amount::from_coins(50.0).unwrap());
        assert_eq!(schedule.reward_at(209_999), Amount::from_coins(50.0).unwrap());
        assert_eq!(schedule.reward_at(210_000), Amount::from_coins(25.0).unwrap());
        assert_eq!(schedule.reward_at(420_000), Amount::from_coins(12.5).unwrap());
        assert!(schedule.is_halving_height(210_000));
        assert!(!schedule.is_halving_height(0));
    }

    #[test]
    fn test_reward_zero_past_max_halvings() {
        let schedule = RewardSchedule::new(Amount::new(u64::MAX), 1);
        assert_eq!(schedule.reward_at(MAX_HALVINGS), Amount::new(u64::MAX >> MAX_HALVINGS));
        assert_eq!(schedule.reward_at(MAX_HALVINGS + 1), Amount::zero());
        assert_eq!(schedule.reward_at(10_000), Amount::zero());
    }

    #[test]
    fn test_disabled_halving_is_constant() {
        let schedule = RewardSchedule::new(Amount::new(1_000), 0);
        assert_eq!(schedule.halving_interval, None);
        assert_eq!(schedule.reward_at(0), schedule.reward_at(u64::MAX));
    }

    #[test]
    fn test_theoretical_max() {
        // 50 BTC schedule converges just under 21M coins
        let max = btc().theoretical_max(0) as f64 / 1e8;
        assert!(max > 20_999_000.0 && max < 21_000_000.0);

        let flat = RewardSchedule::new(Amount::new(10), 0);
        assert_eq!(flat.theoretical_max(52_560), 525_600);
    }

    #[test]
    fn test_theoretical_max_beyond_u64() {
        let base = Amount::from_coins(50.0).unwrap();

        let long_eras = RewardSchedule::new(base, 4_000_000_000);
        let max = long_eras.theoretical_max(5);
        assert!(max > u64::MAX as u128);
        assert_eq!(max % 4_000_000_000, 0);

        let flat = RewardSchedule::new(base, 0);
        let blocks = 31_536_000_000_000u64;
        assert_eq!(flat.theoretical_max(blocks), base.units() as u128 * blocks as u128);
    }

    proptest! {
        #[test]
        fn reward_matches_halving_formula(base in 0u64..=u64::MAX, interval in 1u64..1_000_000, height in 0u64..50_000_000) {
            let schedule = RewardSchedule::new(Amount::new(base), interval);
            let halvings = height / interval;
            let expected = if halvings > MAX_HALVINGS { 0 } else { base >> halvings };
            prop_assert_eq!(schedule.reward_at(height).units(), expected);
        }

        #[test]
        fn reward_never_increases(interval in 1u64..10_000, a in 0u64..1_000_000, b in 0u64..1_000_000) {
            let schedule = RewardSchedule::new(Amount::from_coins(50.0).unwrap(), interval);
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(schedule.reward_at(hi) <= schedule.reward_at(lo));
        }
    }
}
