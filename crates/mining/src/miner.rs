// mining/src/miner.rs

use crate::{MiningError, MiningResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use sim_core::{MinerId, SimTime};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// How the next block's time and finder are drawn
///
/// Both modes give the same distribution for the time to the next block:
/// the minimum of independent exponentials with rates `h_i / D` is itself
/// exponential with rate `H / D`, and miner `i` wins with probability `h_i / H`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaceMode {
    /// One exponential draw per miner; the earliest wins
    #[default]
    PerMiner,
    /// One network-wide draw, finder picked by hashrate share
    NetworkWide,
}

/// A hash-power contributor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Miner {
    pub id: MinerId,
    /// Hashes per second
    pub hashrate: f64,
    pub blocks_found: u64,
    /// Cleared when the miner leaves; its hashrate no longer counts
    pub active: bool,
}

impl Miner {
    pub fn new(id: MinerId, hashrate: f64) -> Self {
        Self {
            id,
            hashrate,
            blocks_found: 0,
            active: true,
        }
    }

    /// Hashrate taking part in the race
    pub fn active_hashrate(&self) -> f64 {
        if self.active {
            self.hashrate
        } else {
            0.0
        }
    }

    /// Expected seconds for this miner alone to find a block
    pub fn expected_time(&self, difficulty: f64) -> f64 {
        difficulty / self.hashrate
    }
}

/// Winning candidate of a mining race
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockFound {
    pub miner: MinerId,
    /// Absolute simulated time the block is found
    pub time: SimTime,
    /// Time elapsed since the race started
    pub delay: f64,
}

/// Scheduled per-miner candidate; ordered by time, ties broken by miner id
#[derive(Debug, Clone, Copy)]
struct Candidate {
    time: SimTime,
    miner: MinerId,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time.total_cmp(&other.time).then(self.miner.cmp(&other.miner))
    }
}

/// The set of miners racing for each block
pub struct MinerPool {
    miners: Vec<Miner>,
    mode: RaceMode,
    rng: StdRng,
    /// Pending per-miner candidates for the current race
    queue: BinaryHeap<Reverse<Candidate>>,
}

impl MinerPool {
    /// Create a pool from nominal hashrates
    ///
    /// Each miner's effective hashrate is its nominal value scaled by a
    /// factor drawn uniformly from `[1 - variance, 1 + variance]`.
    pub fn new(hashrates: &[f64], variance: f64, mode: RaceMode, seed: u64) -> MiningResult<Self> {
        if !(0.0..1.0).contains(&variance) {
            return Err(MiningError::InvalidConfiguration(format!(
                "hashrate variance must be in [0, 1), got {}",
                variance
            )));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut miners = Vec::with_capacity(hashrates.len());

        for (id, &nominal) in hashrates.iter().enumerate() {
            if !nominal.is_finite() || nominal < 0.0 {
                return Err(MiningError::InvalidHashrate { miner: id, value: nominal });
            }
            let factor = if variance > 0.0 {
                rng.gen_range(1.0 - variance..=1.0 + variance)
            } else {
                1.0
            };
            let miner = Miner::new(id, nominal * factor);
            tracing::debug!(miner = id, hashrate = miner.hashrate, "created miner");
            miners.push(miner);
        }

        let pool = Self {
            miners,
            mode,
            rng,
            queue: BinaryHeap::new(),
        };

        if !(pool.total_hashrate() > 0.0) {
            return Err(MiningError::ZeroHashrate);
        }

        tracing::info!(
            miners = pool.miners.len(),
            total_hashrate = pool.total_hashrate(),
            ?mode,
            "miner pool ready"
        );

        Ok(pool)
    }

    /// Sum of the hashrates of active miners
    pub fn total_hashrate(&self) -> f64 {
        self.miners.iter().map(Miner::active_hashrate).sum()
    }

    /// Add a miner with the given effective hashrate and return its id
    ///
    /// Takes part from the next race on.
    pub fn join(&mut self, hashrate: f64) -> MiningResult<MinerId> {
        let id = self.miners.len();
        if !hashrate.is_finite() || hashrate < 0.0 {
            return Err(MiningError::InvalidHashrate { miner: id, value: hashrate });
        }
        self.miners.push(Miner::new(id, hashrate));
        tracing::info!(miner = id, hashrate, total_hashrate = self.total_hashrate(), "miner joined");
        Ok(id)
    }

    /// Withdraw a miner's hashrate from future races
    ///
    /// Its id and block count are kept. If no hashrate remains, the next
    /// race fails with [`MiningError::ZeroHashrate`].
    pub fn leave(&mut self, miner: MinerId) -> MiningResult<()> {
        let entry = self.miners.get_mut(miner).ok_or(MiningError::UnknownMiner(miner))?;
        if !entry.active {
            return Err(MiningError::InactiveMiner(miner));
        }
        entry.active = false;

        let total = self.total_hashrate();
        if total > 0.0 {
            tracing::info!(miner, total_hashrate = total, "miner left");
        } else {
            tracing::warn!(miner, "miner left, no hashrate remains");
        }
        Ok(())
    }

    /// Expected network-wide time to the next block
    pub fn expected_block_time(&self, difficulty: f64) -> f64 {
        difficulty / self.total_hashrate()
    }

    /// Draw the next block-found event starting the race at `now`
    ///
    /// Every race starts from scratch: the previous tip is gone, so
    /// stale candidates are discarded. Memorylessness makes this exact.
    pub fn next_block(&mut self, now: SimTime, difficulty: f64) -> MiningResult<BlockFound> {
        if !difficulty.is_finite() || difficulty <= 0.0 {
            return Err(MiningError::InvalidDifficulty(difficulty));
        }

        let total = self.total_hashrate();
        if !(total > 0.0) {
            return Err(MiningError::ZeroHashrate);
        }

        let found = match self.mode {
            RaceMode::PerMiner => self.race_per_miner(now, difficulty)?,
            RaceMode::NetworkWide => self.race_network_wide(now, difficulty, total)?,
        };

        if !found.time.is_finite() {
            return Err(MiningError::NoFiniteEvent { difficulty, hashrate: total });
        }

        Ok(found)
    }

    fn race_per_miner(&mut self, now: SimTime, difficulty: f64) -> MiningResult<BlockFound> {
        self.queue.clear();

        for i in 0..self.miners.len() {
            let hashrate = self.miners[i].active_hashrate();
            if hashrate <= 0.0 {
                continue;
            }
            let delay = exponential(&mut self.rng, hashrate / difficulty);
            self.queue.push(Reverse(Candidate { time: now + delay, miner: i }));
        }

        let Reverse(winner) = self.queue.pop().ok_or(MiningError::ZeroHashrate)?;
        self.queue.clear();

        Ok(BlockFound {
            miner: winner.miner,
            time: winner.time,
            delay: winner.time - now,
        })
    }

    fn race_network_wide(&mut self, now: SimTime, difficulty: f64, total: f64) -> MiningResult<BlockFound> {
        let delay = exponential(&mut self.rng, total / difficulty);

        // Weighted selection by hashrate share
        let mut selection = self.rng.gen_range(0.0..total);
        let mut winner = None;
        for miner in &self.miners {
            let hashrate = miner.active_hashrate();
            if hashrate <= 0.0 {
                continue;
            }
            winner = Some(miner.id);
            if selection < hashrate {
                break;
            }
            selection -= hashrate;
        }
        let miner = winner.ok_or(MiningError::ZeroHashrate)?;

        Ok(BlockFound {
            miner,
            time: now + delay,
            delay,
        })
    }

    /// Count a won race for `miner`. Rewards live in the issuance ledger.
    pub fn record_win(&mut self, miner: MinerId) -> MiningResult<()> {
        let entry = self.miners.get_mut(miner).ok_or(MiningError::UnknownMiner(miner))?;
        entry.blocks_found += 1;
        Ok(())
    }

    pub fn miners(&self) -> &[Miner] {
        &self.miners
    }

    pub fn get(&self, miner: MinerId) -> Option<&Miner> {
        self.miners.get(miner)
    }

    pub fn len(&self) -> usize {
        self.miners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.miners.is_empty()
    }

    pub fn mode(&self) -> RaceMode {
        self.mode
    }
}

/// Inverse-CDF draw from an exponential distribution with the given rate
fn exponential(rng: &mut StdRng, rate: f64) -> f64 {
    let u: f64 = rng.gen();
    -(1.0 - u).ln() / rate
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mean_delay(pool: &mut MinerPool, difficulty: f64, draws: usize) -> f64 {
        let mut sum = 0.0;
        for _ in 0..draws {
            sum += pool.next_block(0.0, difficulty).unwrap().delay;
        }
        sum / draws as f64
    }

    #[test]
    fn test_zero_hashrate_rejected() {
        let result = MinerPool::new(&[0.0, 0.0], 0.0, RaceMode::PerMiner, 1);
        assert!(matches!(result, Err(MiningError::ZeroHashrate)));

        let result = MinerPool::new(&[], 0.0, RaceMode::PerMiner, 1);
        assert!(matches!(result, Err(MiningError::ZeroHashrate)));
    }

    #[test]
    fn test_negative_hashrate_rejected() {
        let result = MinerPool::new(&[100.0, -1.0], 0.0, RaceMode::PerMiner, 1);
        assert!(matches!(result, Err(MiningError::InvalidHashrate { miner: 1, .. })));
    }

    #[test]
    fn test_invalid_difficulty() {
        let mut pool = MinerPool::new(&[100.0], 0.0, RaceMode::PerMiner, 1).unwrap();
        assert!(pool.next_block(0.0, 0.0).is_err());
        assert!(pool.next_block(0.0, -5.0).is_err());
        assert!(pool.next_block(0.0, f64::NAN).is_err());
    }

    #[test]
    fn test_variance_bounds() {
        let pool = MinerPool::new(&[1000.0; 50], 0.1, RaceMode::PerMiner, 7).unwrap();
        for miner in pool.miners() {
            assert!(miner.hashrate >= 900.0 && miner.hashrate <= 1100.0);
        }
    }

    #[test]
    fn test_mean_block_time_matches_difficulty() {
        // 5 miners x 1000 H/s, difficulty for a 600 s target
        let difficulty = 600.0 * 5000.0;
        for mode in [RaceMode::PerMiner, RaceMode::NetworkWide] {
            let mut pool = MinerPool::new(&[1000.0; 5], 0.0, mode, 42).unwrap();
            let mean = mean_delay(&mut pool, difficulty, 20_000);
            assert!((mean - 600.0).abs() < 30.0, "{:?} mean {}", mode, mean);
        }
    }

    #[test]
    fn test_finder_share_follows_hashrate() {
        let mut pool = MinerPool::new(&[3000.0, 1000.0], 0.0, RaceMode::PerMiner, 9).unwrap();
        let mut wins = [0u32; 2];
        for _ in 0..20_000 {
            let found = pool.next_block(0.0, 1_000_000.0).unwrap();
            wins[found.miner] += 1;
        }
        let share = wins[0] as f64 / 20_000.0;
        assert!((share - 0.75).abs() < 0.02, "share {}", share);
    }

    #[test]
    fn test_zero_hashrate_miner_never_wins() {
        let mut pool = MinerPool::new(&[0.0, 500.0], 0.0, RaceMode::NetworkWide, 3).unwrap();
        for _ in 0..1000 {
            assert_eq!(pool.next_block(0.0, 1000.0).unwrap().miner, 1);
        }
    }

    #[test]
    fn test_seeded_draws_repeat() {
        let mut a = MinerPool::new(&[1000.0; 3], 0.1, RaceMode::PerMiner, 5).unwrap();
        let mut b = MinerPool::new(&[1000.0; 3], 0.1, RaceMode::PerMiner, 5).unwrap();
        for _ in 0..100 {
            assert_eq!(a.next_block(10.0, 5000.0).unwrap(), b.next_block(10.0, 5000.0).unwrap());
        }
    }

    #[test]
    fn test_record_win() {
        let mut pool = MinerPool::new(&[1.0, 1.0], 0.0, RaceMode::PerMiner, 0).unwrap();
        pool.record_win(1).unwrap();
        pool.record_win(1).unwrap();

        assert_eq!(pool.get(1).unwrap().blocks_found, 2);
        assert_eq!(pool.get(0).unwrap().blocks_found, 0);
        assert!(matches!(pool.record_win(5), Err(MiningError::UnknownMiner(5))));
    }

    fn win_share(pool: &mut MinerPool, miner: MinerId, draws: u32) -> f64 {
        let mut wins = 0;
        for _ in 0..draws {
            if pool.next_block(0.0, 1_000_000.0).unwrap().miner == miner {
                wins += 1;
            }
        }
        wins as f64 / draws as f64
    }

    #[test]
    fn test_join_shifts_share() {
        for mode in [RaceMode::PerMiner, RaceMode::NetworkWide] {
            let mut pool = MinerPool::new(&[1000.0], 0.0, mode, 11).unwrap();
            assert_eq!(win_share(&mut pool, 0, 1_000), 1.0);

            let id = pool.join(3000.0).unwrap();
            assert_eq!(id, 1);
            assert_eq!(pool.total_hashrate(), 4000.0);
            let share = win_share(&mut pool, 1, 20_000);
            assert!((share - 0.75).abs() < 0.02, "{:?} share {}", mode, share);
        }
    }

    #[test]
    fn test_leave_removes_hashrate() {
        for mode in [RaceMode::PerMiner, RaceMode::NetworkWide] {
            let mut pool = MinerPool::new(&[1000.0, 1000.0, 2000.0], 0.0, mode, 12).unwrap();
            pool.leave(2).unwrap();

            assert_eq!(pool.total_hashrate(), 2000.0);
            assert!(!pool.get(2).unwrap().active);
            assert_eq!(win_share(&mut pool, 2, 2_000), 0.0);
            assert!(matches!(pool.leave(2), Err(MiningError::InactiveMiner(2))));
            assert!(matches!(pool.leave(9), Err(MiningError::UnknownMiner(9))));
        }
    }

    #[test]
    fn test_last_miner_leaving_stops_the_race() {
        let mut pool = MinerPool::new(&[500.0], 0.0, RaceMode::PerMiner, 13).unwrap();
        pool.next_block(0.0, 1000.0).unwrap();
        pool.leave(0).unwrap();

        assert_eq!(pool.total_hashrate(), 0.0);
        assert!(matches!(pool.next_block(0.0, 1000.0), Err(MiningError::ZeroHashrate)));

        pool.join(250.0).unwrap();
        assert_eq!(pool.next_block(0.0, 1000.0).unwrap().miner, 1);
    }

    #[test]
    fn test_join_rejects_bad_hashrate() {
        let mut pool = MinerPool::new(&[1.0], 0.0, RaceMode::PerMiner, 0).unwrap();
        assert!(matches!(pool.join(-1.0), Err(MiningError::InvalidHashrate { miner: 1, .. })));
        assert!(pool.join(f64::NAN).is_err());
        assert_eq!(pool.len(), 1);
    }
}
