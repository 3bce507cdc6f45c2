// simulator/src/runtime.rs
use crate::{
    clock::SimClock, report::SnapshotObserver, SimResult, SimulationConfig, SimulatorError,
};
use mining::{DifficultyController, MinerPool, Retarget};
use networking::{Network, PropagationReport};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sim_core::{
    Block, BlockHeader, ChainHistory, CoreError, MinerId, NetworkCounters, Snapshot, Termination,
    TransactionPool,
};
use std::sync::atomic::{AtomicBool, Ordering};
use tokenomics::MintingController;
use workload::{WalletWorkload, WorkloadGenerator};

/// The simulation orchestrator
///
/// Owns every component and serializes all state changes: one call to
/// [`step`](Self::step) accepts exactly one block or fails without
/// touching the chain.
pub struct Simulator {
    config: SimulationConfig,
    clock: SimClock,
    miners: MinerPool,
    difficulty: DifficultyController,
    minting: MintingController,
    network: Network,
    pool: TransactionPool,
    chain: ChainHistory,
    workload: Box<dyn WorkloadGenerator>,
    workload_active: bool,
    workload_rng: StdRng,
    counters: NetworkCounters,
    blocks_target: u64,
    last_retarget: Option<Retarget>,
    last_propagation: Option<PropagationReport>,
    termination: Option<Termination>,
}

impl Simulator {
    pub fn new(config: SimulationConfig) -> SimResult<Self> {
        config.validate()?;

        // Independent streams per component so that, for example, adding
        // wallets does not change the block times.
        let mut seeds = StdRng::seed_from_u64(config.seed);
        let miner_seed: u64 = seeds.gen();
        let network_seed: u64 = seeds.gen();
        let workload_seed: u64 = seeds.gen();

        let miners = MinerPool::new(
            &config.miner_hashrates(),
            config.hashrate_variance,
            config.race_mode,
            miner_seed,
        )?;
        let initial_difficulty = config
            .difficulty
            .unwrap_or_else(|| config.blocktime * miners.total_hashrate());
        let difficulty = DifficultyController::new(config.difficulty_config(), initial_difficulty)?;

        let schedule = config.reward_schedule()?;
        let blocks_target = config.blocks_target();
        let minting = MintingController::new(schedule);

        let network = Network::new(config.nodes, config.neighbors, config.network.clone(), network_seed)?;
        let workload_config = config.workload();
        let workload_active = workload_config.is_active();
        let workload = Box::new(WalletWorkload::new(workload_config)?);

        tracing::info!(
            nodes = config.nodes,
            miners = miners.len(),
            total_hashrate = miners.total_hashrate(),
            difficulty = initial_difficulty,
            blocks_target,
            workload_active,
            seed = config.seed,
            "simulation initialized"
        );

        Ok(Self {
            pool: TransactionPool::new(config.pool.clone()),
            config,
            clock: SimClock::new(),
            miners,
            difficulty,
            minting,
            network,
            chain: ChainHistory::new(),
            workload,
            workload_active,
            workload_rng: StdRng::seed_from_u64(workload_seed),
            counters: NetworkCounters::new(),
            blocks_target,
            last_retarget: None,
            last_propagation: None,
            termination: None,
        })
    }

    /// Accept the next block and return the resulting snapshot
    pub fn step(&mut self) -> SimResult<Snapshot> {
        if let Some(termination) = self.termination {
            return Err(SimulatorError::Finished(termination));
        }

        let found = self.miners.next_block(self.clock.now(), self.difficulty.current())?;
        self.feed_workload(found.time)?;

        let height = self.chain.next_height();
        let issuance = self.minting.preview(height, found.miner)?;
        let header = BlockHeader {
            height,
            parent_hash: self.chain.tip_hash(),
            timestamp: found.time,
            time_since_last: found.delay,
            finder: found.miner,
            difficulty: self.difficulty.current(),
        };
        let batch = self.pool.peek(self.config.blocksize);
        let block = Block::assemble(header, &batch, issuance.amount)?;
        self.clock.check_advance(found.time)?;

        // The chain validates before it mutates. Once it accepts, the rest
        // of the block is applied as a unit.
        self.chain.append(block)?;
        self.clock.advance_to(found.time)?;
        let drained = self.pool.drain(batch.len());
        if drained != batch {
            return Err(SimulatorError::InvariantViolation(format!(
                "pool changed while assembling block {}",
                height
            )));
        }
        self.minting.commit(issuance)?;
        self.miners.record_win(found.miner)?;

        if self.chain.coins_issued() != self.minting.total_minted() {
            return Err(SimulatorError::InvariantViolation(format!(
                "chain issued {} but ledger minted {} at block {}",
                self.chain.coins_issued(),
                self.minting.total_minted(),
                height
            )));
        }

        let origin = found.miner % self.network.len();
        let tip = self.chain.tip().ok_or_else(|| {
            SimulatorError::InvariantViolation("accepted block missing from chain".into())
        })?;
        let report = self.network.broadcast(origin, tip, &mut self.counters)?;

        tracing::debug!(
            height,
            miner = found.miner,
            time = found.time,
            delay = found.delay,
            txs = drained.len(),
            reached = report.reached,
            slowest = report.slowest_arrival,
            "block accepted"
        );
        self.last_propagation = Some(report);

        if let Some(retarget) = self.difficulty.record_block(height, found.delay) {
            self.last_retarget = Some(retarget);
        }

        self.termination = self.check_termination();
        if let Some(termination) = self.termination {
            tracing::info!(
                height = self.chain.len(),
                sim_time = self.clock.now(),
                %termination,
                "simulation finished"
            );
        }

        Ok(self.snapshot())
    }

    /// Create every transaction due by `until` and queue it
    fn feed_workload(&mut self, until: f64) -> SimResult<()> {
        for tx in self.workload.generate_until(until, &mut self.workload_rng)? {
            match self.pool.enqueue(tx) {
                Ok(()) | Err(CoreError::PoolFull(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Block limit first, then duration, then workload exhaustion
    fn check_termination(&self) -> Option<Termination> {
        let mined = self.chain.len() as u64;

        if self.config.blocks.is_some_and(|limit| mined >= limit) {
            return Some(Termination::BlockLimit);
        }
        if self.config.duration_limit().is_some_and(|limit| self.clock.now() >= limit) {
            return Some(Termination::Duration);
        }
        if self.workload_active && mined >= 1 && self.workload.is_exhausted() && self.pool.is_empty() {
            return Some(Termination::WorkloadExhausted);
        }
        None
    }

    /// Add a miner between blocks; it races from the next block on
    pub fn miner_join(&mut self, hashrate: f64) -> SimResult<MinerId> {
        Ok(self.miners.join(hashrate)?)
    }

    /// Withdraw a miner's hashrate between blocks
    ///
    /// Withdrawing the last hashrate makes the next [`step`](Self::step)
    /// fail with a zero-hashrate error instead of waiting forever.
    pub fn miner_leave(&mut self, miner: MinerId) -> SimResult<()> {
        Ok(self.miners.leave(miner)?)
    }

    /// Run until a termination condition fires
    pub fn run(&mut self, observer: &mut dyn SnapshotObserver) -> SimResult<Snapshot> {
        self.run_until(&AtomicBool::new(false), observer)
    }

    /// Run until a termination condition fires or `cancel` is set.
    /// Cancellation is checked between blocks.
    pub fn run_until(
        &mut self,
        cancel: &AtomicBool,
        observer: &mut dyn SnapshotObserver,
    ) -> SimResult<Snapshot> {
        let termination = loop {
            if let Some(termination) = self.termination {
                break termination;
            }
            if cancel.load(Ordering::Relaxed) {
                tracing::info!(height = self.chain.len(), "simulation cancelled");
                self.termination = Some(Termination::Cancelled);
                break Termination::Cancelled;
            }

            let snapshot = self.step()?;
            if snapshot.height % self.config.print == 0 {
                observer.on_block(&snapshot);
            }
        };

        let snapshot = self.snapshot();
        observer.on_finish(&snapshot, termination);
        Ok(snapshot)
    }

    /// Current statistics
    pub fn snapshot(&self) -> Snapshot {
        let height = self.chain.len() as u64;
        let sim_time = self.clock.now();
        let total_transactions = self.chain.total_transactions();
        let average_block_time = self.chain.average_block_time();
        let tps = if sim_time > 0.0 {
            total_transactions as f64 / sim_time
        } else {
            0.0
        };
        let inflation_pct = self.minting.supply_percentage(self.blocks_target);
        let pool_metrics = self.pool.metrics();

        Snapshot {
            height,
            blocks_target: self.blocks_target,
            sim_time,
            average_block_time,
            tps,
            inflation_pct,
            annual_inflation_pct: self.minting.calculate_annual_inflation(self.config.blocktime),
            eta_seconds: self.eta_seconds(height, average_block_time, tps),
            difficulty: self.difficulty.current(),
            total_hashrate: self.miners.total_hashrate(),
            tip_id: self.chain.tip().map(|b| b.height()),
            tip_hash: self.chain.tip().map(|b| b.hash.to_hex()).unwrap_or_default(),
            total_transactions,
            coins_issued: self.chain.coins_issued(),
            total_fees: self.chain.total_fees(),
            pool_size: self.pool.len(),
            peak_pool_size: pool_metrics.peak_size,
            dropped_transactions: pool_metrics.total_dropped,
            network_bytes: self.counters.network_bytes,
            io_requests: self.counters.io_requests,
            propagation_timeouts: self.counters.propagation_timeouts,
            blocks_propagated: self.counters.blocks_propagated,
            average_propagation_time: self.counters.average_propagation_time(),
            blocks_per_miner: self.miners.miners().iter().map(|m| m.blocks_found).collect(),
            termination: self.termination,
        }
    }

    fn eta_seconds(&self, height: u64, average_block_time: f64, tps: f64) -> f64 {
        if self.termination.is_some() {
            return 0.0;
        }

        let outstanding = self.pool.len() as u64 + self.workload.total().saturating_sub(self.workload.emitted());
        if self.workload_active && outstanding > 0 && tps > 0.0 {
            return outstanding as f64 / tps;
        }

        let block_time = if average_block_time > 0.0 {
            average_block_time
        } else {
            self.config.blocktime
        };
        match (self.config.blocks, self.config.duration_limit()) {
            (Some(limit), _) => limit.saturating_sub(height) as f64 * block_time,
            (None, Some(limit)) => (limit - self.clock.now()).max(0.0),
            (None, None) => 0.0,
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn chain(&self) -> &ChainHistory {
        &self.chain
    }

    pub fn pool(&self) -> &TransactionPool {
        &self.pool
    }

    pub fn miners(&self) -> &MinerPool {
        &self.miners
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn minting(&self) -> &MintingController {
        &self.minting
    }

    pub fn difficulty(&self) -> &DifficultyController {
        &self.difficulty
    }

    pub fn counters(&self) -> &NetworkCounters {
        &self.counters
    }

    pub fn last_retarget(&self) -> Option<&Retarget> {
        self.last_retarget.as_ref()
    }

    pub fn last_propagation(&self) -> Option<&PropagationReport> {
        self.last_propagation.as_ref()
    }

    pub fn termination(&self) -> Option<Termination> {
        self.termination
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::NullObserver;
    use mining::MiningError;
    use sim_core::{Amount, Transaction};

    fn small(blocks: u64) -> SimulationConfig {
        SimulationConfig {
            nodes: 5,
            neighbors: 2,
            miners: 3,
            blocks: Some(blocks),
            years: None,
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn test_step_accepts_one_block() {
        let mut sim = Simulator::new(small(10)).unwrap();
        let snapshot = sim.step().unwrap();

        assert_eq!(snapshot.height, 1);
        assert_eq!(snapshot.tip_id, Some(0));
        assert_eq!(snapshot.coins_issued, Amount::from_coins(50.0).unwrap());
        assert!(snapshot.sim_time > 0.0);
        assert!(snapshot.io_requests > 0);
        assert_eq!(sim.network().nodes().iter().filter(|n| n.has_block(0)).count(), sim.last_propagation().unwrap().reached);
    }

    #[test]
    fn test_step_after_finish_fails() {
        let mut sim = Simulator::new(small(2)).unwrap();
        sim.run(&mut NullObserver).unwrap();
        assert!(matches!(sim.step(), Err(SimulatorError::Finished(Termination::BlockLimit))));
        assert_eq!(sim.chain().len(), 2);
    }

    #[test]
    fn test_cancel_before_first_block() {
        let mut sim = Simulator::new(small(10)).unwrap();
        let cancel = AtomicBool::new(true);
        let snapshot = sim.run_until(&cancel, &mut NullObserver).unwrap();

        assert_eq!(snapshot.height, 0);
        assert_eq!(snapshot.termination, Some(Termination::Cancelled));
        assert_eq!(snapshot.tip_hash, "");
    }

    #[test]
    fn test_block_limit_beats_duration() {
        // one block per ~600 s, duration limit far below the first block
        let config = SimulationConfig {
            blocks: Some(1),
            years: Some(1e-9),
            ..small(1)
        };
        let mut sim = Simulator::new(config).unwrap();
        let snapshot = sim.run(&mut NullObserver).unwrap();
        assert_eq!(snapshot.termination, Some(Termination::BlockLimit));
    }

    #[test]
    fn test_duration_limit() {
        let config = SimulationConfig {
            blocks: None,
            years: Some(0.01),
            ..small(1)
        };
        let limit = config.duration_limit().unwrap();
        let mut sim = Simulator::new(config).unwrap();
        let snapshot = sim.run(&mut NullObserver).unwrap();

        assert_eq!(snapshot.termination, Some(Termination::Duration));
        assert!(snapshot.sim_time >= limit);
        let before_last = sim.chain().blocks()[sim.chain().len() - 2].header.timestamp;
        assert!(before_last < limit);
    }

    #[test]
    fn test_retarget_follows_window() {
        let config = SimulationConfig {
            retarget_window: 5,
            ..small(12)
        };
        let mut sim = Simulator::new(config).unwrap();
        let mut retargets = Vec::new();
        while sim.termination().is_none() {
            let before = sim.last_retarget().copied();
            sim.step().unwrap();
            if sim.last_retarget().copied() != before {
                retargets.push(sim.last_retarget().unwrap().height);
            }
        }
        assert_eq!(retargets, vec![4, 9]);
        assert_eq!(sim.difficulty().blocks_in_window(), 2);
    }

    #[test]
    fn test_bounded_pool_records_drops() {
        let mut config = small(1);
        config.wallets = 10;
        config.transactions = 10;
        config.pool.max_size = Some(25);
        let mut sim = Simulator::new(config).unwrap();
        let snapshot = sim.run(&mut NullObserver).unwrap();

        assert_eq!(snapshot.dropped_transactions, 75);
        assert_eq!(snapshot.peak_pool_size, 25);
        assert_eq!(snapshot.total_transactions, 25);
    }

    #[test]
    fn test_large_supply_bounds_still_start() {
        for config in [
            SimulationConfig { halving: 4_000_000_000, ..small(5) },
            SimulationConfig {
                halving: 0,
                blocks: None,
                years: Some(1e6),
                blocktime: 1.0,
                ..small(5)
            },
        ] {
            let mut sim = Simulator::new(config).unwrap();
            let snapshot = sim.step().unwrap();
            assert!(snapshot.inflation_pct > 0.0 && snapshot.inflation_pct < 1e-6);
        }
    }

    #[test]
    fn test_rejected_block_leaves_state() {
        let mut config = small(5);
        config.wallets = 2;
        config.transactions = 2;
        config.interval = 1e9;
        let mut sim = Simulator::new(config.clone()).unwrap();
        sim.step().unwrap();
        assert!(sim.chain().is_confirmed(0));

        // a pool that no longer knows transaction 0 was confirmed
        sim.pool = TransactionPool::new(config.pool.clone());
        sim.pool
            .enqueue(Transaction::new(0, 0, 1, Amount::new(100), Amount::new(1), 0.0))
            .unwrap();

        let now = sim.clock().now();
        let minted = sim.minting().total_minted();
        let err = sim.step().unwrap_err();

        assert!(matches!(err, SimulatorError::Core(CoreError::InvariantViolation(_))));
        assert_eq!(sim.clock().now(), now);
        assert_eq!(sim.chain().len(), 1);
        assert_eq!(sim.minting().total_minted(), minted);
        assert_eq!(sim.pool().len(), 1);
    }

    #[test]
    fn test_miner_churn_between_blocks() {
        let mut sim = Simulator::new(small(50)).unwrap();
        sim.step().unwrap();
        for id in 0..3 {
            sim.miner_leave(id).unwrap();
        }

        let now = sim.clock().now();
        assert!(matches!(sim.step(), Err(SimulatorError::Mining(MiningError::ZeroHashrate))));
        assert_eq!(sim.chain().len(), 1);
        assert_eq!(sim.clock().now(), now);

        let id = sim.miner_join(2000.0).unwrap();
        assert_eq!(id, 3);
        let snapshot = sim.step().unwrap();

        assert_eq!(snapshot.total_hashrate, 2000.0);
        assert_eq!(sim.chain().tip().unwrap().finder(), 3);
        assert_eq!(snapshot.blocks_per_miner.len(), 4);
        assert_eq!(sim.minting().earnings(3), Amount::from_coins(50.0).unwrap());
    }
}
