// networking/src/propagation.rs

//! Event-driven block dissemination
//!
//! Deliveries are processed in arrival-time order. A node forwards a block
//! only after it has stored it, and only the first copy it receives is
//! forwarded. Every delivery, including duplicates and drops, costs one
//! I/O request and the block's size in bytes.

use crate::{p2p::Network, NetworkError, NetworkResult};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sim_core::{Block, NetworkCounters, NodeId, SimTime};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// What happened to one delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryOutcome {
    /// Receiver stored the block and forwarded it
    Stored,
    /// Receiver already had the block
    Duplicate,
    /// Lost in transit
    Dropped,
}

/// One edge traversal, times relative to the block being found
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub from: NodeId,
    pub to: NodeId,
    pub sent_at: SimTime,
    pub arrived_at: SimTime,
    pub outcome: DeliveryOutcome,
    /// Arrival was clamped to the propagation ceiling
    pub timed_out: bool,
}

/// Summary of one broadcast
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropagationReport {
    /// Nodes storing the block afterwards, origin included
    pub reached: usize,
    pub deliveries: u64,
    pub duplicates: u64,
    pub drops: u64,
    pub timeouts: u64,
    /// Latest time any node stored the block
    pub slowest_arrival: SimTime,
    /// Deliveries in processing order
    pub log: Vec<Delivery>,
}

impl PropagationReport {
    /// Time the given node stored the block, if it did
    pub fn stored_at(&self, node: NodeId) -> Option<SimTime> {
        self.log
            .iter()
            .find(|d| d.to == node && d.outcome == DeliveryOutcome::Stored)
            .map(|d| d.arrived_at)
    }
}

#[derive(Debug, Clone, Copy)]
struct Event {
    arrival: SimTime,
    /// Scheduling order, breaks arrival ties
    seq: u64,
    from: NodeId,
    to: NodeId,
    sent_at: SimTime,
    timed_out: bool,
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        self.arrival.total_cmp(&other.arrival).then(self.seq.cmp(&other.seq))
    }
}

struct Scheduler {
    queue: BinaryHeap<Reverse<Event>>,
    seq: u64,
}

impl Network {
    /// Per-hop delay: `max(processing, transmission) + latency`
    pub fn hop_delay(&mut self, from: NodeId, to: NodeId, size: u64) -> f64 {
        let processing = self
            .rng
            .gen_range(self.config.processing_delay_min..=self.config.processing_delay_max);
        processing.max(self.transmission_time(from, to, size)) + self.link_latency(from, to)
    }

    /// Disseminate `block` starting at `origin`
    ///
    /// The origin stores the block at time 0. Network-wide counters are
    /// updated in `counters`; per-node counters live on the nodes.
    pub fn broadcast(
        &mut self,
        origin: NodeId,
        block: &Block,
        counters: &mut NetworkCounters,
    ) -> NetworkResult<PropagationReport> {
        if origin >= self.nodes.len() {
            return Err(NetworkError::UnknownNode(origin));
        }

        let height = block.height();
        let size = block.size;
        let mut report = PropagationReport::default();
        let mut scheduler = Scheduler {
            queue: BinaryHeap::new(),
            seq: 0,
        };

        if !self.nodes[origin].store(height) {
            return Err(NetworkError::PeerError(format!(
                "node {} already stores block {}",
                origin, height
            )));
        }
        report.reached = 1;
        self.forward(origin, None, 0.0, size, &mut scheduler);

        while let Some(Reverse(event)) = scheduler.queue.pop() {
            counters.record_delivery(size);
            self.nodes[event.to].record_receive(size);
            report.deliveries += 1;

            if event.timed_out {
                counters.record_timeout();
                report.timeouts += 1;
            }

            let loss = self.loss_probability(event.from, event.to, size);
            let outcome = if self.rng.gen_bool(loss) {
                report.drops += 1;
                DeliveryOutcome::Dropped
            } else if !self.nodes[event.to].store(height) {
                report.duplicates += 1;
                DeliveryOutcome::Duplicate
            } else {
                report.reached += 1;
                report.slowest_arrival = report.slowest_arrival.max(event.arrival);
                DeliveryOutcome::Stored
            };

            report.log.push(Delivery {
                from: event.from,
                to: event.to,
                sent_at: event.sent_at,
                arrived_at: event.arrival,
                outcome,
                timed_out: event.timed_out,
            });

            if outcome == DeliveryOutcome::Stored {
                self.forward(event.to, Some(event.from), event.arrival, size, &mut scheduler);
            }
        }

        counters.record_propagation(report.slowest_arrival);

        if report.timeouts > 0 {
            tracing::warn!(
                block = height,
                timeouts = report.timeouts,
                ceiling = self.config.max_propagation_time,
                "block propagation hit the time ceiling"
            );
        }
        if report.reached < self.nodes.len() {
            tracing::debug!(
                block = height,
                reached = report.reached,
                nodes = self.nodes.len(),
                "block did not reach every node"
            );
        }

        Ok(report)
    }

    /// Schedule deliveries from `node` to every neighbor except `sender`
    fn forward(
        &mut self,
        node: NodeId,
        sender: Option<NodeId>,
        now: SimTime,
        size: u64,
        scheduler: &mut Scheduler,
    ) {
        let targets: Vec<NodeId> = self.nodes[node]
            .neighbors()
            .filter(|&peer| Some(peer) != sender)
            .collect();

        for to in targets {
            let mut arrival = now + self.hop_delay(node, to, size);
            let timed_out = arrival > self.config.max_propagation_time;
            if timed_out {
                arrival = self.config.max_propagation_time;
            }

            self.nodes[node].record_send(size);
            scheduler.queue.push(Reverse(Event {
                arrival,
                seq: scheduler.seq,
                from: node,
                to,
                sent_at: now,
                timed_out,
            }));
            scheduler.seq += 1;
        }
    }
}
