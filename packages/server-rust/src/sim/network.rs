//! A virtual network: messages don't travel until [`VirtualNetwork::tick`]
//! says so, loss and latency are drawn from a [`SeededRng`] rather than the
//! OS, and partitions are just a set membership check.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use parking_lot::Mutex;

use super::clock::VirtualClock;
use super::rng::SeededRng;

/// Latency range and loss probability for a [`VirtualNetwork`].
#[derive(Debug, Clone, Copy)]
pub struct NetworkConfig {
    pub latency_ms: (u64, u64),
    /// Probability in `[0, 1]` that a given `send` is dropped outright.
    pub packet_loss_rate: f64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self { latency_ms: (0, 0), packet_loss_rate: 0.0 }
    }
}

/// What happened to a message passed to [`VirtualNetwork::send`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Enqueued for delivery at a future tick.
    Scheduled,
    /// Dropped by the loss-rate roll.
    Lost,
    /// Dropped because `from`/`to` are partitioned from each other.
    Partitioned,
}

struct Envelope<P> {
    scheduled_time: u64,
    seq: u64,
    from: String,
    to: String,
    payload: P,
}

impl<P> PartialEq for Envelope<P> {
    fn eq(&self, other: &Self) -> bool {
        self.scheduled_time == other.scheduled_time && self.seq == other.seq
    }
}
impl<P> Eq for Envelope<P> {}

impl<P> PartialOrd for Envelope<P> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<P> Ord for Envelope<P> {
    /// Reversed so `BinaryHeap` (a max-heap) pops the earliest-scheduled,
    /// lowest-sequence message first -- a min-heap by `(scheduled_time, seq)`.
    fn cmp(&self, other: &Self) -> Ordering {
        (other.scheduled_time, other.seq).cmp(&(self.scheduled_time, self.seq))
    }
}

/// A message delivered by [`VirtualNetwork::tick`].
#[derive(Debug, Clone)]
pub struct DeliveredMessage<P> {
    pub from: String,
    pub to: String,
    pub payload: P,
    pub scheduled_time: u64,
}

/// Pending-message queue plus partition set, keyed by scheduled delivery time.
pub struct VirtualNetwork<P> {
    config: NetworkConfig,
    rng: Mutex<SeededRng>,
    partitions: Mutex<HashSet<(String, String)>>,
    pending: Mutex<BinaryHeap<Envelope<P>>>,
    next_seq: Mutex<u64>,
}

impl<P> VirtualNetwork<P> {
    #[must_use]
    pub fn new(config: NetworkConfig, seed: u32) -> Self {
        Self {
            config,
            rng: Mutex::new(SeededRng::new(seed)),
            partitions: Mutex::new(HashSet::new()),
            pending: Mutex::new(BinaryHeap::new()),
            next_seq: Mutex::new(0),
        }
    }

    fn partition_key(a: &str, b: &str) -> (String, String) {
        if a <= b { (a.to_string(), b.to_string()) } else { (b.to_string(), a.to_string()) }
    }

    /// Cuts `a` and `b` off from each other in both directions.
    pub fn partition(&self, a: &str, b: &str) {
        self.partitions.lock().insert(Self::partition_key(a, b));
    }

    /// Heals a previously introduced partition between `a` and `b`.
    pub fn heal(&self, a: &str, b: &str) {
        self.partitions.lock().remove(&Self::partition_key(a, b));
    }

    fn is_partitioned(&self, a: &str, b: &str) -> bool {
        self.partitions.lock().contains(&Self::partition_key(a, b))
    }

    /// Attempts to send `payload` from `from` to `to`. Consults the loss
    /// rate and the partition set before scheduling delivery at
    /// `clock.now() + latency`, with latency drawn uniformly from
    /// `latency_ms`.
    pub fn send(&self, clock: &VirtualClock, from: &str, to: &str, payload: P) -> SendOutcome {
        if self.is_partitioned(from, to) {
            return SendOutcome::Partitioned;
        }
        let (dropped, latency) = {
            let mut rng = self.rng.lock();
            let dropped = rng.random_bool(self.config.packet_loss_rate);
            let latency = rng.random_int(self.config.latency_ms.0 as i64, self.config.latency_ms.1 as i64);
            (dropped, latency)
        };
        if dropped {
            return SendOutcome::Lost;
        }
        let scheduled_time = clock.now() + latency.max(0) as u64;
        let seq = {
            let mut next_seq = self.next_seq.lock();
            let seq = *next_seq;
            *next_seq += 1;
            seq
        };
        self.pending.lock().push(Envelope {
            scheduled_time,
            seq,
            from: from.to_string(),
            to: to.to_string(),
            payload,
        });
        SendOutcome::Scheduled
    }

    /// Delivers every pending message whose `scheduled_time <= clock.now()`,
    /// in `(scheduled_time, seq)` order.
    pub fn tick(&self, clock: &VirtualClock) -> Vec<DeliveredMessage<P>> {
        let now = clock.now();
        let mut pending = self.pending.lock();
        let mut delivered = Vec::new();
        while let Some(envelope) = pending.peek() {
            if envelope.scheduled_time > now {
                break;
            }
            let envelope = pending.pop().expect("peeked Some");
            delivered.push(DeliveredMessage {
                from: envelope.from,
                to: envelope.to,
                payload: envelope.payload,
                scheduled_time: envelope.scheduled_time,
            });
        }
        delivered
    }

    /// Number of messages still in flight.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivers_in_scheduled_order_once_clock_catches_up() {
        let clock = VirtualClock::new();
        let net: VirtualNetwork<&'static str> =
            VirtualNetwork::new(NetworkConfig { latency_ms: (10, 10), packet_loss_rate: 0.0 }, 1);
        net.send(&clock, "a", "b", "first");
        clock.advance(5);
        net.send(&clock, "a", "b", "second");

        assert!(net.tick(&clock).is_empty());
        clock.advance(10);
        let delivered = net.tick(&clock);
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].payload, "first");

        clock.advance(10);
        let delivered = net.tick(&clock);
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].payload, "second");
    }

    #[test]
    fn partitioned_nodes_cannot_exchange_messages() {
        let clock = VirtualClock::new();
        let net: VirtualNetwork<&'static str> = VirtualNetwork::new(NetworkConfig::default(), 1);
        net.partition("a", "b");
        assert_eq!(net.send(&clock, "a", "b", "x"), SendOutcome::Partitioned);
        assert_eq!(net.send(&clock, "b", "a", "y"), SendOutcome::Partitioned);
        net.heal("a", "b");
        assert_eq!(net.send(&clock, "a", "b", "x"), SendOutcome::Scheduled);
    }

    #[test]
    fn same_seed_and_config_yield_identical_delivered_order() {
        let run = || {
            let clock = VirtualClock::new();
            let net: VirtualNetwork<u32> = VirtualNetwork::new(
                NetworkConfig { latency_ms: (10, 50), packet_loss_rate: 0.2 },
                42,
            );
            let mut delivered_counts = Vec::new();
            for i in 0..20 {
                net.send(&clock, "a", "b", i);
            }
            for _ in 0..200 {
                clock.advance(1);
                delivered_counts.push(net.tick(&clock).len());
            }
            delivered_counts
        };
        assert_eq!(run(), run());
    }
}
