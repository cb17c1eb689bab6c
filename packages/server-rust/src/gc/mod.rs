//! Distributed tombstone garbage collection.
//!
//! Every node periodically reports the oldest HLC timestamp any of its
//! connected clients still depends on (`HLC_REPORT`, see
//! `cluster::messages::HlcReportPayload`). Each node aggregates its peers'
//! reports into a cluster-wide *safe HLC* -- the minimum across all live
//! reports -- and derives a GC cutoff by subtracting `gc_age_ms`. Tombstones
//! timestamped at or before the cutoff are pruned from every loaded map.
//!
//! A peer that stops reporting is not allowed to pin the watermark forever:
//! once its last report is older than `stale_report_ttl_ms` it drops out of
//! the aggregation, same as if it had left the cluster.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use topgun_core::Timestamp;

use crate::cluster::messages::HlcReportPayload;
use crate::service::ServerConfig;
use crate::traits::MapProvider;

/// A peer's most recently received report, with local receipt time so
/// staleness can be judged against wall-clock time rather than the report's
/// own (possibly stale) contents.
#[derive(Debug, Clone)]
struct PeerReport {
    min_client_hlc: Timestamp,
    received_at_ms: u64,
}

/// Aggregates per-node `HLC_REPORT`s into a cluster-wide safe GC watermark.
///
/// Holds no reference to any map; `run_cycle` is handed a `MapProvider` so
/// the tracker itself stays storage-agnostic and trivially testable.
pub struct GcTracker {
    node_id: String,
    gc_age_ms: u64,
    stale_report_ttl_ms: u64,
    reports: Mutex<HashMap<String, PeerReport>>,
}

impl GcTracker {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            node_id: config.node_id.clone(),
            gc_age_ms: config.gc_age_ms,
            stale_report_ttl_ms: config.stale_report_ttl_ms,
            reports: Mutex::new(HashMap::new()),
        }
    }

    /// Records this node's own report. A freshly started node with no
    /// connected clients yet reports `now`, not the zero timestamp -- the
    /// same rule a newly-joined peer's first report must follow, so it
    /// never claims to hold data older than it has actually seen.
    pub fn record_local_report(&self, min_client_hlc: Timestamp, now_ms: u64) {
        let node_id = self.node_id.clone();
        self.ingest(node_id, min_client_hlc, now_ms);
    }

    /// Records a peer's `HLC_REPORT` message.
    pub fn ingest_report(&self, payload: &HlcReportPayload, received_at_ms: u64) {
        self.ingest(
            payload.node_id.clone(),
            payload.min_client_hlc.clone(),
            received_at_ms,
        );
    }

    fn ingest(&self, node_id: String, min_client_hlc: Timestamp, received_at_ms: u64) {
        self.reports.lock().insert(
            node_id,
            PeerReport {
                min_client_hlc,
                received_at_ms,
            },
        );
    }

    /// Removes reports older than `stale_report_ttl_ms`, treating their
    /// senders as departed rather than letting a dead peer pin GC forever.
    pub fn evict_stale(&self, now_ms: u64) {
        let ttl = self.stale_report_ttl_ms;
        self.reports
            .lock()
            .retain(|_, r| now_ms.saturating_sub(r.received_at_ms) <= ttl);
    }

    /// The minimum `min_client_hlc` across every non-stale report -- the
    /// cluster-safe HLC. `None` until at least one report has arrived.
    pub fn cluster_safe_hlc(&self, now_ms: u64) -> Option<Timestamp> {
        let ttl = self.stale_report_ttl_ms;
        self.reports
            .lock()
            .values()
            .filter(|r| now_ms.saturating_sub(r.received_at_ms) <= ttl)
            .map(|r| r.min_client_hlc.clone())
            .min()
    }

    /// The GC cutoff: LWW tombstones timestamped at or before this are safe
    /// to prune. `None` until `cluster_safe_hlc` resolves to a value.
    pub fn gc_cutoff(&self, now_ms: u64) -> Option<Timestamp> {
        let safe = self.cluster_safe_hlc(now_ms)?;
        Some(Timestamp {
            millis: safe.millis.saturating_sub(self.gc_age_ms),
            counter: 0,
            node_id: String::new(),
        })
    }

    /// Number of tracked (non-stale as of the last `evict_stale`) peer
    /// reports, for observability.
    pub fn tracked_peer_count(&self) -> usize {
        self.reports.lock().len()
    }
}

/// Result of one pruning sweep across every loaded map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GcCycleReport {
    /// Map name -> keys whose tombstones were pruned.
    pub pruned: HashMap<String, Vec<String>>,
}

impl GcCycleReport {
    pub fn total_pruned(&self) -> usize {
        self.pruned.values().map(Vec::len).sum()
    }
}

/// Runs one GC cycle: evicts stale peer reports, computes the cutoff, and
/// prunes tombstones from every map currently loaded in `provider`.
///
/// Returns `None` (and prunes nothing) if no cluster-safe HLC can be
/// computed yet, e.g. immediately after startup before any report --
/// including this node's own -- has been recorded.
pub async fn run_cycle(
    tracker: &GcTracker,
    provider: &dyn MapProvider,
    now_ms: u64,
) -> Option<GcCycleReport> {
    tracker.evict_stale(now_ms);
    let cutoff = tracker.gc_cutoff(now_ms)?;

    let mut report = GcCycleReport::default();
    for name in provider.loaded_map_names() {
        let Some(map) = provider.get_map(&name).await else {
            continue;
        };
        let pruned_keys = map.prune_tombstones(&cutoff);
        if !pruned_keys.is_empty() {
            report.pruned.insert(name, pruned_keys);
        }
    }
    Some(report)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use topgun_core::{CrdtMap, MapType, Value, HLC};

    use super::*;

    fn ts(millis: u64, node_id: &str) -> Timestamp {
        Timestamp {
            millis,
            counter: 0,
            node_id: node_id.to_string(),
        }
    }

    fn config() -> ServerConfig {
        ServerConfig {
            node_id: "node-1".to_string(),
            gc_age_ms: 1_000,
            stale_report_ttl_ms: 500,
            ..ServerConfig::default()
        }
    }

    /// A clock source pinned to a fixed instant, so tombstone timestamps
    /// land in the same small millisecond range as the test's `now_ms`
    /// values instead of the real system clock.
    struct FixedClock(u64);

    impl topgun_core::ClockSource for FixedClock {
        fn now(&self) -> u64 {
            self.0
        }
    }

    /// Minimal in-memory `MapProvider` for GC cycle tests.
    struct FakeProvider {
        maps: Mutex<HashMap<String, Arc<CrdtMap>>>,
    }

    impl FakeProvider {
        fn new() -> Self {
            Self {
                maps: Mutex::new(HashMap::new()),
            }
        }

        fn insert(&self, name: &str, map: Arc<CrdtMap>) {
            self.maps.lock().insert(name.to_string(), map);
        }
    }

    #[async_trait]
    impl MapProvider for FakeProvider {
        async fn get_map(&self, name: &str) -> Option<Arc<CrdtMap>> {
            self.maps.lock().get(name).cloned()
        }

        async fn get_or_load_map(
            &self,
            name: &str,
            _type_hint: MapType,
        ) -> anyhow::Result<Arc<CrdtMap>> {
            self.get_map(name)
                .await
                .ok_or_else(|| anyhow::anyhow!("no such map"))
        }

        fn has_map(&self, name: &str) -> bool {
            self.maps.lock().contains_key(name)
        }

        fn loaded_map_names(&self) -> Vec<String> {
            self.maps.lock().keys().cloned().collect()
        }
    }

    fn make_map(node_id: &str, at_ms: u64) -> Arc<CrdtMap> {
        let hlc = HLC::new(node_id.to_string(), Box::new(FixedClock(at_ms)));
        Arc::new(CrdtMap::new_lww("widgets", hlc))
    }

    // ---- GcTracker aggregation ----

    #[test]
    fn cluster_safe_hlc_none_before_any_report() {
        let tracker = GcTracker::new(&config());
        assert!(tracker.cluster_safe_hlc(10_000).is_none());
    }

    #[test]
    fn cluster_safe_hlc_is_minimum_of_live_reports() {
        let tracker = GcTracker::new(&config());
        tracker.record_local_report(ts(5_000, "node-1"), 5_000);
        tracker.ingest_report(
            &HlcReportPayload {
                node_id: "node-2".to_string(),
                min_client_hlc: ts(3_000, "node-2"),
                reported_at_ms: 5_000,
            },
            5_000,
        );
        tracker.ingest_report(
            &HlcReportPayload {
                node_id: "node-3".to_string(),
                min_client_hlc: ts(9_000, "node-3"),
                reported_at_ms: 5_000,
            },
            5_000,
        );

        let safe = tracker.cluster_safe_hlc(5_000).unwrap();
        assert_eq!(safe.millis, 3_000);
    }

    #[test]
    fn stale_peer_excluded_from_minimum() {
        let tracker = GcTracker::new(&config());
        tracker.record_local_report(ts(9_000, "node-1"), 9_000);
        // node-2 reported a very old HLC but hasn't been heard from since;
        // by the time `now_ms` rolls around its report is past the TTL.
        tracker.ingest_report(
            &HlcReportPayload {
                node_id: "node-2".to_string(),
                min_client_hlc: ts(0, "node-2"),
                reported_at_ms: 0,
            },
            0,
        );

        // now_ms = 600 > stale_report_ttl_ms (500) past node-2's report.
        let safe = tracker.cluster_safe_hlc(600).unwrap();
        assert_eq!(safe.millis, 9_000, "stale report must not pin the watermark");
    }

    #[test]
    fn newly_joined_node_reports_now_not_zero() {
        let tracker = GcTracker::new(&config());
        // A node that just joined with no clients yet reports `now`.
        tracker.record_local_report(ts(20_000, "node-1"), 20_000);
        let safe = tracker.cluster_safe_hlc(20_000).unwrap();
        assert_eq!(safe.millis, 20_000);
    }

    #[test]
    fn gc_cutoff_subtracts_gc_age_from_safe_hlc() {
        let tracker = GcTracker::new(&config()); // gc_age_ms = 1_000
        tracker.record_local_report(ts(5_000, "node-1"), 5_000);
        let cutoff = tracker.gc_cutoff(5_000).unwrap();
        assert_eq!(cutoff.millis, 4_000);
    }

    #[test]
    fn evict_stale_drops_expired_reports() {
        let tracker = GcTracker::new(&config());
        tracker.ingest_report(
            &HlcReportPayload {
                node_id: "node-2".to_string(),
                min_client_hlc: ts(1_000, "node-2"),
                reported_at_ms: 0,
            },
            0,
        );
        assert_eq!(tracker.tracked_peer_count(), 1);
        tracker.evict_stale(10_000);
        assert_eq!(tracked_peer_count_after_evict(&tracker), 0);
    }

    fn tracked_peer_count_after_evict(tracker: &GcTracker) -> usize {
        tracker.tracked_peer_count()
    }

    // ---- Invariant 5: no premature prune ----

    #[tokio::test]
    async fn no_premature_prune_when_a_live_client_is_behind() {
        let config = config();
        let map = make_map("node-1", 0);
        map.apply_local_set("key1", Value::String("hello".to_string()), None);
        map.apply_local_remove("key1", None);

        let provider = FakeProvider::new();
        provider.insert("widgets", map.clone());

        let tracker = GcTracker::new(&config);
        // This node's own report is recent, but node-2 is still depending
        // on an HLC far older than tombstone.ts + GC_AGE.
        tracker.record_local_report(ts(100_000, "node-1"), 100_000);
        tracker.ingest_report(
            &HlcReportPayload {
                node_id: "node-2".to_string(),
                min_client_hlc: ts(0, "node-2"),
                reported_at_ms: 100_000,
            },
            100_000,
        );

        let report = run_cycle(&tracker, &provider, 100_000).await.unwrap();
        assert_eq!(report.total_pruned(), 0, "a live lagging client must block pruning");
    }

    #[tokio::test]
    async fn prunes_once_clients_catch_up() {
        let config = config(); // gc_age_ms = 1_000
        let map = make_map("node-1", 0);
        map.apply_local_set("key1", Value::String("hello".to_string()), None);
        map.apply_local_remove("key1", None);

        let provider = FakeProvider::new();
        provider.insert("widgets", map.clone());

        let tracker = GcTracker::new(&config);
        // Every report is now comfortably past the tombstone + GC_AGE.
        tracker.record_local_report(ts(1_000_000, "node-1"), 1_000_000);
        tracker.ingest_report(
            &HlcReportPayload {
                node_id: "node-2".to_string(),
                min_client_hlc: ts(999_000, "node-2"),
                reported_at_ms: 1_000_000,
            },
            1_000_000,
        );

        let report = run_cycle(&tracker, &provider, 1_000_000).await.unwrap();
        assert_eq!(report.total_pruned(), 1);
        assert_eq!(report.pruned.get("widgets").unwrap(), &vec!["key1".to_string()]);
    }

    #[tokio::test]
    async fn no_cycle_before_any_report_recorded() {
        let config = config();
        let provider = FakeProvider::new();
        let tracker = GcTracker::new(&config);
        assert!(run_cycle(&tracker, &provider, 1_000).await.is_none());
    }

    #[test]
    fn gc_cycle_report_total_pruned_sums_across_maps() {
        let mut report = GcCycleReport::default();
        report.pruned.insert("a".to_string(), vec!["k1".to_string(), "k2".to_string()]);
        report.pruned.insert("b".to_string(), vec!["k3".to_string()]);
        assert_eq!(report.total_pruned(), 3);
    }
}
