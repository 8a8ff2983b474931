//! Traffic statistics

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};

/// Value reported by `query_stats` when no statistic is available
pub const EMPTY_STATS: &str = "0";

/// Source of per-key statistic strings.
pub trait StatsSource: Send + Sync {
    /// Look up a statistic; `None` for an unknown key
    fn query(&self, key: &str) -> Option<String>;
}

/// Shared statistics using atomic counters for lock-free access
#[derive(Debug, Default)]
pub struct SharedStats {
    pub uplink: AtomicU64,
    pub downlink: AtomicU64,
    pub uplink_packets: AtomicU64,
    pub downlink_packets: AtomicU64,
    pub active_sessions: AtomicUsize,
}

impl SharedStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record bytes sent upstream
    pub fn record_uplink(&self, bytes: usize) {
        self.uplink.fetch_add(bytes as u64, Ordering::Relaxed);
        self.uplink_packets.fetch_add(1, Ordering::Relaxed);
    }

    /// Record bytes received from upstream
    pub fn record_downlink(&self, bytes: usize) {
        self.downlink.fetch_add(bytes as u64, Ordering::Relaxed);
        self.downlink_packets.fetch_add(1, Ordering::Relaxed);
    }

    /// Set active sessions count
    pub fn set_active_sessions(&self, count: usize) {
        self.active_sessions.store(count, Ordering::Relaxed);
    }

    /// Zero every counter
    pub fn reset(&self) {
        self.uplink.store(0, Ordering::Relaxed);
        self.downlink.store(0, Ordering::Relaxed);
        self.uplink_packets.store(0, Ordering::Relaxed);
        self.downlink_packets.store(0, Ordering::Relaxed);
        self.active_sessions.store(0, Ordering::Relaxed);
    }

    /// Get a snapshot of current stats
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            uplink: self.uplink.load(Ordering::Relaxed),
            downlink: self.downlink.load(Ordering::Relaxed),
            uplink_packets: self.uplink_packets.load(Ordering::Relaxed),
            downlink_packets: self.downlink_packets.load(Ordering::Relaxed),
            active_sessions: self.active_sessions.load(Ordering::Relaxed),
        }
    }
}

impl StatsSource for SharedStats {
    fn query(&self, key: &str) -> Option<String> {
        let value = match key {
            "uplink" => self.uplink.load(Ordering::Relaxed),
            "downlink" => self.downlink.load(Ordering::Relaxed),
            "uplink_packets" => self.uplink_packets.load(Ordering::Relaxed),
            "downlink_packets" => self.downlink_packets.load(Ordering::Relaxed),
            "active_sessions" => self.active_sessions.load(Ordering::Relaxed) as u64,
            "snapshot" => return serde_json::to_string(&self.snapshot()).ok(),
            _ => return None,
        };
        Some(value.to_string())
    }
}

/// Snapshot of stats at a point in time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub uplink: u64,
    pub downlink: u64,
    pub uplink_packets: u64,
    pub downlink_packets: u64,
    pub active_sessions: usize,
}

impl StatsSnapshot {
    /// Get the total bytes transferred
    pub fn total_bytes(&self) -> u64 {
        self.uplink + self.downlink
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_and_query() {
        let stats = SharedStats::new();
        stats.record_uplink(100);
        stats.record_uplink(50);
        stats.record_downlink(1000);
        stats.set_active_sessions(3);

        assert_eq!(stats.query("uplink").as_deref(), Some("150"));
        assert_eq!(stats.query("uplink_packets").as_deref(), Some("2"));
        assert_eq!(stats.query("downlink").as_deref(), Some("1000"));
        assert_eq!(stats.query("active_sessions").as_deref(), Some("3"));
        assert_eq!(stats.query("nonexistent"), None);
        assert_eq!(stats.snapshot().total_bytes(), 1150);
    }

    #[test]
    fn test_snapshot_query_is_json() {
        let stats = SharedStats::new();
        stats.record_downlink(64);

        let json = stats.query("snapshot").unwrap();
        let snapshot: StatsSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(snapshot.downlink, 64);
        assert_eq!(snapshot.downlink_packets, 1);
    }

    #[test]
    fn test_reset() {
        let stats = SharedStats::new();
        stats.record_uplink(10);
        stats.set_active_sessions(1);
        stats.reset();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }
}
