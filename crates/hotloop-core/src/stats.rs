//! Rebuild statistics.
//!
//! Counters are atomics; per-file durations sit behind a lock. Readers get
//! a [`StatsSnapshot`], never a live reference.

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Session-wide rebuild counters.
pub struct StatsLedger {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    total_rebuilds: AtomicU64,
    build_failures: AtomicU64,
    last_rebuild: RwLock<Duration>,
    file_durations: RwLock<HashMap<PathBuf, Duration>>,
    start_time: Instant,
}

impl Default for StatsLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsLedger {
    pub fn new() -> Self {
        Self {
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            total_rebuilds: AtomicU64::new(0),
            build_failures: AtomicU64::new(0),
            last_rebuild: RwLock::new(Duration::ZERO),
            file_durations: RwLock::new(HashMap::new()),
            start_time: Instant::now(),
        }
    }

    /// A change that turned out to be a no-op.
    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// A change that needs the pipeline.
    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// A pipeline run for `path` that completed.
    pub fn record_rebuild(&self, path: &Path, duration: Duration) {
        self.total_rebuilds.fetch_add(1, Ordering::Relaxed);
        *self.last_rebuild.write() = duration;
        self.file_durations
            .write()
            .insert(path.to_path_buf(), duration);
    }

    /// A build the backend rejected or could not run.
    pub fn record_failure(&self) {
        self.build_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Copy of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            total_rebuilds: self.total_rebuilds.load(Ordering::Relaxed),
            build_failures: self.build_failures.load(Ordering::Relaxed),
            last_rebuild: *self.last_rebuild.read(),
            file_durations: self
                .file_durations
                .read()
                .iter()
                .map(|(p, d)| (p.clone(), *d))
                .collect(),
            uptime_secs: self.uptime().as_secs(),
        }
    }
}

/// Point-in-time copy of the ledger.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub total_rebuilds: u64,
    pub build_failures: u64,
    pub last_rebuild: Duration,
    /// Last pipeline duration per changed file
    pub file_durations: BTreeMap<PathBuf, Duration>,
    pub uptime_secs: u64,
}

impl StatsSnapshot {
    /// Hit rate in percent, 0 when nothing was checked yet.
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64 * 100.0
        }
    }

    /// Multi-line text block for the shutdown report.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Hot Reload Stats:");
        let _ = writeln!(out, "  Total Rebuilds: {}", self.total_rebuilds);
        let _ = writeln!(out, "  Build Failures: {}", self.build_failures);
        let _ = writeln!(out, "  Cache Hits: {}", self.cache_hits);
        let _ = writeln!(out, "  Cache Misses: {}", self.cache_misses);
        let _ = writeln!(out, "  Hit Rate: {:.1}%", self.hit_rate());
        let _ = writeln!(out, "  Last Rebuild: {:?}", self.last_rebuild);

        if !self.file_durations.is_empty() {
            let _ = writeln!(out, "  Per-file rebuild times:");
            for (path, duration) in &self.file_durations {
                let _ = writeln!(out, "    {}: {:?}", path.display(), duration);
            }
        }

        out
    }
}
