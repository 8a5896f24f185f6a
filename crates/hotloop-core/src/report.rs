//! Human-readable rebuild dashboard.

use crate::stats::StatsSnapshot;
use chrono::{DateTime, Local};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Events retained for the summary.
pub const MAX_EVENTS: usize = 50;

/// Events shown in a summary.
pub const SUMMARY_EVENTS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventKind {
    Rebuild,
    CacheHit,
    BuildFailed,
}

/// One entry in the recent-events list.
#[derive(Debug, Clone, Serialize)]
pub struct ReportEvent {
    pub timestamp: DateTime<Local>,
    pub path: PathBuf,
    pub kind: EventKind,
    pub affected: usize,
    pub duration: Duration,
}

impl ReportEvent {
    /// Single line, e.g. `[12:00:01] REBUILD src/a.js (3 files affected, 120ms)`.
    pub fn line(&self) -> String {
        let time = self.timestamp.format("%H:%M:%S");
        match self.kind {
            EventKind::Rebuild => format!(
                "[{}] REBUILD {} ({} files affected, {:?})",
                time,
                self.path.display(),
                self.affected,
                self.duration
            ),
            EventKind::CacheHit => format!("[{}] CACHE HIT {}", time, self.path.display()),
            EventKind::BuildFailed => format!(
                "[{}] FAILED {} ({} files affected, {:?})",
                time,
                self.path.display(),
                self.affected,
                self.duration
            ),
        }
    }
}

/// Aggregate numbers kept by the dashboard.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardMetrics {
    pub total_rebuilds: u64,
    pub total_cache_hits: u64,
    pub total_failures: u64,
    pub total_affected: u64,
    pub last_update: Option<DateTime<Local>>,
}

impl DashboardMetrics {
    pub fn average_affected(&self) -> f64 {
        if self.total_rebuilds == 0 {
            0.0
        } else {
            self.total_affected as f64 / self.total_rebuilds as f64
        }
    }
}

#[derive(Default)]
struct DashboardState {
    events: VecDeque<ReportEvent>,
    metrics: DashboardMetrics,
}

/// Bounded log of recent rebuild activity.
pub struct Dashboard {
    state: RwLock<DashboardState>,
    capacity: usize,
    echo: bool,
}

impl Default for Dashboard {
    fn default() -> Self {
        Self::new(MAX_EVENTS)
    }
}

impl Dashboard {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: RwLock::new(DashboardState::default()),
            capacity: capacity.max(1),
            echo: false,
        }
    }

    /// Print each event line to stdout as it is recorded.
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn record_rebuild(&self, path: &Path, affected: usize, duration: Duration) {
        self.push(path, EventKind::Rebuild, affected, duration);
    }

    pub fn record_cache_hit(&self, path: &Path) {
        self.push(path, EventKind::CacheHit, 0, Duration::ZERO);
    }

    pub fn record_failure(&self, path: &Path, affected: usize, duration: Duration) {
        self.push(path, EventKind::BuildFailed, affected, duration);
    }

    fn push(&self, path: &Path, kind: EventKind, affected: usize, duration: Duration) {
        let event = ReportEvent {
            timestamp: Local::now(),
            path: path.to_path_buf(),
            kind,
            affected,
            duration,
        };

        if self.echo {
            println!("{}", event.line());
        }

        let mut state = self.state.write();
        match kind {
            EventKind::Rebuild => {
                state.metrics.total_rebuilds += 1;
                state.metrics.total_affected += affected as u64;
            }
            EventKind::CacheHit => state.metrics.total_cache_hits += 1,
            EventKind::BuildFailed => state.metrics.total_failures += 1,
        }
        state.metrics.last_update = Some(event.timestamp);

        state.events.push_back(event);
        while state.events.len() > self.capacity {
            state.events.pop_front();
        }
    }

    /// Up to `n` most recent events, newest first.
    pub fn recent(&self, n: usize) -> Vec<ReportEvent> {
        self.state.read().events.iter().rev().take(n).cloned().collect()
    }

    pub fn metrics(&self) -> DashboardMetrics {
        self.state.read().metrics.clone()
    }

    pub fn event_count(&self) -> usize {
        self.state.read().events.len()
    }

    /// Periodic summary combining ledger counters and recent events.
    pub fn render_summary(&self, stats: &StatsSnapshot) -> String {
        let metrics = self.metrics();
        let recent = self.recent(SUMMARY_EVENTS);

        let mut out = String::new();
        let _ = writeln!(out, "=== Hot Reload Dashboard ===");
        let _ = writeln!(out, "Total Rebuilds: {}", stats.total_rebuilds);
        let _ = writeln!(out, "Build Failures: {}", stats.build_failures);
        let _ = writeln!(
            out,
            "Cache Hits: {} / Misses: {} ({:.1}% hit rate)",
            stats.cache_hits,
            stats.cache_misses,
            stats.hit_rate()
        );
        let _ = writeln!(
            out,
            "Average Affected Files: {:.1}",
            metrics.average_affected()
        );
        let _ = writeln!(out, "Last Rebuild: {:?}", stats.last_rebuild);

        if recent.is_empty() {
            let _ = writeln!(out, "No events yet. Waiting for file changes...");
        } else {
            let _ = writeln!(out, "Recent Events:");
            for event in &recent {
                let _ = writeln!(out, "  {}", event.line());
            }
        }

        out
    }

    /// Shutdown report: ledger block followed by the summary.
    pub fn render_final(&self, stats: &StatsSnapshot) -> String {
        format!("{}\n{}", stats.render(), self.render_summary(stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_buffer_is_bounded() {
        let dashboard = Dashboard::new(3);
        for i in 0..5 {
            dashboard.record_rebuild(Path::new(&format!("/p/{i}.js")), 1, Duration::ZERO);
        }

        assert_eq!(dashboard.event_count(), 3);
        let recent = dashboard.recent(10);
        assert_eq!(recent[0].path, PathBuf::from("/p/4.js"));
        assert_eq!(recent[2].path, PathBuf::from("/p/2.js"));
        assert_eq!(dashboard.metrics().total_rebuilds, 5);
    }

    #[test]
    fn test_metrics_by_kind() {
        let dashboard = Dashboard::default();
        dashboard.record_rebuild(Path::new("/p/a.js"), 3, Duration::from_millis(10));
        dashboard.record_rebuild(Path::new("/p/b.js"), 1, Duration::from_millis(10));
        dashboard.record_cache_hit(Path::new("/p/a.js"));
        dashboard.record_failure(Path::new("/p/c.js"), 2, Duration::ZERO);

        let metrics = dashboard.metrics();
        assert_eq!(metrics.total_rebuilds, 2);
        assert_eq!(metrics.total_cache_hits, 1);
        assert_eq!(metrics.total_failures, 1);
        assert_eq!(metrics.total_affected, 4);
        assert!((metrics.average_affected() - 2.0).abs() < f64::EPSILON);
        assert!(metrics.last_update.is_some());
    }

    #[test]
    fn test_empty_summary() {
        let dashboard = Dashboard::default();
        let text = dashboard.render_summary(&StatsSnapshot::default());
        assert!(text.contains("No events yet"));
        assert!(text.contains("0.0% hit rate"));
    }

    #[test]
    fn test_summary_shows_newest_first() {
        let dashboard = Dashboard::default();
        for i in 0..15 {
            dashboard.record_rebuild(Path::new(&format!("/p/f{i:02}.js")), 1, Duration::ZERO);
        }

        let text = dashboard.render_summary(&StatsSnapshot::default());
        let first = text.find("f14.js").unwrap();
        let last = text.find("f05.js").unwrap();
        assert!(first < last);
        assert!(!text.contains("f04.js"));
    }

    #[test]
    fn test_event_line_format() {
        let dashboard = Dashboard::default();
        dashboard.record_cache_hit(Path::new("/p/a.js"));

        let line = dashboard.recent(1)[0].line();
        assert!(line.starts_with('['));
        assert!(line.contains("] CACHE HIT /p/a.js"));
    }
}
