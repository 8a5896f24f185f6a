//! hotloop core
//!
//! The incremental rebuild engine:
//! - content fingerprints that decide whether a change is real
//! - a reverse-dependency graph over import identifiers
//! - the coordinator that runs one pipeline per change
//! - statistics and the rebuild dashboard

pub mod config;
pub mod coordinator;
mod error;
pub mod fingerprint;
pub mod graph;
pub mod report;
pub mod stats;

pub use config::{CustomBuildConfig, HotloopConfig, PROJECT_CONFIG_FILE};
pub use coordinator::{
    BackendOutcome, BuildRun, Coordinator, CoordinatorOptions, RebuildOutcome, RestartOutcome,
};
pub use error::CoreError;
pub use fingerprint::{hash_file, Fingerprint, FingerprintStore};
pub use graph::{identifier_matches, DependencyGraph};
pub use report::{Dashboard, DashboardMetrics, EventKind, ReportEvent};
pub use stats::{StatsLedger, StatsSnapshot};
