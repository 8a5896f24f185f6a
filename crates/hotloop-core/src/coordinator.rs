//! Rebuild coordinator.
//!
//! Turns one file change into at most one rebuild:
//! validity check, import analysis, affected-set computation, invalidation,
//! build, process restart, fingerprint refresh and statistics. Pipelines are
//! serialized; a change delivered while another pipeline runs waits for it.

use crate::config::HotloopConfig;
use crate::fingerprint::{Fingerprint, FingerprintStore};
use crate::graph::DependencyGraph;
use crate::report::Dashboard;
use crate::stats::{StatsLedger, StatsSnapshot};
use crate::CoreError;
use chrono::{DateTime, Local};
use hotloop_build::{
    Artifact, BuildBackend, LaunchSpec, ProcessSupervisor, StopOutcome, DEFAULT_GRACE_PERIOD,
};
use hotloop_indexer::{
    ChangeEvent, IgnoreMatcher, ImportScanner, RegexImportScanner, Walker, DEFAULT_IGNORES,
};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Knobs that are not collaborators.
#[derive(Debug, Clone)]
pub struct CoordinatorOptions {
    /// Grace period for stopping the supervised process
    pub grace_period: Duration,
    /// Arguments for the supervised process
    pub run_args: Vec<String>,
    /// Ignore patterns used when analyzing the project
    pub ignore: Vec<String>,
    /// Print dashboard events to stdout as they happen
    pub echo_events: bool,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            grace_period: DEFAULT_GRACE_PERIOD,
            run_args: Vec::new(),
            ignore: DEFAULT_IGNORES.iter().map(|s| s.to_string()).collect(),
            echo_events: false,
        }
    }
}

impl From<&HotloopConfig> for CoordinatorOptions {
    fn from(config: &HotloopConfig) -> Self {
        Self {
            grace_period: config.grace_period(),
            run_args: config.run_args.clone(),
            ignore: config.ignore.clone(),
            echo_events: true,
        }
    }
}

/// What the backend step did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendOutcome {
    /// No backend is active
    AnalysisOnly,
    /// The backend ran and succeeded
    Built {
        backend: String,
        output: String,
        duration: Duration,
    },
}

/// What the restart step did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestartOutcome {
    /// Nothing to restart for this backend
    NotNeeded,
    /// New process started with this pid
    Restarted(u32),
    /// The build succeeded but the process could not be started
    Failed(String),
}

/// One completed pipeline run.
#[derive(Debug, Clone)]
pub struct BuildRun {
    pub path: PathBuf,
    pub started_at: DateTime<Local>,
    /// The changed file and everything that transitively depends on it
    pub affected: Vec<PathBuf>,
    pub backend: BackendOutcome,
    pub restart: RestartOutcome,
    pub duration: Duration,
}

/// Result of handling one change notification.
#[derive(Debug, Clone)]
pub enum RebuildOutcome {
    /// Content unchanged since the last good fingerprint
    CacheHit,
    Rebuilt(BuildRun),
}

impl RebuildOutcome {
    pub fn is_cache_hit(&self) -> bool {
        matches!(self, RebuildOutcome::CacheHit)
    }
}

/// Owns the rebuild pipeline and the state it mutates.
pub struct Coordinator {
    root: PathBuf,
    fingerprints: FingerprintStore,
    graph: RwLock<DependencyGraph>,
    scanner: Arc<dyn ImportScanner>,
    backend: Option<Arc<dyn BuildBackend>>,
    supervisor: Option<ProcessSupervisor>,
    matcher: Arc<IgnoreMatcher>,
    stats: StatsLedger,
    dashboard: Dashboard,
    pipeline: Mutex<()>,
}

impl Coordinator {
    /// Create a coordinator for `root`.
    ///
    /// `backend == None` is analysis-only mode. A supervisor is created only
    /// when the backend produces an executable.
    pub fn new(
        root: &Path,
        scanner: Arc<dyn ImportScanner>,
        backend: Option<Arc<dyn BuildBackend>>,
        options: CoordinatorOptions,
    ) -> Result<Self, CoreError> {
        let root = canonical_root(root)?;
        let matcher = Arc::new(IgnoreMatcher::new(&root, options.ignore.as_slice())?);

        let supervisor = backend.as_ref().and_then(|b| match b.artifact() {
            Artifact::Executable(program) => Some(ProcessSupervisor::new(
                LaunchSpec::new(program, &root).with_args(options.run_args.clone()),
                options.grace_period,
            )),
            Artifact::StaticAssets => None,
        });

        Ok(Self {
            root,
            fingerprints: FingerprintStore::new(),
            graph: RwLock::new(DependencyGraph::new()),
            scanner,
            backend,
            supervisor,
            matcher,
            stats: StatsLedger::new(),
            dashboard: Dashboard::default().with_echo(options.echo_events),
            pipeline: Mutex::new(()),
        })
    }

    /// Create a coordinator with the regex scanner and the detected backend.
    pub fn from_config(root: &Path, config: &HotloopConfig) -> Result<Self, CoreError> {
        let root = canonical_root(root)?;
        let backend = config
            .backend_registry(&root)
            .detect(config.backend.as_deref());

        match &backend {
            Some(b) => info!(backend = b.name(), "Build backend selected"),
            None => info!("No build backend detected, running in analysis-only mode"),
        }

        Self::new(
            &root,
            Arc::new(RegexImportScanner::new()),
            backend,
            CoordinatorOptions::from(config),
        )
    }

    /// Run the pipeline for one changed file.
    pub async fn process_change(&self, change: &ChangeEvent) -> Result<RebuildOutcome, CoreError> {
        let _guard = self.pipeline.lock().await;
        let path = change.path.as_path();
        let started = Instant::now();
        let started_at = Local::now();

        let valid = match self.fingerprints.is_valid(path) {
            Ok(valid) => valid,
            Err(e) => {
                warn!(path = ?path, error = %e, "Fingerprint check failed, treating as changed");
                self.fingerprints.invalidate(path);
                false
            }
        };

        if valid {
            debug!(path = ?path, "Unchanged, skipping rebuild");
            self.stats.record_cache_hit();
            self.dashboard.record_cache_hit(path);
            return Ok(RebuildOutcome::CacheHit);
        }
        self.stats.record_cache_miss();

        // Taken before scanning and building: a save that lands while the
        // build runs must not be covered by this fingerprint
        let mut fingerprint =
            Fingerprint::capture(path, Vec::new()).map_err(|source| CoreError::Fingerprint {
                path: path.to_path_buf(),
                source,
            })?;

        let dependencies = self.scanner.extract(path).await?;
        self.graph
            .write()
            .record_dependencies(path.to_path_buf(), dependencies.clone());
        fingerprint.dependencies = dependencies;

        let affected = self.graph.read().transitive_affected(path);
        for file in &affected {
            self.fingerprints.invalidate(file);
        }

        debug!(path = ?path, affected = affected.len(), "Computed affected set");

        let (backend, restart) = match &self.backend {
            None => (BackendOutcome::AnalysisOnly, RestartOutcome::NotNeeded),
            Some(backend) => {
                let built = self.run_backend(backend.as_ref(), path, &affected, started).await?;
                let restart = self.restart_process(backend.as_ref()).await;
                (built, restart)
            }
        };

        self.fingerprints.insert(fingerprint);

        let duration = started.elapsed();
        self.stats.record_rebuild(path, duration);
        self.dashboard.record_rebuild(path, affected.len(), duration);

        info!(
            path = ?path,
            affected = affected.len(),
            duration_ms = duration.as_millis() as u64,
            "Rebuild complete"
        );

        Ok(RebuildOutcome::Rebuilt(BuildRun {
            path: path.to_path_buf(),
            started_at,
            affected,
            backend,
            restart,
            duration,
        }))
    }

    async fn run_backend(
        &self,
        backend: &dyn BuildBackend,
        path: &Path,
        affected: &[PathBuf],
        started: Instant,
    ) -> Result<BackendOutcome, CoreError> {
        let report = match backend.build(affected).await {
            Ok(report) => report,
            Err(e) => {
                self.record_failure(path, affected.len(), started);
                return Err(e.into());
            }
        };

        if !report.success {
            self.record_failure(path, affected.len(), started);
            return Err(CoreError::BuildFailed {
                backend: backend.name().to_string(),
                output: report.output,
            });
        }

        Ok(BackendOutcome::Built {
            backend: backend.name().to_string(),
            output: report.output,
            duration: report.duration,
        })
    }

    async fn restart_process(&self, backend: &dyn BuildBackend) -> RestartOutcome {
        let Some(supervisor) = self.supervisor.as_ref().filter(|_| backend.restarts_process())
        else {
            return RestartOutcome::NotNeeded;
        };

        match supervisor.restart().await {
            Ok(pid) => RestartOutcome::Restarted(pid),
            Err(e) => {
                error!(error = %e, "Failed to restart process");
                RestartOutcome::Failed(e.to_string())
            }
        }
    }

    fn record_failure(&self, path: &Path, affected: usize, started: Instant) {
        self.stats.record_failure();
        self.dashboard
            .record_failure(path, affected, started.elapsed());
    }

    /// Scan every non-ignored file under the root and seed the graph.
    ///
    /// Files that cannot be scanned are logged and skipped. Returns the
    /// number of files recorded.
    pub async fn analyze_project(&self) -> Result<usize, CoreError> {
        let _guard = self.pipeline.lock().await;
        let files = Walker::new(&self.root, self.matcher.clone()).files()?;

        let mut recorded = 0;
        for file in files {
            match self.scanner.extract(&file).await {
                Ok(deps) => {
                    self.graph.write().record_dependencies(file, deps);
                    recorded += 1;
                }
                Err(e) => warn!(path = ?file, error = %e, "Skipping file during analysis"),
            }
        }

        let graph = self.graph.read();
        info!(
            files = graph.file_count(),
            imports = graph.edge_count(),
            "Project analyzed"
        );

        Ok(recorded)
    }

    /// Full build at startup.
    ///
    /// Every analyzed file is fingerprinted as it was before the build and
    /// the fingerprints are stored once the build succeeds. Restartable
    /// backends also get their process started here; a process that fails
    /// to start is reported in the run, not as an error.
    pub async fn initial_build(&self) -> Result<Option<BuildRun>, CoreError> {
        let _guard = self.pipeline.lock().await;
        let started = Instant::now();
        let started_at = Local::now();

        let captured = self.capture_seeded();

        let Some(backend) = self.backend.as_ref() else {
            self.store_fingerprints(captured);
            return Ok(None);
        };

        info!(backend = backend.name(), "Running initial build");
        let report = match backend.build(&[]).await {
            Ok(report) => report,
            Err(e) => {
                self.stats.record_failure();
                return Err(e.into());
            }
        };
        if !report.success {
            self.stats.record_failure();
            return Err(CoreError::BuildFailed {
                backend: backend.name().to_string(),
                output: report.output,
            });
        }

        let restart = self.restart_process(backend.as_ref()).await;

        self.store_fingerprints(captured);

        Ok(Some(BuildRun {
            path: self.root.clone(),
            started_at,
            affected: Vec::new(),
            backend: BackendOutcome::Built {
                backend: backend.name().to_string(),
                output: report.output,
                duration: report.duration,
            },
            restart,
            duration: started.elapsed(),
        }))
    }

    /// Fingerprint every file in the graph as it is right now.
    fn capture_seeded(&self) -> Vec<Fingerprint> {
        let entries = self.graph.read().entries();
        entries
            .into_iter()
            .filter_map(|(path, deps)| match Fingerprint::capture(&path, deps) {
                Ok(fingerprint) => Some(fingerprint),
                Err(e) => {
                    warn!(path = ?path, error = %e, "Could not fingerprint file");
                    None
                }
            })
            .collect()
    }

    fn store_fingerprints(&self, captured: Vec<Fingerprint>) {
        for fingerprint in captured {
            self.fingerprints.insert(fingerprint);
        }
        debug!(count = self.fingerprints.len(), "Fingerprints refreshed");
    }

    /// Drop all state for a removed file.
    pub async fn forget(&self, path: &Path) {
        let _guard = self.pipeline.lock().await;
        self.fingerprints.invalidate(path);
        if self.graph.write().remove(path) {
            debug!(path = ?path, "Forgot removed file");
        }
    }

    /// Stop the supervised process, if any.
    pub async fn shutdown(&self) -> Option<StopOutcome> {
        match &self.supervisor {
            Some(supervisor) => supervisor.shutdown().await,
            None => None,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_analysis_only(&self) -> bool {
        self.backend.is_none()
    }

    pub fn backend_name(&self) -> Option<&str> {
        self.backend.as_ref().map(|b| b.name())
    }

    pub fn fingerprints(&self) -> &FingerprintStore {
        &self.fingerprints
    }

    /// Recorded imports of `path`.
    pub fn dependencies_of(&self, path: &Path) -> Option<Vec<String>> {
        self.graph.read().dependencies(path).map(|d| d.to_vec())
    }

    pub fn supervisor(&self) -> Option<&ProcessSupervisor> {
        self.supervisor.as_ref()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    pub fn summary(&self) -> String {
        self.dashboard.render_summary(&self.stats.snapshot())
    }

    pub fn final_report(&self) -> String {
        self.dashboard.render_final(&self.stats.snapshot())
    }
}

fn canonical_root(root: &Path) -> Result<PathBuf, CoreError> {
    if !root.is_dir() {
        return Err(CoreError::InvalidPath(format!(
            "{} is not a directory",
            root.display()
        )));
    }
    root.canonicalize()
        .map_err(|e| CoreError::InvalidPath(format!("{}: {}", root.display(), e)))
}
