//! Watch loop lifecycle.

use anyhow::{Context, Result};
use hotloop_core::{Coordinator, CoreError, HotloopConfig, RebuildOutcome, RestartOutcome};
use hotloop_indexer::{ChangeEvent, FileWatcher, IgnoreMatcher, WatchEvent, WatcherOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinSet;

use crate::signals;

/// The long-running watcher process
pub struct Daemon {
    root: PathBuf,
    config: HotloopConfig,
    shutdown_tx: broadcast::Sender<()>,
}

impl Daemon {
    /// Create a daemon for `root`; fails if it is not a directory
    pub fn new(root: &Path, config: HotloopConfig) -> Result<Self> {
        if !root.is_dir() {
            anyhow::bail!("{} is not a directory", root.display());
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            root: root.to_path_buf(),
            config,
            shutdown_tx,
        })
    }

    /// Sender that stops [`run`](Self::run) like a signal would
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Analyze, build once, then rebuild on every change until shutdown
    pub async fn run(&self) -> Result<()> {
        // Subscribe before any await so an early shutdown request is not lost
        let shutdown = signals::wait_for_shutdown(self.shutdown_tx.subscribe());
        tokio::pin!(shutdown);

        let coordinator = Arc::new(
            Coordinator::from_config(&self.root, &self.config)
                .context("Failed to set up rebuild coordinator")?,
        );

        let analyzed = coordinator
            .analyze_project()
            .await
            .context("Failed to analyze project")?;
        tracing::info!(files = analyzed, "Dependency graph seeded");

        if self.config.initial_build {
            match coordinator.initial_build().await {
                Ok(Some(run)) => tracing::info!(
                    duration_ms = run.duration.as_millis() as u64,
                    "Initial build complete"
                ),
                Ok(None) => tracing::debug!("Analysis-only mode, no initial build"),
                Err(e) => tracing::error!("Initial build failed: {}", e),
            }
        }

        let matcher = Arc::new(
            IgnoreMatcher::new(coordinator.root(), self.config.ignore.as_slice())
                .context("Invalid ignore patterns")?,
        );
        let options = WatcherOptions {
            debounce_duration: self.config.debounce(),
            ..Default::default()
        };
        let mut watcher = FileWatcher::new(coordinator.root(), matcher, options)
            .context("Failed to create file watcher")?;
        let watched = watcher.start().context("Failed to start file watcher")?;

        tracing::info!(
            root = %coordinator.root().display(),
            directories = watched,
            backend = coordinator.backend_name().unwrap_or("none"),
            "Watching for changes"
        );

        let mut ticker = tokio::time::interval(self.config.report_interval());
        // First tick completes immediately
        ticker.tick().await;

        let mut tasks: JoinSet<()> = JoinSet::new();

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown signal received");
                    break;
                }
                event = watcher.next() => match event {
                    Some(WatchEvent::Changed(change)) => {
                        let coordinator = coordinator.clone();
                        tasks.spawn(async move { handle_change(&coordinator, change).await });
                    }
                    Some(WatchEvent::Removed(path)) => {
                        let coordinator = coordinator.clone();
                        tasks.spawn(async move { coordinator.forget(&path).await });
                    }
                    Some(WatchEvent::DirectoryCreated(dir)) => {
                        if let Err(e) = watcher.watch_tree(&dir) {
                            tracing::warn!(path = ?dir, error = %e, "Failed to watch new directory");
                        }
                    }
                    None => {
                        tracing::warn!("File watcher closed");
                        break;
                    }
                },
                _ = ticker.tick() => {
                    println!("{}", coordinator.summary());
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        tracing::error!("Rebuild task failed: {}", e);
                    }
                }
            }
        }

        // Let in-flight rebuilds finish
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Rebuild task failed: {}", e);
            }
        }

        self.cleanup(&coordinator).await;

        Ok(())
    }

    async fn cleanup(&self, coordinator: &Coordinator) {
        tracing::info!("Cleaning up...");

        if let Some(outcome) = coordinator.shutdown().await {
            tracing::debug!(?outcome, "Supervised process stopped");
        }

        println!("{}", coordinator.final_report());
    }
}

async fn handle_change(coordinator: &Coordinator, change: ChangeEvent) {
    match coordinator.process_change(&change).await {
        Ok(RebuildOutcome::CacheHit) => {}
        Ok(RebuildOutcome::Rebuilt(run)) => {
            if let RestartOutcome::Failed(e) = &run.restart {
                tracing::warn!(path = ?run.path, "Rebuilt, but the process did not start: {}", e);
            }
        }
        Err(CoreError::BuildFailed { backend, output }) => {
            tracing::error!(path = ?change.path, backend = %backend, "Build failed:\n{}", output);
        }
        Err(e) => {
            tracing::error!(path = ?change.path, error = %e, "Error processing change");
        }
    }
}
