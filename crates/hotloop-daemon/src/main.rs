//! hotloop
//!
//! Watches a project directory and rebuilds only what a change affects.

mod daemon;
mod signals;

use anyhow::{Context, Result};
use clap::Parser;
use hotloop_core::HotloopConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use daemon::Daemon;

#[derive(Parser, Debug)]
#[command(name = "hotloop")]
#[command(about = "Incremental rebuild and hot reload for a project directory")]
#[command(version)]
struct Cli {
    /// Project directory to watch
    #[arg(default_value = ".")]
    dir: PathBuf,

    /// Config file (default: <DIR>/.hotloop.yaml, then the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seconds between dashboard summaries
    #[arg(long)]
    report_interval: Option<u64>,

    /// Milliseconds a stopped process gets before it is killed
    #[arg(long)]
    grace_period_ms: Option<u64>,

    /// Skip the build at startup
    #[arg(long)]
    no_initial_build: bool,
}

impl Cli {
    fn load_config(&self) -> Result<HotloopConfig> {
        let mut config = match &self.config {
            Some(path) => HotloopConfig::load_from(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => HotloopConfig::load(&self.dir),
        };

        if let Some(secs) = self.report_interval {
            config.report_interval_secs = secs;
        }
        if let Some(ms) = self.grace_period_ms {
            config.grace_period_ms = ms;
        }
        if self.no_initial_build {
            config.initial_build = false;
        }

        Ok(config)
    }
}

async fn run(cli: Cli, config: HotloopConfig) -> Result<()> {
    let daemon = Daemon::new(&cli.dir, config)?;
    daemon.run().await
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_target(false)
        .init();

    tracing::info!("Starting hotloop v{}", env!("CARGO_PKG_VERSION"));

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli, config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let cli = Cli::try_parse_from(["hotloop"]).unwrap();
        assert_eq!(cli.dir, PathBuf::from("."));
        assert!(cli.config.is_none());
        assert!(!cli.no_initial_build);
    }

    #[test]
    fn test_flags_override_config() {
        let dir = tempfile::tempdir().unwrap();
        let cli = Cli::try_parse_from([
            "hotloop".to_string(),
            dir.path().display().to_string(),
            "--report-interval".to_string(),
            "30".to_string(),
            "--grace-period-ms".to_string(),
            "250".to_string(),
            "--no-initial-build".to_string(),
        ])
        .unwrap();

        let config = cli.load_config().unwrap();
        assert_eq!(config.report_interval_secs, 30);
        assert_eq!(config.grace_period_ms, 250);
        assert!(!config.initial_build);
    }

    #[test]
    fn test_explicit_config_must_exist() {
        let cli = Cli::try_parse_from(["hotloop", ".", "--config", "/nonexistent/hotloop.yaml"])
            .unwrap();
        assert!(cli.load_config().is_err());
    }
}
