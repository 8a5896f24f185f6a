//! Configuration for hotloop.

use crate::CoreError;
use hotloop_build::{Artifact, BackendRegistry, CommandBackend};
use hotloop_indexer::DEFAULT_IGNORES;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Project-local config file name, looked up in the watched root.
pub const PROJECT_CONFIG_FILE: &str = ".hotloop.yaml";

/// Watcher and rebuild configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotloopConfig {
    /// Quiet period before a burst of filesystem events is delivered
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Seconds between dashboard summaries
    #[serde(default = "default_report_interval_secs")]
    pub report_interval_secs: u64,

    /// How long a stopped process may take to exit before it is killed
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,

    /// Where executable-producing backends write their output
    #[serde(default = "default_output_binary")]
    pub output_binary: PathBuf,

    /// Arguments for the supervised process
    #[serde(default)]
    pub run_args: Vec<String>,

    /// Ignore patterns (gitignore syntax)
    #[serde(default = "default_ignore")]
    pub ignore: Vec<String>,

    /// Webpack config file, relative to the root
    #[serde(default = "default_webpack_config")]
    pub webpack_config: String,

    /// Vite config file, relative to the root
    #[serde(default = "default_vite_config")]
    pub vite_config: String,

    /// Backend to try before the detection scan
    #[serde(default)]
    pub backend: Option<String>,

    /// User-defined build command
    #[serde(default)]
    pub custom_build: Option<CustomBuildConfig>,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Build once at startup before watching
    #[serde(default = "default_initial_build")]
    pub initial_build: bool,
}

/// A build command supplied by the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomBuildConfig {
    /// Backend name shown in logs and usable as `backend`
    #[serde(default = "default_custom_name")]
    pub name: String,

    /// Program to run
    pub program: String,

    /// Fixed arguments
    #[serde(default)]
    pub args: Vec<String>,

    /// The command produces `output_binary`; restart it after each build
    #[serde(default)]
    pub restart: bool,

    /// Append the affected paths to the command line
    #[serde(default)]
    pub pass_paths: bool,
}

fn default_debounce_ms() -> u64 {
    100
}

fn default_report_interval_secs() -> u64 {
    10
}

fn default_grace_period_ms() -> u64 {
    2000
}

fn default_output_binary() -> PathBuf {
    PathBuf::from("/tmp/hotloop_output")
}

fn default_ignore() -> Vec<String> {
    DEFAULT_IGNORES.iter().map(|s| s.to_string()).collect()
}

fn default_webpack_config() -> String {
    "webpack.config.js".to_string()
}

fn default_vite_config() -> String {
    "vite.config.js".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_initial_build() -> bool {
    true
}

fn default_custom_name() -> String {
    "custom".to_string()
}

impl Default for HotloopConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            report_interval_secs: default_report_interval_secs(),
            grace_period_ms: default_grace_period_ms(),
            output_binary: default_output_binary(),
            run_args: Vec::new(),
            ignore: default_ignore(),
            webpack_config: default_webpack_config(),
            vite_config: default_vite_config(),
            backend: None,
            custom_build: None,
            log_level: default_log_level(),
            initial_build: default_initial_build(),
        }
    }
}

impl HotloopConfig {
    /// Discover configuration for a project, falling back to defaults.
    ///
    /// Looks at `<root>/.hotloop.yaml`, then the user config directory.
    /// Unreadable or malformed files are logged and skipped.
    pub fn load(root: &Path) -> Self {
        let mut candidates = vec![root.join(PROJECT_CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            candidates.push(dir.join("hotloop").join("config.yaml"));
        }

        for path in candidates.iter().filter(|p| p.exists()) {
            match Self::load_from(path) {
                Ok(config) => {
                    tracing::debug!(path = ?path, "Loaded config");
                    return config;
                }
                Err(e) => tracing::warn!("Ignoring config file {:?}: {}", path, e),
            }
        }

        Self::default()
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CoreError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        serde_yaml::from_str(&content)
            .map_err(|e| CoreError::Config(format!("cannot parse {}: {}", path.display(), e)))
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval_secs.max(1))
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    /// Candidate backends for `root`, in detection order.
    ///
    /// A custom build, when configured, is registered ahead of the presets.
    pub fn backend_registry(&self, root: &Path) -> BackendRegistry {
        let mut registry = BackendRegistry::new();

        if let Some(custom) = &self.custom_build {
            let artifact = if custom.restart {
                Artifact::Executable(self.output_binary.clone())
            } else {
                Artifact::StaticAssets
            };
            registry.register(Arc::new(
                CommandBackend::new(custom.name.clone(), custom.program.clone(), root)
                    .args(custom.args.clone())
                    .artifact(artifact)
                    .pass_affected(custom.pass_paths),
            ));
        }

        registry.register(Arc::new(CommandBackend::go(root, &self.output_binary)));
        registry.register(Arc::new(CommandBackend::webpack(root, &self.webpack_config)));
        registry.register(Arc::new(CommandBackend::vite(root, &self.vite_config)));

        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = HotloopConfig::default();
        assert_eq!(config.debounce(), Duration::from_millis(100));
        assert_eq!(config.report_interval(), Duration::from_secs(10));
        assert_eq!(config.grace_period(), Duration::from_secs(2));
        assert_eq!(config.output_binary, PathBuf::from("/tmp/hotloop_output"));
        assert!(config.ignore.iter().any(|p| p == "node_modules"));
        assert!(config.initial_build);
        assert!(config.backend.is_none());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: HotloopConfig = serde_yaml::from_str("grace_period_ms: 500\n").unwrap();
        assert_eq!(config.grace_period(), Duration::from_millis(500));
        assert_eq!(config.debounce_ms, 100);
        assert_eq!(config.webpack_config, "webpack.config.js");
    }

    #[test]
    fn test_custom_build_yaml() {
        let yaml = r#"
backend: make
custom_build:
  name: make
  program: make
  args: ["all"]
  restart: true
"#;
        let config: HotloopConfig = serde_yaml::from_str(yaml).unwrap();
        let custom = config.custom_build.as_ref().unwrap();
        assert_eq!(custom.name, "make");
        assert!(custom.restart);
        assert!(!custom.pass_paths);

        let registry = config.backend_registry(Path::new("/proj"));
        assert_eq!(registry.names(), vec!["make", "go", "webpack", "vite"]);
    }

    #[test]
    fn test_load_prefers_project_file() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(PROJECT_CONFIG_FILE), "report_interval_secs: 3\n").unwrap();

        let config = HotloopConfig::load(dir.path());
        assert_eq!(config.report_interval_secs, 3);
    }

    #[test]
    fn test_malformed_project_file_is_skipped() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(PROJECT_CONFIG_FILE), "debounce_ms: [not a number\n").unwrap();

        // Falls through to the user config or defaults without panicking
        let _ = HotloopConfig::load(dir.path());
        assert!(HotloopConfig::load_from(&dir.path().join(PROJECT_CONFIG_FILE)).is_err());
    }

    #[test]
    fn test_load_from_missing_file() {
        let result = HotloopConfig::load_from(Path::new("/nonexistent/hotloop.yaml"));
        assert!(matches!(result, Err(CoreError::Config(_))));
    }

    #[test]
    fn test_report_interval_never_zero() {
        let config = HotloopConfig {
            report_interval_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.report_interval(), Duration::from_secs(1));
    }
}
