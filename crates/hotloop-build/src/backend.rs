//! Build backends.
//!
//! A backend is a capability set: a name, a detection probe, a build
//! operation and the duration of its last run. Whether a successful build
//! warrants restarting the supervised process is a property of what the
//! backend produces ([`Artifact`]), not of its name.

use crate::BuildError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, info};

/// Default cap on captured build output, per stream.
const MAX_OUTPUT_BYTES: usize = 64 * 1024;

/// What a backend produces on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    /// A runnable program at this path; success means restart it
    Executable(PathBuf),
    /// Bundles or transformed assets; nothing to restart
    StaticAssets,
}

impl Artifact {
    /// Whether a successful build should restart the supervised process.
    pub fn is_restartable(&self) -> bool {
        matches!(self, Artifact::Executable(_))
    }
}

/// Outcome of a single build invocation.
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// Whether the tool reported success
    pub success: bool,
    /// Combined stdout/stderr, possibly truncated
    pub output: String,
    /// Wall-clock duration of the run
    pub duration: Duration,
}

/// A build tool the coordinator can drive.
#[async_trait]
pub trait BuildBackend: Send + Sync {
    /// Short identifier, e.g. `go` or `webpack`.
    fn name(&self) -> &str;

    /// Whether this backend can run in the current environment.
    fn detect(&self) -> bool;

    /// Build after a change affecting `affected` (empty for a full build).
    ///
    /// A tool that runs and fails is `Ok` with `success == false`; `Err` is
    /// reserved for not being able to run it at all.
    async fn build(&self, affected: &[PathBuf]) -> Result<BuildReport, BuildError>;

    /// Duration of the most recent build, zero if none ran yet.
    fn last_build_duration(&self) -> Duration;

    /// What a successful build produces.
    fn artifact(&self) -> Artifact;

    /// Whether success should restart the supervised process.
    fn restarts_process(&self) -> bool {
        self.artifact().is_restartable()
    }
}

/// A backend that shells out to a single command.
#[derive(Debug)]
pub struct CommandBackend {
    name: String,
    program: PathBuf,
    args: Vec<String>,
    cwd: PathBuf,
    marker: Option<PathBuf>,
    artifact: Artifact,
    pass_affected: bool,
    max_output: usize,
    last_duration: Mutex<Duration>,
}

impl CommandBackend {
    /// Create a backend running `program` in `cwd`, producing static assets.
    pub fn new(name: impl Into<String>, program: impl Into<PathBuf>, cwd: &Path) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.to_path_buf(),
            marker: None,
            artifact: Artifact::StaticAssets,
            pass_affected: false,
            max_output: MAX_OUTPUT_BYTES,
            last_duration: Mutex::new(Duration::ZERO),
        }
    }

    /// Fixed arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// File (relative to cwd) that must exist for detection to succeed.
    pub fn marker(mut self, marker: impl Into<PathBuf>) -> Self {
        self.marker = Some(marker.into());
        self
    }

    /// Set the artifact kind.
    pub fn artifact(mut self, artifact: Artifact) -> Self {
        self.artifact = artifact;
        self
    }

    /// Append the affected paths to the command line.
    pub fn pass_affected(mut self, pass: bool) -> Self {
        self.pass_affected = pass;
        self
    }

    /// `go build -o <output> .`, restarting `<output>` on success.
    pub fn go(root: &Path, output: &Path) -> Self {
        Self::new("go", "go", root)
            .args([
                "build".to_string(),
                "-o".to_string(),
                output.display().to_string(),
                ".".to_string(),
            ])
            .marker("go.mod")
            .artifact(Artifact::Executable(output.to_path_buf()))
    }

    /// `webpack --config <config>`.
    pub fn webpack(root: &Path, config: &str) -> Self {
        Self::new("webpack", "webpack", root)
            .args(["--config", config])
            .marker(config)
    }

    /// `vite build`.
    pub fn vite(root: &Path, config: &str) -> Self {
        Self::new("vite", "vite", root)
            .args(["build", "--config", config])
            .marker(config)
    }

    /// Program this backend runs.
    pub fn program(&self) -> &Path {
        &self.program
    }

    fn command_line(&self, affected: &[PathBuf]) -> Vec<String> {
        let mut args = self.args.clone();
        if self.pass_affected {
            args.extend(affected.iter().map(|p| p.display().to_string()));
        }
        args
    }
}

#[async_trait]
impl BuildBackend for CommandBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn detect(&self) -> bool {
        if find_program(&self.program).is_none() {
            debug!(backend = %self.name, program = ?self.program, "Program not found");
            return false;
        }
        match &self.marker {
            Some(marker) => self.cwd.join(marker).exists(),
            None => true,
        }
    }

    async fn build(&self, affected: &[PathBuf]) -> Result<BuildReport, BuildError> {
        let args = self.command_line(affected);
        let start = Instant::now();

        info!(backend = %self.name, affected = affected.len(), "Running build");

        let output = Command::new(&self.program)
            .args(&args)
            .current_dir(&self.cwd)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| BuildError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let duration = start.elapsed();
        *self.last_duration.lock() = duration;

        let mut combined = bounded_utf8(&output.stdout, self.max_output);
        let stderr = bounded_utf8(&output.stderr, self.max_output);
        if !stderr.is_empty() {
            if !combined.is_empty() && !combined.ends_with('\n') {
                combined.push('\n');
            }
            combined.push_str(&stderr);
        }

        debug!(
            backend = %self.name,
            status = %output.status,
            duration_ms = duration.as_millis() as u64,
            "Build finished"
        );

        Ok(BuildReport {
            success: output.status.success(),
            output: combined,
            duration,
        })
    }

    fn last_build_duration(&self) -> Duration {
        *self.last_duration.lock()
    }

    fn artifact(&self) -> Artifact {
        self.artifact.clone()
    }
}

/// Locate `program` the way a shell would: as a path if it has separators,
/// otherwise by searching `PATH`.
pub fn find_program(program: &Path) -> Option<PathBuf> {
    if program.components().count() > 1 {
        return program.is_file().then(|| program.to_path_buf());
    }

    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var).find_map(|dir| {
        let candidate = dir.join(program);
        if candidate.is_file() {
            return Some(candidate);
        }
        if cfg!(windows) {
            let exe = candidate.with_extension("exe");
            if exe.is_file() {
                return Some(exe);
            }
        }
        None
    })
}

fn bounded_utf8(bytes: &[u8], max: usize) -> String {
    if bytes.len() <= max {
        return String::from_utf8_lossy(bytes).into_owned();
    }
    let mut s = String::from_utf8_lossy(&bytes[..max]).into_owned();
    s.push_str("\n... (output truncated)");
    s
}
