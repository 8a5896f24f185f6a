//! hotloop build
//!
//! Build backends (the tools that turn a change into artifacts), the
//! registry that picks one at startup, and the supervisor that keeps the
//! built program running.

pub mod backend;
mod error;
pub mod registry;
pub mod supervisor;

pub use backend::{find_program, Artifact, BuildBackend, BuildReport, CommandBackend};
pub use error::BuildError;
pub use registry::BackendRegistry;
pub use supervisor::{LaunchSpec, ProcessSupervisor, StopOutcome, DEFAULT_GRACE_PERIOD};
