// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`command`] builds shell commands and pipes assets through external
//!   transformation units.
//! - [`supervisor`] owns the long-running server-under-development.
//! - [`test_runner`] runs the test runner, optionally against an isolated
//!   server instance.

pub mod command;
pub mod supervisor;
pub mod test_runner;

pub use supervisor::{
    spawn_supervisor, ServerRestarter, SupervisorEvent, SupervisorHandle, SupervisorOptions,
    SupervisorRestarter, SupervisorState,
};
pub use test_runner::TestOrchestrator;
