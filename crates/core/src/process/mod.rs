//! Supervision of external downloader processes.
//!
//! A `ProcessBackend` starts one process per `LaunchSpec` and hands back a
//! `LaunchedProcess`: a stream of output lines, a one-shot exit result, and a
//! `Terminator`. Those three pieces are the whole capability surface the rest of
//! the crate relies on, so any process-spawning library can sit behind the trait.
//!
//! `ProcessSupervisor` keeps at most one live process per job id, relays every
//! output line and then the exit result to a `ProcessObserver`, and can terminate
//! a process through the `ProcessHandle` returned from `spawn`.

mod command;
mod error;
mod supervisor;
mod traits;
mod types;

pub use command::CommandBackend;
pub use error::SupervisorError;
pub use supervisor::{ProcessHandle, ProcessSupervisor};
pub use traits::{LaunchedProcess, ProcessBackend, ProcessObserver, Terminator};
pub use types::{LaunchSpec, ProcessExit};
