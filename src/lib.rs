//! Crate entry point for **repokeep**.
//!
//! This library provides the internal implementation for the `repokeep` CLI.
//! Each submodule encapsulates one responsibility (roster parsing, git
//! operations, the backup cycle, scheduling, etc.).
//! The `pub use` re-exports make selected commands accessible directly from the crate root.
//!
//! This file is primarily intended for developers hacking on `repokeep`.

mod settings;
mod auth;
mod record;
mod roster;
mod paths;
mod store;
mod git;
mod cycle;
mod notify;
mod schedule;
mod run;
mod discover;
mod status;

/// Re-export commonly used types and commands so they can be accessed from `repokeep::*`.
pub use settings::Settings;
pub use discover::cmd_discover;
pub use run::cmd_run;
pub use schedule::{Shutdown, ShutdownHandle, cmd_daemon, run_daemon};
pub use status::cmd_status;
