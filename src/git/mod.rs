//! Version-control integration layer.
//!
//! This module wraps the actual backend implementation (`cli_backend`)
//! and re-exports only the stable public API: the [`Vcs`] trait, the
//! [`GitCli`] backend and the [`SyncError`] type.
//!
//! The idea is to hide internal implementation details (currently the `git`
//! binary driven over `std::process`) so that future backends or alternative
//! implementations could be swapped in without affecting the rest of the
//! codebase.

mod cli_backend;

pub use cli_backend::GitCli;

use std::path::Path;
use thiserror::Error;

use crate::auth::AuthedUrl;
use crate::record::SyncFault;

/// Head-of-repository snapshot after a successful sync: the commit id and
/// the committer date string exactly as the backend reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadCommit {
    pub hash: String,
    pub committed_at: String,
}

/// The version-control collaborator. Implementations block until the
/// underlying operation finishes; a hung remote therefore stalls the
/// calling cycle.
pub trait Vcs: Sync {
    /// First-time acquisition into `dest`, which must not exist yet.
    fn clone_repo(&self, url: &AuthedUrl, dest: &Path) -> Result<(), SyncError>;
    /// Bring an existing clone at `dest` up to date with its remote.
    fn update(&self, dest: &Path) -> Result<(), SyncError>;
    /// Query the current head commit of the clone at `dest`.
    fn head_commit(&self, dest: &Path) -> Result<HeadCommit, SyncError>;
}

/// Failure of one repository's sync. Never fatal for the process; the
/// coordinator records it and moves on. The authenticated URL is
/// deliberately absent from every variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("git {action} exited with code {code}: {stderr}")]
    Exit {
        action: &'static str,
        code: i32,
        stderr: String,
    },
    #[error("git {action} was killed before exiting")]
    Killed { action: &'static str },
    #[error("failed to run git {action}: {message}")]
    Spawn {
        action: &'static str,
        message: String,
    },
    #[error("record has no clone URL")]
    MissingUrl,
}

impl From<SyncError> for SyncFault {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Exit { code, .. } => SyncFault::Exit(code),
            other => SyncFault::Message(other.to_string()),
        }
    }
}
