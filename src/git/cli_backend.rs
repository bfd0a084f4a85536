use std::path::Path;
use std::process::Command;

use super::{HeadCommit, SyncError, Vcs};
use crate::auth::AuthedUrl;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &str, args: &[String], cwd: &Path) -> std::io::Result<CommandOutput>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, program: &str, args: &[String], cwd: &Path) -> std::io::Result<CommandOutput> {
        let output = Command::new(program).args(args).current_dir(cwd).output()?;
        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

pub struct GitCli<R = ProcessRunner> {
    program: String,
    runner: R,
}

impl GitCli<ProcessRunner> {
    pub fn new() -> Self {
        Self {
            program: "git".to_string(),
            runner: ProcessRunner,
        }
    }
}

impl<R: CommandRunner> GitCli<R> {
    fn git(
        &self,
        action: &'static str,
        args: &[String],
        cwd: &Path,
    ) -> Result<CommandOutput, SyncError> {
        let out = self
            .runner
            .run(&self.program, args, cwd)
            .map_err(|err| SyncError::Spawn {
                action,
                message: err.to_string(),
            })?;
        if out.success {
            return Ok(out);
        }
        let stderr = if out.stderr.trim().is_empty() {
            out.stdout
        } else {
            out.stderr
        };
        match out.code {
            Some(code) => Err(SyncError::Exit {
                action,
                code,
                stderr: stderr.trim().to_string(),
            }),
            None => Err(SyncError::Killed { action }),
        }
    }
}

impl<R: CommandRunner> Vcs for GitCli<R> {
    fn clone_repo(&self, url: &AuthedUrl, dest: &Path) -> Result<(), SyncError> {
        let cwd = dest.parent().unwrap_or(Path::new("."));
        let args = vec![
            "clone".to_string(),
            url.as_str().to_string(),
            dest.to_string_lossy().into_owned(),
        ];
        self.git("clone", &args, cwd)?;
        Ok(())
    }

    fn update(&self, dest: &Path) -> Result<(), SyncError> {
        self.git("pull", &["pull".to_string()], dest)?;
        Ok(())
    }

    fn head_commit(&self, dest: &Path) -> Result<HeadCommit, SyncError> {
        let head = self.git(
            "rev-parse",
            &["rev-parse".to_string(), "HEAD".to_string()],
            dest,
        )?;
        let log = self.git(
            "log",
            &[
                "log".to_string(),
                "-1".to_string(),
                "--format=%cd".to_string(),
            ],
            dest,
        )?;
        Ok(HeadCommit {
            hash: head.stdout.trim().to_string(),
            committed_at: log.stdout.trim().to_string(),
        })
    }
}
