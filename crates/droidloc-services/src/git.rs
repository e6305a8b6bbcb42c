use crate::Result;
use droidloc_config::{GitCfg, DEFAULT_COMMIT_MESSAGE};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GitError {
    #[error("failed to run git: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("`git {args}` exited with {status}: {stderr}")]
    Failed {
        args: String,
        status: String,
        stderr: String,
    },
}

/// Commits generated files. Identity is passed per invocation with `-c`,
/// so no repository or global git configuration is modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitBookkeeping {
    pub repo: PathBuf,
    pub message: String,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub push: bool,
}

impl GitBookkeeping {
    pub fn new(repo: impl Into<PathBuf>) -> Self {
        Self {
            repo: repo.into(),
            message: DEFAULT_COMMIT_MESSAGE.to_string(),
            user_name: None,
            user_email: None,
            push: false,
        }
    }

    pub fn from_config(cfg: &GitCfg) -> Self {
        let mut git = Self::new(cfg.repo.as_deref().unwrap_or("."));
        if let Some(m) = &cfg.message {
            git.message = m.clone();
        }
        git.user_name = cfg.user_name.clone();
        git.user_email = cfg.user_email.clone();
        git.push = cfg.push.unwrap_or(false);
        git
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new("git");
        cmd.arg("-C").arg(&self.repo);
        if let Some(name) = &self.user_name {
            cmd.arg("-c").arg(format!("user.name={name}"));
        }
        if let Some(email) = &self.user_email {
            cmd.arg("-c").arg(format!("user.email={email}"));
        }
        cmd
    }

    fn run(&self, args: &[OsString]) -> std::result::Result<Output, GitError> {
        tracing::debug!(event = "git_run", args = ?args);
        let out = self.command().args(args).output()?;
        Ok(out)
    }

    fn run_checked(&self, args: &[OsString]) -> std::result::Result<Output, GitError> {
        let out = self.run(args)?;
        if !out.status.success() {
            return Err(failure(args, &out));
        }
        Ok(out)
    }

    /// Stage and commit exactly `files`. Returns the short commit hash, or
    /// `None` when the files match what is already committed.
    pub fn commit(&self, files: &[PathBuf]) -> Result<Option<String>> {
        if files.is_empty() {
            return Ok(None);
        }
        let paths = absolute_paths(files)?;

        let mut add: Vec<OsString> = vec!["add".into(), "--".into()];
        add.extend(paths.iter().map(|p| p.as_os_str().to_owned()));
        self.run_checked(&add)?;

        let mut diff: Vec<OsString> = vec![
            "diff".into(),
            "--cached".into(),
            "--quiet".into(),
            "--".into(),
        ];
        diff.extend(paths.iter().map(|p| p.as_os_str().to_owned()));
        // exit 0: nothing staged for these paths, 1: changes
        let out = self.run(&diff)?;
        match out.status.code() {
            Some(0) => {
                tracing::info!(event = "git_nothing_to_commit");
                return Ok(None);
            }
            Some(1) => {}
            _ => return Err(failure(&diff, &out).into()),
        }

        let mut commit: Vec<OsString> = vec![
            "commit".into(),
            "-m".into(),
            self.message.clone().into(),
            "--".into(),
        ];
        commit.extend(paths.iter().map(|p| p.as_os_str().to_owned()));
        self.run_checked(&commit)?;

        let rev = self.run_checked(&["rev-parse".into(), "--short".into(), "HEAD".into()])?;
        let hash = String::from_utf8_lossy(&rev.stdout).trim().to_string();
        tracing::info!(event = "git_committed", commit = %hash, files = paths.len());

        if self.push {
            self.run_checked(&["push".into()])?;
            tracing::info!(event = "git_pushed");
        }
        Ok(Some(hash))
    }
}

fn failure(args: &[OsString], out: &Output) -> GitError {
    GitError::Failed {
        args: args
            .iter()
            .map(|a| a.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" "),
        status: out.status.to_string(),
        stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
    }
}

fn absolute_paths(files: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut out = Vec::with_capacity(files.len());
    for f in files {
        out.push(std::fs::canonicalize(f)?);
    }
    Ok(out)
}

/// True when `git` can be executed at all.
pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// True when `dir` is inside a git work tree.
pub fn is_work_tree(dir: &Path) -> bool {
    Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(["rev-parse", "--is-inside-work-tree"])
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}
