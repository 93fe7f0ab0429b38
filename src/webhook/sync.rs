//! Revision synchronization: force the working directory onto a branch and
//! pull it before a task runs.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info};

use super::runner::{CommandRunner, ShellCommand};
use crate::errors::WebhookError;

/// What synchronization did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// No branch was requested.
    Skipped,
    /// Checkout and pull both succeeded.
    Updated { branch: String },
}

/// Brings a checkout to the head of a branch with `git checkout -f` followed
/// by `git pull origin`.
pub struct RevisionSynchronizer {
    runner: Arc<dyn CommandRunner>,
    git_path: PathBuf,
}

impl RevisionSynchronizer {
    pub fn new(runner: Arc<dyn CommandRunner>, git_path: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            git_path: git_path.into(),
        }
    }

    /// Synchronize `dir` to `branch`. A failed step aborts before the next
    /// one runs.
    pub async fn sync(
        &self,
        branch: Option<&str>,
        dir: Option<&Path>,
    ) -> Result<SyncOutcome, WebhookError> {
        let Some(branch) = branch.filter(|b| !b.trim().is_empty()) else {
            debug!("No branch supplied, skipping revision sync");
            return Ok(SyncOutcome::Skipped);
        };

        info!(branch, "Synchronizing working directory");
        self.step("checkout", &["checkout", "-f", branch], branch, dir)
            .await?;
        self.step("pull", &["pull", "origin", branch], branch, dir)
            .await?;

        Ok(SyncOutcome::Updated {
            branch: branch.to_string(),
        })
    }

    async fn step(
        &self,
        step: &'static str,
        args: &[&str],
        branch: &str,
        dir: Option<&Path>,
    ) -> Result<(), WebhookError> {
        let git = self.git_path.to_string_lossy();
        let cmd = ShellCommand::program(&git, args).in_dir(dir);

        match self.runner.run(&cmd).await.into_result() {
            Ok(output) => {
                debug!(step, output = %output.trim_end(), "git step finished");
                Ok(())
            }
            Err((output, source)) => {
                error!(
                    step,
                    branch,
                    dir = ?dir,
                    error = %source,
                    output = %output,
                    "git step failed"
                );
                Err(WebhookError::SyncFailed {
                    step,
                    branch: branch.to_string(),
                    output,
                    source,
                })
            }
        }
    }
}
