//! Task execution.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use super::payload::Invocation;
use super::resolver::ResolvedTask;
use super::runner::{CommandRunner, ShellCommand};
use crate::errors::WebhookError;

/// Runs resolved tasks in the invocation's source directory and captures
/// their combined output.
pub struct ProcessExecutor {
    runner: Arc<dyn CommandRunner>,
    /// `None` waits for the task indefinitely.
    timeout: Option<Duration>,
}

impl ProcessExecutor {
    pub fn new(runner: Arc<dyn CommandRunner>, timeout: Option<Duration>) -> Self {
        Self { runner, timeout }
    }

    /// Execute `task` with the invocation's params. Returns the captured
    /// output on success.
    pub async fn execute(
        &self,
        task: &ResolvedTask,
        invocation: &Invocation,
    ) -> Result<String, WebhookError> {
        info!(
            task = %task.name,
            command = %task.command,
            dir = %invocation.source_dir,
            params = ?invocation.params,
            "Executing task"
        );

        let cmd = ShellCommand::task(&task.command, &invocation.params)
            .in_dir(invocation.working_dir())
            .with_timeout(self.timeout);

        match self.runner.run(&cmd).await.into_result() {
            Ok(output) => {
                info!(task = %task.name, output = %output.trim_end(), "Task executed successfully");
                Ok(output)
            }
            Err((output, source)) => {
                error!(
                    task = %task.name,
                    command = %task.command,
                    dir = %invocation.source_dir,
                    error = %source,
                    output = %output,
                    "Error executing task"
                );
                Err(WebhookError::ExecutionFailed {
                    task: task.name.clone(),
                    output,
                    source,
                })
            }
        }
    }
}
