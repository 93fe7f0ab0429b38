//! Task resolution: turn an invocation into the command line to run.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::info;

use super::payload::Invocation;
use super::runner::shell_quote;
use crate::errors::WebhookError;

/// Task name reported for the fixed strategy.
pub const FIXED_TASK_NAME: &str = "post-update";

/// How an invocation is mapped to a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskResolver {
    /// Tasks are looked up by identifier. Commands may be script paths or
    /// arbitrary shell expressions.
    Named(BTreeMap<String, String>),
    /// A single implicit task: run the post-update script. The script must
    /// exist when the request arrives.
    Fixed { script: PathBuf },
}

/// A resolved, ready-to-run task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTask {
    pub name: String,
    /// Shell-interpreted command line; invocation params are appended as
    /// positional arguments.
    pub command: String,
}

impl TaskResolver {
    pub fn resolve(&self, invocation: &Invocation) -> Result<ResolvedTask, WebhookError> {
        match self {
            TaskResolver::Named(tasks) => {
                let command = tasks
                    .get(&invocation.task)
                    .ok_or_else(|| WebhookError::UnknownTask(invocation.task.clone()))?;

                let as_path = match invocation.working_dir() {
                    Some(dir) => dir.join(command),
                    None => PathBuf::from(command),
                };
                if !as_path.is_file() {
                    info!(
                        task = %invocation.task,
                        command = %command,
                        "Task script not found, running as shell command"
                    );
                }

                Ok(ResolvedTask {
                    name: invocation.task.clone(),
                    command: command.clone(),
                })
            }
            TaskResolver::Fixed { script } => {
                if !script.is_file() {
                    return Err(WebhookError::ScriptNotFound(script.clone()));
                }
                Ok(ResolvedTask {
                    name: FIXED_TASK_NAME.to_string(),
                    command: shell_quote(&script.to_string_lossy()),
                })
            }
        }
    }

    /// Short strategy label for logs and `--check`.
    pub fn strategy(&self) -> &'static str {
        match self {
            TaskResolver::Named(_) => "named",
            TaskResolver::Fixed { .. } => "fixed",
        }
    }

    pub fn task_names(&self) -> Vec<&str> {
        match self {
            TaskResolver::Named(tasks) => tasks.keys().map(String::as_str).collect(),
            TaskResolver::Fixed { .. } => vec![FIXED_TASK_NAME],
        }
    }

    /// The post-update script, for the fixed strategy.
    pub fn script(&self) -> Option<&Path> {
        match self {
            TaskResolver::Named(_) => None,
            TaskResolver::Fixed { script } => Some(script),
        }
    }
}
