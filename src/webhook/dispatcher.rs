//! The per-request pipeline after authentication:
//! decode → validate → resolve → sync → execute.

use std::sync::Arc;

use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use super::executor::ProcessExecutor;
use super::payload::Invocation;
use super::resolver::TaskResolver;
use super::response::Success;
use super::runner::CommandRunner;
use super::sync::RevisionSynchronizer;
use crate::config::Config;
use crate::errors::WebhookError;

/// Owns the pipeline stages. Built once at startup; holds no per-request
/// state.
pub struct Dispatcher {
    resolver: TaskResolver,
    synchronizer: RevisionSynchronizer,
    executor: ProcessExecutor,
}

impl Dispatcher {
    pub fn new(config: &Config, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            resolver: config.tasks.clone(),
            synchronizer: RevisionSynchronizer::new(runner.clone(), &config.git_path),
            executor: ProcessExecutor::new(runner, config.task_timeout),
        }
    }

    /// Run one invocation from a raw request body. Exactly one task execution
    /// happens per `Ok`; any stage error short-circuits.
    pub async fn dispatch(&self, body: &[u8]) -> Result<Success, WebhookError> {
        let invocation = Invocation::decode(body)
            .inspect_err(|e| warn!(error = %e, "Error decoding webhook"))?;
        invocation
            .validate()
            .inspect_err(|e| warn!(error = %e, "Rejected webhook"))?;

        let span = info_span!(
            "invocation",
            id = %Uuid::new_v4(),
            task = %invocation.task,
            source_dir = %invocation.source_dir,
        );
        self.run(invocation).instrument(span).await
    }

    async fn run(&self, invocation: Invocation) -> Result<Success, WebhookError> {
        info!(
            branch = ?invocation.branch,
            params = ?invocation.params,
            "Received webhook"
        );

        let task = self
            .resolver
            .resolve(&invocation)
            .inspect_err(|e| warn!(error = %e, "Task resolution failed"))?;

        self.synchronizer
            .sync(invocation.branch.as_deref(), invocation.working_dir())
            .await?;

        self.executor.execute(&task, &invocation).await?;
        Ok(Success)
    }
}
