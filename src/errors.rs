//! Typed error hierarchy for gardinar.
//!
//! Three enums cover the three failure surfaces:
//! - `ConfigError`: startup configuration failures (fatal, before any request)
//! - `ExecError`: one external process run that did not succeed
//! - `WebhookError`: per-request pipeline failures, each mapped to exactly one
//!   HTTP response by `webhook::response`

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors raised while loading and validating the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found at {path}: {source}")]
    NotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("'{}' is a directory, not a normal file", path.display())]
    IsDirectory { path: PathBuf },

    #[error("Failed to read config file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("secret_key must not be empty")]
    EmptySecret,

    #[error("config must define either 'tasks' or 'post_update_script'")]
    NoTaskStrategy,

    #[error("config defines both 'tasks' and 'post_update_script'; pick one")]
    AmbiguousTaskStrategy,

    #[error("Cannot resolve post_update_script {path}: {source}")]
    ScriptPath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("'tasks' must contain at least one entry")]
    NoTasks,

    #[error("Invalid listen port '{0}'")]
    InvalidPort(String),

    #[error("Invalid secret header name '{0}'")]
    InvalidHeaderName(String),
}

/// Why a single external process run did not succeed.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to collect process output: {0}")]
    Wait(#[source] std::io::Error),

    #[error("exit status {code}")]
    NonZeroExit { code: i32 },

    #[error("terminated by signal {signal}")]
    Signaled { signal: i32 },

    #[error("timed out after {limit:?}")]
    TimedOut { limit: Duration },
}

/// Terminal outcome of a webhook request that did not succeed.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Failed to read request body: {0}")]
    BodyUnreadable(String),

    #[error("Failed to decode webhook payload: {0}")]
    MalformedPayload(#[source] serde_json::Error),

    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("invalid branch name '{0}'")]
    InvalidBranch(String),

    #[error("task '{0}' not found in config")]
    UnknownTask(String),

    #[error("post-update script '{}' not found", .0.display())]
    ScriptNotFound(PathBuf),

    #[error("Revision sync failed: git {step} '{branch}': {source}")]
    SyncFailed {
        step: &'static str,
        branch: String,
        output: String,
        #[source]
        source: ExecError,
    },

    #[error("Task '{task}' failed: {source}")]
    ExecutionFailed {
        task: String,
        output: String,
        #[source]
        source: ExecError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_is_directory_names_path() {
        let err = ConfigError::IsDirectory {
            path: PathBuf::from("/etc/gardinar"),
        };
        assert_eq!(
            err.to_string(),
            "'/etc/gardinar' is a directory, not a normal file"
        );
    }

    #[test]
    fn config_error_not_found_carries_io_kind() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = ConfigError::NotFound {
            path: PathBuf::from("config.yaml"),
            source: io_err,
        };
        match &err {
            ConfigError::NotFound { path, source } => {
                assert_eq!(path, &PathBuf::from("config.yaml"));
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            _ => panic!("Expected NotFound"),
        }
    }

    #[test]
    fn exec_error_messages_name_the_cause() {
        assert_eq!(ExecError::NonZeroExit { code: 3 }.to_string(), "exit status 3");
        assert_eq!(
            ExecError::Signaled { signal: 9 }.to_string(),
            "terminated by signal 9"
        );
        assert_eq!(
            ExecError::TimedOut {
                limit: Duration::from_secs(30)
            }
            .to_string(),
            "timed out after 30s"
        );
        assert_eq!(
            ExecError::TimedOut {
                limit: Duration::from_millis(500)
            }
            .to_string(),
            "timed out after 500ms"
        );
    }

    #[test]
    fn unknown_task_names_the_task() {
        let err = WebhookError::UnknownTask("deploy".into());
        assert_eq!(err.to_string(), "task 'deploy' not found in config");
    }

    #[test]
    fn execution_failed_exposes_exec_error_as_source() {
        use std::error::Error as _;
        let err = WebhookError::ExecutionFailed {
            task: "deploy".into(),
            output: "boom".into(),
            source: ExecError::NonZeroExit { code: 1 },
        };
        assert_eq!(err.to_string(), "Task 'deploy' failed: exit status 1");
        let source = err.source().expect("source should be set");
        assert_eq!(source.to_string(), "exit status 1");
    }

    #[test]
    fn sync_failed_names_step_and_branch() {
        let err = WebhookError::SyncFailed {
            step: "checkout",
            branch: "main".into(),
            output: String::new(),
            source: ExecError::NonZeroExit { code: 128 },
        };
        assert_eq!(
            err.to_string(),
            "Revision sync failed: git checkout 'main': exit status 128"
        );
    }

    #[test]
    fn all_error_types_implement_std_error_trait() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&ConfigError::EmptySecret);
        assert_std_error(&ExecError::TimedOut {
            limit: Duration::from_secs(1),
        });
        assert_std_error(&WebhookError::Unauthorized);
    }
}
