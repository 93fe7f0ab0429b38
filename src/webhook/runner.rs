//! Process seam shared by the executor and the revision synchronizer.
//!
//! Every external process goes through [`CommandRunner`]. The production
//! implementation, [`ShellRunner`], hands a script to `sh -c` and passes the
//! caller's values as positional parameters, so they reach the program as
//! discrete arguments and are never parsed by the shell. Each script starts
//! with `exec 2>&1`, which folds stderr into the stdout pipe and keeps the two
//! streams interleaved in the order they were written.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::warn;

use crate::errors::ExecError;

/// `$0` for task scripts; shows up in shell diagnostics.
const TASK_SCRIPT_NAME: &str = "gardinar";

/// How long to keep reading pipes after a killed task.
const DRAIN_GRACE: Duration = Duration::from_millis(200);

/// A script to run under the command interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    /// Script text passed to `sh -c`.
    pub script: String,
    /// Value bound to `$0`.
    pub name: String,
    /// Positional parameters (`"$@"`).
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

impl ShellCommand {
    /// A configured command line followed by the caller's parameters.
    ///
    /// `command` is shell-interpreted (it may be a script path or any shell
    /// expression); `params` are appended via `"$@"`.
    pub fn task(command: &str, params: &[String]) -> Self {
        Self {
            script: format!("exec 2>&1\n{} \"$@\"", command),
            name: TASK_SCRIPT_NAME.to_string(),
            args: params.to_vec(),
            working_dir: None,
            timeout: None,
        }
    }

    /// A program invoked directly with an argument vector.
    pub fn program(program: &str, args: &[&str]) -> Self {
        Self {
            script: "exec 2>&1\nexec \"$0\" \"$@\"".to_string(),
            name: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            working_dir: None,
            timeout: None,
        }
    }

    pub fn in_dir(mut self, dir: Option<&Path>) -> Self {
        self.working_dir = dir.map(Path::to_path_buf);
        self
    }

    pub fn with_timeout(mut self, limit: Option<Duration>) -> Self {
        self.timeout = limit;
        self
    }
}

/// Terminal result of one process run: the combined output and, on failure,
/// why it failed.
#[derive(Debug)]
pub struct CommandOutput {
    pub output: String,
    pub error: Option<ExecError>,
}

impl CommandOutput {
    pub fn succeeded(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            error: None,
        }
    }

    pub fn failed(output: impl Into<String>, error: ExecError) -> Self {
        Self {
            output: output.into(),
            error: Some(error),
        }
    }

    pub fn success(&self) -> bool {
        self.error.is_none()
    }

    /// Split into the captured output and the failure, if any.
    pub fn into_result(self) -> Result<String, (String, ExecError)> {
        match self.error {
            None => Ok(self.output),
            Some(err) => Err((self.output, err)),
        }
    }
}

/// Abstraction over process spawning for testability.
/// Real implementation: `ShellRunner`.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `cmd` to completion and capture its combined output.
    async fn run(&self, cmd: &ShellCommand) -> CommandOutput;
}

/// Runs scripts with a POSIX shell via `tokio::process`.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: PathBuf,
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self {
            shell: PathBuf::from("/bin/sh"),
        }
    }
}

impl ShellRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different interpreter (must accept `-c script name args...`).
    pub fn with_shell(shell: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, cmd: &ShellCommand) -> CommandOutput {
        let mut command = Command::new(&self.shell);
        command
            .arg("-c")
            .arg(&cmd.script)
            .arg(&cmd.name)
            .args(&cmd.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &cmd.working_dir {
            command.current_dir(dir);
        }

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(source) => {
                return CommandOutput::failed(
                    String::new(),
                    ExecError::Spawn {
                        program: self.shell.display().to_string(),
                        source,
                    },
                );
            }
        };

        // Both pipes drain into one buffer so a timeout can still report
        // what the task wrote before it was killed.
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(tokio::spawn(drain(stdout, buffer.clone())));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(tokio::spawn(drain(stderr, buffer.clone())));
        }

        let waited = match cmd.timeout {
            Some(limit) => match timeout(limit, child.wait()).await {
                Ok(result) => result,
                Err(_) => {
                    if let Err(e) = child.kill().await {
                        warn!(error = %e, "Failed to kill timed out task");
                    }
                    // Orphaned grandchildren may keep the pipes open.
                    collect(readers, Some(DRAIN_GRACE)).await;
                    return CommandOutput::failed(
                        snapshot(&buffer),
                        ExecError::TimedOut { limit },
                    );
                }
            },
            None => child.wait().await,
        };

        let status = match waited {
            Ok(status) => status,
            Err(e) => {
                collect(readers, Some(DRAIN_GRACE)).await;
                return CommandOutput::failed(snapshot(&buffer), ExecError::Wait(e));
            }
        };

        if let Some(err) = collect(readers, None).await {
            return CommandOutput::failed(snapshot(&buffer), ExecError::Wait(err));
        }
        let combined = snapshot(&buffer);

        match exit_error(status) {
            None => CommandOutput::succeeded(combined),
            Some(err) => CommandOutput::failed(combined, err),
        }
    }
}

type SharedBuffer = Arc<Mutex<Vec<u8>>>;

/// Copy `reader` into `sink` until EOF.
async fn drain<R>(mut reader: R, sink: SharedBuffer) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut chunk = [0u8; 8192];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        sink.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(&chunk[..n]);
    }
}

/// Wait for the pipe readers, at most `grace` each when given. Returns the
/// first read error.
async fn collect(
    readers: Vec<JoinHandle<std::io::Result<()>>>,
    grace: Option<Duration>,
) -> Option<std::io::Error> {
    let mut first_error = None;
    for mut reader in readers {
        let joined = match grace {
            Some(limit) => match timeout(limit, &mut reader).await {
                Ok(joined) => joined,
                Err(_) => {
                    reader.abort();
                    continue;
                }
            },
            None => reader.await,
        };
        if let Ok(Err(e)) = joined {
            first_error.get_or_insert(e);
        }
    }
    first_error
}

fn snapshot(buffer: &SharedBuffer) -> String {
    let bytes = buffer.lock().unwrap_or_else(PoisonError::into_inner);
    String::from_utf8_lossy(&bytes).into_owned()
}

fn exit_error(status: ExitStatus) -> Option<ExecError> {
    if status.success() {
        return None;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return Some(ExecError::Signaled { signal });
        }
    }
    Some(ExecError::NonZeroExit {
        code: status.code().unwrap_or(-1),
    })
}

/// Quote `value` so the shell reads it as a single literal word.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording test double for `CommandRunner`.

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// Records every command and answers from a queue of canned outputs.
    /// An exhausted queue answers with an empty success.
    #[derive(Default)]
    pub struct RecordingRunner {
        calls: Mutex<Vec<ShellCommand>>,
        replies: Mutex<VecDeque<CommandOutput>>,
    }

    impl RecordingRunner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn reply(self, output: CommandOutput) -> Self {
            self.replies.lock().unwrap().push_back(output);
            self
        }

        pub fn calls(&self) -> Vec<ShellCommand> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommandRunner for RecordingRunner {
        async fn run(&self, cmd: &ShellCommand) -> CommandOutput {
            self.calls.lock().unwrap().push(cmd.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| CommandOutput::succeeded(""))
        }
    }
}
