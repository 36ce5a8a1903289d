use async_trait::async_trait;
use std::ffi::OsString;
use std::fmt;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Per-command upper bound for every external step.
pub const STEP_TIMEOUT: Duration = Duration::from_secs(300);

#[cfg(windows)]
const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;

/// A program plus its argument vector. Never passed through a shell.
///
/// Arguments are OS strings so paths reach the child byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl CommandLine {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            let arg = arg.to_string_lossy();
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Classified result of running one external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Success { stdout: String, stderr: String },
    /// `exit_code` is `None` when the process was killed by a signal.
    Failure {
        exit_code: Option<i32>,
        stderr: String,
    },
    TimedOut,
    SpawnError(String),
}

impl CommandOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CommandOutcome::Success { .. })
    }
}

/// Executes external commands. Implementations never panic or error out;
/// every result is classified into a `CommandOutcome`.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn execute(&self, command: &CommandLine, timeout: Duration) -> CommandOutcome;
}

/// Runs commands as real child processes.
///
/// Each child gets its own process group, so a Ctrl-C aimed at forcerm's
/// terminal group never reaches a step that is still running.
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn execute(&self, command: &CommandLine, timeout: Duration) -> CommandOutcome {
        tracing::debug!(command = %command, timeout_secs = timeout.as_secs(), "spawning");

        let mut child = Command::new(&command.program);
        child
            .args(&command.args)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        #[cfg(unix)]
        child.process_group(0);
        #[cfg(windows)]
        child.creation_flags(CREATE_NEW_PROCESS_GROUP);

        let output = match tokio::time::timeout(timeout, child.output()).await {
            Err(_) => {
                tracing::warn!(command = %command, "timed out");
                return CommandOutcome::TimedOut;
            }
            Ok(Err(e)) => {
                tracing::debug!(command = %command, error = %e, "spawn failed");
                return CommandOutcome::SpawnError(e.to_string());
            }
            Ok(Ok(output)) => output,
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if output.status.success() {
            CommandOutcome::Success { stdout, stderr }
        } else {
            tracing::debug!(command = %command, status = %output.status, "command failed");
            CommandOutcome::Failure {
                exit_code: output.status.code(),
                stderr,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_display_quotes_spaces() {
        let cmd = CommandLine::new("icacls")
            .arg("C:\\My Files")
            .arg("/t");
        assert_eq!(cmd.to_string(), "icacls \"C:\\My Files\" /t");
    }

    #[tokio::test]
    async fn test_spawn_error_for_missing_program() {
        let runner = ProcessRunner::new();
        let cmd = CommandLine::new("forcerm-definitely-not-a-real-program");

        let outcome = runner.execute(&cmd, Duration::from_secs(5)).await;

        assert!(matches!(outcome, CommandOutcome::SpawnError(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_success_captures_stdout() {
        let runner = ProcessRunner::new();
        let cmd = CommandLine::new("echo").arg("hello");

        match runner.execute(&cmd, Duration::from_secs(5)).await {
            CommandOutcome::Success { stdout, .. } => assert_eq!(stdout.trim(), "hello"),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_failure() {
        let runner = ProcessRunner::new();
        let cmd = CommandLine::new("sh").arg("-c").arg("echo oops >&2; exit 3");

        match runner.execute(&cmd, Duration::from_secs(5)).await {
            CommandOutcome::Failure { exit_code, stderr } => {
                assert_eq!(exit_code, Some(3));
                assert_eq!(stderr.trim(), "oops");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_utf8_argument_is_passed_verbatim() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let runner = ProcessRunner::new();
        let raw = OsStr::from_bytes(b"bad\xffname");
        let cmd = CommandLine::new("printf").arg("%s").arg(raw);

        match runner.execute(&cmd, Duration::from_secs(5)).await {
            CommandOutcome::Success { stdout, .. } => {
                assert_eq!(stdout, String::from_utf8_lossy(b"bad\xffname"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    /// Reads the process group id (field 5 of /proc/<pid>/stat).
    #[cfg(target_os = "linux")]
    fn own_process_group() -> String {
        let stat = std::fs::read_to_string("/proc/self/stat").unwrap();
        let after_comm = &stat[stat.rfind(')').unwrap() + 2..];
        after_comm.split_whitespace().nth(2).unwrap().to_string()
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_child_leads_its_own_process_group() {
        let runner = ProcessRunner::new();
        let cmd = CommandLine::new("sh")
            .arg("-c")
            .arg("echo $$ $(cut -d' ' -f5 /proc/$$/stat)");

        let stdout = match runner.execute(&cmd, Duration::from_secs(5)).await {
            CommandOutcome::Success { stdout, .. } => stdout,
            other => panic!("unexpected outcome: {:?}", other),
        };
        let ids: Vec<&str> = stdout.split_whitespace().collect();

        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0], ids[1], "child is not a group leader");
        assert_ne!(ids[1], own_process_group());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_is_classified() {
        let runner = ProcessRunner::new();
        let cmd = CommandLine::new("sleep").arg("5");

        let outcome = runner.execute(&cmd, Duration::from_millis(100)).await;

        assert_eq!(outcome, CommandOutcome::TimedOut);
    }
}
