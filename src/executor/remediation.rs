//! Fixed escalation sequence run when a direct delete fails.
//!
//! Each step is a command template. `{path}` and `{identity}` are
//! substituted per target; `{ps_path}` is the path escaped for a
//! single-quoted PowerShell string. `{path}` is spliced in as raw OS
//! bytes, so every step gets exactly the directory it was handed.

use crate::executor::runner::{CommandLine, CommandOutcome, CommandRunner, STEP_TIMEOUT};
use crate::executor::sink::Sink;
use std::ffi::{OsStr, OsString};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    TakeOwnership,
    GrantFullControl,
    ClearAttributes,
    ForceDelete,
}

/// One remediation command, defined once as static data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemediationStep {
    pub kind: StepKind,
    pub description: &'static str,
    pub program: &'static str,
    pub args: &'static [&'static str],
}

impl RemediationStep {
    pub fn command(&self, path: &Path, identity: &str) -> CommandLine {
        self.args.iter().fold(CommandLine::new(self.program), |cmd, arg| {
            cmd.arg(substitute(arg, path.as_os_str(), identity))
        })
    }

    /// Human-readable line for the log; the path is shown lossily.
    pub fn describe(&self, path: &Path, identity: &str) -> String {
        substitute(self.description, path.as_os_str(), identity)
            .to_string_lossy()
            .into_owned()
    }
}

const PATH_PLACEHOLDER: &str = "{path}";

fn substitute(template: &str, path: &OsStr, identity: &str) -> OsString {
    let mut out = OsString::new();
    let mut rest = template;

    while let Some(at) = rest.find(PATH_PLACEHOLDER) {
        out.push(fill_text(&rest[..at], path, identity));
        out.push(path);
        rest = &rest[at + PATH_PLACEHOLDER.len()..];
    }
    out.push(fill_text(rest, path, identity));
    out
}

/// Placeholders that live inside text rather than standing for the path.
fn fill_text(text: &str, path: &OsStr, identity: &str) -> String {
    let mut text = text.replace("{identity}", identity);
    if text.contains("{ps_path}") {
        // PowerShell only sees a script string here.
        let quoted = path.to_string_lossy().replace('\'', "''");
        text = text.replace("{ps_path}", &quoted);
    }
    text
}

pub static WINDOWS_STEPS: [RemediationStep; 4] = [
    RemediationStep {
        kind: StepKind::TakeOwnership,
        description: "Taking ownership of {path}...",
        program: "takeown",
        args: &["/f", "{path}", "/r", "/d", "Y"],
    },
    RemediationStep {
        kind: StepKind::GrantFullControl,
        description: "Granting full control to {identity}...",
        program: "icacls",
        args: &["{path}", "/grant", "{identity}:(F)", "/t", "/c"],
    },
    RemediationStep {
        kind: StepKind::ClearAttributes,
        description: "Clearing read-only, system and hidden attributes...",
        program: "attrib",
        args: &["-r", "-s", "-h", "{path}\\*", "/s", "/d"],
    },
    RemediationStep {
        kind: StepKind::ForceDelete,
        description: "Force-removing {path}...",
        program: "powershell",
        args: &[
            "-NoProfile",
            "-Command",
            "Remove-Item -LiteralPath '{ps_path}' -Recurse -Force",
        ],
    },
];

#[cfg(target_os = "linux")]
const CLEAR_ATTRIBUTES_UNIX: RemediationStep = RemediationStep {
    kind: StepKind::ClearAttributes,
    description: "Clearing immutable and append-only attributes...",
    program: "chattr",
    args: &["-R", "-i", "-a", "{path}"],
};

#[cfg(not(target_os = "linux"))]
const CLEAR_ATTRIBUTES_UNIX: RemediationStep = RemediationStep {
    kind: StepKind::ClearAttributes,
    description: "Clearing immutable flags...",
    program: "chflags",
    args: &["-R", "nouchg,noschg", "{path}"],
};

pub static UNIX_STEPS: [RemediationStep; 4] = [
    RemediationStep {
        kind: StepKind::TakeOwnership,
        description: "Taking ownership of {path}...",
        program: "chown",
        args: &["-R", "{identity}", "{path}"],
    },
    RemediationStep {
        kind: StepKind::GrantFullControl,
        description: "Granting full control to {identity}...",
        program: "chmod",
        args: &["-R", "u+rwX", "{path}"],
    },
    CLEAR_ATTRIBUTES_UNIX,
    RemediationStep {
        kind: StepKind::ForceDelete,
        description: "Force-removing {path}...",
        program: "rm",
        args: &["-rf", "{path}"],
    },
];

/// What happened to a single step.
#[derive(Debug, Clone)]
pub struct StepReport {
    pub kind: StepKind,
    pub command: CommandLine,
    pub outcome: CommandOutcome,
}

#[derive(Debug, Clone, Default)]
pub struct ChainResult {
    pub steps: Vec<StepReport>,
}

impl ChainResult {
    /// Only the final (forced delete) step decides the result. The
    /// directory is not re-checked afterwards.
    pub fn succeeded(&self) -> bool {
        self.steps
            .last()
            .map(|s| s.kind == StepKind::ForceDelete && s.outcome.is_success())
            .unwrap_or(false)
    }

    pub fn final_outcome(&self) -> Option<&CommandOutcome> {
        self.steps.last().map(|s| &s.outcome)
    }
}

/// Ordered, stateless list of remediation steps reused for every target.
#[derive(Debug, Clone)]
pub struct RemediationChain {
    steps: &'static [RemediationStep],
    timeout: Duration,
}

impl RemediationChain {
    pub fn new(steps: &'static [RemediationStep]) -> Self {
        Self {
            steps,
            timeout: STEP_TIMEOUT,
        }
    }

    pub fn windows() -> Self {
        Self::new(&WINDOWS_STEPS)
    }

    pub fn unix() -> Self {
        Self::new(&UNIX_STEPS)
    }

    pub fn for_current_platform() -> Self {
        if cfg!(windows) {
            Self::windows()
        } else {
            Self::unix()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn steps(&self) -> &[RemediationStep] {
        self.steps
    }

    /// Run every step in order. A failing step is logged and the next step
    /// still runs.
    pub async fn apply(
        &self,
        runner: &dyn CommandRunner,
        path: &Path,
        identity: &str,
        sink: &dyn Sink,
    ) -> ChainResult {
        let mut result = ChainResult::default();

        for step in self.steps {
            let description = step.describe(path, identity);
            let command = step.command(path, identity);

            sink.log_message(&description);
            tracing::debug!(step = ?step.kind, command = %command, "remediation step");

            let outcome = runner.execute(&command, self.timeout).await;
            match &outcome {
                CommandOutcome::Success { .. } => {}
                CommandOutcome::Failure { exit_code, stderr } => {
                    let code = exit_code
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "signal".to_string());
                    sink.log_message(&format!(
                        "[!] Error in: {} (exit {}) {}",
                        description,
                        code,
                        one_line(stderr)
                    ));
                }
                CommandOutcome::TimedOut => {
                    sink.log_message(&format!(
                        "[!] Timed out after {}s: {}",
                        self.timeout.as_secs(),
                        description
                    ));
                }
                CommandOutcome::SpawnError(reason) => {
                    sink.log_message(&format!(
                        "[!] Could not run {}: {}",
                        step.program, reason
                    ));
                }
            }

            result.steps.push(StepReport {
                kind: step.kind,
                command,
                outcome,
            });
        }

        result
    }
}

/// Collapse multi-line command output into a single log line.
fn one_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" | ")
}
