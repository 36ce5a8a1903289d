use crate::executor::cancel::CancellationToken;
use crate::executor::direct::{DirectRemoval, FsRemoval};
use crate::executor::progress::ProgressTracker;
use crate::executor::remediation::{ChainResult, RemediationChain};
use crate::executor::runner::{CommandOutcome, CommandRunner, ProcessRunner};
use crate::executor::sink::Sink;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Where a target stands within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetOutcome {
    Pending,
    Succeeded,
    Failed,
    Skipped,
}

impl TargetOutcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TargetOutcome::Pending)
    }
}

/// One directory tree to remove.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryTarget {
    pub path: PathBuf,
    pub outcome: TargetOutcome,
    /// Failure reason, or the reason a target was skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Whether the remediation chain was needed.
    pub remediated: bool,
}

impl DirectoryTarget {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            outcome: TargetOutcome::Pending,
            detail: None,
            remediated: false,
        }
    }
}

/// Ordered list of targets. Order is processing order; nothing here
/// deduplicates.
#[derive(Debug, Clone, Default)]
pub struct Batch {
    targets: Vec<DirectoryTarget>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            targets: paths.into_iter().map(DirectoryTarget::new).collect(),
        }
    }

    pub fn push(&mut self, path: impl Into<PathBuf>) {
        self.targets.push(DirectoryTarget::new(path));
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.targets.iter().any(|t| t.path == path)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DirectoryTarget> {
        self.targets.iter()
    }
}

/// Summary of one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunResult {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Targets never reached because the run was cancelled.
    pub pending: usize,
    pub cancelled: bool,
    pub log_file: Option<PathBuf>,
    /// Every target of the batch, in batch order.
    pub targets: Vec<DirectoryTarget>,
    pub duration_ms: u64,
}

impl RunResult {
    pub fn processed(&self) -> usize {
        self.succeeded + self.failed + self.skipped
    }

    /// Nothing failed and nothing was left behind.
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && !self.cancelled
    }

    pub fn failed_targets(&self) -> Vec<&DirectoryTarget> {
        self.targets
            .iter()
            .filter(|t| t.outcome == TargetOutcome::Failed)
            .collect()
    }
}

struct Resolution {
    outcome: TargetOutcome,
    detail: Option<String>,
    remediated: bool,
}

impl Resolution {
    fn new(outcome: TargetOutcome) -> Self {
        Self {
            outcome,
            detail: None,
            remediated: false,
        }
    }

    fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Sequential batch worker: direct delete first, remediation chain on
/// failure, one directory at a time.
pub struct BatchRemover {
    runner: Arc<dyn CommandRunner>,
    removal: Arc<dyn DirectRemoval>,
    chain: RemediationChain,
    identity: String,
    count_files: bool,
}

impl BatchRemover {
    /// Real filesystem, real processes, the chain for this platform.
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            runner: Arc::new(ProcessRunner::new()),
            removal: Arc::new(FsRemoval::new()),
            chain: RemediationChain::for_current_platform(),
            identity: identity.into(),
            count_files: false,
        }
    }

    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_removal(mut self, removal: Arc<dyn DirectRemoval>) -> Self {
        self.removal = removal;
        self
    }

    pub fn with_chain(mut self, chain: RemediationChain) -> Self {
        self.chain = chain;
        self
    }

    pub fn with_file_count(mut self, enabled: bool) -> Self {
        self.count_files = enabled;
        self
    }

    /// Process `batch` in order and clear it.
    ///
    /// Cancellation is checked before each target only; a target already in
    /// progress (including its remediation commands) always finishes. No
    /// error escapes: every failure ends up in the returned summary.
    pub async fn run(
        &self,
        batch: &mut Batch,
        cancel: &CancellationToken,
        sink: &dyn Sink,
    ) -> RunResult {
        let start = Instant::now();
        let total = batch.len();
        let mut tracker = ProgressTracker::new();
        let mut result = RunResult::default();

        sink.update_status("Processing...");

        for (index, target) in batch.targets.iter_mut().enumerate() {
            if cancel.is_cancelled() {
                result.cancelled = true;
                break;
            }

            sink.update_status(&format!(
                "Processing {}/{}: {}",
                index + 1,
                total,
                target.path.display()
            ));

            let resolution = self.process(&target.path, sink).await;
            target.outcome = resolution.outcome;
            target.detail = resolution.detail;
            target.remediated = resolution.remediated;

            match target.outcome {
                TargetOutcome::Succeeded => result.succeeded += 1,
                TargetOutcome::Failed => result.failed += 1,
                TargetOutcome::Skipped => result.skipped += 1,
                TargetOutcome::Pending => {}
            }

            sink.update_progress(tracker.update(index + 1, total));
        }

        result.pending = total - result.processed();
        if result.cancelled {
            sink.log_message(&format!(
                "Run cancelled: {} of {} directories not processed",
                result.pending, total
            ));
        }

        sink.update_progress(tracker.finish());
        sink.update_status(if result.cancelled { "Cancelled" } else { "Ready" });

        result.targets = std::mem::take(&mut batch.targets);
        result.log_file = sink.log_file();
        result.duration_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            succeeded = result.succeeded,
            failed = result.failed,
            skipped = result.skipped,
            pending = result.pending,
            cancelled = result.cancelled,
            "batch finished"
        );

        result
    }

    async fn process(&self, path: &Path, sink: &dyn Sink) -> Resolution {
        if !self.removal.exists(path).await {
            sink.log_message(&format!("[SKIP] Path does not exist: {}", path.display()));
            return Resolution::new(TargetOutcome::Skipped).detail("path does not exist");
        }

        if self.count_files {
            if let Some(count) = self.removal.count_files(path).await {
                sink.log_message(&format!("Found {} files in {}", count, path.display()));
            }
        }

        let err = match self.removal.remove(path).await {
            Ok(()) => {
                sink.log_message(&format!("[OK] Removed {}", path.display()));
                return Resolution::new(TargetOutcome::Succeeded);
            }
            Err(err) => err,
        };

        // Every failure kind escalates; the kind is only reported.
        tracing::debug!(path = %path.display(), kind = ?err.kind, "escalating to remediation");
        sink.log_message(&format!(
            "Direct removal of {} failed ({}), starting remediation",
            path.display(),
            err
        ));

        let chain = self
            .chain
            .apply(self.runner.as_ref(), path, &self.identity, sink)
            .await;

        let mut resolution = if chain.succeeded() {
            sink.log_message(&format!("[OK] Removed {} after remediation", path.display()));
            Resolution::new(TargetOutcome::Succeeded)
        } else {
            let reason = chain_failure_reason(&chain);
            sink.log_message(&format!(
                "[X] Failed to remove {}: {}",
                path.display(),
                reason
            ));
            Resolution::new(TargetOutcome::Failed).detail(reason)
        };
        resolution.remediated = true;
        resolution
    }
}

fn chain_failure_reason(chain: &ChainResult) -> String {
    match chain.final_outcome() {
        None => "remediation chain has no steps".to_string(),
        Some(CommandOutcome::Success { .. }) => "forced delete did not run".to_string(),
        Some(CommandOutcome::Failure { exit_code, stderr }) => {
            let stderr = stderr.trim();
            let code = exit_code
                .map(|c| format!("exit code {}", c))
                .unwrap_or_else(|| "terminated by signal".to_string());
            if stderr.is_empty() {
                format!("forced delete failed ({})", code)
            } else {
                format!("forced delete failed ({}): {}", code, stderr)
            }
        }
        Some(CommandOutcome::TimedOut) => "forced delete timed out".to_string(),
        Some(CommandOutcome::SpawnError(reason)) => {
            format!("forced delete could not start: {}", reason)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_preserves_order_and_duplicates() {
        let batch = Batch::from_paths(["/b", "/a", "/b"]);
        let paths: Vec<&Path> = batch.iter().map(|t| t.path.as_path()).collect();

        assert_eq!(paths, vec![Path::new("/b"), Path::new("/a"), Path::new("/b")]);
        assert!(batch.iter().all(|t| t.outcome == TargetOutcome::Pending));
    }

    #[test]
    fn test_batch_push_and_contains() {
        let mut batch = Batch::new();
        assert!(batch.is_empty());
        batch.push("/x");
        batch.push("/y");

        assert!(batch.contains(Path::new("/y")));
        assert!(!batch.contains(Path::new("/z")));
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn test_run_result_helpers() {
        let mut failed = DirectoryTarget::new("/f");
        failed.outcome = TargetOutcome::Failed;

        let result = RunResult {
            succeeded: 2,
            failed: 1,
            skipped: 1,
            targets: vec![DirectoryTarget::new("/p"), failed],
            ..Default::default()
        };

        assert_eq!(result.processed(), 4);
        assert!(!result.is_clean());
        assert_eq!(result.failed_targets().len(), 1);
    }

    #[test]
    fn test_chain_failure_reason_uses_final_step() {
        use crate::executor::remediation::{StepKind, StepReport};
        use crate::executor::runner::CommandLine;

        let chain = ChainResult {
            steps: vec![StepReport {
                kind: StepKind::ForceDelete,
                command: CommandLine::new("rm"),
                outcome: CommandOutcome::Failure {
                    exit_code: Some(1),
                    stderr: "busy\n".to_string(),
                },
            }],
        };

        assert_eq!(
            chain_failure_reason(&chain),
            "forced delete failed (exit code 1): busy"
        );
    }

    #[test]
    fn test_outcome_serializes_lowercase() {
        let json = serde_json::to_string(&TargetOutcome::Skipped).unwrap();
        assert_eq!(json, "\"skipped\"");
    }
}
