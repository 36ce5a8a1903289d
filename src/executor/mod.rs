pub mod batch;
pub mod cancel;
pub mod direct;
pub mod progress;
pub mod remediation;
pub mod runner;
pub mod sink;

// Re-exports for the command driver and integration tests
pub use batch::{Batch, BatchRemover, DirectoryTarget, RunResult, TargetOutcome};
pub use cancel::CancellationToken;
pub use direct::{DirectRemoval, DirectRemovalError, FailureKind, FsRemoval};
pub use progress::ProgressTracker;
pub use remediation::{ChainResult, RemediationChain, RemediationStep, StepKind};
pub use runner::{CommandLine, CommandOutcome, CommandRunner, ProcessRunner, STEP_TIMEOUT};
pub use sink::{FanOutSink, Sink};
