use crate::cli::Cli;
use crate::config::Config;
use crate::error::{ForceRmError, Result};
use crate::executor::{Batch, BatchRemover, CancellationToken, FanOutSink, RunResult, Sink};
use crate::logging::FileLogSink;
use crate::ui::{ConfirmPrompt, ConsoleSink};
use colored::*;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Remove mode: assemble the batch, confirm, run it on a worker task.
///
/// Returns `None` when nothing was run (dry run or declined).
pub async fn execute_remove(cli: &Cli, config: &Config) -> Result<Option<RunResult>> {
    let console = Arc::new(if cli.json {
        ConsoleSink::hidden()
    } else {
        ConsoleSink::new()
    });

    let outcome = remove_with(cli, config, console.clone()).await;
    console.finish();

    if let Ok(Some(result)) = &outcome {
        if cli.json {
            println!("{}", serde_json::to_string_pretty(result)?);
        } else {
            print_summary(result);
        }
    }
    outcome
}

async fn remove_with(
    cli: &Cli,
    config: &Config,
    console: Arc<ConsoleSink>,
) -> Result<Option<RunResult>> {
    // Selection notes wait here until we know a log file is wanted.
    let backlog = Backlog::default();
    let paths = expand_patterns(&cli.paths, &backlog)?;
    let mut batch = select_paths(paths, &backlog);

    if batch.is_empty() {
        backlog.replay(console.as_ref());
        return Err(ForceRmError::EmptyBatch);
    }

    let mut fan_out = FanOutSink::new().with(console);
    if !cli.dry_run {
        let log_dir = cli
            .log_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(&config.log_dir));
        fan_out = fan_out.with(Arc::new(FileLogSink::create(&log_dir)?));
    }
    let sink = Arc::new(fan_out);
    backlog.replay(sink.as_ref());

    let selected: Vec<PathBuf> = batch.iter().map(|t| t.path.clone()).collect();

    // 1. Dry run: list and stop
    if cli.dry_run {
        eprintln!("{} Would remove {} directories:", "[i]".cyan(), selected.len());
        for path in &selected {
            let marker = if path.exists() { "  -" } else { "  ? (missing)" };
            eprintln!("{} {}", marker, path.display());
        }
        return Ok(None);
    }

    // 2. Confirmation
    if !cli.yes && config.confirm {
        let prompt = ConfirmPrompt::new();
        if !prompt.confirm_removal(&selected)? {
            sink.log_message("Removal declined, nothing deleted");
            eprintln!("{}", "[X] Nothing deleted.".yellow());
            return Ok(None);
        }
    }

    let identity = cli
        .identity
        .clone()
        .unwrap_or_else(|| config.resolve_identity());
    let remover = BatchRemover::new(identity)
        .with_file_count(config.count_files && !cli.no_count);

    // 3. Ctrl-C requests a stop before the next directory
    let token = CancellationToken::new();
    let watcher = {
        let token = token.clone();
        let sink = sink.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() && token.cancel() {
                sink.log_message("[!] Operation cancelled by user");
            }
        })
    };

    // 4. Single worker runs the whole batch
    let worker = {
        let token = token.clone();
        let sink = sink.clone();
        tokio::spawn(async move { remover.run(&mut batch, &token, sink.as_ref()).await })
    };

    let outcome = worker.await;
    watcher.abort();

    let result = outcome.map_err(|e| ForceRmError::WorkerFailed(e.to_string()))?;
    Ok(Some(result))
}

/// Holds log lines and the last status until the real sinks exist.
#[derive(Default)]
struct Backlog {
    lines: Mutex<Vec<String>>,
    status: Mutex<Option<String>>,
}

impl Backlog {
    fn replay(&self, sink: &dyn Sink) {
        if let Ok(mut lines) = self.lines.lock() {
            for line in lines.drain(..) {
                sink.log_message(&line);
            }
        }
        if let Ok(mut status) = self.status.lock() {
            if let Some(text) = status.take() {
                sink.update_status(&text);
            }
        }
    }
}

impl Sink for Backlog {
    fn log_message(&self, text: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(text.to_string());
        }
    }

    fn update_status(&self, text: &str) {
        if let Ok(mut status) = self.status.lock() {
            *status = Some(text.to_string());
        }
    }

    fn update_progress(&self, _percentage: f64) {}
}

/// Expand glob entries in place; plain paths pass through untouched.
pub fn expand_patterns(entries: &[String], sink: &dyn Sink) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for entry in entries {
        if !entry.contains(&['*', '?', '['][..]) {
            paths.push(PathBuf::from(entry));
            continue;
        }

        let matches = glob::glob(entry).map_err(|e| ForceRmError::InvalidPattern {
            pattern: entry.clone(),
            reason: e.to_string(),
        })?;

        let before = paths.len();
        paths.extend(matches.filter_map(|p| p.ok()));

        if paths.len() == before {
            sink.log_message(&format!("[!] Pattern matched nothing: {}", entry));
        }
    }

    Ok(paths)
}

/// Build the batch in the given order, ignoring repeats.
pub fn select_paths(paths: Vec<PathBuf>, sink: &dyn Sink) -> Batch {
    let mut batch = Batch::new();

    for path in paths {
        if batch.contains(&path) {
            sink.log_message(&format!("Directory already selected: {}", path.display()));
            continue;
        }
        sink.log_message(&format!("Directory selected: {}", path.display()));
        batch.push(path);
    }

    sink.update_status(&format!("{} directories selected", batch.len()));
    batch
}

fn print_summary(result: &RunResult) {
    if result.cancelled {
        eprintln!("\n{} Run cancelled.", "[!]".yellow().bold());
    } else {
        eprintln!("\n{} Processing finished.", "[OK]".green().bold());
    }
    eprintln!("  - Removed: {}", result.succeeded.to_string().green());
    eprintln!("  - Failed: {}", result.failed.to_string().red());
    eprintln!("  - Skipped (missing): {}", result.skipped.to_string().yellow());
    if result.pending > 0 {
        eprintln!("  - Not processed: {}", result.pending);
    }
    eprintln!("  - Execution time: {}ms", result.duration_ms);

    let failed = result.failed_targets();
    if !failed.is_empty() {
        eprintln!("\n{} Failed directories:", "[X]".red());
        for target in failed {
            eprintln!(
                "  - {}: {}",
                target.path.display(),
                target.detail.as_deref().unwrap_or("unknown error").red()
            );
        }
    }

    if let Some(log) = &result.log_file {
        eprintln!("\n{} Log saved to {}", "[i]".cyan(), log.display());
    }
}
