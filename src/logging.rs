use crate::error::{ForceRmError, Result};
use crate::executor::Sink;
use chrono::{DateTime, Local};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Diagnostic output on stderr. `RUST_LOG` wins over `--debug`.
pub fn init_tracing(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(debug)));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .with(filter)
        .init();
}

/// Filter used when `RUST_LOG` is unset.
pub fn default_directive(debug: bool) -> &'static str {
    if debug {
        "forcerm=debug"
    } else {
        "forcerm=warn"
    }
}

/// `[YYYY-MM-DD HH:MM:SS] message`
pub fn format_record(message: &str, at: DateTime<Local>) -> String {
    format!("[{}] {}", at.format("%Y-%m-%d %H:%M:%S"), message)
}

/// Append-only operator log, one line per event.
///
/// If a write fails the error is printed once and the file is dropped;
/// the run itself carries on.
pub struct FileLogSink {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl FileLogSink {
    /// Open `<log_dir>/forcerm_log_<timestamp>.txt`, creating the directory.
    pub fn create(log_dir: &Path) -> Result<Self> {
        fs::create_dir_all(log_dir).map_err(|e| {
            ForceRmError::LogFileError(format!("{}: {}", log_dir.display(), e))
        })?;

        let name = format!("forcerm_log_{}.txt", Local::now().format("%Y%m%d_%H%M%S"));
        Self::open(log_dir.join(name))
    }

    pub fn open(path: PathBuf) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| ForceRmError::LogFileError(format!("{}: {}", path.display(), e)))?;

        Ok(Self {
            path,
            file: Mutex::new(Some(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Sink for FileLogSink {
    fn log_message(&self, text: &str) {
        let Ok(mut guard) = self.file.lock() else {
            return;
        };
        let Some(file) = guard.as_mut() else {
            return;
        };

        let mut written = Ok(());
        for line in text.lines() {
            written = writeln!(file, "{}", format_record(line, Local::now()));
            if written.is_err() {
                break;
            }
        }

        if let Err(e) = written {
            eprintln!("Error writing log file {}: {}", self.path.display(), e);
            *guard = None;
        }
    }

    fn update_status(&self, _text: &str) {}

    fn update_progress(&self, _percentage: f64) {}

    fn log_file(&self) -> Option<PathBuf> {
        Some(self.path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive(false), "forcerm=warn");
        assert_eq!(default_directive(true), "forcerm=debug");
        assert!(EnvFilter::try_new(default_directive(false)).is_ok());
    }

    #[test]
    fn test_record_format() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(format_record("hello", at), "[2024-03-09 07:05:01] hello");
    }

    #[test]
    fn test_file_sink_appends_lines() {
        let temp = tempdir().unwrap();
        let sink = FileLogSink::create(&temp.path().join("logs")).unwrap();

        sink.log_message("first");
        sink.log_message("second\nthird");

        let content = fs::read_to_string(sink.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].ends_with("] first"));
        assert!(lines[2].ends_with("] third"));
    }

    #[test]
    fn test_file_sink_reports_location() {
        let temp = tempdir().unwrap();
        let sink = FileLogSink::create(temp.path()).unwrap();

        let file = sink.log_file().unwrap();
        assert!(file.starts_with(temp.path()));
        let name = file.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("forcerm_log_"));
        assert!(name.ends_with(".txt"));
    }
}
