use std::path::PathBuf;
use std::sync::Arc;

/// Notifications from the batch worker to whoever drives it.
///
/// Called synchronously from the worker, so implementations should return
/// quickly.
pub trait Sink: Send + Sync {
    /// One event line for the operator log.
    fn log_message(&self, text: &str);

    /// Short status text (e.g. "Processing 2/5: /tmp/a").
    fn update_status(&self, text: &str);

    /// Overall progress in percent, non-decreasing within a run.
    fn update_progress(&self, percentage: f64);

    /// Location of the persisted log, if this sink writes one.
    fn log_file(&self) -> Option<PathBuf> {
        None
    }
}

impl<S: Sink + ?Sized> Sink for Arc<S> {
    fn log_message(&self, text: &str) {
        (**self).log_message(text)
    }

    fn update_status(&self, text: &str) {
        (**self).update_status(text)
    }

    fn update_progress(&self, percentage: f64) {
        (**self).update_progress(percentage)
    }

    fn log_file(&self) -> Option<PathBuf> {
        (**self).log_file()
    }
}

/// Forwards every notification to each inner sink, in order.
#[derive(Default, Clone)]
pub struct FanOutSink {
    sinks: Vec<Arc<dyn Sink>>,
}

impl FanOutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl Sink for FanOutSink {
    fn log_message(&self, text: &str) {
        for sink in &self.sinks {
            sink.log_message(text);
        }
    }

    fn update_status(&self, text: &str) {
        for sink in &self.sinks {
            sink.update_status(text);
        }
    }

    fn update_progress(&self, percentage: f64) {
        for sink in &self.sinks {
            sink.update_progress(percentage);
        }
    }

    /// First inner sink that persists a log wins.
    fn log_file(&self) -> Option<PathBuf> {
        self.sinks.iter().find_map(|s| s.log_file())
    }
}
