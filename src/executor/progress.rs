/// Whole-directory progress accounting for a single run.
///
/// `percentage = completed / total * 100`, never moving backwards.
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    last: f64,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `completed` of `total` targets are done and return the
    /// percentage to report.
    pub fn update(&mut self, completed: usize, total: usize) -> f64 {
        let pct = if total == 0 {
            100.0
        } else {
            (completed.min(total) as f64 / total as f64) * 100.0
        };

        if pct > self.last {
            self.last = pct;
        }
        self.last
    }

    /// Clamp to 100 at run end, whether or not the run was cancelled.
    pub fn finish(&mut self) -> f64 {
        self.last = 100.0;
        self.last
    }

    pub fn current(&self) -> f64 {
        self.last
    }
}
