use std::path::PathBuf;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BatchStatus {
    Idle,
    Running,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BatchOutcome {
    Completed,
    StoppedByUser,
}

/// What a finished batch leaves behind.
#[derive(Clone, Debug)]
pub struct BatchReport {
    pub outcome: BatchOutcome,
    /// Last published percentage, 0..=100.
    pub progress: u8,
    pub log: String,
    pub succeeded: usize,
    pub failed: Vec<PathBuf>,
}

impl BatchReport {
    pub fn new() -> Self {
        BatchReport {
            outcome: BatchOutcome::Completed,
            progress: 0,
            log: String::new(),
            succeeded: 0,
            failed: vec![],
        }
    }

    pub fn summary(&self) -> String {
        let verb = match self.outcome {
            BatchOutcome::Completed => "Conversion finished",
            BatchOutcome::StoppedByUser => "Conversion stopped",
        };
        format!("{}: {} succeeded, {} failed.", verb, self.succeeded, self.failed.len())
    }
}

/// `round(100 * done / total)`; an empty batch counts as complete.
pub fn progress_percent(done: usize, total: usize) -> u8 {
    match total {
        0 => 100,
        _ => ((100.0 * done as f64) / total as f64).round().min(100.0) as u8,
    }
}
