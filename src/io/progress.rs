//! Batch progress display shared by all workers

use crate::io::configuration::PROGRESS_BAR_WIDTH;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::LazyLock;

static BATCH_STYLE: LazyLock<ProgressStyle> = LazyLock::new(|| {
    let template = format!(
        "[{{elapsed_precise}}] Cases: [{{bar:{PROGRESS_BAR_WIDTH}.cyan/blue}}] {{pos}}/{{len}} {{msg}}"
    );
    ProgressStyle::default_bar()
        .template(&template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏ ")
});

/// Counts finished cases and routes status lines around the bar
///
/// Cloning is cheap and every clone drives the same bar, so workers can
/// report concurrently.
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::hidden()
    }
}

impl ProgressManager {
    /// Create a visible bar for `case_count` cases
    pub fn new(case_count: usize) -> Self {
        let bar = ProgressBar::new(case_count as u64);
        bar.set_style(BATCH_STYLE.clone());
        Self { bar }
    }

    /// Create a manager that draws nothing
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Run `report` with the bar temporarily cleared
    pub fn suspend<F, R>(&self, report: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.bar.suspend(report)
    }

    /// Mark one case as finished
    pub fn complete_case(&self, case: &str) {
        self.bar.set_message(case.to_string());
        self.bar.inc(1);
    }

    /// Number of cases marked finished
    pub fn completed(&self) -> u64 {
        self.bar.position()
    }

    /// Clean up the display
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
