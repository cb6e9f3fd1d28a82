//! Bounded worker pool running one isolated task per case
//!
//! Every case runs end-to-end on a single worker. Errors and panics are
//! contained at the case boundary and turned into outcomes; sibling cases
//! keep running. There are no retries and no ordering guarantees.

use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::algorithm::pipeline::CaseReport;
use crate::io::discovery::Case;
use crate::io::error::{FusionError, Result};
use crate::io::progress::ProgressManager;

/// Final state of one case
#[derive(Debug)]
pub enum CaseOutcome {
    /// Output written
    Processed {
        /// Case identifier
        case: String,
        /// What the case produced
        report: CaseReport,
    },
    /// Not attempted because its reference geometry is absent
    Skipped {
        /// Case identifier
        case: String,
        /// Why the case was skipped
        error: FusionError,
    },
    /// A stage of the chain failed; nothing was written
    Failed {
        /// Case identifier
        case: String,
        /// First error raised by the chain
        error: FusionError,
    },
}

impl CaseOutcome {
    /// Classify the result of a case's chain
    pub fn from_result(case: &str, result: Result<CaseReport>) -> Self {
        let case = case.to_string();
        match result {
            Ok(report) => Self::Processed { case, report },
            Err(error) if error.is_skip() => Self::Skipped { case, error },
            Err(error) => Self::Failed { case, error },
        }
    }

    /// Case identifier
    pub fn case(&self) -> &str {
        match self {
            Self::Processed { case, .. } | Self::Skipped { case, .. } | Self::Failed { case, .. } => {
                case
            }
        }
    }

    /// Whether output was written
    pub const fn is_processed(&self) -> bool {
        matches!(self, Self::Processed { .. })
    }

    /// Human-readable status line
    pub fn status_line(&self) -> String {
        match self {
            Self::Processed { case, report } => {
                let filter = &report.filter;
                let components = if filter.removed() > 0 {
                    format!(
                        "removed {} components ({} remain)",
                        filter.removed(),
                        filter.components_after
                    )
                } else {
                    format!("no components removed ({} remain)", filter.components_after)
                };
                format!(
                    "{case}: processed, {} foreground voxels, {components}",
                    report.foreground_voxels
                )
            }
            Self::Skipped { case, error } => format!("{case}: skipped, {error}"),
            Self::Failed { case, error } => format!("{case}: error, {error}"),
        }
    }

    fn log(&self) {
        let line = self.status_line();
        match self {
            Self::Processed { case, report } => tracing::info!(
                case = %case,
                output = %report.output.display(),
                reversed_axes = report.reversed_axes,
                "{line}"
            ),
            Self::Skipped { case, .. } => tracing::warn!(case = %case, "{line}"),
            Self::Failed { case, .. } => tracing::error!(case = %case, "{line}"),
        }
    }
}

/// Counts of processed, skipped and failed cases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    /// Cases with written output
    pub processed: usize,
    /// Cases skipped for missing reference geometry
    pub skipped: usize,
    /// Cases whose chain failed
    pub failed: usize,
}

impl RunSummary {
    /// Tally a batch of outcomes
    pub fn from_outcomes(outcomes: &[CaseOutcome]) -> Self {
        outcomes
            .iter()
            .fold(Self::default(), |mut summary, outcome| {
                match outcome {
                    CaseOutcome::Processed { .. } => summary.processed += 1,
                    CaseOutcome::Skipped { .. } => summary.skipped += 1,
                    CaseOutcome::Failed { .. } => summary.failed += 1,
                }
                summary
            })
    }

    /// Total number of cases
    pub const fn total(&self) -> usize {
        self.processed + self.skipped + self.failed
    }

    /// Whether any case failed
    pub const fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "processed {}, skipped {}, failed {}",
            self.processed, self.skipped, self.failed
        )
    }
}

/// Fixed-size pool that fans cases out to workers
pub struct Dispatcher {
    pool: ThreadPool,
    progress: ProgressManager,
}

impl Dispatcher {
    /// Build a pool of `workers` threads
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::WorkerPool`] if the threads cannot be spawned
    pub fn new(workers: usize, progress: ProgressManager) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|index| format!("case-worker-{index}"))
            .build()?;
        Ok(Self { pool, progress })
    }

    /// Number of worker threads
    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run `task` once per case and collect every outcome
    ///
    /// Outcomes are returned in submission order, although cases may finish
    /// in any order.
    pub fn run<F>(&self, cases: &[Case], task: F) -> Vec<CaseOutcome>
    where
        F: Fn(&Case) -> Result<CaseReport> + Sync,
    {
        let outcomes = self.pool.install(|| {
            cases
                .par_iter()
                .with_max_len(1)
                .map(|case| {
                    let outcome = run_isolated(case, &task);
                    self.progress.suspend(|| outcome.log());
                    self.progress.complete_case(&case.id);
                    outcome
                })
                .collect()
        });
        self.progress.finish();
        outcomes
    }

    /// Run `task` once per case and log the end-of-run summary
    pub fn run_summarised<F>(&self, cases: &[Case], task: F) -> RunSummary
    where
        F: Fn(&Case) -> Result<CaseReport> + Sync,
    {
        let outcomes = self.run(cases, task);
        let summary = RunSummary::from_outcomes(&outcomes);
        tracing::info!("{summary}");
        summary
    }
}

fn run_isolated<F>(case: &Case, task: &F) -> CaseOutcome
where
    F: Fn(&Case) -> Result<CaseReport>,
{
    let result = catch_unwind(AssertUnwindSafe(|| task(case))).unwrap_or_else(|payload| {
        Err(FusionError::WorkerPanic {
            message: panic_message(payload.as_ref()),
        })
    });
    CaseOutcome::from_result(&case.id, result)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string())
}
