//! Tests for the bounded worker pool and per-case fault isolation

#[cfg(test)]
mod tests {
    use crate::FusionError;
    use crate::algorithm::dispatcher::{CaseOutcome, Dispatcher, RunSummary};
    use crate::algorithm::pipeline::CaseReport;
    use crate::io::discovery::Case;
    use crate::io::progress::ProgressManager;
    use crate::spatial::FilterReport;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn case(id: &str) -> Case {
        Case {
            id: id.to_string(),
            inputs: vec![PathBuf::from(format!("{id}.npz"))],
            reference: PathBuf::from(format!("{id}.nii.gz")),
        }
    }

    fn report(case: &Case, before: usize, after: usize) -> CaseReport {
        CaseReport {
            filter: FilterReport {
                components_before: before,
                components_after: after,
            },
            reversed_axes: false,
            foreground_voxels: 12,
            output: PathBuf::from(format!("out/{}.nii.gz", case.id)),
        }
    }

    fn dispatcher(workers: usize) -> Dispatcher {
        Dispatcher::new(workers, ProgressManager::hidden()).expect("pool builds")
    }

    // Tests a panicking case does not stop its siblings
    // Verified by removing the unwind boundary around each task
    #[test]
    fn test_panic_is_contained() {
        let cases = vec![case("C"), case("D"), case("E")];
        let outcomes = dispatcher(2).run(&cases, |c| {
            assert!(c.id != "C", "corrupt archive");
            Ok(report(c, 1, 1))
        });

        assert_eq!(outcomes.len(), 3);
        let ids: Vec<_> = outcomes.iter().map(CaseOutcome::case).collect();
        assert_eq!(ids, vec!["C", "D", "E"]);

        match &outcomes[0] {
            CaseOutcome::Failed {
                error: FusionError::WorkerPanic { message },
                ..
            } => assert!(message.contains("corrupt archive")),
            other => unreachable!("Expected contained panic, got {other:?}"),
        }
        assert!(outcomes[1].is_processed());
        assert!(outcomes[2].is_processed());
    }

    // Tests an error from one case is reported and siblings still run
    #[test]
    fn test_error_is_contained() {
        let cases = vec![case("C"), case("D"), case("E")];
        let outcomes = dispatcher(4).run(&cases, |c| {
            if c.id == "C" {
                return Err(FusionError::LoadFailure {
                    path: c.inputs[0].clone(),
                    reason: "truncated".into(),
                });
            }
            Ok(report(c, 2, 2))
        });

        let summary = RunSummary::from_outcomes(&outcomes);
        assert_eq!(
            summary,
            RunSummary {
                processed: 2,
                skipped: 0,
                failed: 1
            }
        );
        assert!(summary.has_failures());
    }

    // Tests every case is attempted exactly once
    // Verified by retrying failed cases
    #[test]
    fn test_each_case_runs_once() {
        let calls = AtomicUsize::new(0);
        let cases: Vec<_> = (0..9).map(|i| case(&format!("sub-{i}"))).collect();
        let outcomes = dispatcher(3).run(&cases, |c| {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(FusionError::WriteFailure {
                path: c.reference.clone(),
                reason: "read-only".into(),
            })
        });

        assert_eq!(calls.load(Ordering::SeqCst), 9);
        assert_eq!(RunSummary::from_outcomes(&outcomes).failed, 9);
    }

    #[test]
    fn test_progress_counts_every_outcome() {
        let progress = ProgressManager::hidden();
        let pool = Dispatcher::new(2, progress.clone()).expect("pool builds");
        assert_eq!(pool.workers(), 2);

        let cases = vec![case("A"), case("B")];
        let summary = pool.run_summarised(&cases, |c| Ok(report(c, 0, 0)));

        assert_eq!(summary.total(), 2);
        assert_eq!(progress.completed(), 2);
    }

    #[test]
    fn test_empty_batch() {
        let outcomes = dispatcher(1).run(&[], |c| Ok(report(c, 0, 0)));
        assert!(outcomes.is_empty());
        assert_eq!(RunSummary::from_outcomes(&outcomes), RunSummary::default());
    }

    // Tests missing reference geometry is classified as a skip
    // Verified by classifying every error as a failure
    #[test]
    fn test_missing_reference_is_skipped() {
        let outcome = CaseOutcome::from_result(
            "A",
            Err(FusionError::MissingReferenceGeometry {
                case: "A".into(),
                path: PathBuf::from("refs/A.nii.gz"),
            }),
        );
        assert!(matches!(outcome, CaseOutcome::Skipped { .. }));
        assert!(outcome.status_line().starts_with("A: skipped, "));
    }

    #[test]
    fn test_status_lines() {
        let b = case("B");
        let removed = CaseOutcome::from_result("B", Ok(report(&b, 3, 1)));
        assert_eq!(
            removed.status_line(),
            "B: processed, 12 foreground voxels, removed 2 components (1 remain)"
        );

        let kept = CaseOutcome::from_result("B", Ok(report(&b, 1, 1)));
        assert_eq!(
            kept.status_line(),
            "B: processed, 12 foreground voxels, no components removed (1 remain)"
        );

        let failed = CaseOutcome::from_result(
            "B",
            Err(FusionError::WorkerPanic {
                message: "boom".into(),
            }),
        );
        assert_eq!(failed.status_line(), "B: error, Worker panicked: boom");
    }

    #[test]
    fn test_summary_display() {
        let summary = RunSummary {
            processed: 5,
            skipped: 1,
            failed: 2,
        };
        assert_eq!(summary.to_string(), "processed 5, skipped 1, failed 2");
        assert_eq!(summary.total(), 8);
        assert!(!RunSummary::default().has_failures());
    }
}
