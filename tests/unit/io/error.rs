//! Tests for error classification, formatting and path context

#[cfg(test)]
mod tests {
    use crate::FusionError;
    use crate::io::error::{WithPath, invalid_parameter, load_failure};
    use std::path::{Path, PathBuf};

    // Tests only missing reference geometry counts as a skip
    // Verified by classifying load failures as skips
    #[test]
    fn test_is_skip() {
        let missing = FusionError::MissingReferenceGeometry {
            case: "sub-1".into(),
            path: PathBuf::from("refs/sub-1.nii.gz"),
        };
        assert!(missing.is_skip());
        assert!(!load_failure(Path::new("a.npz"), &"truncated").is_skip());
        assert!(
            !FusionError::ShapeMismatch {
                found: vec![1, 2, 3],
                expected: vec![4, 5, 6],
            }
            .is_skip()
        );
        assert!(
            !FusionError::WorkerPanic {
                message: "boom".into()
            }
            .is_skip()
        );
    }

    #[test]
    fn test_messages_name_the_problem() {
        let error = invalid_parameter("workers", &0, &"worker pool needs at least one worker");
        assert_eq!(
            error.to_string(),
            "Invalid parameter 'workers' = '0': worker pool needs at least one worker"
        );

        let error = FusionError::ShapeMismatch {
            found: vec![10, 20, 30],
            expected: vec![30, 10, 20],
        };
        assert_eq!(
            error.to_string(),
            "Shape mismatch: array [10, 20, 30] does not match reference [30, 10, 20]"
        );

        let error = load_failure(Path::new("in/a.npz"), &"bad magic");
        assert_eq!(error.to_string(), "Failed to load 'in/a.npz': bad magic");
    }

    // Tests foreign errors pick up the path they concern
    // Verified by dropping the path from the context
    #[test]
    fn test_with_path_context() {
        let failed: Result<(), &str> = Err("denied");

        let loaded = failed.load_context(Path::new("x.npz"));
        assert!(matches!(
            loaded,
            Err(FusionError::LoadFailure { ref path, ref reason })
                if path == Path::new("x.npz") && reason == "denied"
        ));

        let written = failed.write_context(Path::new("out/x.nii.gz"));
        assert!(matches!(
            written,
            Err(FusionError::WriteFailure { ref path, .. }) if path == Path::new("out/x.nii.gz")
        ));

        let fine: Result<u8, &str> = Ok(3);
        assert_eq!(fine.load_context(Path::new("x.npz")).ok(), Some(3));
    }

    #[test]
    fn test_file_system_error_keeps_source() {
        use std::error::Error as _;

        let error = FusionError::FileSystem {
            path: PathBuf::from("missing"),
            operation: "list directory",
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such directory"),
        };
        assert!(error.source().is_some());
        assert!(error.to_string().contains("list directory"));
    }
}
