//! Tests for argmax and threshold label decisions

#[cfg(test)]
mod tests {
    use crate::FusionError;
    use crate::math::decision::{argmax_labels, threshold_labels};
    use ndarray::{Array3, Array4, array};

    // Tests voxels exactly at the threshold stay background
    // Verified by switching to >=
    #[test]
    fn test_threshold_is_strict() {
        let fused = array![[[0.29_f32, 0.3, 0.31]]];
        let labels = threshold_labels(&fused.view(), 0.3);
        assert_eq!(labels, array![[[0_u8, 0, 1]]]);
    }

    // Tests raising the threshold never adds foreground
    #[test]
    fn test_threshold_is_monotonic() {
        let fused = Array3::from_shape_fn((4, 5, 6), |(i, j, k)| {
            ((i * 31 + j * 17 + k * 7) % 100) as f32 / 100.0
        });

        let mut previous = threshold_labels(&fused.view(), 0.0);
        for step in 1..=10 {
            let current = threshold_labels(&fused.view(), step as f32 / 10.0);
            for (before, after) in previous.iter().zip(current.iter()) {
                assert!(after <= before, "foreground appeared when raising threshold");
            }
            previous = current;
        }
    }

    // Tests thresholds above one act on unnormalised fused values
    #[test]
    fn test_threshold_above_one() {
        let fused = array![[[1.2_f32, 1.3]]];
        assert_eq!(threshold_labels(&fused.view(), 1.25), array![[[0_u8, 1]]]);
    }

    // Tests argmax picks the most probable class per voxel
    // Verified by selecting the minimum instead
    #[test]
    fn test_argmax_selects_highest_class() {
        let mut fused = Array4::<f32>::zeros((3, 1, 1, 3));
        fused[[0, 0, 0, 0]] = 0.7;
        fused[[1, 0, 0, 0]] = 0.2;
        fused[[1, 0, 0, 1]] = 0.6;
        fused[[2, 0, 0, 2]] = 0.9;

        let labels = argmax_labels(&fused.view()).expect("valid class count");
        assert_eq!(labels, array![[[0_u8, 1, 2]]]);
    }

    // Tests equal probabilities resolve to the lowest class index
    // Verified by using >= in the comparison
    #[test]
    fn test_argmax_ties_pick_lowest_index() {
        let fused = Array4::<f32>::from_elem((3, 2, 2, 2), 0.5);
        let labels = argmax_labels(&fused.view()).expect("valid class count");
        assert!(labels.iter().all(|&l| l == 0));
    }

    #[test]
    fn test_argmax_rejects_too_many_classes() {
        let fused = Array4::<f32>::zeros((257, 1, 1, 1));
        assert!(matches!(
            argmax_labels(&fused.view()),
            Err(FusionError::InvalidParameter { .. })
        ));

        let fused = Array4::<f32>::zeros((256, 1, 1, 1));
        assert!(argmax_labels(&fused.view()).is_ok());
    }

    #[test]
    fn test_argmax_rejects_empty_class_axis() {
        let fused = Array4::<f32>::zeros((0, 2, 2, 2));
        assert!(argmax_labels(&fused.view()).is_err());
    }
}
