//! Tests for axis-order reconciliation

#[cfg(test)]
mod tests {
    use crate::FusionError;
    use crate::spatial::axes::{
        AxisMode, reconcile, reconcile_heuristic, reconcile_shape_match, reverse_axes,
        spatial_shape,
    };
    use ndarray::Array3;

    fn numbered(shape: (usize, usize, usize)) -> Array3<u32> {
        let (_, d1, d2) = shape;
        Array3::from_shape_fn(shape, |(i, j, k)| (i * d1 * d2 + j * d2 + k) as u32)
    }

    // Tests reversal maps [i, j, k] to [k, j, i]
    // Verified by swapping only the first two axes
    #[test]
    fn test_reverse_axes_permutes_indices() {
        let original = numbered((2, 3, 4));
        let reversed = reverse_axes(original.clone());

        assert_eq!(reversed.dim(), (4, 3, 2));
        assert!(reversed.is_standard_layout());
        for ((i, j, k), &value) in original.indexed_iter() {
            assert_eq!(reversed.get([k, j, i]).copied(), Some(value));
        }
    }

    // Tests full reversal is an involution
    #[test]
    fn test_reverse_axes_twice_is_identity() {
        let original = numbered((5, 2, 3));
        assert_eq!(reverse_axes(reverse_axes(original.clone())), original);
    }

    #[test]
    fn test_shape_match_keeps_matching_shape() {
        let original = numbered((4, 5, 6));
        let result = reconcile_shape_match(original.clone(), [4, 5, 6]).expect("shape matches");
        assert!(!result.reversed);
        assert_eq!(result.array, original);
    }

    // Tests a fully reversed shape is transposed into the reference order
    // Verified by returning the array untouched
    #[test]
    fn test_shape_match_reverses_reversed_shape() {
        let original = numbered((35, 64, 60));
        let result = reconcile_shape_match(original, [60, 64, 35]).expect("reversal matches");
        assert!(result.reversed);
        assert_eq!(spatial_shape(&result.array), [60, 64, 35]);
    }

    // Tests shapes that only match under other permutations are rejected
    // Verified by accepting any permutation with equal extents
    #[test]
    fn test_shape_match_rejects_other_permutations() {
        let err = reconcile_shape_match(numbered((4, 6, 5)), [4, 5, 6]).unwrap_err();
        match err {
            FusionError::ShapeMismatch { found, expected } => {
                assert_eq!(found, vec![4, 6, 5]);
                assert_eq!(expected, vec![4, 5, 6]);
            }
            other => unreachable!("Expected ShapeMismatch, got {other:?}"),
        }
    }

    // Tests the heuristic reverses when axis 0 is shorter than axis 1
    // Verified by comparing axis 0 against axis 2 instead
    #[test]
    fn test_heuristic_reverses_short_leading_axis() {
        let result = reconcile_heuristic(numbered((3, 8, 8)));
        assert!(result.reversed);
        assert_eq!(spatial_shape(&result.array), [8, 8, 3]);
    }

    #[test]
    fn test_heuristic_keeps_equal_or_longer_leading_axis() {
        let square = reconcile_heuristic(numbered((8, 8, 3)));
        assert!(!square.reversed);

        let long = reconcile_heuristic(numbered((9, 8, 3)));
        assert!(!long.reversed);
        assert_eq!(spatial_shape(&long.array), [9, 8, 3]);
    }

    // Tests the heuristic misfires on near-isotropic volumes, as documented
    #[test]
    fn test_heuristic_ignores_reference_shape() {
        let result = reconcile(AxisMode::Heuristic, numbered((7, 8, 8)), [7, 8, 8])
            .expect("heuristic never fails");
        assert!(result.reversed);
        assert_eq!(spatial_shape(&result.array), [8, 8, 7]);
    }

    #[test]
    fn test_keep_mode_never_changes_axes() {
        let result =
            reconcile(AxisMode::Keep, numbered((3, 8, 8)), [8, 8, 3]).expect("keep never fails");
        assert!(!result.reversed);
        assert_eq!(spatial_shape(&result.array), [3, 8, 8]);
    }

    #[test]
    fn test_axis_mode_parses_and_displays() {
        for mode in [AxisMode::Heuristic, AxisMode::ShapeMatch, AxisMode::Keep] {
            assert_eq!(mode.to_string().parse::<AxisMode>(), Ok(mode));
        }
        assert!("transpose".parse::<AxisMode>().is_err());
        assert_eq!(AxisMode::default(), AxisMode::Heuristic);
    }
}
