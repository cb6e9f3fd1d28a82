//! Conversion of fused probabilities into discrete label volumes

use ndarray::{Array3, ArrayView3, ArrayView4, Axis, Zip};
use num_traits::Float;

use crate::io::configuration::MAX_LABEL_CLASSES;
use crate::io::error::{Result, invalid_parameter};

/// How fused probabilities become labels
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DecisionMode {
    /// Per-voxel class of highest fused probability
    Argmax,
    /// Foreground where the fused lesion-class probability exceeds `threshold`
    Threshold {
        /// Decision boundary; voxels exactly at it are background
        threshold: f32,
        /// Class extracted from each source before fusion
        class_index: usize,
    },
}

/// Label each voxel with the index of its most probable class
///
/// Ties resolve to the lowest class index.
///
/// # Errors
///
/// Returns [`crate::FusionError::InvalidParameter`] if the tensor has no
/// classes or more classes than an unsigned byte can label
pub fn argmax_labels<A>(fused: &ArrayView4<'_, A>) -> Result<Array3<u8>>
where
    A: Float,
{
    let classes = fused.len_of(Axis(0));
    if classes == 0 || classes > MAX_LABEL_CLASSES {
        return Err(invalid_parameter(
            "classes",
            &classes,
            &format!("argmax supports 1 to {MAX_LABEL_CLASSES} classes"),
        ));
    }

    let mut best = fused.index_axis(Axis(0), 0).to_owned();
    let mut labels = Array3::<u8>::zeros(best.raw_dim());

    for (class, probabilities) in fused.axis_iter(Axis(0)).enumerate().skip(1) {
        let code = class as u8;
        Zip::from(&mut labels)
            .and(&mut best)
            .and(probabilities)
            .for_each(|label, top, &p| {
                // Strict comparison keeps the earlier class on ties
                if p > *top {
                    *top = p;
                    *label = code;
                }
            });
    }

    Ok(labels)
}

/// Binary mask of voxels strictly above `threshold`
pub fn threshold_labels<A>(fused: &ArrayView3<'_, A>, threshold: A) -> Array3<u8>
where
    A: Float,
{
    fused.mapv(|p| u8::from(p > threshold))
}
