//! Weighted linear combination of per-source probability tensors
//!
//! The result is `Σ weight_i × volume_i` with no normalisation, so fused
//! values range over `[0, Σ weights]`. Absolute thresholds applied later are
//! read against that unnormalised scale.

use ndarray::{Array, ArrayView, Dimension, Zip};
use num_traits::Float;

use crate::io::error::{FusionError, Result, invalid_parameter};

/// One source's contribution to a fusion
#[derive(Debug, Clone)]
pub struct WeightedVolume<'a, A, D>
where
    D: Dimension,
{
    /// Probability tensor from this source
    pub volume: ArrayView<'a, A, D>,
    /// Multiplier applied before summation
    pub weight: A,
}

impl<'a, A, D> WeightedVolume<'a, A, D>
where
    D: Dimension,
{
    /// Pair a tensor with its weight
    pub const fn new(volume: ArrayView<'a, A, D>, weight: A) -> Self {
        Self { volume, weight }
    }
}

/// Fuse weighted volumes element-wise
///
/// # Errors
///
/// Returns [`FusionError::InvalidParameter`] if `sources` is empty, or
/// [`FusionError::ShapeMismatch`] if the volumes disagree in shape
pub fn fuse<A, D>(sources: &[WeightedVolume<'_, A, D>]) -> Result<Array<A, D>>
where
    A: Float,
    D: Dimension,
{
    let (first, rest) = sources
        .split_first()
        .ok_or_else(|| invalid_parameter("sources", &0, &"fusion needs at least one source"))?;

    let mut fused = first.volume.mapv(|v| v * first.weight);

    for source in rest {
        if source.volume.shape() != fused.shape() {
            return Err(FusionError::ShapeMismatch {
                found: source.volume.shape().to_vec(),
                expected: fused.shape().to_vec(),
            });
        }

        let weight = source.weight;
        Zip::from(&mut fused)
            .and(&source.volume)
            .for_each(|acc, &v| *acc = *acc + v * weight);
    }

    Ok(fused)
}

/// Upper bound of fused values when every input lies in `[0, 1]`
pub fn fused_upper_bound<A, D>(sources: &[WeightedVolume<'_, A, D>]) -> A
where
    A: Float,
    D: Dimension,
{
    sources
        .iter()
        .fold(A::zero(), |total, source| total + source.weight)
}
