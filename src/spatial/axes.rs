//! Spatial axis-order reconciliation against a reference shape
//!
//! Probability archives may store volumes with the slice axis first while
//! the reference volume stores it last. The only permutation ever applied
//! is the full reversal `(2, 1, 0)`, which is its own inverse.

use std::fmt;
use std::str::FromStr;

use ndarray::Array3;

use crate::io::error::{FusionError, Result};

/// Strategy for deciding whether to reverse spatial axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AxisMode {
    /// Reverse when axis 0 is shorter than axis 1
    ///
    /// Can misfire on near-isotropic volumes whose first axis is short for
    /// anatomical reasons rather than storage order.
    #[default]
    Heuristic,
    /// Accept the reference shape or its full reversal, anything else fails
    ShapeMatch,
    /// Leave axes untouched
    Keep,
}

impl fmt::Display for AxisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Heuristic => write!(f, "heuristic"),
            Self::ShapeMatch => write!(f, "shape-match"),
            Self::Keep => write!(f, "keep"),
        }
    }
}

impl FromStr for AxisMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "heuristic" => Ok(Self::Heuristic),
            "shape-match" => Ok(Self::ShapeMatch),
            "keep" => Ok(Self::Keep),
            other => Err(format!(
                "unknown axis mode '{other}' (expected heuristic, shape-match or keep)"
            )),
        }
    }
}

/// A volume after reconciliation
#[derive(Debug, Clone)]
pub struct Reconciled<A> {
    /// Volume in reference axis order (as far as the mode can tell)
    pub array: Array3<A>,
    /// Whether the axes were reversed
    pub reversed: bool,
}

impl<A> Reconciled<A> {
    const fn unchanged(array: Array3<A>) -> Self {
        Self {
            array,
            reversed: false,
        }
    }
}

/// Reverse all three spatial axes, returning a standard-layout array
pub fn reverse_axes<A>(array: Array3<A>) -> Array3<A>
where
    A: Clone,
{
    let reversed = array.reversed_axes();
    if reversed.is_standard_layout() {
        reversed
    } else {
        reversed.as_standard_layout().into_owned()
    }
}

/// Reconcile by exact comparison with the reference shape
///
/// # Errors
///
/// Returns [`FusionError::ShapeMismatch`] if neither the shape nor its full
/// reversal equals `reference`
pub fn reconcile_shape_match<A>(array: Array3<A>, reference: [usize; 3]) -> Result<Reconciled<A>>
where
    A: Clone,
{
    let shape = spatial_shape(&array);
    if shape == reference {
        return Ok(Reconciled::unchanged(array));
    }

    let [r0, r1, r2] = reference;
    if shape == [r2, r1, r0] {
        return Ok(Reconciled {
            array: reverse_axes(array),
            reversed: true,
        });
    }

    Err(FusionError::ShapeMismatch {
        found: shape.to_vec(),
        expected: reference.to_vec(),
    })
}

/// Reconcile by comparing the extents of the first two axes
///
/// A first axis shorter than the second is taken to be a leading slice axis.
pub fn reconcile_heuristic<A>(array: Array3<A>) -> Reconciled<A>
where
    A: Clone,
{
    let (d0, d1, _) = array.dim();
    if d0 < d1 {
        Reconciled {
            array: reverse_axes(array),
            reversed: true,
        }
    } else {
        Reconciled::unchanged(array)
    }
}

/// Reconcile `array` against `reference` using `mode`
///
/// # Errors
///
/// Returns [`FusionError::ShapeMismatch`] in shape-match mode when no
/// supported permutation fits
pub fn reconcile<A>(mode: AxisMode, array: Array3<A>, reference: [usize; 3]) -> Result<Reconciled<A>>
where
    A: Clone,
{
    match mode {
        AxisMode::ShapeMatch => reconcile_shape_match(array, reference),
        AxisMode::Heuristic => Ok(reconcile_heuristic(array)),
        AxisMode::Keep => Ok(Reconciled::unchanged(array)),
    }
}

/// Spatial extents as a fixed-size array
pub fn spatial_shape<A>(array: &Array3<A>) -> [usize; 3] {
    array.dim().into()
}
