//! Weighted fusion of voxel-wise lesion probability maps into label volumes
//!
//! Probability tensors from independent segmentation models are combined per
//! case, turned into labels, brought into the reference volume's axis order,
//! stripped of small spurious components and written with the reference
//! geometry. Cases run in parallel and fail independently.

#![forbid(unsafe_code)]

/// Per-case processing chains and the bounded worker pool
pub mod algorithm;
/// Input/output operations, configuration and error handling
pub mod io;
/// Probability fusion and decision rules
pub mod math;
/// Axis-order reconciliation and connected-component filtering
pub mod spatial;

pub use io::error::{FusionError, Result};

#[cfg(test)]
#[path = "../tests/unit/mod.rs"]
mod unit;
