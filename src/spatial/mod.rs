//! Spatial operations on label volumes
//!
//! This module contains:
//! - Axis-order reconciliation against reference geometry
//! - Connected-component labelling and size filtering

/// Axis-order reconciliation
pub mod axes;
/// Connected-component labelling and filtering
pub mod components;

pub use axes::AxisMode;
pub use components::FilterReport;
