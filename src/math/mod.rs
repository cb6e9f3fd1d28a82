//! Numerical rules applied to probability tensors

/// Threshold and argmax label decisions
pub mod decision;
/// Weighted linear combination of probability tensors
pub mod fusion;
