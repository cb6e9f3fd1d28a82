/// Probability archive loading
pub mod archive;
/// Command-line interface
pub mod cli;
/// File-format constants and defaults
pub mod configuration;
/// Case discovery across source directories
pub mod discovery;
/// Error types
pub mod error;
/// Reference geometry and label volume persistence
pub mod geometry;
/// Batch progress display
pub mod progress;
