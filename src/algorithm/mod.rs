/// Bounded worker pool with per-case fault isolation
pub mod dispatcher;
/// Per-case fusion and cleaning chains
pub mod pipeline;
