//! File-format constants and runtime configuration defaults

/// Extension of per-case probability archives
pub const PROBABILITY_EXTENSION: &str = "npz";

/// Name of the probability tensor inside each archive
pub const PROBABILITY_ENTRY: &str = "probabilities";

/// Extension of reference and output volumes
pub const VOLUME_EXTENSION: &str = "nii.gz";

/// Number of digits in a trailing `_NNNN` channel suffix
pub const CHANNEL_SUFFIX_DIGITS: usize = 4;

// Default values for configurable parameters
/// Worker pool size
pub const DEFAULT_WORKERS: usize = 4;

/// Lesion class extracted in threshold mode
pub const DEFAULT_CLASS_INDEX: usize = 1;

/// Minimum component size; zero keeps every component
pub const DEFAULT_MIN_COMPONENT_SIZE: usize = 0;

// Output labels are stored as unsigned bytes
/// Largest number of distinct label codes an output volume can carry
pub const MAX_LABEL_CLASSES: usize = u8::MAX as usize + 1;

// Progress bar display settings
/// Width of the progress bar in characters
pub const PROGRESS_BAR_WIDTH: u16 = 40;

/// Prefix of temporary files written before the final rename
pub const PARTIAL_OUTPUT_PREFIX: &str = ".partial-";
