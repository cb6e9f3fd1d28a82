//! Command-line interface for fusing probability maps and cleaning label volumes

use crate::algorithm::dispatcher::RunSummary;
use crate::algorithm::pipeline::{CleanConfig, FusionConfig, SourceSpec, run_clean, run_fusion};
use crate::io::configuration::{DEFAULT_CLASS_INDEX, DEFAULT_MIN_COMPONENT_SIZE, DEFAULT_WORKERS};
use crate::io::error::{Result, invalid_parameter};
use crate::math::decision::DecisionMode;
use crate::spatial::axes::AxisMode;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "lesionfuse")]
#[command(
    author,
    version,
    about = "Fuse voxel-wise lesion probability maps into cleaned label volumes"
)]
/// Command-line arguments for the fusion tool
pub struct Cli {
    /// Operation to run
    #[command(subcommand)]
    pub command: Command,

    /// Suppress the progress bar
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available operations
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fuse per-source probability archives into one label volume per case
    Fuse(FuseArgs),
    /// Remove small components from existing label volumes
    Clean(CleanArgs),
}

/// Arguments of the `fuse` operation
#[derive(Args, Debug)]
pub struct FuseArgs {
    /// Probability source as DIR=WEIGHT (repeat once per source)
    #[arg(short, long = "source", value_name = "DIR=WEIGHT", value_parser = parse_source, required = true)]
    pub sources: Vec<SourceSpec>,

    /// Directory of <case>.nii.gz reference volumes (defaults to the first source)
    #[arg(short, long)]
    pub reference_dir: Option<PathBuf>,

    /// Directory receiving the label volumes
    #[arg(short, long)]
    pub output_dir: PathBuf,

    /// Threshold the fused lesion probability instead of taking the argmax
    #[arg(short, long)]
    pub threshold: Option<f32>,

    /// Class extracted from each source in threshold mode
    #[arg(short, long, default_value_t = DEFAULT_CLASS_INDEX)]
    pub class_index: usize,

    /// Axis reconciliation: heuristic, shape-match or keep
    #[arg(short, long, default_value_t = AxisMode::Heuristic)]
    pub axis_mode: AxisMode,

    /// Remove components of this many voxels or fewer
    #[arg(short, long, default_value_t = DEFAULT_MIN_COMPONENT_SIZE)]
    pub min_size: usize,

    /// Worker pool size
    #[arg(short, long, default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,

    /// Strip trailing _NNNN channel indices from archive names
    #[arg(long)]
    pub strip_channel_suffix: bool,
}

/// Arguments of the `clean` operation
#[derive(Args, Debug)]
pub struct CleanArgs {
    /// Directory of label volumes to clean
    #[arg(short, long)]
    pub input: PathBuf,

    /// Directory receiving the cleaned volumes
    #[arg(short, long)]
    pub output_dir: PathBuf,

    /// Remove components of this many voxels or fewer
    #[arg(short, long, default_value_t = DEFAULT_MIN_COMPONENT_SIZE)]
    pub min_size: usize,

    /// Worker pool size
    #[arg(short, long, default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,
}

/// Parse a `DIR=WEIGHT` source argument
///
/// The split happens at the last `=`, so directories may contain one.
///
/// # Errors
///
/// Returns a message if the separator is missing or the weight is not a
/// finite number
pub fn parse_source(arg: &str) -> std::result::Result<SourceSpec, String> {
    let (dir, weight) = arg
        .rsplit_once('=')
        .ok_or_else(|| format!("expected DIR=WEIGHT, got '{arg}'"))?;
    if dir.is_empty() {
        return Err(format!("missing directory in '{arg}'"));
    }
    let weight: f32 = weight
        .trim()
        .parse()
        .map_err(|e| format!("invalid weight '{weight}': {e}"))?;
    if !weight.is_finite() {
        return Err(format!("weight must be finite, got '{weight}'"));
    }
    Ok(SourceSpec {
        dir: PathBuf::from(dir),
        weight,
    })
}

impl FuseArgs {
    /// Build the immutable run configuration
    ///
    /// # Errors
    ///
    /// Returns [`crate::FusionError::InvalidParameter`] if the resulting
    /// configuration fails validation
    pub fn into_config(self) -> Result<FusionConfig> {
        let reference_dir = match self.reference_dir {
            Some(dir) => dir,
            None => self
                .sources
                .first()
                .map(|source| source.dir.clone())
                .ok_or_else(|| invalid_parameter("sources", &0, &"at least one source is required"))?,
        };

        let decision = self
            .threshold
            .map_or(DecisionMode::Argmax, |threshold| DecisionMode::Threshold {
                threshold,
                class_index: self.class_index,
            });

        let config = FusionConfig {
            sources: self.sources,
            reference_dir,
            output_dir: self.output_dir,
            decision,
            axis_mode: self.axis_mode,
            min_component_size: self.min_size,
            workers: self.workers,
            strip_channel_suffix: self.strip_channel_suffix,
        };
        config.validate()?;
        Ok(config)
    }
}

impl CleanArgs {
    /// Build the immutable run configuration
    ///
    /// # Errors
    ///
    /// Returns [`crate::FusionError::InvalidParameter`] if the resulting
    /// configuration fails validation
    pub fn into_config(self) -> Result<CleanConfig> {
        let config = CleanConfig {
            input_dir: self.input,
            output_dir: self.output_dir,
            min_component_size: self.min_size,
            workers: self.workers,
        };
        config.validate()?;
        Ok(config)
    }
}

impl Cli {
    /// Check if progress should be displayed
    pub const fn should_show_progress(&self) -> bool {
        !self.quiet
    }

    /// Run the selected operation to completion
    ///
    /// # Errors
    ///
    /// Returns an error for invalid configuration or run-level failures;
    /// per-case failures are counted in the summary instead
    pub fn run(self) -> Result<RunSummary> {
        let show_progress = self.should_show_progress();
        match self.command {
            Command::Fuse(args) => run_fusion(&args.into_config()?, show_progress),
            Command::Clean(args) => run_clean(&args.into_config()?, show_progress),
        }
    }
}
