//! Per-case processing chains and run entry points
//!
//! A fusion case runs load → decide → reconcile → filter → write; a clean
//! case runs load → filter → write. The output file is written last, only
//! after every earlier stage has succeeded.

use std::path::{Path, PathBuf};

use ndarray::{Array3, Ix4};

use crate::algorithm::dispatcher::{Dispatcher, RunSummary};
use crate::io::archive::ProbabilityVolume;
use crate::io::configuration::{
    DEFAULT_CLASS_INDEX, DEFAULT_MIN_COMPONENT_SIZE, DEFAULT_WORKERS, PROBABILITY_ENTRY,
    PROBABILITY_EXTENSION,
};
use crate::io::discovery::{Case, discover_cases, discover_label_volumes};
use crate::io::error::{Result, invalid_parameter};
use crate::io::geometry::{ReferenceGeometry, read_label_volume, write_label_volume};
use crate::io::progress::ProgressManager;
use crate::math::decision::{DecisionMode, argmax_labels, threshold_labels};
use crate::math::fusion::{WeightedVolume, fuse, fused_upper_bound};
use crate::spatial::axes::{AxisMode, reconcile, spatial_shape};
use crate::spatial::components::{FilterReport, remove_small_components};

/// One probability source and its fusion weight
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSpec {
    /// Directory of per-case probability archives
    pub dir: PathBuf,
    /// Multiplier applied to this source's probabilities
    pub weight: f32,
}

/// Immutable parameters of a fusion run
#[derive(Debug, Clone, PartialEq)]
pub struct FusionConfig {
    /// Probability sources, in fusion order
    pub sources: Vec<SourceSpec>,
    /// Directory of `<case>.nii.gz` reference volumes
    pub reference_dir: PathBuf,
    /// Directory receiving one label volume per processed case
    pub output_dir: PathBuf,
    /// Argmax or scalar threshold
    pub decision: DecisionMode,
    /// Axis-order reconciliation strategy
    pub axis_mode: AxisMode,
    /// Components of this many voxels or fewer are removed
    pub min_component_size: usize,
    /// Worker pool size
    pub workers: usize,
    /// Strip `_NNNN` channel suffixes from archive stems
    pub strip_channel_suffix: bool,
}

impl FusionConfig {
    /// Configuration with default decision, axis and pool settings
    pub fn new(sources: Vec<SourceSpec>, reference_dir: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            sources,
            reference_dir,
            output_dir,
            decision: DecisionMode::Argmax,
            axis_mode: AxisMode::default(),
            min_component_size: DEFAULT_MIN_COMPONENT_SIZE,
            workers: DEFAULT_WORKERS,
            strip_channel_suffix: false,
        }
    }

    /// Switch to threshold mode on the default lesion class
    #[must_use]
    pub const fn with_threshold(mut self, threshold: f32) -> Self {
        self.decision = DecisionMode::Threshold {
            threshold,
            class_index: DEFAULT_CLASS_INDEX,
        };
        self
    }

    /// Check every parameter before any case runs
    ///
    /// # Errors
    ///
    /// Returns [`crate::FusionError::InvalidParameter`] for an empty source
    /// list, a non-finite weight or threshold, or a zero-sized pool
    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            return Err(invalid_parameter(
                "sources",
                &0,
                &"at least one source is required",
            ));
        }
        if let Some(source) = self.sources.iter().find(|s| !s.weight.is_finite()) {
            return Err(invalid_parameter(
                "weight",
                &source.weight,
                &format!("weight for '{}' must be finite", source.dir.display()),
            ));
        }
        if let DecisionMode::Threshold { threshold, .. } = self.decision
            && !threshold.is_finite()
        {
            return Err(invalid_parameter(
                "threshold",
                &threshold,
                &"must be finite",
            ));
        }
        validate_workers(self.workers)
    }

    fn weights(&self) -> Vec<f32> {
        self.sources.iter().map(|s| s.weight).collect()
    }
}

/// Immutable parameters of a cleaning run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanConfig {
    /// Directory of existing label volumes
    pub input_dir: PathBuf,
    /// Directory receiving the cleaned volumes
    pub output_dir: PathBuf,
    /// Components of this many voxels or fewer are removed
    pub min_component_size: usize,
    /// Worker pool size
    pub workers: usize,
}

impl CleanConfig {
    /// Check every parameter before any case runs
    ///
    /// # Errors
    ///
    /// Returns [`crate::FusionError::InvalidParameter`] for a zero-sized pool
    pub fn validate(&self) -> Result<()> {
        validate_workers(self.workers)
    }
}

fn validate_workers(workers: usize) -> Result<()> {
    if workers == 0 {
        return Err(invalid_parameter(
            "workers",
            &workers,
            &"worker pool needs at least one worker",
        ));
    }
    Ok(())
}

/// What a successful case produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseReport {
    /// Component counts before and after filtering
    pub filter: FilterReport,
    /// Whether the spatial axes were reversed
    pub reversed_axes: bool,
    /// Non-zero voxels in the written volume
    pub foreground_voxels: usize,
    /// Written file
    pub output: PathBuf,
}

/// Fuse and decide one case's probability volumes
///
/// # Errors
///
/// Returns [`crate::FusionError::LoadFailure`] if a class index is out of
/// range, [`crate::FusionError::ShapeMismatch`] if sources disagree in
/// shape, or [`crate::FusionError::InvalidParameter`] if the tensor cannot
/// be labelled
pub fn decide_case(
    decision: DecisionMode,
    volumes: &[ProbabilityVolume],
    weights: &[f32],
) -> Result<Array3<u8>> {
    match decision {
        DecisionMode::Argmax => {
            let sources: Vec<WeightedVolume<'_, f32, Ix4>> = volumes
                .iter()
                .zip(weights)
                .map(|(volume, &weight)| WeightedVolume::new(volume.view(), weight))
                .collect();
            tracing::debug!(upper = fused_upper_bound(&sources), "argmax fusion");
            let fused = fuse(&sources)?;
            argmax_labels(&fused.view())
        }
        DecisionMode::Threshold {
            threshold,
            class_index,
        } => {
            let sources = volumes
                .iter()
                .zip(weights)
                .map(|(volume, &weight)| {
                    volume
                        .class_map(class_index)
                        .map(|map| WeightedVolume::new(map, weight))
                })
                .collect::<Result<Vec<_>>>()?;
            tracing::debug!(
                upper = fused_upper_bound(&sources),
                threshold,
                class_index,
                "threshold fusion"
            );
            let fused = fuse(&sources)?;
            Ok(threshold_labels(&fused.view(), threshold))
        }
    }
}

/// Run the full fusion chain for one case
///
/// # Errors
///
/// Returns [`crate::FusionError::MissingReferenceGeometry`] when the case has
/// no reference volume, and any load, shape or write failure of its chain
pub fn fuse_case(config: &FusionConfig, case: &Case) -> Result<CaseReport> {
    let geometry = ReferenceGeometry::load(&case.id, &case.reference)?;

    if case.inputs.len() != config.sources.len() {
        return Err(invalid_parameter(
            "inputs",
            &case.inputs.len(),
            &format!("expected one input per source ({})", config.sources.len()),
        ));
    }

    let volumes = case
        .inputs
        .iter()
        .map(|path| ProbabilityVolume::load(path, PROBABILITY_ENTRY))
        .collect::<Result<Vec<_>>>()?;

    for volume in &volumes {
        tracing::debug!(
            case = %case.id,
            path = %volume.path().display(),
            classes = volume.classes(),
            shape = ?volume.spatial_shape(),
            "loaded probabilities"
        );
    }

    let labels = decide_case(config.decision, &volumes, &config.weights())?;
    drop(volumes);

    let reconciled = reconcile(config.axis_mode, labels, geometry.shape())?;
    let shape = spatial_shape(&reconciled.array);
    if shape != geometry.shape() {
        tracing::warn!(
            case = %case.id,
            found = ?shape,
            expected = ?geometry.shape(),
            "label volume shape differs from reference; writing anyway"
        );
    }

    let mut final_labels = reconciled.array;
    finish_case(
        &mut final_labels,
        &geometry,
        config.min_component_size,
        &config.output_dir,
        &case.id,
    )
    .map(|(filter, foreground_voxels, output)| CaseReport {
        filter,
        reversed_axes: reconciled.reversed,
        foreground_voxels,
        output,
    })
}

/// Run the filter-and-rewrite chain for one existing label volume
///
/// # Errors
///
/// Returns [`crate::FusionError::LoadFailure`] if the volume cannot be read,
/// or [`crate::FusionError::WriteFailure`] if it cannot be written back
pub fn clean_case(config: &CleanConfig, case: &Case) -> Result<CaseReport> {
    let (mut labels, geometry) = read_label_volume(&case.reference)?;

    finish_case(
        &mut labels,
        &geometry,
        config.min_component_size,
        &config.output_dir,
        &case.id,
    )
    .map(|(filter, foreground_voxels, output)| CaseReport {
        filter,
        reversed_axes: false,
        foreground_voxels,
        output,
    })
}

fn finish_case(
    labels: &mut Array3<u8>,
    geometry: &ReferenceGeometry,
    min_component_size: usize,
    output_dir: &Path,
    case: &str,
) -> Result<(FilterReport, usize, PathBuf)> {
    let filter = remove_small_components(labels, min_component_size);
    let foreground = labels.iter().filter(|&&v| v != 0).count();
    let output = write_label_volume(labels, geometry, output_dir, case)?;
    Ok((filter, foreground, output))
}

/// Discover cases and fuse them across a bounded worker pool
///
/// # Errors
///
/// Returns an error only for run-level problems: invalid configuration, an
/// unreadable source directory, or a pool that cannot be built. Per-case
/// errors are reported in the summary.
pub fn run_fusion(config: &FusionConfig, show_progress: bool) -> Result<RunSummary> {
    config.validate()?;

    let source_dirs: Vec<&Path> = config.sources.iter().map(|s| s.dir.as_path()).collect();
    let cases = discover_cases(
        &source_dirs,
        &config.reference_dir,
        PROBABILITY_EXTENSION,
        config.strip_channel_suffix,
    )?;

    tracing::info!(
        cases = cases.len(),
        weights = ?config.weights(),
        decision = ?config.decision,
        axis_mode = %config.axis_mode,
        min_size = config.min_component_size,
        "fusing cases"
    );

    let dispatcher = Dispatcher::new(config.workers, progress_for(show_progress, cases.len()))?;
    Ok(dispatcher.run_summarised(&cases, |case| fuse_case(config, case)))
}

/// Clean every label volume in a directory across a bounded worker pool
///
/// # Errors
///
/// Returns an error only for run-level problems: invalid configuration, an
/// unreadable input directory, or a pool that cannot be built
pub fn run_clean(config: &CleanConfig, show_progress: bool) -> Result<RunSummary> {
    config.validate()?;

    let cases = discover_label_volumes(&config.input_dir)?;
    tracing::info!(
        cases = cases.len(),
        min_size = config.min_component_size,
        "cleaning label volumes"
    );

    let dispatcher = Dispatcher::new(config.workers, progress_for(show_progress, cases.len()))?;
    Ok(dispatcher.run_summarised(&cases, |case| clean_case(config, case)))
}

fn progress_for(show: bool, cases: usize) -> ProgressManager {
    if show {
        ProgressManager::new(cases)
    } else {
        ProgressManager::hidden()
    }
}
