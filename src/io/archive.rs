//! Probability tensor loading from compressed `.npz` archives
//!
//! Each archive holds one named array shaped `[class, dim0, dim1, dim2]`.
//! Archives are read once per case and source; nothing is cached.

use std::fs::File;
use std::path::{Path, PathBuf};

use ndarray::{Array4, ArrayView3, ArrayView4, Axis, Ix4, OwnedRepr};
use ndarray_npy::{NpzReader, ReadNpyError, ReadNpzError};

use crate::io::error::{Result, WithPath, load_failure};

/// Per-class probability tensor loaded from one source
#[derive(Debug, Clone)]
pub struct ProbabilityVolume {
    data: Array4<f32>,
    path: PathBuf,
}

impl ProbabilityVolume {
    /// Wrap an in-memory tensor
    pub const fn new(data: Array4<f32>, path: PathBuf) -> Self {
        Self { data, path }
    }

    /// Load the tensor stored under `entry` in the archive at `path`
    ///
    /// Float64 archives are narrowed to float32.
    ///
    /// # Errors
    ///
    /// Returns [`crate::FusionError::LoadFailure`] if the archive is missing,
    /// unreadable, lacks `entry`, or the entry is not four-dimensional
    pub fn load(path: &Path, entry: &str) -> Result<Self> {
        let file = File::open(path).load_context(path)?;
        let mut reader = NpzReader::new(file).load_context(path)?;
        let name = find_entry(&mut reader, path, entry)?;

        let data = match reader.by_name::<OwnedRepr<f32>, Ix4>(&name) {
            Ok(data) => data,
            Err(ReadNpzError::Npy(ReadNpyError::WrongDescriptor(descriptor))) => {
                tracing::debug!(
                    path = %path.display(),
                    descriptor = ?descriptor,
                    "entry is not float32, retrying as float64"
                );
                reader
                    .by_name::<OwnedRepr<f64>, Ix4>(&name)
                    .map_err(|e| {
                        let reason = format!("not float32 ({descriptor:?}); as float64: {e}");
                        load_failure(path, &reason)
                    })?
                    .mapv(|v| v as f32)
            }
            Err(e) => return Err(load_failure(path, &e)),
        };

        Ok(Self::new(data, path.to_path_buf()))
    }

    /// Number of classes along the leading axis
    pub fn classes(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    /// Spatial extents, excluding the class axis
    pub fn spatial_shape(&self) -> [usize; 3] {
        let (_, d0, d1, d2) = self.data.dim();
        [d0, d1, d2]
    }

    /// Archive the tensor was read from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Borrow the full tensor
    pub fn view(&self) -> ArrayView4<'_, f32> {
        self.data.view()
    }

    /// Borrow the probability map of a single class
    ///
    /// # Errors
    ///
    /// Returns [`crate::FusionError::LoadFailure`] if `class` is out of range
    pub fn class_map(&self, class: usize) -> Result<ArrayView3<'_, f32>> {
        if class >= self.classes() {
            return Err(load_failure(
                &self.path,
                &format!(
                    "class index {class} out of range for {} classes",
                    self.classes()
                ),
            ));
        }
        Ok(self.data.index_axis(Axis(0), class))
    }
}

// Archive member names may or may not carry the `.npy` suffix
fn find_entry(reader: &mut NpzReader<File>, path: &Path, entry: &str) -> Result<String> {
    let suffixed = format!("{entry}.npy");

    reader
        .names()
        .load_context(path)?
        .into_iter()
        .find(|name| name == entry || *name == suffixed)
        .ok_or_else(|| load_failure(path, &format!("archive has no '{entry}' entry")))
}
