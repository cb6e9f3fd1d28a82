//! Reference geometry loading and label volume persistence
//!
//! Output volumes borrow the affine transform and header of a per-case
//! reference volume. Voxel data is always written as unsigned bytes.

use std::fs;
use std::path::{Path, PathBuf};

use ndarray::{Array3, ArrayD, Axis, Ix3};
use nifti::writer::WriterOptions;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};

use crate::io::configuration::{PARTIAL_OUTPUT_PREFIX, VOLUME_EXTENSION};
use crate::io::error::{FusionError, Result, WithPath, load_failure};

/// Affine transform, header and spatial shape of a case's reference volume
#[derive(Debug, Clone)]
pub struct ReferenceGeometry {
    affine: [[f32; 4]; 4],
    header: NiftiHeader,
    shape: [usize; 3],
}

impl ReferenceGeometry {
    /// Read the geometry of the reference volume for `case`
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::MissingReferenceGeometry`] if `path` does not
    /// exist, or [`FusionError::LoadFailure`] if it is not a readable 3D volume
    pub fn load(case: &str, path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(FusionError::MissingReferenceGeometry {
                case: case.to_string(),
                path: path.to_path_buf(),
            });
        }

        let header = NiftiHeader::from_file(path).load_context(path)?;
        Self::from_header(header).map_err(|reason| load_failure(path, &reason))
    }

    /// Build geometry from an already parsed header
    ///
    /// # Errors
    ///
    /// Returns a description of the problem if the header does not describe
    /// a volume with exactly three non-singleton-padded spatial axes
    pub fn from_header(header: NiftiHeader) -> std::result::Result<Self, String> {
        let ndim = usize::from(header.dim.first().copied().unwrap_or(0));
        let extents: Vec<usize> = header
            .dim
            .iter()
            .skip(1)
            .take(ndim)
            .map(|&d| usize::from(d))
            .collect();

        let trailing_singletons = extents.iter().skip(3).all(|&d| d == 1);
        let shape = match extents.as_slice() {
            [d0, d1, d2, ..] if trailing_singletons => [*d0, *d1, *d2],
            _ => return Err(format!("reference is not a 3D volume (dims {extents:?})")),
        };

        let affine = best_affine(&header);

        Ok(Self {
            affine,
            header,
            shape,
        })
    }

    /// Voxel-to-world transform, row-major
    ///
    /// Taken from the sform when `sform_code > 0`, else from the qform when
    /// `qform_code > 0`, else a plain voxel-size scaling.
    pub const fn affine(&self) -> &[[f32; 4]; 4] {
        &self.affine
    }

    /// Header metadata copied onto outputs
    pub const fn header(&self) -> &NiftiHeader {
        &self.header
    }

    /// Declared spatial shape
    pub const fn shape(&self) -> [usize; 3] {
        self.shape
    }
}

const HOMOGENEOUS_ROW: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

fn best_affine(header: &NiftiHeader) -> [[f32; 4]; 4] {
    if header.sform_code > 0 {
        [header.srow_x, header.srow_y, header.srow_z, HOMOGENEOUS_ROW]
    } else if header.qform_code > 0 {
        qform_affine(header)
    } else {
        let [_, dx, dy, dz, ..] = header.pixdim;
        [
            [voxel_size(dx), 0.0, 0.0, 0.0],
            [0.0, voxel_size(dy), 0.0, 0.0],
            [0.0, 0.0, voxel_size(dz), 0.0],
            HOMOGENEOUS_ROW,
        ]
    }
}

// Non-positive voxel sizes are treated as 1
const fn voxel_size(pixdim: f32) -> f32 {
    if pixdim > 0.0 { pixdim } else { 1.0 }
}

// Rotation from the unit quaternion (a, b, c, d) with a recovered from b, c, d
fn qform_affine(header: &NiftiHeader) -> [[f32; 4]; 4] {
    let (mut b, mut c, mut d) = (
        f64::from(header.quatern_b),
        f64::from(header.quatern_c),
        f64::from(header.quatern_d),
    );
    let norm = b.mul_add(b, c.mul_add(c, d * d));
    let a = if norm < 1.0 {
        (1.0 - norm).sqrt()
    } else {
        let scale = norm.sqrt();
        b /= scale;
        c /= scale;
        d /= scale;
        0.0
    };

    let [qfac, dx, dy, dz, ..] = header.pixdim;
    let flip = if qfac < 0.0 { -1.0 } else { 1.0 };
    let zooms = [
        f64::from(voxel_size(dx)),
        f64::from(voxel_size(dy)),
        f64::from(voxel_size(dz)) * flip,
    ];

    let (aa, bb, cc, dd) = (a * a, b * b, c * c, d * d);
    let (ab, ac, ad) = (a * b, a * c, a * d);
    let (bc, bd, cd) = (b * c, b * d, c * d);
    let rotation = [
        [aa + bb - cc - dd, 2.0 * (bc - ad), 2.0 * (bd + ac)],
        [2.0 * (bc + ad), aa + cc - bb - dd, 2.0 * (cd - ab)],
        [2.0 * (bd - ac), 2.0 * (cd + ab), aa + dd - bb - cc],
    ];
    let offsets = [header.quatern_x, header.quatern_y, header.quatern_z];

    let mut affine = [HOMOGENEOUS_ROW; 4];
    for ((row, axes), offset) in affine.iter_mut().zip(rotation).zip(offsets) {
        for ((cell, r), zoom) in row.iter_mut().zip(axes).zip(zooms) {
            *cell = (r * zoom) as f32;
        }
        if let Some(translation) = row.get_mut(3) {
            *translation = offset;
        }
    }
    affine
}

/// Read an existing label volume together with its own geometry
///
/// Values are truncated to unsigned bytes.
///
/// # Errors
///
/// Returns [`FusionError::LoadFailure`] if the file cannot be read or is not
/// three-dimensional
pub fn read_label_volume(path: &Path) -> Result<(Array3<u8>, ReferenceGeometry)> {
    let object = ReaderOptions::new().read_file(path).load_context(path)?;
    let geometry = ReferenceGeometry::from_header(object.header().clone())
        .map_err(|reason| load_failure(path, &reason))?;

    let mut data: ArrayD<f32> = object.into_volume().into_ndarray().load_context(path)?;
    while data.ndim() > 3 && data.shape().last() == Some(&1) {
        let last = Axis(data.ndim() - 1);
        data = data.index_axis_move(last, 0);
    }

    let labels = data
        .into_dimensionality::<Ix3>()
        .load_context(path)?
        .mapv(|v| v as u8);

    Ok((labels, geometry))
}

/// Deterministic output location for a case
pub fn output_path(output_dir: &Path, case: &str) -> PathBuf {
    output_dir.join(format!("{case}.{VOLUME_EXTENSION}"))
}

/// Persist `labels` with the reference affine and header
///
/// The volume is written to a hidden sibling file and renamed into place,
/// so a failed write never leaves a partial output behind.
///
/// # Errors
///
/// Returns [`FusionError::WriteFailure`] if the output directory cannot be
/// created or the volume cannot be written
pub fn write_label_volume(
    labels: &Array3<u8>,
    geometry: &ReferenceGeometry,
    output_dir: &Path,
    case: &str,
) -> Result<PathBuf> {
    let final_path = output_path(output_dir, case);
    fs::create_dir_all(output_dir).write_context(output_dir)?;

    let partial_path = output_dir.join(format!(
        "{PARTIAL_OUTPUT_PREFIX}{case}.{VOLUME_EXTENSION}"
    ));

    let written = WriterOptions::new(&partial_path)
        .reference_header(&geometry.header)
        .write_nifti(labels)
        .write_context(&final_path)
        .and_then(|()| fs::rename(&partial_path, &final_path).write_context(&final_path));

    if written.is_err() && partial_path.exists() {
        if let Err(e) = fs::remove_file(&partial_path) {
            tracing::debug!(
                path = %partial_path.display(),
                error = %e,
                "could not remove partial output"
            );
        }
    }

    written.map(|()| final_path)
}
