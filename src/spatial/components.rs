//! Connected-component labelling and small-island removal
//!
//! Components use 6-connectivity: voxels are neighbours only when they share
//! a face. Any non-zero value counts as foreground.

use std::collections::VecDeque;

use bitvec::prelude::*;
use ndarray::{Array3, ArrayView3, Zip};
use num_traits::Zero;

/// Face-adjacent neighbour offsets in three dimensions
const FACE_NEIGHBOURS: [[isize; 3]; 6] = [
    [-1, 0, 0],
    [1, 0, 0],
    [0, -1, 0],
    [0, 1, 0],
    [0, 0, -1],
    [0, 0, 1],
];

/// Integer component labels with per-label voxel counts
///
/// Label 0 is background; `sizes[0]` counts background voxels and is never
/// considered a component.
#[derive(Debug, Clone)]
pub struct ComponentLabeling {
    /// Component label per voxel
    pub labels: Array3<u32>,
    /// Voxel count indexed by label
    pub sizes: Vec<usize>,
}

impl ComponentLabeling {
    /// Number of foreground components
    pub const fn count(&self) -> usize {
        self.sizes.len().saturating_sub(1)
    }

    /// Voxel count of `label`, if it exists
    pub fn size_of(&self, label: u32) -> Option<usize> {
        self.sizes.get(label as usize).copied()
    }
}

/// Outcome of a filtering pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterReport {
    /// Components found in the input
    pub components_before: usize,
    /// Components found when relabelling the filtered output
    pub components_after: usize,
}

impl FilterReport {
    /// Components removed, derived from the relabelled output
    pub const fn removed(&self) -> usize {
        self.components_before.saturating_sub(self.components_after)
    }
}

/// Label face-connected foreground components
pub fn label_components<A>(volume: &ArrayView3<'_, A>) -> ComponentLabeling
where
    A: Copy + Zero,
{
    let dim = volume.dim();
    let mut labels = Array3::<u32>::zeros(dim);
    let mut sizes = vec![0_usize];
    let mut queue = VecDeque::new();

    for ((i, j, k), value) in volume.indexed_iter() {
        let unvisited = labels.get([i, j, k]).is_some_and(|&l| l == 0);
        if value.is_zero() {
            if let Some(background) = sizes.first_mut() {
                *background += 1;
            }
            continue;
        }
        if !unvisited {
            continue;
        }

        let label = sizes.len() as u32;
        let mut size = 0;
        if let Some(slot) = labels.get_mut([i, j, k]) {
            *slot = label;
        }
        queue.push_back([i, j, k]);

        while let Some(voxel) = queue.pop_front() {
            size += 1;
            for offset in &FACE_NEIGHBOURS {
                let Some(neighbour) = step(voxel, *offset, dim) else {
                    continue;
                };
                let foreground = volume.get(neighbour).is_some_and(|v| !v.is_zero());
                if let Some(slot) = labels.get_mut(neighbour)
                    && foreground
                    && *slot == 0
                {
                    *slot = label;
                    queue.push_back(neighbour);
                }
            }
        }

        sizes.push(size);
    }

    ComponentLabeling { labels, sizes }
}

// Neighbouring index, or None when it falls outside the volume
fn step(voxel: [usize; 3], offset: [isize; 3], dim: (usize, usize, usize)) -> Option<[usize; 3]> {
    let extents = [dim.0, dim.1, dim.2];
    let mut next = [0; 3];
    for axis in 0..3 {
        let coordinate = voxel.get(axis)?.checked_add_signed(*offset.get(axis)?)?;
        if coordinate >= *extents.get(axis)? {
            return None;
        }
        *next.get_mut(axis)? = coordinate;
    }
    Some(next)
}

/// Keep-mask over labels: a component survives iff its size exceeds `min_size`
///
/// Background is never kept, whatever its size.
pub fn keep_mask(labeling: &ComponentLabeling, min_size: usize) -> BitVec {
    let mut keep = bitvec![0; labeling.sizes.len()];
    for (label, &size) in labeling.sizes.iter().enumerate().skip(1) {
        if size > min_size {
            keep.set(label, true);
        }
    }
    keep
}

/// Remove components of `min_size` voxels or fewer, in place
///
/// Surviving voxels keep their original value. A volume without foreground
/// is left untouched.
pub fn remove_small_components<A>(volume: &mut Array3<A>, min_size: usize) -> FilterReport
where
    A: Copy + Zero,
{
    let labeling = label_components(&volume.view());
    let components_before = labeling.count();
    if components_before == 0 {
        return FilterReport::default();
    }

    let keep = keep_mask(&labeling, min_size);
    Zip::from(&mut *volume)
        .and(&labeling.labels)
        .for_each(|value, &label| {
            if keep.get(label as usize).as_deref() != Some(&true) {
                *value = A::zero();
            }
        });

    let components_after = label_components(&volume.view()).count();

    FilterReport {
        components_before,
        components_after,
    }
}
