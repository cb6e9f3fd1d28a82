//! Case discovery across probability source directories
//!
//! A case is processed only when every source holds an archive for it.
//! Identifiers are file stems with the archive extension removed and,
//! optionally, a trailing `_NNNN` channel index stripped.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::io::configuration::{CHANNEL_SUFFIX_DIGITS, VOLUME_EXTENSION};
use crate::io::error::{FusionError, Result};

/// One unit of work: an identifier, its input files and its reference volume
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Case {
    /// Stable identifier shared by every file of the case
    pub id: String,
    /// Input files, one per source, in source order
    pub inputs: Vec<PathBuf>,
    /// Volume whose geometry the output inherits
    pub reference: PathBuf,
}

/// Strip a trailing `_NNNN` channel index from a stem
pub fn strip_channel_suffix(stem: &str) -> &str {
    match stem.rsplit_once('_') {
        Some((base, digits))
            if !base.is_empty()
                && digits.len() == CHANNEL_SUFFIX_DIGITS
                && digits.bytes().all(|b| b.is_ascii_digit()) =>
        {
            base
        }
        _ => stem,
    }
}

/// Case identifier of `path` if it carries `extension`
///
/// Hidden files never name a case.
pub fn case_id(path: &Path, extension: &str, strip_channel: bool) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    if name.starts_with('.') {
        return None;
    }
    let stem = name.strip_suffix(extension)?.strip_suffix('.')?;
    if stem.is_empty() {
        return None;
    }
    let id = if strip_channel {
        strip_channel_suffix(stem)
    } else {
        stem
    };
    Some(id.to_string())
}

/// Map every case identifier in `dir` to its file
///
/// When several files collapse onto one identifier the first in sorted
/// order wins.
///
/// # Errors
///
/// Returns [`FusionError::FileSystem`] if the directory cannot be listed
pub fn scan_source(
    dir: &Path,
    extension: &str,
    strip_channel: bool,
) -> Result<BTreeMap<String, PathBuf>> {
    let list_error = |source| FusionError::FileSystem {
        path: dir.to_path_buf(),
        operation: "list directory",
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(list_error)? {
        let path = entry.map_err(list_error)?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();

    let mut cases: BTreeMap<String, PathBuf> = BTreeMap::new();
    for path in files {
        if let Some(id) = case_id(&path, extension, strip_channel) {
            if let Some(existing) = cases.get(&id) {
                tracing::debug!(
                    case = %id,
                    kept = %existing.display(),
                    ignored = %path.display(),
                    "duplicate case identifier"
                );
                continue;
            }
            cases.insert(id, path);
        }
    }

    Ok(cases)
}

/// Identifiers present in every one of `sources`
pub fn common_case_ids(sources: &[BTreeMap<String, PathBuf>]) -> BTreeSet<String> {
    let Some((first, rest)) = sources.split_first() else {
        return BTreeSet::new();
    };

    first
        .keys()
        .filter(|id| rest.iter().all(|source| source.contains_key(*id)))
        .cloned()
        .collect()
}

/// Discover the cases shared by all source directories
///
/// Cases missing from any source are excluded silently. Each case's
/// reference volume is `<reference_dir>/<id>.nii.gz`; its existence is
/// checked later, per case.
///
/// # Errors
///
/// Returns [`FusionError::FileSystem`] if a source directory cannot be listed
pub fn discover_cases(
    source_dirs: &[&Path],
    reference_dir: &Path,
    extension: &str,
    strip_channel: bool,
) -> Result<Vec<Case>> {
    let sources = source_dirs
        .iter()
        .map(|dir| scan_source(dir, extension, strip_channel))
        .collect::<Result<Vec<_>>>()?;

    for (dir, source) in source_dirs.iter().zip(&sources) {
        tracing::debug!(source = %dir.display(), cases = source.len(), "scanned source");
    }

    let cases = common_case_ids(&sources)
        .into_iter()
        .map(|id| {
            let inputs = sources
                .iter()
                .filter_map(|source| source.get(&id).cloned())
                .collect();
            let reference = reference_dir.join(format!("{id}.{VOLUME_EXTENSION}"));
            Case {
                id,
                inputs,
                reference,
            }
        })
        .collect();

    Ok(cases)
}

/// Enumerate existing label volumes for in-place cleaning
///
/// Each volume is its own reference.
///
/// # Errors
///
/// Returns [`FusionError::FileSystem`] if the directory cannot be listed
pub fn discover_label_volumes(dir: &Path) -> Result<Vec<Case>> {
    let cases = scan_source(dir, VOLUME_EXTENSION, false)?
        .into_iter()
        .map(|(id, path)| Case {
            id,
            inputs: vec![path.clone()],
            reference: path,
        })
        .collect();
    Ok(cases)
}
