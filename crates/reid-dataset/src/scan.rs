// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Discovery of image/annotation pairs.
//!
//! Two source layouts are supported:
//!
//! - **Nested**: `root/group/subject/camera_setting/camera_id/*.png`, with a
//!   label tree mirroring the same relative paths and holding `*.xml` files
//!   of the same stem.
//! - **Flat**: one directory of annotations and one of images, the image
//!   being named by the annotation's `FILE/name` element.

use crate::{Annotation, Error, JobConfig, RecordError, Summary};
use itertools::Itertools;
use log::{debug, info, warn};
use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};
use walkdir::WalkDir;

/// An image/annotation pair found by traversal, not yet extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub image: PathBuf,
    pub annotation: PathBuf,
    /// Zero-based position of the image in its sorted folder.
    pub index: usize,
}

/// A pair whose annotation has been extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub image: PathBuf,
    pub annotation: PathBuf,
    pub index: usize,
    pub meta: Annotation,
}

/// Image files directly inside `dir`, sorted by file name.
pub fn list_images(dir: &Path, config: &JobConfig) -> Result<Vec<PathBuf>, Error> {
    let images = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && config.is_image(path))
        .sorted_by(|a, b| a.file_name().cmp(&b.file_name()))
        .collect();
    Ok(images)
}

/// Files directly inside `dir` with the `xml` extension, sorted by file name.
pub fn list_annotations(dir: &Path) -> Result<Vec<PathBuf>, Error> {
    let annotations = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|e| e.eq_ignore_ascii_case("xml"))
        })
        .sorted_by(|a, b| a.file_name().cmp(&b.file_name()))
        .collect();
    Ok(annotations)
}

/// Annotation path for `image` inside `label_dir`: same stem, `.xml`.
pub fn annotation_for(image: &Path, label_dir: &Path) -> PathBuf {
    label_dir.join(stem_with_extension(image, "xml"))
}

/// File name made of the stem of `path` and `extension`. Unlike
/// [`Path::with_extension`] this keeps dots inside the stem.
fn stem_with_extension(path: &Path, extension: &str) -> OsString {
    let mut name = path.file_stem().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(extension.trim_start_matches('.'));
    name
}

/// Walk the nested image tree under `config.source_root` and pair every
/// image with its mirrored annotation.
///
/// Images without an annotation are counted as missing pairs; image folders
/// without a mirrored label folder are skipped entirely. Every image takes a
/// positional index in its folder, whether or not it could be paired.
pub fn scan_nested(config: &JobConfig, summary: &mut Summary) -> Result<Vec<Candidate>, Error> {
    require_dir(&config.source_root)?;
    require_dir(&config.label_root)?;

    let root = config.source_root.as_path();
    let mut candidates = Vec::new();

    // No min_depth: filter_entry must see the group folders at depth 1.
    let walker = WalkDir::new(root)
        .max_depth(config.leaf_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 1
                && let Some(name) = entry.file_name().to_str()
                && config.skip_groups.iter().any(|g| g == name)
            {
                info!("Skipping group {}", name);
                return false;
            }
            true
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Failed to traverse {:?}: {}", err.path(), err);
                continue;
            }
        };
        if entry.depth() != config.leaf_depth || !entry.file_type().is_dir() {
            continue;
        }

        let image_dir = entry.path();
        let relative = image_dir.strip_prefix(root).unwrap_or(image_dir);
        let label_dir = config.label_root.join(relative);

        if !label_dir.is_dir() {
            warn!("No label folder for {}", image_dir.display());
            summary.missing_label_dirs += 1;
            continue;
        }

        let images = match list_images(image_dir, config) {
            Ok(images) => images,
            Err(err) => {
                warn!("Failed to list {}: {}", image_dir.display(), err);
                continue;
            }
        };
        debug!("{}: {} images", relative.display(), images.len());

        for (index, image) in images.into_iter().enumerate() {
            summary.scanned += 1;
            let annotation = annotation_for(&image, &label_dir);
            if !annotation.is_file() {
                summary.record_error(RecordError::MissingPair {
                    present: image,
                    missing: annotation,
                });
                continue;
            }
            candidates.push(Candidate {
                image,
                annotation,
                index,
            });
        }
    }

    info!(
        "Found {} image/annotation pairs under {}",
        candidates.len(),
        root.display()
    );
    Ok(candidates)
}

/// Extract every annotation in `label_dir` and pair it with its image in
/// `image_dir`.
///
/// The image is named by `FILE/name`, falling back to the annotation stem
/// with the first configured image extension.
pub fn scan_flat(
    label_dir: &Path,
    image_dir: &Path,
    config: &JobConfig,
    summary: &mut Summary,
) -> Result<Vec<Record>, Error> {
    require_dir(label_dir)?;
    require_dir(image_dir)?;

    let mut records = Vec::new();

    for (index, annotation) in list_annotations(label_dir)?.into_iter().enumerate() {
        summary.scanned += 1;

        let meta = match Annotation::read(&annotation, &config.placeholders, &config.default_mode)
        {
            Ok(meta) => meta,
            Err(error) => {
                summary.record_error(RecordError::Extraction {
                    path: annotation,
                    error,
                });
                continue;
            }
        };

        // FILE/name may carry a directory; only its last component is used.
        let image_name = match meta.image_name.as_deref().and_then(|n| Path::new(n).file_name()) {
            Some(name) => name.to_os_string(),
            None => {
                let extension = config.image_extensions.first().map_or("png", String::as_str);
                stem_with_extension(&annotation, extension)
            }
        };
        let image = image_dir.join(image_name);

        if !image.is_file() {
            summary.record_error(RecordError::MissingPair {
                present: annotation,
                missing: image,
            });
            continue;
        }

        records.push(Record {
            image,
            annotation,
            index,
            meta,
        });
    }

    info!(
        "Extracted {} records from {}",
        records.len(),
        label_dir.display()
    );
    Ok(records)
}

/// Fail with [`Error::MissingDirectory`] unless `path` is a directory.
pub fn require_dir(path: &Path) -> Result<(), Error> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(Error::MissingDirectory(path.to_path_buf()))
    }
}
