// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Dataset preparation jobs.
//!
//! Each job takes a [`JobConfig`], runs to completion on the calling thread
//! and returns a [`Summary`]. Fatal problems (a missing root, an invalid
//! parameter) are returned as [`Error`] before anything on disk changes;
//! per-record problems are counted in the summary and never abort the run.

use crate::{
    Error, JobConfig, Layout, Materializer, Partition, PartitionStats, Partitioner, Progress,
    RecordError, Summary, TransferMode, filter_candidates, group_records,
    materialize::{remaining_files, transfer_file},
    scan::{annotation_for, list_images, require_dir, scan_flat, scan_nested},
};
use log::{info, warn};
use std::path::{Path, PathBuf};

/// Partition a nested image tree.
///
/// Walks `source_root` (see [`scan_nested`]), deletes records whose capture
/// mode is `invalid_mode`, subsamples by folder position, groups the rest by
/// subject and outfit, and writes the groups round-robin into `partitions`
/// folders under `output_root`.
///
/// When nothing survives filtering, no output is written.
///
/// # Example
///
/// ```rust,no_run
/// use reid_dataset::{JobConfig, JobKind, run_partition};
///
/// let config = JobConfig {
///     source_root: "DATA/Validation/raw/VS".into(),
///     label_root: "DATA/Validation/label/VS".into(),
///     output_root: "DATA/VALID".into(),
///     skip_groups: vec!["VS1_2020_IN".into(), "VS2_2020_OUT".into()],
///     ..JobConfig::for_job(JobKind::Partition)
/// };
/// let summary = run_partition(&config, None)?;
/// println!("{}", summary);
/// # Ok::<(), reid_dataset::Error>(())
/// ```
pub fn run_partition(
    config: &JobConfig,
    progress: Option<&dyn Fn(Progress)>,
) -> Result<Summary, Error> {
    config.validate()?;
    let partitioner = Partitioner::new(config.partitions, config.seed)?;
    let mut summary = Summary::default();

    let candidates = scan_nested(config, &mut summary)?;
    let records = filter_candidates(candidates, config, &mut summary);
    if records.is_empty() {
        warn!("No images collected, nothing to write");
        return Ok(summary);
    }

    let groups = group_records(records);
    summary.groups = groups.len();
    info!("{} unique groups", summary.groups);

    let partitions = partitioner.assign(groups);
    Materializer::new(config).write_all(&partitions, &mut summary, progress);
    Ok(summary)
}

/// Split a flat label directory (`label_root`) and image directory
/// (`source_root`) into partitions, keeping groups whole.
///
/// No mode or subsample filtering is applied.
pub fn run_split(
    config: &JobConfig,
    progress: Option<&dyn Fn(Progress)>,
) -> Result<Summary, Error> {
    config.validate()?;
    let partitioner = Partitioner::new(config.partitions, config.seed)?;
    let mut summary = Summary::default();

    let records = scan_flat(&config.label_root, &config.source_root, config, &mut summary)?;
    summary.kept = records.len();
    if records.is_empty() {
        warn!("No annotations collected, nothing to write");
        return Ok(summary);
    }

    let groups = group_records(records);
    summary.groups = groups.len();
    info!(
        "{} records in {} unique groups",
        summary.kept, summary.groups
    );

    let partitions = partitioner.assign(groups);
    Materializer::new(config).write_all(&partitions, &mut summary, progress);
    Ok(summary)
}

/// Copy every second image/annotation pair of each part directory into a
/// sibling folder.
///
/// For a part `P`, images in `P/<image_subdir>` are sorted by name and those
/// selected by `subsample` are copied together with their annotation from
/// `P/<label_subdir>` into `P/<name of P><odd_suffix>/`, keeping the two
/// sub-folders. Parts that do not exist are skipped.
pub fn run_subsample(parts: &[PathBuf], config: &JobConfig) -> Result<Summary, Error> {
    config.validate()?;
    let mut summary = Summary::default();

    for part in parts {
        if !part.is_dir() {
            warn!("Part folder {} not found, skipping", part.display());
            continue;
        }
        match subsample_part(part, config) {
            Ok(part_summary) => summary.merge(part_summary),
            Err(Error::MissingDirectory(dir)) => {
                warn!("{} not found, skipping {}", dir.display(), part.display());
            }
            Err(err) => return Err(err),
        }
    }

    Ok(summary)
}

fn subsample_part(part: &Path, config: &JobConfig) -> Result<Summary, Error> {
    let image_dir = part.join(&config.image_subdir);
    let label_dir = part.join(&config.label_subdir);
    require_dir(&image_dir)?;
    require_dir(&label_dir)?;

    let part_name = part
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let output = part.join(format!("{}{}", part_name, config.odd_suffix));
    let output_images = output.join(&config.image_subdir);
    let output_labels = output.join(&config.label_subdir);

    let images = list_images(&image_dir, config)?;
    info!("{}: {} images", part.display(), images.len());

    let mut summary = Summary::default();
    if images.is_empty() {
        warn!("No images in {}", image_dir.display());
        return Ok(summary);
    }

    for dir in [&output_images, &output_labels] {
        if let Err(error) = std::fs::create_dir_all(dir) {
            summary.record_error(RecordError::Directory {
                path: dir.clone(),
                records: images.len(),
                error,
            });
            return Ok(summary);
        }
    }

    for (index, image) in images.into_iter().enumerate() {
        summary.scanned += 1;
        if !config.subsample.keeps(index) {
            summary.subsampled_out += 1;
            continue;
        }

        let annotation = annotation_for(&image, &label_dir);
        if !annotation.is_file() {
            summary.record_error(RecordError::MissingPair {
                present: image,
                missing: annotation,
            });
            continue;
        }

        let mut complete = true;
        for (from, dir) in [(&image, &output_images), (&annotation, &output_labels)] {
            let Some(file_name) = from.file_name() else {
                continue;
            };
            let to = dir.join(file_name);
            match transfer_file(from, &to, config.transfer) {
                Ok(()) => summary.files_transferred += 1,
                Err(error) => {
                    complete = false;
                    summary.record_error(RecordError::Transfer {
                        from: from.clone(),
                        to,
                        error,
                    });
                }
            }
        }
        if complete {
            summary.kept += 1;
        }
    }

    info!(
        "{}: copied {} pairs into {}",
        part.display(),
        summary.kept,
        output.display()
    );
    Ok(summary)
}

/// Group the files of each directory in place.
///
/// For a directory `D`, every annotation in `D/<label_subdir>` and the image
/// it names in `D/<image_subdir>` are moved (or copied, per `transfer`) into
/// `D/<group key>/`. Files that could not be placed are reported as leftovers.
pub fn run_classify(
    dirs: &[PathBuf],
    config: &JobConfig,
    progress: Option<&dyn Fn(Progress)>,
) -> Result<Summary, Error> {
    config.validate()?;
    let config = JobConfig {
        layout: Layout::Grouped,
        ..config.clone()
    };
    let mut summary = Summary::default();

    for dir in dirs {
        if !dir.is_dir() {
            warn!("Folder {} not found, skipping", dir.display());
            continue;
        }
        match classify_dir(dir, &config, progress) {
            Ok(dir_summary) => summary.merge(dir_summary),
            Err(Error::MissingDirectory(missing)) => {
                warn!("{} not found, skipping {}", missing.display(), dir.display());
            }
            Err(err) => return Err(err),
        }
    }

    Ok(summary)
}

fn classify_dir(
    dir: &Path,
    config: &JobConfig,
    progress: Option<&dyn Fn(Progress)>,
) -> Result<Summary, Error> {
    let label_dir = dir.join(&config.label_subdir);
    let image_dir = dir.join(&config.image_subdir);

    let mut summary = Summary::default();
    let records = scan_flat(&label_dir, &image_dir, config, &mut summary)?;
    summary.kept = records.len();

    let groups = group_records(records);
    summary.groups = groups.len();
    let partition = Partition { number: 1, groups };
    let total = partition.record_count() * 2;
    let mut current = 0;

    Materializer::new(config).write_partition(dir, &partition, &mut summary, &mut |done| {
        current += done;
        if let Some(progress) = progress {
            progress(Progress { current, total });
        }
    });
    summary.partitions.push(PartitionStats {
        name: dir.display().to_string(),
        groups: partition.groups.len(),
        records: partition.record_count(),
    });

    if config.transfer == TransferMode::Move {
        for source in [&image_dir, &label_dir] {
            let leftovers = remaining_files(source).len();
            if leftovers > 0 {
                warn!("{} files remain in {}", leftovers, source.display());
            }
            summary.leftover_files += leftovers;
        }
    }

    info!(
        "{}: {} records into {} groups",
        dir.display(),
        summary.kept,
        summary.groups
    );
    Ok(summary)
}
