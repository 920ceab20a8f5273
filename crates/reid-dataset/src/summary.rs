// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Per-record outcomes and the run summary they are folded into.

use chrono::{DateTime, Utc};
use log::{error, warn};
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
};

/// A problem confined to one record. The job logs it, counts it in the
/// [`Summary`] and moves on to the next record.
#[derive(Debug)]
pub enum RecordError {
    /// The annotation could not be read or lacks a required element.
    Extraction { path: PathBuf, error: crate::Error },
    /// An image has no annotation, or an annotation has no image.
    MissingPair { present: PathBuf, missing: PathBuf },
    /// Deleting a source file of an invalid-mode record failed.
    Delete { path: PathBuf, error: std::io::Error },
    /// A group's output folder could not be created; none of its
    /// `records` were written.
    Directory {
        path: PathBuf,
        records: usize,
        error: std::io::Error,
    },
    /// Copying or moving a file into the output tree failed.
    Transfer {
        from: PathBuf,
        to: PathBuf,
        error: std::io::Error,
    },
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::Extraction { path, error } => {
                write!(f, "Failed to extract {}: {}", path.display(), error)
            }
            RecordError::MissingPair { present, missing } => write!(
                f,
                "Missing pair for {}: {} not found",
                present.display(),
                missing.display()
            ),
            RecordError::Delete { path, error } => {
                write!(f, "Failed to delete {}: {}", path.display(), error)
            }
            RecordError::Directory {
                path,
                records,
                error,
            } => write!(
                f,
                "Failed to create {} ({} records skipped): {}",
                path.display(),
                records,
                error
            ),
            RecordError::Transfer { from, to, error } => write!(
                f,
                "Failed to transfer {} to {}: {}",
                from.display(),
                to.display(),
                error
            ),
        }
    }
}

impl std::error::Error for RecordError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RecordError::Extraction { error, .. } => Some(error),
            RecordError::Delete { error, .. } => Some(error),
            RecordError::Directory { error, .. } => Some(error),
            RecordError::Transfer { error, .. } => Some(error),
            RecordError::MissingPair { .. } => None,
        }
    }
}

/// Group and record counts of one written partition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionStats {
    pub name: String,
    pub groups: usize,
    pub records: usize,
}

/// Counts collected over a job run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Images (or annotations, for flat sources) discovered.
    pub scanned: usize,
    /// Records deleted because of the invalid capture mode.
    pub removed_invalid_mode: usize,
    /// Records dropped by the subsampling filter.
    pub subsampled_out: usize,
    /// Records retained after filtering.
    pub kept: usize,
    /// Distinct group keys among kept records.
    pub groups: usize,
    pub partitions_written: usize,
    /// Files copied or moved into the output tree.
    pub files_transferred: usize,
    pub extraction_errors: usize,
    pub missing_pairs: usize,
    /// Image folders without a mirrored annotation folder.
    pub missing_label_dirs: usize,
    pub delete_failures: usize,
    pub transfer_failures: usize,
    /// Group folders that could not be created.
    pub directory_failures: usize,
    /// Distinct keys that share a directory name inside one partition.
    pub name_collisions: usize,
    /// Files left behind in source folders after an in-place move.
    pub leftover_files: usize,
    pub partitions: Vec<PartitionStats>,
}

impl Summary {
    /// Log `err` and count it under its kind.
    pub fn record_error(&mut self, err: RecordError) {
        match &err {
            RecordError::Extraction { .. } => {
                self.extraction_errors += 1;
                warn!("{}", err);
            }
            RecordError::MissingPair { .. } => {
                self.missing_pairs += 1;
                warn!("{}", err);
            }
            RecordError::Delete { .. } => {
                self.delete_failures += 1;
                error!("{}", err);
            }
            RecordError::Directory { .. } => {
                self.directory_failures += 1;
                error!("{}", err);
            }
            RecordError::Transfer { .. } => {
                self.transfer_failures += 1;
                error!("{}", err);
            }
        }
    }

    /// Total number of per-record errors.
    pub fn error_count(&self) -> usize {
        self.extraction_errors
            + self.missing_pairs
            + self.delete_failures
            + self.transfer_failures
            + self.directory_failures
    }

    /// Add the counts of `other`, used when a job runs over several folders.
    pub fn merge(&mut self, other: Summary) {
        self.scanned += other.scanned;
        self.removed_invalid_mode += other.removed_invalid_mode;
        self.subsampled_out += other.subsampled_out;
        self.kept += other.kept;
        self.groups += other.groups;
        self.partitions_written += other.partitions_written;
        self.files_transferred += other.files_transferred;
        self.extraction_errors += other.extraction_errors;
        self.missing_pairs += other.missing_pairs;
        self.missing_label_dirs += other.missing_label_dirs;
        self.delete_failures += other.delete_failures;
        self.transfer_failures += other.transfer_failures;
        self.directory_failures += other.directory_failures;
        self.name_collisions += other.name_collisions;
        self.leftover_files += other.leftover_files;
        self.partitions.extend(other.partitions);
    }

    /// Write the summary as pretty JSON, stamped with the current time.
    pub fn write_json<P: AsRef<Path>>(&self, job: &str, path: P) -> Result<(), crate::Error> {
        #[derive(Serialize)]
        struct Report<'a> {
            job: &'a str,
            generated_at: DateTime<Utc>,
            #[serde(flatten)]
            summary: &'a Summary,
        }

        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let file = File::create(path.as_ref())?;
        let report = Report {
            job,
            generated_at: Utc::now(),
            summary: self,
        };
        serde_json::to_writer_pretty(BufWriter::new(file), &report)?;
        Ok(())
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "╔══════════════════════════════════════════════════════════════╗")?;
        writeln!(f, "║                        RUN SUMMARY                           ║")?;
        writeln!(f, "╠══════════════════════════════════════════════════════════════╣")?;
        writeln!(f, "║ Scanned:            {}", self.scanned)?;
        writeln!(f, "║ Removed (mode):     {}", self.removed_invalid_mode)?;
        writeln!(f, "║ Subsampled out:     {}", self.subsampled_out)?;
        writeln!(f, "║ Kept:               {}", self.kept)?;
        writeln!(f, "║ Groups:             {}", self.groups)?;
        writeln!(f, "║ Partitions written: {}", self.partitions_written)?;
        writeln!(f, "║ Files transferred:  {}", self.files_transferred)?;
        for partition in &self.partitions {
            writeln!(
                f,
                "║   {}: {} groups, {} records",
                partition.name, partition.groups, partition.records
            )?;
        }
        if self.error_count() > 0 || self.missing_label_dirs > 0 || self.name_collisions > 0 {
            writeln!(f, "╠══════════════════════════════════════════════════════════════╣")?;
            writeln!(f, "║ Extraction errors:  {}", self.extraction_errors)?;
            writeln!(f, "║ Missing pairs:      {}", self.missing_pairs)?;
            writeln!(f, "║ Missing label dirs: {}", self.missing_label_dirs)?;
            writeln!(f, "║ Delete failures:    {}", self.delete_failures)?;
            writeln!(f, "║ Transfer failures:  {}", self.transfer_failures)?;
            writeln!(f, "║ Folder failures:    {}", self.directory_failures)?;
            writeln!(f, "║ Name collisions:    {}", self.name_collisions)?;
        }
        if self.leftover_files > 0 {
            writeln!(f, "║ Leftover files:     {}", self.leftover_files)?;
        }
        writeln!(f, "╚══════════════════════════════════════════════════════════════╝")
    }
}
