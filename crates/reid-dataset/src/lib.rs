// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! # Re-identification Dataset Preparation
//!
//! Tools for turning a person re-identification image corpus into training
//! and validation sets. Every image has a companion XML annotation naming
//! the subject and their outfit; images of the same subject in the same
//! outfit form a *group*, and groups are never split across output sets.
//!
//! ## Pipeline
//!
//! 1. **Scan**: pair images with annotations ([`scan_nested`], [`scan_flat`])
//! 2. **Extract**: read capture mode, subject and garments ([`Annotation`])
//! 3. **Filter**: delete invalid capture modes, subsample by folder position
//!    ([`filter_candidates`])
//! 4. **Assign**: shuffle group keys and deal them round-robin
//!    ([`Partitioner`])
//! 5. **Materialize**: copy or move files into per-group folders
//!    ([`Materializer`])
//!
//! ## Jobs
//!
//! - [`run_partition`]: nested `group/subject/setting/camera` tree
//! - [`run_split`]: flat label and image folders
//! - [`run_subsample`]: copy every second pair of a part folder
//! - [`run_classify`]: group the files of a folder in place
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use reid_dataset::{JobConfig, JobKind, run_partition};
//!
//! let mut config = JobConfig::load(JobKind::Partition, None)?;
//! config.source_root = "DATA/Training/raw/TS".into();
//! config.label_root = "DATA/Training/label/TS".into();
//! config.output_root = "DATA/TRAIN".into();
//! config.partitions = 20;
//!
//! let summary = run_partition(&config, None)?;
//! println!("{} groups in {} partitions", summary.groups, summary.partitions_written);
//! # Ok::<(), reid_dataset::Error>(())
//! ```

mod annotation;
mod config;
mod error;
mod filter;
mod job;
mod key;
mod materialize;
mod partition;
mod scan;
mod summary;

pub use crate::{
    annotation::Annotation,
    config::{
        JobConfig, JobKind, Layout, Placeholders, Subsample, TransferMode, default_config_path,
    },
    error::Error,
    filter::{Verdict, filter_candidate, filter_candidates},
    job::{run_classify, run_partition, run_split, run_subsample},
    key::{GroupKey, sanitize_component},
    materialize::{Materializer, remaining_files, transfer_file},
    partition::{Groups, Partition, Partitioner, group_records},
    scan::{Candidate, Record, annotation_for, list_annotations, list_images, scan_flat, scan_nested},
    summary::{PartitionStats, RecordError, Summary},
};

/// Progress of a long running stage.
///
/// # Example
///
/// ```rust
/// use reid_dataset::Progress;
///
/// let progress = Progress { current: 25, total: 100 };
/// let percentage = (progress.current as f64 / progress.total as f64) * 100.0;
/// assert_eq!(percentage, 25.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Current number of completed items.
    pub current: usize,
    /// Total number of items to process.
    pub total: usize,
}
