// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Job configuration.
//!
//! A [`JobConfig`] is built once per run and passed into the job. Values are
//! layered from lowest to highest precedence:
//!
//! 1. Per-job defaults ([`JobConfig::for_job`])
//! 2. A config file (explicit path, or `reid-dataset.toml` in the platform
//!    config directory when it exists)
//! 3. Environment variables prefixed with `REID_DATASET_`
//!
//! Command line flags are applied by the caller on top of the loaded value.
//!
//! # Example
//!
//! ```rust,no_run
//! use reid_dataset::{JobConfig, JobKind};
//!
//! let mut config = JobConfig::load(JobKind::Partition, None)?;
//! config.partitions = 20;
//! config.seed = Some(7);
//! # Ok::<(), reid_dataset::Error>(())
//! ```

use crate::Error;
use directories::ProjectDirs;
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "reid-dataset.toml";
const ENV_PREFIX: &str = "REID_DATASET";

/// The jobs provided by this crate, used to select configuration defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    /// Nested tree: mode filter, subsample, group and partition.
    Partition,
    /// Flat label/image directories grouped into flat partitions.
    Split,
    /// Copy every second image/annotation pair of a part directory.
    Subsample,
    /// Move files of a directory into per-group folders in place.
    Classify,
}

/// Which positional indices the subsampling filter keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subsample {
    /// Keep every record.
    All,
    /// Keep zero-based indices 0, 2, 4, ...
    #[default]
    Even,
    /// Keep zero-based indices 1, 3, 5, ...
    Odd,
}

impl Subsample {
    /// Returns true when the record at the zero-based `index` is retained.
    pub fn keeps(self, index: usize) -> bool {
        match self {
            Subsample::All => true,
            Subsample::Even => index % 2 == 0,
            Subsample::Odd => index % 2 == 1,
        }
    }
}

impl std::str::FromStr for Subsample {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" | "none" => Ok(Subsample::All),
            "even" => Ok(Subsample::Even),
            "odd" => Ok(Subsample::Odd),
            other => Err(Error::InvalidParameters(format!(
                "unknown subsample parity '{}' (expected even, odd or all)",
                other
            ))),
        }
    }
}

/// How files reach their destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferMode {
    #[default]
    Copy,
    Move,
}

/// Output directory structure inside each partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// `partition/<group key>/<file>` for both images and annotations.
    #[default]
    Grouped,
    /// `partition/<label_subdir>/<xml>` and `partition/<image_subdir>/<image>`.
    Flat,
}

/// Strings substituted for annotation fields that are absent or empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Placeholders {
    pub subject_id: String,
    pub upper: String,
    pub upper_color: String,
    pub lower: String,
    pub lower_color: String,
}

impl Default for Placeholders {
    fn default() -> Self {
        Self::uniform("NULL")
    }
}

impl Placeholders {
    /// The same placeholder for every field.
    pub fn uniform(value: &str) -> Self {
        Self {
            subject_id: value.to_string(),
            upper: value.to_string(),
            upper_color: value.to_string(),
            lower: value.to_string(),
            lower_color: value.to_string(),
        }
    }

    /// Placeholders used when splitting flat directories.
    pub fn split() -> Self {
        Self {
            subject_id: "N/A".to_string(),
            upper: "N/A_UC".to_string(),
            upper_color: "N/A_UCC".to_string(),
            lower: "N/A_LC".to_string(),
            lower_color: "N/A_LCC".to_string(),
        }
    }

    /// Placeholders used when classifying files in place.
    pub fn classify() -> Self {
        Self {
            subject_id: "UNKNOWN_ID".to_string(),
            upper: "no_upperclothes".to_string(),
            upper_color: "no_upperclothes_color".to_string(),
            lower: "no_lowerclothes".to_string(),
            lower_color: "no_lowerclothes_color".to_string(),
        }
    }
}

/// Configuration for a single job run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// Root of the image tree (or flat image directory).
    pub source_root: PathBuf,
    /// Root of the annotation tree (or flat label directory).
    pub label_root: PathBuf,
    /// Root under which partitions are written.
    pub output_root: PathBuf,
    /// Number of partitions.
    pub partitions: usize,
    /// Seed for the group shuffle, entropy when unset.
    pub seed: Option<u64>,
    /// Image file extensions, matched case-insensitively without the dot.
    pub image_extensions: Vec<String>,
    /// Capture mode marking a record for deletion.
    pub invalid_mode: String,
    /// Mode assumed when the annotation has no `CAMERA/mode`.
    pub default_mode: String,
    pub subsample: Subsample,
    pub placeholders: Placeholders,
    /// Top-level group folders ignored during traversal.
    pub skip_groups: Vec<String>,
    /// Depth of image folders below `source_root`.
    pub leaf_depth: usize,
    pub partition_prefix: String,
    pub transfer: TransferMode,
    pub layout: Layout,
    pub label_subdir: String,
    pub image_subdir: String,
    /// Suffix of the folder receiving subsampled pairs.
    pub odd_suffix: String,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            source_root: PathBuf::new(),
            label_root: PathBuf::new(),
            output_root: PathBuf::new(),
            partitions: 5,
            seed: None,
            image_extensions: vec!["png".to_string()],
            invalid_mode: "1000".to_string(),
            default_mode: "0".to_string(),
            subsample: Subsample::Even,
            placeholders: Placeholders::default(),
            skip_groups: Vec::new(),
            leaf_depth: 4,
            partition_prefix: "partition_".to_string(),
            transfer: TransferMode::Copy,
            layout: Layout::Grouped,
            label_subdir: "labels".to_string(),
            image_subdir: "images".to_string(),
            odd_suffix: "_odd_files".to_string(),
        }
    }
}

impl JobConfig {
    /// Defaults tuned for the given job.
    pub fn for_job(kind: JobKind) -> Self {
        let base = Self::default();
        match kind {
            JobKind::Partition => base,
            JobKind::Split => Self {
                subsample: Subsample::All,
                placeholders: Placeholders::split(),
                partition_prefix: "part_".to_string(),
                layout: Layout::Flat,
                ..base
            },
            JobKind::Subsample => Self {
                subsample: Subsample::Odd,
                image_extensions: ["png", "jpg", "jpeg", "bmp", "gif"]
                    .iter()
                    .map(|e| e.to_string())
                    .collect(),
                ..base
            },
            JobKind::Classify => Self {
                subsample: Subsample::All,
                placeholders: Placeholders::classify(),
                transfer: TransferMode::Move,
                ..base
            },
        }
    }

    /// Load configuration for `kind`, layering a config file and the
    /// environment over the job defaults.
    ///
    /// When `path` is `None` the platform config directory is consulted and
    /// silently skipped if it holds no config file.
    pub fn load(kind: JobKind, path: Option<&Path>) -> Result<Self, Error> {
        let defaults = config::Config::try_from(&Self::for_job(kind))?;
        let mut builder = config::Config::builder().add_source(defaults);

        match path {
            Some(path) => {
                debug!("Loading configuration from {:?}", path);
                builder = builder.add_source(config::File::from(path).required(true));
            }
            None => {
                if let Some(path) = default_config_path()
                    && path.exists()
                {
                    debug!("Loading configuration from {:?}", path);
                    builder = builder.add_source(config::File::from(path).required(false));
                }
            }
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("image_extensions")
                    .with_list_parse_key("skip_groups"),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Validate parameters that would make the job meaningless.
    pub fn validate(&self) -> Result<(), Error> {
        if self.partitions == 0 {
            return Err(Error::InvalidParameters(
                "partition count must be at least 1".to_string(),
            ));
        }
        if self.image_extensions.is_empty() {
            return Err(Error::InvalidParameters(
                "at least one image extension is required".to_string(),
            ));
        }
        if self.leaf_depth == 0 {
            return Err(Error::InvalidParameters(
                "leaf depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns true if `path` has one of the configured image extensions.
    pub fn is_image(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                self.image_extensions
                    .iter()
                    .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(ext))
            })
    }

    /// Directory name of the 1-based partition `number`.
    pub fn partition_name(&self, number: usize) -> String {
        format!("{}{}", self.partition_prefix, number)
    }
}

/// Location of the per-user config file, if the platform has one.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("ai", "EdgeFirst", "ReID Dataset")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}
