// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Writing partitions to disk.
//!
//! With [`Layout::Grouped`] each partition receives one directory per group
//! key holding both images and annotations:
//!
//! ```text
//! output_root/
//! ├── partition_1/
//! │   ├── H00012_T-shirt_white_jeans_blue/
//! │   │   ├── H00012_C01_0001.png
//! │   │   └── H00012_C01_0001.xml
//! │   └── ...
//! └── partition_2/
//! ```
//!
//! With [`Layout::Flat`] images and annotations go to two sibling folders
//! of the partition instead.

use crate::{
    GroupKey, JobConfig, Layout, Partition, PartitionStats, Progress, Record, RecordError,
    Summary, TransferMode,
};
use log::{debug, info, warn};
use std::{
    collections::HashMap,
    fs,
    io,
    path::{Path, PathBuf},
};

/// Copies or moves grouped records into an output tree.
pub struct Materializer<'a> {
    config: &'a JobConfig,
}

impl<'a> Materializer<'a> {
    pub fn new(config: &'a JobConfig) -> Self {
        Self { config }
    }

    /// Write every partition below `config.output_root`, each into a folder
    /// named by [`JobConfig::partition_name`].
    ///
    /// Partitions without groups are not created.
    pub fn write_all(
        &self,
        partitions: &[Partition],
        summary: &mut Summary,
        progress: Option<&dyn Fn(Progress)>,
    ) {
        let total: usize = partitions.iter().map(|p| p.record_count() * 2).sum();
        let mut current = 0;

        for partition in partitions {
            let name = self.config.partition_name(partition.number);
            summary.partitions.push(PartitionStats {
                name: name.clone(),
                groups: partition.groups.len(),
                records: partition.record_count(),
            });
            if partition.groups.is_empty() {
                warn!("{} received no groups", name);
                continue;
            }

            let root = self.config.output_root.join(&name);
            info!(
                "Writing {} groups ({} records) to {}",
                partition.groups.len(),
                partition.record_count(),
                root.display()
            );
            self.write_partition(&root, partition, summary, &mut |done| {
                current += done;
                if let Some(progress) = progress {
                    progress(Progress { current, total });
                }
            });
            summary.partitions_written += 1;
        }
    }

    /// Write the groups of `partition` directly below `root`.
    ///
    /// Directory creation is idempotent and existing files are overwritten.
    /// A group whose folder cannot be created is counted and skipped.
    /// `on_file` is called with the number of files handled per record.
    pub fn write_partition(
        &self,
        root: &Path,
        partition: &Partition,
        summary: &mut Summary,
        on_file: &mut dyn FnMut(usize),
    ) {
        let mut dir_names: HashMap<String, &GroupKey> = HashMap::new();

        for (key, records) in &partition.groups {
            let (image_dir, label_dir) = match self.config.layout {
                Layout::Grouped => {
                    let name = key.dir_name();
                    if let Some(previous) = dir_names.get(&name)
                        && *previous != key
                    {
                        warn!(
                            "Groups '{}' and '{}' share the folder {}",
                            previous, key, name
                        );
                        summary.name_collisions += 1;
                    }
                    dir_names.insert(name.clone(), key);
                    let dir = root.join(name);
                    (dir.clone(), dir)
                }
                Layout::Flat => (
                    root.join(&self.config.image_subdir),
                    root.join(&self.config.label_subdir),
                ),
            };

            if let Err((path, error)) = create_dirs(&image_dir, &label_dir) {
                summary.record_error(RecordError::Directory {
                    path,
                    records: records.len(),
                    error,
                });
                on_file(records.len() * 2);
                continue;
            }
            debug!("{}: {} records", key, records.len());

            for record in records {
                self.transfer_record(record, &image_dir, &label_dir, summary);
                on_file(2);
            }
        }
    }

    fn transfer_record(
        &self,
        record: &Record,
        image_dir: &Path,
        label_dir: &Path,
        summary: &mut Summary,
    ) {
        for (from, dir) in [(&record.image, image_dir), (&record.annotation, label_dir)] {
            let Some(file_name) = from.file_name() else {
                continue;
            };
            let to = dir.join(file_name);
            match transfer_file(from, &to, self.config.transfer) {
                Ok(()) => summary.files_transferred += 1,
                Err(error) => summary.record_error(RecordError::Transfer {
                    from: from.clone(),
                    to,
                    error,
                }),
            }
        }
    }
}

fn create_dirs(image_dir: &Path, label_dir: &Path) -> Result<(), (PathBuf, io::Error)> {
    for dir in [image_dir, label_dir] {
        fs::create_dir_all(dir).map_err(|error| (dir.to_path_buf(), error))?;
    }
    Ok(())
}

/// Copy or move `from` to `to`, replacing `to` if it exists.
///
/// A move falls back to copy and delete when renaming fails, which happens
/// across file systems.
pub fn transfer_file(from: &Path, to: &Path, mode: TransferMode) -> io::Result<()> {
    match mode {
        TransferMode::Copy => fs::copy(from, to).map(|_| ()),
        TransferMode::Move => match fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Err(err),
            Err(err) => {
                debug!("Rename {:?} failed ({}), copying instead", from, err);
                fs::copy(from, to)?;
                fs::remove_file(from)
            }
        },
    }
}

/// Files directly inside `dir`, used to report what an in-place move left
/// behind. A missing directory has no files.
pub fn remaining_files(dir: &Path) -> Vec<PathBuf> {
    fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_file())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Annotation, JobKind, group_records};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn make_record(src: &Path, stem: &str, subject: &str, upper: &str) -> Record {
        let image = src.join(format!("{stem}.png"));
        let annotation = src.join(format!("{stem}.xml"));
        fs::write(&image, stem.as_bytes()).unwrap();
        fs::write(&annotation, b"<ANNOTATION/>").unwrap();
        Record {
            image,
            annotation,
            index: 0,
            meta: Annotation {
                mode: "1".into(),
                subject_id: subject.into(),
                upper: upper.into(),
                upper_color: "NULL".into(),
                lower: "NULL".into(),
                lower_color: "NULL".into(),
                image_name: None,
            },
        }
    }

    #[test]
    fn test_write_grouped() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(&src).unwrap();

        let groups = group_records(vec![
            make_record(&src, "a", "H1", "shirt"),
            make_record(&src, "b", "H1", "shirt"),
        ]);
        let partition = Partition { number: 1, groups };
        let config = JobConfig {
            output_root: dir.path().join("out"),
            ..JobConfig::for_job(JobKind::Partition)
        };

        let mut summary = Summary::default();
        Materializer::new(&config)
            .write_all(std::slice::from_ref(&partition), &mut summary, None);

        let group_dir = dir.path().join("out/partition_1/H1_shirt_NULL_NULL_NULL");
        for name in ["a.png", "a.xml", "b.png", "b.xml"] {
            assert!(group_dir.join(name).is_file(), "{name} missing");
        }
        assert_eq!(summary.files_transferred, 4);
        assert_eq!(summary.partitions_written, 1);
        // Copies leave the sources in place.
        assert!(src.join("a.png").exists());

        // Running again reuses directories and overwrites files.
        let mut again = Summary::default();
        Materializer::new(&config)
            .write_all(std::slice::from_ref(&partition), &mut again, None);
        assert_eq!(again.files_transferred, 4);
        assert_eq!(again.transfer_failures, 0);
    }

    #[test]
    fn test_write_flat_with_move() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(&src).unwrap();

        let groups = group_records(vec![make_record(&src, "a", "H1", "shirt")]);
        let config = JobConfig {
            output_root: dir.path().join("out"),
            transfer: TransferMode::Move,
            ..JobConfig::for_job(JobKind::Split)
        };
        let mut summary = Summary::default();
        Materializer::new(&config)
            .write_all(&[Partition { number: 2, groups }], &mut summary, None);

        assert!(dir.path().join("out/part_2/images/a.png").is_file());
        assert!(dir.path().join("out/part_2/labels/a.xml").is_file());
        assert!(!src.join("a.png").exists());
        assert!(remaining_files(&src).is_empty());
    }

    #[test]
    fn test_missing_source_counted() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(&src).unwrap();

        let record = make_record(&src, "a", "H1", "shirt");
        fs::remove_file(&record.image).unwrap();
        let groups = group_records(vec![record]);

        let config = JobConfig {
            output_root: dir.path().join("out"),
            ..JobConfig::for_job(JobKind::Partition)
        };
        let mut summary = Summary::default();
        Materializer::new(&config)
            .write_all(&[Partition { number: 1, groups }], &mut summary, None);

        assert_eq!(summary.transfer_failures, 1);
        assert_eq!(summary.files_transferred, 1);
    }

    #[test]
    fn test_name_collision_detected() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(&src).unwrap();

        let mut groups = BTreeMap::new();
        let a = make_record(&src, "a", "H1", "long sleeve");
        let b = make_record(&src, "b", "H1", "long_sleeve");
        groups.insert(a.meta.group_key(), vec![a]);
        groups.insert(b.meta.group_key(), vec![b]);

        let config = JobConfig {
            output_root: dir.path().join("out"),
            ..JobConfig::for_job(JobKind::Partition)
        };
        let mut summary = Summary::default();
        Materializer::new(&config)
            .write_all(&[Partition { number: 1, groups }], &mut summary, None);

        assert_eq!(summary.name_collisions, 1);
        assert_eq!(summary.files_transferred, 4);
    }

    #[test]
    fn test_unwritable_group_skipped() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(&src).unwrap();

        let long = "x".repeat(300);
        let groups = group_records(vec![
            make_record(&src, "a", "H1", "shirt"),
            make_record(&src, "b", "H2", &long),
            make_record(&src, "c", "H2", &long),
        ]);
        let config = JobConfig {
            output_root: dir.path().join("out"),
            ..JobConfig::for_job(JobKind::Partition)
        };

        let last = std::cell::Cell::new((0, 0));
        let progress = |p: Progress| last.set((p.current, p.total));
        let mut summary = Summary::default();
        Materializer::new(&config).write_all(
            &[Partition { number: 1, groups }],
            &mut summary,
            Some(&progress),
        );

        assert_eq!(summary.directory_failures, 1);
        assert_eq!(summary.files_transferred, 2);
        assert_eq!(summary.partitions_written, 1);
        assert!(
            dir.path()
                .join("out/partition_1/H1_shirt_NULL_NULL_NULL/a.png")
                .is_file()
        );
        assert_eq!(last.get(), (6, 6));
    }

    #[test]
    fn test_file_in_place_of_group_folder() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(&src).unwrap();
        let root = dir.path().join("out");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("H1_shirt_NULL_NULL_NULL"), b"").unwrap();

        let groups = group_records(vec![
            make_record(&src, "a", "H1", "shirt"),
            make_record(&src, "b", "H2", "shirt"),
        ]);
        let config = JobConfig::for_job(JobKind::Classify);
        let mut summary = Summary::default();
        Materializer::new(&config).write_partition(
            &root,
            &Partition { number: 1, groups },
            &mut summary,
            &mut |_| {},
        );

        assert_eq!(summary.directory_failures, 1);
        assert!(root.join("H2_shirt_NULL_NULL_NULL/b.png").is_file());
        // Records of the failed group stay at their source.
        assert!(src.join("a.png").is_file());
    }

    #[test]
    fn test_progress_reported() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(&src).unwrap();

        let groups = group_records(vec![
            make_record(&src, "a", "H1", "shirt"),
            make_record(&src, "b", "H2", "shirt"),
        ]);
        let config = JobConfig {
            output_root: dir.path().join("out"),
            ..JobConfig::for_job(JobKind::Partition)
        };

        let last = std::cell::Cell::new((0, 0));
        let progress = |p: Progress| last.set((p.current, p.total));
        Materializer::new(&config)
            .write_all(
                &[Partition { number: 1, groups }],
                &mut Summary::default(),
                Some(&progress),
            );
        assert_eq!(last.get(), (4, 4));
    }
}
