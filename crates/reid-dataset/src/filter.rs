// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Record filtering: invalid capture mode removal and positional
//! subsampling.

use crate::{Annotation, Candidate, JobConfig, Record, RecordError, Summary};
use log::{debug, info};
use std::path::Path;

/// What happened to a candidate in the filter stage.
#[derive(Debug)]
pub enum Verdict {
    /// Retained for grouping.
    Keep(Record),
    /// Capture mode matched the invalid sentinel; source files were deleted.
    Removed,
    /// Dropped by the subsampling filter.
    Subsampled,
    /// The annotation could not be extracted.
    Rejected(RecordError),
}

/// Apply the mode filter then the subsampling filter to one candidate.
///
/// Deleting the files of an invalid-mode record is irreversible. Failures to
/// delete are reported through `summary` and do not change the verdict.
pub fn filter_candidate(
    candidate: Candidate,
    config: &JobConfig,
    summary: &mut Summary,
) -> Verdict {
    let meta = match Annotation::read(
        &candidate.annotation,
        &config.placeholders,
        &config.default_mode,
    ) {
        Ok(meta) => meta,
        Err(error) => {
            return Verdict::Rejected(RecordError::Extraction {
                path: candidate.annotation,
                error,
            });
        }
    };

    if meta.is_invalid_mode(&config.invalid_mode) {
        let image_ok = delete_file(&candidate.image, summary);
        let annotation_ok = delete_file(&candidate.annotation, summary);
        if image_ok && annotation_ok {
            debug!("Removed invalid mode record {}", candidate.image.display());
        }
        return Verdict::Removed;
    }

    if !config.subsample.keeps(candidate.index) {
        return Verdict::Subsampled;
    }

    Verdict::Keep(Record {
        image: candidate.image,
        annotation: candidate.annotation,
        index: candidate.index,
        meta,
    })
}

/// Filter every candidate, updating `summary`, and return the kept records.
pub fn filter_candidates(
    candidates: Vec<Candidate>,
    config: &JobConfig,
    summary: &mut Summary,
) -> Vec<Record> {
    let mut kept = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        match filter_candidate(candidate, config, summary) {
            Verdict::Keep(record) => kept.push(record),
            Verdict::Removed => summary.removed_invalid_mode += 1,
            Verdict::Subsampled => summary.subsampled_out += 1,
            Verdict::Rejected(err) => summary.record_error(err),
        }
    }
    summary.kept += kept.len();

    info!(
        "Removed {} invalid mode records, subsampled out {}, kept {}",
        summary.removed_invalid_mode,
        summary.subsampled_out,
        kept.len()
    );
    kept
}

fn delete_file(path: &Path, summary: &mut Summary) -> bool {
    match std::fs::remove_file(path) {
        Ok(()) => true,
        Err(error) => {
            summary.record_error(RecordError::Delete {
                path: path.to_path_buf(),
                error,
            });
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{JobKind, Subsample};
    use std::fs;
    use tempfile::TempDir;

    fn write_pair(dir: &Path, stem: &str, mode: &str) -> Candidate {
        let image = dir.join(format!("{stem}.png"));
        let annotation = dir.join(format!("{stem}.xml"));
        fs::write(&image, b"png").unwrap();
        fs::write(
            &annotation,
            format!(
                r#"<ANNOTATION><CAMERA><mode>{mode}</mode></CAMERA><OBJECT ID="H1"/></ANNOTATION>"#
            ),
        )
        .unwrap();
        Candidate {
            image,
            annotation,
            index: 0,
        }
    }

    #[test]
    fn test_invalid_mode_deletes_files() {
        let dir = TempDir::new().unwrap();
        let candidate = write_pair(dir.path(), "f0", "1000");
        let (image, annotation) = (candidate.image.clone(), candidate.annotation.clone());

        let config = JobConfig::for_job(JobKind::Partition);
        let mut summary = Summary::default();
        let kept = filter_candidates(vec![candidate], &config, &mut summary);

        assert!(kept.is_empty());
        assert_eq!(summary.removed_invalid_mode, 1);
        assert!(!image.exists());
        assert!(!annotation.exists());
    }

    #[test]
    fn test_invalid_mode_already_deleted_is_tolerated() {
        let dir = TempDir::new().unwrap();
        let candidate = write_pair(dir.path(), "f0", "1000");
        fs::remove_file(&candidate.image).unwrap();

        let config = JobConfig::for_job(JobKind::Partition);
        let mut summary = Summary::default();
        let verdict = filter_candidate(candidate, &config, &mut summary);

        assert!(matches!(verdict, Verdict::Removed));
        assert_eq!(summary.delete_failures, 1);
    }

    #[test]
    fn test_subsample_keeps_even_indices() {
        let dir = TempDir::new().unwrap();
        let candidates: Vec<Candidate> = (0..5)
            .map(|i| Candidate {
                index: i,
                ..write_pair(dir.path(), &format!("f{i}"), "1")
            })
            .collect();

        let config = JobConfig {
            subsample: Subsample::Even,
            ..JobConfig::for_job(JobKind::Partition)
        };
        let mut summary = Summary::default();
        let kept = filter_candidates(candidates, &config, &mut summary);

        let indices: Vec<usize> = kept.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![0, 2, 4]);
        assert_eq!(summary.subsampled_out, 2);
        assert_eq!(summary.kept, 3);
    }

    #[test]
    fn test_mode_filter_precedes_subsample() {
        let dir = TempDir::new().unwrap();
        let candidate = Candidate {
            index: 1,
            ..write_pair(dir.path(), "f1", "1000")
        };
        let config = JobConfig::for_job(JobKind::Partition);
        let mut summary = Summary::default();
        let verdict = filter_candidate(candidate, &config, &mut summary);
        assert!(matches!(verdict, Verdict::Removed));
        assert!(!dir.path().join("f1.png").exists());
    }

    #[test]
    fn test_malformed_annotation_rejected() {
        let dir = TempDir::new().unwrap();
        let image = dir.path().join("bad.png");
        let annotation = dir.path().join("bad.xml");
        fs::write(&image, b"png").unwrap();
        fs::write(&annotation, b"<ANNOTATION><OBJECT>").unwrap();

        let candidates = vec![
            Candidate {
                image: image.clone(),
                annotation,
                index: 0,
            },
            Candidate {
                index: 2,
                ..write_pair(dir.path(), "good", "1")
            },
        ];
        let config = JobConfig::for_job(JobKind::Partition);
        let mut summary = Summary::default();
        let kept = filter_candidates(candidates, &config, &mut summary);

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].image, dir.path().join("good.png"));
        assert_eq!(summary.extraction_errors, 1);
        // Rejected records are left untouched.
        assert!(image.exists());
    }
}
