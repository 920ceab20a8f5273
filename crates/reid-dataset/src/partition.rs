// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Grouping of records and round-robin assignment of whole groups to
//! partitions.
//!
//! Group keys are sorted, shuffled, and dealt to partitions in turn, so
//! partitions differ by at most one group. Record counts are not balanced:
//! a partition that receives large groups holds more records.

use crate::{Error, GroupKey, Record};
use log::{debug, info};
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use std::collections::BTreeMap;

/// Records keyed by group, in key order.
pub type Groups = BTreeMap<GroupKey, Vec<Record>>;

/// One output bucket of whole groups.
#[derive(Debug, Clone, Default)]
pub struct Partition {
    /// 1-based partition number.
    pub number: usize,
    pub groups: Groups,
}

impl Partition {
    /// Number of records across all groups.
    pub fn record_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }
}

/// Group `records` by their annotation's key.
pub fn group_records(records: Vec<Record>) -> Groups {
    let mut groups = Groups::new();
    for record in records {
        groups.entry(record.meta.group_key()).or_default().push(record);
    }
    debug!("Grouped into {} distinct keys", groups.len());
    groups
}

/// Assigns whole groups to a fixed number of partitions.
#[derive(Debug, Clone)]
pub struct Partitioner {
    count: usize,
    seed: Option<u64>,
}

impl Partitioner {
    /// Create a partitioner for `count` partitions.
    ///
    /// With `seed` set the assignment is reproducible; otherwise the shuffle
    /// is seeded from system entropy.
    pub fn new(count: usize, seed: Option<u64>) -> Result<Self, Error> {
        if count == 0 {
            return Err(Error::InvalidParameters(
                "partition count must be at least 1".to_string(),
            ));
        }
        Ok(Self { count, seed })
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Shuffled order of `keys`. The input is sorted first so a given seed
    /// yields the same order whatever order the keys arrive in.
    pub fn shuffled<K: Ord>(&self, mut keys: Vec<K>) -> Vec<K> {
        keys.sort();
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        keys.shuffle(&mut rng);
        keys
    }

    /// Deal `keys` round-robin: the key at shuffled position `i` goes to
    /// partition `i % count`.
    pub fn assign_keys<K: Ord>(&self, keys: Vec<K>) -> Vec<Vec<K>> {
        let mut buckets: Vec<Vec<K>> = (0..self.count).map(|_| Vec::new()).collect();
        for (i, key) in self.shuffled(keys).into_iter().enumerate() {
            buckets[i % self.count].push(key);
        }
        buckets
    }

    /// Split `groups` into partitions numbered from 1. Every group lands in
    /// exactly one partition.
    pub fn assign(&self, mut groups: Groups) -> Vec<Partition> {
        let keys: Vec<GroupKey> = groups.keys().cloned().collect();
        let total = keys.len();

        let partitions: Vec<Partition> = self
            .assign_keys(keys)
            .into_iter()
            .enumerate()
            .map(|(i, bucket)| Partition {
                number: i + 1,
                groups: bucket
                    .into_iter()
                    .filter_map(|key| groups.remove_entry(&key))
                    .collect(),
            })
            .collect();

        info!("Distributed {} groups into {} partitions", total, self.count);
        partitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Annotation;
    use std::{collections::HashSet, path::PathBuf};

    fn record(subject: &str, upper: &str, frame: usize) -> Record {
        Record {
            image: PathBuf::from(format!("{subject}_{frame}.png")),
            annotation: PathBuf::from(format!("{subject}_{frame}.xml")),
            index: frame,
            meta: Annotation {
                mode: "1".to_string(),
                subject_id: subject.to_string(),
                upper: upper.to_string(),
                upper_color: "red".to_string(),
                lower: "pants".to_string(),
                lower_color: "black".to_string(),
                image_name: None,
            },
        }
    }

    fn groups(count: usize, per_group: usize) -> Groups {
        let records = (0..count)
            .flat_map(|g| (0..per_group).map(move |f| record(&format!("H{g:03}"), "shirt", f)))
            .collect();
        group_records(records)
    }

    #[test]
    fn test_zero_partitions_rejected() {
        assert!(matches!(
            Partitioner::new(0, None),
            Err(Error::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_group_records() {
        let records = vec![
            record("H1", "shirt", 0),
            record("H1", "shirt", 1),
            record("H1", "coat", 2),
            record("H2", "shirt", 0),
        ];
        let groups = group_records(records);
        assert_eq!(groups.len(), 3);
        let key = GroupKey::new("H1", "shirt", "red", "pants", "black");
        assert_eq!(groups[&key].len(), 2);
    }

    #[test]
    fn test_atomic_disjoint_balanced() {
        let partitioner = Partitioner::new(5, Some(11)).unwrap();
        let partitions = partitioner.assign(groups(23, 3));
        assert_eq!(partitions.len(), 5);

        let mut seen = HashSet::new();
        for partition in &partitions {
            for (key, records) in &partition.groups {
                assert!(seen.insert(key.clone()), "group in two partitions");
                assert_eq!(records.len(), 3, "group split across partitions");
            }
        }
        assert_eq!(seen.len(), 23);

        let sizes: Vec<usize> = partitions.iter().map(|p| p.groups.len()).collect();
        let max = *sizes.iter().max().unwrap();
        let min = *sizes.iter().min().unwrap();
        assert!(max - min <= 1, "unbalanced: {:?}", sizes);
        assert_eq!(sizes.iter().sum::<usize>(), 23);
    }

    #[test]
    fn test_seed_reproducible() {
        let a = Partitioner::new(4, Some(99)).unwrap().assign_keys((0..50).collect());
        let b = Partitioner::new(4, Some(99)).unwrap().assign_keys((0..50).rev().collect());
        assert_eq!(a, b);
    }

    #[test]
    fn test_two_groups_two_partitions() {
        let partitions = Partitioner::new(2, None).unwrap().assign(groups(2, 2));
        for partition in &partitions {
            assert_eq!(partition.groups.len(), 1);
            assert_eq!(partition.record_count(), 2);
        }
        assert_eq!(partitions[0].number, 1);
        assert_eq!(partitions[1].number, 2);
    }

    #[test]
    fn test_more_partitions_than_groups() {
        let partitions = Partitioner::new(4, Some(1)).unwrap().assign(groups(2, 1));
        assert_eq!(partitions.len(), 4);
        let non_empty = partitions.iter().filter(|p| !p.groups.is_empty()).count();
        assert_eq!(non_empty, 2);
    }
}
