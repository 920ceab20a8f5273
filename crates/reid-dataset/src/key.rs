// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a group: one subject wearing one outfit.
///
/// Keys compare and hash field by field. The underscore-joined form returned
/// by [`fmt::Display`] is only used for naming output directories, see
/// [`GroupKey::dir_name`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    pub subject_id: String,
    pub upper: String,
    pub upper_color: String,
    pub lower: String,
    pub lower_color: String,
}

impl GroupKey {
    pub fn new(
        subject_id: &str,
        upper: &str,
        upper_color: &str,
        lower: &str,
        lower_color: &str,
    ) -> Self {
        Self {
            subject_id: subject_id.to_string(),
            upper: upper.to_string(),
            upper_color: upper_color.to_string(),
            lower: lower.to_string(),
            lower_color: lower_color.to_string(),
        }
    }

    fn fields(&self) -> [&str; 5] {
        [
            &self.subject_id,
            &self.upper,
            &self.upper_color,
            &self.lower,
            &self.lower_color,
        ]
    }

    /// Directory name for this key.
    ///
    /// Each field is sanitized before joining: whitespace becomes `_` and
    /// characters that cannot appear in a path component become `-`.
    /// Distinct keys may still share a name when a field contains `_`.
    pub fn dir_name(&self) -> String {
        self.fields()
            .iter()
            .map(|f| sanitize_component(f))
            .collect::<Vec<_>>()
            .join("_")
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fields().join("_"))
    }
}

/// Make `value` safe for use inside a single path component.
pub fn sanitize_component(value: &str) -> String {
    value
        .trim()
        .chars()
        .map(|c| match c {
            c if c.is_whitespace() => '_',
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c if c.is_control() => '-',
            c => c,
        })
        .collect()
}
