// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Annotation metadata extraction.
//!
//! Annotations are small XML documents of the form:
//!
//! ```xml
//! <ANNOTATION>
//!   <FILE><name>frame_0001.png</name></FILE>
//!   <CAMERA><mode>3</mode></CAMERA>
//!   <OBJECT ID="H00012">
//!     <upperclothes>T-shirt</upperclothes>
//!     <upperclothes_color>white</upperclothes_color>
//!     <lowerclothes>jeans</lowerclothes>
//!     <lowerclothes_color>blue</lowerclothes_color>
//!   </OBJECT>
//! </ANNOTATION>
//! ```
//!
//! Only the fields needed for grouping are read; everything else is ignored.

use crate::{Error, GroupKey, Placeholders};
use roxmltree::{Document, Node};
use std::path::Path;

/// Metadata extracted from one annotation file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    /// Capture mode code from `CAMERA/mode`.
    pub mode: String,
    /// `ID` attribute of the `OBJECT` element.
    pub subject_id: String,
    pub upper: String,
    pub upper_color: String,
    pub lower: String,
    pub lower_color: String,
    /// Image file named by `FILE/name`, when present.
    pub image_name: Option<String>,
}

impl Annotation {
    /// Read and extract an annotation file.
    pub fn read<P: AsRef<Path>>(
        path: P,
        placeholders: &Placeholders,
        default_mode: &str,
    ) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&text, placeholders, default_mode)
    }

    /// Extract an annotation from XML text.
    ///
    /// Absent or empty garment fields and a missing `ID` attribute fall back
    /// to `placeholders`. A document without an `OBJECT` element is rejected.
    pub fn parse(text: &str, placeholders: &Placeholders, default_mode: &str) -> Result<Self, Error> {
        let doc = Document::parse(text)?;
        let root = doc.root_element();

        let mode = child_text(root, &["CAMERA", "mode"]).unwrap_or_else(|| default_mode.to_string());
        let image_name = child_text(root, &["FILE", "name"]);

        let object = root
            .descendants()
            .find(|n| n.has_tag_name("OBJECT"))
            .ok_or_else(|| Error::InvalidAnnotation("missing OBJECT element".to_string()))?;

        let subject_id = object
            .attribute("ID")
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(String::from)
            .unwrap_or_else(|| placeholders.subject_id.clone());

        let field = |name: &str, fallback: &String| {
            child_text(object, &[name]).unwrap_or_else(|| fallback.clone())
        };

        Ok(Self {
            mode,
            subject_id,
            upper: field("upperclothes", &placeholders.upper),
            upper_color: field("upperclothes_color", &placeholders.upper_color),
            lower: field("lowerclothes", &placeholders.lower),
            lower_color: field("lowerclothes_color", &placeholders.lower_color),
            image_name,
        })
    }

    /// The grouping key of this annotation.
    pub fn group_key(&self) -> GroupKey {
        GroupKey::new(
            &self.subject_id,
            &self.upper,
            &self.upper_color,
            &self.lower,
            &self.lower_color,
        )
    }

    /// Returns true if the capture mode equals `invalid_mode`.
    pub fn is_invalid_mode(&self, invalid_mode: &str) -> bool {
        self.mode == invalid_mode
    }
}

/// Trimmed, non-empty text of the element reached by following `path` from
/// `node` through direct children.
fn child_text(node: Node<'_, '_>, path: &[&str]) -> Option<String> {
    let mut current = node;
    for name in path {
        current = current
            .children()
            .find(|c| c.is_element() && c.has_tag_name(*name))?;
    }
    current
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
}
