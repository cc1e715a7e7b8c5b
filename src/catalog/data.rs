//! Shared data structures for the catalog
//!
//! These structs represent the data model that flows between
//! the directory scanner and the presentation layer.

use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::collections::BTreeMap;

/// Longer side of the preview box, in pixels
pub const DISPLAY_BOX: u32 = 300;

/// Represents a single decoded image in the mirror
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    /// Directory path relative to the mirror root ("" for the root itself)
    pub group: String,
    /// Filename only (e.g., "sunset.jpg"), unique within the group
    pub name: String,
    /// Intrinsic pixel width from the file header
    pub width: u32,
    /// Intrinsic pixel height from the file header
    pub height: u32,
}

impl ImageRecord {
    pub fn new(group: impl Into<String>, name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            width,
            height,
        }
    }

    /// Integer divisor applied to both intrinsic dimensions.
    ///
    /// `max(width, height) / 300`, clamped to 1 so images whose longer side
    /// is at most 300 pixels are shown at their original size.
    pub fn display_scale(&self) -> u32 {
        (self.width.max(self.height) / DISPLAY_BOX).max(1)
    }

    pub fn display_width(&self) -> u32 {
        self.width / self.display_scale()
    }

    pub fn display_height(&self) -> u32 {
        self.height / self.display_scale()
    }

    /// Path of the file relative to the mirror root, `/`-separated
    pub fn path(&self) -> String {
        if self.group.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.group, self.name)
        }
    }
}

impl Serialize for ImageRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ImageRecord", 7)?;
        state.serialize_field("group", &self.group)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("path", &self.path())?;
        state.serialize_field("width", &self.width)?;
        state.serialize_field("height", &self.height)?;
        state.serialize_field("display_width", &self.display_width())?;
        state.serialize_field("display_height", &self.display_height())?;
        state.end()
    }
}

/// One scan's worth of images, keyed by group.
///
/// Groups only exist once they have a member, and iterate in key order.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct Catalog {
    groups: BTreeMap<String, Vec<ImageRecord>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record to its group, creating the group on first member
    pub(crate) fn push(&mut self, record: ImageRecord) {
        self.groups
            .entry(record.group.clone())
            .or_default()
            .push(record);
    }

    /// Group keys in order
    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Records of one group, in scan order
    pub fn group(&self, key: &str) -> Option<&[ImageRecord]> {
        self.groups.get(key).map(Vec::as_slice)
    }

    /// (group, records) pairs in group order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ImageRecord])> {
        self.groups
            .iter()
            .map(|(key, records)| (key.as_str(), records.as_slice()))
    }

    /// Every record across all groups
    pub fn records(&self) -> impl Iterator<Item = &ImageRecord> {
        self.groups.values().flatten()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Total number of records
    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_hd_scales_to_box() {
        let record = ImageRecord::new("beach", "sunset.jpg", 1920, 1080);
        assert_eq!(record.display_scale(), 6);
        assert_eq!(record.display_width(), 320);
        assert_eq!(record.display_height(), 180);
    }

    #[test]
    fn test_portrait_uses_longer_side() {
        let record = ImageRecord::new("", "tall.png", 1080, 2400);
        assert_eq!(record.display_scale(), 8);
        assert_eq!(record.display_width(), 135);
        assert_eq!(record.display_height(), 300);
    }

    #[test]
    fn test_small_image_is_not_scaled() {
        let record = ImageRecord::new("icons", "tiny.png", 100, 100);
        assert_eq!(record.display_scale(), 1);
        assert_eq!(record.display_width(), 100);
        assert_eq!(record.display_height(), 100);

        // Exactly the box edge divides by one as well
        let edge = ImageRecord::new("icons", "edge.png", 300, 120);
        assert_eq!(edge.display_scale(), 1);
        assert_eq!(edge.display_width(), 300);
    }

    #[test]
    fn test_floor_division() {
        // 899 / 300 = 2, 899 / 2 = 449, 500 / 2 = 250
        let record = ImageRecord::new("g", "odd.png", 899, 500);
        assert_eq!(record.display_scale(), 2);
        assert_eq!(record.display_width(), 449);
        assert_eq!(record.display_height(), 250);
    }

    #[test]
    fn test_path_joins_group_and_name() {
        assert_eq!(ImageRecord::new("beach", "sunset.jpg", 1, 1).path(), "beach/sunset.jpg");
        assert_eq!(ImageRecord::new("a/b", "c.png", 1, 1).path(), "a/b/c.png");
        assert_eq!(ImageRecord::new("", "root.png", 1, 1).path(), "root.png");
    }

    #[test]
    fn test_groups_created_lazily_and_sorted() {
        let mut catalog = Catalog::new();
        assert!(catalog.is_empty());

        catalog.push(ImageRecord::new("waves", "b.png", 10, 10));
        catalog.push(ImageRecord::new("beach", "a.png", 10, 10));
        catalog.push(ImageRecord::new("waves", "a.png", 10, 10));

        assert_eq!(catalog.groups().collect::<Vec<_>>(), vec!["beach", "waves"]);
        assert_eq!(catalog.group_count(), 2);
        assert_eq!(catalog.len(), 3);

        let waves: Vec<_> = catalog.group("waves").unwrap().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(waves, vec!["b.png", "a.png"]);
        assert!(catalog.group("missing").is_none());
    }

    #[test]
    fn test_json_includes_display_geometry() {
        let mut catalog = Catalog::new();
        catalog.push(ImageRecord::new("beach", "sunset.jpg", 1920, 1080));

        let json = serde_json::to_value(&catalog).unwrap();
        let record = &json["beach"][0];
        assert_eq!(record["path"], "beach/sunset.jpg");
        assert_eq!(record["display_width"], 320);
        assert_eq!(record["display_height"], 180);
    }
}
