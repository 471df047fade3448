//! Line index for offset lookups

use crate::types::Location;
use serde::{Deserialize, Serialize};

/// Line-break index of a file.
///
/// Stores the byte offset of every newline so that converting an offset to a
/// (row, column) pair is a binary search instead of a scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInformation {
    /// Byte offsets of each newline character in the file
    line_breaks: Vec<usize>,

    /// Total length of the file in bytes
    total_length: usize,
}

impl FileInformation {
    /// Build the index by scanning the content once.
    ///
    /// # Example
    ///
    /// ```
    /// use garden_source_map::FileInformation;
    ///
    /// let info = FileInformation::new("hello\nworld");
    /// let loc = info.offset_to_location(6).unwrap();
    /// assert_eq!(loc.row, 1);
    /// assert_eq!(loc.column, 0);
    /// ```
    pub fn new(content: &str) -> Self {
        let line_breaks: Vec<usize> = content
            .char_indices()
            .filter_map(|(idx, ch)| if ch == '\n' { Some(idx) } else { None })
            .collect();

        FileInformation {
            line_breaks,
            total_length: content.len(),
        }
    }

    /// Convert a byte offset to a Location with row and column.
    ///
    /// Returns None if the offset is out of bounds.
    pub fn offset_to_location(&self, offset: usize) -> Option<Location> {
        if offset > self.total_length {
            return None;
        }

        // A newline belongs to the row it terminates.
        let row = match self.line_breaks.binary_search(&offset) {
            Ok(idx) | Err(idx) => idx,
        };

        let line_start = if row == 0 {
            0
        } else {
            self.line_breaks[row - 1] + 1
        };

        Some(Location {
            offset,
            row,
            column: offset - line_start,
        })
    }

    /// Total length of the file in bytes
    pub fn total_length(&self) -> usize {
        self.total_length
    }

    /// Number of lines in the file
    pub fn line_count(&self) -> usize {
        self.line_breaks.len() + 1
    }
}
