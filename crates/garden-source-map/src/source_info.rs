//! Source information with substring tracking

use crate::context::SourceContext;
use crate::types::{FileId, Location, Range};
use serde::{Deserialize, Serialize};

/// A range of text and where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    /// The range in the immediate/current text
    pub range: Range,
    /// How this range maps to its source
    pub mapping: SourceMapping,
}

/// Describes how a range relates to an original file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SourceMapping {
    /// Direct position in an original file
    Original { file_id: FileId },
    /// A slice of a parent range, starting `offset` bytes into it
    Substring {
        parent: Box<SourceInfo>,
        offset: usize,
    },
}

/// Result of mapping a position back to an original file
#[derive(Debug, Clone, PartialEq)]
pub struct MappedLocation {
    /// The original file
    pub file_id: FileId,
    /// Location in the original file
    pub location: Location,
}

impl Default for SourceInfo {
    fn default() -> Self {
        SourceInfo::original(FileId(0), Range::from_offsets(0, 0))
    }
}

impl SourceInfo {
    /// Create source info for a position in an original file
    pub fn original(file_id: FileId, range: Range) -> Self {
        SourceInfo {
            range,
            mapping: SourceMapping::Original { file_id },
        }
    }

    /// Create source info for a byte range of a registered file, filling in
    /// rows and columns from the file's line index.
    pub fn from_offsets(
        ctx: &SourceContext,
        file_id: FileId,
        start: usize,
        end: usize,
    ) -> Option<Self> {
        let info = &ctx.get_file(file_id)?.file_info;
        Some(SourceInfo::original(
            file_id,
            Range {
                start: info.offset_to_location(start)?,
                end: info.offset_to_location(end)?,
            },
        ))
    }

    /// Create source info for the `start..end` slice of `parent`
    pub fn substring(parent: SourceInfo, start: usize, end: usize) -> Self {
        SourceInfo {
            range: Range::from_offsets(0, end.saturating_sub(start)),
            mapping: SourceMapping::Substring {
                parent: Box::new(parent),
                offset: start,
            },
        }
    }

    /// The file this range ultimately points into
    pub fn file_id(&self) -> FileId {
        match &self.mapping {
            SourceMapping::Original { file_id } => *file_id,
            SourceMapping::Substring { parent, .. } => parent.file_id(),
        }
    }

    /// Start offset in the immediate text
    pub fn start_offset(&self) -> usize {
        self.range.start.offset
    }

    /// End offset in the immediate text
    pub fn end_offset(&self) -> usize {
        self.range.end.offset
    }

    /// Map an offset relative to this range back to the original file
    pub fn map_offset(&self, offset: usize, ctx: &SourceContext) -> Option<MappedLocation> {
        match &self.mapping {
            SourceMapping::Original { file_id } => {
                let file = ctx.get_file(*file_id)?;
                let location = file
                    .file_info
                    .offset_to_location(self.range.start.offset + offset)?;
                Some(MappedLocation {
                    file_id: *file_id,
                    location,
                })
            }
            SourceMapping::Substring {
                parent,
                offset: start,
            } => parent.map_offset(start + offset, ctx),
        }
    }

    /// Map this whole range back to the original file
    pub fn map_range(&self, ctx: &SourceContext) -> Option<(MappedLocation, MappedLocation)> {
        let start = self.map_offset(0, ctx)?;
        let end = self.map_offset(self.range.len(), ctx)?;
        Some((start, end))
    }
}
