//! Source mapping for Garden configuration documents.
//!
//! Configuration files are loaded elsewhere; this crate only keeps enough of
//! their text around to point back into it. A template string found at some
//! document path occupies a byte range of its file, and an expression inside
//! that string occupies a byte range of the string. [`SourceInfo`] models both
//! cases so a diagnostic can place a caret on the exact column.
//!
//! # Example
//!
//! ```rust
//! use garden_source_map::*;
//!
//! let mut ctx = SourceContext::new();
//! let file_id = ctx.add_file("garden.yml".into(), "kind: Deploy\nname: ${var.name}\n".into());
//!
//! // The scalar `${var.name}` starts at byte 19.
//! let scalar = SourceInfo::from_offsets(&ctx, file_id, 19, 30).unwrap();
//! // `var.name` starts two bytes into the scalar.
//! let expr = SourceInfo::substring(scalar, 2, 10);
//!
//! let mapped = expr.map_offset(0, &ctx).unwrap();
//! assert_eq!(mapped.location.row, 1);
//! assert_eq!(mapped.location.column, 8);
//! ```

pub mod context;
pub mod file_info;
pub mod source_info;
pub mod types;

pub use context::{SourceContext, SourceFile};
pub use file_info::FileInformation;
pub use source_info::{MappedLocation, SourceInfo, SourceMapping};
pub use types::{FileId, Location, Range};
