//! Source context for managing files

use crate::file_info::FileInformation;
use crate::types::FileId;
use serde::{Deserialize, Serialize};

/// Registry of in-memory source files.
///
/// Configuration documents are always loaded before templates are parsed,
/// so files are registered together with their content.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceContext {
    files: Vec<SourceFile>,
}

/// A source file with its content and line index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    /// File path or identifier, as shown in diagnostics
    pub path: String,
    /// File content
    pub content: String,
    /// Line index for location lookups
    pub file_info: FileInformation,
}

impl SourceContext {
    /// Create a new empty source context
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file to the context and return its ID
    pub fn add_file(&mut self, path: String, content: String) -> FileId {
        let id = FileId(self.files.len());
        let file_info = FileInformation::new(&content);
        self.files.push(SourceFile {
            path,
            content,
            file_info,
        });
        id
    }

    /// Get a file by ID
    pub fn get_file(&self, id: FileId) -> Option<&SourceFile> {
        self.files.get(id.0)
    }

    /// Number of registered files
    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_context() {
        let ctx = SourceContext::new();
        assert!(ctx.get_file(FileId(0)).is_none());
        assert_eq!(ctx.file_count(), 0);
    }

    #[test]
    fn test_multiple_files() {
        let mut ctx = SourceContext::new();
        let id1 = ctx.add_file("project.garden.yml".to_string(), "First".to_string());
        let id2 = ctx.add_file("api/garden.yml".to_string(), "Second".to_string());

        assert_eq!(id1, FileId(0));
        assert_eq!(id2, FileId(1));

        let file2 = ctx.get_file(id2).unwrap();
        assert_eq!(file2.path, "api/garden.yml");
        assert_eq!(file2.file_info.total_length(), 6);
    }

    #[test]
    fn test_serialization() {
        let mut ctx = SourceContext::new();
        ctx.add_file("garden.yml".to_string(), "kind: Run".to_string());

        let json = serde_json::to_string(&ctx).unwrap();
        let deserialized: SourceContext = serde_json::from_str(&json).unwrap();

        let file = deserialized.get_file(FileId(0)).unwrap();
        assert_eq!(file.path, "garden.yml");
        assert_eq!(file.content, "kind: Run");
    }
}
