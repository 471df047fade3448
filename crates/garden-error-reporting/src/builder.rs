//! Builder API for diagnostic messages.

use crate::diagnostic::DiagnosticMessage;
use garden_source_map::SourceInfo;

/// Builder for [`DiagnosticMessage`].
///
/// ```
/// use garden_error_reporting::DiagnosticMessageBuilder;
///
/// let msg = DiagnosticMessageBuilder::error("Invalid structural directive")
///     .with_code("T-5-1")
///     .problem("Missing $return field next to $forEach field.")
///     .add_info("Path: spec.ports")
///     .build();
///
/// assert_eq!(msg.code.as_deref(), Some("T-5-1"));
/// assert_eq!(msg.details.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct DiagnosticMessageBuilder {
    message: DiagnosticMessage,
}

impl DiagnosticMessageBuilder {
    /// Start an error diagnostic.
    pub fn error(title: impl Into<String>) -> Self {
        Self {
            message: DiagnosticMessage::error(title),
        }
    }

    /// Set the error code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.message.code = Some(code.into());
        self
    }

    /// Set the problem statement.
    pub fn problem(mut self, problem: impl Into<String>) -> Self {
        self.message.problem = Some(problem.into());
        self
    }

    /// Add an info detail.
    pub fn add_info(mut self, info: impl Into<String>) -> Self {
        self.message.details.push(info.into());
        self
    }

    /// Set the primary source location.
    pub fn with_location(mut self, location: SourceInfo) -> Self {
        self.message.location = Some(location);
        self
    }

    /// Finish building.
    pub fn build(self) -> DiagnosticMessage {
        self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use garden_source_map::{FileId, Range};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_details_keep_order() {
        let location = SourceInfo::original(FileId(0), Range::from_offsets(4, 8));
        let msg = DiagnosticMessageBuilder::error("Oops")
            .add_info("first")
            .add_info("second")
            .with_location(location.clone())
            .build();

        assert_eq!(msg.details, vec!["first".to_string(), "second".to_string()]);
        assert_eq!(msg.location, Some(location));
    }
}
