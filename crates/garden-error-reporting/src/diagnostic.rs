//! Core diagnostic message type.

use garden_source_map::{SourceContext, SourceInfo};

/// An error diagnostic.
///
/// Structure:
/// 1. **Code**: optional error code (e.g., "T-1-1") for searchability
/// 2. **Title**: brief error message
/// 3. **Problem**: what went wrong
/// 4. **Details**: supporting information, one fact per bullet
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticMessage {
    /// Optional error code (e.g., "T-1-1")
    pub code: Option<String>,

    /// Brief title for the error
    pub title: String,

    /// The problem statement
    pub problem: Option<String>,

    /// Info bullets printed after the problem
    pub details: Vec<String>,

    /// Source location for this diagnostic
    pub location: Option<SourceInfo>,
}

impl DiagnosticMessage {
    /// Create an error diagnostic with just a title.
    pub fn error(title: impl Into<String>) -> Self {
        Self {
            code: None,
            title: title.into(),
            problem: None,
            details: Vec::new(),
            location: None,
        }
    }

    /// Set the error code.
    ///
    /// ```
    /// use garden_error_reporting::DiagnosticMessage;
    ///
    /// let msg = DiagnosticMessage::error("Template Syntax Error").with_code("T-1-1");
    /// assert_eq!(msg.docs_url(), Some("https://docs.garden.io/reference/template-strings#syntax"));
    /// ```
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Get the documentation URL for this error, if it has a known code.
    pub fn docs_url(&self) -> Option<&str> {
        self.code
            .as_ref()
            .and_then(|code| crate::catalog::get_docs_url(code))
    }

    /// Render this diagnostic as text.
    ///
    /// With a source context and a location that maps into it, the output
    /// starts with an ariadne snippet of the offending line. Otherwise the
    /// title, problem and a `at row:column` line are printed plainly.
    ///
    /// ```
    /// use garden_error_reporting::DiagnosticMessageBuilder;
    ///
    /// let msg = DiagnosticMessageBuilder::error("Invalid input")
    ///     .problem("Values must be numeric")
    ///     .add_info("Found text in column 3")
    ///     .build();
    /// let text = msg.to_text(None);
    /// assert!(text.contains("Error: Invalid input"));
    /// assert!(text.contains("ℹ Found text in column 3"));
    /// ```
    pub fn to_text(&self, ctx: Option<&SourceContext>) -> String {
        let mut lines: Vec<String> = Vec::new();

        let snippet = match (ctx, &self.location) {
            (Some(ctx), Some(location)) => self.render_ariadne_source_context(location, ctx),
            _ => None,
        };

        match snippet {
            Some(snippet) => lines.push(snippet.trim_end().to_string()),
            None => {
                match &self.code {
                    Some(code) => lines.push(format!("Error [{}]: {}", code, self.title)),
                    None => lines.push(format!("Error: {}", self.title)),
                }
                if let Some(problem) = &self.problem {
                    lines.push(problem.clone());
                }
                if let Some(location) = &self.location {
                    lines.push(format!(
                        "at {}:{}",
                        location.range.start.row + 1,
                        location.range.start.column + 1
                    ));
                }
            }
        }

        lines.extend(self.details.iter().map(|detail| format!("ℹ {detail}")));
        lines.join("\n")
    }

    fn render_ariadne_source_context(
        &self,
        location: &SourceInfo,
        ctx: &SourceContext,
    ) -> Option<String> {
        use ariadne::{CharSet, Config, Label, Report, ReportKind, Source};

        let file = ctx.get_file(location.file_id())?;
        let (start, end) = location.map_range(ctx)?;

        let mut report = Report::build(ReportKind::Error, file.path.clone(), start.location.offset)
            .with_config(
                Config::default()
                    .with_color(false)
                    .with_char_set(CharSet::Ascii),
            );

        report = match &self.code {
            Some(code) => report.with_message(format!("[{}] {}", code, self.title)),
            None => report.with_message(&self.title),
        };

        let label = self.problem.as_deref().unwrap_or(&self.title);
        report = report.with_label(
            Label::new((file.path.clone(), start.location.offset..end.location.offset))
                .with_message(label),
        );

        let mut output = Vec::new();
        report
            .finish()
            .write(
                (file.path.clone(), Source::from(file.content.as_str())),
                &mut output,
            )
            .ok()?;

        String::from_utf8(output).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::DiagnosticMessageBuilder;
    use garden_source_map::{FileId, Location, Range};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_diagnostic_message_error() {
        let msg = DiagnosticMessage::error("Test error");
        assert_eq!(msg.title, "Test error");
        assert!(msg.code.is_none());
        assert!(msg.problem.is_none());
        assert!(msg.details.is_empty());
    }

    #[test]
    fn test_docs_url_invalid_code() {
        let msg = DiagnosticMessage::error("Test error").with_code("T-999-999");
        assert!(msg.docs_url().is_none());
    }

    #[test]
    fn test_to_text_simple_error() {
        let msg = DiagnosticMessage::error("Something went wrong");
        assert_eq!(msg.to_text(None), "Error: Something went wrong");
    }

    #[test]
    fn test_to_text_with_code() {
        let msg = DiagnosticMessage::error("Something went wrong").with_code("T-1-1");
        assert_eq!(msg.to_text(None), "Error [T-1-1]: Something went wrong");
    }

    #[test]
    fn test_to_text_full_message() {
        let msg = DiagnosticMessageBuilder::error("Invalid template string")
            .with_code("T-2-1")
            .problem("Could not find key missing under var.")
            .add_info("Template: ${var.missing}")
            .add_info("Path: spec.image")
            .build();

        assert_eq!(
            msg.to_text(None),
            "Error [T-2-1]: Invalid template string\n\
             Could not find key missing under var.\n\
             ℹ Template: ${var.missing}\n\
             ℹ Path: spec.image"
        );
    }

    #[test]
    fn test_location_in_to_text_without_context() {
        let location = SourceInfo::original(
            FileId(0),
            Range {
                start: Location {
                    offset: 100,
                    row: 10,
                    column: 5,
                },
                end: Location {
                    offset: 110,
                    row: 10,
                    column: 15,
                },
            },
        );

        let msg = DiagnosticMessageBuilder::error("Invalid syntax")
            .with_location(location)
            .build();

        assert!(msg.to_text(None).contains("at 11:6"));
    }

    #[test]
    fn test_location_in_to_text_with_context() {
        let mut ctx = SourceContext::new();
        let file_id = ctx.add_file(
            "garden.yml".to_string(),
            "kind: Deploy\nname: ${var.missing}\n".to_string(),
        );
        let scalar = SourceInfo::from_offsets(&ctx, file_id, 19, 33).unwrap();
        let expr = SourceInfo::substring(scalar, 2, 13);

        let msg = DiagnosticMessageBuilder::error("Invalid template string")
            .with_code("T-2-1")
            .problem("Could not find key missing under var.")
            .with_location(expr)
            .add_info("Path: name")
            .build();

        let text = msg.to_text(Some(&ctx));
        assert!(text.contains("[T-2-1] Invalid template string"));
        assert!(text.contains("garden.yml:2:9"));
        assert!(text.contains("name: ${var.missing}"));
        assert!(text.contains("Could not find key missing under var."));
        assert!(text.ends_with("ℹ Path: name"));
    }

    #[test]
    fn test_unmappable_location_falls_back_to_plain_text() {
        let ctx = SourceContext::new();
        let location = SourceInfo::original(FileId(3), Range::from_offsets(0, 1));
        let msg = DiagnosticMessageBuilder::error("Oops")
            .with_location(location)
            .build();

        assert_eq!(msg.to_text(Some(&ctx)), "Error: Oops\nat 1:1");
    }
}
