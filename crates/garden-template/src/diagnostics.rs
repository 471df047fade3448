/*
 * diagnostics.rs
 * Copyright (c) 2026 Garden Technologies, Inc.
 */

//! Source documents and conversion of template errors into diagnostics.

use crate::error::TemplateError;
use crate::path::DocumentPath;
use garden_error_reporting::{DiagnosticMessage, DiagnosticMessageBuilder};
use garden_source_map::{FileId, SourceContext, SourceInfo};
use std::collections::HashMap;
use std::ops::Range;

const TITLE: &str = "Invalid template string";

/// A configuration file a document was loaded from.
///
/// `locations` maps document paths to the byte range of their scalar in the
/// file, as reported by the loader.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    context: SourceContext,
    file_id: FileId,
    locations: HashMap<DocumentPath, Range<usize>>,
}

impl SourceDocument {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        let mut context = SourceContext::new();
        let file_id = context.add_file(name.into(), content.into());
        SourceDocument {
            context,
            file_id,
            locations: HashMap::new(),
        }
    }

    /// Record where the scalar at `path` sits in the file.
    pub fn with_location(mut self, path: DocumentPath, range: Range<usize>) -> Self {
        self.locations.insert(path, range);
        self
    }

    pub fn name(&self) -> &str {
        self.context
            .get_file(self.file_id)
            .map(|file| file.path.as_str())
            .unwrap_or_default()
    }

    pub fn content(&self) -> &str {
        self.context
            .get_file(self.file_id)
            .map(|file| file.content.as_str())
            .unwrap_or_default()
    }

    pub fn source_context(&self) -> &SourceContext {
        &self.context
    }

    pub fn location_of(&self, path: &DocumentPath) -> Option<Range<usize>> {
        self.locations.get(path).cloned()
    }

    /// Where a template error points in this file: the scalar (after an
    /// opening quote) narrowed to the failing sub-expression.
    fn locate(&self, path: &DocumentPath, span: Option<&Range<usize>>) -> Option<SourceInfo> {
        let scalar = self.locations.get(path)?;
        let quoted = self
            .content()
            .get(scalar.start..)
            .is_some_and(|rest| rest.starts_with(['"', '\'']));
        let start = scalar.start + usize::from(quoted);
        let end = scalar.end.max(start);
        let info = SourceInfo::from_offsets(&self.context, self.file_id, start, end)?;
        Some(match span {
            Some(span) => SourceInfo::substring(info, span.start, span.end),
            None => info,
        })
    }
}

fn location(err: &TemplateError) -> Option<SourceInfo> {
    let document = err.document.as_ref()?;
    document.locate(err.path.as_ref()?, err.span.as_ref())
}

pub(crate) fn to_diagnostic(err: &TemplateError) -> DiagnosticMessage {
    let mut builder = DiagnosticMessageBuilder::error(TITLE)
        .with_code(err.kind.code())
        .problem(err.cause.clone());
    if let Some(template) = &err.template {
        builder = builder.add_info(format!("Template: {}", err_excerpt(template)));
    }
    if let Some(path) = &err.path {
        builder = builder.add_info(format!("Path: {path}"));
    }
    if let Some(location) = location(err) {
        builder = builder.with_location(location);
    }
    builder.build()
}

fn err_excerpt(template: &str) -> String {
    garden_error_reporting::truncate(
        &garden_error_reporting::escape_newlines(template),
        garden_error_reporting::text::MAX_EXCERPT_LENGTH,
    )
}

/// A snippet with a caret when the error can be located in its document,
/// otherwise the one-line message.
pub(crate) fn render(err: &TemplateError) -> String {
    match (&err.document, location(err)) {
        (Some(document), Some(_)) => to_diagnostic(err).to_text(Some(document.source_context())),
        _ => err.to_string(),
    }
}
