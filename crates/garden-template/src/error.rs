/*
 * error.rs
 * Copyright (c) 2026 Garden Technologies, Inc.
 */

//! Error types for template parsing, evaluation and analysis.

use crate::diagnostics::SourceDocument;
use crate::path::DocumentPath;
use garden_error_reporting::{DiagnosticMessage, escape_newlines, natural_list, truncate};
use indexmap::IndexMap;
use std::ops::Range;
use std::sync::Arc;
use thiserror::Error;

/// Longest template excerpt shown in a one-line error message.
pub const MAX_TEMPLATE_DISPLAY_LENGTH: usize = garden_error_reporting::text::MAX_EXCERPT_LENGTH;

/// What went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed template syntax.
    Parse,
    /// A context key was not found.
    Lookup,
    /// An operator, directive or helper received a value of the wrong type.
    Type,
    /// A helper function argument was missing or invalid.
    Argument,
    /// A malformed `$merge`, `$concat`, `$forEach` or `$if` block.
    Directive,
    /// A malformed action or runtime reference.
    Reference,
    /// Template nesting exceeded the configured depth.
    Recursion,
}

impl ErrorKind {
    /// Error code in the diagnostics catalog.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::Parse => "T-1-1",
            ErrorKind::Lookup => "T-2-1",
            ErrorKind::Type => "T-3-1",
            ErrorKind::Argument => "T-4-1",
            ErrorKind::Directive => "T-5-1",
            ErrorKind::Reference => "T-6-1",
            ErrorKind::Recursion => "T-7-1",
        }
    }
}

/// The single error type raised by the template engine.
#[derive(Debug, Clone, Error)]
#[error("{}", display_message(.cause, .template))]
pub struct TemplateError {
    pub kind: ErrorKind,
    /// The bare cause, without the template excerpt.
    pub cause: String,
    /// Raw text of the innermost template string the error occurred in.
    pub template: Option<String>,
    /// Byte span of the failing sub-expression within `template`.
    pub span: Option<Range<usize>>,
    /// Where the template string sits in its document.
    pub path: Option<DocumentPath>,
    /// The document the template string was loaded from.
    pub document: Option<Arc<SourceDocument>>,
}

fn display_message(cause: &str, template: &Option<String>) -> String {
    match template {
        Some(template) => {
            let excerpt = truncate(&escape_newlines(template), MAX_TEMPLATE_DISPLAY_LENGTH);
            let period = if cause.ends_with('.') { "" } else { "." };
            format!("Invalid template string ({excerpt}): {cause}{period}")
        }
        None => cause.to_string(),
    }
}

impl TemplateError {
    pub fn new(kind: ErrorKind, cause: impl Into<String>) -> Self {
        TemplateError {
            kind,
            cause: cause.into(),
            template: None,
            span: None,
            path: None,
            document: None,
        }
    }

    pub fn parse(cause: impl Into<String>) -> Self {
        Self::new(ErrorKind::Parse, cause)
    }

    pub fn lookup(cause: impl Into<String>) -> Self {
        Self::new(ErrorKind::Lookup, cause)
    }

    pub fn type_error(cause: impl Into<String>) -> Self {
        Self::new(ErrorKind::Type, cause)
    }

    pub fn argument(cause: impl Into<String>) -> Self {
        Self::new(ErrorKind::Argument, cause)
    }

    pub fn directive(cause: impl Into<String>) -> Self {
        Self::new(ErrorKind::Directive, cause)
    }

    pub fn reference(cause: impl Into<String>) -> Self {
        Self::new(ErrorKind::Reference, cause)
    }

    pub fn recursion(cause: impl Into<String>) -> Self {
        Self::new(ErrorKind::Recursion, cause)
    }

    /// Attach the span of the failing sub-expression. The innermost span wins.
    pub fn with_span(mut self, span: Range<usize>) -> Self {
        if self.span.is_none() {
            self.span = Some(span);
        }
        self
    }

    /// Attach the raw template string. Errors raised while resolving a
    /// nested template keep that inner template.
    pub fn within_template(mut self, template: &str) -> Self {
        if self.template.is_none() {
            self.template = Some(template.to_string());
        }
        self
    }

    /// Attach the document path, keeping one set by an inner template.
    pub fn at_path(mut self, path: &DocumentPath) -> Self {
        if self.path.is_none() {
            self.path = Some(path.clone());
        }
        self
    }

    pub fn with_document(mut self, document: Option<&Arc<SourceDocument>>) -> Self {
        if self.document.is_none() {
            self.document = document.cloned();
        }
        self
    }

    /// Convert to a structured diagnostic.
    pub fn to_diagnostic(&self) -> DiagnosticMessage {
        crate::diagnostics::to_diagnostic(self)
    }

    /// Render for display: a source snippet with a caret when the source
    /// document is known, otherwise the one-line message.
    pub fn render(&self) -> String {
        crate::diagnostics::render(self)
    }
}

/// Result type for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Raised once per batch when configurations reference secrets that were
/// not loaded.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{}", secrets_message(.missing, .loaded))]
pub struct SecretsMissingError {
    /// Missing secret keys per configuration name, in reference order.
    pub missing: IndexMap<String, Vec<String>>,
    /// Secret keys that were loaded.
    pub loaded: Vec<String>,
}

fn secrets_message(missing: &IndexMap<String, Vec<String>>, loaded: &[String]) -> String {
    let lines: Vec<String> = missing
        .iter()
        .map(|(name, keys)| format!("{name}: {}", keys.join(", ")))
        .collect();
    let footer = if loaded.is_empty() {
        "Note: No secrets have been loaded. If you have defined secrets for the current project \
         and environment in Garden Cloud, this may indicate a problem with your configuration."
            .to_string()
    } else {
        format!("Secret keys with loaded values: {}", loaded.join(", "))
    };
    format!(
        "The following secret names were referenced in configuration, but are missing from the \
         secrets loaded remotely:\n\n{}\n\n{footer}",
        lines.join("\n")
    )
}

/// `Could not find key <seg>[ under <prefix>]. Available keys: <list>.`
pub(crate) fn key_not_found_message(path: &[String], failed_index: usize, available: &[String]) -> String {
    let key = &path[failed_index];
    let mut message = if failed_index == 0 {
        format!("Could not find key {key}.")
    } else {
        format!(
            "Could not find key {key} under {}.",
            path[..failed_index].join(".")
        )
    };
    if !available.is_empty() {
        let mut keys = available.to_vec();
        keys.sort();
        keys.dedup();
        message.push_str(&format!(" Available keys: {}.", natural_list(&keys)));
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    #[test]
    fn test_every_error_code_is_in_the_catalog() {
        let kinds = [
            ErrorKind::Parse,
            ErrorKind::Lookup,
            ErrorKind::Type,
            ErrorKind::Argument,
            ErrorKind::Directive,
            ErrorKind::Reference,
            ErrorKind::Recursion,
        ];
        for kind in kinds {
            assert!(
                garden_error_reporting::get_error_info(kind.code()).is_some(),
                "{kind:?} has no catalog entry"
            );
        }
    }

    #[test]
    fn test_display_without_template() {
        let err = TemplateError::lookup("Could not find key a.");
        assert_eq!(err.to_string(), "Could not find key a.");
    }

    #[test]
    fn test_display_adds_period_once() {
        let err = TemplateError::type_error("Bad value").within_template("${a}");
        assert_eq!(err.to_string(), "Invalid template string (${a}): Bad value.");

        let err = TemplateError::type_error("Bad value.").within_template("${a}");
        assert_eq!(err.to_string(), "Invalid template string (${a}): Bad value.");
    }

    #[test]
    fn test_display_escapes_and_truncates() {
        let long = format!("line\n${{a}}{}", "x".repeat(300));
        let err = TemplateError::parse("Oops").within_template(&long);
        let message = err.to_string();
        assert!(message.starts_with("Invalid template string (line\\n${a}xxx"));
        assert!(message.contains("x...): Oops."));
    }

    #[test]
    fn test_innermost_template_is_kept() {
        let err = TemplateError::lookup("Could not find key b.")
            .within_template("${b}")
            .with_span(2..3)
            .within_template("${var.a}")
            .with_span(0..8);
        assert_eq!(err.template.as_deref(), Some("${b}"));
        assert_eq!(err.span, Some(2..3));
    }

    #[test]
    fn test_key_not_found_messages() {
        let path: Vec<String> = vec!["a".into(), "b".into(), "c".into()];
        assert_eq!(
            key_not_found_message(&path, 2, &["y".into(), "x".into()]),
            "Could not find key c under a.b. Available keys: x and y."
        );
        assert_eq!(key_not_found_message(&path, 0, &[]), "Could not find key a.");
    }

    #[test]
    fn test_secrets_message() {
        let mut missing = IndexMap::new();
        missing.insert("api".to_string(), vec!["a".to_string(), "b".to_string()]);
        missing.insert("worker".to_string(), vec!["c".to_string()]);
        let err = SecretsMissingError {
            missing,
            loaded: vec!["d".to_string()],
        };
        assert_snapshot!(err.to_string(), @r"
        The following secret names were referenced in configuration, but are missing from the secrets loaded remotely:

        api: a, b
        worker: c

        Secret keys with loaded values: d
        ");
    }
}
