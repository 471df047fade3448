/*
 * options.rs
 * Copyright (c) 2026 Garden Technologies, Inc.
 */

//! Options threaded through every evaluation call.

use crate::error::{TemplateError, TemplateResult};
use tracing::debug;

/// How unresolved references are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResolutionMode {
    /// Any missing key raises immediately.
    #[default]
    Strict,
    /// A missing key makes its whole template string pass through
    /// unresolved, so a later pass can resolve it.
    LegacyPartial,
}

/// Options for evaluation.
#[derive(Debug, Clone)]
pub struct EvalOptions {
    pub mode: ResolutionMode,
    /// Collapse `$${` escapes to `${` in the output.
    pub unescape: bool,
    /// Maximum number of nested template evaluations (default: 64).
    ///
    /// A variable whose template reads another variable counts as one level.
    /// Exceeding it fails with a `Recursion` error instead of overflowing the
    /// stack on circular references.
    pub max_depth: usize,
    depth: usize,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            mode: ResolutionMode::Strict,
            unescape: false,
            max_depth: 64,
            depth: 0,
        }
    }
}

impl EvalOptions {
    pub fn strict() -> Self {
        Self::default()
    }

    pub fn legacy_partial() -> Self {
        Self::default().with_mode(ResolutionMode::LegacyPartial)
    }

    pub fn with_mode(mut self, mode: ResolutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_unescape(mut self, unescape: bool) -> Self {
        self.unescape = unescape;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.mode == ResolutionMode::Strict
    }

    /// Options for one more level of nested template evaluation.
    pub(crate) fn nested(&self) -> TemplateResult<EvalOptions> {
        if self.depth >= self.max_depth {
            debug!(max_depth = self.max_depth, "template nesting depth exceeded");
            return Err(TemplateError::recursion(format!(
                "Maximum template nesting depth of {} exceeded. This usually means a variable references itself, directly or through other variables",
                self.max_depth
            )));
        }
        Ok(EvalOptions {
            depth: self.depth + 1,
            ..self.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = EvalOptions::default();
        assert!(options.is_strict());
        assert!(!options.unescape);
        assert_eq!(options.max_depth, 64);
    }

    #[test]
    fn test_nested_depth_limit() {
        let options = EvalOptions::legacy_partial().with_max_depth(2);
        let once = options.nested().unwrap();
        let twice = once.nested().unwrap();
        assert_eq!(twice.mode, ResolutionMode::LegacyPartial);

        let err = twice.nested().unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Recursion);
        assert!(err.cause.starts_with("Maximum template nesting depth of 2 exceeded"));
    }
}
