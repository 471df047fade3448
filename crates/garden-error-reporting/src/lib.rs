//! Error reporting and diagnostic messages for Garden configuration.
//!
//! Diagnostics follow a small fixed structure: a code, a title, an optional
//! problem statement and bulleted details. When the failing value can be
//! located in a loaded configuration file, [`DiagnosticMessage::to_text`]
//! renders the offending line with a caret under the exact column using
//! ariadne.
//!
//! # Example
//!
//! ```
//! use garden_error_reporting::DiagnosticMessageBuilder;
//!
//! let error = DiagnosticMessageBuilder::error("Invalid template string")
//!     .with_code("T-2-1")
//!     .problem("Could not find key foo.")
//!     .add_info("Template: ${foo}")
//!     .build();
//!
//! let text = error.to_text(None);
//! assert!(text.starts_with("Error [T-2-1]: Invalid template string"));
//! ```

pub mod builder;
pub mod catalog;
pub mod diagnostic;
pub mod text;

pub use builder::DiagnosticMessageBuilder;
pub use catalog::{ERROR_CATALOG, ErrorCodeInfo, get_docs_url, get_error_info};
pub use diagnostic::DiagnosticMessage;
pub use text::{escape_newlines, natural_list, truncate};
