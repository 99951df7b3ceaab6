//! Error types for definition validation and test assertions.
//!
//! Two kinds of failure exist in this crate:
//!
//! - [`DefinitionError`] - a test-definition document (or the metadata file)
//!   does not conform to the expected schema. These errors form an explicit
//!   cause chain: each layer that catches a lower-level error re-raises a new
//!   one with a higher-level summary, keeping the original as its
//!   [`source`](std::error::Error::source). The flattened chain is the primary
//!   diagnostic artifact shown to users.
//! - [`TestFailure`] - a template rendered successfully but its output
//!   diverged from the golden file. Carries the unified diff as its payload.
//!
//! Plain I/O problems (an unreadable expected-result file, a missing variable
//! file) are neither of these; they propagate as ordinary [`anyhow::Error`]s
//! since they indicate a broken fixture rather than an invalid document or a
//! rendering mismatch.

use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

/// A test-definition document, metadata file, or path attribute failed
/// validation.
///
/// Each error carries a short message and optionally the lower-level error
/// that caused it. Use [`DefinitionError::chain`] to render the full
/// outer-to-inner chain for diagnostics:
///
/// ```
/// use roletest::error::DefinitionError;
///
/// let inner = DefinitionError::new("path is empty string");
/// let outer = DefinitionError::with_cause("invalid inventory attribute", inner);
/// assert_eq!(outer.chain(), "invalid inventory attribute: path is empty string");
/// ```
#[derive(Debug)]
pub struct DefinitionError {
    message: String,
    cause: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl DefinitionError {
    /// Creates an error with no underlying cause.
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), cause: None }
    }

    /// Creates an error wrapping a lower-level cause.
    pub fn with_cause(
        message: impl Into<String>,
        cause: impl Into<Box<dyn StdError + Send + Sync + 'static>>,
    ) -> Self {
        Self { message: message.into(), cause: Some(cause.into()) }
    }

    /// The summary message of this layer only, without any causes.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Flattens the cause chain into `msg1: msg2: msg3: ...`, strict
    /// outer-to-inner order.
    pub fn chain(&self) -> String {
        let mut rendered = self.message.clone();
        let mut source = StdError::source(self);
        while let Some(cause) = source {
            rendered.push_str(": ");
            rendered.push_str(&cause.to_string());
            source = cause.source();
        }
        rendered
    }
}

impl fmt::Display for DefinitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for DefinitionError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause.as_deref().map(|cause| cause as &(dyn StdError + 'static))
    }
}

/// Rendered output did not match the expected golden file.
///
/// The payload is the unified diff between the golden file (`-` lines) and
/// the rendered output (`+` lines), with no trailing newline.
#[derive(Debug, Error)]
#[error("{diff}")]
pub struct TestFailure {
    diff: String,
}

impl TestFailure {
    /// Creates a failure carrying the given diff text.
    pub fn new(diff: impl Into<String>) -> Self {
        Self { diff: diff.into() }
    }

    /// The full unified diff text.
    pub fn diff(&self) -> &str {
        &self.diff
    }
}
