//! # Path Accumulator — Scoped Paths and Aggregated Read Errors
//!
//! Every read threads one [`PathAccumulator`] through the codecs. Codecs
//! enter a field or index with [`PathAccumulator::scoped`], and report
//! failures with [`PathAccumulator::record`], which tags the message with the
//! active path and hands back a [`Recorded`] token.
//!
//! ## Invariants
//!
//! - A segment pushed by `scoped` is popped when the closure returns, whether
//!   the inner read succeeded or failed, so siblings see the correct path.
//! - Errors are kept in the order they were recorded: schema field order,
//!   then sequence index order.
//! - A [`Recorded`] token can only be obtained by recording an error. A codec
//!   returning `Err(Recorded)` has therefore always left at least one entry.

use std::fmt;

use crate::error::{ErrorKind, FieldError, ReadError};

/// Default nesting limit for reads.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// One step in a document path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Object member, rendered as `.name`.
    Field(String),
    /// Array element, rendered as `[index]`.
    Index(usize),
}

impl Segment {
    /// Object member segment.
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => write!(f, ".{name}"),
            Self::Index(i) => write!(f, "[{i}]"),
        }
    }
}

/// Proof that a failure was recorded in the accumulator.
///
/// Codecs return `Result<T, Recorded>`: the error details already live in the
/// accumulator, the token only signals that the value is unusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recorded(());

/// Tracks the current document path and collects path-qualified failures.
#[derive(Debug)]
pub struct PathAccumulator {
    segments: Vec<Segment>,
    errors: Vec<FieldError>,
    max_depth: usize,
}

impl Default for PathAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl PathAccumulator {
    /// Empty accumulator positioned at the document root.
    pub fn new() -> Self {
        Self::with_max_depth(DEFAULT_MAX_DEPTH)
    }

    /// Empty accumulator with a custom nesting limit.
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            segments: Vec::new(),
            errors: Vec::new(),
            max_depth,
        }
    }

    /// Enter a field or index.
    pub fn push(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    /// Leave the innermost field or index.
    pub fn pop(&mut self) -> Option<Segment> {
        self.segments.pop()
    }

    /// Run `f` with `segment` pushed, popping it afterwards regardless of the
    /// outcome of `f`.
    pub fn scoped<R>(&mut self, segment: Segment, f: impl FnOnce(&mut Self) -> R) -> R {
        self.push(segment);
        let result = f(self);
        self.pop();
        result
    }

    /// Current nesting depth (number of active segments).
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Configured nesting limit.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Record a failure unless the current depth is within the limit.
    ///
    /// Container codecs call this before descending.
    pub fn guard_depth(&mut self) -> Result<(), Recorded> {
        if self.segments.len() > self.max_depth {
            let kind = ErrorKind::MalformedStructure {
                expected: format!("nesting depth at most {}", self.max_depth),
                found: format!("depth {}", self.segments.len()),
            };
            return Err(self.record(kind));
        }
        Ok(())
    }

    /// Render the active path, e.g. `.items[3].name`. The root is `""`.
    pub fn current_path(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            out.push_str(&segment.to_string());
        }
        out
    }

    /// Attach `kind` to the active path.
    pub fn record(&mut self, kind: ErrorKind) -> Recorded {
        self.errors.push(FieldError {
            path: self.current_path(),
            kind,
        });
        Recorded(())
    }

    /// Whether any failure has been recorded.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Number of failures recorded so far.
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Failures recorded so far, in order.
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Consume the accumulator into the aggregated read error.
    pub fn into_read_error(self) -> ReadError {
        ReadError::new(self.errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_path_is_empty() {
        let acc = PathAccumulator::new();
        assert_eq!(acc.current_path(), "");
        assert_eq!(acc.depth(), 0);
    }

    #[test]
    fn test_nested_path_rendering() {
        let mut acc = PathAccumulator::new();
        acc.push(Segment::field("items"));
        acc.push(Segment::Index(3));
        acc.push(Segment::field("name"));
        assert_eq!(acc.current_path(), ".items[3].name");
        assert_eq!(acc.pop(), Some(Segment::field("name")));
        assert_eq!(acc.current_path(), ".items[3]");
    }

    #[test]
    fn test_scoped_pops_after_failure() {
        let mut acc = PathAccumulator::new();
        let result: Result<(), Recorded> = acc.scoped(Segment::field("a"), |acc| {
            Err(acc.record(ErrorKind::MissingRequiredField))
        });
        assert!(result.is_err());
        assert_eq!(acc.current_path(), "");

        acc.scoped(Segment::field("b"), |acc| {
            acc.record(ErrorKind::ValidationFailed("nope".to_string()));
        });

        let err = acc.into_read_error();
        assert_eq!(err.paths(), vec![".a", ".b"]);
    }

    #[test]
    fn test_errors_keep_discovery_order() {
        let mut acc = PathAccumulator::new();
        for i in [2usize, 0, 1] {
            acc.scoped(Segment::Index(i), |acc| {
                acc.record(ErrorKind::MissingRequiredField);
            });
        }
        assert_eq!(acc.error_count(), 3);
        let err = acc.into_read_error();
        assert_eq!(err.paths(), vec!["[2]", "[0]", "[1]"]);
    }

    #[test]
    fn test_guard_depth() {
        let mut acc = PathAccumulator::with_max_depth(2);
        acc.push(Segment::field("a"));
        acc.push(Segment::field("b"));
        assert!(acc.guard_depth().is_ok());
        acc.push(Segment::field("c"));
        assert!(acc.guard_depth().is_err());
        assert_eq!(acc.errors()[0].path, ".a.b.c");
        assert_eq!(acc.errors()[0].kind.code(), "malformed_structure");
    }
}
