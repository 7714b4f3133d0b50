//! Errors - エラー型と分類
//!
//! Every dispatch entry point returns exactly one error channel. A caller cannot
//! tell "the interpreter returned an error" from "the interpreter panicked"
//! without asking [`EffectError::kind`].

use std::fmt;

use thiserror::Error;

use super::arg::Kind;

/// ErrorKind は EffectError の分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Wrong shape passed to a dispatch entry point.
    Argument,
    /// The interpreter's own error, passed through verbatim.
    Domain,
    /// The interpreter panicked; the panic was contained.
    Fault,
    /// The context was cancelled or its deadline passed.
    Cancelled,
    /// A scripted test context was not fully consumed.
    Test,
}

/// Batch entry point named in shape errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOp {
    Series,
    Concurrent,
}

impl fmt::Display for BatchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchOp::Series => f.write_str("DoSeries"),
            BatchOp::Concurrent => f.write_str("DoConcurrent"),
        }
    }
}

#[derive(Debug, Error)]
pub enum EffectError {
    #[error("ctx.Do(...) must receive a ptr")]
    NotAPointer,

    #[error("ctx.Do(...) cannot receive a nil ptr")]
    NilPointer,

    #[error("a slice of cmd pointers must be passed to `{op}` but a `{kind}` was passed instead")]
    NotASlice { op: BatchOp, kind: Kind },

    #[error("a slice of ptrs must be passed to `{op}` but the slice contains a `{kind}` at index {index}")]
    NotAPointerAt { op: BatchOp, kind: Kind, index: usize },

    #[error("{0}")]
    Fault(String),

    #[error(transparent)]
    Domain(Box<dyn std::error::Error + Send + Sync>),

    #[error("context canceled")]
    Canceled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,

    #[error("expected {expected} cmds to be processed but processed {processed}")]
    Unfinished { expected: usize, processed: usize },
}

impl EffectError {
    /// Wraps an interpreter-side error.
    pub fn domain(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        EffectError::Domain(err.into())
    }

    /// Domain error from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        EffectError::Domain(message.into().into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            EffectError::NotAPointer
            | EffectError::NilPointer
            | EffectError::NotASlice { .. }
            | EffectError::NotAPointerAt { .. } => ErrorKind::Argument,
            EffectError::Fault(_) => ErrorKind::Fault,
            EffectError::Domain(_) => ErrorKind::Domain,
            EffectError::Canceled | EffectError::DeadlineExceeded => ErrorKind::Cancelled,
            EffectError::Unfinished { .. } => ErrorKind::Test,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::not_ptr(EffectError::NotAPointer, "ctx.Do(...) must receive a ptr")]
    #[case::nil(EffectError::NilPointer, "ctx.Do(...) cannot receive a nil ptr")]
    #[case::series_not_slice(
        EffectError::NotASlice { op: BatchOp::Series, kind: Kind::Ptr },
        "a slice of cmd pointers must be passed to `DoSeries` but a `ptr` was passed instead"
    )]
    #[case::concurrent_not_slice(
        EffectError::NotASlice { op: BatchOp::Concurrent, kind: Kind::Bool },
        "a slice of cmd pointers must be passed to `DoConcurrent` but a `bool` was passed instead"
    )]
    #[case::series_element(
        EffectError::NotAPointerAt { op: BatchOp::Series, kind: Kind::Struct, index: 0 },
        "a slice of ptrs must be passed to `DoSeries` but the slice contains a `struct` at index 0"
    )]
    #[case::unfinished(
        EffectError::Unfinished { expected: 3, processed: 1 },
        "expected 3 cmds to be processed but processed 1"
    )]
    #[case::deadline(EffectError::DeadlineExceeded, "context deadline exceeded")]
    fn messages_are_stable(#[case] err: EffectError, #[case] expected: &str) {
        assert_eq!(err.to_string(), expected);
    }

    #[test]
    fn domain_errors_display_verbatim() {
        let err = EffectError::msg("oops");
        assert_eq!(err.to_string(), "oops");
        assert_eq!(err.kind(), ErrorKind::Domain);

        let io = std::io::Error::other("disk on fire");
        let err = EffectError::domain(io);
        assert_eq!(err.to_string(), "disk on fire");
    }

    #[test]
    fn kinds() {
        assert_eq!(EffectError::NilPointer.kind(), ErrorKind::Argument);
        assert_eq!(EffectError::Fault("x".into()).kind(), ErrorKind::Fault);
        assert_eq!(EffectError::Canceled.kind(), ErrorKind::Cancelled);
        assert_eq!(
            EffectError::Unfinished { expected: 1, processed: 0 }.kind(),
            ErrorKind::Test
        );
    }
}
