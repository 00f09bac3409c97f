//! Typed error kinds for the view/engine core.
//!
//! The engine itself never panics on bad input; production builds turn
//! contract violations into [`ViewError::ContractViolation`] rather than
//! aborting (debug builds additionally `debug_assert!` so tests catch
//! regressions early).

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ViewError {
    #[error("invalid prefix: {0}")]
    InvalidPrefix(String),

    #[error("unknown ip version byte: {0}")]
    UnknownIpVersion(u8),

    #[error("missing frame: expected {expected}")]
    MissingFrame { expected: &'static str },

    #[error("magic mismatch: expected {expected:#x}, got {found:#x}")]
    MagicMismatch { expected: u32, found: u32 },

    #[error("peer id space exhausted")]
    PeerIdExhausted,

    #[error("as-path store exhausted")]
    PathStoreExhausted,

    #[error("contract violation: {0}")]
    ContractViolation(&'static str),

    #[error("unexpected end of stream")]
    UnexpectedEof,

    /// Transport codec I/O failure. Stored as the formatted message
    /// rather than the source `io::Error` so `ViewError` can keep
    /// deriving `Clone`/`PartialEq`/`Eq` (`io::Error` implements
    /// neither).
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ViewError {
    fn from(err: std::io::Error) -> Self {
        ViewError::Io(err.to_string())
    }
}

pub type ViewResult<T> = Result<T, ViewError>;

/// Asserts an invariant in debug builds and returns a [`ViewError`] in
/// release builds instead of unwinding. See §7: "View-internal assertions
/// abort in debug builds... production builds treat them as recoverable
/// errors."
macro_rules! view_assert {
    ($cond:expr, $msg:expr) => {
        if cfg!(debug_assertions) {
            debug_assert!($cond, $msg);
        } else if !$cond {
            return Err($crate::error::ViewError::ContractViolation($msg));
        }
    };
}

pub(crate) use view_assert;
