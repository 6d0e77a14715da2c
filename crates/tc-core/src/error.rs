//! Core error type.
//!
//! Sub-crates define their own error enums and wrap `CoreError` where they
//! surface catalog problems.

use thiserror::Error;

use crate::RouteId;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("route catalog parse error: {0}")]
    Parse(String),

    #[error("route {0} is defined more than once")]
    DuplicateRoute(RouteId),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shorthand result type for `tc-core`.
pub type CoreResult<T> = Result<T, CoreError>;
