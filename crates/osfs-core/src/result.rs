//! Convenience result type alias for osfstorage.

use crate::error::AppError;

/// A specialized `Result` type for osfstorage operations.
pub type AppResult<T> = Result<T, AppError>;
