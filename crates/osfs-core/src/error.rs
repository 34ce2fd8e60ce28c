//! Unified application error types for osfstorage.
//!
//! Every crate maps its internal failures into [`AppError`] so that the
//! `?` operator works end to end. Each error carries an [`ErrorKind`]
//! the HTTP layer can map to a status code, plus an optional
//! [`ErrorDetail`] with the structured data needed for a precise message
//! (offending node, blocking user, violated constraint).

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Top-level error kind categorization used across the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The referenced node, version or container does not exist.
    NotFound,
    /// The referenced node exists only in the trash.
    Gone,
    /// A folder was expected but a file was given, or vice versa.
    TypeMismatch,
    /// The operation is blocked by an active checkout.
    CheckedOut,
    /// The node is the designated primary file of an external resource.
    PrimaryFileConstraint,
    /// Input validation failed.
    Validation,
    /// The move would make a node its own ancestor.
    Cycle,
    /// The requested state is already held.
    Duplicate,
    /// A concurrent modification or unique-constraint race was detected.
    Conflict,
    /// The caller may not perform this transition.
    Authorization,
    /// The backing store failed.
    Database,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// A configuration error occurred.
    Configuration,
    /// An internal error occurred.
    Internal,
}

impl ErrorKind {
    /// HTTP status code the request layer should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::Gone => 410,
            Self::TypeMismatch | Self::Validation | Self::Cycle => 400,
            Self::Authorization => 403,
            Self::CheckedOut | Self::PrimaryFileConstraint | Self::Duplicate | Self::Conflict => {
                409
            }
            Self::Database | Self::Serialization | Self::Configuration | Self::Internal => 500,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Gone => write!(f, "GONE"),
            Self::TypeMismatch => write!(f, "TYPE_MISMATCH"),
            Self::CheckedOut => write!(f, "CHECKED_OUT"),
            Self::PrimaryFileConstraint => write!(f, "PRIMARY_FILE_CONSTRAINT"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::Cycle => write!(f, "CYCLE"),
            Self::Duplicate => write!(f, "DUPLICATE"),
            Self::Conflict => write!(f, "CONFLICT"),
            Self::Authorization => write!(f, "AUTHORIZATION"),
            Self::Database => write!(f, "DATABASE"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// Structured data attached to an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// The node the error is about.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<Uuid>,
    /// The user holding a blocking checkout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    /// Name of the violated constraint or the resource holding it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraint: Option<String>,
}

/// The unified application error used throughout osfstorage.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Structured detail for the request layer.
    pub detail: ErrorDetail,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: ErrorDetail::default(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: ErrorDetail::default(),
            source: Some(Box::new(source)),
        }
    }

    /// Attach the offending node id.
    pub fn for_node(mut self, node_id: impl Into<Uuid>) -> Self {
        self.detail.node_id = Some(node_id.into());
        self
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create a gone error for a node that only exists in the trash.
    pub fn gone(node_id: impl Into<Uuid>) -> Self {
        let node_id = node_id.into();
        Self::new(ErrorKind::Gone, format!("Node {node_id} has been deleted")).for_node(node_id)
    }

    /// Create a type-mismatch error.
    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeMismatch, message)
    }

    /// Create a checked-out error naming the node and the user holding it.
    pub fn checked_out(node_id: impl Into<Uuid>, holder: Option<Uuid>) -> Self {
        let node_id = node_id.into();
        let mut err = Self::new(
            ErrorKind::CheckedOut,
            format!("File {node_id} is checked out"),
        )
        .for_node(node_id);
        err.detail.user_id = holder;
        err
    }

    /// Create a primary-file constraint error.
    pub fn primary_file(node_id: impl Into<Uuid>, resource: impl Into<String>, verb: &str) -> Self {
        let resource = resource.into();
        let mut err = Self::new(
            ErrorKind::PrimaryFileConstraint,
            format!("Cannot {verb} file as it is the primary file of {resource}"),
        )
        .for_node(node_id);
        err.detail.constraint = Some(resource);
        err
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a cycle error.
    pub fn cycle(node_id: impl Into<Uuid>) -> Self {
        let node_id = node_id.into();
        Self::new(
            ErrorKind::Cycle,
            format!("Cannot move {node_id} into itself or one of its descendants"),
        )
        .for_node(node_id)
    }

    /// Create a duplicate-transition error.
    pub fn duplicate(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Duplicate, message)
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Create an authorization error.
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authorization, message)
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Whether this error has the given kind.
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            detail: self.detail.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::with_source(ErrorKind::Validation, format!("Invalid payload: {err}"), err)
    }
}

#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                let constraint = db_err.constraint().map(str::to_string);
                let mut app = Self::with_source(
                    ErrorKind::Conflict,
                    format!("Unique constraint violated: {err}"),
                    err,
                );
                app.detail.constraint = constraint;
                app
            }
            _ => Self::with_source(ErrorKind::Database, format!("Database error: {err}"), err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_out_carries_holder() {
        let node = Uuid::new_v4();
        let holder = Uuid::new_v4();
        let err = AppError::checked_out(node, Some(holder));
        assert_eq!(err.kind, ErrorKind::CheckedOut);
        assert_eq!(err.detail.node_id, Some(node));
        assert_eq!(err.detail.user_id, Some(holder));
        assert_eq!(err.kind.http_status(), 409);
    }

    #[test]
    fn test_primary_file_names_resource() {
        let err = AppError::primary_file(Uuid::new_v4(), "preprint abc12", "move");
        assert_eq!(err.kind, ErrorKind::PrimaryFileConstraint);
        assert_eq!(err.detail.constraint.as_deref(), Some("preprint abc12"));
        assert!(err.message.contains("primary file of preprint abc12"));
    }

    #[test]
    fn test_gone_maps_to_410() {
        let err = AppError::gone(Uuid::new_v4());
        assert_eq!(err.kind.http_status(), 410);
        assert!(err.detail.node_id.is_some());
    }

    #[test]
    fn test_clone_drops_source_keeps_detail() {
        let err = AppError::with_source(
            ErrorKind::Database,
            "boom",
            std::io::Error::other("disk"),
        )
        .for_node(Uuid::nil());
        let cloned = err.clone();
        assert!(cloned.source.is_none());
        assert_eq!(cloned.detail.node_id, Some(Uuid::nil()));
    }
}
