//! Sketch error types

use thiserror::Error;

use crate::sketch::FaceId;
use crate::tag::TopoRole;

/// Sketch-related errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SketchError {
    #[error("Invalid topology tag: {0}")]
    InvalidTopoTag(String),

    #[error("Degenerate polygon: {0}")]
    DegeneratePolygon(String),

    #[error("Face not found: {0}")]
    FaceNotFound(FaceId),

    #[error("Role {role} is not declared by the {builder} builder")]
    UndeclaredRole {
        role: TopoRole,
        builder: &'static str,
    },

    #[error("Boolean operation failed: {0}")]
    BooleanFailed(String),
}

/// Result type for sketch operations
pub type SketchResult<T> = Result<T, SketchError>;
