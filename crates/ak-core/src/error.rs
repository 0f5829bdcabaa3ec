//! Model error types

use thiserror::Error;

use crate::entity::{EntityId, EntityKind, FieldName};
use crate::layer::LayerId;

/// Model-related errors
///
/// These indicate wiring bugs (wrong field for an entity kind, a component
/// used before it was attached). Missing entities are not errors; callers
/// treat them as no-ops.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ModelError {
    #[error("Field {field} does not apply to {kind}")]
    FieldNotApplicable { kind: EntityKind, field: FieldName },

    #[error("Field {field} expects a {expected} value")]
    FieldTypeMismatch {
        field: FieldName,
        expected: &'static str,
    },

    #[error("Entity {id} is a {actual}, expected {expected}")]
    KindMismatch {
        id: EntityId,
        expected: EntityKind,
        actual: EntityKind,
    },

    #[error("Component {0} has no owner")]
    ComponentOwnerUnset(&'static str),

    #[error("Invalid component record: {0}")]
    InvalidComponent(String),

    #[error("Layer not found: {0}")]
    LayerNotFound(LayerId),

    #[error("Unknown entity transaction type: {0}")]
    UnknownTransactionType(u8),

    #[error(transparent)]
    Sketch(#[from] ak_sketch::SketchError),
}

/// Result type for model operations
pub type ModelResult<T> = Result<T, ModelError>;
