//! Transaction error types

use ak_sketch::SketchError;
use thiserror::Error;

use super::request::{RequestState, RequestType};
use crate::entity::FieldRef;
use crate::error::ModelError;

/// Transaction-related errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TxnError {
    /// A field gate refused the change; the whole command is abandoned
    #[error("Field change rejected: {0}")]
    Rejected(FieldRef),

    #[error("Request type not registered: {0}")]
    UnregisteredRequestType(String),

    #[error("Malformed data for {request}: expected {expected}")]
    MalformedRequestData {
        request: RequestType,
        expected: &'static str,
    },

    #[error("Cannot {action} a request in state {from:?}")]
    InvalidTransition {
        from: RequestState,
        action: &'static str,
    },

    #[error("Editing is disabled for this session")]
    ReadOnly,

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Sketch(#[from] SketchError),
}

/// Result type for transaction operations
pub type TxnResult<T> = Result<T, TxnError>;
