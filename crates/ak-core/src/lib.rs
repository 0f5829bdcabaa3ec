//! Architectural editing kernel
//!
//! This crate provides:
//! - Entities (walls, slabs, roofs, windows, content) built from components
//! - Layers carrying slab and roof-drawing sketches
//! - Requests, commands and the transaction manager with undo/redo
//! - Kernel configuration and project persistence
//!
//! The live [`Model`] is only handed out as `&Model`; every mutation goes
//! through a [`Request`] committed by the [`TransactionManager`].

pub mod component;
pub mod config;
pub mod entity;
pub mod error;
pub mod layer;
pub mod model;
pub mod project;
pub mod session;
pub mod txn;
pub mod txn_type;

// Re-exports for convenience
pub use component::{Component, ComponentData};
pub use config::{ConfigError, GeometryConfig, KernelConfig, SlabConfig};
pub use entity::{
    Entity, EntityData, EntityId, EntityKind, FieldName, FieldRef, FieldValue, SlabFaces,
    WallEnd, WallFaces,
};
pub use error::{ModelError, ModelResult};
pub use layer::{Layer, LayerId};
pub use model::{Model, ModelBuilder, SketchTarget};
pub use project::{Project, ProjectError};
pub use session::{EditStatus, Session};
pub use txn::{
    Command, CompositeCommand, EditCapability, EditCommand, HistoryEntry, LogCategory, Request,
    RequestData, RequestRegistry, RequestState, RequestType, SequenceCommand, TrackedRequest,
    TransactionManager, TxnError, TxnPhase, TxnResult, TxnScope, TxnSignal,
};
pub use txn_type::EntityTransactionType;
