//! Transactions
//!
//! Requests are the reversible units of mutation, commands group requests
//! into one user-visible history step, and the transaction manager executes
//! commands and keeps the undo/redo stacks.

mod capability;
mod command;
mod error;
mod manager;
mod registry;
mod request;
pub mod requests;

pub use capability::{EditCapability, LogCategory};
pub use command::{Command, CompositeCommand, EditCommand, FieldGate, SequenceCommand};
pub use error::{TxnError, TxnResult};
pub use manager::{HistoryEntry, TransactionManager, TxnPhase, TxnScope, TxnSignal};
pub use registry::{RequestFactory, RequestRegistry};
pub use request::{Request, RequestData, RequestState, RequestType, SketchOp, TrackedRequest};
