//! Editing session
//!
//! A [`Session`] bundles the model, its transaction manager, the kernel
//! configuration and the edit status. Hosts create one per open document
//! and pass it explicitly to whatever issues commands.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::KernelConfig;
use crate::model::Model;
use crate::project::Project;
use crate::txn::{
    Command, LogCategory, RequestRegistry, TransactionManager, TxnError, TxnResult, TxnSignal,
};

/// Whether the session accepts edits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EditStatus {
    #[default]
    Editable,
    ReadOnly,
}

/// An open model with its undo history
#[derive(Debug)]
pub struct Session {
    name: String,
    model: Model,
    transactions: TransactionManager,
    config: KernelConfig,
    edit_status: EditStatus,
}

impl Session {
    /// Geometry tolerances from `config` replace the model's own
    pub fn new(mut model: Model, config: KernelConfig) -> Self {
        model.set_sketch_options(config.builder_options());
        let transactions = TransactionManager::from_config(RequestRegistry::builtin(), &config);
        Self {
            name: String::from("Untitled"),
            model,
            transactions,
            config,
            edit_status: EditStatus::Editable,
        }
    }

    pub fn from_project(project: Project, config: KernelConfig) -> Self {
        info!(name = %project.name, entities = project.model.len(), "Opening project");
        let mut session = Self::new(project.model, config);
        session.name = project.name;
        session
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn transactions(&self) -> &TransactionManager {
        &self.transactions
    }

    /// Register custom request factories here
    pub fn registry_mut(&mut self) -> &mut RequestRegistry {
        self.transactions.registry_mut()
    }

    pub fn edit_status(&self) -> EditStatus {
        self.edit_status
    }

    pub fn is_read_only(&self) -> bool {
        self.edit_status == EditStatus::ReadOnly
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.edit_status = if read_only {
            EditStatus::ReadOnly
        } else {
            EditStatus::Editable
        };
    }

    pub fn execute(&mut self, command: &mut dyn Command) -> TxnResult<bool> {
        self.ensure_editable(command.description())?;
        self.transactions.execute(&mut self.model, command)
    }

    pub fn undo(&mut self) -> TxnResult<bool> {
        self.ensure_editable("undo")?;
        self.transactions.undo(&mut self.model)
    }

    pub fn redo(&mut self) -> TxnResult<bool> {
        self.ensure_editable("redo")?;
        self.transactions.redo(&mut self.model)
    }

    /// Merge consecutive edits of the same field until [`Session::end_compose`]
    pub fn begin_compose(&mut self) {
        self.transactions.begin_compose();
    }

    pub fn end_compose(&mut self) {
        self.transactions.end_compose();
    }

    pub fn can_undo(&self) -> bool {
        !self.is_read_only() && self.transactions.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        !self.is_read_only() && self.transactions.can_redo()
    }

    pub fn history(&self) -> Vec<(&str, LogCategory)> {
        self.transactions.history()
    }

    pub fn drain_signals(&mut self) -> Vec<TxnSignal> {
        self.transactions.drain_signals()
    }

    /// Close the session, keeping the edited model
    pub fn into_project(self) -> Project {
        Project::new(self.name, self.model)
    }

    fn ensure_editable(&self, action: &str) -> TxnResult<()> {
        if self.is_read_only() {
            warn!(action, "Session is read-only");
            return Err(TxnError::ReadOnly);
        }
        Ok(())
    }
}
