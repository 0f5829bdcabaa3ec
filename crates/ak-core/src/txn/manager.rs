//! Transaction Manager
//!
//! Executes commands against the model and keeps the undo/redo history.
//! A command either commits all of its requests as one history entry or
//! leaves the model untouched.

use tracing::{debug, info, warn};

use super::capability::LogCategory;
use super::command::Command;
use super::error::TxnResult;
use super::registry::RequestRegistry;
use super::request::{Request, TrackedRequest};
use crate::config::KernelConfig;
use crate::entity::EntityId;
use crate::model::Model;
use crate::txn_type::EntityTransactionType;

const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Phase in which an entity change was observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxnPhase {
    Commit,
    Undo,
    Redo,
}

/// Entity change queued for listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxnSignal {
    pub entity: EntityId,
    pub change: EntityTransactionType,
    pub phase: TxnPhase,
}

/// One undoable step
#[derive(Debug)]
pub struct HistoryEntry {
    pub description: String,
    pub category: LogCategory,
    /// Requests in commit order
    pub requests: Vec<TrackedRequest>,
}

// ============== Scope ==============

/// Requests committed while a command executes
///
/// Dropping the scope keeps whatever was committed; the manager calls
/// [`TxnScope::rollback`] when the command fails.
pub struct TxnScope<'a> {
    registry: &'a RequestRegistry,
    model: &'a mut Model,
    committed: Vec<TrackedRequest>,
}

impl<'a> TxnScope<'a> {
    pub(crate) fn new(registry: &'a RequestRegistry, model: &'a mut Model) -> Self {
        Self {
            registry,
            model,
            committed: Vec::new(),
        }
    }

    pub fn registry(&self) -> &'a RequestRegistry {
        self.registry
    }

    /// The model as left by the requests committed so far
    pub fn model(&self) -> &Model {
        &*self.model
    }

    /// Commit a request; one that changed nothing is not kept
    pub fn commit(&mut self, request: Box<dyn Request>) -> TxnResult<()> {
        let mut tracked = TrackedRequest::new(request);
        tracked.commit(self.model)?;
        if !tracked.request().has_effect() {
            debug!(request = %tracked.request().request_type(), "Request changed nothing");
            return Ok(());
        }
        debug!(request = %tracked.request().request_type(), "Committed request");
        self.committed.push(tracked);
        Ok(())
    }

    /// Number of requests committed so far
    pub fn len(&self) -> usize {
        self.committed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.committed.is_empty()
    }

    /// Undo everything committed in this scope, newest first
    pub(crate) fn rollback(mut self) {
        for tracked in self.committed.iter_mut().rev() {
            if let Err(err) = tracked.undo(self.model) {
                warn!(error = %err, "Failed to roll back request");
            }
        }
    }

    pub(crate) fn finish(self) -> Vec<TrackedRequest> {
        self.committed
    }
}

// ============== Manager ==============

/// Executes commands and owns the undo/redo stacks
#[derive(Debug)]
pub struct TransactionManager {
    registry: RequestRegistry,
    undo_stack: Vec<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    history_limit: usize,
    compose: bool,
    /// Undo depth at which the open compose window started
    compose_window: Option<usize>,
    signals: Vec<TxnSignal>,
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new(RequestRegistry::builtin())
    }
}

impl TransactionManager {
    pub fn new(registry: RequestRegistry) -> Self {
        Self {
            registry,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            compose: false,
            compose_window: None,
            signals: Vec::new(),
        }
    }

    pub fn from_config(registry: RequestRegistry, config: &KernelConfig) -> Self {
        Self::new(registry)
            .with_history_limit(config.history_limit)
            .with_compose(config.compose_edits)
    }

    /// Builder-style: keep at most `limit` undo steps (at least one)
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit.max(1);
        self
    }

    /// Builder-style: always merge consecutive edits of the same field
    pub fn with_compose(mut self, compose: bool) -> Self {
        self.compose = compose;
        self
    }

    /// Start merging consecutive edits of the same field, e.g. for a drag
    ///
    /// Steps recorded before the window opened are never merged into.
    pub fn begin_compose(&mut self) {
        self.compose_window = Some(self.undo_stack.len());
    }

    pub fn end_compose(&mut self) {
        self.compose_window = None;
    }

    pub fn is_composing(&self) -> bool {
        self.compose || self.compose_window.is_some()
    }

    pub fn registry(&self) -> &RequestRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut RequestRegistry {
        &mut self.registry
    }

    /// Execute a command as one undo step
    ///
    /// Returns `Ok(false)` when the command committed nothing. On error the
    /// requests committed so far are undone and the history is unchanged.
    pub fn execute(&mut self, model: &mut Model, command: &mut dyn Command) -> TxnResult<bool> {
        let mut scope = TxnScope::new(&self.registry, model);
        if let Err(err) = command.execute(&mut scope) {
            warn!(
                command = command.description(),
                committed = scope.len(),
                error = %err,
                "Command failed, rolling back"
            );
            scope.rollback();
            return Err(err);
        }
        let requests = scope.finish();
        if requests.is_empty() {
            debug!(command = command.description(), "Command committed nothing");
            return Ok(false);
        }

        self.queue_signals(requests.iter(), TxnPhase::Commit);
        let entry = HistoryEntry {
            description: command.description().to_string(),
            category: command.category(),
            requests,
        };
        info!(
            command = %entry.description,
            category = %entry.category,
            requests = entry.requests.len(),
            "Executed command"
        );

        self.redo_stack.clear();
        if let Some(entry) = self.try_compose(entry) {
            self.undo_stack.push(entry);
        }
        if self.undo_stack.len() > self.history_limit {
            let excess = self.undo_stack.len() - self.history_limit;
            self.undo_stack.drain(..excess);
            if let Some(start) = &mut self.compose_window {
                *start = start.saturating_sub(excess);
            }
            debug!(dropped = excess, "Trimmed undo history");
        }
        Ok(true)
    }

    /// Undo the most recent step; `Ok(false)` when there is nothing to undo
    ///
    /// If a request fails to undo, the requests already undone are redone
    /// and the step stays on the undo stack.
    pub fn undo(&mut self, model: &mut Model) -> TxnResult<bool> {
        let Some(mut entry) = self.undo_stack.pop() else {
            return Ok(false);
        };
        let count = entry.requests.len();
        for i in (0..count).rev() {
            if let Err(err) = entry.requests[i].undo(model) {
                warn!(command = %entry.description, error = %err, "Undo failed, restoring step");
                for tracked in &mut entry.requests[i + 1..] {
                    if let Err(redo_err) = tracked.redo(model) {
                        warn!(error = %redo_err, "Failed to restore request");
                    }
                }
                self.undo_stack.push(entry);
                return Err(err);
            }
        }
        if let Some(start) = &mut self.compose_window {
            *start = (*start).min(self.undo_stack.len());
        }
        self.queue_signals(entry.requests.iter().rev(), TxnPhase::Undo);
        info!(command = %entry.description, "Undo");
        self.redo_stack.push(entry);
        Ok(true)
    }

    /// Redo the most recently undone step; `Ok(false)` when there is none
    ///
    /// If a request fails to redo, the requests already redone are undone
    /// and the step stays on the redo stack.
    pub fn redo(&mut self, model: &mut Model) -> TxnResult<bool> {
        let Some(mut entry) = self.redo_stack.pop() else {
            return Ok(false);
        };
        let count = entry.requests.len();
        for i in 0..count {
            if let Err(err) = entry.requests[i].redo(model) {
                warn!(command = %entry.description, error = %err, "Redo failed, restoring step");
                for tracked in entry.requests[..i].iter_mut().rev() {
                    if let Err(undo_err) = tracked.undo(model) {
                        warn!(error = %undo_err, "Failed to restore request");
                    }
                }
                self.redo_stack.push(entry);
                return Err(err);
            }
        }
        self.queue_signals(entry.requests.iter(), TxnPhase::Redo);
        info!(command = %entry.description, "Redo");
        self.undo_stack.push(entry);
        Ok(true)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Undo steps, oldest first
    pub fn history(&self) -> Vec<(&str, LogCategory)> {
        self.undo_stack
            .iter()
            .map(|e| (e.description.as_str(), e.category))
            .collect()
    }

    /// Redo steps, next redo first
    pub fn redo_history(&self) -> Vec<(&str, LogCategory)> {
        self.redo_stack
            .iter()
            .rev()
            .map(|e| (e.description.as_str(), e.category))
            .collect()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.undo_stack
    }

    /// Take the queued entity change signals
    pub fn drain_signals(&mut self) -> Vec<TxnSignal> {
        std::mem::take(&mut self.signals)
    }

    pub fn clear_history(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    /// Merge a single-request step into the previous one when both edit the
    /// same thing; returns the entry if it still has to be pushed
    fn try_compose(&mut self, entry: HistoryEntry) -> Option<HistoryEntry> {
        let floor = match (self.compose, self.compose_window) {
            (true, _) => 0,
            (false, Some(start)) => start,
            (false, None) => return Some(entry),
        };
        if entry.requests.len() != 1 || self.undo_stack.len() <= floor {
            return Some(entry);
        }
        let Some(last) = self.undo_stack.last_mut() else {
            return Some(entry);
        };
        if last.requests.len() != 1 || last.description != entry.description {
            return Some(entry);
        }
        let merged = last.requests[0]
            .request()
            .compose(entry.requests[0].request());
        match merged {
            Some(merged) => {
                debug!(command = %entry.description, "Composed with previous step");
                last.requests = vec![TrackedRequest::committed(merged)];
                None
            }
            None => Some(entry),
        }
    }

    fn queue_signals<'r>(
        &mut self,
        requests: impl Iterator<Item = &'r TrackedRequest>,
        phase: TxnPhase,
    ) {
        for tracked in requests {
            self.signals.extend(
                tracked
                    .request()
                    .entity_changes()
                    .into_iter()
                    .map(|(entity, change)| TxnSignal {
                        entity,
                        change,
                        phase,
                    }),
            );
        }
    }
}
