//! Field requests
//!
//! [`DataRequest`] writes one field through the generic field setter.
//! [`CompositeRequest`] runs child requests as one unit.

use std::any::Any;

use tracing::{debug, warn};

use super::{boxed, malformed};
use crate::entity::{EntityId, FieldRef, FieldValue};
use crate::model::Model;
use crate::txn::error::TxnResult;
use crate::txn::registry::RequestRegistry;
use crate::txn::request::{Request, RequestData, RequestType};
use crate::txn_type::EntityTransactionType;

/// Sets one field of one entity
#[derive(Debug, Clone, PartialEq)]
pub struct DataRequest {
    target: FieldRef,
    before: Option<FieldValue>,
    after: FieldValue,
    request_type: RequestType,
}

impl DataRequest {
    /// Before-state is captured from the model on commit
    pub fn new(target: FieldRef, after: FieldValue) -> Self {
        Self {
            target,
            before: None,
            after,
            request_type: RequestType::SetField,
        }
    }

    /// Supply the before-state explicitly
    pub fn with_before(mut self, before: FieldValue) -> Self {
        self.before = Some(before);
        self
    }

    pub(crate) fn with_type(mut self, request_type: RequestType) -> Self {
        self.request_type = request_type;
        self
    }

    pub fn target(&self) -> FieldRef {
        self.target
    }

    pub fn before(&self) -> Option<&FieldValue> {
        self.before.as_ref()
    }

    pub fn after(&self) -> &FieldValue {
        &self.after
    }

    fn apply(&self, model: &mut Model, value: &FieldValue) -> TxnResult<()> {
        if !model.set_field(self.target, value.clone())? {
            debug!(target = %self.target, "Entity gone, field write skipped");
        }
        Ok(())
    }
}

impl Request for DataRequest {
    fn request_type(&self) -> RequestType {
        self.request_type
    }

    fn touched_fields(&self, _model: &Model) -> Vec<FieldRef> {
        vec![self.target]
    }

    fn entity_changes(&self) -> Vec<(EntityId, EntityTransactionType)> {
        vec![(self.target.entity, EntityTransactionType::Modification)]
    }

    fn on_commit(&mut self, model: &mut Model) -> TxnResult<()> {
        if self.before.is_none() {
            self.before = model.field(self.target)?;
        }
        if self.before.is_none() {
            debug!(target = %self.target, "Entity gone, commit skipped");
            return Ok(());
        }
        self.apply(model, &self.after)
    }

    fn on_undo(&mut self, model: &mut Model) -> TxnResult<()> {
        match &self.before {
            Some(before) => self.apply(model, before),
            None => {
                if cfg!(debug_assertions) {
                    warn!(target = %self.target, "No before-state to restore");
                }
                Ok(())
            }
        }
    }

    fn on_redo(&mut self, model: &mut Model) -> TxnResult<()> {
        if self.before.is_none() {
            return Ok(());
        }
        self.apply(model, &self.after)
    }

    fn has_effect(&self) -> bool {
        self.before.is_some()
    }

    fn compose(&self, next: &dyn Request) -> Option<Box<dyn Request>> {
        let next = next.as_any().downcast_ref::<DataRequest>()?;
        if next.target != self.target || next.request_type != self.request_type {
            return None;
        }
        Some(Box::new(DataRequest {
            target: self.target,
            before: self.before.clone(),
            after: next.after.clone(),
            request_type: self.request_type,
        }))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Ordered child requests committed as one unit
///
/// Children commit forward and undo in reverse. If a child fails to commit,
/// the children already committed are undone before the error is returned.
#[derive(Debug, Default)]
pub struct CompositeRequest {
    children: Vec<Box<dyn Request>>,
}

impl CompositeRequest {
    pub fn new(children: Vec<Box<dyn Request>>) -> Self {
        Self { children }
    }

    pub fn push(&mut self, child: Box<dyn Request>) {
        self.children.push(child);
    }

    pub fn children(&self) -> &[Box<dyn Request>] {
        &self.children
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl Request for CompositeRequest {
    fn request_type(&self) -> RequestType {
        RequestType::Composite
    }

    fn touched_fields(&self, model: &Model) -> Vec<FieldRef> {
        self.children
            .iter()
            .flat_map(|c| c.touched_fields(model))
            .collect()
    }

    fn entity_changes(&self) -> Vec<(EntityId, EntityTransactionType)> {
        self.children.iter().flat_map(|c| c.entity_changes()).collect()
    }

    fn on_commit(&mut self, model: &mut Model) -> TxnResult<()> {
        for i in 0..self.children.len() {
            if let Err(err) = self.children[i].on_commit(model) {
                for child in self.children[..i].iter_mut().rev() {
                    if let Err(undo_err) = child.on_undo(model) {
                        warn!(error = %undo_err, "Failed to roll back composite child");
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }

    fn on_undo(&mut self, model: &mut Model) -> TxnResult<()> {
        for child in self.children.iter_mut().rev() {
            child.on_undo(model)?;
        }
        Ok(())
    }

    fn on_redo(&mut self, model: &mut Model) -> TxnResult<()> {
        for child in &mut self.children {
            child.on_redo(model)?;
        }
        Ok(())
    }

    fn has_effect(&self) -> bool {
        self.children.iter().any(|c| c.has_effect())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub(super) fn create_set_field(
    _registry: &RequestRegistry,
    request_type: RequestType,
    data: RequestData,
) -> TxnResult<Box<dyn Request>> {
    match data {
        RequestData::SetField { target, value } => {
            boxed(DataRequest::new(target, value).with_type(request_type))
        }
        _ => Err(malformed(request_type, "SetField { target, value }")),
    }
}

pub(super) fn create_composite(
    registry: &RequestRegistry,
    request_type: RequestType,
    data: RequestData,
) -> TxnResult<Box<dyn Request>> {
    match data {
        RequestData::Composite(children) => {
            let children = children
                .into_iter()
                .map(|(ty, child)| registry.create_request(ty, child))
                .collect::<TxnResult<Vec<_>>>()?;
            boxed(CompositeRequest::new(children))
        }
        _ => Err(malformed(request_type, "Composite([(type, data)])")),
    }
}
