//! Content renaming

use std::any::Any;

use super::data::DataRequest;
use super::{boxed, malformed};
use crate::entity::{EntityId, FieldName, FieldRef, FieldValue};
use crate::model::Model;
use crate::txn::error::TxnResult;
use crate::txn::registry::RequestRegistry;
use crate::txn::request::{Request, RequestData, RequestType};
use crate::txn_type::EntityTransactionType;

/// Change the display name of a content object
#[derive(Debug, Clone, PartialEq)]
pub struct RenameContentRequest {
    inner: DataRequest,
}

impl RenameContentRequest {
    pub fn new(entity: EntityId, name: impl Into<String>) -> Self {
        Self {
            inner: DataRequest::new(
                FieldRef::new(entity, FieldName::DisplayName),
                FieldValue::Text(name.into()),
            )
            .with_type(RequestType::RenameContent),
        }
    }

    pub fn entity(&self) -> EntityId {
        self.inner.target().entity
    }
}

impl Request for RenameContentRequest {
    fn request_type(&self) -> RequestType {
        RequestType::RenameContent
    }

    fn touched_fields(&self, model: &Model) -> Vec<FieldRef> {
        self.inner.touched_fields(model)
    }

    fn entity_changes(&self) -> Vec<(EntityId, EntityTransactionType)> {
        self.inner.entity_changes()
    }

    fn on_commit(&mut self, model: &mut Model) -> TxnResult<()> {
        self.inner.on_commit(model)
    }

    fn on_undo(&mut self, model: &mut Model) -> TxnResult<()> {
        self.inner.on_undo(model)
    }

    fn on_redo(&mut self, model: &mut Model) -> TxnResult<()> {
        self.inner.on_redo(model)
    }

    fn has_effect(&self) -> bool {
        self.inner.has_effect()
    }

    fn compose(&self, next: &dyn Request) -> Option<Box<dyn Request>> {
        let next = next.as_any().downcast_ref::<RenameContentRequest>()?;
        let merged = self.inner.compose(&next.inner)?;
        let inner = merged.as_any().downcast_ref::<DataRequest>()?.clone();
        Some(Box::new(RenameContentRequest { inner }))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub(super) fn create(
    _registry: &RequestRegistry,
    request_type: RequestType,
    data: RequestData,
) -> TxnResult<Box<dyn Request>> {
    match data {
        RequestData::Rename { entity, name } => boxed(RenameContentRequest::new(entity, name)),
        _ => Err(malformed(request_type, "Rename { entity, name }")),
    }
}
