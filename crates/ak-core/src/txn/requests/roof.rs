//! Roof and drawing region links
//!
//! A roof and its drawing region point at each other (`Roof::drawing_region`
//! and `RoofDrawingRegion::roof_id`). Rebinding either side clears the link
//! the other side held before, so the pair never goes out of sync.

use std::any::Any;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::data::{CompositeRequest, DataRequest};
use super::{boxed, malformed};
use crate::entity::{EntityData, EntityId, FieldName, FieldRef, FieldValue};
use crate::model::Model;
use crate::txn::error::TxnResult;
use crate::txn::registry::RequestRegistry;
use crate::txn::request::{Request, RequestData, RequestType};
use crate::txn_type::EntityTransactionType;

/// Bind a drawing region to a roof, or clear its binding with `roof: None`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoofRelation {
    pub roof: Option<EntityId>,
    pub drawing_region: EntityId,
}

impl RoofRelation {
    pub fn bind(roof: EntityId, drawing_region: EntityId) -> Self {
        Self {
            roof: Some(roof),
            drawing_region,
        }
    }

    pub fn clear(drawing_region: EntityId) -> Self {
        Self {
            roof: None,
            drawing_region,
        }
    }

    /// Field writes that apply this relation to `model`
    fn plan(&self, model: &Model) -> Vec<DataRequest> {
        let region = self.drawing_region;
        let current_roof = match model.entity(region).map(|e| e.data()) {
            Some(EntityData::RoofDrawingRegion { roof_id, .. }) => *roof_id,
            Some(_) => {
                warn!(entity = %region, "Not a roof drawing region, relation skipped");
                return Vec::new();
            }
            None => {
                debug!(entity = %region, "Drawing region gone, relation skipped");
                return Vec::new();
            }
        };
        if current_roof == self.roof {
            return Vec::new();
        }

        let write = |entity, field, value| {
            DataRequest::new(FieldRef::new(entity, field), FieldValue::Id(value))
                .with_type(RequestType::UpdateRoofRelation)
        };
        let mut writes = Vec::new();

        if let Some(old_roof) = current_roof {
            if roof_region(model, old_roof) == Some(Some(region)) {
                writes.push(write(old_roof, FieldName::DrawingRegion, None));
            }
        }
        if let Some(roof) = self.roof {
            match roof_region(model, roof) {
                Some(previous) => {
                    if let Some(previous) = previous.filter(|p| *p != region) {
                        if model.contains(previous) {
                            writes.push(write(previous, FieldName::RoofId, None));
                        }
                    }
                    writes.push(write(roof, FieldName::DrawingRegion, Some(region)));
                }
                None => {
                    debug!(entity = %roof, "Roof gone, relation skipped");
                    return Vec::new();
                }
            }
        }
        writes.push(write(region, FieldName::RoofId, self.roof));
        writes
    }
}

/// Drawing region currently linked from a roof; `None` when not a live roof
fn roof_region(model: &Model, roof: EntityId) -> Option<Option<EntityId>> {
    match model.entity(roof).map(|e| e.data()) {
        Some(EntityData::Roof { drawing_region, .. }) => Some(*drawing_region),
        _ => None,
    }
}

/// Bind or clear roof / drawing region links
#[derive(Debug)]
pub struct UpdateRoofRelationRequest {
    relations: Vec<RoofRelation>,
    writes: CompositeRequest,
}

impl UpdateRoofRelationRequest {
    pub fn new(relations: Vec<RoofRelation>) -> Self {
        Self {
            relations,
            writes: CompositeRequest::default(),
        }
    }

    pub fn relations(&self) -> &[RoofRelation] {
        &self.relations
    }
}

impl Request for UpdateRoofRelationRequest {
    fn request_type(&self) -> RequestType {
        RequestType::UpdateRoofRelation
    }

    fn touched_fields(&self, model: &Model) -> Vec<FieldRef> {
        self.relations
            .iter()
            .flat_map(|r| r.plan(model))
            .map(|w| w.target())
            .collect()
    }

    fn entity_changes(&self) -> Vec<(EntityId, EntityTransactionType)> {
        self.writes.entity_changes()
    }

    fn on_commit(&mut self, model: &mut Model) -> TxnResult<()> {
        // Each relation is planned against the state left by the previous one
        let mut writes = CompositeRequest::default();
        for relation in &self.relations {
            for mut write in relation.plan(model) {
                if let Err(err) = write.on_commit(model) {
                    writes.on_undo(model)?;
                    return Err(err);
                }
                writes.push(Box::new(write));
            }
        }
        self.writes = writes;
        Ok(())
    }

    fn on_undo(&mut self, model: &mut Model) -> TxnResult<()> {
        self.writes.on_undo(model)
    }

    fn on_redo(&mut self, model: &mut Model) -> TxnResult<()> {
        self.writes.on_redo(model)
    }

    fn has_effect(&self) -> bool {
        self.writes.has_effect()
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
        RequestData::RoofRelations(relations) => boxed(UpdateRoofRelationRequest::new(relations)),
        _ => Err(malformed(request_type, "RoofRelations([relation])")),
    }
}
