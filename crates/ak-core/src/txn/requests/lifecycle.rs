//! Entity creation, deletion and the recycle bin
//!
//! Removal keeps the entity's former index so undo puts it back in the same
//! place in the model's insertion order.

use std::any::Any;

use tracing::debug;

use super::{boxed, malformed};
use crate::entity::{Entity, EntityId};
use crate::model::Model;
use crate::txn::error::TxnResult;
use crate::txn::registry::RequestRegistry;
use crate::txn::request::{Request, RequestData, RequestType};
use crate::txn_type::EntityTransactionType;

/// What an [`EntityLifecycleRequest`] does to its entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleAction {
    Create,
    Delete,
    Recycle,
    Restore,
}

impl LifecycleAction {
    pub fn request_type(self) -> RequestType {
        match self {
            LifecycleAction::Create => RequestType::CreateEntity,
            LifecycleAction::Delete => RequestType::DeleteEntity,
            LifecycleAction::Recycle => RequestType::RecycleEntity,
            LifecycleAction::Restore => RequestType::RestoreEntity,
        }
    }

    pub fn transaction_type(self) -> EntityTransactionType {
        match self {
            LifecycleAction::Create => EntityTransactionType::Creation,
            LifecycleAction::Delete => EntityTransactionType::Deletion,
            LifecycleAction::Recycle => EntityTransactionType::Recycling,
            LifecycleAction::Restore => EntityTransactionType::Modification,
        }
    }
}

/// Create, delete, recycle or restore one entity
#[derive(Debug, Clone)]
pub struct EntityLifecycleRequest {
    action: LifecycleAction,
    id: EntityId,
    /// Entity to insert (create) or the removed entity (delete)
    snapshot: Option<Entity>,
    /// Index in the live set before removal
    index: Option<usize>,
    /// Whether the last commit changed the model
    applied: bool,
}

impl EntityLifecycleRequest {
    pub fn create(entity: Entity) -> Self {
        Self {
            action: LifecycleAction::Create,
            id: entity.id(),
            snapshot: Some(entity),
            index: None,
            applied: false,
        }
    }

    pub fn delete(id: EntityId) -> Self {
        Self::targeting(LifecycleAction::Delete, id)
    }

    pub fn recycle(id: EntityId) -> Self {
        Self::targeting(LifecycleAction::Recycle, id)
    }

    pub fn restore(id: EntityId) -> Self {
        Self::targeting(LifecycleAction::Restore, id)
    }

    fn targeting(action: LifecycleAction, id: EntityId) -> Self {
        Self {
            action,
            id,
            snapshot: None,
            index: None,
            applied: false,
        }
    }

    pub fn action(&self) -> LifecycleAction {
        self.action
    }

    pub fn entity(&self) -> EntityId {
        self.id
    }

    fn forward(&mut self, model: &mut Model) {
        self.applied = match self.action {
            LifecycleAction::Create => match &self.snapshot {
                Some(entity) if !model.contains(self.id) => {
                    model.insert_entity(entity.clone());
                    true
                }
                _ => false,
            },
            LifecycleAction::Delete => match model.remove_entity(self.id) {
                Some((index, entity)) => {
                    self.index = Some(index);
                    self.snapshot = Some(entity);
                    true
                }
                None => false,
            },
            LifecycleAction::Recycle => match model.recycle_entity(self.id) {
                Some(index) => {
                    self.index = Some(index);
                    true
                }
                None => false,
            },
            LifecycleAction::Restore => {
                if model.is_recycled(self.id) {
                    // Restored entities go back where they were recycled from
                    model.restore_entity(self.id, self.index)
                } else {
                    false
                }
            }
        };
        if !self.applied {
            debug!(
                entity = %self.id,
                action = ?self.action,
                "Entity in unexpected state, lifecycle change skipped"
            );
        }
    }

    fn backward(&mut self, model: &mut Model) {
        if !self.applied {
            return;
        }
        match self.action {
            LifecycleAction::Create => {
                model.remove_entity(self.id);
            }
            LifecycleAction::Delete => {
                if let Some(entity) = &self.snapshot {
                    model.insert_entity_at(self.index.unwrap_or(usize::MAX), entity.clone());
                }
            }
            LifecycleAction::Recycle => {
                model.restore_entity(self.id, self.index);
            }
            LifecycleAction::Restore => {
                self.index = model.recycle_entity(self.id);
            }
        }
    }
}

impl Request for EntityLifecycleRequest {
    fn request_type(&self) -> RequestType {
        self.action.request_type()
    }

    fn entity_changes(&self) -> Vec<(EntityId, EntityTransactionType)> {
        if self.applied {
            vec![(self.id, self.action.transaction_type())]
        } else {
            Vec::new()
        }
    }

    fn on_commit(&mut self, model: &mut Model) -> TxnResult<()> {
        self.forward(model);
        Ok(())
    }

    fn on_undo(&mut self, model: &mut Model) -> TxnResult<()> {
        self.backward(model);
        Ok(())
    }

    fn on_redo(&mut self, model: &mut Model) -> TxnResult<()> {
        if self.applied {
            self.forward(model);
        }
        Ok(())
    }

    fn has_effect(&self) -> bool {
        self.applied
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
    match (request_type, data) {
        (RequestType::CreateEntity, RequestData::Entity(entity)) => {
            boxed(EntityLifecycleRequest::create(entity))
        }
        (RequestType::DeleteEntity, RequestData::EntityRef(id)) => {
            boxed(EntityLifecycleRequest::delete(id))
        }
        (RequestType::RecycleEntity, RequestData::EntityRef(id)) => {
            boxed(EntityLifecycleRequest::recycle(id))
        }
        (RequestType::RestoreEntity, RequestData::EntityRef(id)) => {
            boxed(EntityLifecycleRequest::restore(id))
        }
        (RequestType::CreateEntity, _) => Err(malformed(request_type, "Entity(entity)")),
        _ => Err(malformed(request_type, "EntityRef(id)")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelBuilder;
    use glam::DVec3;

    fn two_contents() -> (Model, EntityId, EntityId) {
        let mut builder = ModelBuilder::new();
        let a = builder.add_entity(Entity::content("A", DVec3::ZERO, DVec3::ONE));
        let b = builder.add_entity(Entity::content("B", DVec3::ZERO, DVec3::ONE));
        (builder.build(), a, b)
    }

    #[test]
    fn test_create_undo_redo() {
        let (mut model, _, _) = two_contents();
        let original = model.clone();
        let lamp = Entity::content("Lamp", DVec3::ZERO, DVec3::ONE);
        let id = lamp.id();
        let mut request = EntityLifecycleRequest::create(lamp);

        request.on_commit(&mut model).unwrap();
        assert!(model.contains(id));
        assert_eq!(
            request.entity_changes(),
            vec![(id, EntityTransactionType::Creation)]
        );
        let committed = model.clone();

        request.on_undo(&mut model).unwrap();
        assert_eq!(model, original);
        request.on_redo(&mut model).unwrap();
        assert_eq!(model, committed);
    }

    #[test]
    fn test_delete_restores_position() {
        let (mut model, a, b) = two_contents();
        let original = model.clone();
        let mut request = EntityLifecycleRequest::delete(a);

        request.on_commit(&mut model).unwrap();
        assert!(!model.contains(a));
        assert!(!model.is_recycled(a));
        assert!(request.request_type().description().contains("删除"));

        request.on_undo(&mut model).unwrap();
        assert_eq!(model, original);
        assert_eq!(model.entity_index(a), Some(0));
        assert_eq!(model.entity_index(b), Some(1));
    }

    #[test]
    fn test_recycle_and_restore() {
        let (mut model, a, _) = two_contents();
        let original = model.clone();

        let mut recycle = EntityLifecycleRequest::recycle(a);
        recycle.on_commit(&mut model).unwrap();
        assert!(model.is_recycled(a));
        assert_eq!(
            recycle.entity_changes(),
            vec![(a, EntityTransactionType::Recycling)]
        );
        let recycled = model.clone();

        let mut restore = EntityLifecycleRequest::restore(a);
        restore.on_commit(&mut model).unwrap();
        assert!(model.contains(a));

        restore.on_undo(&mut model).unwrap();
        assert_eq!(model, recycled);
        recycle.on_undo(&mut model).unwrap();
        assert_eq!(model, original);
    }

    #[test]
    fn test_stale_reference_is_noop() {
        let (mut model, _, _) = two_contents();
        let original = model.clone();
        let mut request = EntityLifecycleRequest::recycle(EntityId::new());

        request.on_commit(&mut model).unwrap();
        assert!(request.entity_changes().is_empty());
        request.on_undo(&mut model).unwrap();
        request.on_redo(&mut model).unwrap();
        assert_eq!(model, original);
    }
}
