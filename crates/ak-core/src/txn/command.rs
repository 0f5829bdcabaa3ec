//! Commands
//!
//! A command turns a user action into requests and commits them as one
//! history step. Before anything is committed, every field a request will
//! write is offered to the owning entity and to the command's own gate; a
//! single refusal abandons the whole command.

use std::fmt;

use ak_sketch::Loop;
use glam::DVec2;

use super::capability::{EditCapability, LogCategory};
use super::error::{TxnError, TxnResult};
use super::manager::TxnScope;
use super::registry::RequestRegistry;
use super::request::{Request, RequestData, SketchOp};
use super::requests::RoofRelation;
use crate::config::SlabConfig;
use crate::entity::{Entity, EntityId, FieldName, FieldRef, FieldValue};
use crate::model::{Model, SketchTarget};

/// Extra per-command veto on field writes
pub type FieldGate = Box<dyn Fn(&FieldRef, &Model) -> bool>;

/// A named, loggable group of requests
pub trait Command: fmt::Debug {
    fn description(&self) -> &str;

    fn category(&self) -> LogCategory;

    /// Whether this command may write `field`
    fn can_transact_field(&self, _field: &FieldRef, _model: &Model) -> bool {
        true
    }

    /// Build the requests of this command against the current model
    fn create_requests(
        &mut self,
        registry: &RequestRegistry,
        model: &Model,
    ) -> TxnResult<Vec<Box<dyn Request>>>;

    /// Build, validate and commit the requests of this command
    fn execute(&mut self, scope: &mut TxnScope<'_>) -> TxnResult<()> {
        let requests = self.create_requests(scope.registry(), scope.model())?;
        check_fields(&*self, &requests, scope.model())?;
        for request in requests {
            scope.commit(request)?;
        }
        Ok(())
    }
}

/// Offer every field the requests will write to its entity and the command
pub(crate) fn check_fields<C: Command + ?Sized>(
    command: &C,
    requests: &[Box<dyn Request>],
    model: &Model,
) -> TxnResult<()> {
    for request in requests {
        for field in request.touched_fields(model) {
            let entity_allows = model
                .entity(field.entity)
                .is_none_or(|e| e.can_transact_field(field.field));
            if !entity_allows || !command.can_transact_field(&field, model) {
                return Err(TxnError::Rejected(field));
            }
        }
    }
    Ok(())
}

// ============== Edit Command ==============

/// Command building one request described by an [`EditCapability`]
pub struct EditCommand {
    capability: EditCapability,
    data: RequestData,
    gate: Option<FieldGate>,
}

impl fmt::Debug for EditCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditCommand")
            .field("capability", &self.capability)
            .field("data", &self.data)
            .field("gated", &self.gate.is_some())
            .finish()
    }
}

impl EditCommand {
    pub fn new(capability: EditCapability, data: RequestData) -> Self {
        Self {
            capability,
            data,
            gate: None,
        }
    }

    /// Builder-style: veto field writes with `gate`
    pub fn with_gate(mut self, gate: impl Fn(&FieldRef, &Model) -> bool + 'static) -> Self {
        self.gate = Some(Box::new(gate));
        self
    }

    pub fn capability(&self) -> &EditCapability {
        &self.capability
    }

    pub fn set_field(target: FieldRef, value: FieldValue) -> Self {
        Self::new(EditCapability::SET_FIELD, RequestData::SetField { target, value })
    }

    pub fn rename(entity: EntityId, name: impl Into<String>) -> Self {
        Self::new(
            EditCapability::RENAME_CONTENT,
            RequestData::Rename {
                entity,
                name: name.into(),
            },
        )
    }

    /// Thickness change refused outside the configured limits
    pub fn slab_thickness(slab: EntityId, thickness: f64, limits: SlabConfig) -> Self {
        Self::new(
            EditCapability::SLAB_THICKNESS,
            RequestData::SlabThickness { slab, thickness },
        )
        .with_gate(move |field, _| field.field != FieldName::Thickness || limits.accepts(thickness))
    }

    pub fn draw_polygons(target: SketchTarget, polygons: Vec<Loop>) -> Self {
        Self::new(
            EditCapability::sketch(target.builder_kind(), SketchOp::Draw),
            RequestData::DrawPolygons {
                layer: target.layer(),
                polygons,
            },
        )
    }

    pub fn move_point(target: SketchTarget, from: DVec2, to: DVec2) -> Self {
        Self::new(
            EditCapability::sketch(target.builder_kind(), SketchOp::MovePoint),
            RequestData::MovePoint {
                layer: target.layer(),
                from,
                to,
                filter: None,
            },
        )
    }

    pub fn move_curve(target: SketchTarget, start: DVec2, end: DVec2, offset: DVec2) -> Self {
        Self::new(
            EditCapability::sketch(target.builder_kind(), SketchOp::MoveCurve),
            RequestData::MoveCurve {
                layer: target.layer(),
                start,
                end,
                offset,
                filter: None,
            },
        )
    }

    pub fn update_roof_relations(relations: Vec<RoofRelation>) -> Self {
        Self::new(
            EditCapability::ROOF_RELATION,
            RequestData::RoofRelations(relations),
        )
    }

    pub fn move_wall_point(wall: EntityId, from: DVec2, to: DVec2) -> Self {
        Self::new(
            EditCapability::WALL_POINT,
            RequestData::WallPoint { wall, from, to },
        )
    }

    pub fn create_entity(entity: Entity) -> Self {
        Self::new(EditCapability::CREATE_ENTITY, RequestData::Entity(entity))
    }

    pub fn delete_entity(id: EntityId) -> Self {
        Self::new(EditCapability::DELETE_ENTITY, RequestData::EntityRef(id))
    }

    pub fn recycle_entity(id: EntityId) -> Self {
        Self::new(EditCapability::RECYCLE_ENTITY, RequestData::EntityRef(id))
    }

    pub fn restore_entity(id: EntityId) -> Self {
        Self::new(EditCapability::RESTORE_ENTITY, RequestData::EntityRef(id))
    }
}

impl Command for EditCommand {
    fn description(&self) -> &str {
        self.capability.description
    }

    fn category(&self) -> LogCategory {
        self.capability.category
    }

    fn can_transact_field(&self, field: &FieldRef, model: &Model) -> bool {
        self.gate.as_ref().is_none_or(|gate| gate(field, model))
    }

    fn create_requests(
        &mut self,
        registry: &RequestRegistry,
        _model: &Model,
    ) -> TxnResult<Vec<Box<dyn Request>>> {
        let mut data = self.data.clone();
        if let Some(role) = self.capability.topo_filter {
            data = data.with_filter(role);
        }
        Ok(vec![registry.create_request(self.capability.request_type, data)?])
    }
}

// ============== Grouping ==============

/// Children built against the same state and committed together
///
/// Every child's requests are validated before the first one is committed.
#[derive(Debug)]
pub struct CompositeCommand {
    description: String,
    category: LogCategory,
    children: Vec<Box<dyn Command>>,
}

impl CompositeCommand {
    pub fn new(description: impl Into<String>, category: LogCategory) -> Self {
        Self {
            description: description.into(),
            category,
            children: Vec::new(),
        }
    }

    /// Builder-style: append a child
    pub fn with(mut self, child: impl Command + 'static) -> Self {
        self.children.push(Box::new(child));
        self
    }

    pub fn push(&mut self, child: Box<dyn Command>) {
        self.children.push(child);
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl Command for CompositeCommand {
    fn description(&self) -> &str {
        &self.description
    }

    fn category(&self) -> LogCategory {
        self.category
    }

    fn create_requests(
        &mut self,
        registry: &RequestRegistry,
        model: &Model,
    ) -> TxnResult<Vec<Box<dyn Request>>> {
        let mut requests = Vec::new();
        for child in &mut self.children {
            requests.extend(child.create_requests(registry, model)?);
        }
        Ok(requests)
    }

    fn execute(&mut self, scope: &mut TxnScope<'_>) -> TxnResult<()> {
        let mut batch = Vec::new();
        for child in &mut self.children {
            let requests = child.create_requests(scope.registry(), scope.model())?;
            check_fields(child.as_ref(), &requests, scope.model())?;
            batch.extend(requests);
        }
        for request in batch {
            scope.commit(request)?;
        }
        Ok(())
    }
}

/// Children executed in order, each against the state left by the previous
#[derive(Debug)]
pub struct SequenceCommand {
    description: String,
    category: LogCategory,
    children: Vec<Box<dyn Command>>,
}

impl SequenceCommand {
    pub fn new(description: impl Into<String>, category: LogCategory) -> Self {
        Self {
            description: description.into(),
            category,
            children: Vec::new(),
        }
    }

    /// Builder-style: append a child
    pub fn then(mut self, child: impl Command + 'static) -> Self {
        self.children.push(Box::new(child));
        self
    }

    pub fn push(&mut self, child: Box<dyn Command>) {
        self.children.push(child);
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl Command for SequenceCommand {
    fn description(&self) -> &str {
        &self.description
    }

    fn category(&self) -> LogCategory {
        self.category
    }

    /// Requests of every child built against `model`; `execute` rebuilds
    /// each child after its predecessors are committed
    fn create_requests(
        &mut self,
        registry: &RequestRegistry,
        model: &Model,
    ) -> TxnResult<Vec<Box<dyn Request>>> {
        let mut requests = Vec::new();
        for child in &mut self.children {
            requests.extend(child.create_requests(registry, model)?);
        }
        Ok(requests)
    }

    fn execute(&mut self, scope: &mut TxnScope<'_>) -> TxnResult<()> {
        for child in &mut self.children {
            child.execute(scope)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityData;
    use crate::model::ModelBuilder;
    use crate::txn::request::RequestType;
    use ak_sketch::TopoRole;
    use glam::DVec3;

    fn content_model() -> (Model, EntityId) {
        let mut builder = ModelBuilder::new();
        let sofa = builder.add_entity(Entity::content("Sofa", DVec3::ZERO, DVec3::ONE));
        (builder.build(), sofa)
    }

    #[test]
    fn test_labels_are_pure() {
        let command = EditCommand::rename(EntityId::new(), "Sofa-2");
        assert_eq!(command.description(), "模型重命名");
        assert_eq!(command.category(), LogCategory::ContentOperation);
        assert_eq!(command.description(), command.description());

        let layer = crate::layer::LayerId::new();
        let draw = EditCommand::draw_polygons(SketchTarget::RoofsDrawing(layer), Vec::new());
        assert_eq!(draw.category(), LogCategory::RoofsDrawing);
        assert_eq!(draw.capability().request_type, RequestType::DrawRoofRegions);
    }

    #[test]
    fn test_capability_filter_is_applied() {
        let (model, _) = content_model();
        let registry = RequestRegistry::builtin();
        let mut command =
            EditCommand::move_point(SketchTarget::OutdoorDrawing, DVec2::ZERO, DVec2::ONE);

        let requests = command.create_requests(&registry, &model).unwrap();
        let request = requests[0]
            .as_any()
            .downcast_ref::<crate::txn::requests::SketchEditRequest>()
            .unwrap();
        assert_eq!(request.filter(), Some(TopoRole::Face));
    }

    #[test]
    fn test_locked_entity_rejects() {
        let mut builder = ModelBuilder::new();
        let sofa = builder.add_entity(
            Entity::content("Sofa", DVec3::ZERO, DVec3::ONE).locked(true),
        );
        let model = builder.build();
        let registry = RequestRegistry::builtin();

        let mut command = EditCommand::rename(sofa, "Sofa-2");
        let requests = command.create_requests(&registry, &model).unwrap();
        assert_eq!(
            check_fields(&command, &requests, &model),
            Err(TxnError::Rejected(FieldRef::new(sofa, FieldName::DisplayName)))
        );

        let mut unlock = EditCommand::set_field(
            FieldRef::new(sofa, FieldName::Locked),
            FieldValue::Bool(false),
        );
        let requests = unlock.create_requests(&registry, &model).unwrap();
        assert!(check_fields(&unlock, &requests, &model).is_ok());
    }

    #[test]
    fn test_slab_gate() {
        let mut builder = ModelBuilder::new();
        let layer = builder.add_layer("1F", 0.0, 3000.0);
        let slab = builder
            .add_slab(
                layer,
                120.0,
                vec![DVec2::ZERO, DVec2::X, DVec2::ONE, DVec2::Y],
            )
            .unwrap();
        let model = builder.build();
        assert!(matches!(
            model.entity(slab).map(Entity::data),
            Some(EntityData::Slab { .. })
        ));

        let registry = RequestRegistry::builtin();
        let limits = SlabConfig::default();

        let mut too_thick = EditCommand::slab_thickness(slab, 5000.0, limits);
        let requests = too_thick.create_requests(&registry, &model).unwrap();
        assert_eq!(
            check_fields(&too_thick, &requests, &model),
            Err(TxnError::Rejected(FieldRef::new(slab, FieldName::Thickness)))
        );

        let mut fine = EditCommand::slab_thickness(slab, 200.0, limits);
        let requests = fine.create_requests(&registry, &model).unwrap();
        assert!(check_fields(&fine, &requests, &model).is_ok());
    }

    #[test]
    fn test_custom_gate() {
        let (model, sofa) = content_model();
        let command = EditCommand::rename(sofa, "Chair").with_gate(|field, _| {
            field.field != FieldName::DisplayName
        });
        assert!(!command.can_transact_field(&FieldRef::new(sofa, FieldName::DisplayName), &model));
        assert!(command.can_transact_field(&FieldRef::new(sofa, FieldName::Position), &model));
    }
}
