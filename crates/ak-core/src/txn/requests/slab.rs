//! Slab thickness
//!
//! The top of a slab is the supporting surface of its layer sketch, so a
//! thickness change moves that surface and refreshes the sketch's base info.

use std::any::Any;

use ak_sketch::SupportingSurface;
use tracing::debug;

use super::{boxed, malformed};
use crate::entity::{EntityData, EntityId, EntityKind, FieldName, FieldRef, FieldValue};
use crate::error::ModelError;
use crate::model::{Model, SketchTarget};
use crate::txn::error::TxnResult;
use crate::txn::registry::RequestRegistry;
use crate::txn::request::{Request, RequestData, RequestType};
use crate::txn_type::EntityTransactionType;

/// Change the thickness of a slab
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeSlabThicknessRequest {
    slab: EntityId,
    before: Option<f64>,
    after: f64,
}

impl ChangeSlabThicknessRequest {
    pub fn new(slab: EntityId, thickness: f64) -> Self {
        Self {
            slab,
            before: None,
            after: thickness,
        }
    }

    pub fn slab(&self) -> EntityId {
        self.slab
    }

    pub fn thickness(&self) -> f64 {
        self.after
    }

    fn target(&self) -> FieldRef {
        FieldRef::new(self.slab, FieldName::Thickness)
    }

    fn apply(&self, model: &mut Model, thickness: f64) -> TxnResult<()> {
        let Some(entity) = model.entity(self.slab) else {
            debug!(slab = %self.slab, "Slab gone, thickness change skipped");
            return Ok(());
        };
        let EntityData::Slab { layer, .. } = *entity.data() else {
            return Err(ModelError::KindMismatch {
                id: self.slab,
                expected: EntityKind::Slab,
                actual: entity.kind(),
            }
            .into());
        };
        // Nothing is written unless the whole change can be applied
        let Some(elevation) = model.layer(layer).map(|l| l.elevation) else {
            return Err(ModelError::LayerNotFound(layer).into());
        };

        if let Some(entity) = model.entity_mut(self.slab) {
            entity.set_field(FieldName::Thickness, FieldValue::Float(thickness))?;
            entity.set_slab_bottom(elevation);
        }
        if let Some(sketch) = model.sketch_mut(SketchTarget::LayerSlab(layer)) {
            sketch.set_surface(SupportingSurface::horizontal(elevation + thickness));
        }
        if let Some(mut builder) = model.builder(SketchTarget::LayerSlab(layer)) {
            builder.update_layer();
        }
        Ok(())
    }
}

impl Request for ChangeSlabThicknessRequest {
    fn request_type(&self) -> RequestType {
        RequestType::ChangeSlabThickness
    }

    fn touched_fields(&self, _model: &Model) -> Vec<FieldRef> {
        vec![self.target()]
    }

    fn entity_changes(&self) -> Vec<(EntityId, EntityTransactionType)> {
        vec![(self.slab, EntityTransactionType::Modification)]
    }

    fn on_commit(&mut self, model: &mut Model) -> TxnResult<()> {
        if self.before.is_none() {
            self.before = match model.field(self.target())? {
                Some(FieldValue::Float(thickness)) => Some(thickness),
                _ => None,
            };
        }
        self.apply(model, self.after)
    }

    fn on_undo(&mut self, model: &mut Model) -> TxnResult<()> {
        match self.before {
            Some(before) => self.apply(model, before),
            None => Ok(()),
        }
    }

    fn on_redo(&mut self, model: &mut Model) -> TxnResult<()> {
        self.apply(model, self.after)
    }

    fn compose(&self, next: &dyn Request) -> Option<Box<dyn Request>> {
        let next = next.as_any().downcast_ref::<ChangeSlabThicknessRequest>()?;
        (next.slab == self.slab).then(|| {
            Box::new(ChangeSlabThicknessRequest {
                slab: self.slab,
                before: self.before,
                after: next.after,
            }) as Box<dyn Request>
        })
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
        RequestData::SlabThickness { slab, thickness } => {
            boxed(ChangeSlabThicknessRequest::new(slab, thickness))
        }
        _ => Err(malformed(request_type, "SlabThickness { slab, thickness }")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;
    use crate::layer::LayerId;
    use crate::model::ModelBuilder;
    use crate::txn::error::TxnError;
    use approx::assert_relative_eq;
    use glam::DVec2;

    fn slab_model() -> (Model, LayerId, EntityId) {
        let mut builder = ModelBuilder::new();
        builder.add_layer("1F", 0.0, 3000.0);
        let layer = builder.add_layer("2F", 3000.0, 3000.0);
        let profile = vec![
            DVec2::ZERO,
            DVec2::new(6000.0, 0.0),
            DVec2::new(6000.0, 4000.0),
            DVec2::new(0.0, 4000.0),
        ];
        let slab = builder.add_slab(layer, 120.0, profile).unwrap();
        (builder.build(), layer, slab)
    }

    fn thickness(model: &Model, slab: EntityId) -> f64 {
        match model.entity(slab).map(Entity::data) {
            Some(EntityData::Slab { thickness, .. }) => *thickness,
            _ => panic!("not a slab"),
        }
    }

    #[test]
    fn test_thickness_commit_and_undo() {
        let (mut model, layer, slab) = slab_model();
        let mut request = ChangeSlabThicknessRequest::new(slab, 200.0);

        request.on_commit(&mut model).unwrap();
        assert_relative_eq!(thickness(&model, slab), 200.0);
        let sketch = model.sketch(SketchTarget::LayerSlab(layer)).unwrap();
        assert_relative_eq!(sketch.surface().elevation, 3200.0);
        let face = sketch.faces()[0].id;
        assert_relative_eq!(sketch.base_info(face).unwrap().surface.elevation, 3200.0);

        let Some(EntityData::Slab { faces, .. }) = model.entity(slab).map(Entity::data) else {
            panic!("not a slab");
        };
        assert_relative_eq!(faces.bottom, 3000.0);
        assert_relative_eq!(faces.top, 3200.0);

        request.on_undo(&mut model).unwrap();
        assert_relative_eq!(thickness(&model, slab), 120.0);
        let sketch = model.sketch(SketchTarget::LayerSlab(layer)).unwrap();
        assert_relative_eq!(sketch.surface().elevation, 3120.0);
    }

    #[test]
    fn test_redo_is_deterministic() {
        let (mut model, _, slab) = slab_model();
        let mut request = ChangeSlabThicknessRequest::new(slab, 250.0);

        request.on_commit(&mut model).unwrap();
        let committed = model.clone();
        request.on_undo(&mut model).unwrap();
        request.on_redo(&mut model).unwrap();
        assert_eq!(model, committed);
    }

    #[test]
    fn test_non_slab_is_rejected() {
        let mut builder = ModelBuilder::new();
        let wall = builder.add_wall(DVec2::ZERO, DVec2::X, 200.0, 2800.0);
        let mut model = builder.build();

        let mut request = ChangeSlabThicknessRequest::new(wall, 200.0);
        assert!(matches!(
            request.on_commit(&mut model),
            Err(TxnError::Model(ModelError::KindMismatch { .. }))
        ));
    }

    #[test]
    fn test_missing_layer_leaves_slab_untouched() {
        let mut builder = ModelBuilder::new();
        let profile = vec![DVec2::ZERO, DVec2::X, DVec2::ONE];
        let slab = builder.add_entity(Entity::slab(LayerId::new(), 0.0, 120.0, profile));
        let mut model = builder.build();
        let original = model.clone();

        let mut request = ChangeSlabThicknessRequest::new(slab, 200.0);
        assert!(matches!(
            request.on_commit(&mut model),
            Err(TxnError::Model(ModelError::LayerNotFound(_)))
        ));
        assert_eq!(model, original);
    }

    #[test]
    fn test_compose_keeps_first_before() {
        let (mut model, _, slab) = slab_model();
        let mut first = ChangeSlabThicknessRequest::new(slab, 150.0);
        first.on_commit(&mut model).unwrap();
        let mut second = ChangeSlabThicknessRequest::new(slab, 180.0);
        second.on_commit(&mut model).unwrap();

        let mut merged = first.compose(&second).unwrap();
        merged.on_undo(&mut model).unwrap();
        assert_relative_eq!(thickness(&model, slab), 120.0);
    }
}
