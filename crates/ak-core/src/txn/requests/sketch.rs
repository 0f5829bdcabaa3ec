//! Sketch edits
//!
//! One request type covers drawing, point moves and curve moves on every
//! sketch the model owns. The sketch is snapshotted around the builder run,
//! so undo and redo swap whole sketches instead of replaying geometry.

use std::any::Any;

use ak_sketch::{BuildReport, Loop, Sketch2d, TopoRole};
use glam::DVec2;
use tracing::{debug, info};

use super::{boxed, malformed};
use crate::entity::{Entity, EntityId, FieldName, FieldRef, FieldValue};
use crate::error::ModelError;
use crate::model::{Model, SketchTarget};
use crate::txn::error::TxnResult;
use crate::txn::registry::RequestRegistry;
use crate::txn::request::{Request, RequestData, RequestType, SketchOp};
use crate::txn_type::EntityTransactionType;

#[derive(Debug, Clone, PartialEq)]
enum Edit {
    Draw(Vec<Loop>),
    MovePoint { from: DVec2, to: DVec2 },
    MoveCurve { start: DVec2, end: DVec2, offset: DVec2 },
}

impl Edit {
    fn op(&self) -> SketchOp {
        match self {
            Edit::Draw(_) => SketchOp::Draw,
            Edit::MovePoint { .. } => SketchOp::MovePoint,
            Edit::MoveCurve { .. } => SketchOp::MoveCurve,
        }
    }
}

/// State captured by the last commit
#[derive(Debug, Clone, Default)]
struct Applied {
    before: Sketch2d,
    after: Sketch2d,
    /// Roof drawing regions created for new faces
    created: Vec<Entity>,
    /// Roof drawing regions removed with their face, with former index
    removed: Vec<(usize, Entity)>,
    /// Roofs unlinked from a removed region, as `(roof, region)`
    unlinked: Vec<(EntityId, EntityId)>,
}

impl Applied {
    fn relink(&self, model: &mut Model, linked: bool) -> TxnResult<()> {
        for (roof, region) in &self.unlinked {
            let value = FieldValue::Id(linked.then_some(*region));
            model.set_field(FieldRef::new(*roof, FieldName::DrawingRegion), value)?;
        }
        Ok(())
    }
}

/// Draw regions into, or move geometry of, a model sketch
#[derive(Debug, Clone)]
pub struct SketchEditRequest {
    request_type: RequestType,
    target: SketchTarget,
    edit: Edit,
    filter: Option<TopoRole>,
    report: BuildReport,
    refreshes: usize,
    applied: Option<Applied>,
}

impl SketchEditRequest {
    fn new(target: SketchTarget, edit: Edit, filter: Option<TopoRole>) -> Self {
        Self {
            request_type: RequestType::sketch_edit(target.builder_kind(), edit.op()),
            target,
            edit,
            filter,
            report: BuildReport::default(),
            refreshes: 0,
            applied: None,
        }
    }

    pub fn draw_polygons(target: SketchTarget, polygons: Vec<Loop>) -> Self {
        Self::new(target, Edit::Draw(polygons), None)
    }

    pub fn move_point(
        target: SketchTarget,
        from: DVec2,
        to: DVec2,
        filter: Option<TopoRole>,
    ) -> Self {
        Self::new(target, Edit::MovePoint { from, to }, filter)
    }

    pub fn move_curve(
        target: SketchTarget,
        start: DVec2,
        end: DVec2,
        offset: DVec2,
        filter: Option<TopoRole>,
    ) -> Self {
        Self::new(target, Edit::MoveCurve { start, end, offset }, filter)
    }

    pub fn target(&self) -> SketchTarget {
        self.target
    }

    pub fn filter(&self) -> Option<TopoRole> {
        self.filter
    }

    /// Builder report of the last commit
    pub fn report(&self) -> &BuildReport {
        &self.report
    }

    /// Sketch refreshes run by the last commit
    pub fn refresh_count(&self) -> usize {
        self.refreshes
    }

    fn layer_missing(&self) -> ModelError {
        // Only layer-bound targets can be missing
        ModelError::LayerNotFound(self.target.layer().unwrap_or_default())
    }

    fn run_builder(&mut self, model: &mut Model) -> TxnResult<()> {
        let target = self.target;
        let mut builder = model.builder(target).ok_or_else(|| self.layer_missing())?;
        self.report = match &self.edit {
            Edit::Draw(polygons) => builder.draw_polygons(polygons)?,
            Edit::MovePoint { from, to } => builder.move_point(*from, *to, self.filter),
            Edit::MoveCurve { start, end, offset } => {
                builder.move_curve(*start, *end, *offset, self.filter)
            }
        };
        self.refreshes = builder.layer_update_count() + builder.appendix_update_count();
        Ok(())
    }
}

impl Request for SketchEditRequest {
    fn request_type(&self) -> RequestType {
        self.request_type
    }

    fn entity_changes(&self) -> Vec<(EntityId, EntityTransactionType)> {
        let Some(applied) = &self.applied else {
            return Vec::new();
        };
        applied
            .created
            .iter()
            .map(|e| (e.id(), EntityTransactionType::Creation))
            .chain(
                applied
                    .removed
                    .iter()
                    .map(|(_, e)| (e.id(), EntityTransactionType::Deletion)),
            )
            .chain(
                applied
                    .unlinked
                    .iter()
                    .map(|(roof, _)| (*roof, EntityTransactionType::Modification)),
            )
            .collect()
    }

    fn has_effect(&self) -> bool {
        self.applied.as_ref().is_some_and(|applied| {
            !self.report.is_empty() || !applied.created.is_empty() || !applied.removed.is_empty()
        })
    }

    fn on_commit(&mut self, model: &mut Model) -> TxnResult<()> {
        let before = model
            .sketch(self.target)
            .cloned()
            .ok_or_else(|| self.layer_missing())?;

        self.run_builder(model)?;

        let mut applied = Applied {
            before,
            ..Applied::default()
        };
        if let SketchTarget::RoofsDrawing(layer) = self.target {
            if let Some(sync) = model.sync_roof_regions(layer) {
                applied.created = sync
                    .created
                    .iter()
                    .filter_map(|id| model.entity(*id).cloned())
                    .collect();
                applied.removed = sync.removed;
                applied.unlinked = sync.unlinked;
            }
        }
        applied.after = model
            .sketch(self.target)
            .cloned()
            .ok_or_else(|| self.layer_missing())?;

        info!(
            request = %self.request_type,
            inserted = self.report.inserted.len(),
            modified = self.report.modified.len(),
            removed = self.report.removed.len(),
            skipped = self.report.skipped.len(),
            "Sketch edited"
        );
        self.applied = Some(applied);
        Ok(())
    }

    fn on_undo(&mut self, model: &mut Model) -> TxnResult<()> {
        let Some(applied) = &self.applied else {
            return Ok(());
        };
        if !model.replace_sketch(self.target, applied.before.clone()) {
            debug!(request = %self.request_type, "Sketch gone, undo skipped");
            return Ok(());
        }
        for entity in &applied.created {
            model.remove_entity(entity.id());
        }
        for (index, entity) in applied.removed.iter().rev() {
            model.insert_entity_at(*index, entity.clone());
        }
        applied.relink(model, true)
    }

    fn on_redo(&mut self, model: &mut Model) -> TxnResult<()> {
        let Some(applied) = &self.applied else {
            return Ok(());
        };
        if !model.replace_sketch(self.target, applied.after.clone()) {
            debug!(request = %self.request_type, "Sketch gone, redo skipped");
            return Ok(());
        }
        for (_, entity) in &applied.removed {
            model.remove_entity(entity.id());
        }
        applied.relink(model, false)?;
        for entity in &applied.created {
            model.insert_entity(entity.clone());
        }
        Ok(())
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
    let Some((kind, op)) = request_type.as_sketch_edit() else {
        return Err(malformed(request_type, "sketch edit data"));
    };
    let layer = match &data {
        RequestData::DrawPolygons { layer, .. }
        | RequestData::MovePoint { layer, .. }
        | RequestData::MoveCurve { layer, .. } => *layer,
        _ => None,
    };
    let target = match (kind, layer) {
        (ak_sketch::BuilderKind::OutdoorDrawing, _) => SketchTarget::OutdoorDrawing,
        (ak_sketch::BuilderKind::RoofsDrawing, Some(layer)) => SketchTarget::RoofsDrawing(layer),
        (ak_sketch::BuilderKind::Layer, Some(layer)) => SketchTarget::LayerSlab(layer),
        _ => return Err(malformed(request_type, "sketch edit data with a layer")),
    };

    match (op, data) {
        (SketchOp::Draw, RequestData::DrawPolygons { polygons, .. }) => {
            boxed(SketchEditRequest::draw_polygons(target, polygons))
        }
        (SketchOp::MovePoint, RequestData::MovePoint { from, to, filter, .. }) => {
            boxed(SketchEditRequest::move_point(target, from, to, filter))
        }
        (
            SketchOp::MoveCurve,
            RequestData::MoveCurve {
                start,
                end,
                offset,
                filter,
                ..
            },
        ) => boxed(SketchEditRequest::move_curve(target, start, end, offset, filter)),
        (SketchOp::Draw, _) => Err(malformed(request_type, "DrawPolygons { layer, polygons }")),
        (SketchOp::MovePoint, _) => Err(malformed(request_type, "MovePoint { layer, from, to, filter }")),
        (SketchOp::MoveCurve, _) => Err(malformed(
            request_type,
            "MoveCurve { layer, start, end, offset, filter }",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityKind;
    use crate::layer::LayerId;
    use crate::model::ModelBuilder;
    use ak_sketch::TopoTag;
    use approx::assert_relative_eq;

    fn square(x: f64, y: f64, size: f64) -> Loop {
        vec![
            DVec2::new(x, y),
            DVec2::new(x + size, y),
            DVec2::new(x + size, y + size),
            DVec2::new(x, y + size),
        ]
    }

    fn slab_model() -> (Model, LayerId) {
        let mut builder = ModelBuilder::new();
        let layer = builder.add_layer("1F", 0.0, 3000.0);
        builder.add_slab(layer, 120.0, square(0.0, 0.0, 10_000.0)).unwrap();
        (builder.build(), layer)
    }

    #[test]
    fn test_draw_two_holes_refreshes_once() {
        let (mut model, layer) = slab_model();
        let mut request = SketchEditRequest::draw_polygons(
            SketchTarget::LayerSlab(layer),
            vec![square(1000.0, 1000.0, 1000.0), square(5000.0, 5000.0, 1000.0)],
        );
        assert_eq!(request.request_type(), RequestType::DrawSlabHoles);

        request.on_commit(&mut model).unwrap();
        assert_eq!(request.refresh_count(), 1);

        let sketch = model.sketch(SketchTarget::LayerSlab(layer)).unwrap();
        let holes: Vec<_> = sketch.faces_with_role(TopoRole::Hole).collect();
        assert_eq!(holes.len(), 2);
        for hole in holes {
            assert_eq!(hole.tag, TopoTag::drawn(TopoRole::Hole));
            assert_eq!(hole.tag.to_string(), "-1_holeTopo");
        }
        let slab_face = sketch.faces_with_role(TopoRole::Face).next().unwrap();
        assert_eq!(slab_face.holes.len(), 2);
    }

    #[test]
    fn test_draw_undo_redo() {
        let (mut model, layer) = slab_model();
        let original = model.clone();
        let mut request = SketchEditRequest::draw_polygons(
            SketchTarget::LayerSlab(layer),
            vec![square(1000.0, 1000.0, 1000.0)],
        );

        request.on_commit(&mut model).unwrap();
        let committed = model.clone();
        request.on_undo(&mut model).unwrap();
        assert_eq!(model, original);
        request.on_redo(&mut model).unwrap();
        assert_eq!(model, committed);
    }

    #[test]
    fn test_roof_draw_creates_regions() {
        let mut builder = ModelBuilder::new();
        let layer = builder.add_layer("1F", 0.0, 3000.0);
        let mut model = builder.build();
        let original = model.clone();

        let mut request = SketchEditRequest::draw_polygons(
            SketchTarget::RoofsDrawing(layer),
            vec![square(0.0, 0.0, 10.0), square(20.0, 0.0, 10.0)],
        );
        request.on_commit(&mut model).unwrap();
        assert_eq!(model.roof_regions(layer).count(), 2);
        assert_eq!(model.entities_of_kind(EntityKind::RoofDrawingRegion).count(), 2);
        assert_eq!(request.entity_changes().len(), 2);

        request.on_undo(&mut model).unwrap();
        assert_eq!(model, original);
        request.on_redo(&mut model).unwrap();
        assert_eq!(model.roof_regions(layer).count(), 2);
    }

    #[test]
    fn test_move_point_respects_filter() {
        let (mut model, layer) = slab_model();
        let mut draw = SketchEditRequest::draw_polygons(
            SketchTarget::LayerSlab(layer),
            vec![square(1000.0, 1000.0, 1000.0)],
        );
        draw.on_commit(&mut model).unwrap();

        // The slab corner is a face vertex; a hole-filtered move skips it
        let mut skipped = SketchEditRequest::move_point(
            SketchTarget::LayerSlab(layer),
            DVec2::ZERO,
            DVec2::new(-500.0, 0.0),
            Some(TopoRole::Hole),
        );
        skipped.on_commit(&mut model).unwrap();
        assert!(skipped.report().is_empty());
        assert!(!skipped.has_effect());

        let mut moved = SketchEditRequest::move_point(
            SketchTarget::LayerSlab(layer),
            DVec2::new(1000.0, 1000.0),
            DVec2::new(500.0, 500.0),
            Some(TopoRole::Hole),
        );
        moved.on_commit(&mut model).unwrap();
        assert!(moved.has_effect());
        let sketch = model.sketch(SketchTarget::LayerSlab(layer)).unwrap();
        let hole = sketch.faces_with_role(TopoRole::Hole).next().unwrap();
        assert!(hole.outer.iter().any(|p| p.distance(DVec2::new(500.0, 500.0)) < 1e-9));
    }

    #[test]
    fn test_removed_region_unlinks_roof() {
        let mut builder = ModelBuilder::new();
        let layer = builder.add_layer("1F", 0.0, 3000.0);
        let roof = builder.add_roof(layer, 30.0).unwrap();
        let region = builder.add_roof_region(layer, square(0.0, 0.0, 10.0)).unwrap();
        let mut model = builder.build();
        let link = FieldRef::new(roof, FieldName::DrawingRegion);
        model.set_field(link, FieldValue::Id(Some(region))).unwrap();
        let original = model.clone();

        // Drawing over the whole region replaces its face
        let mut request = SketchEditRequest::draw_polygons(
            SketchTarget::RoofsDrawing(layer),
            vec![square(-5.0, -5.0, 20.0)],
        );
        request.on_commit(&mut model).unwrap();
        assert!(!model.contains(region));
        assert_eq!(model.field(link).unwrap(), Some(FieldValue::Id(None)));
        assert!(
            request
                .entity_changes()
                .contains(&(roof, EntityTransactionType::Modification))
        );

        request.on_undo(&mut model).unwrap();
        assert_eq!(model, original);
        request.on_redo(&mut model).unwrap();
        assert_eq!(model.field(link).unwrap(), Some(FieldValue::Id(None)));
    }

    #[test]
    fn test_move_curve_outdoor() {
        let mut builder = ModelBuilder::new();
        builder.add_outdoor_face(square(0.0, 0.0, 10.0)).unwrap();
        let mut model = builder.build();

        let mut request = SketchEditRequest::move_curve(
            SketchTarget::OutdoorDrawing,
            DVec2::new(10.0, 0.0),
            DVec2::new(10.0, 10.0),
            DVec2::new(5.0, 0.0),
            Some(TopoRole::Face),
        );
        request.on_commit(&mut model).unwrap();
        let face = &model.outdoor_drawing().faces()[0];
        assert_relative_eq!(face.area(), 150.0);

        request.on_undo(&mut model).unwrap();
        assert_relative_eq!(model.outdoor_drawing().faces()[0].area(), 100.0);
    }

    #[test]
    fn test_factory_requires_layer() {
        let registry = RequestRegistry::builtin();
        let result = registry.create_request(
            RequestType::DrawRoofRegions,
            RequestData::DrawPolygons {
                layer: None,
                polygons: vec![square(0.0, 0.0, 1.0)],
            },
        );
        assert!(result.is_err());

        let request = registry
            .create_request(
                RequestType::DrawOutdoorRegions,
                RequestData::DrawPolygons {
                    layer: None,
                    polygons: vec![square(0.0, 0.0, 1.0)],
                },
            )
            .unwrap();
        assert_eq!(request.category().as_str(), "OutdoorDrawing");
    }
}
