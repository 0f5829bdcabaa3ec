//! The in-memory building model
//!
//! Read access is public. Mutation is crate-private and reached only through
//! requests committed by the transaction manager; outside the crate a live
//! model is only ever seen as `&Model`.

use std::collections::HashSet;

use ak_sketch::{
    BuilderKind, BuilderOptions, FaceId, Loop, Sketch2d, Sketch2dBuilder, SupportingSurface,
    TopoRole,
};
use glam::DVec2;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::entity::{
    Entity, EntityData, EntityId, EntityKind, FieldName, FieldRef, FieldValue, WallEnd,
};
use crate::error::{ModelError, ModelResult};
use crate::layer::{Layer, LayerId};

/// A sketch owned by the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SketchTarget {
    /// Slab profiles and holes of a layer
    LayerSlab(LayerId),
    /// Roof drawing regions of a layer
    RoofsDrawing(LayerId),
    /// The site-wide outdoor drawing
    OutdoorDrawing,
}

impl SketchTarget {
    pub fn builder_kind(&self) -> BuilderKind {
        match self {
            SketchTarget::LayerSlab(_) => BuilderKind::Layer,
            SketchTarget::RoofsDrawing(_) => BuilderKind::RoofsDrawing,
            SketchTarget::OutdoorDrawing => BuilderKind::OutdoorDrawing,
        }
    }

    pub fn layer(&self) -> Option<LayerId> {
        match self {
            SketchTarget::LayerSlab(id) | SketchTarget::RoofsDrawing(id) => Some(*id),
            SketchTarget::OutdoorDrawing => None,
        }
    }
}

/// Roof drawing region entities added and removed to match a roofs sketch
#[derive(Debug, Default)]
pub(crate) struct RegionSync {
    pub created: Vec<EntityId>,
    /// Removed entities with their former index, in removal order
    pub removed: Vec<(usize, Entity)>,
    /// Roofs whose drawing region was removed, as `(roof, region)`
    pub unlinked: Vec<(EntityId, EntityId)>,
}

/// Serialization format for the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ModelData {
    layers: Vec<Layer>,
    entities: Vec<Entity>,
    recycled: Vec<Entity>,
    outdoor: Sketch2d,
    sketch_options: BuilderOptions,
}

/// Building model: entities, recycle bin, layers and the outdoor sketch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "ModelData", into = "ModelData")]
pub struct Model {
    entities: IndexMap<EntityId, Entity>,
    recycled: IndexMap<EntityId, Entity>,
    /// Bottom-up storey order
    layers: Vec<Layer>,
    outdoor: Sketch2d,
    sketch_options: BuilderOptions,
}

impl From<Model> for ModelData {
    fn from(model: Model) -> Self {
        Self {
            layers: model.layers,
            entities: model.entities.into_values().collect(),
            recycled: model.recycled.into_values().collect(),
            outdoor: model.outdoor,
            sketch_options: model.sketch_options,
        }
    }
}

impl From<ModelData> for Model {
    fn from(data: ModelData) -> Self {
        Self {
            entities: data.entities.into_iter().map(|e| (e.id(), e)).collect(),
            recycled: data.recycled.into_iter().map(|e| (e.id(), e)).collect(),
            layers: data.layers,
            outdoor: data.outdoor,
            sketch_options: data.sketch_options,
        }
    }
}

impl Model {
    // ============== Entities ==============

    /// Get the number of live entities
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if the model has no live entities
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Get a live entity by ID
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Position of a live entity in insertion order
    pub fn entity_index(&self, id: EntityId) -> Option<usize> {
        self.entities.get_index_of(&id)
    }

    /// Iterate over live entities in insertion order
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn entities_of_kind(&self, kind: EntityKind) -> impl Iterator<Item = &Entity> {
        self.entities.values().filter(move |e| e.kind() == kind)
    }

    /// Get a recycled entity by ID
    pub fn recycled_entity(&self, id: EntityId) -> Option<&Entity> {
        self.recycled.get(&id)
    }

    pub fn is_recycled(&self, id: EntityId) -> bool {
        self.recycled.contains_key(&id)
    }

    /// Iterate over the recycle bin
    pub fn recycled(&self) -> impl Iterator<Item = &Entity> {
        self.recycled.values()
    }

    /// Read a field; `Ok(None)` when the entity is gone
    pub fn field(&self, target: FieldRef) -> ModelResult<Option<FieldValue>> {
        let Some(entity) = self.entity(target.entity) else {
            return Ok(None);
        };
        entity
            .get_field(target.field)
            .map(Some)
            .ok_or(ModelError::FieldNotApplicable {
                kind: entity.kind(),
                field: target.field,
            })
    }

    /// Walls with an end at `point`
    pub fn walls_at(&self, point: DVec2, epsilon: f64) -> Vec<(EntityId, WallEnd)> {
        self.entities_of_kind(EntityKind::Wall)
            .filter_map(|w| w.wall_end_at(point, epsilon).map(|end| (w.id(), end)))
            .collect()
    }

    /// Roof drawing region entities of a layer
    pub fn roof_regions(&self, layer: LayerId) -> impl Iterator<Item = &Entity> {
        self.entities.values().filter(move |e| {
            matches!(e.data(), EntityData::RoofDrawingRegion { layer: l, .. } if *l == layer)
        })
    }

    // ============== Layers ==============

    /// Layers, bottom-up
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn layer_index(&self, id: LayerId) -> Option<usize> {
        self.layers.iter().position(|l| l.id == id)
    }

    pub fn layer_above(&self, id: LayerId) -> Option<&Layer> {
        self.layers.get(self.layer_index(id)? + 1)
    }

    pub fn layer_below(&self, id: LayerId) -> Option<&Layer> {
        let index = self.layer_index(id)?;
        index.checked_sub(1).and_then(|i| self.layers.get(i))
    }

    // ============== Sketches ==============

    pub fn outdoor_drawing(&self) -> &Sketch2d {
        &self.outdoor
    }

    pub fn sketch(&self, target: SketchTarget) -> Option<&Sketch2d> {
        match target {
            SketchTarget::LayerSlab(id) => self.layer(id).map(|l| &l.sketch),
            SketchTarget::RoofsDrawing(id) => self.layer(id).map(|l| &l.roofs_drawing),
            SketchTarget::OutdoorDrawing => Some(&self.outdoor),
        }
    }

    pub fn sketch_options(&self) -> BuilderOptions {
        self.sketch_options
    }

    // ============== Crate-private mutation ==============

    pub(crate) fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub(crate) fn insert_entity(&mut self, entity: Entity) -> EntityId {
        let id = entity.id();
        self.entities.insert(id, entity);
        id
    }

    /// Insert at a former position (clamped to the end)
    pub(crate) fn insert_entity_at(&mut self, index: usize, entity: Entity) -> EntityId {
        let id = entity.id();
        let index = index.min(self.entities.len());
        self.entities.shift_insert(index, id, entity);
        id
    }

    /// Remove a live entity, returning its former index
    pub(crate) fn remove_entity(&mut self, id: EntityId) -> Option<(usize, Entity)> {
        self.entities
            .shift_remove_full(&id)
            .map(|(index, _, entity)| (index, entity))
    }

    /// Move a live entity to the recycle bin, returning its former index
    pub(crate) fn recycle_entity(&mut self, id: EntityId) -> Option<usize> {
        let (index, entity) = self.remove_entity(id)?;
        self.recycled.insert(id, entity);
        Some(index)
    }

    /// Move a recycled entity back to the live set
    pub(crate) fn restore_entity(&mut self, id: EntityId, index: Option<usize>) -> bool {
        let Some(entity) = self.recycled.shift_remove(&id) else {
            return false;
        };
        match index {
            Some(index) => self.insert_entity_at(index, entity),
            None => self.insert_entity(entity),
        };
        true
    }

    /// Write a field; `Ok(false)` when the entity is gone
    pub(crate) fn set_field(&mut self, target: FieldRef, value: FieldValue) -> ModelResult<bool> {
        match self.entity_mut(target.entity) {
            Some(entity) => {
                entity.set_field(target.field, value)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub(crate) fn set_sketch_options(&mut self, options: BuilderOptions) {
        self.sketch_options = options;
    }

    pub(crate) fn layer_mut(&mut self, id: LayerId) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| l.id == id)
    }

    pub(crate) fn sketch_mut(&mut self, target: SketchTarget) -> Option<&mut Sketch2d> {
        match target {
            SketchTarget::LayerSlab(id) => self.layer_mut(id).map(|l| &mut l.sketch),
            SketchTarget::RoofsDrawing(id) => self.layer_mut(id).map(|l| &mut l.roofs_drawing),
            SketchTarget::OutdoorDrawing => Some(&mut self.outdoor),
        }
    }

    /// Builder over a sketch of this model
    pub(crate) fn builder(&mut self, target: SketchTarget) -> Option<Sketch2dBuilder<'_>> {
        let options = self.sketch_options;
        let sketch = self.sketch_mut(target)?;
        Some(Sketch2dBuilder::new(sketch, target.builder_kind(), options))
    }

    pub(crate) fn replace_sketch(&mut self, target: SketchTarget, sketch: Sketch2d) -> bool {
        match self.sketch_mut(target) {
            Some(slot) => {
                *slot = sketch;
                true
            }
            None => false,
        }
    }

    /// Keep one roof drawing region entity per face of a layer's roofs sketch
    pub(crate) fn sync_roof_regions(&mut self, layer: LayerId) -> Option<RegionSync> {
        let faces: Vec<FaceId> = self
            .layer(layer)?
            .roofs_drawing
            .faces()
            .iter()
            .map(|f| f.id)
            .collect();

        let region_face = |e: &Entity| match e.data() {
            EntityData::RoofDrawingRegion { layer: l, face, .. } if *l == layer => Some(*face),
            _ => None,
        };

        let stale: Vec<EntityId> = self
            .entities
            .values()
            .filter(|e| region_face(e).is_some_and(|face| !faces.contains(&face)))
            .map(Entity::id)
            .collect();

        let mut sync = RegionSync::default();
        for id in stale {
            if let Some(entry) = self.remove_entity(id) {
                sync.removed.push(entry);
            }
        }

        let linked: Vec<(EntityId, EntityId)> = self
            .entities
            .values()
            .filter_map(|e| match e.data() {
                EntityData::Roof {
                    drawing_region: Some(region),
                    ..
                } if sync.removed.iter().any(|(_, r)| r.id() == *region) => Some((e.id(), *region)),
                _ => None,
            })
            .collect();
        for (roof, region) in linked {
            let target = FieldRef::new(roof, FieldName::DrawingRegion);
            if let Err(err) = self.set_field(target, FieldValue::Id(None)) {
                warn!(roof = %roof, error = %err, "Failed to unlink roof drawing region");
                continue;
            }
            sync.unlinked.push((roof, region));
        }

        let known: HashSet<FaceId> = self.entities.values().filter_map(region_face).collect();
        for face in faces.into_iter().filter(|f| !known.contains(f)) {
            let id = self.insert_entity(Entity::roof_drawing_region(layer, face));
            sync.created.push(id);
        }

        if !sync.created.is_empty() || !sync.removed.is_empty() {
            debug!(
                layer = %layer,
                created = sync.created.len(),
                removed = sync.removed.len(),
                unlinked = sync.unlinked.len(),
                "Synced roof drawing regions"
            );
        }
        Some(sync)
    }
}

/// Builds models outside of the transaction system (fixtures, importers)
#[derive(Debug, Default)]
pub struct ModelBuilder {
    model: Model,
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sketch_options(mut self, options: BuilderOptions) -> Self {
        self.model.sketch_options = options;
        self
    }

    /// Add a layer on top of the existing ones
    pub fn add_layer(&mut self, name: impl Into<String>, elevation: f64, height: f64) -> LayerId {
        let layer = Layer::new(name, elevation, height);
        let id = layer.id;
        self.model.layers.push(layer);
        id
    }

    pub fn add_entity(&mut self, entity: Entity) -> EntityId {
        self.model.insert_entity(entity)
    }

    pub fn add_wall(&mut self, from: DVec2, to: DVec2, thickness: f64, height: f64) -> EntityId {
        self.add_entity(Entity::wall(from, to, thickness, height))
    }

    /// Add a slab and seed its profile into the layer sketch
    pub fn add_slab(&mut self, layer: LayerId, thickness: f64, profile: Loop) -> ModelResult<EntityId> {
        let options = self.model.sketch_options;
        let target = self
            .model
            .layer_mut(layer)
            .ok_or(ModelError::LayerNotFound(layer))?;
        let elevation = target.elevation;

        target
            .sketch
            .set_surface(SupportingSurface::horizontal(elevation + thickness));
        Sketch2dBuilder::new(&mut target.sketch, BuilderKind::Layer, options)
            .insert_face(&profile, &[], TopoRole::Face)?;

        Ok(self.add_entity(Entity::slab(layer, elevation, thickness, profile)))
    }

    pub fn add_roof(&mut self, layer: LayerId, pitch: f64) -> ModelResult<EntityId> {
        if self.model.layer(layer).is_none() {
            return Err(ModelError::LayerNotFound(layer));
        }
        Ok(self.add_entity(Entity::roof(layer, pitch)))
    }

    /// Seed a roof drawing region and its entity
    pub fn add_roof_region(&mut self, layer: LayerId, outer: Loop) -> ModelResult<EntityId> {
        let face = self
            .model
            .builder(SketchTarget::RoofsDrawing(layer))
            .ok_or(ModelError::LayerNotFound(layer))?
            .insert_face(&outer, &[], TopoRole::Region)?;
        Ok(self.add_entity(Entity::roof_drawing_region(layer, face)))
    }

    pub fn add_outdoor_face(&mut self, outer: Loop) -> ModelResult<FaceId> {
        let options = self.model.sketch_options;
        let face = Sketch2dBuilder::new(&mut self.model.outdoor, BuilderKind::OutdoorDrawing, options)
            .insert_face(&outer, &[], TopoRole::Face)?;
        Ok(face)
    }

    pub fn build(self) -> Model {
        self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::DVec3;

    fn rect(w: f64, h: f64) -> Loop {
        vec![
            DVec2::ZERO,
            DVec2::new(w, 0.0),
            DVec2::new(w, h),
            DVec2::new(0.0, h),
        ]
    }

    #[test]
    fn test_layer_order() {
        let mut builder = ModelBuilder::new();
        let ground = builder.add_layer("1F", 0.0, 3000.0);
        let first = builder.add_layer("2F", 3000.0, 3000.0);
        let model = builder.build();

        assert_eq!(model.layer_index(first), Some(1));
        assert_eq!(model.layer_above(ground).map(|l| l.id), Some(first));
        assert_eq!(model.layer_below(first).map(|l| l.id), Some(ground));
        assert!(model.layer_below(ground).is_none());
        assert!(model.layer_above(first).is_none());
    }

    #[test]
    fn test_slab_seeds_layer_sketch() {
        let mut builder = ModelBuilder::new();
        let layer = builder.add_layer("1F", 0.0, 3000.0);
        let slab = builder.add_slab(layer, 120.0, rect(4000.0, 3000.0)).unwrap();
        let model = builder.build();

        let sketch = model.sketch(SketchTarget::LayerSlab(layer)).unwrap();
        assert_eq!(sketch.len(), 1);
        assert_eq!(sketch.faces()[0].tag.role, TopoRole::Face);
        assert_relative_eq!(sketch.surface().elevation, 120.0);

        let EntityData::Slab { faces, .. } = model.entity(slab).unwrap().data() else {
            panic!("not a slab");
        };
        assert_relative_eq!(faces.top, 120.0);
        assert_relative_eq!(faces.area, 12_000_000.0);
    }

    #[test]
    fn test_recycle_keeps_data_and_position() {
        let mut builder = ModelBuilder::new();
        let a = builder.add_entity(Entity::content("A", DVec3::ZERO, DVec3::ONE));
        let b = builder.add_entity(Entity::content("B", DVec3::ZERO, DVec3::ONE));
        let mut model = builder.build();

        let index = model.recycle_entity(a).unwrap();
        assert!(!model.contains(a));
        assert_eq!(model.recycled_entity(a).unwrap().display_name(), "A");

        assert!(model.restore_entity(a, Some(index)));
        assert_eq!(model.entity_index(a), Some(0));
        assert_eq!(model.entity_index(b), Some(1));
        assert!(!model.restore_entity(a, None));
    }

    #[test]
    fn test_sync_roof_regions() {
        let mut builder = ModelBuilder::new();
        let layer = builder.add_layer("1F", 0.0, 3000.0);
        let region = builder.add_roof_region(layer, rect(10.0, 10.0)).unwrap();
        let mut model = builder.build();

        let sync = model.sync_roof_regions(layer).unwrap();
        assert!(sync.created.is_empty());
        assert!(sync.removed.is_empty());

        let face = match model.entity(region).map(Entity::data) {
            Some(EntityData::RoofDrawingRegion { face, .. }) => *face,
            _ => panic!("not a roof drawing region"),
        };
        model
            .builder(SketchTarget::RoofsDrawing(layer))
            .unwrap()
            .remove_faces(&[face]);
        let sync = model.sync_roof_regions(layer).unwrap();
        assert_eq!(sync.removed.len(), 1);
        assert_eq!(sync.removed[0].1.id(), region);
        assert_eq!(model.roof_regions(layer).count(), 0);
    }

    #[test]
    fn test_sync_clears_roof_link_of_removed_region() {
        let mut builder = ModelBuilder::new();
        let layer = builder.add_layer("1F", 0.0, 3000.0);
        let roof = builder.add_roof(layer, 30.0).unwrap();
        let region = builder.add_roof_region(layer, rect(10.0, 10.0)).unwrap();
        let mut model = builder.build();
        model
            .set_field(
                FieldRef::new(roof, FieldName::DrawingRegion),
                FieldValue::Id(Some(region)),
            )
            .unwrap();

        let face = match model.entity(region).map(Entity::data) {
            Some(EntityData::RoofDrawingRegion { face, .. }) => *face,
            _ => panic!("not a roof drawing region"),
        };
        model
            .builder(SketchTarget::RoofsDrawing(layer))
            .unwrap()
            .remove_faces(&[face]);
        let sync = model.sync_roof_regions(layer).unwrap();

        assert_eq!(sync.unlinked, vec![(roof, region)]);
        assert_eq!(
            model.field(FieldRef::new(roof, FieldName::DrawingRegion)).unwrap(),
            Some(FieldValue::Id(None))
        );
    }

    #[test]
    fn test_ron_round_trip() {
        let mut builder = ModelBuilder::new();
        let layer = builder.add_layer("1F", 0.0, 3000.0);
        builder.add_slab(layer, 120.0, rect(4000.0, 3000.0)).unwrap();
        builder.add_wall(DVec2::ZERO, DVec2::new(4000.0, 0.0), 200.0, 2800.0);
        let model = builder.build();

        let text = ron::to_string(&model).unwrap();
        let loaded: Model = ron::from_str(&text).unwrap();
        assert_eq!(loaded, model);
    }
}
