//! Entities
//!
//! An entity is a structural or content object with a stable id, a typed
//! payload and a list of owned components. Fields are read and written
//! generically through [`FieldName`] / [`FieldValue`] so requests can
//! capture before/after values without knowing the entity kind.

use std::fmt;
use std::str::FromStr;

use ak_sketch::{FaceId, Loop, geometry};
use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::component::Component;
use crate::error::{ModelError, ModelResult};
use crate::layer::LayerId;

/// Unique identifier for an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub Uuid);

impl EntityId {
    /// Create a new random entity ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============== Derived Geometry ==============

/// Left and right face lines of a wall
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WallFaces {
    pub left: [DVec2; 2],
    pub right: [DVec2; 2],
}

impl WallFaces {
    /// Offset the wall curve by half the thickness on each side
    pub fn compute(from: DVec2, to: DVec2, thickness: f64) -> Self {
        let offset = (to - from).normalize_or_zero().perp() * (thickness * 0.5);
        Self {
            left: [from + offset, to + offset],
            right: [from - offset, to - offset],
        }
    }
}

/// Top and bottom planes of a slab
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SlabFaces {
    /// Bottom elevation (mm)
    pub bottom: f64,
    /// Top elevation (mm)
    pub top: f64,
    /// Profile area (mm²)
    pub area: f64,
}

impl SlabFaces {
    pub fn compute(bottom: f64, thickness: f64, profile: &[DVec2]) -> Self {
        Self {
            bottom,
            top: bottom + thickness,
            area: geometry::signed_area(profile).abs(),
        }
    }
}

/// End of a wall curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WallEnd {
    From,
    To,
}

impl WallEnd {
    pub fn field(self) -> FieldName {
        match self {
            WallEnd::From => FieldName::From,
            WallEnd::To => FieldName::To,
        }
    }
}

// ============== Entity Data ==============

/// Kind of an entity, derived from its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Wall,
    Slab,
    Roof,
    RoofDrawingRegion,
    Window,
    Content,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Typed payload of an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityData {
    Wall {
        from: DVec2,
        to: DVec2,
        thickness: f64,
        height: f64,
        faces: WallFaces,
    },
    Slab {
        layer: LayerId,
        thickness: f64,
        profile: Loop,
        faces: SlabFaces,
    },
    Roof {
        layer: LayerId,
        pitch: f64,
        drawing_region: Option<EntityId>,
    },
    RoofDrawingRegion {
        layer: LayerId,
        face: FaceId,
        roof_id: Option<EntityId>,
    },
    Window {
        width: f64,
        height: f64,
        sill_height: f64,
    },
    Content {
        position: DVec3,
        rotation: f64,
        size: DVec3,
    },
}

impl EntityData {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityData::Wall { .. } => EntityKind::Wall,
            EntityData::Slab { .. } => EntityKind::Slab,
            EntityData::Roof { .. } => EntityKind::Roof,
            EntityData::RoofDrawingRegion { .. } => EntityKind::RoofDrawingRegion,
            EntityData::Window { .. } => EntityKind::Window,
            EntityData::Content { .. } => EntityKind::Content,
        }
    }
}

// ============== Field Access ==============

/// Name of a generically accessible field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldName {
    DisplayName,
    Locked,
    Thickness,
    Height,
    Width,
    SillHeight,
    Pitch,
    Position,
    Rotation,
    From,
    To,
    RoofId,
    DrawingRegion,
}

impl FieldName {
    pub const ALL: [FieldName; 13] = [
        FieldName::DisplayName,
        FieldName::Locked,
        FieldName::Thickness,
        FieldName::Height,
        FieldName::Width,
        FieldName::SillHeight,
        FieldName::Pitch,
        FieldName::Position,
        FieldName::Rotation,
        FieldName::From,
        FieldName::To,
        FieldName::RoofId,
        FieldName::DrawingRegion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldName::DisplayName => "displayName",
            FieldName::Locked => "locked",
            FieldName::Thickness => "thickness",
            FieldName::Height => "height",
            FieldName::Width => "width",
            FieldName::SillHeight => "sillHeight",
            FieldName::Pitch => "pitch",
            FieldName::Position => "position",
            FieldName::Rotation => "rotation",
            FieldName::From => "from",
            FieldName::To => "to",
            FieldName::RoofId => "roofId",
            FieldName::DrawingRegion => "drawingRegion",
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldName::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| format!("unknown field: {s}"))
    }
}

/// Value of a generically accessible field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Float(f64),
    Bool(bool),
    Text(String),
    /// Plan point (wall ends)
    Point(DVec2),
    /// Spatial vector (content position)
    Vector(DVec3),
    Id(Option<EntityId>),
}

impl FieldValue {
    fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Float(_) => "float",
            FieldValue::Bool(_) => "bool",
            FieldValue::Text(_) => "text",
            FieldValue::Point(_) => "point",
            FieldValue::Vector(_) => "vector",
            FieldValue::Id(_) => "id",
        }
    }
}

/// A field of a specific entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldRef {
    pub entity: EntityId,
    pub field: FieldName,
}

impl FieldRef {
    pub fn new(entity: EntityId, field: FieldName) -> Self {
        Self { entity, field }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.entity, self.field)
    }
}

// ============== Entity ==============

/// Persisted shape of an entity; components are stored as their dump records
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EntityRecord {
    id: EntityId,
    display_name: String,
    locked: bool,
    data: EntityData,
    components: Vec<String>,
}

/// A structural or content object
#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(into = "EntityRecord", try_from = "EntityRecord")]
pub struct Entity {
    id: EntityId,
    display_name: String,
    locked: bool,
    data: EntityData,
    components: Vec<Component>,
}

impl Clone for Entity {
    /// Deep copy; the copied components point back at the copy
    fn clone(&self) -> Self {
        let mut entity = Self {
            id: self.id,
            display_name: self.display_name.clone(),
            locked: self.locked,
            data: self.data.clone(),
            components: Vec::with_capacity(self.components.len()),
        };
        for component in &self.components {
            entity.attach(component.clone_detached());
        }
        entity
    }
}

impl From<Entity> for EntityRecord {
    fn from(entity: Entity) -> Self {
        Self {
            components: entity.components.iter().map(|c| c.dump().to_string()).collect(),
            id: entity.id,
            display_name: entity.display_name,
            locked: entity.locked,
            data: entity.data,
        }
    }
}

impl TryFrom<EntityRecord> for Entity {
    type Error = ModelError;

    fn try_from(record: EntityRecord) -> Result<Self, Self::Error> {
        let mut entity = Entity::new(record.display_name, record.data);
        entity.id = record.id;
        entity.locked = record.locked;
        for raw in &record.components {
            let value: Value = serde_json::from_str(raw)
                .map_err(|e| ModelError::InvalidComponent(e.to_string()))?;
            entity.attach(Component::load(&value)?);
        }
        Ok(entity)
    }
}

impl Entity {
    /// Create an entity with a fresh id
    pub fn new(display_name: impl Into<String>, data: EntityData) -> Self {
        Self {
            id: EntityId::new(),
            display_name: display_name.into(),
            locked: false,
            data,
            components: Vec::new(),
        }
    }

    pub fn wall(from: DVec2, to: DVec2, thickness: f64, height: f64) -> Self {
        Self::new(
            "Wall",
            EntityData::Wall {
                from,
                to,
                thickness,
                height,
                faces: WallFaces::compute(from, to, thickness),
            },
        )
    }

    /// Slab on a layer; `bottom` is the layer elevation
    pub fn slab(layer: LayerId, bottom: f64, thickness: f64, profile: Loop) -> Self {
        let faces = SlabFaces::compute(bottom, thickness, &profile);
        Self::new(
            "Slab",
            EntityData::Slab {
                layer,
                thickness,
                profile,
                faces,
            },
        )
    }

    pub fn roof(layer: LayerId, pitch: f64) -> Self {
        Self::new(
            "Roof",
            EntityData::Roof {
                layer,
                pitch,
                drawing_region: None,
            },
        )
    }

    pub fn roof_drawing_region(layer: LayerId, face: FaceId) -> Self {
        Self::new(
            "RoofDrawingRegion",
            EntityData::RoofDrawingRegion {
                layer,
                face,
                roof_id: None,
            },
        )
    }

    pub fn window(width: f64, height: f64, sill_height: f64) -> Self {
        Self::new(
            "Window",
            EntityData::Window {
                width,
                height,
                sill_height,
            },
        )
    }

    pub fn content(display_name: impl Into<String>, position: DVec3, size: DVec3) -> Self {
        Self::new(
            display_name,
            EntityData::Content {
                position,
                rotation: 0.0,
                size,
            },
        )
    }

    /// Builder-style: set the locked flag
    pub fn locked(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }

    /// Builder-style: attach a component
    pub fn with_component(mut self, component: Component) -> Self {
        self.attach(component);
        self
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn kind(&self) -> EntityKind {
        self.data.kind()
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn data(&self) -> &EntityData {
        &self.data
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// First component of the given type
    pub fn component(&self, component_type: &str) -> Option<&Component> {
        self.components
            .iter()
            .find(|c| c.component_type() == component_type)
    }

    /// Copy with a new id; components are re-attached to the copy
    pub fn duplicate(&self) -> Self {
        let mut copy = self.clone();
        copy.id = EntityId::new();
        for component in &mut copy.components {
            component.set_refer_object(Some(copy.id));
        }
        copy
    }

    /// JSON record of the entity and its components
    pub fn dump(&self) -> Value {
        let components: Vec<Value> = self.components.iter().map(Component::dump).collect();
        json!({
            "id": self.id,
            "kind": self.kind(),
            "displayName": self.display_name,
            "locked": self.locked,
            "data": self.data,
            "components": components,
        })
    }

    /// End of this wall lying at `point`
    pub fn wall_end_at(&self, point: DVec2, epsilon: f64) -> Option<WallEnd> {
        match &self.data {
            EntityData::Wall { from, .. } if geometry::coincide(*from, point, epsilon) => {
                Some(WallEnd::From)
            }
            EntityData::Wall { to, .. } if geometry::coincide(*to, point, epsilon) => {
                Some(WallEnd::To)
            }
            _ => None,
        }
    }

    // ============== Field Access ==============

    /// Whether a request may write `field`
    ///
    /// A locked entity only accepts changes to the lock itself.
    pub fn can_transact_field(&self, field: FieldName) -> bool {
        !self.locked || field == FieldName::Locked
    }

    /// Read a field; `None` when the field does not apply to this kind
    pub fn get_field(&self, field: FieldName) -> Option<FieldValue> {
        use FieldValue as V;

        match (field, &self.data) {
            (FieldName::DisplayName, _) => Some(V::Text(self.display_name.clone())),
            (FieldName::Locked, _) => Some(V::Bool(self.locked)),
            (FieldName::Thickness, EntityData::Wall { thickness, .. })
            | (FieldName::Thickness, EntityData::Slab { thickness, .. }) => Some(V::Float(*thickness)),
            (FieldName::Height, EntityData::Wall { height, .. })
            | (FieldName::Height, EntityData::Window { height, .. }) => Some(V::Float(*height)),
            (FieldName::Width, EntityData::Window { width, .. }) => Some(V::Float(*width)),
            (FieldName::SillHeight, EntityData::Window { sill_height, .. }) => {
                Some(V::Float(*sill_height))
            }
            (FieldName::Pitch, EntityData::Roof { pitch, .. }) => Some(V::Float(*pitch)),
            (FieldName::Position, EntityData::Content { position, .. }) => {
                Some(V::Vector(*position))
            }
            (FieldName::Rotation, EntityData::Content { rotation, .. }) => {
                Some(V::Float(*rotation))
            }
            (FieldName::From, EntityData::Wall { from, .. }) => Some(V::Point(*from)),
            (FieldName::To, EntityData::Wall { to, .. }) => Some(V::Point(*to)),
            (FieldName::RoofId, EntityData::RoofDrawingRegion { roof_id, .. }) => {
                Some(V::Id(*roof_id))
            }
            (FieldName::DrawingRegion, EntityData::Roof { drawing_region, .. }) => {
                Some(V::Id(*drawing_region))
            }
            _ => None,
        }
    }

    /// Write a field, refreshing derived geometry
    pub(crate) fn set_field(&mut self, field: FieldName, value: FieldValue) -> ModelResult<()> {
        let kind = self.kind();
        let mismatch = |expected: &'static str| ModelError::FieldTypeMismatch { field, expected };

        match (field, value) {
            (FieldName::DisplayName, FieldValue::Text(name)) => self.display_name = name,
            (FieldName::Locked, FieldValue::Bool(locked)) => self.locked = locked,
            (FieldName::DisplayName, _) => return Err(mismatch("text")),
            (FieldName::Locked, _) => return Err(mismatch("bool")),
            (field, value) => {
                let expected = match self.get_field(field) {
                    Some(current) => current.type_name(),
                    None => return Err(ModelError::FieldNotApplicable { kind, field }),
                };
                if value.type_name() != expected {
                    return Err(mismatch(expected));
                }
                self.set_data_field(field, value);
            }
        }
        Ok(())
    }

    /// Value type already checked against the current field
    fn set_data_field(&mut self, field: FieldName, value: FieldValue) {
        use FieldValue as V;

        match (&mut self.data, field, value) {
            (EntityData::Wall { thickness: slot, .. }, FieldName::Thickness, V::Float(v))
            | (EntityData::Slab { thickness: slot, .. }, FieldName::Thickness, V::Float(v))
            | (EntityData::Wall { height: slot, .. }, FieldName::Height, V::Float(v))
            | (EntityData::Window { height: slot, .. }, FieldName::Height, V::Float(v))
            | (EntityData::Window { width: slot, .. }, FieldName::Width, V::Float(v))
            | (EntityData::Window { sill_height: slot, .. }, FieldName::SillHeight, V::Float(v))
            | (EntityData::Roof { pitch: slot, .. }, FieldName::Pitch, V::Float(v))
            | (EntityData::Content { rotation: slot, .. }, FieldName::Rotation, V::Float(v)) => {
                *slot = v;
            }
            (EntityData::Content { position, .. }, FieldName::Position, V::Vector(v)) => {
                *position = v;
            }
            (EntityData::Wall { from: slot, .. }, FieldName::From, V::Point(p))
            | (EntityData::Wall { to: slot, .. }, FieldName::To, V::Point(p)) => *slot = p,
            (EntityData::RoofDrawingRegion { roof_id: slot, .. }, FieldName::RoofId, V::Id(id))
            | (EntityData::Roof { drawing_region: slot, .. }, FieldName::DrawingRegion, V::Id(id)) => {
                *slot = id;
            }
            _ => {}
        }
        self.refresh_derived();
    }

    /// Recompute derived faces from the primary fields
    pub(crate) fn refresh_derived(&mut self) {
        match &mut self.data {
            EntityData::Wall {
                from,
                to,
                thickness,
                faces,
                ..
            } => *faces = WallFaces::compute(*from, *to, *thickness),
            EntityData::Slab {
                thickness,
                profile,
                faces,
                ..
            } => *faces = SlabFaces::compute(faces.bottom, *thickness, profile),
            _ => {}
        }
    }

    /// Move the slab onto a new bottom elevation
    pub(crate) fn set_slab_bottom(&mut self, bottom: f64) {
        if let EntityData::Slab {
            thickness,
            profile,
            faces,
            ..
        } = &mut self.data
        {
            *faces = SlabFaces::compute(bottom, *thickness, profile);
        }
    }

    fn attach(&mut self, mut component: Component) {
        component.set_refer_object(Some(self.id));
        self.components.push(component);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentData;
    use approx::assert_relative_eq;

    fn desk() -> Entity {
        Entity::content("Desk", DVec3::ZERO, DVec3::new(1200.0, 600.0, 750.0)).with_component(
            Component::new(ComponentData::Material {
                name: "Oak".into(),
                color: [0.6, 0.4, 0.2, 1.0],
            }),
        )
    }

    #[test]
    fn test_wall_faces_follow_thickness() {
        let mut wall = Entity::wall(DVec2::ZERO, DVec2::new(4000.0, 0.0), 200.0, 2800.0);
        wall.set_field(FieldName::Thickness, FieldValue::Float(300.0))
            .unwrap();

        let EntityData::Wall { faces, .. } = wall.data() else {
            panic!("not a wall");
        };
        assert_relative_eq!(faces.left[0].y, 150.0);
        assert_relative_eq!(faces.right[1].y, -150.0);
        assert_relative_eq!(faces.right[1].x, 4000.0);
    }

    #[test]
    fn test_set_field_type_checks() {
        let mut window = Entity::window(900.0, 1500.0, 800.0);
        assert_eq!(
            window.set_field(FieldName::Width, FieldValue::Bool(true)),
            Err(ModelError::FieldTypeMismatch {
                field: FieldName::Width,
                expected: "float"
            })
        );
        assert_eq!(
            window.set_field(FieldName::Pitch, FieldValue::Float(30.0)),
            Err(ModelError::FieldNotApplicable {
                kind: EntityKind::Window,
                field: FieldName::Pitch
            })
        );

        window
            .set_field(FieldName::SillHeight, FieldValue::Float(900.0))
            .unwrap();
        assert_eq!(
            window.get_field(FieldName::SillHeight),
            Some(FieldValue::Float(900.0))
        );
        assert_eq!(window.get_field(FieldName::Width), Some(FieldValue::Float(900.0)));
    }

    #[test]
    fn test_locked_entity_only_accepts_unlock() {
        let wall = Entity::wall(DVec2::ZERO, DVec2::X, 100.0, 100.0).locked(true);
        assert!(!wall.can_transact_field(FieldName::Thickness));
        assert!(wall.can_transact_field(FieldName::Locked));
    }

    #[test]
    fn test_clone_reattaches_components() {
        let original = desk();
        let copy = original.clone();
        assert_eq!(copy, original);
        assert_eq!(copy.components()[0].owner(), Ok(original.id()));

        let dup = original.duplicate();
        assert_ne!(dup.id(), original.id());
        assert_eq!(dup.components()[0].owner(), Ok(dup.id()));
    }

    #[test]
    fn test_dump_record() {
        let entity = desk();
        let record = entity.dump();
        assert_eq!(record["displayName"], "Desk");
        assert_eq!(record["kind"], "Content");
        assert_eq!(record["components"][0]["tp"], "Material");
    }

    #[test]
    fn test_ron_round_trip() {
        let entity = desk();
        let text = ron::to_string(&entity).unwrap();
        let loaded: Entity = ron::from_str(&text).unwrap();
        assert_eq!(loaded, entity);
        assert_eq!(loaded.components()[0].owner(), Ok(entity.id()));
    }

    #[test]
    fn test_wall_end_at() {
        let wall = Entity::wall(DVec2::ZERO, DVec2::new(10.0, 0.0), 1.0, 1.0);
        assert_eq!(wall.wall_end_at(DVec2::ZERO, 1e-6), Some(WallEnd::From));
        assert_eq!(wall.wall_end_at(DVec2::new(10.0, 0.0), 1e-6), Some(WallEnd::To));
        assert_eq!(wall.wall_end_at(DVec2::new(5.0, 0.0), 1e-6), None);
    }
}
