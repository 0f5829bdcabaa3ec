//! Components attached to entities
//!
//! A component is owned by exactly one entity. It keeps a weak back-relation
//! to its owner (the owner's id, never a reference) and serialises to a JSON
//! record whose `tp` field names the component type.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::entity::EntityId;
use crate::error::{ModelError, ModelResult};

/// Component payload, tagged by `tp` in dumped records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tp")]
pub enum ComponentData {
    /// Surface material
    Material { name: String, color: [f32; 4] },
    /// Hosting entity (e.g. the wall a window sits in)
    Host { host: Option<EntityId> },
    /// Parametric bounding size (mm)
    ParametricSize { width: f64, depth: f64, height: f64 },
}

impl ComponentData {
    pub fn type_name(&self) -> &'static str {
        match self {
            ComponentData::Material { .. } => "Material",
            ComponentData::Host { .. } => "Host",
            ComponentData::ParametricSize { .. } => "ParametricSize",
        }
    }
}

/// A typed data unit owned by an entity
#[derive(Debug, PartialEq)]
pub struct Component {
    data: ComponentData,
    refer_object: Option<EntityId>,
}

impl Component {
    /// Create a component with no owner
    pub fn new(data: ComponentData) -> Self {
        Self {
            data,
            refer_object: None,
        }
    }

    /// Static type id
    pub fn component_type(&self) -> &'static str {
        self.data.type_name()
    }

    pub fn data(&self) -> &ComponentData {
        &self.data
    }

    /// Owner back-reference, if set
    pub fn refer_object(&self) -> Option<EntityId> {
        self.refer_object
    }

    /// Replace the owner back-reference
    pub fn set_refer_object(&mut self, owner: Option<EntityId>) {
        self.refer_object = owner;
    }

    /// Owning entity
    ///
    /// Fails when no owner has been attached yet.
    pub fn owner(&self) -> ModelResult<EntityId> {
        self.refer_object
            .ok_or(ModelError::ComponentOwnerUnset(self.component_type()))
    }

    /// Deep copy without an owner
    pub fn clone_detached(&self) -> Self {
        Self::new(self.data.clone())
    }

    /// Serialisable record `{ "tp": <type>, ...fields }`
    pub fn dump(&self) -> Value {
        match &self.data {
            ComponentData::Material { name, color } => json!({
                "tp": "Material",
                "name": name,
                "color": color,
            }),
            ComponentData::Host { host } => json!({
                "tp": "Host",
                "host": host,
            }),
            ComponentData::ParametricSize {
                width,
                depth,
                height,
            } => json!({
                "tp": "ParametricSize",
                "width": width,
                "depth": depth,
                "height": height,
            }),
        }
    }

    /// Rebuild a component from a dumped record (no owner)
    pub fn load(record: &Value) -> ModelResult<Self> {
        let data = ComponentData::deserialize(record)
            .map_err(|e| ModelError::InvalidComponent(e.to_string()))?;
        Ok(Self::new(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_must_be_set() {
        let mut component = Component::new(ComponentData::Host { host: None });
        assert_eq!(
            component.owner(),
            Err(ModelError::ComponentOwnerUnset("Host"))
        );

        let owner = EntityId::new();
        component.set_refer_object(Some(owner));
        assert_eq!(component.owner(), Ok(owner));
    }

    #[test]
    fn test_clone_is_detached() {
        let mut component = Component::new(ComponentData::Material {
            name: "Oak".into(),
            color: [0.6, 0.4, 0.2, 1.0],
        });
        component.set_refer_object(Some(EntityId::new()));

        let copy = component.clone_detached();
        assert_eq!(copy.data(), component.data());
        assert_eq!(copy.refer_object(), None);
    }

    #[test]
    fn test_dump_and_load() {
        let component = Component::new(ComponentData::ParametricSize {
            width: 1200.0,
            depth: 600.0,
            height: 750.0,
        });
        let record = component.dump();
        assert_eq!(record["tp"], "ParametricSize");
        assert_eq!(record["width"], 1200.0);

        let loaded = Component::load(&record).unwrap();
        assert_eq!(loaded, component);
    }

    #[test]
    fn test_load_rejects_unknown_type() {
        let record = json!({ "tp": "Teleporter" });
        assert!(matches!(
            Component::load(&record),
            Err(ModelError::InvalidComponent(_))
        ));
    }
}
