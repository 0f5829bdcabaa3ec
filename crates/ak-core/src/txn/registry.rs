//! Request registry
//!
//! Maps a [`RequestType`] key to the factory that turns raw
//! [`RequestData`] into a request. Every built-in type is registered by
//! default; hosts may override or remove entries.

use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use super::error::{TxnError, TxnResult};
use super::request::{Request, RequestData, RequestType};
use super::requests;

/// Builds a request from its raw data
pub type RequestFactory =
    fn(&RequestRegistry, RequestType, RequestData) -> TxnResult<Box<dyn Request>>;

/// Request type → factory table
#[derive(Clone)]
pub struct RequestRegistry {
    factories: HashMap<RequestType, RequestFactory>,
}

impl fmt::Debug for RequestRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.factories.keys().map(|t| t.as_str()).collect();
        keys.sort_unstable();
        f.debug_struct("RequestRegistry")
            .field("types", &keys)
            .finish()
    }
}

impl Default for RequestRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RequestRegistry {
    /// Registry with no factories
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry with every built-in request type
    pub fn builtin() -> Self {
        Self {
            factories: requests::builtin_factories().into_iter().collect(),
        }
    }

    /// Register a factory, returning the one it replaces
    pub fn register(
        &mut self,
        request_type: RequestType,
        factory: RequestFactory,
    ) -> Option<RequestFactory> {
        debug!(request = %request_type, "Registering request factory");
        self.factories.insert(request_type, factory)
    }

    pub fn unregister(&mut self, request_type: RequestType) -> Option<RequestFactory> {
        self.factories.remove(&request_type)
    }

    pub fn is_registered(&self, request_type: RequestType) -> bool {
        self.factories.contains_key(&request_type)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Build a request of a registered type
    pub fn create_request(
        &self,
        request_type: RequestType,
        data: RequestData,
    ) -> TxnResult<Box<dyn Request>> {
        let factory = self
            .factories
            .get(&request_type)
            .ok_or_else(|| TxnError::UnregisteredRequestType(request_type.to_string()))?;
        factory(self, request_type, data)
    }

    /// Build a request from its string key
    pub fn create_request_by_key(&self, key: &str, data: RequestData) -> TxnResult<Box<dyn Request>> {
        self.create_request(key.parse()?, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityId, FieldName, FieldRef, FieldValue};

    fn rename_data() -> RequestData {
        RequestData::Rename {
            entity: EntityId::new(),
            name: "Sofa-2".into(),
        }
    }

    #[test]
    fn test_builtin_covers_every_type() {
        let registry = RequestRegistry::default();
        assert_eq!(registry.len(), RequestType::ALL.len());
        for ty in RequestType::ALL {
            assert!(registry.is_registered(ty), "{ty} missing");
        }
    }

    #[test]
    fn test_create_by_key() {
        let registry = RequestRegistry::builtin();
        let request = registry
            .create_request_by_key("RenameContent", rename_data())
            .unwrap();
        assert_eq!(request.request_type(), RequestType::RenameContent);

        assert!(matches!(
            registry.create_request_by_key("Teleport", rename_data()),
            Err(TxnError::UnregisteredRequestType(key)) if key == "Teleport"
        ));
    }

    #[test]
    fn test_unregistered_and_malformed() {
        let mut registry = RequestRegistry::builtin();
        assert!(registry.unregister(RequestType::RenameContent).is_some());
        assert!(matches!(
            registry.create_request(RequestType::RenameContent, rename_data()),
            Err(TxnError::UnregisteredRequestType(_))
        ));

        assert!(matches!(
            registry.create_request(RequestType::SetField, rename_data()),
            Err(TxnError::MalformedRequestData {
                request: RequestType::SetField,
                ..
            })
        ));
    }

    #[test]
    fn test_register_override() {
        fn always_set_field(
            registry: &RequestRegistry,
            _: RequestType,
            data: RequestData,
        ) -> TxnResult<Box<dyn Request>> {
            let RequestData::Rename { entity, name } = data else {
                return Err(TxnError::UnregisteredRequestType("override".into()));
            };
            registry.create_request(
                RequestType::SetField,
                RequestData::SetField {
                    target: FieldRef::new(entity, FieldName::DisplayName),
                    value: FieldValue::Text(name),
                },
            )
        }

        let mut registry = RequestRegistry::builtin();
        assert!(registry
            .register(RequestType::RenameContent, always_set_field)
            .is_some());
        let request = registry
            .create_request(RequestType::RenameContent, rename_data())
            .unwrap();
        assert_eq!(request.request_type(), RequestType::SetField);
    }

    #[test]
    fn test_composite_children_built_through_registry() {
        let registry = RequestRegistry::builtin();
        let request = registry
            .create_request(
                RequestType::Composite,
                RequestData::Composite(vec![
                    (RequestType::RenameContent, rename_data()),
                    (RequestType::RecycleEntity, RequestData::EntityRef(EntityId::new())),
                ]),
            )
            .unwrap();
        assert_eq!(request.request_type(), RequestType::Composite);
    }
}
