//! Project file serialization

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::model::Model;

/// Current project file format version
pub const PROJECT_VERSION: u32 = 1;

/// Serialization format for backward compatibility
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProjectData {
    version: u32,
    name: String,
    model: Model,
}

/// Project file containing a model
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    /// File format version
    pub version: u32,
    /// Project name
    pub name: String,
    pub model: Model,
}

impl From<Project> for ProjectData {
    fn from(project: Project) -> Self {
        Self {
            version: project.version,
            name: project.name,
            model: project.model,
        }
    }
}

impl From<ProjectData> for Project {
    fn from(data: ProjectData) -> Self {
        Self {
            version: data.version,
            name: data.name,
            model: data.model,
        }
    }
}

impl Serialize for Project {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        ProjectData::from(self.clone()).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Project {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let data = ProjectData::deserialize(deserializer)?;
        Ok(Project::from(data))
    }
}

impl Default for Project {
    fn default() -> Self {
        Self::new("New Project", Model::default())
    }
}

impl Project {
    pub fn new(name: impl Into<String>, model: Model) -> Self {
        Self {
            version: PROJECT_VERSION,
            name: name.into(),
            model,
        }
    }

    /// Save project to a file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ProjectError> {
        let path = path.as_ref();
        let content = self.to_bytes()?;
        std::fs::write(path, content).map_err(|e| ProjectError::Io(e.to_string()))?;
        Ok(())
    }

    /// Serialize project to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, ProjectError> {
        let content = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ProjectError::Serialize(e.to_string()))?;
        Ok(content.into_bytes())
    }

    /// Load project from a file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProjectError> {
        let path = path.as_ref();
        let content = std::fs::read(path).map_err(|e| ProjectError::Io(e.to_string()))?;
        Self::load_from_bytes(&content)
    }

    /// Load project from bytes
    pub fn load_from_bytes(data: &[u8]) -> Result<Self, ProjectError> {
        let content =
            std::str::from_utf8(data).map_err(|e| ProjectError::Deserialize(e.to_string()))?;
        let project: Project =
            ron::from_str(content).map_err(|e| ProjectError::Deserialize(e.to_string()))?;
        if project.version > PROJECT_VERSION {
            return Err(ProjectError::UnsupportedVersion(project.version));
        }
        Ok(project)
    }
}

/// Project-related errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProjectError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialize(String),
    #[error("Deserialization error: {0}")]
    Deserialize(String),
    #[error("Unsupported project version: {0}")]
    UnsupportedVersion(u32),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{Component, ComponentData};
    use crate::entity::Entity;
    use crate::model::ModelBuilder;
    use glam::{DVec2, DVec3};

    fn sample_model() -> Model {
        let mut builder = ModelBuilder::new();
        let layer = builder.add_layer("1F", 0.0, 3000.0);
        builder
            .add_slab(
                layer,
                120.0,
                vec![
                    DVec2::ZERO,
                    DVec2::new(6000.0, 0.0),
                    DVec2::new(6000.0, 4000.0),
                    DVec2::new(0.0, 4000.0),
                ],
            )
            .unwrap();
        builder.add_entity(
            Entity::content("Sofa", DVec3::new(1000.0, 1000.0, 0.0), DVec3::ONE).with_component(
                Component::new(ComponentData::ParametricSize {
                    width: 2000.0,
                    depth: 900.0,
                    height: 800.0,
                }),
            ),
        );
        builder.build()
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("house.ron");

        let project = Project::new("House", sample_model());
        project.save(&path).unwrap();

        let loaded = Project::load(&path).unwrap();
        assert_eq!(loaded, project);
    }

    #[test]
    fn test_rejects_future_version() {
        let mut project = Project::default();
        project.version = PROJECT_VERSION + 1;
        let bytes = project.to_bytes().unwrap();
        assert!(matches!(
            Project::load_from_bytes(&bytes),
            Err(ProjectError::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn test_load_garbage() {
        assert!(matches!(
            Project::load_from_bytes(b"not a project"),
            Err(ProjectError::Deserialize(_))
        ));
    }
}
