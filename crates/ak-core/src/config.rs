//! Kernel configuration
//!
//! Settings are serialized as RON and can be loaded from a file or a string.
//! Missing sections fall back to their defaults.

use std::path::Path;

use ak_sketch::BuilderOptions;
use serde::{Deserialize, Serialize};

/// Geometry tolerances
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    /// Point coincidence tolerance (mm)
    pub epsilon: f64,
    /// Faces below this area are dropped from drawing sketches (mm²)
    pub min_face_area: f64,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            epsilon: 1e-6,
            min_face_area: 1e-4,
        }
    }
}

/// Limits enforced by the slab thickness command
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlabConfig {
    /// Minimum slab thickness (mm)
    pub min_thickness: f64,
    /// Maximum slab thickness (mm)
    pub max_thickness: f64,
}

impl Default for SlabConfig {
    fn default() -> Self {
        Self {
            min_thickness: 1.0,
            max_thickness: 2000.0,
        }
    }
}

impl SlabConfig {
    pub fn accepts(&self, thickness: f64) -> bool {
        (self.min_thickness..=self.max_thickness).contains(&thickness)
    }
}

/// Complete kernel configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Maximum number of undo steps kept
    pub history_limit: usize,
    /// Always merge consecutive edits of the same field into one undo step;
    /// otherwise only inside a compose window
    pub compose_edits: bool,
    pub geometry: GeometryConfig,
    pub slab: SlabConfig,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            history_limit: 100,
            compose_edits: false,
            geometry: GeometryConfig::default(),
            slab: SlabConfig::default(),
        }
    }
}

impl KernelConfig {
    /// Parse configuration from RON text
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        ron::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load configuration from a RON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_ron_str(&content)
    }

    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Save configuration to a RON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let content = self.to_ron_string()?;
        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Io(e.to_string()))
    }

    /// Tolerances handed to sketch builders
    pub fn builder_options(&self) -> BuilderOptions {
        BuilderOptions {
            epsilon: self.geometry.epsilon,
            min_face_area: self.geometry.min_face_area,
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Serialization error: {0}")]
    Serialize(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = KernelConfig::default();
        assert_eq!(config.history_limit, 100);
        assert!(!config.compose_edits);
        assert!(config.slab.accepts(120.0));
        assert!(!config.slab.accepts(0.0));
        assert!(!config.slab.accepts(2500.0));
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let config = KernelConfig::from_ron_str("(history_limit: 5, slab: (max_thickness: 300.0))")
            .unwrap();
        assert_eq!(config.history_limit, 5);
        assert!(!config.compose_edits);
        assert_eq!(config.slab.min_thickness, 1.0);
        assert_eq!(config.slab.max_thickness, 300.0);
        assert_eq!(config.geometry, GeometryConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kernel.ron");

        let config = KernelConfig {
            history_limit: 12,
            compose_edits: true,
            ..KernelConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(KernelConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_ron() {
        assert!(matches!(
            KernelConfig::from_ron_str("(history_limit: \"many\")"),
            Err(ConfigError::Parse(_))
        ));
    }
}
