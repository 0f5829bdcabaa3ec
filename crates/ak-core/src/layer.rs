//! Building layers (storeys)

use std::fmt;

use ak_sketch::{Sketch2d, SupportingSurface};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(pub Uuid);

impl LayerId {
    /// Create a new random layer ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A storey with its slab sketch and roof drawing sketch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    /// Floor elevation (mm)
    pub elevation: f64,
    /// Storey height (mm)
    pub height: f64,
    /// Slab profiles (`faceTopo`) and slab holes (`holeTopo`)
    pub sketch: Sketch2d,
    /// Roof drawing regions (`regionTopo`)
    pub roofs_drawing: Sketch2d,
}

impl Layer {
    pub fn new(name: impl Into<String>, elevation: f64, height: f64) -> Self {
        Self {
            id: LayerId::new(),
            name: name.into(),
            elevation,
            height,
            sketch: Sketch2d::new(SupportingSurface::horizontal(elevation)),
            roofs_drawing: Sketch2d::new(SupportingSurface::horizontal(elevation + height)),
        }
    }

    /// Elevation of the next storey's floor
    pub fn top(&self) -> f64 {
        self.elevation + self.height
    }
}
