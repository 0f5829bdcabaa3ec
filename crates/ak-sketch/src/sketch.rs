//! Sketch storage
//!
//! A [`Sketch2d`] owns an ordered list of tagged faces plus the derived
//! appendix (base info, neighbour links, hole hosts) that builders refresh
//! after every edit.

use std::collections::BTreeMap;
use std::fmt;

use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::boolean::Region;
use crate::geometry::{self, Loop};
use crate::tag::{TopoRole, TopoTag};

/// Unique identifier for a sketch face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FaceId(pub Uuid);

impl FaceId {
    /// Create a new random face ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FaceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A tagged planar face
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Face {
    pub id: FaceId,
    /// Outer boundary (counter-clockwise)
    pub outer: Loop,
    /// Inner boundaries (clockwise)
    pub holes: Vec<Loop>,
    /// Topology tag
    pub tag: TopoTag,
}

impl Face {
    /// Create a new face
    pub fn new(id: FaceId, outer: Loop, holes: Vec<Loop>, tag: TopoTag) -> Self {
        Self {
            id,
            outer,
            holes,
            tag,
        }
    }

    /// Create a face from a region
    pub fn from_region(id: FaceId, region: Region, tag: TopoTag) -> Self {
        Self::new(id, region.outer, region.holes, tag)
    }

    /// Geometry of this face as a region
    pub fn region(&self) -> Region {
        Region {
            outer: self.outer.clone(),
            holes: self.holes.clone(),
        }
    }

    /// Net area
    pub fn area(&self) -> f64 {
        self.region().area()
    }

    /// All loops, outer first
    pub fn loops(&self) -> impl Iterator<Item = &Loop> {
        std::iter::once(&self.outer).chain(self.holes.iter())
    }

    /// Mutable access to all loops, outer first
    pub(crate) fn loops_mut(&mut self) -> impl Iterator<Item = &mut Loop> {
        std::iter::once(&mut self.outer).chain(self.holes.iter_mut())
    }
}

/// Plane that carries the sketch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SupportingSurface {
    /// Elevation of the plane (mm)
    pub elevation: f64,
    /// Plane normal
    pub normal: DVec3,
}

impl Default for SupportingSurface {
    fn default() -> Self {
        Self::horizontal(0.0)
    }
}

impl SupportingSurface {
    /// Horizontal plane facing up at the given elevation
    pub fn horizontal(elevation: f64) -> Self {
        Self {
            elevation,
            normal: DVec3::Z,
        }
    }
}

/// Derived data of one face
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseInfo {
    /// Outer path
    pub outer: Loop,
    /// Inner paths (holes)
    pub inner: Vec<Loop>,
    /// Supporting surface
    pub surface: SupportingSurface,
    /// Whether the outer path winds with the surface normal
    pub same_direction: bool,
}

impl BaseInfo {
    /// Compute base info of a face on a surface
    pub fn compute(face: &Face, surface: SupportingSurface) -> Self {
        let ccw = geometry::signed_area(&face.outer) > 0.0;
        Self {
            outer: face.outer.clone(),
            inner: face.holes.clone(),
            surface,
            same_direction: ccw == (surface.normal.z >= 0.0),
        }
    }
}

/// Derived topology of a sketch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SketchAppendix {
    /// Base info per face
    pub base_infos: BTreeMap<FaceId, BaseInfo>,
    /// Faces sharing at least one edge
    pub neighbors: BTreeMap<FaceId, Vec<FaceId>>,
    /// Hole region -> face that hosts it
    pub hole_hosts: BTreeMap<FaceId, FaceId>,
}

/// A 2D sketch with tagged faces
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sketch2d {
    faces: Vec<Face>,
    surface: SupportingSurface,
    appendix: SketchAppendix,
}

impl Sketch2d {
    /// Create an empty sketch on a surface
    pub fn new(surface: SupportingSurface) -> Self {
        Self {
            faces: Vec::new(),
            surface,
            appendix: SketchAppendix::default(),
        }
    }

    /// Get the number of faces
    pub fn len(&self) -> usize {
        self.faces.len()
    }

    /// Check if the sketch has no faces
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// All faces in insertion order
    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    /// Get a face by ID
    pub fn face(&self, id: FaceId) -> Option<&Face> {
        self.faces.iter().find(|f| f.id == id)
    }

    /// Faces tagged with `role`
    pub fn faces_with_role(&self, role: TopoRole) -> impl Iterator<Item = &Face> {
        crate::tag::filter_faces(&self.faces, role)
    }

    /// Faces whose loops contain a vertex at `point`
    pub fn faces_at_point(&self, point: DVec2, epsilon: f64) -> impl Iterator<Item = &Face> {
        self.faces.iter().filter(move |f| {
            f.loops()
                .any(|l| l.iter().any(|p| geometry::coincide(*p, point, epsilon)))
        })
    }

    /// Supporting surface
    pub fn surface(&self) -> SupportingSurface {
        self.surface
    }

    /// Move the sketch onto another surface
    ///
    /// Derived data goes stale until the next builder refresh.
    pub fn set_surface(&mut self, surface: SupportingSurface) {
        self.surface = surface;
    }

    /// Derived topology
    pub fn appendix(&self) -> &SketchAppendix {
        &self.appendix
    }

    /// Base info of a face
    pub fn base_info(&self, id: FaceId) -> Option<&BaseInfo> {
        self.appendix.base_infos.get(&id)
    }

    /// Neighbours of a face
    pub fn neighbors(&self, id: FaceId) -> &[FaceId] {
        self.appendix
            .neighbors
            .get(&id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Face hosting a hole region
    pub fn hole_host(&self, id: FaceId) -> Option<FaceId> {
        self.appendix.hole_hosts.get(&id).copied()
    }

    pub(crate) fn faces_mut(&mut self) -> &mut Vec<Face> {
        &mut self.faces
    }

    pub(crate) fn face_mut(&mut self, id: FaceId) -> Option<&mut Face> {
        self.faces.iter_mut().find(|f| f.id == id)
    }

    pub(crate) fn set_appendix(&mut self, appendix: SketchAppendix) {
        self.appendix = appendix;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_info_orientation() {
        let outer = vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(1.0, 0.0),
            DVec2::new(1.0, 1.0),
        ];
        let face = Face::new(FaceId::new(), outer, Vec::new(), TopoTag::drawn(TopoRole::Face));

        let up = BaseInfo::compute(&face, SupportingSurface::horizontal(100.0));
        assert!(up.same_direction);
        assert_eq!(up.surface.elevation, 100.0);

        let down = SupportingSurface {
            elevation: 0.0,
            normal: DVec3::NEG_Z,
        };
        assert!(!BaseInfo::compute(&face, down).same_direction);
    }

    #[test]
    fn test_faces_at_point() {
        let mut sketch = Sketch2d::default();
        let face = Face::new(
            FaceId::new(),
            vec![DVec2::ZERO, DVec2::X, DVec2::ONE],
            Vec::new(),
            TopoTag::drawn(TopoRole::Region),
        );
        let id = face.id;
        sketch.faces_mut().push(face);

        let hits: Vec<_> = sketch.faces_at_point(DVec2::X, 1e-6).map(|f| f.id).collect();
        assert_eq!(hits, vec![id]);
        assert_eq!(sketch.faces_at_point(DVec2::Y, 1e-6).count(), 0);
    }
}
