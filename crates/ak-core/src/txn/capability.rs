//! Edit capabilities
//!
//! Commands that only differ in which request they build, which topology
//! role they may touch and how they are labelled are described by one
//! [`EditCapability`] record instead of a dedicated type each.

use std::fmt;

use ak_sketch::{BuilderKind, TopoRole};
use serde::{Deserialize, Serialize};

use super::request::{RequestType, SketchOp};

/// Log group used to filter and aggregate the undo history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogCategory {
    WallOperation,
    RoofsDrawing,
    OutdoorDrawing,
    ContentOperation,
    SlabEdit,
    General,
}

impl LogCategory {
    pub const fn as_str(&self) -> &'static str {
        match self {
            LogCategory::WallOperation => "WallOperation",
            LogCategory::RoofsDrawing => "RoofsDrawing",
            LogCategory::OutdoorDrawing => "OutdoorDrawing",
            LogCategory::ContentOperation => "ContentOperation",
            LogCategory::SlabEdit => "SlabEdit",
            LogCategory::General => "General",
        }
    }
}

impl fmt::Display for LogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a generic edit command builds and how it is labelled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditCapability {
    pub request_type: RequestType,
    /// Only faces with this role may be touched
    pub topo_filter: Option<TopoRole>,
    pub description: &'static str,
    pub category: LogCategory,
}

impl EditCapability {
    /// Capability labelled like its request type
    pub const fn new(request_type: RequestType, topo_filter: Option<TopoRole>) -> Self {
        Self {
            request_type,
            topo_filter,
            description: request_type.description(),
            category: request_type.category(),
        }
    }

    pub const SET_FIELD: Self = Self::new(RequestType::SetField, None);
    pub const CREATE_ENTITY: Self = Self::new(RequestType::CreateEntity, None);
    pub const DELETE_ENTITY: Self = Self::new(RequestType::DeleteEntity, None);
    pub const RECYCLE_ENTITY: Self = Self::new(RequestType::RecycleEntity, None);
    pub const RESTORE_ENTITY: Self = Self::new(RequestType::RestoreEntity, None);
    pub const RENAME_CONTENT: Self = Self::new(RequestType::RenameContent, None);
    pub const SLAB_THICKNESS: Self = Self::new(RequestType::ChangeSlabThickness, None);
    pub const ROOF_RELATION: Self = Self::new(RequestType::UpdateRoofRelation, None);
    pub const WALL_POINT: Self = Self::new(RequestType::MoveWallPoint, None);

    pub const OUTDOOR_DRAW: Self = Self::sketch(BuilderKind::OutdoorDrawing, SketchOp::Draw);
    pub const OUTDOOR_MOVE_POINT: Self =
        Self::sketch(BuilderKind::OutdoorDrawing, SketchOp::MovePoint);
    pub const OUTDOOR_MOVE_CURVE: Self =
        Self::sketch(BuilderKind::OutdoorDrawing, SketchOp::MoveCurve);
    pub const ROOF_DRAW: Self = Self::sketch(BuilderKind::RoofsDrawing, SketchOp::Draw);
    pub const ROOF_MOVE_POINT: Self = Self::sketch(BuilderKind::RoofsDrawing, SketchOp::MovePoint);
    pub const ROOF_MOVE_CURVE: Self = Self::sketch(BuilderKind::RoofsDrawing, SketchOp::MoveCurve);
    pub const SLAB_HOLE_DRAW: Self = Self::sketch(BuilderKind::Layer, SketchOp::Draw);
    pub const SLAB_HOLE_MOVE_POINT: Self = Self::sketch(BuilderKind::Layer, SketchOp::MovePoint);
    pub const SLAB_HOLE_MOVE_CURVE: Self = Self::sketch(BuilderKind::Layer, SketchOp::MoveCurve);

    /// Sketch edit on a builder kind; moves are filtered to the role the
    /// builder stamps on drawn regions
    pub const fn sketch(kind: BuilderKind, op: SketchOp) -> Self {
        let topo_filter = match op {
            SketchOp::Draw => None,
            SketchOp::MovePoint | SketchOp::MoveCurve => Some(kind.draw_role()),
        };
        Self::new(RequestType::sketch_edit(kind, op), topo_filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_literals() {
        assert_eq!(LogCategory::WallOperation.as_str(), "WallOperation");
        assert_eq!(LogCategory::RoofsDrawing.as_str(), "RoofsDrawing");
        assert_eq!(LogCategory::OutdoorDrawing.as_str(), "OutdoorDrawing");
        assert_eq!(LogCategory::ContentOperation.to_string(), "ContentOperation");
    }

    #[test]
    fn test_move_capabilities_filter_by_role() {
        assert_eq!(EditCapability::ROOF_MOVE_POINT.topo_filter, Some(TopoRole::Region));
        assert_eq!(EditCapability::OUTDOOR_MOVE_CURVE.topo_filter, Some(TopoRole::Face));
        assert_eq!(EditCapability::SLAB_HOLE_MOVE_POINT.topo_filter, Some(TopoRole::Hole));
        assert_eq!(EditCapability::ROOF_DRAW.topo_filter, None);

        assert_eq!(EditCapability::ROOF_MOVE_POINT.category, LogCategory::RoofsDrawing);
        assert_eq!(
            EditCapability::OUTDOOR_MOVE_POINT.request_type,
            RequestType::MoveOutdoorPoint
        );
    }

    #[test]
    fn test_rename_labels() {
        let capability = EditCapability::RENAME_CONTENT;
        assert_eq!(capability.description, "模型重命名");
        assert_eq!(capability.category, LogCategory::ContentOperation);
    }
}
