//! Requests and their state machine
//!
//! A request captures `before`/`after` state for one logical change. It
//! applies `after` on commit, reapplies `before` on undo and `after` on redo.
//! [`TrackedRequest`] enforces the legal order of those calls:
//!
//! ```text
//! Constructed --commit--> Committed --undo--> Undone <--redo/undo--> Redone
//! ```

use std::any::Any;
use std::fmt;
use std::str::FromStr;

use ak_sketch::{BuilderKind, Loop, TopoRole};
use glam::DVec2;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::capability::LogCategory;
use super::error::{TxnError, TxnResult};
use super::requests::RoofRelation;
use crate::entity::{Entity, EntityId, FieldRef, FieldValue};
use crate::layer::LayerId;
use crate::model::Model;
use crate::txn_type::EntityTransactionType;

// ============== Request Types ==============

/// Geometry operation of a sketch edit request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SketchOp {
    Draw,
    MovePoint,
    MoveCurve,
}

/// Registry key of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum RequestType {
    SetField,
    Composite,
    CreateEntity,
    DeleteEntity,
    RecycleEntity,
    RestoreEntity,
    ChangeSlabThickness,
    RenameContent,
    DrawOutdoorRegions,
    MoveOutdoorPoint,
    MoveOutdoorCurve,
    DrawRoofRegions,
    MoveRoofPoint,
    MoveRoofCurve,
    DrawSlabHoles,
    MoveSlabHolePoint,
    MoveSlabHoleCurve,
    UpdateRoofRelation,
    MoveWallPoint,
}

impl RequestType {
    pub const ALL: [RequestType; 19] = [
        RequestType::SetField,
        RequestType::Composite,
        RequestType::CreateEntity,
        RequestType::DeleteEntity,
        RequestType::RecycleEntity,
        RequestType::RestoreEntity,
        RequestType::ChangeSlabThickness,
        RequestType::RenameContent,
        RequestType::DrawOutdoorRegions,
        RequestType::MoveOutdoorPoint,
        RequestType::MoveOutdoorCurve,
        RequestType::DrawRoofRegions,
        RequestType::MoveRoofPoint,
        RequestType::MoveRoofCurve,
        RequestType::DrawSlabHoles,
        RequestType::MoveSlabHolePoint,
        RequestType::MoveSlabHoleCurve,
        RequestType::UpdateRoofRelation,
        RequestType::MoveWallPoint,
    ];

    /// Registry key
    pub const fn as_str(&self) -> &'static str {
        match self {
            RequestType::SetField => "SetField",
            RequestType::Composite => "Composite",
            RequestType::CreateEntity => "CreateEntity",
            RequestType::DeleteEntity => "DeleteEntity",
            RequestType::RecycleEntity => "RecycleEntity",
            RequestType::RestoreEntity => "RestoreEntity",
            RequestType::ChangeSlabThickness => "ChangeSlabThickness",
            RequestType::RenameContent => "RenameContent",
            RequestType::DrawOutdoorRegions => "DrawOutdoorRegions",
            RequestType::MoveOutdoorPoint => "MoveOutdoorPoint",
            RequestType::MoveOutdoorCurve => "MoveOutdoorCurve",
            RequestType::DrawRoofRegions => "DrawRoofRegions",
            RequestType::MoveRoofPoint => "MoveRoofPoint",
            RequestType::MoveRoofCurve => "MoveRoofCurve",
            RequestType::DrawSlabHoles => "DrawSlabHoles",
            RequestType::MoveSlabHolePoint => "MoveSlabHolePoint",
            RequestType::MoveSlabHoleCurve => "MoveSlabHoleCurve",
            RequestType::UpdateRoofRelation => "UpdateRoofRelation",
            RequestType::MoveWallPoint => "MoveWallPoint",
        }
    }

    /// History description of requests of this type
    pub const fn description(&self) -> &'static str {
        match self {
            RequestType::SetField => "修改属性",
            RequestType::Composite => "组合修改",
            RequestType::CreateEntity => "新建对象",
            RequestType::DeleteEntity => "删除对象",
            RequestType::RecycleEntity => "移入回收站",
            RequestType::RestoreEntity => "从回收站恢复",
            RequestType::ChangeSlabThickness => "修改楼板厚度",
            RequestType::RenameContent => "模型重命名",
            RequestType::DrawOutdoorRegions => "绘制室外区域",
            RequestType::MoveOutdoorPoint => "室外区域移动点",
            RequestType::MoveOutdoorCurve => "室外区域移动线",
            RequestType::DrawRoofRegions => "绘制屋顶区域",
            RequestType::MoveRoofPoint => "屋顶区域移动点",
            RequestType::MoveRoofCurve => "屋顶区域移动线",
            RequestType::DrawSlabHoles => "楼板开洞",
            RequestType::MoveSlabHolePoint => "楼板洞移动点",
            RequestType::MoveSlabHoleCurve => "楼板洞移动线",
            RequestType::UpdateRoofRelation => "更新屋顶关联",
            RequestType::MoveWallPoint => "通过墙体连接点移动墙体",
        }
    }

    /// Log group of requests of this type
    pub const fn category(&self) -> LogCategory {
        match self {
            RequestType::SetField
            | RequestType::Composite
            | RequestType::CreateEntity
            | RequestType::DeleteEntity
            | RequestType::RecycleEntity
            | RequestType::RestoreEntity => LogCategory::General,
            RequestType::ChangeSlabThickness
            | RequestType::DrawSlabHoles
            | RequestType::MoveSlabHolePoint
            | RequestType::MoveSlabHoleCurve => LogCategory::SlabEdit,
            RequestType::RenameContent => LogCategory::ContentOperation,
            RequestType::DrawOutdoorRegions
            | RequestType::MoveOutdoorPoint
            | RequestType::MoveOutdoorCurve => LogCategory::OutdoorDrawing,
            RequestType::DrawRoofRegions
            | RequestType::MoveRoofPoint
            | RequestType::MoveRoofCurve
            | RequestType::UpdateRoofRelation => LogCategory::RoofsDrawing,
            RequestType::MoveWallPoint => LogCategory::WallOperation,
        }
    }

    /// Request type editing a sketch of the given kind
    pub const fn sketch_edit(kind: BuilderKind, op: SketchOp) -> RequestType {
        match (kind, op) {
            (BuilderKind::OutdoorDrawing, SketchOp::Draw) => RequestType::DrawOutdoorRegions,
            (BuilderKind::OutdoorDrawing, SketchOp::MovePoint) => RequestType::MoveOutdoorPoint,
            (BuilderKind::OutdoorDrawing, SketchOp::MoveCurve) => RequestType::MoveOutdoorCurve,
            (BuilderKind::RoofsDrawing, SketchOp::Draw) => RequestType::DrawRoofRegions,
            (BuilderKind::RoofsDrawing, SketchOp::MovePoint) => RequestType::MoveRoofPoint,
            (BuilderKind::RoofsDrawing, SketchOp::MoveCurve) => RequestType::MoveRoofCurve,
            (BuilderKind::Layer, SketchOp::Draw) => RequestType::DrawSlabHoles,
            (BuilderKind::Layer, SketchOp::MovePoint) => RequestType::MoveSlabHolePoint,
            (BuilderKind::Layer, SketchOp::MoveCurve) => RequestType::MoveSlabHoleCurve,
        }
    }

    /// Sketch kind and operation of a sketch edit type
    pub const fn as_sketch_edit(&self) -> Option<(BuilderKind, SketchOp)> {
        let edit = match self {
            RequestType::DrawOutdoorRegions => (BuilderKind::OutdoorDrawing, SketchOp::Draw),
            RequestType::MoveOutdoorPoint => (BuilderKind::OutdoorDrawing, SketchOp::MovePoint),
            RequestType::MoveOutdoorCurve => (BuilderKind::OutdoorDrawing, SketchOp::MoveCurve),
            RequestType::DrawRoofRegions => (BuilderKind::RoofsDrawing, SketchOp::Draw),
            RequestType::MoveRoofPoint => (BuilderKind::RoofsDrawing, SketchOp::MovePoint),
            RequestType::MoveRoofCurve => (BuilderKind::RoofsDrawing, SketchOp::MoveCurve),
            RequestType::DrawSlabHoles => (BuilderKind::Layer, SketchOp::Draw),
            RequestType::MoveSlabHolePoint => (BuilderKind::Layer, SketchOp::MovePoint),
            RequestType::MoveSlabHoleCurve => (BuilderKind::Layer, SketchOp::MoveCurve),
            _ => return None,
        };
        Some(edit)
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestType {
    type Err = TxnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RequestType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| TxnError::UnregisteredRequestType(s.to_string()))
    }
}

impl From<RequestType> for String {
    fn from(value: RequestType) -> Self {
        value.as_str().to_string()
    }
}

impl TryFrom<String> for RequestType {
    type Error = TxnError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// ============== Request Data ==============

/// Raw edit data handed to a request factory
#[derive(Debug, Clone)]
pub enum RequestData {
    SetField {
        target: FieldRef,
        value: FieldValue,
    },
    /// Child requests of a composite request
    Composite(Vec<(RequestType, RequestData)>),
    /// Entity to create
    Entity(Entity),
    /// Entity to delete, recycle or restore
    EntityRef(EntityId),
    SlabThickness {
        slab: EntityId,
        thickness: f64,
    },
    Rename {
        entity: EntityId,
        name: String,
    },
    /// `layer` is required for slab and roof sketches
    DrawPolygons {
        layer: Option<LayerId>,
        polygons: Vec<Loop>,
    },
    MovePoint {
        layer: Option<LayerId>,
        from: DVec2,
        to: DVec2,
        filter: Option<TopoRole>,
    },
    MoveCurve {
        layer: Option<LayerId>,
        start: DVec2,
        end: DVec2,
        offset: DVec2,
        filter: Option<TopoRole>,
    },
    RoofRelations(Vec<RoofRelation>),
    WallPoint {
        wall: EntityId,
        from: DVec2,
        to: DVec2,
    },
}

impl RequestData {
    /// Replace the topology filter of move data
    pub fn with_filter(mut self, role: TopoRole) -> Self {
        if let RequestData::MovePoint { filter, .. } | RequestData::MoveCurve { filter, .. } =
            &mut self
        {
            *filter = Some(role);
        }
        self
    }
}

// ============== Request ==============

/// Atomic, reversible unit of model mutation
///
/// Implementations must be deterministic: `on_redo` leaves the model in the
/// same state as `on_commit` did.
pub trait Request: fmt::Debug {
    fn request_type(&self) -> RequestType;

    fn description(&self) -> &'static str {
        self.request_type().description()
    }

    fn category(&self) -> LogCategory {
        self.request_type().category()
    }

    /// Fields this request will write when committed against `model`
    fn touched_fields(&self, _model: &Model) -> Vec<FieldRef> {
        Vec::new()
    }

    /// Entities changed by the last commit, with their classification
    fn entity_changes(&self) -> Vec<(EntityId, EntityTransactionType)> {
        Vec::new()
    }

    fn on_commit(&mut self, model: &mut Model) -> TxnResult<()>;

    fn on_undo(&mut self, model: &mut Model) -> TxnResult<()>;

    fn on_redo(&mut self, model: &mut Model) -> TxnResult<()>;

    /// Whether the last commit changed the model
    ///
    /// Requests that found nothing to do are not kept in the history.
    fn has_effect(&self) -> bool {
        true
    }

    /// Merge with a request committed right after this one
    ///
    /// The merged request has this request's before-state and `next`'s
    /// after-state.
    fn compose(&self, _next: &dyn Request) -> Option<Box<dyn Request>> {
        None
    }

    fn as_any(&self) -> &dyn Any;
}

/// Lifecycle state of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestState {
    Constructed,
    Committed,
    Undone,
    Redone,
}

/// A request together with its lifecycle state
#[derive(Debug)]
pub struct TrackedRequest {
    request: Box<dyn Request>,
    state: RequestState,
}

impl TrackedRequest {
    pub fn new(request: Box<dyn Request>) -> Self {
        Self {
            request,
            state: RequestState::Constructed,
        }
    }

    /// Wrap a request whose effect is already in the model
    pub(crate) fn committed(request: Box<dyn Request>) -> Self {
        Self {
            request,
            state: RequestState::Committed,
        }
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    pub fn request(&self) -> &dyn Request {
        self.request.as_ref()
    }

    pub fn commit(&mut self, model: &mut Model) -> TxnResult<()> {
        match self.state {
            RequestState::Constructed => {
                self.request.on_commit(model)?;
                self.state = RequestState::Committed;
                Ok(())
            }
            from => Err(TxnError::InvalidTransition {
                from,
                action: "commit",
            }),
        }
    }

    /// Undo; before any commit this is a guarded no-op
    pub fn undo(&mut self, model: &mut Model) -> TxnResult<()> {
        match self.state {
            RequestState::Committed | RequestState::Redone => {
                self.request.on_undo(model)?;
                self.state = RequestState::Undone;
                Ok(())
            }
            RequestState::Constructed => {
                if cfg!(debug_assertions) {
                    warn!(
                        request = %self.request.request_type(),
                        "Undo before commit ignored, no before-state captured"
                    );
                }
                Ok(())
            }
            from => Err(TxnError::InvalidTransition {
                from,
                action: "undo",
            }),
        }
    }

    pub fn redo(&mut self, model: &mut Model) -> TxnResult<()> {
        match self.state {
            RequestState::Undone => {
                self.request.on_redo(model)?;
                self.state = RequestState::Redone;
                Ok(())
            }
            from => Err(TxnError::InvalidTransition {
                from,
                action: "redo",
            }),
        }
    }
}
