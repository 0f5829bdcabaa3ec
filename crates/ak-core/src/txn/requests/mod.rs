//! Built-in requests and their factories

mod content;
mod data;
mod lifecycle;
mod roof;
mod sketch;
mod slab;
mod wall;

pub use content::RenameContentRequest;
pub use data::{CompositeRequest, DataRequest};
pub use lifecycle::{EntityLifecycleRequest, LifecycleAction};
pub use roof::{RoofRelation, UpdateRoofRelationRequest};
pub use sketch::SketchEditRequest;
pub use slab::ChangeSlabThicknessRequest;
pub use wall::MoveWallPointRequest;

use super::error::{TxnError, TxnResult};
use super::registry::RequestFactory;
use super::request::{Request, RequestType};

/// Factories for every built-in request type
pub(crate) fn builtin_factories() -> Vec<(RequestType, RequestFactory)> {
    RequestType::ALL
        .iter()
        .map(|ty| {
            let factory: RequestFactory = match ty {
                RequestType::SetField => data::create_set_field,
                RequestType::Composite => data::create_composite,
                RequestType::CreateEntity
                | RequestType::DeleteEntity
                | RequestType::RecycleEntity
                | RequestType::RestoreEntity => lifecycle::create,
                RequestType::ChangeSlabThickness => slab::create,
                RequestType::RenameContent => content::create,
                RequestType::UpdateRoofRelation => roof::create,
                RequestType::MoveWallPoint => wall::create,
                RequestType::DrawOutdoorRegions
                | RequestType::MoveOutdoorPoint
                | RequestType::MoveOutdoorCurve
                | RequestType::DrawRoofRegions
                | RequestType::MoveRoofPoint
                | RequestType::MoveRoofCurve
                | RequestType::DrawSlabHoles
                | RequestType::MoveSlabHolePoint
                | RequestType::MoveSlabHoleCurve => sketch::create,
            };
            (*ty, factory)
        })
        .collect()
}

fn malformed(request: RequestType, expected: &'static str) -> TxnError {
    TxnError::MalformedRequestData { request, expected }
}

fn boxed<R: Request + 'static>(request: R) -> TxnResult<Box<dyn Request>> {
    Ok(Box::new(request))
}
