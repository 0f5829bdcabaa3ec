//! Wall joint moves

use std::any::Any;

use glam::DVec2;
use tracing::debug;

use super::data::{CompositeRequest, DataRequest};
use super::{boxed, malformed};
use crate::entity::{EntityId, FieldRef, FieldValue};
use crate::model::Model;
use crate::txn::error::TxnResult;
use crate::txn::registry::RequestRegistry;
use crate::txn::request::{Request, RequestData, RequestType};
use crate::txn_type::EntityTransactionType;

/// Move a wall end point together with every wall end joined there
#[derive(Debug)]
pub struct MoveWallPointRequest {
    wall: EntityId,
    from: DVec2,
    to: DVec2,
    writes: CompositeRequest,
}

impl MoveWallPointRequest {
    pub fn new(wall: EntityId, from: DVec2, to: DVec2) -> Self {
        Self {
            wall,
            from,
            to,
            writes: CompositeRequest::default(),
        }
    }

    pub fn wall(&self) -> EntityId {
        self.wall
    }

    /// End point writes for the joint at `from`
    fn plan(&self, model: &Model) -> Vec<DataRequest> {
        let epsilon = model.sketch_options().epsilon;
        let joined = model.walls_at(self.from, epsilon);
        if !joined.iter().any(|(id, _)| *id == self.wall) {
            debug!(wall = %self.wall, "Wall has no end at the joint, move skipped");
            return Vec::new();
        }
        joined
            .into_iter()
            .map(|(id, end)| {
                DataRequest::new(FieldRef::new(id, end.field()), FieldValue::Point(self.to))
                    .with_type(RequestType::MoveWallPoint)
            })
            .collect()
    }
}

impl Request for MoveWallPointRequest {
    fn request_type(&self) -> RequestType {
        RequestType::MoveWallPoint
    }

    fn touched_fields(&self, model: &Model) -> Vec<FieldRef> {
        self.plan(model).iter().map(DataRequest::target).collect()
    }

    fn entity_changes(&self) -> Vec<(EntityId, EntityTransactionType)> {
        self.writes.entity_changes()
    }

    fn on_commit(&mut self, model: &mut Model) -> TxnResult<()> {
        let mut writes = CompositeRequest::new(
            self.plan(model)
                .into_iter()
                .map(|w| Box::new(w) as Box<dyn Request>)
                .collect(),
        );
        writes.on_commit(model)?;
        self.writes = writes;
        Ok(())
    }

    fn on_undo(&mut self, model: &mut Model) -> TxnResult<()> {
        self.writes.on_undo(model)
    }

    fn on_redo(&mut self, model: &mut Model) -> TxnResult<()> {
        self.writes.on_redo(model)
    }

    fn has_effect(&self) -> bool {
        self.writes.has_effect()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub(super) fn create(
    _registry: &RequestRegistry,
    request_type: RequestType,
    data: RequestData,
) -> TxnResult<Box<dyn Request>> {
    match data {
        RequestData::WallPoint { wall, from, to } => boxed(MoveWallPointRequest::new(wall, from, to)),
        _ => Err(malformed(request_type, "WallPoint { wall, from, to }")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Entity, EntityData};
    use crate::model::ModelBuilder;
    use approx::assert_relative_eq;

    fn wall_ends(model: &Model, id: EntityId) -> (DVec2, DVec2) {
        match model.entity(id).map(Entity::data) {
            Some(EntityData::Wall { from, to, .. }) => (*from, *to),
            _ => panic!("not a wall"),
        }
    }

    #[test]
    fn test_joined_walls_move_together() {
        let corner = DVec2::new(4000.0, 0.0);
        let mut builder = ModelBuilder::new();
        let south = builder.add_wall(DVec2::ZERO, corner, 200.0, 2800.0);
        let east = builder.add_wall(corner, DVec2::new(4000.0, 3000.0), 200.0, 2800.0);
        let loose = builder.add_wall(DVec2::new(0.0, 5000.0), DVec2::new(1.0, 5000.0), 200.0, 2800.0);
        let mut model = builder.build();
        let original = model.clone();

        let moved = DVec2::new(4500.0, 0.0);
        let mut request = MoveWallPointRequest::new(south, corner, moved);
        assert_eq!(request.touched_fields(&model).len(), 2);
        assert_eq!(request.description(), "通过墙体连接点移动墙体");

        request.on_commit(&mut model).unwrap();
        assert_eq!(wall_ends(&model, south).1, moved);
        assert_eq!(wall_ends(&model, east).0, moved);
        assert_eq!(model.entity(loose), original.entity(loose));

        let Some(EntityData::Wall { faces, .. }) = model.entity(south).map(Entity::data) else {
            panic!("not a wall");
        };
        assert_relative_eq!(faces.left[1].x, 4500.0);

        request.on_undo(&mut model).unwrap();
        assert_eq!(model, original);
    }

    #[test]
    fn test_point_off_wall_is_noop() {
        let mut builder = ModelBuilder::new();
        let wall = builder.add_wall(DVec2::ZERO, DVec2::X, 200.0, 2800.0);
        let mut model = builder.build();
        let original = model.clone();

        let mut request = MoveWallPointRequest::new(wall, DVec2::new(0.5, 0.0), DVec2::ONE);
        request.on_commit(&mut model).unwrap();
        assert!(request.entity_changes().is_empty());
        assert!(!request.has_effect());
        assert_eq!(model, original);
    }
}
