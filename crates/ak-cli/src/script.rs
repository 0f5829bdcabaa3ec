//! Edit scripts
//!
//! A script is a RON list of edit steps replayed against a session. Each
//! step becomes one command (or an undo/redo); steps the kernel rejects are
//! logged and skipped so the rest of the script still runs.

use std::path::Path;

use ak_core::txn::requests::RoofRelation;
use ak_core::{
    EditCommand, EntityId, FieldRef, FieldValue, KernelConfig, Session, SketchTarget, TxnError,
};
use ak_sketch::Loop;
use glam::DVec2;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::CliError;

/// One scripted edit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EditStep {
    Rename {
        entity: EntityId,
        name: String,
    },
    SlabThickness {
        slab: EntityId,
        thickness: f64,
    },
    DrawPolygons {
        target: SketchTarget,
        polygons: Vec<Loop>,
    },
    MovePoint {
        target: SketchTarget,
        from: DVec2,
        to: DVec2,
    },
    MoveCurve {
        target: SketchTarget,
        start: DVec2,
        end: DVec2,
        offset: DVec2,
    },
    RoofRelation {
        roof: Option<EntityId>,
        drawing_region: EntityId,
    },
    WallPoint {
        wall: EntityId,
        from: DVec2,
        to: DVec2,
    },
    SetField {
        target: FieldRef,
        value: FieldValue,
    },
    Recycle(EntityId),
    Restore(EntityId),
    Delete(EntityId),
    Undo,
    Redo,
}

impl EditStep {
    /// Command for this step; `None` for undo and redo
    pub fn command(&self, config: &KernelConfig) -> Option<EditCommand> {
        let command = match self {
            EditStep::Rename { entity, name } => EditCommand::rename(*entity, name.clone()),
            EditStep::SlabThickness { slab, thickness } => {
                EditCommand::slab_thickness(*slab, *thickness, config.slab)
            }
            EditStep::DrawPolygons { target, polygons } => {
                EditCommand::draw_polygons(*target, polygons.clone())
            }
            EditStep::MovePoint { target, from, to } => EditCommand::move_point(*target, *from, *to),
            EditStep::MoveCurve {
                target,
                start,
                end,
                offset,
            } => EditCommand::move_curve(*target, *start, *end, *offset),
            EditStep::RoofRelation {
                roof,
                drawing_region,
            } => EditCommand::update_roof_relations(vec![RoofRelation {
                roof: *roof,
                drawing_region: *drawing_region,
            }]),
            EditStep::WallPoint { wall, from, to } => EditCommand::move_wall_point(*wall, *from, *to),
            EditStep::SetField { target, value } => EditCommand::set_field(*target, value.clone()),
            EditStep::Recycle(id) => EditCommand::recycle_entity(*id),
            EditStep::Restore(id) => EditCommand::restore_entity(*id),
            EditStep::Delete(id) => EditCommand::delete_entity(*id),
            EditStep::Undo | EditStep::Redo => return None,
        };
        Some(command)
    }
}

/// A list of edit steps
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditScript {
    pub steps: Vec<EditStep>,
}

impl EditScript {
    pub fn from_ron_str(text: &str) -> Result<Self, CliError> {
        ron::from_str(text).map_err(|e| CliError::Script(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CliError> {
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|e| CliError::Io(e.to_string()))?;
        Self::from_ron_str(&content)
    }

    pub fn to_ron_string(&self) -> Result<String, CliError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| CliError::Script(e.to_string()))
    }
}

/// Outcome counts of a replay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayReport {
    /// Steps that changed the model
    pub applied: usize,
    /// Steps the kernel refused
    pub rejected: usize,
    /// Steps that had nothing to do
    pub skipped: usize,
}

/// Run every step of `script` against `session`
pub fn replay(session: &mut Session, script: &EditScript) -> ReplayReport {
    let config = session.config().clone();
    let mut report = ReplayReport::default();
    for (index, step) in script.steps.iter().enumerate() {
        let result: Result<bool, TxnError> = match step {
            EditStep::Undo => session.undo(),
            EditStep::Redo => session.redo(),
            _ => match step.command(&config) {
                Some(mut command) => session.execute(&mut command),
                None => Ok(false),
            },
        };
        match result {
            Ok(true) => report.applied += 1,
            Ok(false) => {
                info!(step = index, "Step had no effect");
                report.skipped += 1;
            }
            Err(err) => {
                warn!(step = index, error = %err, "Step rejected");
                report.rejected += 1;
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use ak_core::{Entity, EntityData, LayerId, Model, ModelBuilder};
    use glam::DVec3;

    fn rect(w: f64, h: f64) -> Loop {
        vec![
            DVec2::ZERO,
            DVec2::new(w, 0.0),
            DVec2::new(w, h),
            DVec2::new(0.0, h),
        ]
    }

    fn model() -> (Model, LayerId, EntityId, EntityId) {
        let mut builder = ModelBuilder::new();
        let layer = builder.add_layer("1F", 0.0, 3000.0);
        let slab = builder.add_slab(layer, 120.0, rect(6000.0, 4000.0)).unwrap();
        let sofa = builder.add_entity(Entity::content("Sofa", DVec3::ZERO, DVec3::ONE));
        (builder.build(), layer, slab, sofa)
    }

    #[test]
    fn test_replay_counts() {
        let (model, layer, slab, sofa) = model();
        let mut session = Session::new(model, KernelConfig::default());

        let script = EditScript {
            steps: vec![
                EditStep::Rename {
                    entity: sofa,
                    name: "Sofa-2".into(),
                },
                EditStep::SlabThickness {
                    slab,
                    thickness: 5000.0,
                },
                EditStep::DrawPolygons {
                    target: SketchTarget::LayerSlab(layer),
                    polygons: vec![rect(500.0, 500.0)
                        .into_iter()
                        .map(|p| p + DVec2::splat(1000.0))
                        .collect()],
                },
                EditStep::Undo,
                EditStep::Redo,
                EditStep::Redo,
            ],
        };

        let report = replay(&mut session, &script);
        assert_eq!(
            report,
            ReplayReport {
                applied: 4,
                rejected: 1,
                skipped: 1,
            }
        );
        assert_eq!(session.model().entity(sofa).unwrap().display_name(), "Sofa-2");
        let Some(EntityData::Slab { thickness, .. }) = session.model().entity(slab).map(Entity::data)
        else {
            panic!("not a slab");
        };
        assert_eq!(*thickness, 120.0);
        assert_eq!(session.history().len(), 2);
    }

    #[test]
    fn test_script_ron_round_trip() {
        let script = EditScript {
            steps: vec![
                EditStep::Recycle(EntityId::new()),
                EditStep::MovePoint {
                    target: SketchTarget::OutdoorDrawing,
                    from: DVec2::ZERO,
                    to: DVec2::ONE,
                },
                EditStep::Undo,
            ],
        };
        let text = script.to_ron_string().unwrap();
        assert_eq!(EditScript::from_ron_str(&text).unwrap(), script);
    }

    #[test]
    fn test_load_script_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edits.ron");
        let script = EditScript {
            steps: vec![EditStep::Undo],
        };
        std::fs::write(&path, script.to_ron_string().unwrap()).unwrap();
        assert_eq!(EditScript::load(&path).unwrap(), script);

        assert!(matches!(
            EditScript::from_ron_str("(steps: [Teleport])"),
            Err(CliError::Script(_))
        ));
    }
}
