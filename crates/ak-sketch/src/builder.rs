//! Sketch2D Topology Builder
//!
//! A builder borrows one [`Sketch2d`] and performs the geometry edits on it:
//! drawing regions (with boolean merge/cut against existing faces), seeding
//! faces, moving vertices and removing faces. Every edit ends with exactly
//! one refresh of the derived appendix.
//!
//! The three builder flavours differ only in data:
//!
//! | kind             | stamps drawn regions | declared roles   | refresh             |
//! |------------------|----------------------|------------------|---------------------|
//! | `Layer`          | `holeTopo`           | `faceTopo`, `holeTopo` | `update_layer`    |
//! | `RoofsDrawing`   | `regionTopo`         | `regionTopo`     | `update_appendix`   |
//! | `OutdoorDrawing` | `faceTopo`           | `faceTopo`       | `update_appendix`   |

use std::collections::BTreeMap;

use glam::DVec2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::boolean::{self, Region};
use crate::error::{SketchError, SketchResult};
use crate::geometry::{self, Loop};
use crate::sketch::{BaseInfo, Face, FaceId, Sketch2d, SketchAppendix};
use crate::tag::{TopoRole, TopoTag};

/// Flavour of a sketch builder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuilderKind {
    /// Slab profiles and slab holes of a layer
    Layer,
    /// Roof drawing regions of a layer
    RoofsDrawing,
    /// Outdoor drawing faces
    OutdoorDrawing,
}

impl BuilderKind {
    pub const fn name(&self) -> &'static str {
        match self {
            BuilderKind::Layer => "layer",
            BuilderKind::RoofsDrawing => "roofs drawing",
            BuilderKind::OutdoorDrawing => "outdoor drawing",
        }
    }

    /// Role stamped on regions created by `draw_polygons`
    pub const fn draw_role(&self) -> TopoRole {
        match self {
            BuilderKind::Layer => TopoRole::Hole,
            BuilderKind::RoofsDrawing => TopoRole::Region,
            BuilderKind::OutdoorDrawing => TopoRole::Face,
        }
    }

    /// Roles a face of this builder's sketch may carry
    pub fn declared_roles(&self) -> &'static [TopoRole] {
        match self {
            BuilderKind::Layer => &[TopoRole::Face, TopoRole::Hole],
            BuilderKind::RoofsDrawing => &[TopoRole::Region],
            BuilderKind::OutdoorDrawing => &[TopoRole::Face],
        }
    }

    pub fn declares(&self, role: TopoRole) -> bool {
        self.declared_roles().contains(&role)
    }
}

/// Tolerances used by a builder
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BuilderOptions {
    /// Point coincidence tolerance
    pub epsilon: f64,
    /// Faces below this area are dropped by `update_appendix`
    pub min_face_area: f64,
}

impl Default for BuilderOptions {
    fn default() -> Self {
        Self {
            epsilon: 1e-6,
            min_face_area: 1e-4,
        }
    }
}

/// Outcome of one builder edit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildReport {
    /// Freshly drawn or seeded faces
    pub inserted: Vec<FaceId>,
    /// Existing faces whose geometry changed (including split pieces)
    pub modified: Vec<FaceId>,
    /// Faces that disappeared
    pub removed: Vec<FaceId>,
    /// Faces left alone because their tag failed the filter
    pub skipped: Vec<FaceId>,
}

impl BuildReport {
    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty() && self.modified.is_empty() && self.removed.is_empty()
    }
}

/// Geometry editor over one sketch
pub struct Sketch2dBuilder<'a> {
    sketch: &'a mut Sketch2d,
    kind: BuilderKind,
    options: BuilderOptions,
    layer_updates: usize,
    appendix_updates: usize,
}

impl<'a> Sketch2dBuilder<'a> {
    pub fn new(sketch: &'a mut Sketch2d, kind: BuilderKind, options: BuilderOptions) -> Self {
        Self {
            sketch,
            kind,
            options,
            layer_updates: 0,
            appendix_updates: 0,
        }
    }

    pub fn kind(&self) -> BuilderKind {
        self.kind
    }

    pub fn sketch(&self) -> &Sketch2d {
        self.sketch
    }

    /// Number of `update_layer` runs by this builder
    pub fn layer_update_count(&self) -> usize {
        self.layer_updates
    }

    /// Number of `update_appendix` runs by this builder
    pub fn appendix_update_count(&self) -> usize {
        self.appendix_updates
    }

    // ============== Edits ==============

    /// Draw new regions into the sketch
    ///
    /// Overlapping input polygons are merged first. Each merged region is cut
    /// out of the existing faces it overlaps, then inserted with the drawn tag
    /// of this builder. On a layer sketch a region lying strictly inside a
    /// slab face is not cut out; it becomes a hole of that face on refresh.
    pub fn draw_polygons(&mut self, polygons: &[Loop]) -> SketchResult<BuildReport> {
        let epsilon = self.options.epsilon;
        let loops = polygons
            .iter()
            .map(|p| geometry::normalize_loop(p, epsilon))
            .collect::<SketchResult<Vec<_>>>()?;

        let mut report = BuildReport::default();
        if loops.is_empty() {
            return Ok(report);
        }

        let regions = boolean::union_loops(&loops);
        if regions.is_empty() {
            return Err(SketchError::BooleanFailed(
                "union of drawn polygons is empty".into(),
            ));
        }

        let tag = TopoTag::drawn(self.kind.draw_role());
        for region in regions {
            self.cut_existing(&region, &mut report);
            let face = Face::from_region(FaceId::new(), region, tag);
            report.inserted.push(face.id);
            self.sketch.faces_mut().push(face);
        }

        report.removed.extend(self.refresh());
        debug!(
            builder = self.kind.name(),
            inserted = report.inserted.len(),
            modified = report.modified.len(),
            "Drew polygons"
        );
        Ok(report)
    }

    /// Seed a face without boolean processing
    ///
    /// On a layer sketch the holes of a `faceTopo` face are stored as separate
    /// `holeTopo` faces, so they survive the hole derivation of `update_layer`.
    pub fn insert_face(
        &mut self,
        outer: &[DVec2],
        holes: &[Loop],
        role: TopoRole,
    ) -> SketchResult<FaceId> {
        if !self.kind.declares(role) {
            return Err(SketchError::UndeclaredRole {
                role,
                builder: self.kind.name(),
            });
        }

        let epsilon = self.options.epsilon;
        let outer = geometry::normalize_loop(outer, epsilon)?;
        let holes = holes
            .iter()
            .map(|h| geometry::normalize_loop(h, epsilon))
            .collect::<SketchResult<Vec<_>>>()?;

        let id = FaceId::new();
        let tag = TopoTag::new(self.next_index(role), role);
        if self.kind == BuilderKind::Layer && role == TopoRole::Face {
            self.sketch
                .faces_mut()
                .push(Face::from_region(id, Region::simple(&outer), tag));
            for hole in holes {
                let hole_tag = TopoTag::new(self.next_index(TopoRole::Hole), TopoRole::Hole);
                self.sketch
                    .faces_mut()
                    .push(Face::from_region(FaceId::new(), Region::simple(&hole), hole_tag));
            }
        } else {
            self.sketch
                .faces_mut()
                .push(Face::from_region(id, Region::new(&outer, &holes), tag));
        }

        self.refresh();
        Ok(id)
    }

    /// Move every vertex at `from` to `to`
    ///
    /// With a filter, faces whose tag has another role are skipped.
    pub fn move_point(&mut self, from: DVec2, to: DVec2, filter: Option<TopoRole>) -> BuildReport {
        self.move_vertices(&[(from, to)], filter)
    }

    /// Translate the curve `start`-`end` by `offset`
    ///
    /// Vertices coincident with either end move with it, so faces sharing the
    /// curve stay connected.
    pub fn move_curve(
        &mut self,
        start: DVec2,
        end: DVec2,
        offset: DVec2,
        filter: Option<TopoRole>,
    ) -> BuildReport {
        self.move_vertices(&[(start, start + offset), (end, end + offset)], filter)
    }

    pub fn remove_faces(&mut self, ids: &[FaceId]) -> BuildReport {
        let mut report = BuildReport::default();
        self.sketch.faces_mut().retain(|f| {
            let remove = ids.contains(&f.id);
            if remove {
                report.removed.push(f.id);
            }
            !remove
        });
        if !report.removed.is_empty() {
            report.removed.extend(self.refresh());
        }
        report
    }

    // ============== Refresh ==============

    /// Recompute hole hosts, slab holes, base info and neighbour links
    pub fn update_layer(&mut self) {
        let epsilon = self.options.epsilon;
        let faces = self.sketch.faces();

        let mut hole_hosts = BTreeMap::new();
        for hole in faces.iter().filter(|f| f.tag.role == TopoRole::Hole) {
            let host = faces
                .iter()
                .filter(|f| {
                    f.tag.role == TopoRole::Face
                        && geometry::loop_inside_loop(&hole.outer, &f.outer, epsilon)
                })
                .min_by(|a, b| {
                    let area_a = geometry::signed_area(&a.outer).abs();
                    let area_b = geometry::signed_area(&b.outer).abs();
                    area_a.total_cmp(&area_b)
                });
            if let Some(host) = host {
                hole_hosts.insert(hole.id, host.id);
            }
        }

        let mut rings: BTreeMap<FaceId, Vec<Loop>> = BTreeMap::new();
        for face in faces {
            if let Some(host) = hole_hosts.get(&face.id) {
                rings
                    .entry(*host)
                    .or_default()
                    .push(geometry::ensure_cw(&face.outer));
            }
        }
        for face in self.sketch.faces_mut() {
            if face.tag.role == TopoRole::Face {
                face.holes = rings.remove(&face.id).unwrap_or_default();
            }
        }

        let mut appendix = derive_appendix(self.sketch, epsilon);
        appendix.hole_hosts = hole_hosts;
        self.sketch.set_appendix(appendix);
        self.layer_updates += 1;
    }

    /// Drop faces below the minimum area, then recompute base info and
    /// neighbour links. Returns the dropped faces.
    pub fn update_appendix(&mut self) -> Vec<FaceId> {
        let min_area = self.options.min_face_area;
        let mut dropped = Vec::new();
        self.sketch.faces_mut().retain(|f| {
            let keep = f.area() >= min_area;
            if !keep {
                dropped.push(f.id);
            }
            keep
        });
        if !dropped.is_empty() {
            debug!(count = dropped.len(), "Dropped faces below minimum area");
        }

        let appendix = derive_appendix(self.sketch, self.options.epsilon);
        self.sketch.set_appendix(appendix);
        self.appendix_updates += 1;
        dropped
    }

    fn refresh(&mut self) -> Vec<FaceId> {
        match self.kind {
            BuilderKind::Layer => {
                self.update_layer();
                Vec::new()
            }
            BuilderKind::RoofsDrawing | BuilderKind::OutdoorDrawing => self.update_appendix(),
        }
    }

    // ============== Helpers ==============

    fn next_index(&self, role: TopoRole) -> i32 {
        self.sketch
            .faces()
            .iter()
            .filter(|f| f.tag.role == role && !f.tag.is_drawn())
            .count() as i32
    }

    fn cut_existing(&mut self, region: &Region, report: &mut BuildReport) {
        let epsilon = self.options.epsilon;
        let kind = self.kind;
        let existing = std::mem::take(self.sketch.faces_mut());
        let mut kept = Vec::with_capacity(existing.len());

        for face in existing {
            let future_hole = kind == BuilderKind::Layer
                && face.tag.role == TopoRole::Face
                && geometry::loop_inside_loop(&region.outer, &face.outer, epsilon);
            let subject = face.region();
            if future_hole || !boolean::regions_overlap(&subject, region) {
                kept.push(face);
                continue;
            }

            let pieces = boolean::subtract(&subject, std::slice::from_ref(region));
            if pieces.is_empty() {
                report.removed.push(face.id);
                continue;
            }
            for (i, piece) in pieces.into_iter().enumerate() {
                let id = if i == 0 { face.id } else { FaceId::new() };
                report.modified.push(id);
                kept.push(Face::from_region(id, piece, face.tag));
            }
        }

        *self.sketch.faces_mut() = kept;
    }

    fn move_vertices(&mut self, moves: &[(DVec2, DVec2)], filter: Option<TopoRole>) -> BuildReport {
        let epsilon = self.options.epsilon;
        let target = |p: DVec2| {
            moves
                .iter()
                .find(|(from, _)| geometry::coincide(p, *from, epsilon))
                .map(|(_, to)| *to)
        };

        let mut report = BuildReport::default();
        for face in self.sketch.faces_mut() {
            let touches = face
                .loops()
                .any(|l| l.iter().any(|p| target(*p).is_some()));
            if !touches {
                continue;
            }
            if let Some(role) = filter {
                if !face.tag.matches(role) {
                    debug!(face = %face.id, tag = %face.tag, "Skipping face outside topology filter");
                    report.skipped.push(face.id);
                    continue;
                }
            }
            for l in face.loops_mut() {
                for p in l.iter_mut() {
                    if let Some(to) = target(*p) {
                        *p = to;
                    }
                }
            }
            report.modified.push(face.id);
        }

        if !report.modified.is_empty() {
            report.removed.extend(self.refresh());
        }
        report
    }
}

fn derive_appendix(sketch: &Sketch2d, epsilon: f64) -> SketchAppendix {
    let surface = sketch.surface();
    let faces = sketch.faces();

    let base_infos = faces
        .iter()
        .map(|f| (f.id, BaseInfo::compute(f, surface)))
        .collect();

    let mut neighbors: BTreeMap<FaceId, Vec<FaceId>> = BTreeMap::new();
    for (i, a) in faces.iter().enumerate() {
        for b in &faces[i + 1..] {
            if share_edge(a, b, epsilon) {
                neighbors.entry(a.id).or_default().push(b.id);
                neighbors.entry(b.id).or_default().push(a.id);
            }
        }
    }

    SketchAppendix {
        base_infos,
        neighbors,
        hole_hosts: BTreeMap::new(),
    }
}

fn share_edge(a: &Face, b: &Face, epsilon: f64) -> bool {
    a.loops().any(|la| {
        geometry::edges(la).any(|ea| {
            b.loops()
                .any(|lb| geometry::edges(lb).any(|eb| geometry::same_edge(ea, eb, epsilon)))
        })
    })
}
