//! 2D Sketch Topology
//!
//! This crate provides:
//! - Topology tags that mark the role of a sketch face (hole, face, region)
//! - 2D polygon helpers and boolean operations on sketch regions
//! - Sketch storage with derived base info and neighbour links
//! - Builders that insert drawn regions and refresh derived data

pub mod boolean;
pub mod builder;
pub mod error;
pub mod geometry;
pub mod sketch;
pub mod tag;

// Re-exports for convenience
pub use boolean::Region;
pub use builder::{BuildReport, BuilderKind, BuilderOptions, Sketch2dBuilder};
pub use error::{SketchError, SketchResult};
pub use geometry::Loop;
pub use sketch::{BaseInfo, Face, FaceId, Sketch2d, SketchAppendix, SupportingSurface};
pub use tag::{TopoRole, TopoTag, filter_faces};
