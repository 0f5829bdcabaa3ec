//! 2D Boolean Operations on sketch regions
//!
//! Thin wrappers around `i_overlay`. Outer loops are normalised to
//! counter-clockwise winding and holes to clockwise winding on both sides
//! of every operation.

use glam::DVec2;
use i_overlay::core::fill_rule::FillRule;
use i_overlay::core::overlay_rule::OverlayRule;
use i_overlay::float::single::SingleFloatOverlay;
use serde::{Deserialize, Serialize};

use crate::geometry::{self, Loop, MIN_AREA_THRESHOLD};

/// A polygon with holes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Outer boundary (counter-clockwise)
    pub outer: Loop,
    /// Holes (clockwise)
    pub holes: Vec<Loop>,
}

impl Region {
    /// Create a region, normalising winding
    pub fn new(outer: &[DVec2], holes: &[Loop]) -> Self {
        Self {
            outer: geometry::ensure_ccw(outer),
            holes: holes.iter().map(|h| geometry::ensure_cw(h)).collect(),
        }
    }

    /// Region without holes
    pub fn simple(outer: &[DVec2]) -> Self {
        Self::new(outer, &[])
    }

    /// Net area (outer minus holes)
    pub fn area(&self) -> f64 {
        let holes: f64 = self.holes.iter().map(|h| geometry::signed_area(h).abs()).sum();
        geometry::signed_area(&self.outer).abs() - holes
    }

    /// Bounding box of the outer loop
    pub fn bounds(&self) -> Option<(DVec2, DVec2)> {
        geometry::bounds(&self.outer)
    }

    fn to_paths(&self) -> Vec<Vec<[f64; 2]>> {
        let mut paths = Vec::with_capacity(1 + self.holes.len());
        paths.push(to_path(&self.outer));
        for hole in &self.holes {
            paths.push(to_path(hole));
        }
        paths
    }
}

/// Merge overlapping loops into regions
///
/// Loops that overlap nothing are returned unchanged, so disjoint input keeps
/// its order and exact coordinates.
pub fn union_loops(loops: &[Loop]) -> Vec<Region> {
    let boxes: Vec<_> = loops.iter().map(|l| geometry::bounds(l)).collect();
    let overlapping = |i: usize| {
        boxes.iter().enumerate().any(|(j, other)| {
            j != i
                && match (boxes[i], *other) {
                    (Some(a), Some(b)) => geometry::bounds_overlap(a, b),
                    _ => false,
                }
        })
    };

    let mut result = Vec::new();
    let mut to_merge: Vec<Vec<[f64; 2]>> = Vec::new();
    for (i, l) in loops.iter().enumerate() {
        if overlapping(i) {
            to_merge.push(to_path(&geometry::ensure_ccw(l)));
        } else {
            result.push(Region::simple(l));
        }
    }

    if let Some((first, rest)) = to_merge.split_first() {
        let subject = vec![first.clone()];
        let clip: Vec<Vec<[f64; 2]>> = rest.to_vec();
        let shapes = subject.overlay(&clip, OverlayRule::Union, FillRule::NonZero);
        result.extend(shapes_to_regions(shapes));
    }

    result
}

/// Subtract `clips` from `subject`, returning the remaining pieces
pub fn subtract(subject: &Region, clips: &[Region]) -> Vec<Region> {
    if clips.is_empty() {
        return vec![subject.clone()];
    }

    let subject_paths = subject.to_paths();
    let clip_paths: Vec<Vec<[f64; 2]>> = clips.iter().flat_map(|c| c.to_paths()).collect();
    let shapes = subject_paths.overlay(&clip_paths, OverlayRule::Difference, FillRule::EvenOdd);
    shapes_to_regions(shapes)
}

/// Check whether two regions share interior area
pub fn regions_overlap(a: &Region, b: &Region) -> bool {
    match (a.bounds(), b.bounds()) {
        (Some(ba), Some(bb)) if geometry::bounds_overlap(ba, bb) => {}
        _ => return false,
    }

    let shapes = a
        .to_paths()
        .overlay(&b.to_paths(), OverlayRule::Intersect, FillRule::EvenOdd);
    shapes_to_regions(shapes)
        .iter()
        .any(|r| r.area() > MIN_AREA_THRESHOLD)
}

fn to_path(points: &[DVec2]) -> Vec<[f64; 2]> {
    points.iter().map(|p| [p.x, p.y]).collect()
}

/// Convert `i_overlay` output into regions
///
/// `i_overlay` returns shapes, each a list of contours where the first
/// contour is the outer boundary and the rest are holes.
fn shapes_to_regions(shapes: Vec<Vec<Vec<[f64; 2]>>>) -> Vec<Region> {
    shapes
        .into_iter()
        .filter_map(|shape| {
            let mut contours = shape
                .into_iter()
                .map(|c| c.into_iter().map(|p| DVec2::new(p[0], p[1])).collect::<Loop>())
                .filter(|c| c.len() >= 3 && geometry::signed_area(c).abs() > MIN_AREA_THRESHOLD);
            let outer = contours.next()?;
            let holes: Vec<Loop> = contours.collect();
            Some(Region::new(&outer, &holes))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rect(x: f64, y: f64, w: f64, h: f64) -> Loop {
        vec![
            DVec2::new(x, y),
            DVec2::new(x + w, y),
            DVec2::new(x + w, y + h),
            DVec2::new(x, y + h),
        ]
    }

    #[test]
    fn test_region_winding() {
        let cw: Loop = rect(0.0, 0.0, 2.0, 2.0).into_iter().rev().collect();
        let region = Region::new(&cw, &[rect(0.5, 0.5, 1.0, 1.0)]);
        assert!(geometry::signed_area(&region.outer) > 0.0);
        assert!(geometry::signed_area(&region.holes[0]) < 0.0);
        assert_relative_eq!(region.area(), 3.0);
    }

    #[test]
    fn test_union_keeps_disjoint_loops() {
        let a = rect(0.0, 0.0, 1.0, 1.0);
        let b = rect(5.0, 5.0, 1.0, 1.0);
        let regions = union_loops(&[a.clone(), b.clone()]);
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].outer, a);
        assert_eq!(regions[1].outer, b);
    }

    #[test]
    fn test_union_merges_overlap() {
        let regions = union_loops(&[rect(0.0, 0.0, 2.0, 2.0), rect(1.0, 0.0, 2.0, 2.0)]);
        assert_eq!(regions.len(), 1);
        assert_relative_eq!(regions[0].area(), 6.0, epsilon = 1e-6);
    }

    #[test]
    fn test_subtract_splits_area() {
        let slab = Region::simple(&rect(0.0, 0.0, 10.0, 4.0));
        let cut = Region::simple(&rect(4.0, -1.0, 2.0, 6.0));
        let pieces = subtract(&slab, &[cut]);
        assert_eq!(pieces.len(), 2);
        let total: f64 = pieces.iter().map(Region::area).sum();
        assert_relative_eq!(total, 32.0, epsilon = 1e-6);
    }

    #[test]
    fn test_overlap_detection() {
        let a = Region::simple(&rect(0.0, 0.0, 2.0, 2.0));
        let b = Region::simple(&rect(1.0, 1.0, 2.0, 2.0));
        let c = Region::simple(&rect(2.0, 0.0, 2.0, 2.0));
        assert!(regions_overlap(&a, &b));
        // Edge contact only
        assert!(!regions_overlap(&a, &c));
    }
}
