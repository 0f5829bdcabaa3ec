//! Planar polygon helpers
//!
//! Loops are stored as open point lists (the closing edge from the last
//! point back to the first is implicit).

use glam::DVec2;

use crate::error::{SketchError, SketchResult};

/// A closed polygon loop
pub type Loop = Vec<DVec2>;

/// Polygons smaller than this are considered degenerate
pub const MIN_AREA_THRESHOLD: f64 = 1e-10;

/// Compute the signed area of a loop
/// Positive = counter-clockwise, Negative = clockwise
pub fn signed_area(points: &[DVec2]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }

    let n = points.len();
    let mut area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        area += points[i].x * points[j].y - points[j].x * points[i].y;
    }
    area * 0.5
}

/// Ensure counter-clockwise winding (outer loops)
pub fn ensure_ccw(points: &[DVec2]) -> Loop {
    if signed_area(points) < 0.0 {
        points.iter().rev().copied().collect()
    } else {
        points.to_vec()
    }
}

/// Ensure clockwise winding (holes)
pub fn ensure_cw(points: &[DVec2]) -> Loop {
    if signed_area(points) > 0.0 {
        points.iter().rev().copied().collect()
    } else {
        points.to_vec()
    }
}

/// Drop a repeated closing point and consecutive duplicates, then validate
pub fn normalize_loop(points: &[DVec2], epsilon: f64) -> SketchResult<Loop> {
    let mut result: Loop = Vec::with_capacity(points.len());
    for p in points {
        if result.last().is_some_and(|last| coincide(*last, *p, epsilon)) {
            continue;
        }
        result.push(*p);
    }
    while result.len() > 1 && coincide(result[0], result[result.len() - 1], epsilon) {
        result.pop();
    }

    if result.len() < 3 {
        return Err(SketchError::DegeneratePolygon(format!(
            "loop needs at least 3 distinct points, got {}",
            result.len()
        )));
    }
    if signed_area(&result).abs() <= MIN_AREA_THRESHOLD {
        return Err(SketchError::DegeneratePolygon("loop has no area".into()));
    }
    Ok(result)
}

/// Whether two points coincide within `epsilon`
pub fn coincide(a: DVec2, b: DVec2, epsilon: f64) -> bool {
    a.distance_squared(b) <= epsilon * epsilon
}

/// Iterate over the edges of a loop, including the closing edge
pub fn edges(points: &[DVec2]) -> impl Iterator<Item = (DVec2, DVec2)> + '_ {
    let n = points.len();
    (0..n).map(move |i| (points[i], points[(i + 1) % n]))
}

/// Check if a point is inside a loop using ray casting
pub fn point_in_loop(point: DVec2, points: &[DVec2]) -> bool {
    if points.len() < 3 {
        return false;
    }

    let mut inside = false;
    let n = points.len();
    let mut j = n - 1;
    for i in 0..n {
        let pi = points[i];
        let pj = points[j];
        if ((pi.y > point.y) != (pj.y > point.y))
            && (point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Whether segments `a0-a1` and `b0-b1` cross or touch
pub fn segments_intersect(a0: DVec2, a1: DVec2, b0: DVec2, b1: DVec2, epsilon: f64) -> bool {
    let d1 = (a1 - a0).perp_dot(b0 - a0);
    let d2 = (a1 - a0).perp_dot(b1 - a0);
    let d3 = (b1 - b0).perp_dot(a0 - b0);
    let d4 = (b1 - b0).perp_dot(a1 - b0);

    if ((d1 > epsilon && d2 < -epsilon) || (d1 < -epsilon && d2 > epsilon))
        && ((d3 > epsilon && d4 < -epsilon) || (d3 < -epsilon && d4 > epsilon))
    {
        return true;
    }

    (d1.abs() <= epsilon && on_segment(a0, a1, b0, epsilon))
        || (d2.abs() <= epsilon && on_segment(a0, a1, b1, epsilon))
        || (d3.abs() <= epsilon && on_segment(b0, b1, a0, epsilon))
        || (d4.abs() <= epsilon && on_segment(b0, b1, a1, epsilon))
}

fn on_segment(s0: DVec2, s1: DVec2, p: DVec2, epsilon: f64) -> bool {
    p.x >= s0.x.min(s1.x) - epsilon
        && p.x <= s0.x.max(s1.x) + epsilon
        && p.y >= s0.y.min(s1.y) - epsilon
        && p.y <= s0.y.max(s1.y) + epsilon
}

/// Whether any edge of `a` touches or crosses any edge of `b`
pub fn loops_touch(a: &[DVec2], b: &[DVec2], epsilon: f64) -> bool {
    edges(a).any(|(a0, a1)| edges(b).any(|(b0, b1)| segments_intersect(a0, a1, b0, b1, epsilon)))
}

/// Check if loop `inner` lies strictly inside loop `outer`
pub fn loop_inside_loop(inner: &[DVec2], outer: &[DVec2], epsilon: f64) -> bool {
    inner.iter().all(|p| point_in_loop(*p, outer)) && !loops_touch(inner, outer, epsilon)
}

/// Compute the bounding box of a loop
pub fn bounds(points: &[DVec2]) -> Option<(DVec2, DVec2)> {
    let first = *points.first()?;
    Some(
        points
            .iter()
            .skip(1)
            .fold((first, first), |(min, max), p| (min.min(*p), max.max(*p))),
    )
}

/// Check if two bounding boxes overlap
pub fn bounds_overlap(a: (DVec2, DVec2), b: (DVec2, DVec2)) -> bool {
    a.0.x <= b.1.x && a.1.x >= b.0.x && a.0.y <= b.1.y && a.1.y >= b.0.y
}

/// Whether two edges are the same segment, in either direction
pub fn same_edge(a: (DVec2, DVec2), b: (DVec2, DVec2), epsilon: f64) -> bool {
    (coincide(a.0, b.0, epsilon) && coincide(a.1, b.1, epsilon))
        || (coincide(a.0, b.1, epsilon) && coincide(a.1, b.0, epsilon))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(size: f64) -> Loop {
        vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(size, 0.0),
            DVec2::new(size, size),
            DVec2::new(0.0, size),
        ]
    }

    #[test]
    fn test_signed_area_and_winding() {
        let ccw = square(2.0);
        assert_relative_eq!(signed_area(&ccw), 4.0);

        let cw = ensure_cw(&ccw);
        assert_relative_eq!(signed_area(&cw), -4.0);
        assert_relative_eq!(signed_area(&ensure_ccw(&cw)), 4.0);
    }

    #[test]
    fn test_normalize_loop() {
        let mut closed = square(1.0);
        closed.push(DVec2::new(0.0, 0.0));
        closed.insert(1, DVec2::new(0.0, 0.0));
        let normalized = normalize_loop(&closed, 1e-9).unwrap();
        assert_eq!(normalized.len(), 4);

        let line = vec![DVec2::ZERO, DVec2::X, DVec2::X * 2.0];
        assert!(matches!(
            normalize_loop(&line, 1e-9),
            Err(SketchError::DegeneratePolygon(_))
        ));
    }

    #[test]
    fn test_containment() {
        let outer = square(10.0);
        let inner: Loop = square(2.0).iter().map(|p| *p + DVec2::splat(4.0)).collect();
        let crossing: Loop = square(4.0).iter().map(|p| *p + DVec2::splat(8.0)).collect();

        assert!(loop_inside_loop(&inner, &outer, 1e-9));
        assert!(!loop_inside_loop(&crossing, &outer, 1e-9));
        assert!(loops_touch(&crossing, &outer, 1e-9));
    }

    #[test]
    fn test_same_edge() {
        let a = (DVec2::ZERO, DVec2::X);
        assert!(same_edge(a, (DVec2::X, DVec2::ZERO), 1e-9));
        assert!(!same_edge(a, (DVec2::ZERO, DVec2::Y), 1e-9));
    }
}
