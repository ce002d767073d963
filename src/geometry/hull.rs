use glam::Vec2;

use super::Polygon;

/// Convex hull (Andrew's monotone chain), counter-clockwise, without collinear points.
pub fn convex_hull(points: &[Vec2]) -> Polygon {
    let mut pts: Vec<Vec2> = points.iter().copied().filter(|p| p.is_finite()).collect();
    pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    pts.dedup();
    if pts.len() < 3 {
        return Polygon::new(pts);
    }

    let mut hull: Vec<Vec2> = Vec::with_capacity(pts.len() * 2);
    for p in &pts {
        push_hull_point(&mut hull, *p, 1);
    }
    let lower_len = hull.len();
    for p in pts.iter().rev().skip(1) {
        push_hull_point(&mut hull, *p, lower_len);
    }
    hull.pop();
    Polygon::new(hull)
}

fn push_hull_point(hull: &mut Vec<Vec2>, p: Vec2, floor: usize) {
    while hull.len() > floor {
        let a = hull[hull.len() - 2];
        let b = hull[hull.len() - 1];
        if (b - a).perp_dot(p - a) > 0.0 {
            break;
        }
        hull.pop();
    }
    hull.push(p);
}
