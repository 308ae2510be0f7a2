use crate::models::{Point2D, Quadrilateral};

/// Put four corners into a consistent rotational cycle.
///
/// Points are sorted by `atan2(y - cy, x - cx)` around their centroid. With
/// the image y axis pointing down this ascending order is clockwise on
/// screen. The sorted cycle is then rotated (not re-sorted) so the corner
/// nearest the origin comes first.
pub fn order_points(quad: &Quadrilateral) -> Quadrilateral {
    let center = quad.centroid();
    let mut points = quad.points;
    points.sort_by(|a, b| angle_from(center, a).total_cmp(&angle_from(center, b)));

    let closest = points
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.norm().total_cmp(&b.norm()))
        .map(|(i, _)| i)
        .unwrap_or(0);
    points.rotate_left(closest);

    Quadrilateral::new(points)
}

fn angle_from(center: Point2D, p: &Point2D) -> f32 {
    (p.y - center.y).atan2(p.x - center.x)
}
