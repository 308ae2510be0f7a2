use image::GrayImage;
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::point::Point;

use crate::models::{Point2D, Quadrilateral};

/// Outer boundaries of the foreground regions, skipping holes and anything
/// nested inside another region. Order is the raster order in which border
/// following discovers them, so it is stable for a given image.
pub fn find_outer_contours(binary: &GrayImage) -> Vec<Contour<i32>> {
    find_contours::<i32>(binary)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .collect()
}

/// Douglas-Peucker simplification of a closed boundary with a tolerance of
/// `epsilon_factor` times its perimeter. Returns `None` for boundaries too
/// small to approximate.
///
/// The ring is split at two extreme points (the point farthest from the
/// start, and the point farthest from that one) and each half is simplified
/// as an open curve, so both split points always survive as vertices.
pub fn approximate_polygon(points: &[Point<i32>], epsilon_factor: f64) -> Option<Vec<Point<i32>>> {
    if points.len() < 4 {
        return None;
    }

    let perimeter = arc_length(points, true);
    let epsilon = epsilon_factor * perimeter;
    if epsilon <= 0.0 {
        return None;
    }

    let b = farthest_from(points, points[0]);
    let a = farthest_from(points, points[b]);
    let (i, j) = (a.min(b), a.max(b));
    if i == j {
        return None;
    }

    let mut wrapped = points[j..].to_vec();
    wrapped.extend_from_slice(&points[..=i]);

    let mut poly = approximate_polygon_dp(&points[i..=j], epsilon, false);
    let mut tail = approximate_polygon_dp(&wrapped, epsilon, false);
    // Each half ends where the other starts
    poly.pop();
    tail.pop();
    poly.append(&mut tail);
    poly.dedup();
    Some(poly)
}

fn farthest_from(points: &[Point<i32>], origin: Point<i32>) -> usize {
    let dist2 = |p: &Point<i32>| {
        let dx = (p.x - origin.x) as i64;
        let dy = (p.y - origin.y) as i64;
        dx * dx + dy * dy
    };
    points
        .iter()
        .enumerate()
        .max_by_key(|(_, p)| dist2(p))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// First boundary whose approximation has exactly four vertices.
///
/// This is deliberately first-match rather than best-match: on images with
/// several four-sided candidates the earliest one in discovery order wins,
/// and the choice must not silently change to "largest" or "most square".
pub fn first_matching_quadrilateral(
    contours: &[Contour<i32>],
    epsilon_factor: f64,
) -> Option<Quadrilateral> {
    contours.iter().find_map(|contour| {
        let poly = approximate_polygon(&contour.points, epsilon_factor)?;
        if poly.len() != 4 {
            return None;
        }
        Some(Quadrilateral::new([
            to_point(poly[0]),
            to_point(poly[1]),
            to_point(poly[2]),
            to_point(poly[3]),
        ]))
    })
}

fn to_point(p: Point<i32>) -> Point2D {
    Point2D::new(p.x as f32, p.y as f32)
}
