use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A pixel position in image coordinates (y grows downwards)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point2D {
    pub x: f32,
    pub y: f32,
}

impl Point2D {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance from the image origin
    pub fn norm(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

impl From<(f32, f32)> for Point2D {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

impl From<Point2D> for (f32, f32) {
    fn from(p: Point2D) -> Self {
        (p.x, p.y)
    }
}

/// Four screen corners. Produced unordered by the detector and reordered by
/// [`crate::detection::ordering::order_points`] before rectification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quadrilateral {
    pub points: [Point2D; 4],
}

impl Quadrilateral {
    pub fn new(points: [Point2D; 4]) -> Self {
        Self { points }
    }

    pub fn centroid(&self) -> Point2D {
        let (sx, sy) = self
            .points
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        Point2D::new(sx / 4.0, sy / 4.0)
    }

    /// Signed shoelace area, positive when the cycle is clockwise on screen
    pub fn signed_area(&self) -> f32 {
        let mut acc = 0.0;
        for i in 0..4 {
            let a = self.points[i];
            let b = self.points[(i + 1) % 4];
            acc += a.x * b.y - b.x * a.y;
        }
        acc / 2.0
    }

    pub fn area(&self) -> f32 {
        self.signed_area().abs()
    }

    /// True when every turn along the cycle bends the same way
    pub fn is_convex(&self) -> bool {
        let mut sign = 0.0f32;
        for i in 0..4 {
            let a = self.points[i];
            let b = self.points[(i + 1) % 4];
            let c = self.points[(i + 2) % 4];
            let cross = (b.x - a.x) * (c.y - b.y) - (b.y - a.y) * (c.x - b.x);
            if cross == 0.0 {
                return false;
            }
            if sign == 0.0 {
                sign = cross.signum();
            } else if cross.signum() != sign {
                return false;
            }
        }
        true
    }

    pub fn as_tuples(&self) -> [(f32, f32); 4] {
        self.points.map(Into::into)
    }
}

/// Region expressed as fractions of an image's width and height.
///
/// Serialized as the `[x, y, w, h]` arrays used by sidecars and ROI files.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 4]", into = "[f64; 4]")]
pub struct FractionalRoi {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl FractionalRoi {
    pub const FULL_FRAME: FractionalRoi = FractionalRoi {
        x: 0.0,
        y: 0.0,
        w: 1.0,
        h: 1.0,
    };

    /// Create a region, rejecting components outside `[0, 1]`.
    /// A box that overhangs the right or bottom edge is accepted and clamped
    /// when cropping.
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Result<Self, Error> {
        for v in [x, y, w, h] {
            if !(0.0..=1.0).contains(&v) {
                return Err(Error::InvalidRoi(format!(
                    "component {} of [{}, {}, {}, {}] is outside [0, 1]",
                    v, x, y, w, h
                )));
            }
        }
        Ok(Self { x, y, w, h })
    }

    /// Absolute pixel box for an image of the given size.
    ///
    /// Offsets and extents are floored, then the last row and column of the
    /// nominal box are trimmed. The result is clamped to the image bounds.
    pub fn crop_box(&self, width: u32, height: u32) -> CropBox {
        let x_abs = (self.x * width as f64).floor() as u32;
        let y_abs = (self.y * height as f64).floor() as u32;
        let w_abs = (self.w * width as f64).floor() as u32;
        let h_abs = (self.h * height as f64).floor() as u32;

        // Trimmed end of the nominal box, clamped like a slice would be
        let x_end = (x_abs + w_abs).saturating_sub(1).min(width);
        let y_end = (y_abs + h_abs).saturating_sub(1).min(height);
        let x = x_abs.min(width);
        let y = y_abs.min(height);

        CropBox {
            x,
            y,
            width: x_end.saturating_sub(x),
            height: y_end.saturating_sub(y),
        }
    }
}

impl TryFrom<[f64; 4]> for FractionalRoi {
    type Error = Error;

    fn try_from([x, y, w, h]: [f64; 4]) -> Result<Self, Self::Error> {
        FractionalRoi::new(x, y, w, h)
    }
}

impl From<FractionalRoi> for [f64; 4] {
    fn from(roi: FractionalRoi) -> Self {
        [roi.x, roi.y, roi.w, roi.h]
    }
}

/// Pixel rectangle `[x, x + width) x [y, y + height)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropBox {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}
