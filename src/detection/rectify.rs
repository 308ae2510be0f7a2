use image::{Rgb, RgbImage};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};

use crate::error::ScreenError;
use crate::models::Quadrilateral;

/// Canonical width of a rectified screen, matching the display's 2:1 aspect
pub const CANONICAL_WIDTH: u32 = 900;
/// Canonical height of a rectified screen
pub const CANONICAL_HEIGHT: u32 = 450;

/// Quadrilaterals smaller than this (in px^2) are treated as degenerate
const MIN_AREA: f32 = 1.0;

/// Maps an ordered screen quadrilateral onto a fixed-size rectangle
#[derive(Debug, Clone, Copy)]
pub struct PerspectiveRectifier {
    pub width: u32,
    pub height: u32,
}

impl PerspectiveRectifier {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Destination corners in cycle order: top-left, top-right,
    /// bottom-right, bottom-left
    pub fn destination(&self) -> [(f32, f32); 4] {
        let (w, h) = (self.width as f32, self.height as f32);
        [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)]
    }

    /// Solve the projective transform taking `quad` onto the canonical
    /// rectangle. `quad` must already be ordered.
    pub fn projection(&self, quad: &Quadrilateral) -> Result<Projection, ScreenError> {
        if quad.area() < MIN_AREA || !quad.is_convex() {
            return Err(ScreenError::DegenerateQuadrilateral);
        }
        Projection::from_control_points(quad.as_tuples(), self.destination())
            .ok_or(ScreenError::DegenerateQuadrilateral)
    }

    /// Resample `image` so `quad` fills the whole canonical canvas.
    /// Pixels whose pre-image falls outside the source are black.
    pub fn rectify(&self, image: &RgbImage, quad: &Quadrilateral) -> Result<RgbImage, ScreenError> {
        let projection = self.projection(quad)?;
        let mut out = RgbImage::new(self.width, self.height);
        warp_into(image, &projection, Interpolation::Bilinear, Rgb([0, 0, 0]), &mut out);
        Ok(out)
    }
}

impl Default for PerspectiveRectifier {
    fn default() -> Self {
        Self::new(CANONICAL_WIDTH, CANONICAL_HEIGHT)
    }
}
