pub mod preprocessing;
pub mod contours;
pub mod ordering;
pub mod rectify;

use std::path::{Path, PathBuf};

use image::{DynamicImage, RgbImage};
use tracing::{debug, warn};

use crate::error::ScreenError;
use crate::models::Quadrilateral;
use rectify::PerspectiveRectifier;

/// Screen detection and rectification orchestrator
#[derive(Debug, Clone)]
pub struct ScreenDetector {
    /// Radius of the elliptical opening kernel
    pub kernel_radius: u8,
    /// Polygon approximation tolerance as a fraction of the perimeter
    pub epsilon_factor: f64,
    pub rectifier: PerspectiveRectifier,
    debug_dir: Option<PathBuf>,
}

impl ScreenDetector {
    pub fn new() -> Self {
        Self {
            kernel_radius: 5,
            epsilon_factor: 0.02,
            rectifier: PerspectiveRectifier::default(),
            debug_dir: None,
        }
    }

    pub fn with_kernel_radius(mut self, radius: u8) -> Self {
        self.kernel_radius = radius;
        self
    }

    pub fn with_epsilon_factor(mut self, factor: f64) -> Self {
        self.epsilon_factor = factor;
        self
    }

    /// Save every intermediate stage to `output_dir`.
    /// The directory must be empty or non-existent.
    pub fn with_debug(mut self, output_dir: PathBuf) -> crate::Result<Self> {
        if output_dir.exists() {
            if std::fs::read_dir(&output_dir)?.next().is_some() {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    format!("debug directory is not empty: {}", output_dir.display()),
                )
                .into());
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }
        self.debug_dir = Some(output_dir);
        Ok(self)
    }

    /// Find the screen quadrilateral, already ordered for rectification.
    /// `None` means no four-sided region was found, which is an expected
    /// outcome on photos without a visible display.
    pub fn detect(&self, img: &DynamicImage) -> Option<Quadrilateral> {
        self.save_stage("00_input", || img.clone());

        let gray = preprocessing::to_grayscale(img);
        self.save_stage("01_grayscale", || DynamicImage::ImageLuma8(gray.clone()));

        let normalized = preprocessing::normalize_min_max(&gray);
        self.save_stage("02_normalized", || DynamicImage::ImageLuma8(normalized.clone()));

        let binary = preprocessing::binarize_otsu(&normalized);
        self.save_stage("03_threshold", || DynamicImage::ImageLuma8(binary.clone()));

        let opened = preprocessing::open_elliptical(&binary, self.kernel_radius);
        self.save_stage("04_opened", || DynamicImage::ImageLuma8(opened.clone()));

        let outer = contours::find_outer_contours(&opened);
        debug!("found {} outer contours", outer.len());

        let quad = contours::first_matching_quadrilateral(&outer, self.epsilon_factor)?;
        let ordered = ordering::order_points(&quad);
        debug!("screen corners: {:?}", ordered.as_tuples());
        Some(ordered)
    }

    /// Warp the region inside `quad` onto the canonical canvas
    pub fn rectify(&self, img: &DynamicImage, quad: &Quadrilateral) -> Result<RgbImage, ScreenError> {
        let warped = self.rectifier.rectify(&img.to_rgb8(), quad)?;
        self.save_stage("05_rectified", || DynamicImage::ImageRgb8(warped.clone()));
        Ok(warped)
    }

    /// Run detection and rectification in one go
    pub fn detect_and_rectify(&self, img: &DynamicImage) -> Result<RgbImage, ScreenError> {
        let quad = self.detect(img).ok_or(ScreenError::NoScreenFound)?;
        self.rectify(img, &quad)
    }

    fn save_stage(&self, name: &str, img: impl FnOnce() -> DynamicImage) {
        let Some(dir) = &self.debug_dir else {
            return;
        };
        let path = stage_path(dir, name);
        match img().save(&path) {
            Ok(()) => debug!("saved {}", path.display()),
            Err(e) => warn!("failed to save debug stage {}: {}", path.display(), e),
        }
    }
}

impl Default for ScreenDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn stage_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.png", name))
}
