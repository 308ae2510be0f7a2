use image::{DynamicImage, GrayImage, Luma};
use imageproc::contrast::{otsu_level, threshold, ThresholdType};
use imageproc::distance_transform::Norm;
use imageproc::morphology;

/// Convert image to grayscale
pub fn to_grayscale(img: &DynamicImage) -> GrayImage {
    img.to_luma8()
}

/// Linearly stretch intensities so the observed min/max land on 0/255.
/// A flat image has no range to stretch and comes back all black.
pub fn normalize_min_max(img: &GrayImage) -> GrayImage {
    let (lo, hi) = img
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));

    if hi <= lo {
        return GrayImage::new(img.width(), img.height());
    }

    let scale = 255.0 / (hi - lo) as f32;
    let mut out = GrayImage::new(img.width(), img.height());
    for (x, y, p) in img.enumerate_pixels() {
        let v = ((p[0] - lo) as f32 * scale).round();
        out.put_pixel(x, y, Luma([v.clamp(0.0, 255.0) as u8]));
    }
    out
}

/// Binarize with the Otsu level: pixels above it become 255, the rest 0
pub fn binarize_otsu(img: &GrayImage) -> GrayImage {
    let level = otsu_level(img);
    threshold(img, level, ThresholdType::Binary)
}

/// Morphological opening with a disk of the given radius.
/// Radius 5 matches an 11x11 elliptical kernel.
pub fn open_elliptical(img: &GrayImage, radius: u8) -> GrayImage {
    morphology::open(img, Norm::L2, radius)
}
