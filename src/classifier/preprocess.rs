use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, RgbImage};

use crate::classifier::{ClassifierInput, KeyModel};
use crate::detection::preprocessing::normalize_min_max;
use crate::error::{Error, Result};
use crate::models::FractionalRoi;

/// Crop the ROI and stretch its intensities to the full range.
/// Normalization is per crop, not per full image.
pub fn crop_normalized(image: &RgbImage, roi: &FractionalRoi, key: &str) -> Result<GrayImage> {
    let (width, height) = image.dimensions();
    let bbox = roi.crop_box(width, height);
    if bbox.is_empty() {
        return Err(Error::EmptyCrop {
            key: key.to_string(),
            width,
            height,
        });
    }

    let cropped = imageops::crop_imm(image, bbox.x, bbox.y, bbox.width, bbox.height).to_image();
    let gray = imageops::grayscale(&cropped);
    Ok(normalize_min_max(&gray))
}

/// Full preprocessing chain for one classifier: crop, normalize, replicate
/// to three channels, cubic resize, scale to `[0, 1]`
pub fn prepare_input(image: &RgbImage, model: &KeyModel) -> Result<ClassifierInput> {
    let gray = crop_normalized(image, &model.roi, &model.key_name)?;
    let rgb = DynamicImage::ImageLuma8(gray).to_rgb8();

    let (width, height) = model.image_size;
    let resized = imageops::resize(&rgb, width, height, FilterType::CatmullRom);

    // Row-major RGB bytes already are NHWC for a batch of one
    let data = resized.as_raw().iter().map(|&v| v as f32 / 255.0).collect();

    Ok(ClassifierInput {
        width,
        height,
        data,
    })
}
