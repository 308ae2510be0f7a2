#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use blm_annotator::annotation::{AnnotationRecord, FieldKey, FieldPredictions};
use blm_annotator::classifier::{ClassifierInput, Inference, KeyModel, RoiClassifier};
use blm_annotator::models::FractionalRoi;
use blm_annotator::{AnnotationSet, ClassifierBank};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;

/// Screen corners of the synthetic photo, in clockwise order from top-left
pub const SCREEN_CORNERS: [(i32, i32); 4] = [(50, 50), (850, 60), (840, 440), (60, 430)];

pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

/// Draws a filled polygon on a black canvas
pub fn polygon_image(width: u32, height: u32, corners: &[(i32, i32)]) -> RgbImage {
    let mut img = RgbImage::from_pixel(width, height, BLACK);
    fill_polygon(&mut img, corners, WHITE);
    img
}

pub fn fill_polygon(img: &mut RgbImage, corners: &[(i32, i32)], color: Rgb<u8>) {
    let poly: Vec<Point<i32>> = corners.iter().map(|&(x, y)| Point::new(x, y)).collect();
    draw_polygon_mut(img, &poly, color);
}

/// A 900x500 "photo" of a slightly tilted white screen on a black
/// background, with a dark marker near the screen's top-left corner
pub fn screen_photo() -> RgbImage {
    let mut img = polygon_image(900, 500, &SCREEN_CORNERS);
    fill_rect(&mut img, 150, 120, 50, 40, BLACK);
    img
}

pub fn fill_rect(img: &mut RgbImage, x: u32, y: u32, w: u32, h: u32, color: Rgb<u8>) {
    for yy in y..(y + h).min(img.height()) {
        for xx in x..(x + w).min(img.width()) {
            img.put_pixel(xx, yy, color);
        }
    }
}

/// Canonical 900x450 frame split into a dark left half and a bright
/// right half
pub fn split_frame() -> RgbImage {
    RgbImage::from_fn(900, 450, |x, _| if x < 450 { Rgb([40, 40, 40]) } else { Rgb([200, 200, 200]) })
}

/// Backend that always returns the same scores
pub struct FixedScores(pub Vec<f32>);

impl Inference for FixedScores {
    fn infer(&self, _input: &ClassifierInput) -> blm_annotator::Result<Vec<f32>> {
        Ok(self.0.clone())
    }
}

/// Backend scoring two classes by the mean intensity of its input
pub struct MeanIntensity;

impl Inference for MeanIntensity {
    fn infer(&self, input: &ClassifierInput) -> blm_annotator::Result<Vec<f32>> {
        let mean = input.data.iter().sum::<f32>() / input.data.len().max(1) as f32;
        Ok(vec![1.0 - mean, mean])
    }
}

/// Backend that records the last input it saw
#[derive(Clone, Default)]
pub struct CapturingBackend {
    pub last: Arc<Mutex<Option<ClassifierInput>>>,
}

impl CapturingBackend {
    pub fn take(&self) -> Option<ClassifierInput> {
        self.last.lock().unwrap().take()
    }
}

impl Inference for CapturingBackend {
    fn infer(&self, input: &ClassifierInput) -> blm_annotator::Result<Vec<f32>> {
        *self.last.lock().unwrap() = Some(input.clone());
        Ok(vec![1.0])
    }
}

pub fn key_model(key: &str, roi: FractionalRoi, labels: &[&str]) -> KeyModel {
    KeyModel {
        key_name: key.to_string(),
        roi,
        class_labels: labels.iter().map(|l| l.to_string()).collect(),
        image_size: (64, 32),
    }
}

/// Classifier for `key` that always predicts `label`
pub fn constant_classifier(key: FieldKey, label: &str) -> RoiClassifier {
    RoiClassifier::new(
        key_model(key.as_str(), FractionalRoi::FULL_FRAME, &[label]),
        Box::new(FixedScores(vec![1.0])),
    )
    .expect("valid classifier")
}

/// Bank whose classifiers return the labels in `predictions`, "None"
/// for keys not listed
pub fn constant_bank(predictions: &[(FieldKey, &str)]) -> ClassifierBank {
    let classifiers = FieldKey::ALL.into_iter().map(|key| {
        let label = predictions
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, l)| *l)
            .unwrap_or("None");
        constant_classifier(key, label)
    });
    ClassifierBank::from_classifiers(classifiers).expect("complete bank")
}

/// Bank whose seven classifiers all read `roi` and predict `label`
pub fn roi_bank(roi: FractionalRoi, label: &str) -> ClassifierBank {
    let classifiers = FieldKey::ALL.into_iter().map(|key| {
        RoiClassifier::new(key_model(key.as_str(), roi, &[label]), Box::new(FixedScores(vec![1.0])))
            .expect("valid classifier")
    });
    ClassifierBank::from_classifiers(classifiers).expect("complete bank")
}

pub fn predictions(labels: &[(FieldKey, &str)]) -> FieldPredictions {
    labels.iter().map(|&(k, l)| (k, l.to_string())).collect()
}

/// Ball-screen predictions from the reference example
pub fn ball_screen_predictions() -> FieldPredictions {
    predictions(&[
        (FieldKey::HlaDirection, "L"),
        (FieldKey::SpinAxisDirection, "R"),
        (FieldKey::BallSpeedUnits, "mph"),
        (FieldKey::CarryUnits, "yds"),
        (FieldKey::PathDirection, "None"),
        (FieldKey::AoaDirection, "None"),
        (FieldKey::ClubSpeedUnits, "None"),
    ])
}

pub fn save_png(path: &Path, img: &RgbImage) {
    img.save_with_format(path, image::ImageFormat::Png)
        .expect("Failed to save test image");
}

/// Creates `<root>/<version>/` with the given images and annotation records.
/// Returns the version directory.
pub fn write_version(root: &Path, version: &str, images: &[&str], records: Vec<AnnotationRecord>) -> PathBuf {
    let dir = root.join(version);
    std::fs::create_dir_all(&dir).expect("Failed to create version directory");
    let img = RgbImage::from_pixel(90, 45, Rgb([128, 128, 128]));
    for name in images {
        save_png(&dir.join(name), &img);
    }
    AnnotationSet::from_records(records)
        .save(&dir.join("annotations.json"))
        .expect("Failed to write annotations");
    dir
}
