use std::collections::HashMap;
use std::path::{Path, PathBuf};

use image::{ImageReader, RgbImage};
use tracing::{debug, info, warn};

use crate::annotation::store::{AnnotationSet, ANNOTATIONS_FILENAME};
use crate::annotation::{AnnotationRecord, FieldKey, FieldPredictions};
use crate::classifier::RoiClassifier;
use crate::detection::ScreenDetector;
use crate::error::{Error, Result};

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Fixed registry of the seven field classifiers, built once and only read
/// afterwards
#[derive(Debug)]
pub struct ClassifierBank {
    classifiers: HashMap<FieldKey, RoiClassifier>,
}

impl ClassifierBank {
    /// Load every field model from `dir`. Any missing model or sidecar
    /// aborts: a partial bank would skew the screen type.
    pub fn load(dir: &Path) -> Result<Self> {
        let mut classifiers = HashMap::new();
        for key in FieldKey::ALL {
            classifiers.insert(key, RoiClassifier::load(dir, key.as_str())?);
        }
        Ok(Self { classifiers })
    }

    /// Build from already constructed classifiers, keyed by their model's
    /// key name. All seven fields must be covered.
    pub fn from_classifiers(classifiers: impl IntoIterator<Item = RoiClassifier>) -> Result<Self> {
        let mut map = HashMap::new();
        for classifier in classifiers {
            let key: FieldKey = classifier.key_name().parse()?;
            map.insert(key, classifier);
        }
        if let Some(missing) = FieldKey::ALL.into_iter().find(|k| !map.contains_key(k)) {
            return Err(Error::MissingClassifier(missing));
        }
        Ok(Self { classifiers: map })
    }

    pub fn get(&self, key: FieldKey) -> Option<&RoiClassifier> {
        self.classifiers.get(&key)
    }
}

/// Summary of a batch run
#[derive(Debug, Default)]
pub struct BatchReport {
    pub records: Vec<AnnotationRecord>,
    /// Images that could not be decoded, had no usable screen or could not
    /// be classified
    pub skipped: Vec<(String, String)>,
    pub output: PathBuf,
}

/// Runs the classifier bank over images and assembles gated records
#[derive(Debug)]
pub struct AnnotationAggregator {
    bank: ClassifierBank,
    detector: Option<ScreenDetector>,
}

impl AnnotationAggregator {
    pub fn new(bank: ClassifierBank) -> Self {
        Self { bank, detector: None }
    }

    /// Rectify every image with `detector` before classification.
    /// Without it images are assumed to be rectified already.
    pub fn with_detector(mut self, detector: ScreenDetector) -> Self {
        self.detector = Some(detector);
        self
    }

    /// Run all seven classifiers
    pub fn predict_fields(&self, image: &RgbImage) -> Result<FieldPredictions> {
        let mut predictions = FieldPredictions::new();
        for key in FieldKey::ALL {
            let classifier = self.bank.get(key).ok_or(Error::MissingClassifier(key))?;
            predictions.insert(key, classifier.classify(image)?);
        }
        Ok(predictions)
    }

    /// Annotate one image that is already in canonical form
    pub fn annotate(&self, filename: &str, image: &RgbImage) -> Result<AnnotationRecord> {
        let predictions = self.predict_fields(image)?;
        let record = AnnotationRecord::from_predictions(filename, &predictions);
        debug!("{}: screen {:?}", filename, record.screen());
        Ok(record)
    }

    /// Annotate every image in `dataset_dir` and replace
    /// `<dataset_dir>/annotations.json` with the result.
    ///
    /// Images are processed in filename order. Non-image entries are ignored
    /// and per-image failures (undecodable file, no screen found, a crop or
    /// inference that fails on this image) are logged and skipped without
    /// stopping the batch. A missing classifier aborts.
    pub fn annotate_dir(&self, dataset_dir: &Path) -> Result<BatchReport> {
        let images = list_images(dataset_dir)?;
        info!("annotating {} images in {}", images.len(), dataset_dir.display());

        let mut report = BatchReport::default();
        for path in images {
            let Some(filename) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                continue;
            };
            // Files can vanish between listing and reading
            if !path.is_file() {
                continue;
            }

            let image = match self.load_canonical(&path) {
                Ok(image) => image,
                Err(reason) => {
                    warn!("skipping {}: {}", filename, reason);
                    report.skipped.push((filename, reason));
                    continue;
                }
            };
            match self.annotate(&filename, &image) {
                Ok(record) => report.records.push(record),
                Err(e) if e.is_per_image() => {
                    warn!("skipping {}: {}", filename, e);
                    report.skipped.push((filename, e.to_string()));
                }
                Err(e) => return Err(e),
            }
        }

        let output = dataset_dir.join(ANNOTATIONS_FILENAME);
        AnnotationSet::from_records(report.records.clone()).save(&output)?;
        info!(
            "wrote {} annotations to {} ({} skipped)",
            report.records.len(),
            output.display(),
            report.skipped.len()
        );
        report.output = output;
        Ok(report)
    }

    /// Decode an image and, if a detector is configured, rectify it.
    /// Failures come back as a reason to record against the file.
    pub fn load_canonical(&self, path: &Path) -> std::result::Result<RgbImage, String> {
        let decoded = ImageReader::open(path)
            .map_err(|e| e.to_string())?
            .with_guessed_format()
            .map_err(|e| e.to_string())?
            .decode()
            .map_err(|e| e.to_string())?;

        match &self.detector {
            Some(detector) => detector.detect_and_rectify(&decoded).map_err(|e| e.to_string()),
            None => Ok(decoded.to_rgb8()),
        }
    }
}

/// Image files directly inside `dir`, sorted by filename
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut images: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && has_image_extension(path))
        .collect();
    images.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(images)
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.iter().any(|x| ext.eq_ignore_ascii_case(x)))
}
