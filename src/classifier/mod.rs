pub mod preprocess;
pub mod rten_backend;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use image::RgbImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::models::FractionalRoi;
use rten_backend::RtenInference;

/// Label returned when the model's argmax has no entry in the label table
pub const UNKNOWN_LABEL: &str = "Unknown";

/// File extension of the serialized inference artifact
pub const MODEL_EXTENSION: &str = "rten";
/// File extension of the metadata sidecar next to it
pub const SIDECAR_EXTENSION: &str = "json";

const DEFAULT_IMAGE_SIZE: (u32, u32) = (64, 32);

/// Batch-of-one NHWC float input, 3 channels, values in `[0, 1]`
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierInput {
    pub width: u32,
    pub height: u32,
    pub data: Vec<f32>,
}

impl ClassifierInput {
    pub const CHANNELS: usize = 3;

    pub fn shape(&self) -> [usize; 4] {
        [1, self.height as usize, self.width as usize, Self::CHANNELS]
    }
}

/// Inference contract of a trained per-field model: one image in, one score
/// per class out.
pub trait Inference: Send + Sync {
    fn infer(&self, input: &ClassifierInput) -> Result<Vec<f32>>;
}

/// Immutable description of one field model
#[derive(Debug, Clone, PartialEq)]
pub struct KeyModel {
    pub key_name: String,
    pub roi: FractionalRoi,
    pub class_labels: Vec<String>,
    /// (width, height) the crop is resized to
    pub image_size: (u32, u32),
}

impl KeyModel {
    /// Label for a class index, "Unknown" when the index is out of range
    pub fn label_for(&self, index: usize) -> &str {
        self.class_labels
            .get(index)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_LABEL)
    }
}

/// On-disk sidecar. Every field is optional; absent ones fall back to the
/// full frame, the requested key, no labels and a 64x32 input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sidecar {
    pub roi: Option<FractionalRoi>,
    pub key_name: Option<String>,
    pub class_labels: Option<Vec<String>>,
    pub image_size: Option<[u32; 2]>,
}

impl Sidecar {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| Error::InvalidSidecar {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn into_key_model(self, fallback_key: &str) -> KeyModel {
        KeyModel {
            key_name: self.key_name.unwrap_or_else(|| fallback_key.to_string()),
            roi: self.roi.unwrap_or(FractionalRoi::FULL_FRAME),
            class_labels: self.class_labels.unwrap_or_default(),
            image_size: self
                .image_size
                .map(|[w, h]| (w, h))
                .unwrap_or(DEFAULT_IMAGE_SIZE),
        }
    }
}

impl From<&KeyModel> for Sidecar {
    fn from(model: &KeyModel) -> Self {
        Self {
            roi: Some(model.roi),
            key_name: Some(model.key_name.clone()),
            class_labels: Some(model.class_labels.clone()),
            image_size: Some([model.image_size.0, model.image_size.1]),
        }
    }
}

/// Paths of a model artifact and its sidecar for `key` inside `dir`
pub fn artifact_paths(dir: &Path, key: &str) -> (PathBuf, PathBuf) {
    (
        dir.join(format!("{}.{}", key, MODEL_EXTENSION)),
        dir.join(format!("{}.{}", key, SIDECAR_EXTENSION)),
    )
}

/// One trained field classifier bound to its region of the screen
pub struct RoiClassifier {
    model: KeyModel,
    backend: Box<dyn Inference>,
}

impl RoiClassifier {
    pub fn new(model: KeyModel, backend: Box<dyn Inference>) -> Result<Self> {
        let (w, h) = model.image_size;
        if w == 0 || h == 0 {
            return Err(Error::InvalidSidecar {
                path: PathBuf::from(&model.key_name),
                reason: format!("image_size {}x{} is empty", w, h),
            });
        }
        Ok(Self { model, backend })
    }

    /// Load `<dir>/<key>.rten` and its `<dir>/<key>.json` sidecar.
    /// Both halves must exist.
    pub fn load(dir: &Path, key: &str) -> Result<Self> {
        let (model_path, sidecar_path) = artifact_paths(dir, key);
        for (kind, path) in [("model", &model_path), ("sidecar", &sidecar_path)] {
            if !path.is_file() {
                return Err(Error::MissingArtifact {
                    key: key.to_string(),
                    kind,
                    path: path.clone(),
                });
            }
        }

        let model = Sidecar::load(&sidecar_path)?.into_key_model(key);
        info!(
            "loading model for '{}' from {} ({} classes, roi {:?})",
            model.key_name,
            model_path.display(),
            model.class_labels.len(),
            <[f64; 4]>::from(model.roi)
        );
        let backend = RtenInference::load(&model.key_name, &model_path)?;
        Self::new(model, Box::new(backend))
    }

    pub fn model(&self) -> &KeyModel {
        &self.model
    }

    pub fn key_name(&self) -> &str {
        &self.model.key_name
    }

    /// Predict the label of this classifier's field on `image`.
    /// Pure: the same image always yields the same label.
    pub fn classify(&self, image: &RgbImage) -> Result<String> {
        let input = preprocess::prepare_input(image, &self.model)?;
        let scores = self.backend.infer(&input)?;
        let label = match argmax(&scores) {
            Some(index) => self.model.label_for(index),
            None => UNKNOWN_LABEL,
        };
        debug!("{} -> {}", self.model.key_name, label);
        Ok(label.to_string())
    }
}

impl std::fmt::Debug for RoiClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoiClassifier")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

/// Index of the first maximum score
pub fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &s) in scores.iter().enumerate() {
        match best {
            Some((_, b)) if s <= b => {}
            _ => best = Some((i, s)),
        }
    }
    best.map(|(i, _)| i)
}
