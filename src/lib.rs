pub mod annotation;
pub mod classifier;
pub mod dataset;
pub mod detection;
pub mod error;
pub mod models;
pub mod roi;

pub use annotation::aggregator::{AnnotationAggregator, BatchReport, ClassifierBank};
pub use annotation::store::AnnotationSet;
pub use annotation::{AnnotationRecord, FieldKey, FieldPredictions, ScreenFields, ScreenType};
pub use classifier::{ClassifierInput, Inference, KeyModel, RoiClassifier};
pub use dataset::{resolve_versions, DatasetVersion, TrainingManifest, TrainingPool};
pub use detection::ScreenDetector;
pub use error::{Error, Result, ScreenError};
pub use models::{CropBox, FractionalRoi, Point2D, Quadrilateral};
pub use roi::RoiTable;
