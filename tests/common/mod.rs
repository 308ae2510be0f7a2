mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from blm_annotator for tests
pub use blm_annotator::{
    AnnotationAggregator, AnnotationRecord, AnnotationSet, ClassifierBank, Error, FieldKey,
    FieldPredictions, FractionalRoi, Point2D, Quadrilateral, RoiClassifier, ScreenDetector,
    ScreenError, ScreenFields, ScreenType,
};
