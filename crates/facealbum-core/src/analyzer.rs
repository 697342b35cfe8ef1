//! Face detection + embedding capability consumed by the pipeline.

use crate::detector::{DetectorError, FaceDetector};
use crate::recognizer::{FaceRecognizer, RecognizerError};
use crate::types::{BoundingBox, Embedding};
use image::DynamicImage;
use std::path::Path;
use thiserror::Error;

/// SCRFD detection model file name inside the model directory.
pub const SCRFD_MODEL_FILE: &str = "det_10g.onnx";
/// ArcFace recognition model file name inside the model directory.
pub const ARCFACE_MODEL_FILE: &str = "w600k_r50.onnx";

#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("detector error: {0}")]
    Detector(#[from] DetectorError),
    #[error("recognizer error: {0}")]
    Recognizer(#[from] RecognizerError),
}

/// One face found in a photo.
#[derive(Debug, Clone)]
pub struct DetectedFace {
    pub bbox: BoundingBox,
    pub embedding: Embedding,
}

/// Detects faces in a decoded photo and embeds each of them.
///
/// Implementations must be deterministic for a fixed photo and keep a
/// stable face order within one call. The pipeline never calls one
/// concurrently.
pub trait FaceAnalyzer {
    fn analyze(&mut self, image: &DynamicImage) -> Result<Vec<DetectedFace>, AnalyzerError>;
}

impl<A: FaceAnalyzer + ?Sized> FaceAnalyzer for Box<A> {
    fn analyze(&mut self, image: &DynamicImage) -> Result<Vec<DetectedFace>, AnalyzerError> {
        (**self).analyze(image)
    }
}

/// SCRFD + ArcFace analyzer backed by ONNX Runtime.
pub struct OnnxFaceAnalyzer {
    detector: FaceDetector,
    recognizer: FaceRecognizer,
}

impl OnnxFaceAnalyzer {
    /// Load both models from `model_dir`. Fails fast if either is missing.
    pub fn load(model_dir: &Path) -> Result<Self, AnalyzerError> {
        let scrfd_path = model_dir.join(SCRFD_MODEL_FILE).to_string_lossy().into_owned();
        let detector = FaceDetector::load(&scrfd_path)?;
        tracing::info!(path = %scrfd_path, "SCRFD detector loaded");

        let arcface_path = model_dir.join(ARCFACE_MODEL_FILE).to_string_lossy().into_owned();
        let recognizer = FaceRecognizer::load(&arcface_path)?;
        tracing::info!(path = %arcface_path, "ArcFace recognizer loaded");

        Ok(Self { detector, recognizer })
    }
}

impl FaceAnalyzer for OnnxFaceAnalyzer {
    fn analyze(&mut self, image: &DynamicImage) -> Result<Vec<DetectedFace>, AnalyzerError> {
        let rgb = image.to_rgb8();
        let boxes = self.detector.detect(&rgb)?;

        let mut faces = Vec::with_capacity(boxes.len());
        for bbox in boxes {
            let embedding = self.recognizer.extract(&rgb, &bbox)?;
            faces.push(DetectedFace { bbox, embedding });
        }
        Ok(faces)
    }
}
