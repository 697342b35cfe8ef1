//! Face embeddings with the ArcFace `w600k_r50` model on ONNX Runtime.
//!
//! Produces 512-dimensional, L2-normalized face embeddings from aligned RGB
//! face crops, using the w600k_r50 ArcFace model.

use crate::alignment::{self, ALIGNED_SIZE};
use crate::types::{BoundingBox, Embedding};
use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

// ArcFace normalizes symmetrically, unlike the detector.
const ARCFACE_MEAN: f32 = 127.5;
const ARCFACE_STD: f32 = 127.5;
const ARCFACE_EMBEDDING_DIM: usize = 512;

#[derive(Error, Debug)]
pub enum RecognizerError {
    #[error("model file not found: {0} (fetch w600k_r50.onnx from the insightface buffalo_l pack)")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("face box is empty after clipping to the photo")]
    EmptyFace,
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Loaded ArcFace session.
pub struct FaceRecognizer {
    session: Session,
}

impl FaceRecognizer {
    /// Open `model_path`, failing early when the file is absent.
    pub fn load(model_path: &str) -> Result<Self, RecognizerError> {
        if !Path::new(model_path).exists() {
            return Err(RecognizerError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = model_path,
            inputs = ?session.inputs().iter().map(|i| i.name()).collect::<Vec<_>>(),
            "loaded ArcFace model"
        );

        Ok(Self { session })
    }

    /// Extract an embedding for one detected face of an RGB photo.
    ///
    /// Faces with landmarks are aligned to the canonical position; faces
    /// without fall back to a plain resize of the box.
    pub fn extract(
        &mut self,
        image: &RgbImage,
        face: &BoundingBox,
    ) -> Result<Embedding, RecognizerError> {
        let aligned = match &face.landmarks {
            Some(landmarks) => alignment::align_face(image, landmarks),
            None => crop_and_resize(image, face)?,
        };

        let input = preprocess(&aligned);
        let outputs = self.session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| RecognizerError::InferenceFailed(format!("embedding extraction: {e}")))?;

        if raw.len() != ARCFACE_EMBEDDING_DIM {
            return Err(RecognizerError::InferenceFailed(format!(
                "expected {ARCFACE_EMBEDDING_DIM}-dim embedding, got {}",
                raw.len()
            )));
        }

        Ok(Embedding::new(l2_normalize(raw)))
    }
}

fn crop_and_resize(image: &RgbImage, face: &BoundingBox) -> Result<RgbImage, RecognizerError> {
    let (x1, y1, x2, y2) = face.pixel_corners();
    let (w, h) = (image.width() as i32, image.height() as i32);
    let (x1, y1) = (x1.clamp(0, w), y1.clamp(0, h));
    let (x2, y2) = (x2.clamp(0, w), y2.clamp(0, h));
    if x2 <= x1 || y2 <= y1 {
        return Err(RecognizerError::EmptyFace);
    }
    let (x, y) = (x1 as u32, y1 as u32);
    let crop = imageops::crop_imm(image, x, y, (x2 - x1) as u32, (y2 - y1) as u32).to_image();
    Ok(imageops::resize(&crop, ALIGNED_SIZE, ALIGNED_SIZE, FilterType::Triangle))
}

/// Preprocess a 112x112 aligned RGB crop into a NCHW float tensor.
fn preprocess(aligned: &RgbImage) -> Array4<f32> {
    let size = ALIGNED_SIZE as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
    for (x, y, pixel) in aligned.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = (pixel[c] as f32 - ARCFACE_MEAN) / ARCFACE_STD;
        }
    }
    tensor
}

fn l2_normalize(raw: &[f32]) -> Vec<f32> {
    let norm: f32 = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        raw.iter().map(|x| x / norm).collect()
    } else {
        raw.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_preprocess_output_shape() {
        let aligned = RgbImage::from_pixel(ALIGNED_SIZE, ALIGNED_SIZE, Rgb([128, 128, 128]));
        let tensor = preprocess(&aligned);
        assert_eq!(tensor.shape(), &[1, 3, 112, 112]);
    }

    #[test]
    fn test_preprocess_keeps_channel_order() {
        let aligned = RgbImage::from_pixel(ALIGNED_SIZE, ALIGNED_SIZE, Rgb([255, 0, 128]));
        let tensor = preprocess(&aligned);
        assert!((tensor[[0, 0, 5, 5]] - 1.0).abs() < 1e-6);
        assert!((tensor[[0, 1, 5, 5]] + 1.0).abs() < 1e-6);
        let expected = (128.0 - ARCFACE_MEAN) / ARCFACE_STD;
        assert!((tensor[[0, 2, 5, 5]] - expected).abs() < 1e-6);
    }

    #[test]
    fn test_l2_normalize() {
        let v = l2_normalize(&[3.0, 4.0]);
        assert!((v[0] - 0.6).abs() < 1e-6 && (v[1] - 0.8).abs() < 1e-6);
        assert_eq!(l2_normalize(&[0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn test_crop_and_resize_without_landmarks() {
        let image = RgbImage::from_pixel(100, 80, Rgb([10, 20, 30]));
        let face = BoundingBox {
            x: 90.0, y: 70.0, width: 40.0, height: 40.0,
            confidence: 0.9, landmarks: None,
        };
        let crop = crop_and_resize(&image, &face).unwrap();
        assert_eq!(crop.dimensions(), (ALIGNED_SIZE, ALIGNED_SIZE));
        assert_eq!(crop.get_pixel(0, 0), &Rgb([10, 20, 30]));
    }

    #[test]
    fn test_crop_outside_photo_is_empty() {
        let image = RgbImage::new(50, 50);
        let face = BoundingBox {
            x: 60.0, y: 60.0, width: 10.0, height: 10.0,
            confidence: 0.9, landmarks: None,
        };
        assert!(matches!(crop_and_resize(&image, &face), Err(RecognizerError::EmptyFace)));
    }
}
