//! Fixtures shared by the unit tests.

use crate::analyzer::{AnalyzerError, DetectedFace, FaceAnalyzer};
use crate::types::{BoundingBox, Embedding};
use image::{DynamicImage, Rgb, RgbImage};
use std::collections::HashMap;
use std::path::Path;

pub fn face_box(x1: i32, y1: i32, x2: i32, y2: i32) -> BoundingBox {
    BoundingBox {
        x: x1 as f32,
        y: y1 as f32,
        width: (x2 - x1) as f32,
        height: (y2 - y1) as f32,
        confidence: 0.99,
        landmarks: None,
    }
}

/// Write a solid-grey PNG whose pixel value identifies it to the fake analyzer.
pub fn write_photo(path: &Path, key: u8) {
    RgbImage::from_pixel(32, 32, Rgb([key, key, key])).save(path).unwrap();
}

/// Analyzer that looks up faces by the photo's top-left pixel value.
#[derive(Default)]
pub struct ColorKeyedAnalyzer {
    faces: HashMap<u8, Vec<Vec<f32>>>,
    pub calls: usize,
}

impl ColorKeyedAnalyzer {
    pub fn with_faces(mut self, key: u8, embeddings: &[&[f32]]) -> Self {
        self.faces
            .insert(key, embeddings.iter().map(|e| e.to_vec()).collect());
        self
    }
}

impl FaceAnalyzer for ColorKeyedAnalyzer {
    fn analyze(&mut self, image: &DynamicImage) -> Result<Vec<DetectedFace>, AnalyzerError> {
        self.calls += 1;
        let key = image.to_rgb8().get_pixel(0, 0)[0];
        Ok(self
            .faces
            .get(&key)
            .map(|embeddings| {
                embeddings
                    .iter()
                    .map(|values| DetectedFace {
                        bbox: face_box(4, 4, 20, 20),
                        embedding: Embedding::new(values.clone()),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}
