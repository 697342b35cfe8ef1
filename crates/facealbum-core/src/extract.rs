//! Face extraction: detect, crop and record every face in a photo folder.

use crate::analyzer::FaceAnalyzer;
use crate::cache::FaceCache;
use crate::report::StatusLog;
use crate::scan;
use crate::timestamp;
use crate::types::{BoundingBox, FaceId, FaceRecord};
use image::{DynamicImage, ImageFormat};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CropError {
    #[error("face box ({x1}, {y1}, {x2}, {y2}) is empty inside a {width}x{height} photo")]
    Empty {
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        width: u32,
        height: u32,
    },
    #[error("writing crop: {0}")]
    Image(#[from] image::ImageError),
}

/// Crop `bbox` out of `image` (clamped to the photo) and write it as JPEG.
pub fn save_face_crop(
    image: &DynamicImage,
    bbox: &BoundingBox,
    path: &Path,
) -> Result<(), CropError> {
    let (x1, y1, x2, y2) = bbox.pixel_corners();
    let (width, height) = (image.width(), image.height());
    let cx1 = x1.clamp(0, width as i32);
    let cy1 = y1.clamp(0, height as i32);
    let cx2 = x2.clamp(0, width as i32);
    let cy2 = y2.clamp(0, height as i32);
    if cx2 <= cx1 || cy2 <= cy1 {
        return Err(CropError::Empty {
            x1,
            y1,
            x2,
            y2,
            width,
            height,
        });
    }

    let crop = image.crop_imm(cx1 as u32, cy1 as u32, (cx2 - cx1) as u32, (cy2 - cy1) as u32);
    crop.to_rgb8().save_with_format(path, ImageFormat::Jpeg)?;
    Ok(())
}

/// Extract every face from the photos directly inside `dir`.
///
/// Face ids start at 0 and increase by one per recorded face. A photo that
/// fails to decode or analyze is skipped, as is a face whose crop cannot be
/// written. Old crops are cleared before the loop and the full record list
/// replaces the face cache once it is done, dropping the cluster assignment
/// snapshot of the previous run. A missing directory returns an empty list
/// without touching the cache.
pub fn extract_faces<A: FaceAnalyzer + ?Sized>(
    analyzer: &mut A,
    cache: &FaceCache,
    dir: &Path,
    log: &mut StatusLog,
) -> Vec<FaceRecord> {
    log.info(format!("Starting face extraction for directory: {}", dir.display()));
    let images = match scan::list_images(dir) {
        Ok(images) => images,
        Err(e) => {
            log.error(format!("Input directory not found at {} ({e})", dir.display()));
            return Vec::new();
        }
    };
    log.info(format!("Found {} images to process.", images.len()));

    if let Err(e) = cache.reset_faces_dir() {
        log.warn(format!("Could not reset face cache folder: {e}"));
    }

    let mut records = Vec::new();
    let mut next_id: FaceId = 0;

    for path in &images {
        let (taken_at, timestamp_source) = timestamp::resolve(path);

        let image = match image::open(path) {
            Ok(image) => image,
            Err(e) => {
                log.warn(format!("Could not read image: {} ({e})", path.display()));
                continue;
            }
        };

        let faces = match analyzer.analyze(&image) {
            Ok(faces) => faces,
            Err(e) => {
                log.error(format!("An error occurred while processing {}: {e}", path.display()));
                continue;
            }
        };
        if faces.is_empty() {
            tracing::debug!(path = %path.display(), "no faces");
            continue;
        }

        log.info(format!("Found {} faces in: {}", faces.len(), display_name(path)));
        for face in faces {
            let face_image_path = cache.face_image_path(next_id);
            if let Err(e) = save_face_crop(&image, &face.bbox, &face_image_path) {
                log.warn(format!("Skipping a face in {}: {e}", display_name(path)));
                continue;
            }

            records.push(FaceRecord {
                face_id: next_id,
                embedding: face.embedding,
                original_path: path.clone(),
                face_image_url: cache.face_image_url(&face_image_path),
                face_image_path,
                taken_at: taken_at.clone(),
                timestamp_source,
            });
            next_id += 1;
        }
    }

    log.info(format!("Total faces extracted: {}", records.len()));
    match cache.save_faces(&records) {
        Ok(()) => {
            if let Err(e) = cache.clear_cluster_assignments() {
                log.warn(format!("Could not remove stale cluster assignments: {e}"));
            }
        }
        Err(e) => log.error(format!("Failed to persist face cache: {e}")),
    }
    records
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
