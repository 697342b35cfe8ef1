//! Targeted-person search: find photos containing the person shown in a
//! few sample photos.

use crate::analyzer::FaceAnalyzer;
use crate::error::PipelineError;
use crate::report::StatusLog;
use crate::scan;
use crate::types::Embedding;
use std::path::{Path, PathBuf};

/// Default match threshold on Euclidean distance to the reference.
pub const DEFAULT_MATCH_THRESHOLD: f32 = 1.2;

/// A photo in which at least one face matched the reference.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchMatch {
    pub path: PathBuf,
    /// Distance of the first face that fell under the threshold.
    pub distance: f32,
}

/// Whether a face at `distance` matches. The comparison is strict.
pub fn is_match(distance: f32, threshold: f32) -> bool {
    distance < threshold
}

/// Mean embedding of the first face in each usable sample photo.
///
/// Samples that cannot be decoded or contain no face are skipped with a
/// warning.
pub fn reference_embedding<A: FaceAnalyzer + ?Sized>(
    analyzer: &mut A,
    samples: &[PathBuf],
    log: &mut StatusLog,
) -> Result<Embedding, PipelineError> {
    if samples.is_empty() {
        return Err(PipelineError::NoSampleImages);
    }

    log.info("Step 1: Creating reference embedding from sample images...");
    let mut embeddings = Vec::new();
    for sample in samples {
        let image = match image::open(sample) {
            Ok(image) => image,
            Err(e) => {
                log.warn(format!(
                    "Warning: Could not read sample image {} ({e})",
                    sample.display()
                ));
                continue;
            }
        };
        match analyzer.analyze(&image) {
            Ok(faces) => match faces.into_iter().next() {
                Some(face) => embeddings.push(face.embedding),
                None => log.warn(format!(
                    "Warning: No faces found in sample image {}",
                    sample.display()
                )),
            },
            Err(e) => log.error(format!(
                "An error occurred while processing sample {}: {e}",
                sample.display()
            )),
        }
    }

    let reference = Embedding::mean(&embeddings).ok_or(PipelineError::NoReferenceFaces)?;
    tracing::debug!(
        samples = embeddings.len(),
        dim = reference.values.len(),
        "reference embedding"
    );
    log.info("Reference embedding created successfully.");
    Ok(reference)
}

/// Scan the photos directly inside `dir` for a face within `threshold` of
/// `reference`. Each photo is reported at most once, on its first matching
/// face.
pub fn scan_for_matches<A: FaceAnalyzer + ?Sized>(
    analyzer: &mut A,
    reference: &Embedding,
    dir: &Path,
    threshold: f32,
    log: &mut StatusLog,
) -> Result<Vec<SearchMatch>, PipelineError> {
    log.info("Step 2: Searching for matches in the target directory...");
    let images = scan::list_images(dir).map_err(|e| {
        tracing::debug!(dir = %dir.display(), error = %e, "cannot list search directory");
        PipelineError::InputDirectoryNotFound(dir.to_path_buf())
    })?;

    let mut matches = Vec::new();
    for path in images {
        let image = match image::open(&path) {
            Ok(image) => image,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "skipping undecodable photo");
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

        let hit = faces
            .iter()
            .map(|face| face.embedding.euclidean_distance(reference))
            .find(|&distance| is_match(distance, threshold));
        if let Some(distance) = hit {
            log.info(format!(
                "Found a match in {} (distance: {distance:.2})",
                path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default()
            ));
            matches.push(SearchMatch { path, distance });
        }
    }
    Ok(matches)
}

/// Build the reference from `samples`, then scan `dir`.
///
/// The directory is never scanned when no sample yields a face.
pub fn find_person<A: FaceAnalyzer + ?Sized>(
    analyzer: &mut A,
    samples: &[PathBuf],
    dir: &Path,
    threshold: f32,
    log: &mut StatusLog,
) -> Result<Vec<SearchMatch>, PipelineError> {
    let reference = reference_embedding(analyzer, samples, log)?;
    scan_for_matches(analyzer, &reference, dir, threshold, log)
}
