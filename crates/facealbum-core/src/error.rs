use crate::cache::CacheError;
use crate::types::{ClusterLabel, FaceId};
use std::path::PathBuf;
use thiserror::Error;

/// Failures that abort a whole pipeline operation.
///
/// Per-image and per-copy problems never surface here; they are recorded in
/// the operation's status log and the item is skipped.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("input directory not found: {}", .0.display())]
    InputDirectoryNotFound(PathBuf),
    #[error("no faces found in {}", .0.display())]
    NoFacesFound(PathBuf),
    #[error("no sample images provided")]
    NoSampleImages,
    #[error("could not create a reference embedding: no faces found in sample images")]
    NoReferenceFaces,
    #[error("face cache not found at {}; re-process the images", .0.display())]
    CacheMissing(PathBuf),
    #[error("no saved clusters at {}; re-process the images", .0.display())]
    SnapshotMissing(PathBuf),
    #[error("cluster {cluster_id} references unknown face {face_id}; re-process the images")]
    UnknownFaceId {
        face_id: FaceId,
        cluster_id: ClusterLabel,
    },
    #[error("{labels} cluster labels for {records} face records")]
    LabelCountMismatch { records: usize, labels: usize },
    #[error("cache: {0}")]
    Cache(#[from] CacheError),
}
