//! facealbum-core: face-based photo album organizer.
//!
//! Detects and embeds faces with SCRFD + ArcFace (ONNX Runtime), groups
//! them with DBSCAN, and copies the source photos into one album folder
//! per person. A targeted search finds one person from a few samples.

pub mod album;
pub mod alignment;
pub mod analyzer;
pub mod cache;
pub mod cluster;
pub mod detector;
pub mod error;
pub mod extract;
pub mod organizer;
pub mod projection;
pub mod recognizer;
pub mod report;
pub mod scan;
pub mod search;
pub mod timestamp;
pub mod types;

#[cfg(test)]
mod test_support;

use std::path::PathBuf;

pub use album::{Album, AlbumResult, MaterializeSummary};
pub use analyzer::{AnalyzerError, DetectedFace, FaceAnalyzer, OnnxFaceAnalyzer};
pub use cache::{CacheError, FaceCache};
pub use error::PipelineError;
pub use organizer::{AlbumOrganizer, SearchSummary, Settings};
pub use report::{Report, Severity, StatusEntry, StatusLog};
pub use search::SearchMatch;
pub use types::{
    BoundingBox, Cluster, ClusterAssignment, ClusterLabel, Embedding, FaceId, FaceRecord, FaceRef,
    TimestampSource,
};

/// Default ONNX model directory: `$XDG_DATA_HOME/facealbum/models`.
pub fn default_model_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("facealbum/models")
}
