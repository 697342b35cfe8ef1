use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Sequential identifier of a face within one extraction run.
pub type FaceId = u64;

/// Label produced by the clustering pass.
pub type ClusterLabel = i32;

/// Label reserved for faces that belong to no person cluster.
pub const NOISE_LABEL: ClusterLabel = -1;

/// Display name of the noise bucket.
pub const UNIDENTIFIED_NAME: &str = "Unidentified";

/// Bounding box for a detected face, with optional facial landmarks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
    /// Five-point facial landmarks: [left_eye, right_eye, nose, left_mouth, right_mouth].
    pub landmarks: Option<[(f32, f32); 5]>,
}

impl BoundingBox {
    /// Integer `(x1, y1, x2, y2)` corners, truncated toward zero.
    pub fn pixel_corners(&self) -> (i32, i32, i32, i32) {
        (
            self.x as i32,
            self.y as i32,
            (self.x + self.width) as i32,
            (self.y + self.height) as i32,
        )
    }
}

/// Face embedding vector (512-dimensional for ArcFace).
///
/// Serialized as a plain numeric array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    /// Compute Euclidean distance between two embeddings.
    pub fn euclidean_distance(&self, other: &Embedding) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }

    /// Element-wise mean of a set of embeddings.
    ///
    /// Returns `None` for an empty set. All embeddings are expected to share
    /// one dimension; the result takes the dimension of the first.
    pub fn mean(embeddings: &[Embedding]) -> Option<Embedding> {
        let first = embeddings.first()?;
        let mut sums = vec![0.0f64; first.values.len()];
        for embedding in embeddings {
            for (sum, v) in sums.iter_mut().zip(embedding.values.iter()) {
                *sum += f64::from(*v);
            }
        }
        let count = embeddings.len() as f64;
        Some(Embedding {
            values: sums.into_iter().map(|s| (s / count) as f32).collect(),
        })
    }
}

/// Where a photo's capture time came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampSource {
    Exif,
    FileModified,
    #[default]
    Unknown,
}

/// One detected face, as persisted in the face cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceRecord {
    pub face_id: FaceId,
    pub embedding: Embedding,
    pub original_path: PathBuf,
    pub face_image_path: PathBuf,
    #[serde(default)]
    pub face_image_url: String,
    pub taken_at: Option<String>,
    #[serde(default)]
    pub timestamp_source: TimestampSource,
}

/// Face reference shown inside a cluster.
///
/// Edited clusters coming back from a human only need `face_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceRef {
    pub face_id: FaceId,
    #[serde(default)]
    pub face_image_url: String,
    #[serde(default)]
    pub taken_at: Option<String>,
    #[serde(default)]
    pub timestamp_source: TimestampSource,
}

/// Display form of one person cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub cluster_id: ClusterLabel,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub faces: Vec<FaceRef>,
}

impl Cluster {
    /// Default display name for a freshly projected cluster.
    pub fn default_name(label: ClusterLabel) -> String {
        if label == NOISE_LABEL {
            UNIDENTIFIED_NAME.to_string()
        } else {
            format!("Person {}", label + 1)
        }
    }
}

/// Persisted cluster membership, independent of embeddings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterAssignment {
    pub cluster_id: ClusterLabel,
    pub name: String,
    pub face_ids: Vec<FaceId>,
}

impl From<ClusterAssignment> for Cluster {
    fn from(assignment: ClusterAssignment) -> Self {
        Cluster {
            cluster_id: assignment.cluster_id,
            name: assignment.name,
            faces: assignment
                .face_ids
                .into_iter()
                .map(|face_id| FaceRef {
                    face_id,
                    face_image_url: String::new(),
                    taken_at: None,
                    timestamp_source: TimestampSource::Unknown,
                })
                .collect(),
        }
    }
}

/// On-disk form of the assignment snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentSnapshot {
    pub clusters: Vec<ClusterAssignment>,
    pub updated_at: String,
}
