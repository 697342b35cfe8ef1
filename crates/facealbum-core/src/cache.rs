//! On-disk face cache under `<output_root>/.cache`.
//!
//! Holds the face records of the last extraction (embeddings included), the
//! cropped face images, and the last cluster assignment snapshot. Every save
//! replaces the previous file wholesale.

use crate::types::{AssignmentSnapshot, ClusterAssignment, FaceId, FaceRecord};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

const CACHE_DIR: &str = ".cache";
const FACES_DIR: &str = "faces";
const FACES_FILE: &str = "all_faces_data.json";
const ASSIGNMENTS_FILE: &str = "cluster_assignments.json";

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("corrupt cache file {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Fixed-location cache rooted at an output directory.
#[derive(Debug, Clone)]
pub struct FaceCache {
    output_root: PathBuf,
    cache_dir: PathBuf,
    faces_dir: PathBuf,
}

impl FaceCache {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        let output_root = output_root.into();
        let cache_dir = output_root.join(CACHE_DIR);
        let faces_dir = cache_dir.join(FACES_DIR);
        Self {
            output_root,
            cache_dir,
            faces_dir,
        }
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn faces_dir(&self) -> &Path {
        &self.faces_dir
    }

    pub fn faces_file(&self) -> PathBuf {
        self.cache_dir.join(FACES_FILE)
    }

    pub fn assignments_file(&self) -> PathBuf {
        self.cache_dir.join(ASSIGNMENTS_FILE)
    }

    /// Create the cache and crop directories if they do not exist.
    pub fn ensure_dirs(&self) -> Result<(), CacheError> {
        std::fs::create_dir_all(&self.faces_dir).map_err(|source| CacheError::Io {
            path: self.faces_dir.clone(),
            source,
        })
    }

    /// Delete every cached crop and recreate the empty crop directory.
    pub fn reset_faces_dir(&self) -> Result<(), CacheError> {
        match std::fs::remove_dir_all(&self.faces_dir) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(source) => {
                return Err(CacheError::Io {
                    path: self.faces_dir.clone(),
                    source,
                })
            }
        }
        self.ensure_dirs()
    }

    /// Path of the cropped image for `face_id`.
    pub fn face_image_path(&self, face_id: FaceId) -> PathBuf {
        self.faces_dir.join(face_image_name(face_id))
    }

    /// Web locator for a cropped face, relative to the output root's parent.
    pub fn face_image_url(&self, face_image_path: &Path) -> String {
        let root_name = self
            .output_root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file_name = face_image_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("/{root_name}/{CACHE_DIR}/{FACES_DIR}/{file_name}")
    }

    /// Whether an extraction has ever been persisted here.
    pub fn has_faces(&self) -> bool {
        self.faces_file().is_file()
    }

    pub fn save_faces(&self, faces: &[FaceRecord]) -> Result<(), CacheError> {
        write_json(&self.faces_file(), faces)?;
        tracing::debug!(
            count = faces.len(),
            path = %self.faces_file().display(),
            "face cache saved"
        );
        Ok(())
    }

    /// Load the last face snapshot; empty when none was ever saved.
    pub fn load_faces(&self) -> Result<Vec<FaceRecord>, CacheError> {
        Ok(read_json(&self.faces_file())?.unwrap_or_default())
    }

    pub fn save_cluster_assignments(
        &self,
        clusters: &[ClusterAssignment],
        updated_at: &str,
    ) -> Result<(), CacheError> {
        let snapshot = AssignmentSnapshot {
            clusters: clusters.to_vec(),
            updated_at: updated_at.to_string(),
        };
        write_json(&self.assignments_file(), &snapshot)?;
        tracing::debug!(clusters = clusters.len(), updated_at, "cluster assignments saved");
        Ok(())
    }

    /// Whether an assignment snapshot is on disk.
    pub fn has_cluster_assignments(&self) -> bool {
        self.assignments_file().is_file()
    }

    /// Remove the assignment snapshot, if any.
    ///
    /// Face ids restart at 0 on every extraction, so a snapshot only
    /// describes the face snapshot it was projected from.
    pub fn clear_cluster_assignments(&self) -> Result<(), CacheError> {
        let path = self.assignments_file();
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(CacheError::Io { path, source }),
        }
    }

    /// Load the last assignment snapshot; empty when none was ever saved.
    pub fn load_cluster_assignments(&self) -> Result<Vec<ClusterAssignment>, CacheError> {
        let snapshot: Option<AssignmentSnapshot> = read_json(&self.assignments_file())?;
        Ok(snapshot.map(|s| s.clusters).unwrap_or_default())
    }
}

fn face_image_name(face_id: FaceId) -> String {
    format!("face_{face_id}.jpg")
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), CacheError> {
    let io_err = |source: std::io::Error| CacheError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, value).map_err(|source| CacheError::Corrupt {
        path: path.to_path_buf(),
        source,
    })?;
    writer.flush().map_err(io_err)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, CacheError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(CacheError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_reader(BufReader::new(file))
        .map(Some)
        .map_err(|source| CacheError::Corrupt {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Embedding, TimestampSource};

    fn record(face_id: FaceId, photo: &str) -> FaceRecord {
        FaceRecord {
            face_id,
            embedding: Embedding::new(vec![face_id as f32, 0.5]),
            original_path: PathBuf::from(photo),
            face_image_path: PathBuf::from(format!("/tmp/face_{face_id}.jpg")),
            face_image_url: format!("/output_albums/.cache/faces/face_{face_id}.jpg"),
            taken_at: Some("2020-01-01T00:00:00".into()),
            timestamp_source: TimestampSource::Exif,
        }
    }

    #[test]
    fn test_layout() {
        let cache = FaceCache::new("/data/output_albums");
        assert_eq!(
            cache.faces_file(),
            PathBuf::from("/data/output_albums/.cache/all_faces_data.json")
        );
        assert_eq!(
            cache.assignments_file(),
            PathBuf::from("/data/output_albums/.cache/cluster_assignments.json")
        );
        assert_eq!(
            cache.face_image_path(12),
            PathBuf::from("/data/output_albums/.cache/faces/face_12.jpg")
        );
        assert_eq!(
            cache.face_image_url(&cache.face_image_path(12)),
            "/output_albums/.cache/faces/face_12.jpg"
        );
    }

    #[test]
    fn test_load_absent_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FaceCache::new(dir.path());
        assert!(!cache.has_faces());
        assert!(cache.load_faces().unwrap().is_empty());
        assert!(cache.load_cluster_assignments().unwrap().is_empty());
    }

    #[test]
    fn test_save_overwrites_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FaceCache::new(dir.path());
        cache.save_faces(&[record(0, "a.jpg"), record(1, "a.jpg")]).unwrap();
        cache.save_faces(&[record(0, "b.jpg")]).unwrap();

        let loaded = cache.load_faces().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].original_path, PathBuf::from("b.jpg"));
        assert_eq!(loaded[0].embedding.values, vec![0.0, 0.5]);
        assert_eq!(loaded[0].timestamp_source, TimestampSource::Exif);
    }

    #[test]
    fn test_faces_file_is_plain_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FaceCache::new(dir.path());
        cache.save_faces(&[record(3, "a.jpg")]).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(cache.faces_file()).unwrap()).unwrap();
        assert_eq!(raw[0]["face_id"], 3);
        assert_eq!(raw[0]["embedding"], serde_json::json!([3.0, 0.5]));
        assert_eq!(raw[0]["timestamp_source"], "exif");
    }

    #[test]
    fn test_assignments_independent_of_faces() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FaceCache::new(dir.path());
        let clusters = vec![ClusterAssignment {
            cluster_id: -1,
            name: "Unidentified".into(),
            face_ids: vec![4],
        }];
        cache.save_cluster_assignments(&clusters, "2024-01-01T00:00:00+00:00").unwrap();

        assert!(!cache.has_faces());
        assert_eq!(cache.load_cluster_assignments().unwrap(), clusters);

        let body = std::fs::read_to_string(cache.assignments_file()).unwrap();
        let raw: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(raw["updated_at"], "2024-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_clear_cluster_assignments() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FaceCache::new(dir.path());
        cache.clear_cluster_assignments().unwrap();

        cache.save_cluster_assignments(&[], "2024-01-01T00:00:00+00:00").unwrap();
        assert!(cache.has_cluster_assignments());
        cache.clear_cluster_assignments().unwrap();
        assert!(!cache.has_cluster_assignments());
    }

    #[test]
    fn test_reset_faces_dir_drops_old_crops() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FaceCache::new(dir.path());
        cache.reset_faces_dir().unwrap();
        std::fs::write(cache.face_image_path(7), b"jpeg").unwrap();

        cache.reset_faces_dir().unwrap();
        assert!(cache.faces_dir().is_dir());
        assert!(!cache.face_image_path(7).exists());
    }

    #[test]
    fn test_corrupt_snapshot_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FaceCache::new(dir.path());
        std::fs::create_dir_all(cache.cache_dir()).unwrap();
        std::fs::write(cache.faces_file(), b"{not json").unwrap();
        assert!(matches!(cache.load_faces(), Err(CacheError::Corrupt { .. })));
    }
}
