//! Cluster labels to display clusters, and edited clusters back to albums.

use crate::album::Album;
use crate::error::PipelineError;
use crate::types::{Cluster, ClusterAssignment, ClusterLabel, FaceId, FaceRecord, FaceRef};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

/// Display clusters plus the assignment snapshot that mirrors them.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub clusters: Vec<Cluster>,
    pub assignments: Vec<ClusterAssignment>,
}

/// Group records by label, in first-seen label order.
///
/// `url_for` supplies the web locator for records cached without one.
pub fn project(
    records: &[FaceRecord],
    labels: &[ClusterLabel],
    url_for: impl Fn(&Path) -> String,
) -> Result<Projection, PipelineError> {
    if records.len() != labels.len() {
        return Err(PipelineError::LabelCountMismatch {
            records: records.len(),
            labels: labels.len(),
        });
    }

    let mut clusters: Vec<Cluster> = Vec::new();
    let mut slot_of: HashMap<ClusterLabel, usize> = HashMap::new();

    for (record, &label) in records.iter().zip(labels) {
        let slot = *slot_of.entry(label).or_insert_with(|| {
            clusters.push(Cluster {
                cluster_id: label,
                name: Cluster::default_name(label),
                faces: Vec::new(),
            });
            clusters.len() - 1
        });

        let face_image_url = if record.face_image_url.is_empty() {
            url_for(&record.face_image_path)
        } else {
            record.face_image_url.clone()
        };
        clusters[slot].faces.push(FaceRef {
            face_id: record.face_id,
            face_image_url,
            taken_at: record.taken_at.clone(),
            timestamp_source: record.timestamp_source,
        });
    }

    let assignments = clusters
        .iter()
        .map(|c| ClusterAssignment {
            cluster_id: c.cluster_id,
            name: c.name.clone(),
            face_ids: c.faces.iter().map(|f| f.face_id).collect(),
        })
        .collect();

    Ok(Projection {
        clusters,
        assignments,
    })
}

/// Resolve edited clusters against cached records into albums.
///
/// Every face id must exist in `records`; a missing id means the cache was
/// replaced after the clusters were shown and the whole edit is rejected.
pub fn reconcile(
    clusters: &[Cluster],
    records: &[FaceRecord],
) -> Result<Vec<Album>, PipelineError> {
    let paths: HashMap<FaceId, &PathBuf> = records
        .iter()
        .map(|r| (r.face_id, &r.original_path))
        .collect();

    clusters
        .iter()
        .map(|cluster| {
            let photos = cluster
                .faces
                .iter()
                .map(|face| {
                    paths
                        .get(&face.face_id)
                        .map(|p| (*p).clone())
                        .ok_or_else(|| PipelineError::UnknownFaceId {
                            face_id: face.face_id,
                            cluster_id: cluster.cluster_id,
                        })
                })
                .collect::<Result<BTreeSet<PathBuf>, _>>()?;
            Ok(Album {
                name: album_name(cluster),
                photos,
            })
        })
        .collect()
}

fn album_name(cluster: &Cluster) -> String {
    if cluster.name.trim().is_empty() {
        format!("cluster_{}", cluster.cluster_id)
    } else {
        cluster.name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Embedding, TimestampSource, NOISE_LABEL};

    fn record(face_id: FaceId, photo: &str) -> FaceRecord {
        FaceRecord {
            face_id,
            embedding: Embedding::new(vec![0.0]),
            original_path: PathBuf::from(photo),
            face_image_path: PathBuf::from(format!("/out/.cache/faces/face_{face_id}.jpg")),
            face_image_url: String::new(),
            taken_at: None,
            timestamp_source: TimestampSource::Unknown,
        }
    }

    fn url(path: &Path) -> String {
        format!("/out/.cache/faces/{}", path.file_name().unwrap().to_string_lossy())
    }

    fn photos(album: &Album) -> Vec<&str> {
        album.photos.iter().map(|p| p.to_str().unwrap()).collect()
    }

    #[test]
    fn test_project_first_seen_order() {
        let records = vec![
            record(0, "a.jpg"),
            record(1, "b.jpg"),
            record(2, "c.jpg"),
            record(3, "d.jpg"),
        ];
        let projection = project(&records, &[1, NOISE_LABEL, 0, 1], url).unwrap();

        let ids: Vec<_> = projection.clusters.iter().map(|c| c.cluster_id).collect();
        assert_eq!(ids, vec![1, NOISE_LABEL, 0]);
        let names: Vec<_> = projection.clusters.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Person 2", "Unidentified", "Person 1"]);
        assert_eq!(projection.assignments[0].face_ids, vec![0, 3]);
        assert_eq!(projection.clusters[0].faces[1].face_image_url, "/out/.cache/faces/face_3.jpg");
    }

    #[test]
    fn test_project_keeps_cached_url() {
        let mut r = record(0, "a.jpg");
        r.face_image_url = "/custom/face_0.jpg".into();
        let projection = project(&[r], &[0], url).unwrap();
        assert_eq!(projection.clusters[0].faces[0].face_image_url, "/custom/face_0.jpg");
    }

    #[test]
    fn test_project_idempotent() {
        let records = vec![record(0, "a.jpg"), record(1, "a.jpg"), record(2, "b.jpg")];
        let labels = [0, NOISE_LABEL, 0];
        let first = project(&records, &labels, url).unwrap();
        assert_eq!(first, project(&records, &labels, url).unwrap());
    }

    #[test]
    fn test_project_label_mismatch() {
        let err = project(&[record(0, "a.jpg")], &[], url).unwrap_err();
        assert!(matches!(err, PipelineError::LabelCountMismatch { records: 1, labels: 0 }));
    }

    #[test]
    fn test_reconcile_dedups_photos() {
        let records = vec![record(0, "a.jpg"), record(1, "a.jpg"), record(2, "b.jpg")];
        let projection = project(&records, &[0, 0, 0], url).unwrap();
        let albums = reconcile(&projection.clusters, &records).unwrap();
        assert_eq!(albums.len(), 1);
        assert_eq!(albums[0].name, "Person 1");
        assert_eq!(photos(&albums[0]), vec!["a.jpg", "b.jpg"]);
    }

    #[test]
    fn test_reconcile_follows_edits() {
        let records = vec![record(0, "a.jpg"), record(1, "b.jpg"), record(2, "c.jpg")];
        let mut clusters = project(&records, &[0, 0, 1], url).unwrap().clusters;
        // Move face 1 into the second cluster and rename both.
        let moved = clusters[0].faces.remove(1);
        clusters[1].faces.push(moved);
        clusters[0].name = "Alice".into();
        clusters[1].name = "Bob".into();

        let albums = reconcile(&clusters, &records).unwrap();
        assert_eq!(albums[0].name, "Alice");
        assert_eq!(photos(&albums[0]), vec!["a.jpg"]);
        assert_eq!(albums[1].name, "Bob");
        assert_eq!(photos(&albums[1]), vec!["b.jpg", "c.jpg"]);
    }

    #[test]
    fn test_reconcile_rejects_unknown_face() {
        let records = vec![record(0, "a.jpg")];
        let clusters = vec![Cluster {
            cluster_id: 3,
            name: "Ghost".into(),
            faces: vec![FaceRef {
                face_id: 99,
                face_image_url: String::new(),
                taken_at: None,
                timestamp_source: TimestampSource::Unknown,
            }],
        }];
        let err = reconcile(&clusters, &records).unwrap_err();
        assert!(matches!(err, PipelineError::UnknownFaceId { face_id: 99, cluster_id: 3 }));
    }

    #[test]
    fn test_reconcile_unnamed_cluster() {
        let records = vec![record(0, "a.jpg")];
        let clusters = vec![Cluster {
            cluster_id: 4,
            name: String::new(),
            faces: project(&records, &[4], url).unwrap().clusters[0].faces.clone(),
        }];
        assert_eq!(reconcile(&clusters, &records).unwrap()[0].name, "cluster_4");
    }

    #[test]
    fn test_round_trip_matches_labels() {
        let records = vec![
            record(0, "a.jpg"),
            record(1, "a.jpg"),
            record(2, "b.jpg"),
            record(3, "c.jpg"),
            record(4, "d.jpg"),
        ];
        let labels = [0, 0, 0, 1, NOISE_LABEL];
        let clusters = project(&records, &labels, url).unwrap().clusters;
        let albums = reconcile(&clusters, &records).unwrap();

        let mut expected: HashMap<ClusterLabel, BTreeSet<PathBuf>> = HashMap::new();
        for (r, l) in records.iter().zip(labels) {
            expected.entry(l).or_default().insert(r.original_path.clone());
        }
        assert_eq!(albums.len(), expected.len());
        assert_eq!(albums[0].photos, expected[&0]);
        assert_eq!(albums[1].photos, expected[&1]);
        assert_eq!(albums[2].photos, expected[&NOISE_LABEL]);
    }
}
