use facealbum_core::{
    AlbumOrganizer, AnalyzerError, BoundingBox, Cluster, DetectedFace, Embedding, FaceAnalyzer,
    PipelineError, Settings,
};
use image::{DynamicImage, Rgb, RgbImage};
use std::collections::HashMap;
use std::path::Path;

/// Returns canned faces keyed by the photo's grey level.
#[derive(Default)]
struct FakeAnalyzer {
    faces: HashMap<u8, Vec<Vec<f32>>>,
}

impl FakeAnalyzer {
    fn face(mut self, key: u8, embedding: &[f32]) -> Self {
        self.faces.entry(key).or_default().push(embedding.to_vec());
        self
    }
}

impl FaceAnalyzer for FakeAnalyzer {
    fn analyze(&mut self, image: &DynamicImage) -> Result<Vec<DetectedFace>, AnalyzerError> {
        let key = image.to_rgb8().get_pixel(0, 0)[0];
        let faces = self.faces.get(&key).cloned().unwrap_or_default();
        Ok(faces
            .into_iter()
            .enumerate()
            .map(|(i, values)| DetectedFace {
                bbox: BoundingBox {
                    x: 2.0 + 10.0 * i as f32,
                    y: 2.0,
                    width: 8.0,
                    height: 8.0,
                    confidence: 0.9,
                    landmarks: None,
                },
                embedding: Embedding::new(values),
            })
            .collect())
    }
}

fn photo(dir: &Path, name: &str, key: u8) {
    RgbImage::from_pixel(48, 24, Rgb([key, key, key]))
        .save(dir.join(name))
        .unwrap();
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<_> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn process_rename_and_save() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    photo(input.path(), "a.png", 10);
    photo(input.path(), "b.png", 20);
    photo(input.path(), "c.png", 30);

    let analyzer = FakeAnalyzer::default()
        .face(10, &[0.0, 0.0])
        .face(10, &[0.1, 0.0])
        .face(20, &[0.05, 0.05])
        .face(30, &[5.0, 5.0]);
    let mut organizer = AlbumOrganizer::new(analyzer, output.path(), Settings::default());

    let report = organizer.process(input.path());
    assert!(report.has_message("Found 3 images to process."));
    let clusters = report.outcome.unwrap();
    assert_eq!(clusters.len(), 2);
    let total: usize = clusters.iter().map(|c| c.faces.len()).sum();
    assert_eq!(total, 4);

    // Round-trip through JSON as an editing client would.
    let body = serde_json::to_string(&clusters).unwrap();
    let mut edited: Vec<Cluster> = serde_json::from_str(&body).unwrap();
    edited[0].name = "Alice".to_string();
    edited[1].name = "Bob".to_string();

    let summary = organizer.save_albums(&edited).outcome.unwrap();
    assert_eq!(summary.copied(), 3);
    assert_eq!(file_names(&output.path().join("Alice")), vec!["a.png", "b.png"]);
    assert_eq!(file_names(&output.path().join("Bob")), vec!["c.png"]);
}

#[test]
fn moved_face_follows_the_edit() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    photo(input.path(), "a.png", 10);
    photo(input.path(), "b.png", 20);

    let analyzer = FakeAnalyzer::default()
        .face(10, &[0.0, 0.0])
        .face(20, &[0.1, 0.0]);
    let mut organizer = AlbumOrganizer::new(analyzer, output.path(), Settings::default());
    let mut clusters = organizer.process(input.path()).outcome.unwrap();
    assert_eq!(clusters.len(), 1);

    let moved = clusters[0].faces.remove(1);
    clusters.push(Cluster {
        cluster_id: 7,
        name: "Dana".to_string(),
        faces: vec![moved],
    });
    clusters[0].name = "Eve".to_string();

    organizer.save_albums(&clusters).outcome.unwrap();
    assert_eq!(file_names(&output.path().join("Eve")), vec!["a.png"]);
    assert_eq!(file_names(&output.path().join("Dana")), vec!["b.png"]);
}

#[test]
fn unknown_face_id_is_rejected() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    photo(input.path(), "a.png", 10);

    let analyzer = FakeAnalyzer::default().face(10, &[0.0]);
    let mut organizer = AlbumOrganizer::new(analyzer, output.path(), Settings::default());
    let mut clusters = organizer.process(input.path()).outcome.unwrap();
    clusters[0].faces[0].face_id = 99;

    let report = organizer.save_albums(&clusters);
    assert!(matches!(
        report.outcome,
        Err(PipelineError::UnknownFaceId { face_id: 99, .. })
    ));
}

#[test]
fn search_copies_only_matches() {
    let samples = tempfile::tempdir().unwrap();
    let target = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    photo(samples.path(), "s1.png", 1);
    photo(samples.path(), "s2.png", 2);
    photo(target.path(), "t1.png", 11);
    photo(target.path(), "t2.png", 12);
    photo(target.path(), "t3.png", 13);
    photo(target.path(), "t4.png", 14);
    photo(target.path(), "t5.png", 15);

    // Reference is the mean of the two samples: (0.5, 0.5).
    let analyzer = FakeAnalyzer::default()
        .face(1, &[1.0, 0.0])
        .face(2, &[0.0, 1.0])
        .face(11, &[0.5, 0.6])
        .face(12, &[3.0, 3.0])
        .face(14, &[9.0, 9.0])
        .face(14, &[0.6, 0.5])
        .face(15, &[0.5, 1.8]);
    let mut organizer = AlbumOrganizer::new(analyzer, output.path(), Settings::default());

    let sample_paths = vec![samples.path().join("s1.png"), samples.path().join("s2.png")];
    let report = organizer.search(&sample_paths, target.path(), "Carol!", 1.2);
    let summary = report.outcome.unwrap();

    assert_eq!(summary.matches.len(), 2);
    assert_eq!(file_names(&output.path().join("Carol")), vec!["t1.png", "t4.png"]);
    assert_eq!(summary.albums.unwrap().copied(), 2);
}

#[test]
fn snapshot_from_an_earlier_folder_is_not_reused() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    photo(first.path(), "alice1.png", 10);
    photo(first.path(), "alice2.png", 20);
    photo(second.path(), "zed1.png", 30);
    photo(second.path(), "zed2.png", 40);

    let analyzer = FakeAnalyzer::default()
        .face(10, &[0.0, 0.0])
        .face(20, &[0.1, 0.0])
        .face(30, &[4.0, 4.0])
        .face(40, &[4.1, 4.0]);
    let mut organizer = AlbumOrganizer::new(analyzer, output.path(), Settings::default());

    assert!(organizer.process(first.path()).is_ok());
    assert!(organizer.cache().has_cluster_assignments());

    let extracted = organizer.extract(second.path()).outcome.unwrap();
    assert_eq!(extracted.len(), 2);

    let report = organizer.save_snapshot_albums();
    assert!(matches!(report.outcome, Err(PipelineError::SnapshotMissing(_))));
    assert!(!output.path().join("Person 1").exists());
}
