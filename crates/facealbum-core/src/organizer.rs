//! Pipeline entry points: extract, cluster + project, save albums, search.
//!
//! `AlbumOrganizer` owns the analyzer for the life of the process and hands
//! every entry point a fresh `StatusLog`, returning a `Report` with the
//! trail and the outcome. Calls run sequentially; two organizers must not
//! share one output root at the same time.

use crate::album::{self, Album, MaterializeSummary};
use crate::analyzer::FaceAnalyzer;
use crate::cache::FaceCache;
use crate::cluster::{self, DEFAULT_EPS};
use crate::error::PipelineError;
use crate::extract;
use crate::projection::{self, Projection};
use crate::report::{Report, StatusLog};
use crate::search::{self, SearchMatch, DEFAULT_MATCH_THRESHOLD};
use crate::timestamp;
use crate::types::{Cluster, ClusterLabel, FaceRecord};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Tunables for the organizer.
#[derive(Debug, Clone, Copy)]
pub struct Settings {
    pub cluster_eps: f32,
    pub match_threshold: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cluster_eps: DEFAULT_EPS,
            match_threshold: DEFAULT_MATCH_THRESHOLD,
        }
    }
}

/// Result of a targeted-person search.
#[derive(Debug, Clone, Default)]
pub struct SearchSummary {
    pub matches: Vec<SearchMatch>,
    /// `None` when nothing matched and no album was created.
    pub albums: Option<MaterializeSummary>,
}

pub struct AlbumOrganizer<A: FaceAnalyzer> {
    analyzer: A,
    cache: FaceCache,
    settings: Settings,
}

impl<A: FaceAnalyzer> AlbumOrganizer<A> {
    pub fn new(analyzer: A, output_root: impl Into<PathBuf>, settings: Settings) -> Self {
        Self {
            analyzer,
            cache: FaceCache::new(output_root),
            settings,
        }
    }

    pub fn cache(&self) -> &FaceCache {
        &self.cache
    }

    pub fn output_root(&self) -> &Path {
        self.cache.output_root()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Extract and cache every face in `dir`.
    pub fn extract(&mut self, dir: &Path) -> Report<Vec<FaceRecord>> {
        let mut log = StatusLog::new();
        let records = extract::extract_faces(&mut self.analyzer, &self.cache, dir, &mut log);
        log.finish(Ok(records))
    }

    /// Cluster records with the configured radius.
    pub fn cluster(&self, records: &[FaceRecord]) -> Report<Vec<ClusterLabel>> {
        let mut log = StatusLog::new();
        let labels = cluster::cluster_faces(records, self.settings.cluster_eps);
        log.info(format!(
            "Clustering complete. Found {} clusters.",
            cluster::count_clusters(&labels)
        ));
        log.finish(Ok(labels))
    }

    /// Build display clusters and persist the matching assignment snapshot.
    pub fn project(&self, records: &[FaceRecord], labels: &[ClusterLabel]) -> Report<Vec<Cluster>> {
        let mut log = StatusLog::new();
        let outcome = self.project_into(records, labels, &mut log);
        log.finish(outcome)
    }

    fn project_into(
        &self,
        records: &[FaceRecord],
        labels: &[ClusterLabel],
        log: &mut StatusLog,
    ) -> Result<Vec<Cluster>, PipelineError> {
        let Projection {
            clusters,
            assignments,
        } = projection::project(records, labels, |path| self.cache.face_image_url(path))?;

        if let Err(e) = self
            .cache
            .save_cluster_assignments(&assignments, &timestamp::now_utc())
        {
            log.warn(format!("Failed to persist cluster assignments: {e}"));
        }
        Ok(clusters)
    }

    /// Extract, cluster and project in one go.
    pub fn process(&mut self, dir: &Path) -> Report<Vec<Cluster>> {
        let mut log = StatusLog::new();
        if !dir.is_dir() {
            return log.finish(Err(PipelineError::InputDirectoryNotFound(dir.to_path_buf())));
        }

        let records = extract::extract_faces(&mut self.analyzer, &self.cache, dir, &mut log);
        if records.is_empty() {
            return log.finish(Err(PipelineError::NoFacesFound(dir.to_path_buf())));
        }

        let labels = cluster::cluster_faces(&records, self.settings.cluster_eps);
        log.info(format!(
            "Clustering complete. Found {} clusters.",
            cluster::count_clusters(&labels)
        ));
        let outcome = self.project_into(&records, &labels, &mut log);
        log.finish(outcome)
    }

    /// Reconcile edited clusters against the face cache and copy the photos
    /// into one album per cluster.
    pub fn save_albums(&self, clusters: &[Cluster]) -> Report<MaterializeSummary> {
        save_albums(&self.cache, clusters)
    }

    /// Materialize the last persisted cluster assignment snapshot.
    pub fn save_snapshot_albums(&self) -> Report<MaterializeSummary> {
        save_snapshot_albums(&self.cache)
    }

    /// Find `album_name`'s person in `dir` from sample photos and copy every
    /// matching photo into that album.
    pub fn search(
        &mut self,
        samples: &[PathBuf],
        dir: &Path,
        album_name: &str,
        threshold: f32,
    ) -> Report<SearchSummary> {
        let mut log = StatusLog::new();
        let found = search::find_person(&mut self.analyzer, samples, dir, threshold, &mut log);
        let outcome = found.map(|matches| {
            if matches.is_empty() {
                log.info("No matching photos were found.");
                return SearchSummary::default();
            }

            log.info(format!("Step 3: Saving matched photos to album '{album_name}'..."));
            let album = Album {
                name: album_name.to_string(),
                photos: matches.iter().map(|m| m.path.clone()).collect::<BTreeSet<_>>(),
            };
            let summary = album::materialize(&[album], self.cache.output_root(), &mut log);
            SearchSummary {
                matches,
                albums: Some(summary),
            }
        });
        log.finish(outcome)
    }

    /// Search with the configured threshold.
    pub fn search_default(
        &mut self,
        samples: &[PathBuf],
        dir: &Path,
        album_name: &str,
    ) -> Report<SearchSummary> {
        let threshold = self.settings.match_threshold;
        self.search(samples, dir, album_name, threshold)
    }
}

/// Reconcile `clusters` against the faces in `cache` and materialize them.
///
/// Needs no analyzer, only a cache written by an earlier extraction.
pub fn save_albums(cache: &FaceCache, clusters: &[Cluster]) -> Report<MaterializeSummary> {
    let mut log = StatusLog::new();
    let outcome = save_albums_into(cache, clusters, &mut log);
    log.finish(outcome)
}

/// Materialize the assignment snapshot persisted by the last projection.
///
/// Extraction removes the snapshot, so one taken from an earlier run is
/// never matched against a newer face cache.
pub fn save_snapshot_albums(cache: &FaceCache) -> Report<MaterializeSummary> {
    let mut log = StatusLog::new();
    if !cache.has_cluster_assignments() {
        return log.finish(Err(PipelineError::SnapshotMissing(cache.assignments_file())));
    }
    let outcome = cache
        .load_cluster_assignments()
        .map_err(PipelineError::from)
        .and_then(|assignments| {
            log.info(format!("Loaded {} saved clusters.", assignments.len()));
            let clusters: Vec<Cluster> = assignments.into_iter().map(Cluster::from).collect();
            save_albums_into(cache, &clusters, &mut log)
        });
    log.finish(outcome)
}

fn save_albums_into(
    cache: &FaceCache,
    clusters: &[Cluster],
    log: &mut StatusLog,
) -> Result<MaterializeSummary, PipelineError> {
    if !cache.has_faces() {
        return Err(PipelineError::CacheMissing(cache.faces_file()));
    }
    let records = cache.load_faces()?;
    let albums = projection::reconcile(clusters, &records)?;

    log.info("Saving final albums...");
    let summary = album::materialize(&albums, cache.output_root(), log);
    log.info(format!("Albums saved: {} photos copied.", summary.copied()));
    Ok(summary)
}
