//! Density-based clustering (DBSCAN) over face embeddings.
//!
//! Euclidean metric. A point's neighbourhood includes the point itself, so
//! with `min_samples = 2` any face with one other face within `eps` is a core
//! point. Labels are allocated in index order of the first unlabeled core
//! point; border points keep the first cluster that reaches them. The result
//! depends only on input order and embeddings.

use crate::types::{ClusterLabel, Embedding, FaceRecord, NOISE_LABEL};
use std::collections::BTreeSet;

/// Default neighbourhood radius for face grouping.
pub const DEFAULT_EPS: f32 = 0.5;

/// Minimum neighbourhood size (self included) for a core face.
pub const MIN_SAMPLES: usize = 2;

#[derive(Debug, Clone, Copy)]
pub struct Dbscan {
    pub eps: f32,
    pub min_samples: usize,
}

impl Default for Dbscan {
    fn default() -> Self {
        Self {
            eps: DEFAULT_EPS,
            min_samples: MIN_SAMPLES,
        }
    }
}

impl Dbscan {
    pub fn new(eps: f32, min_samples: usize) -> Self {
        Self { eps, min_samples }
    }

    /// Assign one label per embedding, `NOISE_LABEL` for noise.
    pub fn fit(&self, points: &[&Embedding]) -> Vec<ClusterLabel> {
        let neighborhoods: Vec<Vec<usize>> = (0..points.len())
            .map(|i| self.region_query(points, i))
            .collect();
        let is_core: Vec<bool> = neighborhoods
            .iter()
            .map(|n| n.len() >= self.min_samples)
            .collect();

        let mut labels = vec![NOISE_LABEL; points.len()];
        let mut next_label: ClusterLabel = 0;
        let mut stack = Vec::new();

        for seed in 0..points.len() {
            if labels[seed] != NOISE_LABEL || !is_core[seed] {
                continue;
            }
            stack.push(seed);
            while let Some(i) = stack.pop() {
                if labels[i] != NOISE_LABEL {
                    continue;
                }
                labels[i] = next_label;
                if is_core[i] {
                    stack.extend(
                        neighborhoods[i]
                            .iter()
                            .copied()
                            .filter(|&j| labels[j] == NOISE_LABEL),
                    );
                }
            }
            next_label += 1;
        }

        labels
    }

    fn region_query(&self, points: &[&Embedding], idx: usize) -> Vec<usize> {
        let center = points[idx];
        points
            .iter()
            .enumerate()
            .filter(|(_, p)| center.euclidean_distance(p) <= self.eps)
            .map(|(i, _)| i)
            .collect()
    }
}

/// Number of distinct non-noise labels.
pub fn count_clusters(labels: &[ClusterLabel]) -> usize {
    labels
        .iter()
        .filter(|&&l| l != NOISE_LABEL)
        .collect::<BTreeSet<_>>()
        .len()
}

/// Cluster face records by embedding with `min_samples = 2`.
pub fn cluster_faces(records: &[FaceRecord], eps: f32) -> Vec<ClusterLabel> {
    if records.is_empty() {
        return Vec::new();
    }
    let points: Vec<&Embedding> = records.iter().map(|r| &r.embedding).collect();
    let labels = Dbscan::new(eps, MIN_SAMPLES).fit(&points);
    tracing::debug!(
        faces = records.len(),
        clusters = count_clusters(&labels),
        noise = labels.iter().filter(|&&l| l == NOISE_LABEL).count(),
        eps,
        "clustering complete"
    );
    labels
}
