use std::path::PathBuf;

/// CLI configuration, loaded from environment variables.
pub struct Config {
    /// Directory containing the SCRFD and ArcFace ONNX files.
    pub model_dir: PathBuf,
    /// Root for album folders and the `.cache` directory.
    pub output_dir: PathBuf,
    /// DBSCAN neighbourhood radius on embedding distance.
    pub cluster_eps: f32,
    /// Euclidean distance below which a face matches the search reference.
    pub match_threshold: f32,
}

impl Config {
    /// Load configuration from `FACEALBUM_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let model_dir = std::env::var("FACEALBUM_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| facealbum_core::default_model_dir());

        Self {
            model_dir,
            output_dir: std::env::var("FACEALBUM_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("output_albums")),
            cluster_eps: env_f32("FACEALBUM_CLUSTER_EPS", facealbum_core::cluster::DEFAULT_EPS),
            match_threshold: env_f32(
                "FACEALBUM_MATCH_THRESHOLD",
                facealbum_core::search::DEFAULT_MATCH_THRESHOLD,
            ),
        }
    }

    pub fn settings(&self) -> facealbum_core::Settings {
        facealbum_core::Settings {
            cluster_eps: self.cluster_eps,
            match_threshold: self.match_threshold,
        }
    }
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
