mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use facealbum_core::{AlbumOrganizer, Cluster, FaceCache, OnnxFaceAnalyzer, Report};
use std::path::{Path, PathBuf};

use config::Config;

#[derive(Parser)]
#[command(name = "facealbum", about = "Group photos into per-person albums by face")]
struct Cli {
    /// Album output root (overrides FACEALBUM_OUTPUT_DIR)
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract and cluster every face in a photo folder
    Process {
        /// Folder of photos (not searched recursively)
        input: PathBuf,
        /// DBSCAN radius (overrides FACEALBUM_CLUSTER_EPS)
        #[arg(long)]
        eps: Option<f32>,
        /// Write the cluster list here instead of stdout
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// Copy photos into albums from an edited cluster list, or from the last
    /// clustering when no file is given
    Save {
        /// JSON cluster list as printed by `process`, names and faces edited
        clusters: Option<PathBuf>,
    },
    /// Print the last persisted cluster assignments
    Clusters,
    /// Find one person from sample photos and copy matching photos to an album
    Search {
        /// Folder of photos to search
        dir: PathBuf,
        /// Sample photo of the person (repeatable)
        #[arg(short, long = "sample", required = true)]
        samples: Vec<PathBuf>,
        /// Album name for the matches
        #[arg(short, long)]
        album: String,
        /// Match distance threshold (overrides FACEALBUM_MATCH_THRESHOLD)
        #[arg(short, long)]
        threshold: Option<f32>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }
    tracing::debug!(
        output_dir = %config.output_dir.display(),
        model_dir = %config.model_dir.display(),
        "configuration loaded"
    );

    match cli.command {
        Commands::Process { input, eps, json } => {
            if let Some(eps) = eps {
                config.cluster_eps = eps;
            }
            let mut organizer = load_organizer(&config)?;
            let clusters = print_report(organizer.process(&input))?;
            let body = serde_json::to_string_pretty(&clusters)?;
            match json {
                Some(path) => {
                    std::fs::write(&path, body)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("Cluster list written to {}", path.display());
                }
                None => println!("{body}"),
            }
        }
        Commands::Save { clusters } => {
            let cache = FaceCache::new(&config.output_dir);
            let report = match clusters {
                Some(path) => {
                    let edited = read_clusters(&path)?;
                    facealbum_core::organizer::save_albums(&cache, &edited)
                }
                None => facealbum_core::organizer::save_snapshot_albums(&cache),
            };
            let summary = print_report(report)?;
            println!(
                "{} albums, {} photos copied, {} failed",
                summary.albums.len(),
                summary.copied(),
                summary.failed()
            );
        }
        Commands::Clusters => {
            let cache = FaceCache::new(&config.output_dir);
            let assignments = cache.load_cluster_assignments()?;
            if assignments.is_empty() {
                println!("No saved clusters");
            } else {
                println!("{}", serde_json::to_string_pretty(&assignments)?);
            }
        }
        Commands::Search {
            dir,
            samples,
            album,
            threshold,
        } => {
            if let Some(threshold) = threshold {
                config.match_threshold = threshold;
            }
            let mut organizer = load_organizer(&config)?;
            let summary = print_report(organizer.search_default(&samples, &dir, &album))?;
            println!("{} matching photos", summary.matches.len());
        }
    }

    Ok(())
}

fn load_organizer(config: &Config) -> Result<AlbumOrganizer<OnnxFaceAnalyzer>> {
    let analyzer = OnnxFaceAnalyzer::load(&config.model_dir).with_context(|| {
        format!("loading face models from {}", config.model_dir.display())
    })?;
    Ok(AlbumOrganizer::new(analyzer, &config.output_dir, config.settings()))
}

fn read_clusters(path: &Path) -> Result<Vec<Cluster>> {
    let body =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&body)
        .with_context(|| format!("parsing cluster list {}", path.display()))
}

/// Print the status trail to stderr and unwrap the outcome. A failure is the
/// trail's last line and exits with status 1.
fn print_report<T>(report: Report<T>) -> Result<T> {
    let rendered = report.render();
    if !rendered.is_empty() {
        eprintln!("{rendered}");
    }
    match report.outcome {
        Ok(value) => Ok(value),
        Err(_) => std::process::exit(1),
    }
}
