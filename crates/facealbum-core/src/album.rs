//! Album materialization: copy source photos into per-name directories.

use crate::report::StatusLog;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

/// A named album and the photos that belong in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Album {
    pub name: String,
    pub photos: BTreeSet<PathBuf>,
}

/// Outcome of materializing one album.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumResult {
    pub name: String,
    pub directory: PathBuf,
    pub copied: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterializeSummary {
    pub albums: Vec<AlbumResult>,
    /// Albums skipped because their name sanitized to nothing.
    pub skipped: Vec<String>,
}

impl MaterializeSummary {
    pub fn copied(&self) -> usize {
        self.albums.iter().map(|a| a.copied).sum()
    }

    pub fn failed(&self) -> usize {
        self.albums.iter().map(|a| a.failed).sum()
    }
}

/// Keep alphanumerics, spaces and underscores, then trim trailing whitespace.
pub fn sanitize_album_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '_')
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// Copy every album's photos into `<output_root>/<sanitized name>/`.
///
/// Existing files are overwritten. A failed copy is logged and the rest of
/// the album continues. Distinct names that sanitize to the same directory
/// share it.
pub fn materialize(
    albums: &[Album],
    output_root: &Path,
    log: &mut StatusLog,
) -> MaterializeSummary {
    let mut summary = MaterializeSummary::default();
    let mut owners: HashMap<String, &str> = HashMap::new();

    for album in albums {
        let dir_name = sanitize_album_name(&album.name);
        if dir_name.is_empty() {
            log.error(format!(
                "Album name '{}' has no usable characters; skipping {} photos",
                album.name,
                album.photos.len()
            ));
            summary.skipped.push(album.name.clone());
            continue;
        }

        match owners.get(dir_name.as_str()) {
            Some(owner) if *owner != album.name => log.warn(format!(
                "Albums '{owner}' and '{}' both map to folder '{dir_name}'; merging them",
                album.name
            )),
            Some(_) => {}
            None => {
                owners.insert(dir_name.clone(), &album.name);
            }
        }

        let directory = output_root.join(&dir_name);
        if let Err(e) = std::fs::create_dir_all(&directory) {
            log.error(format!("Could not create album folder {}: {e}", directory.display()));
            summary.albums.push(AlbumResult {
                name: album.name.clone(),
                directory,
                copied: 0,
                failed: album.photos.len(),
            });
            continue;
        }

        log.info(format!("Copying {} photos to album: {dir_name}", album.photos.len()));
        let mut copied = 0;
        let mut failed = 0;
        for photo in &album.photos {
            match copy_into(photo, &directory) {
                Ok(target) => {
                    tracing::debug!(from = %photo.display(), to = %target.display(), "copied");
                    copied += 1;
                }
                Err(e) => {
                    log.warn(format!("Failed to copy {}: {e}", photo.display()));
                    failed += 1;
                }
            }
        }

        summary.albums.push(AlbumResult {
            name: album.name.clone(),
            directory,
            copied,
            failed,
        });
    }

    summary
}

fn copy_into(photo: &Path, directory: &Path) -> std::io::Result<PathBuf> {
    let file_name = photo.file_name().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name")
    })?;
    let target = directory.join(file_name);
    std::fs::copy(photo, &target)?;
    Ok(target)
}
