// src/harvest/download.rs
// =============================================================================
// Saves an accepted image into the save directory.
//
// File naming:
//   stem      = last path segment of the URL without its extension
//   extension = the classified subtype (not whatever the URL ended with)
//   collision = stem-1.ext, stem-2.ext, ... until a free name is found
//
// The dedup ledger already stops the same URL from being fetched twice; the
// suffix handles different URLs that happen to end in the same filename.
//
// The free name is taken with create_new, so two concurrent downloads can
// never end up writing into the same file.
// =============================================================================

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use reqwest::Client;
use serde::Serialize;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;

use super::http::ImageType;
use crate::crawl::resolve::AbsoluteUrl;
use crate::error::{HarvestError, Result};

const FALLBACK_STEM: &str = "image";

/// One image written to disk.
#[derive(Debug, Clone, Serialize)]
pub struct ImageRecord {
    pub source_url: String,
    pub image_type: ImageType,
    pub local_path: PathBuf,
}

// Creates the save directory (and its parents) if it isn't there yet
//
// Called once before the crawl starts; running it on an existing directory
// is a no-op.
pub async fn prepare_save_dir(save_dir: &Path) -> Result<()> {
    fs::create_dir_all(save_dir).await?;
    Ok(())
}

// Downloads `url` into `save_dir`, naming the file after the URL
//
// Nothing touches the disk until the server has answered with a 2xx status.
pub async fn download(
    client: &Client,
    url: &AbsoluteUrl,
    image_type: ImageType,
    save_dir: &Path,
) -> Result<ImageRecord> {
    let mut response = client.get(url.as_str()).send().await?;

    if !response.status().is_success() {
        return Err(HarvestError::Status(response.status()));
    }

    let (local_path, mut file) = create_unique(save_dir, &file_stem(url), image_type).await?;

    let written = async {
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok::<(), HarvestError>(())
    }
    .await;

    if let Err(e) = written {
        drop(file);
        // best effort; the original error is the one worth reporting
        let _ = fs::remove_file(&local_path).await;
        return Err(e);
    }

    Ok(ImageRecord {
        source_url: url.to_string(),
        image_type,
        local_path,
    })
}

/// Base filename for `url`: its last segment without extension.
pub fn file_stem(url: &AbsoluteUrl) -> String {
    Path::new(url.last_segment())
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(FALLBACK_STEM)
        .to_string()
}

/// Candidate path for attempt `n`: `stem.ext` first, then `stem-n.ext`.
pub fn candidate_path(save_dir: &Path, stem: &str, image_type: ImageType, n: usize) -> PathBuf {
    let name = match n {
        0 => format!("{}.{}", stem, image_type.extension()),
        n => format!("{}-{}.{}", stem, n, image_type.extension()),
    };
    save_dir.join(name)
}

// Opens the first free candidate path; the existence check and the creation
// are one syscall, so racing downloads pick different names
async fn create_unique(save_dir: &Path, stem: &str, image_type: ImageType) -> Result<(PathBuf, File)> {
    let mut n = 0;
    loop {
        let path = candidate_path(save_dir, stem, image_type, n);
        match OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => n += 1,
            Err(e) => return Err(e.into()),
        }
    }
}
