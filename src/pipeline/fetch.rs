//! Bulk fetcher: mirror a shared Drive folder into the scratch directory.
//!
//! ## Why scrape the embedded folder view?
//!
//! A shared folder link is addressable without per-file authentication, but
//! the interactive folder page hides its listing behind scripted state. The
//! `embeddedfolderview` endpoint returns the same listing as plain HTML
//! anchors, so one compiled regex recovers every (file id, file name) pair.
//! Individual files are then fetched through the direct-download endpoint.
//!
//! Downloads are strictly sequential; the pipeline processes one document
//! at a time and gains nothing from racing the file host.

use crate::error::ExtractError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// One file discovered in the shared folder listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
}

static RE_ENTRY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?is)href="https://drive\.google\.com/file/d/(?P<id>[-\w]+)/view[^"]*"[^>]*>.*?class="flip-entry-title">(?P<name>[^<]*)<"#,
    )
    .expect("hardcoded folder-listing regex is valid")
});

/// Extract the folder id from a shared-folder URL.
///
/// Accepts the common link shapes:
/// `https://drive.google.com/drive/folders/<id>`,
/// `https://drive.google.com/drive/u/0/folders/<id>?usp=sharing`.
pub fn parse_folder_id(folder_url: &str) -> Result<String, ExtractError> {
    let parsed = Url::parse(folder_url).map_err(|e| ExtractError::InvalidFolderUrl {
        url: folder_url.to_string(),
        reason: e.to_string(),
    })?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ExtractError::InvalidFolderUrl {
            url: folder_url.to_string(),
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }

    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.collect())
        .unwrap_or_default();

    let id = segments
        .iter()
        .position(|&s| s == "folders")
        .and_then(|i| segments.get(i + 1))
        .map(|s| s.to_string());

    match id {
        Some(id) if !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') => {
            Ok(id)
        }
        _ => Err(ExtractError::InvalidFolderUrl {
            url: folder_url.to_string(),
            reason: "no '/folders/<id>' segment found".to_string(),
        }),
    }
}

/// Parse the embedded folder view HTML into (id, name) pairs, deduplicated
/// by file id in listing order.
pub fn parse_folder_listing(html: &str) -> Vec<RemoteFile> {
    let mut seen = HashSet::new();
    let mut files = Vec::new();

    for capture in RE_ENTRY.captures_iter(html) {
        let id = capture["id"].to_string();
        let name = capture["name"].trim().to_string();
        if name.is_empty() {
            continue;
        }
        if seen.insert(id.clone()) {
            files.push(RemoteFile { id, name });
        }
    }

    files
}

/// Reduce a remote file name to a safe basename for the scratch directory.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_control() { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim_matches(['.', ' ']).to_string();
    if cleaned.is_empty() {
        "download".to_string()
    } else {
        cleaned
    }
}

/// Keep only paths whose file name ends in `.pdf`.
///
/// The match is case-sensitive; an uppercase `.PDF` is reported as
/// ignored by the caller rather than silently dropped.
pub fn filter_pdfs(paths: &[PathBuf]) -> Vec<PathBuf> {
    paths
        .iter()
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(".pdf"))
        })
        .cloned()
        .collect()
}

/// List the shared folder without downloading anything.
pub async fn list_folder(
    folder_url: &str,
    timeout_secs: u64,
) -> Result<Vec<RemoteFile>, ExtractError> {
    let folder_id = parse_folder_id(folder_url)?;
    let listing_url = format!(
        "https://drive.google.com/embeddedfolderview?id={folder_id}#list"
    );

    let client = build_client(timeout_secs, &listing_url)?;
    let html = get_text(&client, &listing_url, timeout_secs).await?;
    let files = parse_folder_listing(&html);
    debug!("Folder listing: {} entries", files.len());
    Ok(files)
}

/// Download every file in the shared folder into `scratch_dir`, creating
/// the directory if absent. Returns the local paths in listing order.
pub async fn fetch_folder(
    folder_url: &str,
    scratch_dir: &Path,
    timeout_secs: u64,
) -> Result<Vec<PathBuf>, ExtractError> {
    std::fs::create_dir_all(scratch_dir).map_err(|source| ExtractError::ScratchDir {
        path: scratch_dir.to_path_buf(),
        source,
    })?;

    let files = list_folder(folder_url, timeout_secs).await?;
    info!("Downloading {} files from shared folder", files.len());

    let client = build_client(timeout_secs, folder_url)?;
    let mut paths = Vec::with_capacity(files.len());

    for file in &files {
        let download_url = format!(
            "https://drive.google.com/uc?export=download&id={}",
            file.id
        );
        let bytes = get_bytes(&client, &download_url, timeout_secs).await?;

        let local_path = scratch_dir.join(sanitize_file_name(&file.name));
        tokio::fs::write(&local_path, &bytes)
            .await
            .map_err(|source| ExtractError::ScratchDir {
                path: local_path.clone(),
                source,
            })?;

        debug!(
            "Downloaded '{}' → {} ({} bytes)",
            file.name,
            local_path.display(),
            bytes.len()
        );
        paths.push(local_path);
    }

    Ok(paths)
}

fn build_client(timeout_secs: u64, url: &str) -> Result<reqwest::Client, ExtractError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ExtractError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })
}

async fn get_text(
    client: &reqwest::Client,
    url: &str,
    timeout_secs: u64,
) -> Result<String, ExtractError> {
    let response = send_checked(client, url, timeout_secs).await?;
    response
        .text()
        .await
        .map_err(|e| ExtractError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })
}

async fn get_bytes(
    client: &reqwest::Client,
    url: &str,
    timeout_secs: u64,
) -> Result<Vec<u8>, ExtractError> {
    let response = send_checked(client, url, timeout_secs).await?;
    response
        .bytes()
        .await
        .map(|b| b.to_vec())
        .map_err(|e| ExtractError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })
}

async fn send_checked(
    client: &reqwest::Client,
    url: &str,
    timeout_secs: u64,
) -> Result<reqwest::Response, ExtractError> {
    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            ExtractError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            ExtractError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(ExtractError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    Ok(response)
}
