//! Remote media fetching.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

use crate::error::{MediaError, MediaResult};

/// Stream a remote resource to a uniquely named file under `dir`.
///
/// The caller owns deletion of the returned path; in practice `dir` is the
/// job's scratch directory and everything in it dies with the job.
pub async fn fetch_to_file(
    http: &reqwest::Client,
    url: &str,
    dir: impl AsRef<Path>,
) -> MediaResult<PathBuf> {
    let dir = dir.as_ref();

    let response = http
        .get(url)
        .send()
        .await
        .map_err(|e| MediaError::download_failed(format!("{}: {}", url, e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(MediaError::download_failed(format!(
            "{} returned {}",
            url, status
        )));
    }

    let path = dir.join(format!("fetch_{}{}", Uuid::new_v4(), extension_of(url)));
    let mut file = File::create(&path).await?;

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| MediaError::download_failed(format!("{}: {}", url, e)))?;
        file.write_all(&chunk).await?;
    }
    file.flush().await?;

    debug!(url, path = %path.display(), "Fetched remote media");
    Ok(path)
}

/// Best-effort extension from the URL path, kept so downstream tools can
/// sniff container formats by name.
fn extension_of(url: &str) -> String {
    let last_segment = url::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|segments| segments.last().map(str::to_string))
        })
        .unwrap_or_default();

    match last_segment.rsplit_once('.') {
        Some((name, ext)) if !name.is_empty() && !ext.is_empty() && ext.len() <= 5 => {
            format!(".{}", ext)
        }
        _ => String::new(),
    }
}
