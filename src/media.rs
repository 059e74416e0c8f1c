use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::wait::Poller;

/// Downloads listing images.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// [`MediaFetcher`] over plain HTTP.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl MediaFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

/// Turn a gallery thumbnail `src` into the full-size image URL: the site
/// appends a ten-character size suffix that is swapped for `.jpg`.
pub fn full_size_url(thumbnail: &str) -> String {
    let cut = thumbnail
        .char_indices()
        .rev()
        .nth(9)
        .map(|(i, _)| i)
        .unwrap_or(0);
    format!("{}.jpg", &thumbnail[..cut])
}

/// Lowercased extension of the URL path, `jpg` when there is none.
pub fn image_extension(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let file = path.rsplit('/').next().unwrap_or(path);
    match file.rsplit_once('.') {
        Some((_, ext))
            if !ext.is_empty()
                && ext.len() <= 4
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            ext.to_ascii_lowercase()
        }
        _ => "jpg".to_string(),
    }
}

/// Local file name of the `n`-th (1-based) image of listing `id`.
pub fn image_file_name(id: &str, n: usize, url: &str) -> String {
    format!("{id}_{n}.{}", image_extension(url))
}

/// Download every URL into `dir` as `{id}_{n}.{ext}`.
///
/// Files already on disk are kept and not fetched again. A failed download
/// is logged and skipped. Only cancellation stops the loop early.
/// Returns the paths written or found.
pub async fn download_images(
    fetcher: &dyn MediaFetcher,
    poller: &Poller,
    urls: &[String],
    dir: &Path,
    id: &str,
) -> Result<Vec<PathBuf>> {
    tokio::fs::create_dir_all(dir).await?;
    let mut saved = Vec::with_capacity(urls.len());

    for (idx, url) in urls.iter().enumerate() {
        poller.checkpoint()?;
        let path = dir.join(image_file_name(id, idx + 1, url));
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::debug!(path = %path.display(), "image already downloaded");
            saved.push(path);
            continue;
        }

        let bytes = tokio::select! {
            biased;
            _ = poller.cancel_token().cancelled() => return Err(Error::Cancelled),
            bytes = fetcher.fetch(url) => bytes,
        };
        match bytes {
            Ok(bytes) => match tokio::fs::write(&path, bytes).await {
                Ok(()) => saved.push(path),
                Err(e) => tracing::warn!(%url, "could not write image: {e}"),
            },
            Err(e) => tracing::warn!(%url, "image download failed: {e}"),
        }
    }

    Ok(saved)
}
