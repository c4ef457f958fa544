//! Image store: downloads the primary image of each resolved row.

use std::path::{Path, PathBuf};
use std::time::Duration;

use shelfscan_core::{sanitize_file_stem, AppConfig};

/// Bodies this small are placeholders or error pages, not product images.
const MIN_IMAGE_BYTES: usize = 500;
const DEFAULT_EXTENSION: &str = "jpg";

/// File extension for an image URL, taken from its path suffix.
pub(super) fn image_extension(url: &str) -> &'static str {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let file = path.rsplit('/').next().unwrap_or_default();
    let Some((_, ext)) = file.rsplit_once('.') else {
        return DEFAULT_EXTENSION;
    };
    match ext.to_ascii_lowercase().as_str() {
        "png" => "png",
        "webp" => "webp",
        "gif" => "gif",
        "avif" => "avif",
        _ => DEFAULT_EXTENSION,
    }
}

/// Where the image for `product_id` lives under `dir`.
pub(super) fn image_path(dir: &Path, product_id: &str, url: &str) -> PathBuf {
    dir.join(format!(
        "{}.{}",
        sanitize_file_stem(product_id),
        image_extension(url)
    ))
}

/// Absolute download URL, or `None` for inline `data:` images.
pub(super) fn download_url(url: &str) -> Option<String> {
    let url = url.trim();
    if url.is_empty() || url.starts_with("data:") {
        return None;
    }
    if let Some(rest) = url.strip_prefix("//") {
        return Some(format!("https://{rest}"));
    }
    Some(url.to_string())
}

pub(super) struct ImageStore {
    client: reqwest::Client,
}

impl ImageStore {
    pub(super) fn new(config: &AppConfig, verify_tls: bool) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(config.user_agent.as_str())
            .danger_accept_invalid_certs(!verify_tls)
            .build()?;
        Ok(Self { client })
    }

    /// Download `url` to `dest`. Any failure is logged and reported as `false`;
    /// a missing image never fails the row.
    pub(super) async fn save(&self, url: &str, dest: &Path) -> bool {
        match self.try_save(url, dest).await {
            Ok(saved) => saved,
            Err(e) => {
                tracing::warn!(url, error = %e, "image download failed");
                false
            }
        }
    }

    async fn try_save(&self, url: &str, dest: &Path) -> anyhow::Result<bool> {
        let Some(url) = download_url(url) else {
            return Ok(false);
        };
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url = %url, status = status.as_u16(), "image request rejected");
            return Ok(false);
        }
        let bytes = response.bytes().await?;
        if bytes.len() <= MIN_IMAGE_BYTES {
            tracing::warn!(url = %url, bytes = bytes.len(), "image body too small");
            return Ok(false);
        }
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(dest, &bytes).await?;
        Ok(true)
    }
}
