//! Cover-image fetching with a local disk cache.
//!
//! Cover downloads are independent, best-effort network calls: a cache hit
//! skips the network entirely, a miss fetches with a per-request timeout and
//! stores the bytes, and any failure falls back to a placeholder for that
//! one item without disturbing the rest of the batch. Fetch errors are
//! recovered here and never surfaced to the user.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

/// Per-request timeout after which a single cover falls back to placeholder.
pub const COVER_FETCH_TIMEOUT: Duration = Duration::from_secs(8);

/// Maximum length of a sanitized cache key.
pub const CACHE_KEY_MAX_LEN: usize = 200;

/// Internal errors while retrieving one cover. Always recovered to
/// [`CoverImage::Placeholder`] before reaching a caller.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Request failed (connect, timeout, redirect loop, ...)
    #[error("Cover request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("Cover request returned status {0}")]
    Status(u16),

    /// Cache read/write failed
    #[error("Cover cache I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for internal fetch steps.
pub type FetchResult<T> = Result<T, FetchError>;

/// One fetched cover, or the placeholder the presentation layer renders
/// when no image could be retrieved.
#[derive(Debug, Clone, PartialEq)]
pub enum CoverImage {
    /// Raw image bytes as served (decoding/scaling is the UI's concern)
    Fetched(Vec<u8>),

    /// No usable image; render the neutral placeholder
    Placeholder,
}

/// Disk-cached cover downloader.
///
/// Cheap to clone; clones share the HTTP client's connection pool.
#[derive(Debug, Clone)]
pub struct CoverStore {
    cache_dir: PathBuf,
    client: reqwest::Client,
}

impl CoverStore {
    /// Create a store over `cache_dir`, creating the directory if needed.
    ///
    /// # Errors
    /// Returns `FetchError` if the cache directory cannot be created or the
    /// HTTP client cannot be built.
    pub fn new(cache_dir: PathBuf) -> FetchResult<Self> {
        std::fs::create_dir_all(&cache_dir)?;
        let client = reqwest::Client::builder()
            .timeout(COVER_FETCH_TIMEOUT)
            .build()?;
        Ok(Self { cache_dir, client })
    }

    /// The sanitized cache key for a source URL: alphanumerics kept,
    /// everything else replaced with `_`, truncated to
    /// [`CACHE_KEY_MAX_LEN`].
    pub fn cache_key(url: &str) -> String {
        url.chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .take(CACHE_KEY_MAX_LEN)
            .collect()
    }

    fn cache_path(&self, url: &str) -> PathBuf {
        self.cache_dir.join(Self::cache_key(url))
    }

    /// Fetch one cover, serving from the cache when possible.
    ///
    /// Never fails: an empty URL, a timeout, a bad status, or a cache error
    /// all yield [`CoverImage::Placeholder`] for this item only.
    pub async fn fetch(&self, url: &str) -> CoverImage {
        let url = url.trim();
        if url.is_empty() {
            return CoverImage::Placeholder;
        }

        let path = self.cache_path(url);
        if let Ok(bytes) = tokio::fs::read(&path).await {
            debug!(url, "cover served from cache");
            return CoverImage::Fetched(bytes);
        }

        match self.download(url).await {
            Ok(bytes) => {
                if let Err(e) = tokio::fs::write(&path, &bytes).await {
                    warn!(url, error = %e, "failed to cache cover");
                }
                CoverImage::Fetched(bytes)
            }
            Err(e) => {
                warn!(url, error = %e, "cover fetch failed, using placeholder");
                CoverImage::Placeholder
            }
        }
    }

    /// Fetch a batch concurrently.
    ///
    /// The output is index-aligned with `urls`; the fetches themselves run
    /// with no ordering guarantee between them, and one failure never
    /// aborts the others.
    pub async fn fetch_all(&self, urls: &[String]) -> Vec<CoverImage> {
        let mut tasks = tokio::task::JoinSet::new();
        for (idx, url) in urls.iter().enumerate() {
            let store = self.clone();
            let url = url.clone();
            tasks.spawn(async move { (idx, store.fetch(&url).await) });
        }

        let mut covers = vec![CoverImage::Placeholder; urls.len()];
        while let Some(joined) = tasks.join_next().await {
            if let Ok((idx, cover)) = joined {
                covers[idx] = cover;
            }
        }
        covers
    }

    async fn download(&self, url: &str) -> FetchResult<Vec<u8>> {
        let mut response = self.request(url, false).await?;

        // Some CDNs serving legacy amazon cover links reject requests
        // without a storefront referer; retry once with one.
        if response.status().as_u16() == 403 && url.to_lowercase().contains("amazon") {
            response = self.request(url, true).await?;
        }

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }
        Ok(response.bytes().await?.to_vec())
    }

    async fn request(&self, url: &str, with_referer: bool) -> FetchResult<reqwest::Response> {
        let mut request = self
            .client
            .get(url)
            .header(
                "User-Agent",
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
                 AppleWebKit/537.36 (KHTML, like Gecko) \
                 Chrome/123.0 Safari/537.36",
            )
            .header("Accept", "image/avif,image/webp,image/apng,image/*,*/*;q=0.8")
            .header("Accept-Language", "en-US,en;q=0.9");
        if with_referer {
            request = request.header("Referer", "https://www.amazon.com/");
        }
        Ok(request.send().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cache_key_sanitization() {
        let key = CoverStore::cache_key("http://covers.example/img?id=42&sz=m");
        assert_eq!(key, "http___covers_example_img_id_42_sz_m");
        assert!(key.chars().all(|c| c.is_alphanumeric() || c == '_'));
    }

    #[test]
    fn test_cache_key_truncated() {
        let long_url = format!("http://covers.example/{}", "a".repeat(500));
        assert_eq!(CoverStore::cache_key(&long_url).len(), CACHE_KEY_MAX_LEN);
    }

    #[tokio::test]
    async fn test_empty_url_is_placeholder_without_io() {
        let dir = TempDir::new().unwrap();
        let store = CoverStore::new(dir.path().to_path_buf()).unwrap();
        assert_eq!(store.fetch("").await, CoverImage::Placeholder);
        assert_eq!(store.fetch("   ").await, CoverImage::Placeholder);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_network() {
        let dir = TempDir::new().unwrap();
        let store = CoverStore::new(dir.path().to_path_buf()).unwrap();

        // Seed the cache; the URL points nowhere, so any network attempt
        // would fail and prove the cache was bypassed.
        let url = "http://127.0.0.1:9/cover.jpg";
        let seeded = b"fake image bytes".to_vec();
        std::fs::write(dir.path().join(CoverStore::cache_key(url)), &seeded).unwrap();

        assert_eq!(store.fetch(url).await, CoverImage::Fetched(seeded));
    }

    #[tokio::test]
    async fn test_unreachable_url_falls_back_to_placeholder() {
        let dir = TempDir::new().unwrap();
        let store = CoverStore::new(dir.path().to_path_buf()).unwrap();
        assert_eq!(
            store.fetch("http://127.0.0.1:9/cover.jpg").await,
            CoverImage::Placeholder
        );
    }

    #[tokio::test]
    async fn test_fetch_all_is_index_aligned_and_isolated() {
        let dir = TempDir::new().unwrap();
        let store = CoverStore::new(dir.path().to_path_buf()).unwrap();

        let cached_url = "http://127.0.0.1:9/cached.jpg";
        let seeded = b"cached bytes".to_vec();
        std::fs::write(dir.path().join(CoverStore::cache_key(cached_url)), &seeded).unwrap();

        let covers = store
            .fetch_all(&[
                "".to_string(),
                cached_url.to_string(),
                "http://127.0.0.1:9/missing.jpg".to_string(),
            ])
            .await;

        // One bad fetch never disturbs its neighbors.
        assert_eq!(covers.len(), 3);
        assert_eq!(covers[0], CoverImage::Placeholder);
        assert_eq!(covers[1], CoverImage::Fetched(seeded));
        assert_eq!(covers[2], CoverImage::Placeholder);
    }
}
