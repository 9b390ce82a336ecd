//! Transports that retrieve raw frame documents.
//!
//! A [`FrameSource`] turns a [`FrameLocation`] into the document text. Sources
//! never cache: every fetch re-reads the current contents, and HTTP requests
//! carry the per-load cache token so intermediaries cannot answer from a stale
//! copy either.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use reqwest::Client;

use crate::error::{Error, Result};

/// Request timeout for HTTP frame fetches
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Where one frame of a batch lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameLocation {
    pub directory: String,
    pub index: usize,
    pub extension: String,
    /// Unique per load; appended to HTTP requests.
    pub cache_token: u64,
}

impl FrameLocation {
    /// `{directory}/{index}.{extension}`
    pub fn relative_name(&self) -> String {
        format!("{}.{}", self.index, self.extension)
    }

    pub fn path(&self) -> PathBuf {
        PathBuf::from(&self.directory).join(self.relative_name())
    }

    /// `{directory}/{index}.{extension}?t={cache_token}`
    pub fn url(&self) -> String {
        format!(
            "{}/{}?t={}",
            self.directory.trim_end_matches('/'),
            self.relative_name(),
            self.cache_token
        )
    }
}

impl std::fmt::Display for FrameLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}",
            self.directory.trim_end_matches('/'),
            self.relative_name()
        )
    }
}

/// Something that can fetch frame documents.
#[async_trait::async_trait]
pub trait FrameSource: Send + Sync {
    /// Fetch the document text for `location`.
    async fn fetch(&self, location: &FrameLocation) -> Result<String>;
}

/// Pick a source for `directory`: HTTP for `http://`/`https://`, the local
/// filesystem otherwise.
pub fn source_for(directory: &str) -> Arc<dyn FrameSource> {
    if is_remote(directory) {
        Arc::new(HttpSource::new())
    } else {
        Arc::new(FsSource)
    }
}

/// Whether `directory` names an HTTP location.
pub fn is_remote(directory: &str) -> bool {
    directory.starts_with("http://") || directory.starts_with("https://")
}

/// Reads frames from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSource;

#[async_trait::async_trait]
impl FrameSource for FsSource {
    async fn fetch(&self, location: &FrameLocation) -> Result<String> {
        let path = location.path();
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| Error::fetch(path.display().to_string(), e.to_string()))
    }
}

/// Fetches frames over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client with timeout: {}", e);
                Client::new()
            });

        Self { client }
    }
}

impl Default for HttpSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl FrameSource for HttpSource {
    async fn fetch(&self, location: &FrameLocation) -> Result<String> {
        let url = location.url();
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| Error::fetch(&url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::fetch(&url, format!("HTTP {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| Error::fetch(&url, e.to_string()))
    }
}

/// Serves documents held in memory, keyed by `{directory}/{index}.{extension}`.
///
/// Documents can be replaced between loads; each fetch returns the current
/// text. An optional per-fetch latency simulates a slow transport.
#[derive(Debug, Default)]
pub struct MemorySource {
    documents: RwLock<HashMap<String, String>>,
    latency: Option<Duration>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: delay every fetch by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Store `text` as frame `index` of `directory`.
    pub fn insert(&self, directory: &str, index: usize, extension: &str, text: impl Into<String>) {
        let key = format!("{}/{}.{}", directory.trim_end_matches('/'), index, extension);
        self.documents.write().insert(key, text.into());
    }

    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }
}

#[async_trait::async_trait]
impl FrameSource for MemorySource {
    async fn fetch(&self, location: &FrameLocation) -> Result<String> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let key = location.to_string();
        self.documents
            .read()
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::fetch(key, "not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn location(directory: &str, index: usize) -> FrameLocation {
        FrameLocation {
            directory: directory.to_string(),
            index,
            extension: "ppm".to_string(),
            cache_token: 1700000000123,
        }
    }

    #[test]
    fn test_location_naming() {
        let loc = location("frames/run1/", 7);
        assert_eq!(loc.relative_name(), "7.ppm");
        assert_eq!(loc.path(), PathBuf::from("frames/run1/7.ppm"));
        assert_eq!(loc.url(), "frames/run1/7.ppm?t=1700000000123");
        assert_eq!(loc.to_string(), "frames/run1/7.ppm");
    }

    #[test]
    fn test_is_remote() {
        assert!(is_remote("http://localhost:8000/frames"));
        assert!(is_remote("https://example.com/frames"));
        assert!(!is_remote("./frames"));
        assert!(!is_remote("/var/frames"));
    }

    #[tokio::test]
    async fn test_fs_source_reads_current_contents() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("0.ppm");
        let directory = dir.path().to_string_lossy().to_string();

        std::fs::write(&file, "P3 1 1 255 1 2 3").unwrap();
        let text = FsSource.fetch(&location(&directory, 0)).await.unwrap();
        assert_eq!(text, "P3 1 1 255 1 2 3");

        std::fs::write(&file, "P3 1 1 255 4 5 6").unwrap();
        let text = FsSource.fetch(&location(&directory, 0)).await.unwrap();
        assert_eq!(text, "P3 1 1 255 4 5 6");
    }

    #[tokio::test]
    async fn test_fs_source_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let directory = dir.path().to_string_lossy().to_string();

        let err = FsSource.fetch(&location(&directory, 3)).await.unwrap_err();
        assert_matches!(err, Error::Fetch { ref location, .. } if location.ends_with("3.ppm"));
    }

    #[tokio::test]
    async fn test_memory_source() {
        let source = MemorySource::new();
        assert!(source.is_empty());
        source.insert("frames/", 0, "ppm", "P3 1 1 255 0 0 0");
        assert_eq!(source.len(), 1);

        let text = source.fetch(&location("frames", 0)).await.unwrap();
        assert_eq!(text, "P3 1 1 255 0 0 0");

        source.insert("frames", 0, "ppm", "P3 1 1 255 9 9 9");
        let text = source.fetch(&location("frames", 0)).await.unwrap();
        assert_eq!(text, "P3 1 1 255 9 9 9");

        let err = source.fetch(&location("frames", 1)).await.unwrap_err();
        assert_matches!(err, Error::Fetch { .. });
    }

    #[tokio::test]
    async fn test_http_source_sends_cache_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/frames/2.ppm"))
            .and(query_param("t", "1700000000123"))
            .and(header("cache-control", "no-cache"))
            .respond_with(ResponseTemplate::new(200).set_body_string("P3 1 1 255 0 0 0"))
            .expect(1)
            .mount(&server)
            .await;

        let directory = format!("{}/frames", server.uri());
        let text = HttpSource::new()
            .fetch(&location(&directory, 2))
            .await
            .unwrap();
        assert_eq!(text, "P3 1 1 255 0 0 0");
    }

    #[tokio::test]
    async fn test_http_source_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/frames/0.ppm"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let directory = format!("{}/frames", server.uri());
        let err = HttpSource::new()
            .fetch(&location(&directory, 0))
            .await
            .unwrap_err();
        assert_matches!(err, Error::Fetch { ref message, .. } if message.contains("404"));
    }
}
