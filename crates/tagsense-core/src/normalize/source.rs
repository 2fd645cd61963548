//! Resolving image references to raw bytes (local files or HTTP URLs).

use std::path::PathBuf;
use std::time::Duration;

use crate::config::LimitsConfig;
use crate::error::{ConfigError, ImageError};

/// Where an image reference points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// A file on the local filesystem
    Local(PathBuf),
    /// An `http://` or `https://` URL
    Remote(String),
}

impl ImageSource {
    /// Classify a reference, optionally mapping Windows paths onto the WSL mount.
    pub fn resolve(reference: &str, windows_path_rewrite: bool) -> Self {
        if reference.starts_with("http://") || reference.starts_with("https://") {
            return Self::Remote(reference.to_string());
        }
        if windows_path_rewrite {
            return Self::Local(PathBuf::from(rewrite_windows_path(reference)));
        }
        Self::Local(PathBuf::from(reference))
    }
}

/// `C:\Users\me\a.jpg` -> `/mnt/c/Users/me/a.jpg`.
pub fn rewrite_windows_path(reference: &str) -> String {
    let mapped = match reference.strip_prefix("C:\\") {
        Some(rest) => format!("/mnt/c/{rest}"),
        None => reference.to_string(),
    };
    mapped.replace('\\', "/")
}

/// Reads image bytes for a reference.
#[derive(Debug, Clone)]
pub struct SourceLoader {
    client: reqwest::Client,
    windows_path_rewrite: bool,
    max_bytes: u64,
}

impl SourceLoader {
    /// Build a loader that enforces the size limit before reading a body.
    pub fn new(limits: &LimitsConfig, windows_path_rewrite: bool) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(limits.fetch_timeout_ms))
            .build()?;
        Ok(Self {
            client,
            windows_path_rewrite,
            max_bytes: limits.max_file_size_mb * 1024 * 1024,
        })
    }

    /// Fetch the raw bytes behind `reference`.
    pub async fn load(&self, reference: &str) -> Result<Vec<u8>, ImageError> {
        match ImageSource::resolve(reference, self.windows_path_rewrite) {
            ImageSource::Local(path) => self.load_local(reference, path).await,
            ImageSource::Remote(url) => self.load_remote(reference, &url).await,
        }
    }

    async fn load_local(&self, reference: &str, path: PathBuf) -> Result<Vec<u8>, ImageError> {
        let metadata = tokio::fs::metadata(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ImageError::NotFound {
                    reference: reference.to_string(),
                }
            } else {
                ImageError::Read {
                    reference: reference.to_string(),
                    message: e.to_string(),
                }
            }
        })?;
        if metadata.len() > self.max_bytes {
            return Err(self.too_large(reference, metadata.len()));
        }

        tokio::fs::read(&path).await.map_err(|e| ImageError::Read {
            reference: reference.to_string(),
            message: e.to_string(),
        })
    }

    async fn load_remote(&self, reference: &str, url: &str) -> Result<Vec<u8>, ImageError> {
        let fetch_err = |message: String| ImageError::Fetch {
            reference: reference.to_string(),
            message,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| fetch_err(e.to_string()))?;

        if let Some(len) = response.content_length() {
            if len > self.max_bytes {
                return Err(self.too_large(reference, len));
            }
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| fetch_err(e.to_string()))?;
        if body.len() as u64 > self.max_bytes {
            return Err(self.too_large(reference, body.len() as u64));
        }
        Ok(body.to_vec())
    }

    fn too_large(&self, reference: &str, len: u64) -> ImageError {
        ImageError::FileTooLarge {
            reference: reference.to_string(),
            size_mb: len / (1024 * 1024),
            max_mb: self.max_bytes / (1024 * 1024),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_remote() {
        assert_eq!(
            ImageSource::resolve("https://example.com/a.jpg", true),
            ImageSource::Remote("https://example.com/a.jpg".to_string())
        );
    }

    #[test]
    fn test_resolve_local_untouched_without_rewrite() {
        assert_eq!(
            ImageSource::resolve("C:\\photos\\a.jpg", false),
            ImageSource::Local(PathBuf::from("C:\\photos\\a.jpg"))
        );
    }

    #[test]
    fn test_windows_path_rewrite() {
        assert_eq!(
            rewrite_windows_path("C:\\Users\\me\\cat.jpg"),
            "/mnt/c/Users/me/cat.jpg"
        );
        assert_eq!(rewrite_windows_path("/already/unix.png"), "/already/unix.png");
        assert_eq!(rewrite_windows_path("rel\\dir\\x.png"), "rel/dir/x.png");
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let loader = SourceLoader::new(&LimitsConfig::default(), false).unwrap();
        let err = loader.load("/definitely/not/here.png").await.unwrap_err();
        assert!(matches!(err, ImageError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_load_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.bin");
        std::fs::write(&path, [1u8, 2, 3]).unwrap();

        let loader = SourceLoader::new(&LimitsConfig::default(), false).unwrap();
        let bytes = loader.load(path.to_str().unwrap()).await.unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_fetch_honours_timeout() {
        // Accepts connections but never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let limits = LimitsConfig {
            fetch_timeout_ms: 200,
            ..LimitsConfig::default()
        };
        let loader = SourceLoader::new(&limits, false).unwrap();
        let url = format!("http://{addr}/slow.jpg");

        let started = std::time::Instant::now();
        let err = loader.load(&url).await.unwrap_err();
        assert!(matches!(err, ImageError::Fetch { ref reference, .. } if *reference == url));
        assert!(started.elapsed() < Duration::from_secs(5));
        server.abort();
    }
}
