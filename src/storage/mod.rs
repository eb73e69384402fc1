//! Disk-backed content store for uploaded images.
//!
//! Files live under `<root>/<namespace>/<name>` and are served by the HTTP
//! layer under `/img`, so the issued URL for a stored file is
//! `img/<namespace>/<name>`.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Directory served as the `/img` static mount.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Public URL for a stored file.
    pub fn url(&self, namespace: &str, name: &str) -> String {
        format!("img/{}/{}", namespace, name)
    }

    /// Write `bytes` under a namespace and return the issued URL.
    pub async fn put(&self, namespace: &str, name: &str, bytes: &[u8]) -> Result<String> {
        let dir = self.root.join(namespace);
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create image directory {}", dir.display()))?;

        let path = dir.join(name);
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write image {}", path.display()))?;

        Ok(self.url(namespace, name))
    }

    /// Best-effort removal of a previously issued URL. A failed delete is
    /// logged and swallowed; it must never block storing a replacement.
    pub async fn delete_by_url(&self, namespace: &str, url: &str) {
        let prefix = format!("img/{}/", namespace);
        let name = url.strip_prefix(&prefix).unwrap_or(url);
        if name.contains('/') || name.contains("..") {
            warn!(url = %url, "Refusing to delete image outside the store");
            return;
        }

        let path = self.root.join(namespace).join(name);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!(path = %path.display(), error = %e, "Failed to delete stored image");
        }
    }

    /// Read back a stored file by its issued URL (used by tests and tooling).
    pub async fn read_by_url(&self, namespace: &str, url: &str) -> Result<Vec<u8>> {
        let prefix = format!("img/{}/", namespace);
        let name = url
            .strip_prefix(&prefix)
            .with_context(|| format!("URL {} was not issued by this store", url))?;
        let path = self.root.join(namespace).join(name);
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read image {}", path.display()))
    }
}
