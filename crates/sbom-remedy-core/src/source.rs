use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

/// Typed source reference consumed by the SBOM generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocator {
    /// Existing filesystem path (directory or file).
    LocalPath(PathBuf),
    /// Container image reference, e.g. `alpine:3.19`.
    ContainerImage(String),
    /// Remote git repository, already shallow-cloned into `checkout`.
    RemoteRepository { url: String, checkout: PathBuf },
}

/// Errors raised while turning a raw source string into a [`SourceLocator`].
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("no source provided; expected an image, directory path, or remote URL")]
    Empty,
    #[error("failed to clear clone scratch directory {dir}: {source}")]
    Scratch {
        dir: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to run git: {0}")]
    GitUnavailable(std::io::Error),
    #[error("git clone of {url} failed: {stderr}")]
    CloneFailed { url: String, stderr: String },
}

/// Resolves user-supplied source strings in a fixed priority order:
/// existing local path, then `http(s)://` URL (shallow-cloned), then
/// container image reference as the default.
#[derive(Debug, Clone)]
pub struct SourceResolver {
    scratch_dir: PathBuf,
}

impl Default for SourceResolver {
    fn default() -> Self {
        Self {
            scratch_dir: std::env::temp_dir().join("sbom-remedy-clone"),
        }
    }
}

impl SourceResolver {
    pub fn new(scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            scratch_dir: scratch_dir.into(),
        }
    }

    pub async fn resolve(&self, raw: &str) -> Result<SourceLocator, SourceError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(SourceError::Empty);
        }
        if Path::new(raw).exists() {
            debug!(path = raw, "source resolved to local path");
            return Ok(SourceLocator::LocalPath(PathBuf::from(raw)));
        }
        if raw.starts_with("http://") || raw.starts_with("https://") {
            self.clone_repository(raw).await?;
            return Ok(SourceLocator::RemoteRepository {
                url: raw.to_string(),
                checkout: self.scratch_dir.clone(),
            });
        }
        debug!(image = raw, "source resolved to container image reference");
        Ok(SourceLocator::ContainerImage(raw.to_string()))
    }

    /// Shallow clone into the scratch directory. Any previous clone is
    /// removed first; there is exactly one scratch clone at a time.
    async fn clone_repository(&self, url: &str) -> Result<(), SourceError> {
        match tokio::fs::remove_dir_all(&self.scratch_dir).await {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                return Err(SourceError::Scratch {
                    dir: self.scratch_dir.clone(),
                    source: err,
                })
            }
        }

        info!(url, dir = %self.scratch_dir.display(), "cloning remote repository");
        let output = Command::new("git")
            .arg("clone")
            .arg("--depth")
            .arg("1")
            .arg(url)
            .arg(&self.scratch_dir)
            .output()
            .await
            .map_err(SourceError::GitUnavailable)?;

        if !output.status.success() {
            return Err(SourceError::CloneFailed {
                url: url.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}
