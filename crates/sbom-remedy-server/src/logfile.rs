use std::path::PathBuf;
use std::time::SystemTime;

use anyhow::{Context, Result};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

/// Append-only request log exposed through `GET /logs`.
///
/// An injected handle rather than a process-wide singleton, so tests can
/// point it at a scratch file. Appends are serialized behind a mutex;
/// ordering across concurrent requests is not guaranteed.
#[derive(Debug)]
pub struct RequestLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl RequestLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Append a timestamped line. Log failures are reported through tracing
    /// and never fail the surrounding request.
    pub async fn append(&self, message: &str) {
        let stamp = humantime::format_rfc3339_seconds(SystemTime::now());
        let line = format!("{stamp} {message}\n");
        let _guard = self.lock.lock().await;
        let result = async {
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .await?;
            file.write_all(line.as_bytes()).await
        }
        .await;
        if let Err(err) = result {
            warn!(%err, path = %self.path.display(), "failed to append to request log");
        }
    }

    pub async fn read_all(&self) -> Result<String> {
        tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("failed to read log file at {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn appends_timestamped_lines_in_order() {
        let temp = tempfile::tempdir().unwrap();
        let log = RequestLog::new(temp.path().join("output.log"));
        log.append("first entry").await;
        log.append("second entry").await;

        let content = log.read_all().await.unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("first entry"));
        assert!(lines[1].ends_with("second entry"));
    }

    #[tokio::test]
    async fn reading_a_missing_log_errors() {
        let temp = tempfile::tempdir().unwrap();
        let log = RequestLog::new(temp.path().join("missing.log"));
        assert!(log.read_all().await.is_err());
    }
}
