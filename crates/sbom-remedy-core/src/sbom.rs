use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::process::Command;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::source::SourceLocator;

/// Produces a CycloneDX JSON SBOM for a resolved source.
#[async_trait]
pub trait SbomGenerator: Send + Sync {
    async fn generate(&self, locator: &SourceLocator) -> Result<String>;
}

/// Runs a vulnerability scan over an SBOM file; output is opaque text.
#[async_trait]
pub trait VulnerabilityScanner: Send + Sync {
    async fn scan(&self, sbom_path: &Path) -> Result<String>;
}

/// Advisory SBOM quality scoring. Never fatal: tool absence is an outcome.
#[async_trait]
pub trait QualityScorer: Send + Sync {
    async fn score(&self, sbom_path: &Path) -> QualityScore;
}

/// Quality score with provenance. `Basic` means the score was regex-extracted
/// from plain tool output after JSON parsing failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provenance", rename_all = "lowercase")]
pub enum QualityScore {
    Full { score: f64 },
    Basic { score: f64 },
    Unavailable { reason: String },
}

/// SBOM generation backed by the `syft` CLI.
#[derive(Debug, Default, Clone)]
pub struct SyftGenerator;

#[async_trait]
impl SbomGenerator for SyftGenerator {
    async fn generate(&self, locator: &SourceLocator) -> Result<String> {
        // The dir:/image: prefix is syft's source scheme, an argument detail
        // of this collaborator only; the locator itself stays typed.
        let source_arg = match locator {
            SourceLocator::LocalPath(path) => format!("dir:{}", path.display()),
            SourceLocator::RemoteRepository { checkout, .. } => {
                format!("dir:{}", checkout.display())
            }
            SourceLocator::ContainerImage(image) => format!("image:{image}"),
        };
        debug!(%source_arg, "generating SBOM with syft");
        let output = Command::new("syft")
            .arg(&source_arg)
            .arg("-o")
            .arg("cyclonedx-json")
            .arg("-q")
            .output()
            .await
            .context("failed to run syft; is it installed?")?;
        if !output.status.success() {
            bail!(
                "syft failed for {source_arg}: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Vulnerability scanning backed by the `grype` CLI, restricted to findings
/// with a known fixed version.
#[derive(Debug, Default, Clone)]
pub struct GrypeScanner;

#[async_trait]
impl VulnerabilityScanner for GrypeScanner {
    async fn scan(&self, sbom_path: &Path) -> Result<String> {
        debug!(path = %sbom_path.display(), "scanning SBOM with grype");
        let output = Command::new("grype")
            .arg(sbom_path)
            .arg("--only-fixed")
            .arg("-q")
            .output()
            .await
            .context("failed to run grype; is it installed?")?;
        if !output.status.success() {
            bail!(
                "grype failed for {}: {}",
                sbom_path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        // Scan text is the combined output; grype writes some findings
        // context to stderr even on success.
        Ok(combine_scan_output(
            &String::from_utf8_lossy(&output.stdout),
            &String::from_utf8_lossy(&output.stderr),
        ))
    }
}

fn combine_scan_output(stdout: &str, stderr: &str) -> String {
    if stderr.trim().is_empty() {
        return stdout.to_string();
    }
    let mut combined = stdout.to_string();
    if !combined.is_empty() && !combined.ends_with('\n') {
        combined.push('\n');
    }
    combined.push_str(stderr);
    combined
}

/// Quality scoring backed by the `sbomqs` CLI, bounded by a timeout.
#[derive(Debug, Clone)]
pub struct SbomqsScorer {
    timeout: Duration,
}

impl SbomqsScorer {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

#[async_trait]
impl QualityScorer for SbomqsScorer {
    async fn score(&self, sbom_path: &Path) -> QualityScore {
        let run = Command::new("sbomqs")
            .arg("score")
            .arg(sbom_path)
            .arg("--json")
            .output();
        let output = match tokio::time::timeout(self.timeout, run).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                warn!(%err, "sbomqs unavailable");
                return QualityScore::Unavailable {
                    reason: format!("sbomqs not available: {err}"),
                };
            }
            Err(_) => {
                warn!("sbomqs timed out");
                return QualityScore::Unavailable {
                    reason: format!("sbomqs timed out after {:?}", self.timeout),
                };
            }
        };
        if !output.status.success() {
            return QualityScore::Unavailable {
                reason: format!(
                    "sbomqs exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            };
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        if let Some(score) = parse_sbomqs_json(&stdout) {
            return QualityScore::Full { score };
        }
        if let Some(score) = extract_basic_score(&stdout) {
            return QualityScore::Basic { score };
        }
        QualityScore::Unavailable {
            reason: "could not extract a score from sbomqs output".to_string(),
        }
    }
}

fn parse_sbomqs_json(output: &str) -> Option<f64> {
    let value: Value = serde_json::from_str(output).ok()?;
    value
        .pointer("/files/0/avg_score")
        .or_else(|| value.pointer("/avg_score"))
        .and_then(Value::as_f64)
}

fn extract_basic_score(output: &str) -> Option<f64> {
    static SCORE_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\d+\.\d+").expect("score regex is valid"));
    SCORE_RE
        .find(output)
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// Stores generated SBOMs under a directory, one file per generation, with
/// an explicit "current" handle. Generations never overwrite each other, so
/// concurrent requests cannot race on a shared well-known path.
#[derive(Debug)]
pub struct SbomStore {
    dir: PathBuf,
    current: RwLock<Option<PathBuf>>,
    seq: AtomicU64,
}

impl SbomStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            current: RwLock::new(None),
            seq: AtomicU64::new(0),
        }
    }

    /// Persist SBOM content to a fresh file and make it the current SBOM.
    pub async fn store(&self, content: &str) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("failed to create SBOM store at {}", self.dir.display()))?;
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        let path = self.dir.join(format!("sbom-{seq:06}.cyclonedx.json"));
        tokio::fs::write(&path, content)
            .await
            .with_context(|| format!("failed to write SBOM to {}", path.display()))?;
        *self.current.write().await = Some(path.clone());
        Ok(path)
    }

    /// Path of the most recently stored SBOM, if any.
    pub async fn current(&self) -> Option<PathBuf> {
        self.current.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_output_includes_stderr() {
        assert_eq!(
            combine_scan_output("NAME  FIXED-IN\nrequests  2.32.0", "1 warning emitted\n"),
            "NAME  FIXED-IN\nrequests  2.32.0\n1 warning emitted\n"
        );
        assert_eq!(combine_scan_output("findings\n", "  "), "findings\n");
        assert_eq!(combine_scan_output("", "stderr only\n"), "stderr only\n");
    }

    #[test]
    fn json_score_is_preferred() {
        let output = r#"{"files":[{"file_name":"sbom.json","avg_score":7.85}]}"#;
        assert_eq!(parse_sbomqs_json(output), Some(7.85));
    }

    #[test]
    fn top_level_avg_score_is_accepted() {
        assert_eq!(parse_sbomqs_json(r#"{"avg_score":6.1}"#), Some(6.1));
    }

    #[test]
    fn basic_score_is_regex_extracted() {
        assert_eq!(extract_basic_score("7.2\tsbom.json\n"), Some(7.2));
        assert_eq!(extract_basic_score("no score here"), None);
    }

    #[test]
    fn malformed_json_yields_none() {
        assert_eq!(parse_sbomqs_json("not json"), None);
        assert_eq!(parse_sbomqs_json(r#"{"files":[]}"#), None);
    }

    #[tokio::test]
    async fn store_keeps_distinct_files_and_tracks_current() {
        let temp = tempfile::tempdir().unwrap();
        let store = SbomStore::new(temp.path());
        assert!(store.current().await.is_none());

        let first = store.store("{\"a\":1}").await.unwrap();
        let second = store.store("{\"b\":2}").await.unwrap();
        assert_ne!(first, second);
        assert_eq!(store.current().await, Some(second.clone()));
        assert_eq!(
            tokio::fs::read_to_string(&first).await.unwrap(),
            "{\"a\":1}"
        );
        assert_eq!(
            tokio::fs::read_to_string(&second).await.unwrap(),
            "{\"b\":2}"
        );
    }

    #[tokio::test]
    async fn scoring_a_missing_file_reports_unavailable() {
        // Holds whether sbomqs is installed (nonzero exit) or absent (spawn error).
        let scorer = SbomqsScorer::new(5);
        let score = scorer.score(Path::new("/nonexistent/sbom.json")).await;
        assert!(matches!(score, QualityScore::Unavailable { .. }));
    }

    #[test]
    fn quality_score_serializes_with_provenance_tag() {
        let full = serde_json::to_value(QualityScore::Full { score: 8.0 }).unwrap();
        assert_eq!(full["provenance"], "full");
        assert_eq!(full["score"], 8.0);
        let gone = serde_json::to_value(QualityScore::Unavailable {
            reason: "missing".into(),
        })
        .unwrap();
        assert_eq!(gone["provenance"], "unavailable");
    }
}
