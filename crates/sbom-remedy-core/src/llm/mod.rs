mod llamaindex;
mod ollama;
mod settings;
pub mod stream;

use anyhow::Result;
use async_trait::async_trait;

pub use llamaindex::LlamaIndexClient;
pub use ollama::OllamaClient;
pub use settings::RemedySettings;

/// Context-aware remediation analysis over full scan + SBOM text.
#[async_trait]
pub trait SemanticAnalyzer: Send + Sync {
    /// Produce a remediation analysis for the given scan output and SBOM.
    async fn analyze(&self, scan_text: &str, sbom_text: &str) -> Result<String>;

    /// Analysis with a caller-supplied query, used by the pass-through
    /// surface. Backends without query support ignore the query.
    async fn analyze_with_query(
        &self,
        _query: &str,
        scan_text: &str,
        sbom_text: &str,
    ) -> Result<String> {
        self.analyze(scan_text, sbom_text).await
    }
}

/// Generative backend that synthesizes a remediation script from a prompt.
#[async_trait]
pub trait ScriptGenerator: Send + Sync {
    /// Cheap liveness probe; failure short-circuits the generative tier.
    async fn health_check(&self) -> Result<()>;

    /// Run the model and return the full (aggregated) response text.
    async fn generate(&self, prompt: &str) -> Result<String>;
}
