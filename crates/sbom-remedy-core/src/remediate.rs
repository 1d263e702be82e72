use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::ecosystem::PackageEcosystem;
use crate::fallback::fallback_script;
use crate::llm::{ScriptGenerator, SemanticAnalyzer};

/// Which tier ultimately produced a remediation script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    Semantic,
    Generative,
    Static,
}

/// Outcome of a remediation run. `engine` is `None` only when there was
/// nothing to remediate; `warning` records a higher-priority tier that was
/// attempted and failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemediationResult {
    pub script: String,
    pub engine: Option<Engine>,
    pub warning: Option<String>,
}

impl RemediationResult {
    fn empty() -> Self {
        Self {
            script: String::new(),
            engine: None,
            warning: None,
        }
    }
}

/// Prompt handed to the generative backend.
pub fn remediation_prompt(ecosystem: PackageEcosystem, scan_text: &str) -> String {
    format!(
        "You are a DevSecOps expert. Given the following SBOM scan output, write a clean \
         script that upgrades each vulnerable {} to its fixed version.\n\n\
         Only output the script in a code block.\n\n\
         SBOM Scan:\n{}\n",
        ecosystem.label(),
        scan_text
    )
}

/// Drives the three-tier remediation fallback chain: semantic analysis
/// (only when explicitly preferred), then the generative backend, then the
/// deterministic static generator. Backend failures advance the chain and
/// never fail the caller; the static tier guarantees a result.
pub struct Remediator {
    semantic: Arc<dyn SemanticAnalyzer>,
    generative: Arc<dyn ScriptGenerator>,
}

impl Remediator {
    pub fn new(semantic: Arc<dyn SemanticAnalyzer>, generative: Arc<dyn ScriptGenerator>) -> Self {
        Self {
            semantic,
            generative,
        }
    }

    #[instrument(skip(self, scan_text, sbom_text), fields(ecosystem = ecosystem.label(), prefer_advanced))]
    pub async fn remediate(
        &self,
        scan_text: &str,
        sbom_text: &str,
        ecosystem: PackageEcosystem,
        prefer_advanced: bool,
    ) -> RemediationResult {
        if scan_text.trim().is_empty() {
            info!("empty scan output; nothing to remediate");
            return RemediationResult::empty();
        }

        // Every higher-priority tier that was attempted and failed is
        // disclosed on the final result's warning.
        let mut warning: Option<String> = None;

        if prefer_advanced {
            match self.semantic.analyze(scan_text, sbom_text).await {
                Ok(script) => {
                    info!("semantic analysis produced remediation");
                    return RemediationResult {
                        script,
                        engine: Some(Engine::Semantic),
                        warning: None,
                    };
                }
                Err(err) => {
                    warn!(%err, "semantic analysis failed; falling back to generative tier");
                    warning = Some(format!("semantic analysis failed: {err}"));
                }
            }
        }

        if let Err(err) = self.generative.health_check().await {
            warn!(%err, "generative backend unavailable; using static fallback");
            return RemediationResult {
                script: fallback_script(ecosystem),
                engine: Some(Engine::Static),
                warning: Some(push_warning(
                    warning,
                    format!("generative backend unavailable: {err}"),
                )),
            };
        }

        let prompt = remediation_prompt(ecosystem, scan_text);
        match self.generative.generate(&prompt).await {
            Ok(script) => {
                info!("generative backend produced remediation");
                RemediationResult {
                    script,
                    engine: Some(Engine::Generative),
                    warning,
                }
            }
            Err(err) => {
                warn!(%err, "generative backend failed; using static fallback");
                RemediationResult {
                    script: fallback_script(ecosystem),
                    engine: Some(Engine::Static),
                    warning: Some(push_warning(
                        warning,
                        format!("generative backend failed: {err}"),
                    )),
                }
            }
        }
    }
}

fn push_warning(prior: Option<String>, message: String) -> String {
    match prior {
        Some(prior) => format!("{prior}; {message}"),
        None => message,
    }
}
