pub mod ecosystem;
pub mod fallback;
pub mod llm;
pub mod remediate;
pub mod sbom;
pub mod script;
pub mod source;

pub use ecosystem::{classify_ecosystem, PackageEcosystem};
pub use fallback::fallback_script;
pub use llm::{LlamaIndexClient, OllamaClient, RemedySettings, ScriptGenerator, SemanticAnalyzer};
pub use remediate::{remediation_prompt, Engine, RemediationResult, Remediator};
pub use sbom::{
    GrypeScanner, QualityScore, QualityScorer, SbomGenerator, SbomStore, SbomqsScorer,
    SyftGenerator, VulnerabilityScanner,
};
pub use script::extract_script_block;
pub use source::{SourceError, SourceLocator, SourceResolver};
