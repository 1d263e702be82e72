use serde::{Deserialize, Serialize};

/// Package ecosystems the remediation pipeline knows how to talk about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageEcosystem {
    Python,
    NodeJs,
    Java,
    Go,
    Ruby,
    Rust,
    Unknown,
}

impl PackageEcosystem {
    /// Display label used in prompts and API responses.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Python => "Python package",
            Self::NodeJs => "Node.js package",
            Self::Java => "Java package",
            Self::Go => "Go package",
            Self::Ruby => "Ruby package",
            Self::Rust => "Rust package",
            Self::Unknown => "package",
        }
    }

    /// Canonical package manager for the ecosystem.
    pub fn package_manager(&self) -> &'static str {
        match self {
            Self::Python => "pip",
            Self::NodeJs => "npm",
            Self::Java => "maven",
            Self::Go => "go modules",
            Self::Ruby => "bundler",
            Self::Rust => "cargo",
            Self::Unknown => "unknown",
        }
    }

    /// Fixed "upgrade everything" command template, consumed only by the
    /// static fallback generator. `None` for unknown ecosystems.
    pub fn upgrade_command(&self) -> Option<&'static str> {
        match self {
            Self::Python => {
                Some("pip list --outdated --format=freeze | cut -d = -f 1 | xargs -n1 pip install -U")
            }
            Self::NodeJs => Some("npm update && npm audit fix"),
            Self::Java => Some("mvn versions:use-latest-releases"),
            Self::Go => Some("go get -u ./... && go mod tidy"),
            Self::Ruby => Some("bundle update"),
            Self::Rust => Some("cargo update"),
            Self::Unknown => None,
        }
    }
}

/// Heuristically label free-form scan output with a package ecosystem.
///
/// Ordered, case-sensitive substring tests, first match wins. Scanner output
/// is treated as opaque text, so a keyword appearing in an unrelated context
/// (a package literally named "java-helper" in a Python project) can
/// misclassify. The fixed order below is load-bearing: callers and tests rely
/// on the exact precedence python > nodejs > java > go > ruby > rust.
pub fn classify_ecosystem(scan_text: &str) -> PackageEcosystem {
    if scan_text.contains("python") {
        PackageEcosystem::Python
    } else if scan_text.contains("nodejs") || scan_text.contains("npm") {
        PackageEcosystem::NodeJs
    } else if scan_text.contains("java") || scan_text.contains("maven") {
        PackageEcosystem::Java
    } else if scan_text.contains("golang") || scan_text.contains("go-module") {
        PackageEcosystem::Go
    } else if scan_text.contains("ruby") || scan_text.contains("gem") {
        PackageEcosystem::Ruby
    } else if scan_text.contains("rust") || scan_text.contains("cargo") {
        PackageEcosystem::Rust
    } else {
        PackageEcosystem::Unknown
    }
}
