use std::collections::HashMap;

/// Environment-driven configuration for the remediation backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemedySettings {
    pub llamaindex_endpoint: String,
    pub ollama_host: String,
    pub model: String,
    pub port: u16,
    pub health_timeout_secs: u64,
    pub generate_timeout_secs: u64,
    pub score_timeout_secs: u64,
}

impl RemedySettings {
    const LLAMAINDEX_ENV: &'static str = "REMEDY_LLAMAINDEX_URL";
    const OLLAMA_ENV: &'static str = "REMEDY_OLLAMA_HOST";
    const MODEL_ENV: &'static str = "REMEDY_MODEL";
    const PORT_ENV: &'static str = "REMEDY_PORT";
    const HEALTH_TIMEOUT_ENV: &'static str = "REMEDY_HEALTH_TIMEOUT_SECS";
    const GENERATE_TIMEOUT_ENV: &'static str = "REMEDY_GENERATE_TIMEOUT_SECS";
    const SCORE_TIMEOUT_ENV: &'static str = "REMEDY_SCORE_TIMEOUT_SECS";

    /// Load settings from environment variables.
    ///
    /// * `REMEDY_LLAMAINDEX_URL` — semantic analysis endpoint (default `http://localhost:8000`).
    /// * `REMEDY_OLLAMA_HOST`    — generative model host (default `http://host.docker.internal:11434`).
    /// * `REMEDY_MODEL`          — model identifier (default `mistral`).
    /// * `REMEDY_PORT`           — HTTP listen port (default `3000`).
    pub fn from_env() -> Self {
        Self::from_map(std::env::vars().collect())
    }

    pub fn from_map(vars: HashMap<String, String>) -> Self {
        let get = |key: &str| {
            vars.get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Self {
            llamaindex_endpoint: get(Self::LLAMAINDEX_ENV)
                .unwrap_or_else(|| "http://localhost:8000".to_string()),
            ollama_host: get(Self::OLLAMA_ENV)
                .unwrap_or_else(|| "http://host.docker.internal:11434".to_string()),
            model: get(Self::MODEL_ENV).unwrap_or_else(|| "mistral".to_string()),
            port: get(Self::PORT_ENV)
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            health_timeout_secs: get(Self::HEALTH_TIMEOUT_ENV)
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            generate_timeout_secs: get(Self::GENERATE_TIMEOUT_ENV)
                .and_then(|v| v.parse().ok())
                .unwrap_or(120),
            score_timeout_secs: get(Self::SCORE_TIMEOUT_ENV)
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let settings = RemedySettings::from_map(HashMap::new());
        assert_eq!(settings.llamaindex_endpoint, "http://localhost:8000");
        assert_eq!(settings.ollama_host, "http://host.docker.internal:11434");
        assert_eq!(settings.model, "mistral");
        assert_eq!(settings.port, 3000);
        assert_eq!(settings.health_timeout_secs, 10);
        assert_eq!(settings.generate_timeout_secs, 120);
        assert_eq!(settings.score_timeout_secs, 30);
    }

    #[test]
    fn overrides_win_over_defaults() {
        let mut vars = HashMap::new();
        vars.insert("REMEDY_OLLAMA_HOST".into(), "http://ollama:11434".into());
        vars.insert("REMEDY_MODEL".into(), "llama3".into());
        vars.insert("REMEDY_PORT".into(), "8080".into());
        vars.insert("REMEDY_GENERATE_TIMEOUT_SECS".into(), "45".into());
        let settings = RemedySettings::from_map(vars);
        assert_eq!(settings.ollama_host, "http://ollama:11434");
        assert_eq!(settings.model, "llama3");
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.generate_timeout_secs, 45);
    }

    #[test]
    fn blank_or_invalid_values_fall_back() {
        let mut vars = HashMap::new();
        vars.insert("REMEDY_MODEL".into(), "   ".into());
        vars.insert("REMEDY_PORT".into(), "not-a-port".into());
        let settings = RemedySettings::from_map(vars);
        assert_eq!(settings.model, "mistral");
        assert_eq!(settings.port, 3000);
    }
}
