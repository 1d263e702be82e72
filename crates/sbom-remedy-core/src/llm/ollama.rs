use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use super::stream::aggregate_response_lines;
use super::{RemedySettings, ScriptGenerator};

/// Client for a local/hosted Ollama generative backend.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: Client,
    health: Client,
    host: String,
    model: String,
}

impl OllamaClient {
    pub fn new(settings: &RemedySettings) -> Result<Self> {
        let host = settings.ollama_host.trim_end_matches('/').to_string();
        let http = Client::builder()
            .user_agent("sbom-remedy/0.3")
            .timeout(Duration::from_secs(settings.generate_timeout_secs))
            .build()
            .context("failed to build Ollama HTTP client")?;
        // Separate client so the liveness probe gets its own, tighter bound.
        let health = Client::builder()
            .user_agent("sbom-remedy/0.3")
            .timeout(Duration::from_secs(settings.health_timeout_secs))
            .build()
            .context("failed to build Ollama health-check client")?;
        Ok(Self {
            http,
            health,
            host,
            model: settings.model.clone(),
        })
    }
}

#[async_trait]
impl ScriptGenerator for OllamaClient {
    async fn health_check(&self) -> Result<()> {
        let url = format!("{}/api/tags", self.host);
        let response = self
            .health
            .get(&url)
            .send()
            .await
            .context("Ollama health check failed")?;
        if !response.status().is_success() {
            bail!("Ollama health check returned {}", response.status());
        }
        Ok(())
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.host);
        let payload = GenerateRequest {
            model: &self.model,
            prompt,
        };
        debug!(model = %self.model, "sending prompt to Ollama");
        let response = self
            .http
            .post(&url)
            .json(&payload)
            .send()
            .await
            .context("failed to call Ollama generate API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Ollama API error ({}): {}", status, body);
        }

        // The body is a newline-delimited JSON event stream; tolerant
        // aggregation guarantees a non-empty result on completion.
        let body = response
            .text()
            .await
            .context("failed to read Ollama response stream")?;
        Ok(aggregate_response_lines(body.lines()))
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::stream::EMPTY_STREAM_PLACEHOLDER;
    use httpmock::prelude::*;
    use std::collections::HashMap;

    fn settings_for(host: &str) -> RemedySettings {
        let mut vars = HashMap::new();
        vars.insert("REMEDY_OLLAMA_HOST".to_string(), host.to_string());
        vars.insert("REMEDY_HEALTH_TIMEOUT_SECS".to_string(), "2".to_string());
        vars.insert("REMEDY_GENERATE_TIMEOUT_SECS".to_string(), "5".to_string());
        RemedySettings::from_map(vars)
    }

    #[tokio::test]
    #[ignore = "requires loopback networking"]
    async fn health_check_accepts_success_status() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/api/tags");
            then.status(200).body(r#"{"models":[]}"#);
        });

        let client = OllamaClient::new(&settings_for(&server.base_url())).unwrap();
        client.health_check().await.unwrap();
        mock.assert();
    }

    #[tokio::test]
    #[ignore = "requires loopback networking"]
    async fn health_check_rejects_error_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/tags");
            then.status(503);
        });

        let client = OllamaClient::new(&settings_for(&server.base_url())).unwrap();
        let err = client.health_check().await.unwrap_err();
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    #[ignore = "requires loopback networking"]
    async fn generate_aggregates_streamed_lines() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/api/generate");
            then.status(200).body(concat!(
                "{\"message\":{\"content\":\"```bash\\n\"}}\n",
                "not json\n",
                "{\"message\":{\"content\":\"npm update\\n```\"}}\n",
            ));
        });

        let client = OllamaClient::new(&settings_for(&server.base_url())).unwrap();
        let text = client.generate("fix it").await.unwrap();
        assert_eq!(text, "```bash\nnpm update\n```");
    }

    #[tokio::test]
    #[ignore = "requires loopback networking"]
    async fn generate_substitutes_placeholder_for_empty_stream() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/api/generate");
            then.status(200).body("{\"done\":true}\n");
        });

        let client = OllamaClient::new(&settings_for(&server.base_url())).unwrap();
        let text = client.generate("fix it").await.unwrap();
        assert_eq!(text, EMPTY_STREAM_PLACEHOLDER);
    }
}
