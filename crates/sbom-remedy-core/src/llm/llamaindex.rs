use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{RemedySettings, SemanticAnalyzer};

const DEFAULT_QUERY: &str =
    "Analyze the vulnerability scan against the SBOM and propose a remediation script.";

/// Client for the LlamaIndex semantic analysis service.
#[derive(Debug, Clone)]
pub struct LlamaIndexClient {
    http: Client,
    url: String,
}

impl LlamaIndexClient {
    pub fn new(settings: &RemedySettings) -> Result<Self> {
        let url = format!(
            "{}/analyze",
            settings.llamaindex_endpoint.trim_end_matches('/')
        );
        let http = Client::builder()
            .user_agent("sbom-remedy/0.3")
            .timeout(Duration::from_secs(settings.generate_timeout_secs))
            .build()
            .context("failed to build LlamaIndex HTTP client")?;
        Ok(Self { http, url })
    }

    /// Run an analysis with a caller-supplied query. Used directly by the
    /// pass-through endpoint; the [`SemanticAnalyzer`] impl supplies a
    /// default remediation query.
    pub async fn query(&self, query: &str, scan_text: &str, sbom_text: &str) -> Result<String> {
        let payload = AnalyzeRequest {
            query,
            scan_data: scan_text,
            sbom_data: sbom_text,
        };
        let response = self
            .http
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .context("failed to call LlamaIndex analyze API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("LlamaIndex API error ({}): {}", status, body);
        }

        let analysis: AnalyzeResponse = response
            .json()
            .await
            .context("failed to parse LlamaIndex response")?;
        analysis
            .response
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| anyhow!("LlamaIndex response missing analysis text"))
    }
}

#[async_trait]
impl SemanticAnalyzer for LlamaIndexClient {
    async fn analyze(&self, scan_text: &str, sbom_text: &str) -> Result<String> {
        self.query(DEFAULT_QUERY, scan_text, sbom_text).await
    }

    async fn analyze_with_query(
        &self,
        query: &str,
        scan_text: &str,
        sbom_text: &str,
    ) -> Result<String> {
        self.query(query, scan_text, sbom_text).await
    }
}

#[derive(Serialize)]
struct AnalyzeRequest<'a> {
    query: &'a str,
    scan_data: &'a str,
    sbom_data: &'a str,
}

#[derive(Deserialize)]
struct AnalyzeResponse {
    #[serde(default)]
    response: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use std::collections::HashMap;

    fn settings_for(url: &str) -> RemedySettings {
        let mut vars = HashMap::new();
        vars.insert("REMEDY_LLAMAINDEX_URL".to_string(), url.to_string());
        vars.insert("REMEDY_GENERATE_TIMEOUT_SECS".to_string(), "5".to_string());
        RemedySettings::from_map(vars)
    }

    #[tokio::test]
    #[ignore = "requires loopback networking"]
    async fn analyze_returns_response_text() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/analyze");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"response":"upgrade requests to 2.32.0"}"#);
        });

        let client = LlamaIndexClient::new(&settings_for(&server.base_url())).unwrap();
        let analysis = client.analyze("scan text", "sbom text").await.unwrap();
        assert_eq!(analysis, "upgrade requests to 2.32.0");
        mock.assert();
    }

    #[tokio::test]
    #[ignore = "requires loopback networking"]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/analyze");
            then.status(502).body("bad gateway");
        });

        let client = LlamaIndexClient::new(&settings_for(&server.base_url())).unwrap();
        let err = client.analyze("scan", "sbom").await.unwrap_err();
        assert!(err.to_string().contains("LlamaIndex API error"));
    }

    #[tokio::test]
    #[ignore = "requires loopback networking"]
    async fn missing_analysis_text_is_an_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/analyze");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"response":""}"#);
        });

        let client = LlamaIndexClient::new(&settings_for(&server.base_url())).unwrap();
        let err = client.analyze("scan", "sbom").await.unwrap_err();
        assert!(err.to_string().contains("missing analysis text"));
    }
}
