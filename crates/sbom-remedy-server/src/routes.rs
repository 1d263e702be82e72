use std::path::PathBuf;
use std::sync::Arc;

use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Body, Method, Request, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use sbom_remedy_core::{
    classify_ecosystem, extract_script_block, Engine, QualityScorer, RemedySettings, Remediator,
    SbomGenerator, SbomStore, SemanticAnalyzer, SourceResolver, VulnerabilityScanner,
};

use crate::logfile::RequestLog;

/// Shared per-process state handed to every handler. Collaborators sit
/// behind trait objects so tests can substitute stubs.
pub struct AppState {
    pub settings: RemedySettings,
    pub resolver: SourceResolver,
    pub generator: Arc<dyn SbomGenerator>,
    pub scanner: Arc<dyn VulnerabilityScanner>,
    pub scorer: Arc<dyn QualityScorer>,
    pub semantic: Arc<dyn SemanticAnalyzer>,
    pub remediator: Remediator,
    pub sboms: SbomStore,
    pub log: RequestLog,
}

pub async fn handle(req: Request<Body>, state: Arc<AppState>) -> Response<Body> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    info!(%method, %path, "handling request");

    match (method, path.as_str()) {
        (Method::POST, "/generate-sbom") => generate_sbom(req, &state).await,
        (Method::POST, "/scan-sbom") => scan_sbom(req, &state).await,
        (Method::GET, "/remediate") => remediate(&state).await,
        (Method::POST, "/llamaindex-analyze") => llamaindex_analyze(req, &state).await,
        (Method::GET, "/logs") => logs(&state).await,
        (Method::GET, "/health") => health(&state),
        _ => json_response(
            StatusCode::NOT_FOUND,
            &json!({"error": format!("no route for {path}")}),
        ),
    }
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerateSbomRequest {
    #[serde(default)]
    sbom_source: String,
}

async fn generate_sbom(req: Request<Body>, state: &AppState) -> Response<Body> {
    let body: GenerateSbomRequest = match read_json(req, false).await {
        Ok(body) => body,
        Err(resp) => return *resp,
    };
    if body.sbom_source.trim().is_empty() {
        let msg = "No valid source provided. Provide an image, directory path, or remote URL.";
        state.log.append(msg).await;
        return error_response(StatusCode::BAD_REQUEST, msg);
    }

    let locator = match state.resolver.resolve(&body.sbom_source).await {
        Ok(locator) => locator,
        Err(err) => {
            let msg = format!("Failed to resolve source: {err}");
            state.log.append(&msg).await;
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, &msg);
        }
    };
    state
        .log
        .append(&format!("Processing SBOM for source: {locator:?}"))
        .await;

    let sbom = match state.generator.generate(&locator).await {
        Ok(sbom) => sbom,
        Err(err) => {
            let msg = format!("Failed to create SBOM: {err}");
            state.log.append(&msg).await;
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, &msg);
        }
    };
    let file = match state.sboms.store(&sbom).await {
        Ok(path) => path,
        Err(err) => {
            let msg = format!("Failed to persist SBOM: {err}");
            state.log.append(&msg).await;
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, &msg);
        }
    };
    state.log.append("SBOM generated successfully.").await;

    json_response(
        StatusCode::OK,
        &json!({
            "message": "SBOM generated successfully",
            "format": "CycloneDX JSON",
            "file": file.display().to_string(),
            "sbomData": sbom,
        }),
    )
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ScanSbomRequest {
    #[serde(default)]
    sbom_file: Option<String>,
    #[serde(default)]
    use_advanced: bool,
}

async fn scan_sbom(req: Request<Body>, state: &AppState) -> Response<Body> {
    let body: ScanSbomRequest = match read_json(req, true).await {
        Ok(body) => body,
        Err(resp) => return *resp,
    };
    let sbom_path = match resolve_sbom_path(body.sbom_file, state).await {
        Ok(path) => path,
        Err(resp) => return *resp,
    };
    state.log.append("Starting SBOM scan...").await;

    let scan_output = match state.scanner.scan(&sbom_path).await {
        Ok(output) => output,
        Err(err) => {
            let msg = format!("Error running vulnerability scan: {err}");
            state.log.append(&msg).await;
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, &msg);
        }
    };

    let ecosystem = classify_ecosystem(&scan_output);
    state
        .log
        .append(&format!("Detected package type: {}", ecosystem.label()))
        .await;

    // Advisory metadata only; scoring failures never fail the scan request.
    let quality = state.scorer.score(&sbom_path).await;

    let sbom_text = tokio::fs::read_to_string(&sbom_path).await.unwrap_or_default();
    let result = state
        .remediator
        .remediate(&scan_output, &sbom_text, ecosystem, body.use_advanced)
        .await;
    state.log.append("SBOM scan completed successfully.").await;

    json_response(
        StatusCode::OK,
        &json!({
            "message": "Scan and remediation completed successfully",
            "scanResult": scan_output,
            "remediationScript": result.script,
            "remediationCommands": extract_script_block(&result.script),
            "pkgType": ecosystem.label(),
            "qualityScore": quality,
            "usedLlamaIndex": result.engine == Some(Engine::Semantic),
            "engine": result.engine,
            "warning": result.warning,
        }),
    )
}

async fn remediate(state: &AppState) -> Response<Body> {
    let sbom_path = match resolve_sbom_path(None, state).await {
        Ok(path) => path,
        Err(resp) => return *resp,
    };
    state.log.append("Starting remediation...").await;

    let scan_output = match state.scanner.scan(&sbom_path).await {
        Ok(output) => output,
        Err(err) => {
            let msg = format!("Error running vulnerability scan for remediation: {err}");
            state.log.append(&msg).await;
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, &msg);
        }
    };

    let ecosystem = classify_ecosystem(&scan_output);
    let sbom_text = tokio::fs::read_to_string(&sbom_path).await.unwrap_or_default();
    let result = state
        .remediator
        .remediate(&scan_output, &sbom_text, ecosystem, false)
        .await;
    state.log.append("Remediation script generated.").await;

    json_response(
        StatusCode::OK,
        &json!({
            "message": "Remediation script generated successfully",
            "remediationScript": result.script,
            "engine": result.engine,
            "warning": result.warning,
        }),
    )
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct AnalyzeRequest {
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    scan_data: Option<String>,
    #[serde(default)]
    sbom_file: Option<String>,
}

async fn llamaindex_analyze(req: Request<Body>, state: &AppState) -> Response<Body> {
    let body: AnalyzeRequest = match read_json(req, true).await {
        Ok(body) => body,
        Err(resp) => return *resp,
    };

    let sbom_path = match body.sbom_file {
        Some(path) => Some(PathBuf::from(path)),
        None => state.sboms.current().await,
    };
    let sbom_text = match &sbom_path {
        Some(path) => tokio::fs::read_to_string(path).await.unwrap_or_default(),
        None => String::new(),
    };

    let scan_data = match body.scan_data {
        Some(data) => data,
        None => match &sbom_path {
            Some(path) => match state.scanner.scan(path).await {
                Ok(output) => output,
                Err(err) => {
                    let msg = format!("Error running vulnerability scan: {err}");
                    state.log.append(&msg).await;
                    return error_response(StatusCode::INTERNAL_SERVER_ERROR, &msg);
                }
            },
            None => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    "No scan data provided and no SBOM available. Generate an SBOM first.",
                )
            }
        },
    };

    let query = body
        .query
        .unwrap_or_else(|| "How should these vulnerabilities be remediated?".to_string());
    state.log.append("Forwarding analysis to LlamaIndex.").await;

    match state
        .semantic
        .analyze_with_query(&query, &scan_data, &sbom_text)
        .await
    {
        Ok(analysis) => json_response(
            StatusCode::OK,
            &json!({
                "scanData": scan_data,
                "analysisResponse": analysis,
                "query": query,
            }),
        ),
        Err(err) => {
            let msg = format!("LlamaIndex analysis failed: {err}");
            state.log.append(&msg).await;
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &msg)
        }
    }
}

async fn logs(state: &AppState) -> Response<Body> {
    match state.log.read_all().await {
        Ok(content) => {
            let mut resp = Response::new(Body::from(content));
            resp.headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
            resp
        }
        Err(err) => {
            warn!(%err, "failed to read request log");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to read logs")
        }
    }
}

fn health(state: &AppState) -> Response<Body> {
    json_response(
        StatusCode::OK,
        &json!({
            "status": "ok",
            "llamaIndexAPI": state.settings.llamaindex_endpoint,
            "ollamaHost": state.settings.ollama_host,
            "version": env!("CARGO_PKG_VERSION"),
        }),
    )
}

/// Pick the SBOM file for a request: an explicit path when given, otherwise
/// the store's current handle. Missing files are a client error.
async fn resolve_sbom_path(
    requested: Option<String>,
    state: &AppState,
) -> Result<PathBuf, Box<Response<Body>>> {
    let path = match requested {
        Some(path) => PathBuf::from(path),
        None => match state.sboms.current().await {
            Some(path) => path,
            None => {
                return Err(Box::new(error_response(
                    StatusCode::BAD_REQUEST,
                    "SBOM file not found. Please generate it first.",
                )))
            }
        },
    };
    if !path.exists() {
        return Err(Box::new(error_response(
            StatusCode::BAD_REQUEST,
            "SBOM file not found. Please generate it first.",
        )));
    }
    Ok(path)
}

/// Parse a JSON request body. With `allow_empty`, a missing body means
/// "all defaults".
async fn read_json<T: serde::de::DeserializeOwned + Default>(
    req: Request<Body>,
    allow_empty: bool,
) -> Result<T, Box<Response<Body>>> {
    let bytes = match hyper::body::to_bytes(req.into_body()).await {
        Ok(bytes) => bytes,
        Err(err) => {
            return Err(Box::new(error_response(
                StatusCode::BAD_REQUEST,
                &format!("failed to read request body: {err}"),
            )))
        }
    };
    if bytes.is_empty() && allow_empty {
        return Ok(T::default());
    }
    serde_json::from_slice(&bytes).map_err(|err| {
        Box::new(error_response(
            StatusCode::BAD_REQUEST,
            &format!("invalid JSON request body: {err}"),
        ))
    })
}

fn error_response(status: StatusCode, message: &str) -> Response<Body> {
    json_response(status, &json!({"error": message}))
}

fn json_response(status: StatusCode, value: &serde_json::Value) -> Response<Body> {
    let mut resp = Response::new(Body::from(value.to_string()));
    *resp.status_mut() = status;
    resp.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    resp
}
