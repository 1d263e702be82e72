mod logfile;
mod routes;

use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Server};
use tracing::info;
use tracing_subscriber::EnvFilter;

use sbom_remedy_core::{
    GrypeScanner, LlamaIndexClient, OllamaClient, RemedySettings, Remediator, SbomStore,
    SbomqsScorer, ScriptGenerator, SemanticAnalyzer, SourceResolver, SyftGenerator,
};

use logfile::RequestLog;
use routes::AppState;

#[derive(Parser, Debug)]
#[command(
    name = "sbom-remedy",
    author,
    version,
    about = "SBOM vulnerability remediation service"
)]
struct Cli {
    /// Listen port; overrides REMEDY_PORT
    #[arg(long, value_name = "PORT")]
    port: Option<u16>,

    /// Request log file served by GET /logs
    #[arg(long = "log-file", value_name = "FILE", default_value = "./output.log")]
    log_file: PathBuf,

    /// Directory where generated SBOMs are stored
    #[arg(long = "sbom-dir", value_name = "DIR", default_value = "./sbom-store")]
    sbom_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let settings = RemedySettings::from_env();
    let port = cli.port.unwrap_or(settings.port);

    let semantic: Arc<dyn SemanticAnalyzer> =
        Arc::new(LlamaIndexClient::new(&settings).context("failed to build LlamaIndex client")?);
    let generative: Arc<dyn ScriptGenerator> =
        Arc::new(OllamaClient::new(&settings).context("failed to build Ollama client")?);

    let state = Arc::new(AppState {
        resolver: SourceResolver::default(),
        generator: Arc::new(SyftGenerator),
        scanner: Arc::new(GrypeScanner),
        scorer: Arc::new(SbomqsScorer::new(settings.score_timeout_secs)),
        semantic: semantic.clone(),
        remediator: Remediator::new(semantic, generative),
        sboms: SbomStore::new(cli.sbom_dir),
        log: RequestLog::new(cli.log_file),
        settings,
    });

    let make_svc = make_service_fn(move |_| {
        let state = state.clone();
        async move {
            Ok::<_, Infallible>(service_fn(move |req: Request<Body>| {
                let state = state.clone();
                async move { Ok::<_, Infallible>(routes::handle(req, state).await) }
            }))
        }
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "sbom-remedy API listening");
    Server::bind(&addr)
        .serve(make_svc)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(%err, "failed to listen for shutdown signal");
    }
}

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,hyper=warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .try_init();
}
