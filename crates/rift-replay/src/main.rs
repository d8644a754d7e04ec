use anyhow::Context;
use clap::Parser;
use rift_replay::loader::load_lookup_table;
use rift_replay::{MatchEngine, MetricsServer, ReplayConfig, StubServer};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// Rift Replay - serve recorded JSON responses by request fingerprint
#[derive(Parser, Debug)]
#[command(name = "rift-replay")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML configuration file; flags below override its values
    #[arg(short, long, env = "RIFT_REPLAY_CONFIG")]
    config: Option<PathBuf>,

    /// Host to bind
    #[arg(long, env = "RIFT_REPLAY_HOST")]
    host: Option<String>,

    /// Port to bind
    #[arg(short, long, env = "RIFT_REPLAY_PORT")]
    port: Option<u16>,

    /// Fixture document (array of {query?, req, res})
    #[arg(short, long, env = "RIFT_REPLAY_FIXTURES")]
    fixtures: Option<PathBuf>,

    /// JSON Schema for fixture requests
    #[arg(long, env = "RIFT_REPLAY_REQUEST_SCHEMA")]
    request_schema: Option<PathBuf>,

    /// JSON Schema for fixture responses
    #[arg(long, env = "RIFT_REPLAY_RESPONSE_SCHEMA")]
    response_schema: Option<PathBuf>,

    /// Query parameter that enables per-request debug tracing
    #[arg(long, env = "RIFT_REPLAY_DEBUG_PARAMETER")]
    debug_parameter: Option<String>,

    /// Trace every request
    #[arg(long, env = "RIFT_REPLAY_FORCED_DEBUG")]
    forced_debug: bool,

    /// Serve Prometheus metrics on this port
    #[arg(long, env = "RIFT_REPLAY_METRICS_PORT")]
    metrics_port: Option<u16>,
}

impl Args {
    fn into_config(self) -> Result<ReplayConfig, anyhow::Error> {
        let mut config = match &self.config {
            Some(path) => ReplayConfig::from_file(path)
                .with_context(|| format!("Unable to load config {}", path.display()))?,
            None => ReplayConfig::default(),
        };

        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(fixtures) = self.fixtures {
            config.fixtures = fixtures;
        }
        if let Some(request_schema) = self.request_schema {
            config.request_schema = request_schema;
        }
        if let Some(response_schema) = self.response_schema {
            config.response_schema = response_schema;
        }
        if let Some(debug_parameter) = self.debug_parameter {
            config.debug_parameter = debug_parameter;
        }
        if self.forced_debug {
            config.forced_debug = true;
        }
        if self.metrics_port.is_some() {
            config.metrics_port = self.metrics_port;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Args::parse().into_config()?;
    info!(
        "Launched {} fixtures={} requestSchema={} responseSchema={} forcedDebug={}",
        config.listen_addr(),
        config.fixtures.display(),
        config.request_schema.display(),
        config.response_schema.display(),
        config.forced_debug
    );

    // Fail fast: nothing is served until the table is complete
    let table = load_lookup_table(&config)?;
    let engine = Arc::new(MatchEngine::from_config(Arc::new(table), &config));

    if let Some(metrics_port) = config.metrics_port {
        let metrics = MetricsServer::bind((config.host.as_str(), metrics_port))
            .await
            .with_context(|| format!("Unable to bind metrics port {metrics_port}"))?;
        tokio::spawn(async move {
            if let Err(e) = metrics.run().await {
                error!("Metrics server stopped: {}", e);
            }
        });
    }

    let server = StubServer::bind(config.listen_addr(), engine)
        .await
        .with_context(|| format!("Unable to bind {}", config.listen_addr()))?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
        }
    }

    Ok(())
}
