//! api-resilience command line.
//!
//! # Architecture Overview
//!
//! ```text
//!   CLI command
//!       │
//!       ▼
//!   ResilienceContext ── monitor ── admin dashboard (axum)
//!       │
//!       ▼
//!   RequestPipeline ── refresh coordinator ── token refresher
//!       │          └── retry policy / fallback registry
//!       ▼
//!   ReqwestTransport ──────────────────────────▶ API
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use reqwest::Method;
use serde_json::Value;
use tokio::net::TcpListener;

use api_resilience::admin::{self, AdminState};
use api_resilience::auth::{CredentialStore, MemoryCredentialStore};
use api_resilience::config::{load_config, validate_config, ConfigError, ResilienceConfig};
use api_resilience::http::{ApiRequest, RequestPipeline};
use api_resilience::lifecycle::spawn_signal_handler;
use api_resilience::observability::{init_logging, metrics};
use api_resilience::ResilienceContext;

#[derive(Parser)]
#[command(name = "api-resilience")]
#[command(about = "Resilient API client: retries, token refresh, fallbacks and error monitoring", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults are used when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration and print the effective values
    CheckConfig,
    /// Send one request through the pipeline
    Request {
        method: String,
        path: String,
        /// JSON request body
        #[arg(long)]
        body: Option<String>,
        /// Initial bearer credential
        #[arg(long)]
        token: Option<String>,
    },
    /// Send concurrent requests and report how each was resolved
    Burst {
        path: String,
        #[arg(long, default_value_t = 10)]
        concurrency: usize,
        #[arg(long)]
        token: Option<String>,
    },
    /// Probe a path periodically and serve the admin dashboard until Ctrl+C
    Watch {
        path: String,
        #[arg(long, default_value_t = 10)]
        interval_secs: u64,
        #[arg(long)]
        token: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = read_config(cli.config.as_deref())?;

    init_logging(&config.observability);
    tracing::debug!(config = ?cli.config, "api-resilience v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    match cli.command {
        Commands::CheckConfig => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::Request { method, path, body, token } => {
            let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())?;
            let body = body.map(|b| serde_json::from_str::<Value>(&b)).transpose()?;

            let context = ResilienceContext::new(config);
            let pipeline = context.http_pipeline(credentials(token))?;

            let mut request = ApiRequest::new(method, path);
            if let Some(body) = body {
                request = request.with_body(body);
            }

            let ok = match pipeline.send(request).await {
                Ok(response) => {
                    println!("{}", serde_json::to_string_pretty(&response.to_json())?);
                    true
                }
                Err(err) => {
                    println!("{}", serde_json::to_string_pretty(&err.to_json())?);
                    false
                }
            };
            if !ok {
                std::process::exit(1);
            }
        }
        Commands::Burst { path, concurrency, token } => {
            let context = ResilienceContext::new(config);
            let pipeline = Arc::new(context.http_pipeline(credentials(token))?);
            let report = burst(pipeline, &path, concurrency.max(1)).await;
            let summary = serde_json::to_value(context.monitor().summary())?;
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "outcomes": report.outcomes,
                    "refresh_calls": report.refresh_calls,
                    "errors": summary,
                }))?
            );
        }
        Commands::Watch { path, interval_secs, token } => {
            let context = ResilienceContext::new(config);
            let pipeline = context.http_pipeline(credentials(token))?;
            watch(&context, &pipeline, &path, Duration::from_secs(interval_secs.max(1))).await?;
        }
    }

    Ok(())
}

fn read_config(path: Option<&std::path::Path>) -> Result<ResilienceConfig, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => {
            let config = ResilienceConfig::default();
            validate_config(&config).map_err(ConfigError::Validation)?;
            Ok(config)
        }
    }
}

fn credentials(token: Option<String>) -> Arc<dyn CredentialStore> {
    match token {
        Some(token) => Arc::new(MemoryCredentialStore::with_token(token)),
        None => Arc::new(MemoryCredentialStore::new()),
    }
}

struct BurstReport {
    outcomes: BTreeMap<String, usize>,
    refresh_calls: u64,
}

async fn burst(pipeline: Arc<RequestPipeline>, path: &str, concurrency: usize) -> BurstReport {
    let handles: Vec<_> = (0..concurrency)
        .map(|i| {
            let pipeline = pipeline.clone();
            let request = ApiRequest::get(path).with_tag("burst_index", i.to_string());
            tokio::spawn(async move { pipeline.send(request).await })
        })
        .collect();

    let mut outcomes = BTreeMap::new();
    for handle in handles {
        let outcome = match handle.await {
            Ok(Ok(response)) => response.origin.as_str().to_string(),
            Ok(Err(err)) => format!("error:{}", err.category()),
            Err(e) => {
                tracing::error!(error = %e, "Burst task failed");
                "panicked".to_string()
            }
        };
        *outcomes.entry(outcome).or_insert(0) += 1;
    }

    BurstReport {
        outcomes,
        refresh_calls: pipeline.refresh_coordinator().refresh_calls(),
    }
}

async fn watch(
    context: &ResilienceContext,
    pipeline: &RequestPipeline,
    path: &str,
    interval: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let shutdown = context.shutdown().clone();
    spawn_signal_handler(shutdown.clone());

    let admin_task = if context.config().admin.enabled {
        let listener = TcpListener::bind(&context.config().admin.bind_address).await?;
        let state = AdminState::new(context);
        Some(tokio::spawn(admin::serve(listener, state, shutdown.clone())))
    } else {
        None
    };

    tracing::info!(path, interval = ?interval, "Watching endpoint");
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = shutdown.wait() => break,
            _ = ticker.tick() => {
                match pipeline.send(ApiRequest::get(path).with_tag("source", "watch")).await {
                    Ok(response) => tracing::info!(
                        path,
                        status = response.status,
                        origin = response.origin.as_str(),
                        "Probe succeeded"
                    ),
                    Err(err) => tracing::warn!(
                        path,
                        category = %err.category(),
                        message = err.user_message(),
                        "Probe failed"
                    ),
                }
            }
        }
    }

    if let Some(task) = admin_task {
        match task.await {
            Ok(Err(e)) => tracing::error!(error = %e, "Admin dashboard failed"),
            Err(e) => tracing::error!(error = %e, "Admin dashboard task panicked"),
            Ok(Ok(())) => {}
        }
    }

    let summary = context.monitor().summary();
    tracing::info!(
        total_errors = summary.total_errors,
        recent_errors_24h = summary.recent_errors_24h,
        "Shutdown complete"
    );
    Ok(())
}
