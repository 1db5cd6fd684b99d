//! Legal Triage - conversational triage service driven by a generative AI backend.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use legal_triage::ai::AiClient;
use legal_triage::config::{load_settings, Settings};
use legal_triage::http::TriageServer;
use legal_triage::triage::{EvictionPolicy, SessionStore, TriageController, TriageOptions};

/// How often the background sweep prunes idle sessions.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Parser)]
#[command(
    name = "legal-triage",
    about = "Conversational legal triage service",
    version
)]
struct Cli {
    /// Path to a settings file (TOML).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listen port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the model identifier.
    #[arg(short, long)]
    model: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

fn build_eviction_policy(settings: &Settings) -> EvictionPolicy {
    EvictionPolicy {
        idle_ttl: (settings.triage.session_ttl_secs > 0)
            .then(|| Duration::from_secs(settings.triage.session_ttl_secs)),
        max_sessions: (settings.triage.max_sessions > 0).then_some(settings.triage.max_sessions),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut settings = match load_settings(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load settings");
            return ExitCode::FAILURE;
        }
    };
    if let Some(port) = cli.port {
        settings.server.port = port;
    }
    if let Some(model) = cli.model {
        settings.ai.model = model;
    }

    // Missing credentials are fatal before the listener binds.
    let gateway = match AiClient::from_config(settings.ai.clone()) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "Gateway not configured");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(
        provider = ?gateway.provider_kind(),
        model = gateway.model(),
        "Gateway configured"
    );

    let store = Arc::new(SessionStore::new(build_eviction_policy(&settings)));
    let controller = Arc::new(TriageController::new(
        Arc::clone(&store),
        Arc::new(gateway),
        TriageOptions {
            normalize_answers: settings.triage.normalize_answers,
        },
    ));

    let cancel = CancellationToken::new();
    let sweeper = Arc::clone(&store).spawn_sweeper(SWEEP_INTERVAL, cancel.clone());

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Received ctrl-c, shutting down");
                cancel.cancel();
            }
        });
    }

    let server =
        TriageServer::new(controller, cancel.clone()).with_config(settings.server.clone());
    let result = server.run().await;

    cancel.cancel();
    let _ = sweeper.await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}
