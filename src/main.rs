mod agent;
mod api;
mod bus;
mod config;
mod context;
mod delivery;
mod error;
mod llm;
mod memory;
mod profile;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;

#[derive(Parser)]
#[command(
    name = "companion",
    version,
    about = "Personality and memory context engine for a Bible companion agent"
)]
struct Cli {
    #[arg(short, long, env = "COMPANION_CONFIG", default_value = "~/.companion/config.toml")]
    config: String,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the ingestion API and the turn worker
    Run,
    /// Write a default config file
    Init,
    /// Print the personality context compiled for a profile
    Preview {
        /// Raw profile JSON, e.g. '{"personalityColor":"red","age":35}'
        profile: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Commands::Run) {
        Commands::Init => {
            let path = config::init_config(&cli.config).await?;
            tracing::info!("Config ready at {}", path.display());
        }
        Commands::Run => run(&cli.config).await?,
        Commands::Preview { profile } => println!("{}", preview(&profile)?),
    }
    Ok(())
}

async fn run(config_path: &str) -> Result<()> {
    let cfg = config::load(config_path)?;
    let store = memory::create_store(&cfg.memory)?;
    let agent = llm::create_client(&cfg.agent)?;
    let sink = delivery::create_sink(&cfg.delivery)?;
    tracing::info!(
        "Agent provider {} (model '{}'), memory backend {}",
        cfg.agent.provider,
        cfg.agent.model,
        store.name()
    );

    if cfg.api.api_key.is_none() {
        if is_localhost(&cfg.api.bind) {
            tracing::warn!("API authentication disabled (localhost-only)");
        } else {
            anyhow::bail!(
                "API authentication required for non-localhost binding '{}'. Set [api] api_key.",
                cfg.api.bind
            );
        }
    }

    let bus = Arc::new(bus::MessageBus::new(cfg.api.queue_size));
    let processor = Arc::new(agent::TurnProcessor::new(&cfg, agent, store, sink));
    let worker = tokio::spawn(processor.run(bus.clone(), cfg.api.max_concurrent_turns));

    let state = api::AppState {
        sender: bus.inbound_sender(),
        name: cfg.agent.name.clone(),
        api_key: cfg.api.api_key.clone(),
    };
    let listener = tokio::net::TcpListener::bind(&cfg.api.bind).await?;
    tracing::info!("{} listening on {}", cfg.agent.name, cfg.api.bind);

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(async {
            signal::ctrl_c().await.ok();
        })
        .await?;

    bus.close();
    let grace = Duration::from_secs(cfg.api.shutdown_timeout_secs);
    tracing::info!("Draining queued turns (up to {}s)", grace.as_secs());
    match tokio::time::timeout(grace, worker).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!("Turn worker failed: {e}"),
        Err(_) => tracing::warn!("Shutdown timed out with turns still running"),
    }
    Ok(())
}

fn preview(raw: &str) -> Result<String> {
    let value: serde_json::Value = serde_json::from_str(raw).context("Profile is not valid JSON")?;
    let profile = profile::UserProfile::normalize(&value)
        .context("Profile is null; no personality context would be injected")?;
    Ok(context::PersonalityContext::compile(&profile).to_string())
}

fn is_localhost(bind: &str) -> bool {
    use std::net::IpAddr;

    let host = if let Some(inner) = bind.strip_prefix('[')
        && let Some(bracket_end) = inner.find(']')
    {
        &inner[..bracket_end]
    } else if let Some(colon) = bind.rfind(':') {
        &bind[..colon]
    } else {
        bind
    };

    if host == "localhost" {
        return true;
    }
    host.parse::<IpAddr>().is_ok_and(|ip| ip.is_loopback())
}
