//! Runtime server entry point (§4.8). Bootstraps configuration, loads a
//! compiled package, and serves the agentic-loop HTTP API. Grounded on the
//! teacher's `main.rs` for the bootstrap order (telemetry, then config,
//! then state, then bind-and-serve with a `ctrl_c` shutdown race) minus the
//! PostgreSQL extension preflight, which has no counterpart here.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use agentspec_agents::{register_command_executor, ToolRegistry};
use agentspec_api::{AgentRegistry, AppState, AuthFailureLimiter, InMemorySessionStore, PipelineRegistry, RuntimeConfig, SlidingWindowMemory};
use agentspec_core::event::NoopEmitter;
use agentspec_core::resource::Package;
use agentspec_llm::LlmClientRegistry;
use agentspec_secrets::{ChainedResolver, EnvProvider, FileStoreProvider};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = RuntimeConfig::from_env();
    if let Err(error) = config.validate_for_production() {
        tracing::error!(%error, "refusing to start with an insecure configuration");
        return Err(Box::new(error));
    }

    let package = load_package()?;
    let agents = Arc::new(AgentRegistry::from_package(&package));
    let pipelines = Arc::new(PipelineRegistry::from_package(&package));

    let resolver = ChainedResolver::new(vec![Arc::new(EnvProvider), Arc::new(FileStoreProvider::new("."))]);
    let resolved_secrets = resolver.resolve_declared(&package.resources).await;
    let tools = ToolRegistry::new();
    register_command_executor(&tools, &package, resolved_secrets);

    let state = AppState {
        config: Arc::new(config.clone()),
        agents,
        pipelines,
        llm_clients: Arc::new(LlmClientRegistry::new()),
        tools: Arc::new(tools),
        sessions: Arc::new(InMemorySessionStore::new()),
        memory: Arc::new(SlidingWindowMemory::new(40)),
        events: Arc::new(NoopEmitter),
        rate_limiter: Arc::new(AuthFailureLimiter::new(config.auth_failure_threshold, config.auth_failure_window, config.auth_block_duration)),
        start_time: Instant::now(),
    };

    let app = agentspec_api::create_api_router(state);

    let addr: SocketAddr = config.bind_addr.parse()?;
    tracing::info!(%addr, "starting agentspec runtime server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let server = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>());

    tokio::select! {
        result = server => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = tracing_subscriber::EnvFilter::try_from_env("AGENTSPEC_LOG_LEVEL").unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry().with(filter).with(tracing_subscriber::fmt::layer()).init();
}

/// Loads the package the server will serve. Expects `AGENTSPEC_PACKAGE_FILE`
/// to point at a JSON-serialized `Package` (the form `agentspec-cli compile`
/// emits); compiling `.ias` source directly is the CLI's job, not this
/// server's.
fn load_package() -> Result<Package, Box<dyn std::error::Error>> {
    let path = std::env::var("AGENTSPEC_PACKAGE_FILE").map_err(|_| "AGENTSPEC_PACKAGE_FILE must be set to a compiled package JSON file")?;
    let contents = std::fs::read_to_string(&path)?;
    Ok(serde_json::from_str(&contents)?)
}
