//! The `agentspec` CLI (C17): a `clap`-derived dispatcher wiring the
//! commands named in §6 to the `agentspec-dsl`/`agentspec-storage`/
//! `agentspec-adapters`/`agentspec-secrets` library crates. No teacher CLI
//! exists to adapt (the teacher's only CLI-adjacent crate, a terminal UI
//! client, was dropped before transformation began); this crate's shape is
//! grounded on the pack's other `clap`-derive examples and on the teacher's
//! own `main.rs` bootstrap conventions (init tracing, then dispatch).

pub mod cli;
pub mod commands;
pub mod diagnostics;
pub mod pipeline;
pub mod state_file;

use cli::{Cli, Commands};
use commands::Context;

pub fn init_tracing(verbose: bool) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let default_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_env("AGENTSPEC_LOG_LEVEL").unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::registry().with(filter).with(tracing_subscriber::fmt::layer()).init();
}

/// Dispatches one parsed `Cli` invocation and returns the process exit code.
pub async fn run(cli: Cli) -> i32 {
    let ctx = Context {
        state_file: cli.state_file,
        color: !cli.no_color,
        correlation_id: cli.correlation_id.unwrap_or_else(agentspec_core::event::new_correlation_id),
        policy_mode: cli.policy,
        lock_timeout: std::time::Duration::from_secs(cli.lock_timeout),
    };

    match cli.command {
        Commands::Validate { files } => commands::validate(&ctx, files),
        Commands::Fmt { files, check } => commands::fmt(&ctx, files, check),
        Commands::Plan { files, target } => commands::plan(&ctx, files, target),
        Commands::Apply { files, target } => commands::apply(&ctx, files, target).await,
        Commands::Run { files, port } => commands::run_server(&ctx, files, port, cli.no_auth).await,
        Commands::Dev { files, port } => commands::dev_server(&ctx, files, port, cli.no_auth).await,
        Commands::Status { target } => commands::status(&ctx, target),
        Commands::Logs { target, follow, tail } => commands::logs(&ctx, target, follow, tail),
        Commands::Destroy { target, yes } => commands::destroy(&ctx, target, yes),
        Commands::Export { files, target, out_dir } => commands::export(&ctx, files, target, out_dir),
        Commands::Diff { before, after } => commands::diff_trees(&ctx, before, after),
        Commands::Migrate { files, to_v2 } => commands::migrate(&ctx, files, to_v2),
        Commands::Init { dir, name } => commands::init(dir, name),
        Commands::Compile { files, out } => commands::compile(&ctx, files, out),
        Commands::Sdk => commands::not_implemented("sdk"),
        Commands::Eval => commands::not_implemented("eval"),
        Commands::Package => commands::not_implemented("package"),
        Commands::Publish => commands::not_implemented("publish"),
        Commands::Install => commands::not_implemented("install"),
    }
}
