use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = agentspec_cli::cli::Cli::parse();
    agentspec_cli::init_tracing(cli.verbose);
    let code = agentspec_cli::run(cli).await;
    std::process::exit(code);
}
