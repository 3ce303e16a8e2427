use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cmgate_mcp_runtime::{GatewayArgs, McpCommands, run};

#[derive(Parser)]
#[command(
    name = "cmgate-mcp",
    version,
    about = "Cloudera Manager MCP gateway — cluster, service, command and parcel tools over stdio"
)]
struct Cli {
    #[command(flatten)]
    gateway: GatewayArgs,

    #[command(subcommand)]
    command: McpCommands,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    // stdout carries the protocol; logs go to stderr.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cmgate_mcp=info,cmgate_mcp_runtime=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();
    let code = run(cli.gateway, cli.command).await;
    std::process::exit(code);
}
