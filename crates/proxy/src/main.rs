use clap::Parser as _;
use openapi_mcp_proxy::cli::{Cli, Commands};
use openapi_mcp_proxy::{commands, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_level, cli.log_format);

    tracing::debug!("Starting openapi-mcp-proxy v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Serve(args) => commands::serve(args).await,
        Commands::Catalog(args) => commands::catalog(args).await,
    }
}
