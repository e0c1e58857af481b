//! Subcommand entry points.

use crate::cli::{CatalogArgs, ServeArgs};
use crate::proxy::McpProxy;
use crate::transport::{serve_http, serve_stdio};
use anyhow::Context as _;
use openapi_mcp_tools::catalog::ToolCatalog;
use openapi_mcp_tools::loader::load_document;

/// `serve`: build the proxy and run the selected transport.
///
/// # Errors
///
/// Startup errors (config, spec loading, base URL, duplicate operation ids) abort with context.
pub async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = args.to_config()?;
    let proxy = McpProxy::load(&config)
        .await
        .with_context(|| format!("load OpenAPI spec '{}'", config.spec))?;

    match args.bind {
        Some(bind) => serve_http(proxy, bind).await,
        None => serve_stdio(proxy).await,
    }
}

/// `catalog`: print the `{tools, openApiLookup}` JSON for a document.
///
/// # Errors
///
/// Fails if the document cannot be loaded or catalogued, or the output cannot be written.
pub async fn catalog(args: CatalogArgs) -> anyhow::Result<()> {
    let client = reqwest::Client::new();
    let document = load_document(&args.spec, &client)
        .await
        .with_context(|| format!("load OpenAPI spec '{}'", args.spec))?;
    let catalog = ToolCatalog::build(&document, &args.namespace)?;
    let json = serde_json::to_string_pretty(&catalog).context("serialize catalog")?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
            tracing::info!(path = %path.display(), tools = catalog.len(), "Wrote tool catalog");
        }
        None => println!("{json}"),
    }
    Ok(())
}
