//! Command-line interface.

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand, ValueEnum};
use openapi_mcp_tools::config::{DEFAULT_NAMESPACE, ProxyConfig, parse_header_arg};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Expose an `OpenAPI`-described HTTP API as MCP tools.
#[derive(Parser, Debug)]
#[command(name = "openapi-mcp-proxy", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log level filter (`RUST_LOG` takes precedence when set)
    #[arg(long, global = true, env = "OPENAPI_MCP_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the API's operations as MCP tools (stdio unless `--bind` is given).
    Serve(ServeArgs),
    /// Print the tool catalog and operation lookup as JSON.
    Catalog(CatalogArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// `OpenAPI` spec location (file path or http(s) URL)
    pub spec: Option<String>,

    /// YAML/JSON config file; flags override its values
    #[arg(long, env = "OPENAPI_MCP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Tool namespace (tool names are `<namespace>-<operationId>`)
    #[arg(long)]
    pub namespace: Option<String>,

    /// Override the base URL taken from `servers[0].url`
    #[arg(long, env = "OPENAPI_MCP_BASE_URL")]
    pub base_url: Option<String>,

    /// Static header sent on every request (`Name: value`); repeatable
    #[arg(long = "header", value_parser = parse_header_arg)]
    pub headers: Vec<(String, String)>,

    /// Per-request timeout in seconds (0 disables)
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// MCP server name
    #[arg(long)]
    pub server_name: Option<String>,

    /// Serve streamable HTTP on this address instead of stdio
    #[arg(long, env = "OPENAPI_MCP_BIND")]
    pub bind: Option<SocketAddr>,
}

impl ServeArgs {
    /// Merge the optional config file with command-line overrides.
    ///
    /// # Errors
    ///
    /// Fails if the config file cannot be read or parsed, or if no spec location is given.
    pub fn to_config(&self) -> anyhow::Result<ProxyConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("read config file {}", path.display()))?;
                serde_yaml::from_str::<ProxyConfig>(&raw)
                    .with_context(|| format!("parse config file {}", path.display()))?
            }
            None => {
                let spec = self
                    .spec
                    .clone()
                    .context("an OpenAPI spec location or --config is required")?;
                ProxyConfig::new(spec)
            }
        };

        if let Some(spec) = &self.spec {
            config.spec.clone_from(spec);
        }
        if let Some(ns) = &self.namespace {
            config.namespace.clone_from(ns);
        }
        if let Some(url) = &self.base_url {
            config.base_url = Some(url.clone());
        }
        for (name, value) in &self.headers {
            config.headers.insert(name.clone(), value.clone());
        }
        if let Some(secs) = self.timeout_secs {
            config.timeout_secs = Some(secs);
        }
        if let Some(name) = &self.server_name {
            config.server_name.clone_from(name);
        }
        Ok(config)
    }
}

#[derive(Args, Debug)]
pub struct CatalogArgs {
    /// `OpenAPI` spec location (file path or http(s) URL)
    pub spec: String,

    /// Tool namespace
    #[arg(long, default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,

    /// Write JSON here instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}
