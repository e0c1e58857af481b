use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default namespace every extracted method is registered under.
pub const DEFAULT_NAMESPACE: &str = "API";

/// Default MCP server name advertised on `initialize`.
pub const DEFAULT_SERVER_NAME: &str = "OpenAPI Tools";

/// Configuration for one proxied `OpenAPI` document.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyConfig {
    /// `OpenAPI` spec location (URL or file path).
    pub spec: String,

    /// Tool namespace; public tool names are `<namespace>-<operationId>`.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Override base URL from spec (`servers[0].url` otherwise).
    #[serde(default)]
    pub base_url: Option<String>,

    /// Static headers sent on every outbound request.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Per-request timeout in seconds. `None` or `0` disables the timeout.
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// MCP server name.
    #[serde(default = "default_server_name")]
    pub server_name: String,
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_server_name() -> String {
    DEFAULT_SERVER_NAME.to_string()
}

impl ProxyConfig {
    #[must_use]
    pub fn new(spec: impl Into<String>) -> Self {
        Self {
            spec: spec.into(),
            namespace: default_namespace(),
            base_url: None,
            headers: BTreeMap::new(),
            timeout_secs: None,
            server_name: default_server_name(),
        }
    }
}

/// Parse a `Name: value` header argument.
///
/// # Errors
///
/// Returns a message if there is no `:` separator or the name is empty.
pub fn parse_header_arg(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("invalid header '{raw}': expected 'Name: value'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("invalid header '{raw}': empty name"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}
